use super::{Context, EXIT_FAILURE, EXIT_SUCCESS};
use berth_core::BerthConfig;
use berth_runtime::host::DEFAULT_DOCKER_BIN;

pub async fn run(
    config: &BerthConfig,
    opened: Result<&Context, &String>,
    json_output: bool,
) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    checks.push(Check::info(
        "backend",
        &format!(
            "Engine '{}' on provider '{}', readiness strategy '{}'",
            config.backend.engine,
            config.backend.provider,
            config.readiness.probe().name()
        ),
    ));

    if config.backend.engine == "docker" {
        check_prereqs(config, &mut checks, &mut all_pass);
    }

    match opened {
        Ok(ctx) => {
            checks.push(Check::pass("resolve", "Engine and provider resolved"));
            check_provider(ctx, &mut checks, &mut all_pass).await;
        }
        Err(e) => {
            all_pass = false;
            checks.push(Check::fail("resolve", e));
        }
    }

    print_results(&checks, all_pass, json_output)
}

fn check_prereqs(config: &BerthConfig, checks: &mut Vec<Check>, all_pass: &mut bool) {
    let binary = config
        .backend
        .option_str("docker_bin")
        .unwrap_or(DEFAULT_DOCKER_BIN);
    let missing = berth_runtime::check_docker_prereqs(binary);
    if missing.is_empty() {
        checks.push(Check::pass("engine_prereqs", "Docker client and daemon reachable"));
    } else {
        *all_pass = false;
        checks.push(Check::fail(
            "engine_prereqs",
            &berth_runtime::format_missing(&missing),
        ));
    }
}

async fn check_provider(ctx: &Context, checks: &mut Vec<Check>, all_pass: &mut bool) {
    let Some(provider) = ctx.facade.registry().provider_module() else {
        *all_pass = false;
        checks.push(Check::fail("provider", "No provider published after init"));
        return;
    };
    let name = provider.name().to_owned();

    match provider.is_installed().await {
        Ok(true) => checks.push(Check::pass(
            "provider_installed",
            &format!("{name} is installed"),
        )),
        Ok(false) => {
            *all_pass = false;
            checks.push(Check::fail(
                "provider_installed",
                &format!("{name} is NOT installed!"),
            ));
            return;
        }
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail(
                "provider_installed",
                &format!("Cannot probe {name}: {e}"),
            ));
            return;
        }
    }

    match provider.is_up().await {
        Ok(true) => checks.push(Check::pass("provider_up", &format!("{name} is running"))),
        Ok(false) => checks.push(Check::warn(
            "provider_up",
            &format!("{name} is not running (try `berth up`)"),
        )),
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("provider_up", &format!("Cannot probe {name}: {e}")));
        }
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?
        );
    } else {
        println!("Berth Doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn new(name: &'static str, status: &'static str, message: &str) -> Self {
        Self {
            name,
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &'static str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &'static str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self::new(name, "info", message)
    }
}
