use super::{colorize_running, json_pretty, Context, EXIT_SUCCESS};

pub async fn run(ctx: &Context, app: Option<&str>, json: bool) -> Result<u8, String> {
    let containers = match app {
        Some(app) => ctx.facade.list_app(app).await,
        None => ctx.facade.list().await,
    }
    .map_err(|e| e.to_string())?;

    if json {
        println!("{}", json_pretty(&containers)?);
    } else if containers.is_empty() {
        println!("no containers found");
    } else {
        println!("{:<14} {:<24} STATE", "ID", "NAME");
        for c in &containers {
            let short: String = c.id.chars().take(12).collect();
            println!("{short:<14} {:<24} {}", c.name, colorize_running(c.running));
        }
    }
    Ok(EXIT_SUCCESS)
}
