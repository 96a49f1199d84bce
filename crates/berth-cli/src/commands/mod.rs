pub mod build;
pub mod create;
pub mod doctor;
pub mod exec;
pub mod inspect;
pub mod list;
pub mod power;
pub mod run;
pub mod start;
pub mod status;
pub mod stop;

use berth_core::{BerthConfig, EngineFacade};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_NOT_READY: u8 = 3;

/// Everything a command needs: the parsed config and an initialized facade.
pub struct Context {
    pub config: BerthConfig,
    pub facade: EngineFacade,
}

impl Context {
    pub async fn open(config: BerthConfig) -> Result<Self, String> {
        let facade = EngineFacade::from_config(&config);
        facade
            .init(&config.backend)
            .await
            .map_err(|e| format!("config error: {e}"))?;
        Ok(Self { config, facade })
    }
}

/// `--config`, then `BERTH_CONFIG`, then the default location. A file that was
/// named explicitly must exist; the default location may be absent.
pub fn load_config(explicit: Option<&Path>) -> Result<BerthConfig, String> {
    let named = explicit.map(Path::to_path_buf).or_else(|| {
        std::env::var_os(berth_core::config::CONFIG_ENV)
            .filter(|v| !v.is_empty())
            .map(Into::into)
    });
    match named {
        Some(path) => BerthConfig::load(&path)
            .map_err(|e| format!("config error: cannot load {}: {e}", path.display())),
        None => BerthConfig::load_default().map_err(|e| format!("config error: {e}")),
    }
}

pub fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("config error:") {
        EXIT_CONFIG_ERROR
    } else if msg.contains("is NOT installed!") || msg.contains("is NOT running!") {
        EXIT_NOT_READY
    } else {
        EXIT_FAILURE
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// Parse repeated `key=value` arguments.
pub fn parse_pairs(pairs: &[String], what: &str) -> Result<BTreeMap<String, String>, String> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .filter(|(k, _)| !k.is_empty())
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .ok_or_else(|| format!("invalid {what} '{pair}': expected KEY=VALUE"))
        })
        .collect()
}

const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {msg}";
const DONE_TEMPLATE: &str = "{msg}";

/// Falls back to the indicatif default when `template` does not parse.
fn style(template: &str, fallback: fn() -> ProgressStyle) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| fallback())
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        style(SPINNER_TEMPLATE, ProgressStyle::default_spinner)
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(style(DONE_TEMPLATE, ProgressStyle::default_spinner));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(style(DONE_TEMPLATE, ProgressStyle::default_spinner));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_running(running: bool) -> String {
    use console::Style;
    if running {
        Style::new().cyan().bold().apply_to("running").to_string()
    } else {
        Style::new().dim().apply_to("stopped").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_pretty_serializes_string() {
        let val = serde_json::json!({"key": "value"});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"key\""));
        assert!(result.contains("\"value\""));
    }

    #[test]
    fn parse_pairs_accepts_key_value() {
        let pairs = vec!["tier=web".to_owned(), "empty=".to_owned(), "url=a=b".to_owned()];
        let parsed = parse_pairs(&pairs, "label").unwrap();
        assert_eq!(parsed["tier"], "web");
        assert_eq!(parsed["empty"], "");
        assert_eq!(parsed["url"], "a=b");
    }

    #[test]
    fn parse_pairs_rejects_malformed() {
        let err = parse_pairs(&["novalue".to_owned()], "label").unwrap_err();
        assert!(err.contains("invalid label 'novalue'"));
        assert!(parse_pairs(&["=v".to_owned()], "env").is_err());
    }

    #[test]
    fn exit_codes_follow_message_class() {
        assert_eq!(exit_code_for("config error: bad"), EXIT_CONFIG_ERROR);
        assert_eq!(exit_code_for("mock is NOT installed!"), EXIT_NOT_READY);
        assert_eq!(exit_code_for("docker-host is NOT running!"), EXIT_NOT_READY);
        assert_eq!(exit_code_for("container 'x' not found (start)"), EXIT_FAILURE);
    }

    #[test]
    fn colorize_running_keeps_word() {
        assert!(colorize_running(true).contains("running"));
        assert!(colorize_running(false).contains("stopped"));
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.starts_with("config error:"));
    }

    #[test]
    fn spinner_templates_parse() {
        assert!(ProgressStyle::with_template(SPINNER_TEMPLATE).is_ok());
        assert!(ProgressStyle::with_template(DONE_TEMPLATE).is_ok());
        let _ = style("{spinner:.nosuchcolor", ProgressStyle::default_spinner);
    }

    #[test]
    fn spinner_creates_progress_bar() {
        let pb = spinner("testing...");
        spin_ok(&pb, "done");
        let pb = spinner("testing...");
        spin_fail(&pb, "failed");
    }
}
