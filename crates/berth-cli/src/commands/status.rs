use super::{colorize_running, json_pretty, Context, EXIT_SUCCESS};
use berth_core::ReadinessStage;
use serde::Serialize;

#[derive(Serialize)]
struct Status<'a> {
    engine: &'a str,
    provider: &'a str,
    up: bool,
    readiness: ReadinessStage,
    probe: &'a str,
}

pub async fn run(ctx: &Context, json: bool) -> Result<u8, String> {
    let up = ctx.facade.is_up().await.map_err(|e| e.to_string())?;
    let status = Status {
        engine: ctx.facade.engine_name().unwrap_or("-"),
        provider: ctx.facade.provider_name().unwrap_or("-"),
        up,
        readiness: ctx.facade.readiness(),
        probe: ctx.facade.probe_name(),
    };
    if json {
        println!("{}", json_pretty(&status)?);
    } else {
        println!("engine:     {}", status.engine);
        println!("provider:   {}", status.provider);
        println!("state:      {}", colorize_running(status.up));
        println!("readiness:  {}", status.readiness);
        println!("probe:      {}", status.probe);
    }
    Ok(EXIT_SUCCESS)
}
