use super::{json_pretty, spin_fail, spin_ok, spinner, Context, EXIT_SUCCESS};
use berth_core::CoreError;

#[derive(Debug, Clone, Copy)]
pub enum Direction {
    Up,
    Down,
}

pub async fn run(
    ctx: &Context,
    direction: Direction,
    attempts: Option<u32>,
    json: bool,
) -> Result<u8, String> {
    let attempts = attempts.unwrap_or(ctx.config.up_attempts);
    let provider = ctx.facade.provider_name().unwrap_or("provider").to_owned();
    let (verb, done) = match direction {
        Direction::Up => ("starting", "is up"),
        Direction::Down => ("stopping", "is down"),
    };

    let pb = (!json).then(|| spinner(&format!("{verb} {provider}...")));
    let result: Result<(), CoreError> = match direction {
        Direction::Up => ctx.facade.up(attempts).await,
        Direction::Down => ctx.facade.down(attempts).await,
    };

    match result {
        Ok(()) => {
            if let Some(pb) = &pb {
                spin_ok(pb, &format!("{provider} {done}"));
            } else {
                let state = serde_json::json!({
                    "provider": provider,
                    "up": matches!(direction, Direction::Up),
                });
                println!("{}", json_pretty(&state)?);
            }
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            if let Some(pb) = &pb {
                spin_fail(pb, &format!("{provider}: {verb} failed"));
            }
            Err(e.to_string())
        }
    }
}
