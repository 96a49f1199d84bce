use super::{spin_fail, spin_ok, spinner, Context, EXIT_SUCCESS};
use berth_runtime::StartOptions;

pub async fn run(ctx: &Context, id: &str, options: Option<&str>, json: bool) -> Result<u8, String> {
    let options: Option<StartOptions> = options
        .map(|raw| {
            serde_json::from_str(raw).map_err(|e| format!("invalid --options JSON: {e}"))
        })
        .transpose()?;

    let pb = (!json).then(|| spinner(&format!("starting {id}...")));
    let result = match options {
        Some(options) => ctx.facade.start_with(id, options).await,
        None => ctx.facade.start(id).await,
    };
    match result {
        Ok(()) => {
            if let Some(pb) = &pb {
                spin_ok(pb, &format!("started container {id}"));
            } else {
                println!("{}", serde_json::json!({ "id": id, "running": true }));
            }
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            if let Some(pb) = &pb {
                spin_fail(pb, &format!("failed to start {id}"));
            }
            Err(e.to_string())
        }
    }
}
