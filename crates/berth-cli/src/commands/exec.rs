use super::{json_pretty, Context, EXIT_SUCCESS};

pub async fn run(
    ctx: &Context,
    id: &str,
    command: &[String],
    capture: bool,
    json: bool,
) -> Result<u8, String> {
    if capture || json {
        let output = ctx
            .facade
            .query_data(id, command)
            .await
            .map_err(|e| e.to_string())?;
        if json {
            println!(
                "{}",
                json_pretty(&serde_json::json!({ "id": id, "output": output }))?
            );
        } else {
            print!("{output}");
        }
    } else {
        let mut stdout = tokio::io::stdout();
        let mut stderr = tokio::io::stderr();
        ctx.facade
            .query(id, command, &mut stdout, &mut stderr)
            .await
            .map_err(|e| e.to_string())?;
    }
    Ok(EXIT_SUCCESS)
}
