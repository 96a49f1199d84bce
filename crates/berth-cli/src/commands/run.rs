use super::{Context, EXIT_SUCCESS};
use berth_runtime::CreateOptions;
use tracing::debug;

/// Ad hoc container: stream its output to stdout, then remove it.
pub async fn run(
    ctx: &Context,
    image: &str,
    command: &[String],
    name: Option<String>,
) -> Result<u8, String> {
    let create = CreateOptions {
        name,
        ..CreateOptions::default()
    };
    let once = ctx
        .facade
        .once(image, command, create, None, Box::new(tokio::io::stdout()))
        .await
        .map_err(|e| e.to_string())?;
    debug!("started ad hoc container {}", once.container.id);
    once.done.await.map_err(|e| e.to_string())?;
    Ok(EXIT_SUCCESS)
}
