use super::{Context, EXIT_SUCCESS};

pub async fn stop(ctx: &Context, id: &str) -> Result<u8, String> {
    ctx.facade.stop(id).await.map_err(|e| e.to_string())?;
    println!("stopped container {id}");
    Ok(EXIT_SUCCESS)
}

pub async fn remove(ctx: &Context, id: &str) -> Result<u8, String> {
    ctx.facade.remove(id).await.map_err(|e| e.to_string())?;
    println!("removed container {id}");
    Ok(EXIT_SUCCESS)
}
