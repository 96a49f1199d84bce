use super::{colorize_running, json_pretty, Context, EXIT_FAILURE, EXIT_SUCCESS};

pub async fn inspect(ctx: &Context, id: &str) -> Result<u8, String> {
    let record = ctx.facade.inspect(id).await.map_err(|e| e.to_string())?;
    println!("{}", json_pretty(&record)?);
    Ok(EXIT_SUCCESS)
}

pub async fn info(ctx: &Context, id: &str, json: bool) -> Result<u8, String> {
    let info = ctx.facade.info(id).await.map_err(|e| e.to_string())?;
    if json {
        println!("{}", json_pretty(&info)?);
    } else {
        println!("id:       {}", info.id);
        println!("name:     {}", info.name);
        println!("image:    {}", info.image.as_deref().unwrap_or("(unknown)"));
        println!("app:      {}", info.app.as_deref().unwrap_or("(none)"));
        println!("state:    {}", colorize_running(info.running));
        for (key, value) in &info.extra {
            println!("{:<9} {value}", format!("{key}:"));
        }
    }
    Ok(EXIT_SUCCESS)
}

/// Exit status mirrors the answer, so scripts can branch on it.
pub async fn exists(ctx: &Context, id: &str, json: bool) -> Result<u8, String> {
    let found = ctx.facade.exists(id).await.map_err(|e| e.to_string())?;
    if json {
        println!("{}", json_pretty(&serde_json::json!({ "id": id, "exists": found }))?);
    } else {
        println!("{found}");
    }
    Ok(if found { EXIT_SUCCESS } else { EXIT_FAILURE })
}
