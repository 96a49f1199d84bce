use super::{spin_fail, spin_ok, spinner, Context, EXIT_SUCCESS};
use berth_runtime::ImageSpec;
use std::path::PathBuf;

pub async fn run(
    ctx: &Context,
    name: &str,
    context: PathBuf,
    dockerfile: Option<PathBuf>,
    json: bool,
) -> Result<u8, String> {
    let spec = ImageSpec {
        name: name.to_owned(),
        context,
        dockerfile,
    };
    let pb = (!json).then(|| spinner(&format!("building {name}...")));
    match ctx.facade.build(&spec).await {
        Ok(()) => {
            if let Some(pb) = &pb {
                spin_ok(pb, &format!("built image {name}"));
            } else {
                println!("{}", serde_json::json!({ "image": name, "built": true }));
            }
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            if let Some(pb) = &pb {
                spin_fail(pb, &format!("failed to build {name}"));
            }
            Err(e.to_string())
        }
    }
}
