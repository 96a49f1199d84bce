use super::{json_pretty, parse_pairs, Context, EXIT_SUCCESS};
use berth_runtime::{CreateOptions, APP_LABEL};

#[derive(Debug, clap::Args)]
pub struct CreateArgs {
    /// Image to create the container from.
    #[arg(long)]
    pub image: String,
    /// Container name.
    #[arg(long)]
    pub name: Option<String>,
    /// App the container belongs to.
    #[arg(long)]
    pub app: Option<String>,
    /// Label as KEY=VALUE (repeatable).
    #[arg(long = "label")]
    pub labels: Vec<String>,
    /// Environment variable as KEY=VALUE (repeatable).
    #[arg(short, long = "env")]
    pub env: Vec<String>,
    /// Port mapping, e.g. 8080:80 (repeatable).
    #[arg(short, long = "publish")]
    pub ports: Vec<String>,
    /// Volume mount, e.g. /data:/var/lib/data (repeatable).
    #[arg(long = "volume")]
    pub volumes: Vec<String>,
    /// Working directory inside the container.
    #[arg(short, long)]
    pub workdir: Option<String>,
    /// Command to run (after --).
    #[arg(last = true)]
    pub command: Vec<String>,
}

impl CreateArgs {
    pub fn into_options(self) -> Result<CreateOptions, String> {
        let mut labels = parse_pairs(&self.labels, "label")?;
        if let Some(app) = self.app {
            labels.insert(APP_LABEL.to_owned(), app);
        }
        Ok(CreateOptions {
            name: self.name,
            image: Some(self.image),
            cmd: (!self.command.is_empty()).then_some(self.command),
            env: parse_pairs(&self.env, "env")?,
            labels,
            ports: self.ports,
            volumes: self.volumes,
            working_dir: self.workdir,
            extra: serde_json::Map::new(),
        })
    }
}

pub async fn run(ctx: &Context, args: CreateArgs, json: bool) -> Result<u8, String> {
    let options = args.into_options()?;
    let container = ctx
        .facade
        .create(options)
        .await
        .map_err(|e| e.to_string())?;
    if json {
        println!("{}", json_pretty(&container)?);
    } else {
        println!("created container {} ({})", container.name, container.id);
    }
    Ok(EXIT_SUCCESS)
}
