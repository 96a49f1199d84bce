mod commands;

use clap::{Parser, Subcommand};
use commands::create::CreateArgs;
use commands::power::Direction;
use commands::{exit_code_for, load_config, Context};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "berth",
    version,
    about = "Engine-agnostic container lifecycle with provider readiness gating"
)]
struct Cli {
    /// Path to config.toml (overrides BERTH_CONFIG and the default location).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Bring the provider up.
    Up {
        /// Number of attempts before giving up (default: up_attempts from config).
        #[arg(long)]
        attempts: Option<u32>,
    },
    /// Bring the provider down.
    Down {
        /// Number of attempts before giving up (default: up_attempts from config).
        #[arg(long)]
        attempts: Option<u32>,
    },
    /// Show engine, provider and readiness state.
    Status,
    /// List containers.
    List {
        /// Only containers belonging to this app.
        #[arg(long)]
        app: Option<String>,
    },
    /// Exit 0 if a container with this id or name exists.
    Exists {
        /// Container id or name.
        id: String,
    },
    /// Print the engine's full description of a container.
    Inspect {
        /// Container id or name.
        id: String,
    },
    /// Show a container summary.
    Info {
        /// Container id or name.
        id: String,
    },
    /// Create a container.
    Create(CreateArgs),
    /// Start a container and wait until it is considered ready.
    Start {
        /// Container id or name.
        id: String,
        /// Engine-specific start options as a JSON object.
        #[arg(long)]
        options: Option<String>,
    },
    /// Stop a running container.
    Stop {
        /// Container id or name.
        id: String,
    },
    /// Remove a container.
    Rm {
        /// Container id or name.
        id: String,
    },
    /// Run a command inside a container.
    Exec {
        /// Container id or name.
        id: String,
        /// Buffer the whole output and print it at the end.
        #[arg(long, default_value_t = false)]
        capture: bool,
        /// Command and arguments to run.
        #[arg(required = true, last = true)]
        command: Vec<String>,
    },
    /// Build an image.
    Build {
        /// Image name (tag).
        name: String,
        /// Build context directory.
        #[arg(long, default_value = ".")]
        context: PathBuf,
        /// Dockerfile path.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Run a command in a throwaway container and stream its output.
    Run {
        /// Image to run.
        image: String,
        /// Container name.
        #[arg(long)]
        name: Option<String>,
        /// Command and arguments to run.
        #[arg(required = true, last = true)]
        command: Vec<String>,
    },
    /// Run diagnostic checks on the configured backends.
    Doctor,
}

async fn dispatch(cli: Cli) -> Result<u8, String> {
    let config = load_config(cli.config.as_deref())?;
    let json = cli.json;
    let opened = Context::open(config.clone()).await;
    let ctx = || opened.as_ref().map_err(Clone::clone);

    match cli.command {
        Commands::Up { attempts } => {
            commands::power::run(ctx()?, Direction::Up, attempts, json).await
        }
        Commands::Down { attempts } => {
            commands::power::run(ctx()?, Direction::Down, attempts, json).await
        }
        Commands::Status => commands::status::run(ctx()?, json).await,
        Commands::List { app } => commands::list::run(ctx()?, app.as_deref(), json).await,
        Commands::Exists { id } => commands::inspect::exists(ctx()?, &id, json).await,
        Commands::Inspect { id } => commands::inspect::inspect(ctx()?, &id).await,
        Commands::Info { id } => commands::inspect::info(ctx()?, &id, json).await,
        Commands::Create(args) => commands::create::run(ctx()?, args, json).await,
        Commands::Start { id, options } => {
            commands::start::run(ctx()?, &id, options.as_deref(), json).await
        }
        Commands::Stop { id } => commands::stop::stop(ctx()?, &id).await,
        Commands::Rm { id } => commands::stop::remove(ctx()?, &id).await,
        Commands::Exec {
            id,
            capture,
            command,
        } => commands::exec::run(ctx()?, &id, &command, capture, json).await,
        Commands::Build {
            name,
            context,
            file,
        } => commands::build::run(ctx()?, &name, context, file, json).await,
        Commands::Run {
            image,
            name,
            command,
        } => commands::run::run(ctx()?, &image, &command, name).await,
        Commands::Doctor => commands::doctor::run(&config, opened.as_ref(), json).await,
    }
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("BERTH_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: cannot start async runtime: {e}");
            return ExitCode::from(commands::EXIT_FAILURE);
        }
    };

    match runtime.block_on(dispatch(cli)) {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}
