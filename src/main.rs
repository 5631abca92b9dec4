use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use coreguard::bootstrap::Service;
use coreguard::monitor::MonitorState;
use coreguard::config::platform::ENV_ENVIRONMENT;
use coreguard::config::Config;
use coreguard::notify::{MessageLevel, Notifier, TracingNotifier};
use coreguard::schema::{load_dir, SchemaValidator};
use coreguard::stats::{view_settings, StatsSummary};
use coreguard::telemetry::{init_tracing, shutdown_tracing, Metrics, TracingConfig};

#[derive(Parser, Debug)]
#[command(name = "coreguard")]
#[command(author, version, about = "Retry-aware reload and health monitoring for search cores")]
struct Args {
    /// Path to config file (YAML, JSON or TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Validate config and exit
    #[arg(long)]
    validate: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reload the core and verify it came back
    Reload,
    /// Poll STATUS until the core reports itself loaded
    Verify,
    /// Run a status and schema drift check
    Check {
        /// Ignore the check interval
        #[arg(long)]
        force: bool,
    },
    /// Print index and update handler statistics
    Stats,
    /// Print connection settings and server core info
    Settings,
    /// Print a configuration file from the server
    File {
        /// File name, omit to list
        name: Option<String>,
    },
    /// Print server system info
    System,
    /// Validate a local configuration set before upload
    ValidateSchema {
        /// Directory containing schema.xml and solrconfig.xml
        dir: PathBuf,
    },
    /// Run the scheduler and admin API until interrupted (default)
    Serve,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Ok(Config::default()),
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print queued operator messages. Returns true if any was an error.
fn flush_messages(notifier: &TracingNotifier) -> bool {
    let mut failed = false;
    for message in notifier.queue().drain() {
        let label = match message.level {
            MessageLevel::Status => "status",
            MessageLevel::Warning => "warning",
            MessageLevel::Error => {
                failed = true;
                "error"
            }
        };
        eprintln!("[{label}] {}", message.text);
    }
    failed
}

fn validate_schema(dir: &Path) -> Result<bool> {
    let files = load_dir(dir)
        .with_context(|| format!("failed to read configuration set in {}", dir.display()))?;
    let notifier = Arc::new(TracingNotifier::new(16));
    let result = SchemaValidator::new(notifier.clone()).validate_schema_compatibility(&files);
    flush_messages(&notifier);

    match result {
        Ok(()) => {
            println!("configuration set in {} is valid", dir.display());
            Ok(true)
        }
        Err(e) => {
            eprintln!("{e}");
            Ok(false)
        }
    }
}

async fn run(args: Args, config: Config) -> Result<bool> {
    let command = args.command.unwrap_or(Command::Serve);

    if let Command::ValidateSchema { dir } = &command {
        return validate_schema(dir);
    }

    let service = Service::build(config)?;
    let core = service.core.clone();

    let ok = match command {
        Command::Reload => service.reloader.reload_core(&core).await,
        Command::Verify => {
            let verified = service.reloader.verify_core_status(&core).await;
            println!("{}", if verified { "verified" } else { "not verified" });
            verified
        }
        Command::Check { force } => {
            let state = service.monitor.check_core_status(force).await;
            print_json(&serde_json::json!({
                "state": state,
                "check": service.monitor.check_state()?,
            }))?;
            state != MonitorState::Failed
        }
        Command::Stats => {
            let notifier: &dyn Notifier = service.notifier.as_ref();
            let summary = StatsSummary::collect(service.client.as_ref(), notifier).await;
            print_json(&summary)?;
            true
        }
        Command::Settings => {
            let environment = std::env::var(ENV_ENVIRONMENT).ok();
            let settings = view_settings(
                service.client.as_ref(),
                &service.platform,
                environment.as_deref(),
            )
            .await?;
            for setting in settings {
                println!("{}: {}", setting.label, setting.info);
            }
            true
        }
        Command::File { name } => {
            print!("{}", service.client.view_file(name.as_deref()).await?);
            true
        }
        Command::System => {
            print_json(&service.client.server_info(&core).await?)?;
            true
        }
        Command::Serve => {
            let metrics = Metrics::new()?;
            let notifier = service.notifier.clone();
            service.serve(Some(metrics.clone())).await?;
            metrics.shutdown();
            flush_messages(&notifier);
            return Ok(true);
        }
        Command::ValidateSchema { dir } => validate_schema(&dir)?,
    };

    let had_errors = flush_messages(&service.notifier);
    Ok(ok && !had_errors)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Load configuration first (to get log settings)
    let config = load_config(args.config.as_ref())?;

    init_tracing(&TracingConfig::from(&config.telemetry))?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?args.config,
        "starting coreguard"
    );

    if args.validate {
        info!("configuration is valid");
        return Ok(ExitCode::SUCCESS);
    }

    let ok = run(args, config).await;
    shutdown_tracing();

    Ok(if ok? { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
