use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use kioskvisor::{Config, Controller, LogWriter, Subscribe};

/// Kiosk and arcade cabinet controller.
#[derive(Parser, Debug)]
#[command(name = "kioskvisor", version, about)]
struct Args {
    /// TOML config file; built-in defaults when omitted.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Log level or filter directive (overridden by RUST_LOG).
    #[arg(long, default_value = "info")]
    log: String,

    /// Directory of app descriptors (overrides `apps_location`).
    #[arg(long)]
    apps: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "kioskvisor stopped with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut cfg = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(apps) = args.apps {
        cfg.apps_location = apps;
    }
    info!(
        socket = %cfg.socket_path.display(),
        apps = %cfg.apps_location.display(),
        "starting"
    );

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let controller = Controller::builder(cfg).with_subscribers(subs).build()?;
    controller.run().await?;
    Ok(())
}
