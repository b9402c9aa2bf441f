use anyhow::Result;
use clap::Parser;
use tracing::instrument::WithSubscriber;

use watch_infrastructure::{AppConfig, CONFIG_PATH_ENV};

#[derive(Parser, Debug)]
#[command(name = "battlefield-watch")]
#[command(about = "Watches battlefield mob spawns and alerts on new ones", long_about = None)]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<String>,

    /// Bearer token for the game API, overrides config and environment
    #[arg(short, long)]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(config) = args.config {
        std::env::set_var(CONFIG_PATH_ENV, config);
    }

    // Load-time warnings go to stderr; the full setup needs `log_dir` first.
    let config = AppConfig::load()
        .with_subscriber(watch_bootstrap::logging::startup_subscriber(std::io::stderr))
        .await?;
    let _log_guard = watch_bootstrap::init_logging(config.log_dir.as_deref());

    watch_bootstrap::run_standalone(config, args.token).await
}
