//! Heimdall CLI
//!
//! Runs the live-state synchronization service, or lists the deploy log.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use heimdall::deploy::DeployApi;
use heimdall::io::ReqwestHttpClient;
use heimdall::{load_config, Config};
use tracing::Level;

#[derive(Parser)]
#[command(name = "heimdall")]
#[command(about = "Live-state synchronization for the Heimdall dashboard")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dashboard mirror port (overrides config file)
    #[arg(long)]
    dashboard_port: Option<u16>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print one page of the deploy log
    Deploys {
        /// Zero-indexed page
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    if let Some(dashboard_port) = args.dashboard_port {
        config.dashboard.port = dashboard_port;
    }

    match args.command {
        Some(Command::Deploys { page }) => list_deploys(&config, page).await?,
        None => {
            tracing::info!(
                "Starting heimdall sync against {} (push channel {})",
                config.api.base_url,
                config.channel.url()
            );
            heimdall::run(config).await?;
        }
    }

    Ok(())
}

async fn list_deploys(config: &Config, page: u32) -> heimdall::Result<()> {
    let api = DeployApi::new(
        Arc::new(ReqwestHttpClient::new()),
        config.api.base_url.clone(),
    );
    let fetched = api.fetch_deploys_page(page).await?;

    if fetched.deploys.is_empty() {
        println!("deploy log page {} is empty", page);
        return Ok(());
    }
    for deploy in &fetched.deploys {
        println!("{}", deploy.summary());
    }
    if fetched.has_next {
        println!("... more on page {}", page + 1);
    }
    Ok(())
}
