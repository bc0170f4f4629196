//! HubRelay - GitHub relay for chat assistants
//!
//! Main entry point for the HubRelay server.

use clap::Parser;
use hubrelay::config::RelayConfig;
use hubrelay::server::RelayServer;
use std::path::PathBuf;
use std::process;

/// HubRelay - GitHub relay server for chat assistants
#[derive(Parser, Debug)]
#[command(name = "hubrelay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.config/hubrelay/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address, e.g. 0.0.0.0:3000
    #[arg(short, long, env = "HUBRELAY_LISTEN")]
    listen: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = hubrelay::logging::init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RelayConfig::load(path),
        None => RelayConfig::load_default(),
    };
    let mut config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }

    let server = match RelayServer::new(config) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Failed to create server: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        eprintln!("Server error: {}", e);
        process::exit(1);
    }
}
