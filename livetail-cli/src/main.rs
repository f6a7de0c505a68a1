//! Livetail CLI
//!
//! Command-line viewer for the live logs of CI builds.

mod api;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "livetail")]
#[command(about = "Follow the live logs of CI builds", long_about = None)]
struct Cli {
    /// Livetail server URL
    #[arg(long, env = "LIVETAIL_SERVER_URL", default_value = "http://localhost:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config { server_url: cli.server };

    handle_command(cli.command, &config).await
}
