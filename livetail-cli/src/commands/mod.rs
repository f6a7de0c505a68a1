//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod tail;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Follow the live logs of one build
    Tail {
        /// Repository owner
        owner: String,
        /// Repository name
        repo: String,
        /// Branch, or PR-<n> for a pull request
        branch: String,
        /// Build number
        build: String,
        /// Team namespace; the server default when omitted
        #[arg(short, long)]
        namespace: Option<String>,
    },
}

/// Handle a CLI command
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Tail {
            owner,
            repo,
            branch,
            build,
            namespace,
        } => {
            let target = tail::Target {
                owner,
                repo,
                branch,
                build,
                namespace,
            };
            tail::handle_tail_command(target, config).await
        }
    }
}
