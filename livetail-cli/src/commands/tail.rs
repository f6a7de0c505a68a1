//! Tail command handler
//!
//! Prints a build's log lines as the server streams them.

use anyhow::Result;
use colored::*;
use livetail_core::domain::event::{Event, EventKind};

use crate::api::ApiClient;
use crate::config::Config;

/// Build to follow
#[derive(Debug, Clone)]
pub struct Target {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub build: String,
    pub namespace: Option<String>,
}

impl Target {
    /// Request path of the live-log stream
    pub fn path(&self) -> String {
        let build = format!(
            "{}/{}/{}/{}/logs/live",
            self.owner, self.repo, self.branch, self.build
        );

        match &self.namespace {
            Some(namespace) => format!("/teams/{}/projects/{}", namespace, build),
            None => format!("/{}", build),
        }
    }
}

/// Follow one build until its feed ends
///
/// Fails when the stream carried an error event.
pub async fn handle_tail_command(target: Target, config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.server_url);
    let mut stream = client.live_logs(&target.path()).await?;

    let mut failure = None;
    while let Some(event) = stream.next_event().await? {
        match event.kind {
            EventKind::Log => println!("{}", event.data),
            EventKind::Error => {
                print_error(&event);
                failure = Some(event.data);
            }
            EventKind::Eof => break,
        }
    }

    match failure {
        Some(message) => anyhow::bail!("log stream failed: {}", message),
        None => Ok(()),
    }
}

fn print_error(event: &Event) {
    eprintln!("{} {}", "error:".red().bold(), event.data.red());
}
