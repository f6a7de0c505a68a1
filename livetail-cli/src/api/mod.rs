//! API client module
//!
//! HTTP client for the livetail server.

mod sse;

pub use sse::SseParser;

use anyhow::{Context, Result};
use futures::StreamExt;
use futures::stream::BoxStream;
use livetail_core::domain::event::Event;
use reqwest::Client;
use std::collections::VecDeque;

/// HTTP client for the livetail server API
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the livetail server
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Open a live-log stream
    ///
    /// # Arguments
    /// * `path` - Request path of the stream
    ///
    /// # Returns
    /// The open stream, or the server's error message when it refused
    pub async fn live_logs(&self, path: &str) -> Result<LiveLogStream> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .context("Failed to send live logs request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Request failed with status {}: {}",
                status,
                error_message(&error_text)
            );
        }

        Ok(LiveLogStream {
            body: response
                .bytes_stream()
                .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
                .boxed(),
            parser: SseParser::default(),
            ready: VecDeque::new(),
        })
    }
}

/// Events of an open live-log stream
pub struct LiveLogStream {
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    parser: SseParser,
    ready: VecDeque<Event>,
}

impl LiveLogStream {
    /// Next event, or None once the server closed the stream
    pub async fn next_event(&mut self) -> Result<Option<Event>> {
        loop {
            if let Some(event) = self.ready.pop_front() {
                return Ok(Some(event));
            }

            match self.body.next().await {
                Some(chunk) => {
                    let chunk = chunk.context("Live log stream broke off")?;
                    self.ready.extend(self.parser.feed(&chunk));
                }
                None => return Ok(None),
            }
        }
    }
}

/// Pull the message out of a JSON error body, falling back to the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value["error"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
