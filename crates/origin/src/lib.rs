// Access to the running server being snapshotted

pub mod http;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use pagesnap_core::SourceConfig;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::debug;

pub use http::HttpOrigin;

#[derive(Debug, Error)]
pub enum OriginError {
    #[error("{0}")]
    Transport(String),
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// A response body with its status, read to completion
#[derive(Debug, Clone)]
pub struct Page {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Page {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn json(&self) -> Result<serde_json::Value, OriginError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// The server a snapshot is taken from
#[async_trait]
pub trait Origin: Send + Sync {
    /// URL the pipeline reports in its progress output
    fn base_url(&self) -> &str;

    /// GET a path relative to the base URL; `""` is the base URL itself.
    /// Non-200 statuses are returned as pages, not errors.
    async fn get(&self, path: &str, timeout: Duration) -> Result<Page, OriginError>;
}

/// Poll the base URL until it answers 200 or the ready timeout elapses.
///
/// Each attempt is bounded by `probe_timeout`; attempts are separated by a
/// fixed `poll_interval`.
pub async fn wait_until_ready(origin: &dyn Origin, source: &SourceConfig) -> bool {
    let start = Instant::now();

    while start.elapsed() < source.ready_timeout {
        match origin.get("", source.probe_timeout).await {
            Ok(page) if page.is_ok() => return true,
            Ok(page) => debug!(status = page.status, "server not ready yet"),
            Err(e) => debug!(error = %e, "server not reachable yet"),
        }
        sleep(source.poll_interval).await;
    }

    false
}

/// GET an endpoint and parse its body as JSON, whatever the status
pub async fn fetch_json(
    origin: &dyn Origin,
    path: &str,
    timeout: Duration,
) -> Result<serde_json::Value, OriginError> {
    let page = origin.get(path, timeout).await?;
    if !page.is_ok() {
        debug!(path, status = page.status, "endpoint answered with non-200 status");
    }
    page.json()
}

/// Placeholder stored in place of an endpoint that could not be captured
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchFailure {
    pub success: bool,
    pub error: String,
    pub timestamp: String,
}

impl FetchFailure {
    pub fn new(error: &OriginError) -> Self {
        Self {
            success: false,
            error: format!("Failed to fetch data: {}", error),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}
