//! Context broker sink
//!
//! Publishing is "send, log outcome, move on": one request per tick, bounded by a
//! timeout, never retried. A missed update is superseded by the next tick.

use reqwest::Client;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::entity::Entity;

/// Default bound on a publish request.
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

/// Bound on the liveness probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors that can occur when publishing to the sink
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("sink at {endpoint} unreachable: {reason}")]
    Unreachable { endpoint: String, reason: String },

    #[error("sink rejected update with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to build sink client: {0}")]
    Client(String),
}

/// Reachability of the sink as reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkStatus {
    Ok,
    Error(u16),
    Unreachable,
}

impl fmt::Display for SinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkStatus::Ok => f.write_str("ok"),
            SinkStatus::Error(status) => write!(f, "error_{status}"),
            SinkStatus::Unreachable => f.write_str("unreachable"),
        }
    }
}

impl Serialize for SinkStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Destination for generated entities
#[async_trait::async_trait]
pub trait Sink: Send + Sync + 'static {
    /// Upsert a batch of entities in a single request
    async fn publish(&self, entities: &[Entity]) -> Result<(), SinkError>;

    /// Liveness probe, for reporting only
    async fn probe(&self) -> SinkStatus;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdate<'a> {
    action_type: &'static str,
    entities: &'a [Entity],
}

/// Orion context broker client using the NGSI-v2 batch update operation
pub struct OrionSink {
    client: Client,
    base_url: String,
}

impl OrionSink {
    /// Create a sink for the broker at `base_url` with a per-request `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::Client(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn update_url(&self) -> String {
        format!("{}/v2/op/update", self.base_url)
    }

    fn classify(endpoint: &str, err: reqwest::Error) -> SinkError {
        if err.is_timeout() {
            SinkError::Timeout { endpoint: endpoint.to_string() }
        } else {
            SinkError::Unreachable { endpoint: endpoint.to_string(), reason: err.to_string() }
        }
    }
}

#[async_trait::async_trait]
impl Sink for OrionSink {
    #[tracing::instrument(
        name = "orion_publish",
        skip(self, entities),
        fields(count = entities.len())
    )]
    async fn publish(&self, entities: &[Entity]) -> Result<(), SinkError> {
        if entities.is_empty() {
            info!("No valid entities to send");
            return Ok(());
        }

        let endpoint = self.update_url();
        let payload = BatchUpdate { action_type: "APPEND", entities };
        debug!(endpoint, "Sending batch update");

        let response = self
            .client
            .post(&endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Self::classify(&endpoint, e))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body =
                response.text().await.unwrap_or_else(|_| "(failed to read body)".to_string());
            error!(endpoint, status, response_body = %body, "Sink returned error status");
            return Err(SinkError::Rejected { status, body });
        }

        info!(entity = %entities[0].id, status, "Sent update to context broker");
        Ok(())
    }

    async fn probe(&self) -> SinkStatus {
        let url = format!("{}/version", self.base_url);
        match self.client.get(&url).timeout(PROBE_TIMEOUT).send().await {
            Ok(response) if response.status().is_success() => SinkStatus::Ok,
            Ok(response) => SinkStatus::Error(response.status().as_u16()),
            Err(_) => SinkStatus::Unreachable,
        }
    }
}
