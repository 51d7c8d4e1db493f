//! Remote compliance store client
//!
//! Two idempotent register calls (simple and metadata-carrying) plus a
//! chain validation call, behind a trait so the relay can be exercised
//! against a scripted remote in tests. Only fingerprints and flags ever
//! cross this boundary — never content.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Remote view of one stream's integrity
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteChainReport {
    pub is_valid: bool,
    /// Chain positions where the remote found a break
    pub breaks: Vec<u64>,
}

/// Compliance store RPC surface
#[async_trait]
pub trait ComplianceRemote: Send + Sync {
    /// Register an event with identity fields only; returns the remote ID
    async fn register_event(
        &self,
        trace_id: &str,
        user_id: &str,
        event_type: &str,
        action: &str,
    ) -> Result<String>;

    /// Register an event with redacted metadata attached
    async fn register_event_with_metadata(
        &self,
        trace_id: &str,
        user_id: &str,
        event_type: &str,
        action: &str,
        metadata: serde_json::Value,
    ) -> Result<String>;

    /// Ask the remote to validate its copy of a stream
    async fn validate_chain(&self, trace_id: &str) -> Result<RemoteChainReport>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    trace_id: &'a str,
    user_id: &'a str,
    event_type: &'a str,
    action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterResponse {
    remote_id: String,
}

/// HTTP client for the remote compliance API
pub struct HttpComplianceRemote {
    client: reqwest::Client,
    base_url: String,
}

impl HttpComplianceRemote {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn register(&self, request: RegisterRequest<'_>) -> Result<String> {
        let url = format!("{}/api/v1/compliance/events", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Sync(format!("remote rejected event registration: {}", e)))?;
        let body: RegisterResponse = response.json().await?;
        Ok(body.remote_id)
    }
}

#[async_trait]
impl ComplianceRemote for HttpComplianceRemote {
    async fn register_event(
        &self,
        trace_id: &str,
        user_id: &str,
        event_type: &str,
        action: &str,
    ) -> Result<String> {
        self.register(RegisterRequest {
            trace_id,
            user_id,
            event_type,
            action,
            metadata: None,
        })
        .await
    }

    async fn register_event_with_metadata(
        &self,
        trace_id: &str,
        user_id: &str,
        event_type: &str,
        action: &str,
        metadata: serde_json::Value,
    ) -> Result<String> {
        self.register(RegisterRequest {
            trace_id,
            user_id,
            event_type,
            action,
            metadata: Some(metadata),
        })
        .await
    }

    async fn validate_chain(&self, trace_id: &str) -> Result<RemoteChainReport> {
        let url = format!(
            "{}/api/v1/compliance/chains/{}/validate",
            self.base_url, trace_id
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Sync(format!("remote chain validation failed: {}", e)))?;
        Ok(response.json().await?)
    }
}
