//! Submission sink -- delivers a graded result to the collector endpoint.
//!
//! One call, one outbound request. Retrying is the controller's business
//! (the student pressing submit again), never the sink's.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::SinkError;
use crate::grader::Answers;

/// Body posted to the collector. Field names are part of the wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub student_name: String,
    /// Epoch milliseconds.
    pub started_at: i64,
    /// Epoch milliseconds.
    pub submitted_at: i64,
    pub remaining_seconds: u64,
    pub answers: Answers,
    #[serde(rename = "scoreMC")]
    pub score_mc: usize,
    #[serde(rename = "levelMC")]
    pub level_mc: String,
}

/// Successful delivery. The body is informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait SubmissionSink: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    async fn submit(&self, payload: &SubmissionPayload) -> Result<Ack, SinkError>;
}

/// Posts the payload as JSON text to an HTTP endpoint.
pub struct HttpSink {
    endpoint: Option<Url>,
    client: Client,
}

impl HttpSink {
    pub const CONTENT_TYPE: &'static str = "text/plain;charset=utf-8";
    /// Upper bound on one request, connect through response body.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// `None` builds a sink that refuses every submission with
    /// [`SinkError::NotConfigured`].
    pub fn new(endpoint: Option<Url>) -> Self {
        let client = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to default HTTP client");
                Client::new()
            });
        Self { endpoint, client }
    }

    pub fn endpoint(&self) -> Option<&Url> {
        self.endpoint.as_ref()
    }
}

#[async_trait]
impl SubmissionSink for HttpSink {
    fn name(&self) -> &str {
        "http"
    }

    async fn submit(&self, payload: &SubmissionPayload) -> Result<Ack, SinkError> {
        let endpoint = self.endpoint.as_ref().ok_or(SinkError::NotConfigured)?;
        let body =
            serde_json::to_string(payload).map_err(|e| SinkError::Encode(e.to_string()))?;

        let resp = self
            .client
            .post(endpoint.clone())
            .header(CONTENT_TYPE, Self::CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if status.is_success() {
            tracing::debug!(status = status.as_u16(), body = %text, "collector accepted submission");
            Ok(Ack {
                status: status.as_u16(),
                body: text,
            })
        } else {
            Err(SinkError::Rejected {
                status: status.as_u16(),
                body: text,
            })
        }
    }
}
