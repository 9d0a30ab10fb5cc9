//! Relay domain types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;
use uuid::Uuid;

/// Certificate operation forwarded to the upstream API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertOperation {
    Add,
    Reject,
}

impl CertOperation {
    /// Path appended to the upstream base URL.
    pub fn path(self) -> &'static str {
        match self {
            CertOperation::Add => "/api/v1.0/cert/add",
            CertOperation::Reject => "/api/v1.0/cert/reject",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CertOperation::Add => "add",
            CertOperation::Reject => "reject",
        }
    }
}

impl fmt::Display for CertOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields sent verbatim to the upstream API.
///
/// `cname_id` and `user_id` are kept as raw JSON so callers may send either
/// strings or numbers and the upstream sees exactly what was given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertFields {
    pub cname_id: Value,
    pub domain: String,
    pub email: String,
    pub user_id: Value,
}

/// A validated inbound relay request.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayRequest {
    pub callback_url: Url,
    pub fields: CertFields,
}

/// Processing state of a tracked request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Processing,
    Completed,
    Failed,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Processing)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestStatus::Processing => "processing",
            RequestStatus::Completed => "completed",
            RequestStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Outcome of the callback delivery sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookStatus {
    Sent,
    Failed,
}

/// Classification of an upstream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    HttpError,
    RequestError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::HttpError => "http_error",
            ErrorKind::RequestError => "request_error",
        }
    }
}

/// Structured upstream error, stored in the tracker and sent to callbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub error_type: ErrorKind,
    pub message: String,
    pub api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<Value>,
}

/// Tracked state of one accepted relay request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub request_id: Uuid,
    pub action: CertOperation,
    pub status: RequestStatus,
    pub domain: String,
    pub callback_url: String,
    pub requested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_status: Option<WebhookStatus>,
}

impl RequestRecord {
    /// A fresh record in the `processing` state.
    pub fn processing(request_id: Uuid, action: CertOperation, request: &RelayRequest) -> Self {
        Self {
            request_id,
            action,
            status: RequestStatus::Processing,
            domain: request.fields.domain.clone(),
            callback_url: request.callback_url.to_string(),
            requested_at: Utc::now(),
            completed_at: None,
            result: None,
            error: None,
            webhook_status: None,
        }
    }
}
