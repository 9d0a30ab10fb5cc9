//! Callback payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::relay::types::{CertOperation, ErrorDetail};
use crate::relay::upstream::UpstreamError;

/// Top-level `status` of a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackStatus {
    Success,
    Error,
}

/// Body POSTed to the caller's callback URL.
///
/// Add successes carry the upstream body as `cert_data`, reject successes as
/// `result`. Failures carry `message` and `error_details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub status: CallbackStatus,
    pub request_id: Uuid,
    pub action: CertOperation,
    pub domain: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<ErrorDetail>,
}

impl CallbackPayload {
    fn base(
        status: CallbackStatus,
        action: CertOperation,
        request_id: Uuid,
        domain: &str,
    ) -> Self {
        Self {
            status,
            request_id,
            action,
            domain: domain.to_string(),
            timestamp: Utc::now(),
            message: None,
            cert_data: None,
            result: None,
            error_details: None,
        }
    }

    /// Payload for a successful upstream call.
    pub fn success(action: CertOperation, request_id: Uuid, domain: &str, body: Value) -> Self {
        let mut payload = Self::base(CallbackStatus::Success, action, request_id, domain);
        match action {
            CertOperation::Add => payload.cert_data = Some(body),
            CertOperation::Reject => payload.result = Some(body),
        }
        payload
    }

    /// Payload for a failed upstream call.
    pub fn failure(
        action: CertOperation,
        request_id: Uuid,
        domain: &str,
        error: &UpstreamError,
    ) -> Self {
        let mut payload = Self::base(CallbackStatus::Error, action, request_id, domain);
        payload.message = Some(match action {
            CertOperation::Add => "Failed to call cert API".to_string(),
            CertOperation::Reject => format!("Failed to process reject request: {}", error),
        });
        payload.error_details = Some(error.detail());
        payload
    }
}
