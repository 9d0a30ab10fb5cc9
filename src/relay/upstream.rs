//! Certificate API client.
//!
//! # Responsibilities
//! - POST add/reject requests to the upstream certificate API
//! - Attach the static auth header when one is configured
//! - Classify failures as timeout, HTTP error or request error
//!
//! # Design Decisions
//! - One attempt per call; retries belong to callback delivery only
//! - Operation-specific timeouts (add generates a certificate and is slow)
//! - The callback URL never leaves the relay

use std::time::{Duration, Instant};

use serde_json::Value;
use thiserror::Error;

use crate::config::UpstreamConfig;
use crate::observability::metrics;
use crate::relay::types::{CertFields, CertOperation, ErrorDetail, ErrorKind};

/// Header carrying the upstream API key.
pub const AUTH_HEADER: &str = "X-AUTH-KEY";

/// Errors returned by the certificate API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The call did not finish within the operation timeout.
    #[error("Cert API request timed out")]
    Timeout { api_url: String },

    /// The API answered with a non-2xx status.
    #[error("{message}")]
    Http {
        status_code: u16,
        message: String,
        api_url: String,
        response_body: Option<Value>,
    },

    /// Connection, protocol or decoding failure.
    #[error("{message}")]
    Request { message: String, api_url: String },
}

impl UpstreamError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UpstreamError::Timeout { .. } => ErrorKind::Timeout,
            UpstreamError::Http { .. } => ErrorKind::HttpError,
            UpstreamError::Request { .. } => ErrorKind::RequestError,
        }
    }

    /// Structured form stored in the tracker and sent to the callback.
    pub fn detail(&self) -> ErrorDetail {
        let (api_url, status_code, response_body) = match self {
            UpstreamError::Timeout { api_url } | UpstreamError::Request { api_url, .. } => {
                (api_url.clone(), None, None)
            }
            UpstreamError::Http {
                api_url,
                status_code,
                response_body,
                ..
            } => (api_url.clone(), Some(*status_code), response_body.clone()),
        };

        ErrorDetail {
            error_type: self.kind(),
            message: self.to_string(),
            api_url,
            status_code,
            response_body,
        }
    }

    fn from_reqwest(err: reqwest::Error, api_url: &str) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout {
                api_url: api_url.to_string(),
            }
        } else {
            UpstreamError::Request {
                message: err.to_string(),
                api_url: api_url.to_string(),
            }
        }
    }
}

/// Client for the upstream certificate API.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    auth_key: Option<String>,
    add_timeout: Duration,
    reject_timeout: Duration,
}

impl UpstreamClient {
    /// Create a client sharing the given connection pool.
    pub fn new(http: reqwest::Client, config: &UpstreamConfig) -> Self {
        let auth_key = Some(config.auth_key.clone()).filter(|key| !key.is_empty());
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_key,
            add_timeout: Duration::from_secs(config.add_timeout_secs),
            reject_timeout: Duration::from_secs(config.reject_timeout_secs),
        }
    }

    /// Full URL for an operation.
    pub fn endpoint(&self, operation: CertOperation) -> String {
        format!("{}{}", self.base_url, operation.path())
    }

    pub fn timeout_for(&self, operation: CertOperation) -> Duration {
        match operation {
            CertOperation::Add => self.add_timeout,
            CertOperation::Reject => self.reject_timeout,
        }
    }

    /// Submit one operation and return the upstream JSON body.
    pub async fn submit(
        &self,
        operation: CertOperation,
        fields: &CertFields,
    ) -> Result<Value, UpstreamError> {
        let api_url = self.endpoint(operation);
        let start = Instant::now();

        tracing::info!(
            action = %operation,
            api_url = %api_url,
            domain = %fields.domain,
            "Calling cert API"
        );

        let mut request = self
            .http
            .post(&api_url)
            .timeout(self.timeout_for(operation))
            .json(fields);
        if let Some(key) = &self.auth_key {
            request = request.header(AUTH_HEADER, key);
        }

        let result = match request.send().await {
            Ok(response) => Self::read_response(response, &api_url).await,
            Err(e) => Err(UpstreamError::from_reqwest(e, &api_url)),
        };

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind().as_str(),
        };
        metrics::record_upstream_call(operation.as_str(), outcome, start);

        match &result {
            Ok(_) => tracing::info!(
                action = %operation,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Cert API response received"
            ),
            Err(e) => tracing::error!(
                action = %operation,
                api_url = %api_url,
                error_type = e.kind().as_str(),
                error = %e,
                "Cert API call failed"
            ),
        }

        result
    }

    async fn read_response(
        response: reqwest::Response,
        api_url: &str,
    ) -> Result<Value, UpstreamError> {
        let status = response.status();

        if !status.is_success() {
            let response_body = match response.bytes().await {
                Ok(bytes) => serde_json::from_slice(&bytes).ok(),
                Err(_) => None,
            };
            return Err(UpstreamError::Http {
                status_code: status.as_u16(),
                message: format!("{} for url: {}", status, api_url),
                api_url: api_url.to_string(),
                response_body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| UpstreamError::from_reqwest(e, api_url))
    }
}

impl std::fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("base_url", &self.base_url)
            .field("auth_key", &self.auth_key.as_ref().map(|_| "<redacted>"))
            .field("add_timeout", &self.add_timeout)
            .field("reject_timeout", &self.reject_timeout)
            .finish()
    }
}
