//! Callback webhook delivery.
//!
//! # Responsibilities
//! - POST the outcome payload to the caller's callback URL
//! - Retry on timeout, transport failure or non-2xx status
//! - Report the final outcome as a plain bool
//!
//! # Design Decisions
//! - Bounded loop, attempts strictly sequential
//! - Fixed delay before every retry (no exponential growth, no jitter)
//! - Exhausted retries are logged, never escalated

use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::config::WebhookConfig;
use crate::observability::metrics;

/// Retry policy for callback delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Pause before each retry.
    pub retry_delay: Duration,
}

impl From<&WebhookConfig> for DeliveryPolicy {
    fn from(config: &WebhookConfig) -> Self {
        Self {
            max_attempts: config.retry_count,
            timeout: Duration::from_secs(config.timeout_secs),
            retry_delay: Duration::from_secs(config.retry_delay_secs),
        }
    }
}

/// Why a single attempt failed.
#[derive(Debug, Error)]
enum AttemptError {
    #[error("timed out")]
    Timeout,
    #[error("receiver returned {0}")]
    Status(StatusCode),
    #[error("{0}")]
    Transport(String),
}

impl AttemptError {
    fn label(&self) -> &'static str {
        match self {
            AttemptError::Timeout => "timeout",
            AttemptError::Status(_) => "http_error",
            AttemptError::Transport(_) => "transport_error",
        }
    }
}

/// Delivers callback payloads with bounded retries.
#[derive(Clone)]
pub struct WebhookDelivery {
    http: reqwest::Client,
    policy: DeliveryPolicy,
}

impl WebhookDelivery {
    pub fn new(http: reqwest::Client, policy: DeliveryPolicy) -> Self {
        Self { http, policy }
    }

    pub fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    /// Deliver `payload` to `callback_url`.
    ///
    /// Returns `true` once an attempt gets a 2xx answer and `false` after
    /// `max_attempts` failed attempts.
    pub async fn deliver<T>(&self, callback_url: &str, payload: &T) -> bool
    where
        T: Serialize + ?Sized,
    {
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.policy.retry_delay).await;
            }

            tracing::info!(callback_url = %callback_url, attempt, "Sending webhook");

            match self.attempt(callback_url, payload).await {
                Ok(status) => {
                    metrics::record_webhook_attempt("success");
                    metrics::record_webhook_delivery(true);
                    tracing::info!(
                        callback_url = %callback_url,
                        attempt,
                        status = %status,
                        "Webhook sent successfully"
                    );
                    return true;
                }
                Err(e) => {
                    metrics::record_webhook_attempt(e.label());
                    tracing::warn!(
                        callback_url = %callback_url,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Webhook attempt failed"
                    );
                }
            }
        }

        metrics::record_webhook_delivery(false);
        tracing::error!(
            callback_url = %callback_url,
            attempts = max_attempts,
            "Failed to send webhook, retries exhausted"
        );
        false
    }

    async fn attempt<T>(&self, callback_url: &str, payload: &T) -> Result<StatusCode, AttemptError>
    where
        T: Serialize + ?Sized,
    {
        let response = self
            .http
            .post(callback_url)
            .timeout(self.policy.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AttemptError::Timeout
                } else {
                    AttemptError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(status)
        } else {
            Err(AttemptError::Status(status))
        }
    }
}
