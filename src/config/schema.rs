//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the webhook relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Certificate API the relay forwards to.
    pub upstream: UpstreamConfig,

    /// Callback delivery settings.
    pub webhook: WebhookConfig,

    /// Background worker pool settings.
    pub workers: WorkerConfig,

    /// Request tracker retention.
    pub tracker: TrackerConfig,

    /// Timeout configuration for inbound requests.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Upstream certificate API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL; operation paths are appended to it.
    pub base_url: String,

    /// Sent as `X-AUTH-KEY` when non-empty.
    pub auth_key: String,

    /// Timeout for the add call in seconds. Certificate generation is slow.
    pub add_timeout_secs: u64,

    /// Timeout for the reject call in seconds.
    pub reject_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://103.143.207.21:5000".to_string(),
            auth_key: String::new(),
            add_timeout_secs: 60,
            reject_timeout_secs: 30,
        }
    }
}

/// Webhook delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,

    /// Total number of attempts, including the first one.
    pub retry_count: u32,

    /// Fixed delay between attempts in seconds.
    pub retry_delay_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            retry_count: 3,
            retry_delay_secs: 5,
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Maximum number of relay jobs running at once. Extra jobs queue.
    pub max_concurrent: usize,

    /// How long shutdown waits for queued and running jobs, in seconds.
    pub drain_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            drain_timeout_secs: 30,
        }
    }
}

/// Request tracker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Finished records older than this are evicted. 0 keeps them forever.
    pub retention_secs: u64,

    /// Interval between eviction sweeps in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            retention_secs: 0,
            sweep_interval_secs: 60,
        }
    }
}

impl TrackerConfig {
    /// Retention window, `None` when eviction is disabled.
    pub fn retention(&self) -> Option<Duration> {
        (self.retention_secs > 0).then(|| Duration::from_secs(self.retention_secs))
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 64 * 1024, // 64KB
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = RelayConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8000");
        assert_eq!(config.webhook.timeout_secs, 30);
        assert_eq!(config.webhook.retry_count, 3);
        assert_eq!(config.webhook.retry_delay_secs, 5);
        assert_eq!(config.upstream.add_timeout_secs, 60);
        assert_eq!(config.upstream.reject_timeout_secs, 30);
        assert_eq!(config.workers.max_concurrent, 10);
        assert!(config.tracker.retention().is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: RelayConfig = toml::from_str(
            r#"
            [webhook]
            retry_count = 5

            [tracker]
            retention_secs = 3600
            "#,
        )
        .unwrap();

        assert_eq!(config.webhook.retry_count, 5);
        assert_eq!(config.webhook.retry_delay_secs, 5);
        assert_eq!(config.tracker.retention(), Some(Duration::from_secs(3600)));
        assert_eq!(config.upstream.add_timeout_secs, 60);
    }
}
