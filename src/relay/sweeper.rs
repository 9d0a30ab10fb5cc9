//! Tracker retention sweeps.
//!
//! # Responsibilities
//! - Periodically evict finished records older than the retention window
//! - Never evict a record whose callback is still being delivered
//! - Stop when shutdown is signalled

use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::TrackerConfig;
use crate::observability::metrics;
use crate::relay::tracker::RequestTracker;

pub struct TrackerSweeper {
    tracker: RequestTracker,
    retention: Duration,
    interval: Duration,
}

impl TrackerSweeper {
    /// Returns `None` when retention is disabled.
    pub fn from_config(tracker: RequestTracker, config: &TrackerConfig) -> Option<Self> {
        let retention = config.retention()?;
        Some(Self {
            tracker,
            retention,
            interval: Duration::from_secs(config.sweep_interval_secs.max(1)),
        })
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            retention_secs = self.retention.as_secs(),
            interval_secs = self.interval.as_secs(),
            "Tracker sweeper starting"
        );

        let mut ticker = time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Tracker sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Evict expired records now. Returns the number removed.
    pub fn sweep_once(&self) -> usize {
        let Ok(window) = chrono::Duration::from_std(self.retention) else {
            return 0;
        };
        let evicted = self.tracker.evict_finished_before(Utc::now() - window);
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.tracker.len(), "Evicted finished requests");
        }
        metrics::record_tracked_requests(self.tracker.len());
        evicted
    }
}
