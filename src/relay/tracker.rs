//! In-memory request tracking.
//!
//! # Responsibilities
//! - Own the id → record mapping; the only writer of records
//! - Apply partial updates as field-level merges
//! - Serve full-record snapshots to the status endpoint
//!
//! # Design Decisions
//! - `DashMap` shards the lock across ids
//! - Status only moves forward: processing → completed | failed
//! - Webhook status is recorded only after the outcome is known
//! - No capacity bound; eviction is the sweeper's job (see `sweeper.rs`)

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::relay::types::{ErrorDetail, RequestRecord, RequestStatus, WebhookStatus};

/// Errors returned by tracker operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("Request {0} not found")]
    NotFound(Uuid),

    #[error("Request {0} is already tracked")]
    AlreadyExists(Uuid),

    #[error("Request {id}: {reason}")]
    InvalidUpdate { id: Uuid, reason: String },
}

/// A partial update merged into an existing record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordUpdate {
    /// Upstream succeeded; sets `status`, `result` and `completed_at`.
    Completed(Value),
    /// Upstream failed; sets `status`, `error` and `completed_at`.
    Failed(ErrorDetail),
    /// Delivery sequence finished; sets `webhook_status`.
    Webhook(WebhookStatus),
}

impl RecordUpdate {
    fn apply(self, record: &mut RequestRecord) -> Result<(), TrackerError> {
        let id = record.request_id;
        let invalid = |reason: String| TrackerError::InvalidUpdate { id, reason };

        match self {
            RecordUpdate::Completed(result) => {
                if record.status.is_terminal() {
                    return Err(invalid(format!("cannot move from {} to completed", record.status)));
                }
                record.status = RequestStatus::Completed;
                record.completed_at = Some(Utc::now());
                record.result = Some(result);
                record.error = None;
            }
            RecordUpdate::Failed(error) => {
                if record.status.is_terminal() {
                    return Err(invalid(format!("cannot move from {} to failed", record.status)));
                }
                record.status = RequestStatus::Failed;
                record.completed_at = Some(Utc::now());
                record.error = Some(error);
                record.result = None;
            }
            RecordUpdate::Webhook(status) => {
                if !record.status.is_terminal() {
                    return Err(invalid("webhook status before outcome".to_string()));
                }
                record.webhook_status = Some(status);
            }
        }
        Ok(())
    }
}

/// Thread-safe store of request records.
#[derive(Clone, Default)]
pub struct RequestTracker {
    inner: Arc<DashMap<Uuid, RequestRecord>>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new record. Each id may be created once.
    pub fn create(&self, record: RequestRecord) -> Result<(), TrackerError> {
        match self.inner.entry(record.request_id) {
            Entry::Occupied(_) => Err(TrackerError::AlreadyExists(record.request_id)),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    /// Merge `update` into the record and return the new snapshot.
    ///
    /// A rejected update leaves the record untouched.
    pub fn update(&self, id: Uuid, update: RecordUpdate) -> Result<RequestRecord, TrackerError> {
        let mut entry = self.inner.get_mut(&id).ok_or(TrackerError::NotFound(id))?;
        update.apply(entry.value_mut())?;
        Ok(entry.value().clone())
    }

    /// Snapshot of a record.
    pub fn get(&self, id: Uuid) -> Result<RequestRecord, TrackerError> {
        self.inner
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or(TrackerError::NotFound(id))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Remove finished records whose `completed_at` is before `cutoff`.
    /// Returns how many were removed.
    ///
    /// A record is finished once both the outcome and the webhook status are
    /// recorded; records still processing or still delivering are kept.
    pub fn evict_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut evicted = 0;
        self.inner.retain(|_, record| {
            let expired = record.webhook_status.is_some()
                && record.completed_at.is_some_and(|at| at < cutoff);
            let keep = !expired;
            if !keep {
                evicted += 1;
            }
            keep
        });
        evicted
    }
}
