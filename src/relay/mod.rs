//! Request relay subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request (validated by http::request)
//!     → orchestrator.rs (assign id, tracker.create, schedule job)
//!     → pool.rs (bounded background execution)
//!     → upstream.rs (POST to cert API, classify errors)
//!     → tracker.rs (completed | failed)
//!     → delivery.rs (POST callback, fixed-delay retries)
//!     → tracker.rs (webhook_status)
//!
//! sweeper.rs runs beside this, evicting old finished records when
//! retention is configured.
//! ```
//!
//! # Design Decisions
//! - The tracker is the single owner and writer of request state
//! - Only callback delivery retries; upstream errors are terminal
//! - Delivery is best-effort: at most N attempts

pub mod delivery;
pub mod orchestrator;
pub mod payload;
pub mod pool;
pub mod sweeper;
pub mod tracker;
pub mod types;
pub mod upstream;

pub use delivery::{DeliveryPolicy, WebhookDelivery};
pub use orchestrator::{Acceptance, Relay};
pub use payload::{CallbackPayload, CallbackStatus};
pub use pool::{BackgroundRunner, Job, WorkerPool};
pub use sweeper::TrackerSweeper;
pub use tracker::{RecordUpdate, RequestTracker, TrackerError};
pub use types::{
    CertFields, CertOperation, ErrorDetail, ErrorKind, RelayRequest, RequestRecord,
    RequestStatus, WebhookStatus,
};
pub use upstream::{UpstreamClient, UpstreamError};
