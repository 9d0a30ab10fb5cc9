//! Relay orchestration.
//!
//! # Responsibilities
//! - Assign request ids and create tracker records
//! - Schedule the upstream call + callback delivery on the background runner
//! - Record every phase transition in the tracker
//!
//! # Design Decisions
//! - The record exists before the job is scheduled, so an id handed to a
//!   caller is always visible to the status endpoint
//! - Add and reject share one asynchronous workflow
//! - The workflow knows nothing about the concurrency substrate; it only
//!   sees `BackgroundRunner`

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::observability::metrics;
use crate::relay::delivery::WebhookDelivery;
use crate::relay::payload::CallbackPayload;
use crate::relay::pool::BackgroundRunner;
use crate::relay::tracker::{RecordUpdate, RequestTracker, TrackerError};
use crate::relay::types::{CertOperation, RelayRequest, RequestRecord, WebhookStatus};
use crate::relay::upstream::UpstreamClient;

/// Returned to the inbound caller once a request is queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Acceptance {
    pub request_id: Uuid,
    pub domain: String,
}

/// Accepts relay requests and runs them in the background.
#[derive(Clone)]
pub struct Relay {
    tracker: RequestTracker,
    upstream: UpstreamClient,
    delivery: WebhookDelivery,
    runner: Arc<dyn BackgroundRunner>,
}

impl Relay {
    pub fn new(
        tracker: RequestTracker,
        upstream: UpstreamClient,
        delivery: WebhookDelivery,
        runner: Arc<dyn BackgroundRunner>,
    ) -> Self {
        Self {
            tracker,
            upstream,
            delivery,
            runner,
        }
    }

    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    /// Track `request` and schedule its processing. Returns without waiting
    /// for the upstream call.
    pub fn accept(
        &self,
        action: CertOperation,
        request: RelayRequest,
    ) -> Result<Acceptance, TrackerError> {
        let request_id = Uuid::new_v4();
        self.tracker
            .create(RequestRecord::processing(request_id, action, &request))?;

        metrics::record_relay_request(action.as_str());
        metrics::record_tracked_requests(self.tracker.len());

        tracing::info!(
            request_id = %request_id,
            action = %action,
            domain = %request.fields.domain,
            callback_url = %request.callback_url,
            "Request queued for processing"
        );

        let acceptance = Acceptance {
            request_id,
            domain: request.fields.domain.clone(),
        };

        let relay = self.clone();
        self.runner.run(Box::pin(async move {
            relay.process(request_id, action, request).await;
        }));

        Ok(acceptance)
    }

    /// Run the upstream call and deliver the outcome. The record for
    /// `request_id` must already exist.
    pub async fn process(
        &self,
        request_id: Uuid,
        action: CertOperation,
        request: RelayRequest,
    ) -> WebhookStatus {
        let domain = request.fields.domain.as_str();
        tracing::info!(
            request_id = %request_id,
            action = %action,
            domain = %domain,
            "Processing request"
        );

        let payload = match self.upstream.submit(action, &request.fields).await {
            Ok(body) => {
                self.record(request_id, RecordUpdate::Completed(body.clone()));
                CallbackPayload::success(action, request_id, domain, body)
            }
            Err(err) => {
                self.record(request_id, RecordUpdate::Failed(err.detail()));
                CallbackPayload::failure(action, request_id, domain, &err)
            }
        };

        let webhook_status = if self
            .delivery
            .deliver(request.callback_url.as_str(), &payload)
            .await
        {
            WebhookStatus::Sent
        } else {
            WebhookStatus::Failed
        };
        self.record(request_id, RecordUpdate::Webhook(webhook_status));

        tracing::info!(
            request_id = %request_id,
            action = %action,
            webhook_status = ?webhook_status,
            "Request finished"
        );
        webhook_status
    }

    fn record(&self, request_id: Uuid, update: RecordUpdate) {
        if let Err(e) = self.tracker.update(request_id, update) {
            tracing::error!(request_id = %request_id, error = %e, "Failed to update request record");
        }
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("upstream", &self.upstream)
            .field("delivery", &self.delivery.policy())
            .field("tracked", &self.tracker.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpstreamConfig;
    use crate::relay::delivery::DeliveryPolicy;
    use crate::relay::pool::Job;
    use crate::relay::types::{CertFields, ErrorKind, RequestStatus};
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;
    use url::Url;

    /// Holds jobs instead of running them.
    #[derive(Default)]
    struct ParkedRunner {
        jobs: Mutex<Vec<Job>>,
    }

    impl BackgroundRunner for ParkedRunner {
        fn run(&self, job: Job) {
            self.jobs.lock().unwrap().push(job);
        }
    }

    fn unreachable_addr() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    fn relay(runner: Arc<dyn BackgroundRunner>) -> Relay {
        let http = reqwest::Client::new();
        let upstream = UpstreamClient::new(
            http.clone(),
            &UpstreamConfig {
                base_url: unreachable_addr(),
                ..UpstreamConfig::default()
            },
        );
        let delivery = WebhookDelivery::new(
            http,
            DeliveryPolicy {
                max_attempts: 1,
                timeout: Duration::from_millis(200),
                retry_delay: Duration::from_millis(0),
            },
        );
        Relay::new(RequestTracker::new(), upstream, delivery, runner)
    }

    fn request() -> RelayRequest {
        RelayRequest {
            callback_url: Url::parse(&format!("{}/callback", unreachable_addr())).unwrap(),
            fields: CertFields {
                cname_id: json!("1"),
                domain: "a.com".into(),
                email: "e@a.com".into(),
                user_id: json!("42"),
            },
        }
    }

    #[tokio::test]
    async fn test_record_exists_before_job_runs() {
        let runner = Arc::new(ParkedRunner::default());
        let relay = relay(runner.clone());

        let acceptance = relay.accept(CertOperation::Add, request()).unwrap();

        assert_eq!(acceptance.domain, "a.com");
        assert_eq!(runner.jobs.lock().unwrap().len(), 1);
        let record = relay.tracker().get(acceptance.request_id).unwrap();
        assert_eq!(record.status, RequestStatus::Processing);
        assert_eq!(record.action, CertOperation::Add);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_fails_request() {
        let runner = Arc::new(ParkedRunner::default());
        let relay = relay(runner.clone());

        let acceptance = relay.accept(CertOperation::Reject, request()).unwrap();
        let job = runner.jobs.lock().unwrap().pop().unwrap();
        job.await;

        let record = relay.tracker().get(acceptance.request_id).unwrap();
        assert_eq!(record.status, RequestStatus::Failed);
        assert_eq!(record.error.unwrap().error_type, ErrorKind::RequestError);
        assert!(record.completed_at.is_some());
        assert_eq!(record.webhook_status, Some(WebhookStatus::Failed));
    }
}
