//! Callback delivery retry behavior against live receivers.

use std::time::Duration;

use serde_json::json;

use cert_webhook_relay::relay::{DeliveryPolicy, WebhookDelivery};

mod common;
use common::{start_fixed_mock, start_mock, MockReply};

fn delivery(max_attempts: u32, timeout: Duration, retry_delay: Duration) -> WebhookDelivery {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    WebhookDelivery::new(
        http,
        DeliveryPolicy {
            max_attempts,
            timeout,
            retry_delay,
        },
    )
}

#[tokio::test]
async fn test_slow_receiver_gets_exactly_n_attempts() {
    let receiver = start_fixed_mock(
        MockReply::json(200, json!({})).delayed(Duration::from_secs(2)),
    )
    .await;
    let delay = Duration::from_millis(200);
    let delivery = delivery(3, Duration::from_millis(200), delay);

    let delivered = delivery
        .deliver(&receiver.url("/hook"), &json!({"status": "success"}))
        .await;
    assert!(!delivered);

    let attempts = receiver.requests();
    assert_eq!(attempts.len(), 3);
    for pair in attempts.windows(2) {
        assert!(pair[1].at.duration_since(pair[0].at) >= delay);
    }
}

#[tokio::test]
async fn test_recovers_after_server_errors() {
    let receiver = start_mock(|n| {
        if n < 2 {
            MockReply::text(500, "boom")
        } else {
            MockReply::json(200, json!({}))
        }
    })
    .await;
    let delivery = delivery(3, Duration::from_secs(1), Duration::from_millis(50));

    let delivered = delivery
        .deliver(&receiver.url("/hook"), &json!({"status": "success"}))
        .await;
    assert!(delivered);
    assert_eq!(receiver.count(), 3);
    assert_eq!(receiver.requests()[2].body, json!({"status": "success"}));
}

#[tokio::test]
async fn test_single_attempt_policy() {
    let receiver = start_fixed_mock(MockReply::text(503, "down")).await;
    let delivery = delivery(1, Duration::from_secs(1), Duration::from_secs(5));

    let start = std::time::Instant::now();
    let delivered = delivery
        .deliver(&receiver.url("/hook"), &json!({}))
        .await;
    assert!(!delivered);
    assert_eq!(receiver.count(), 1);
    // No retry delay after the last attempt.
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_redirect_is_not_success() {
    let receiver = start_fixed_mock(MockReply::text(304, "")).await;
    let delivery = delivery(2, Duration::from_secs(1), Duration::from_millis(10));

    assert!(!delivery.deliver(&receiver.url("/hook"), &json!({})).await);
    assert_eq!(receiver.count(), 2);
}
