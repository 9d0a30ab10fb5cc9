//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::IntoResponse,
    routing::post,
    Router,
};
use serde_json::Value;
use tokio::net::TcpListener;

use cert_webhook_relay::config::RelayConfig;
use cert_webhook_relay::http::HttpServer;
use cert_webhook_relay::lifecycle::Shutdown;

/// A request captured by one of the mock servers.
#[derive(Debug, Clone)]
pub struct Captured {
    pub at: Instant,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Value,
}

/// What a mock server answers with.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl MockReply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Script = Arc<dyn Fn(usize) -> MockReply + Send + Sync>;

#[derive(Clone)]
struct MockState {
    captured: Arc<Mutex<Vec<Captured>>>,
    script: Script,
}

/// Handle to a running mock server.
#[derive(Clone)]
pub struct MockServer {
    pub addr: SocketAddr,
    captured: Arc<Mutex<Vec<Captured>>>,
}

impl MockServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.captured.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.captured.lock().unwrap().len()
    }
}

async fn mock_handler(
    State(state): State<MockState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let index = {
        let mut captured = state.captured.lock().unwrap();
        captured.push(Captured {
            at: Instant::now(),
            path: uri.path().to_string(),
            headers,
            body: serde_json::from_slice(&body).unwrap_or(Value::Null),
        });
        captured.len() - 1
    };

    let reply = (state.script)(index);
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    (
        StatusCode::from_u16(reply.status).unwrap(),
        [("content-type", "application/json")],
        reply.body,
    )
}

/// Start a mock server whose reply to the n-th request (0-based) is
/// decided by `script`. Any POST path is accepted.
pub async fn start_mock<F>(script: F) -> MockServer
where
    F: Fn(usize) -> MockReply + Send + Sync + 'static,
{
    let captured = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        captured: captured.clone(),
        script: Arc::new(script),
    };
    let router = Router::new()
        .route("/{*path}", post(mock_handler))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    MockServer { addr, captured }
}

/// Mock that answers every request the same way.
pub async fn start_fixed_mock(reply: MockReply) -> MockServer {
    start_mock(move |_| reply.clone()).await
}

/// An address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Config pointing at `cert_api` with fast webhook retries.
pub fn relay_config(cert_api: &str) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.base_url = cert_api.to_string();
    config.upstream.auth_key = "test-key".to_string();
    config.webhook.timeout_secs = 2;
    config.webhook.retry_count = 3;
    config.webhook.retry_delay_secs = 1;
    config
}

/// A relay running on an ephemeral port.
pub struct RunningRelay {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub client: reqwest::Client,
}

impl RunningRelay {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("relay unreachable")
    }

    pub async fn status(&self, request_id: &str) -> reqwest::Response {
        self.client
            .get(self.url(&format!("/status/{}", request_id)))
            .send()
            .await
            .expect("relay unreachable")
    }

    /// Poll `/status/{id}` until `done` holds for the record.
    pub async fn wait_for_record<F>(&self, request_id: &str, done: F) -> Value
    where
        F: Fn(&Value) -> bool,
    {
        let mut last = Value::Null;
        for _ in 0..200 {
            let res = self.status(request_id).await;
            if res.status() == 200 {
                last = res.json().await.unwrap();
                if done(&last) {
                    return last;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("record {} never reached expected state, last: {}", request_id, last);
    }
}

pub async fn start_relay(config: RelayConfig) -> RunningRelay {
    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    RunningRelay {
        addr,
        shutdown,
        client,
    }
}

/// Wait until `check` holds, polling every 20ms for up to `timeout`.
pub async fn wait_for<F>(timeout: Duration, check: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

pub fn cert_body(callback_url: &str) -> Value {
    serde_json::json!({
        "callback_url": callback_url,
        "cname_id": "1",
        "domain": "a.com",
        "email": "e@a.com",
        "user_id": "42"
    })
}
