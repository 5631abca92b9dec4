//! Admin API integration tests
//!
//! Tests for /healthz, /status, /reload, /check, /stats, /messages, /metrics
//! endpoints.
//!
//! Run with: cargo test --test admin_api -- --test-threads=1

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use coreguard::admin::{AdminServer, AdminState};
use coreguard::bootstrap::Shutdown;
use coreguard::client::{AdminAction, MockAdminClient, MockReply};
use coreguard::config::AdminConfig;
use coreguard::identity::CoreName;
use coreguard::monitor::{CoreStatusMonitor, ManualClock};
use coreguard::notify::{SharedNotifier, TracingNotifier};
use coreguard::reload::{CoreReloader, ReloadPolicy};
use coreguard::state::MemoryStateStore;

/// Port allocator for tests
static PORT: AtomicU16 = AtomicU16::new(19300);

fn next_port() -> u16 {
    PORT.fetch_add(1, Ordering::SeqCst)
}

/// Health response
#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    version: String,
    core: String,
}

/// Status response
#[derive(Debug, Deserialize)]
struct StatusResponse {
    core: String,
    state: String,
    last_status_check: u64,
    last_status_check_at: Option<String>,
    snapshot: Option<serde_json::Value>,
}

/// Reload response
#[derive(Debug, Deserialize)]
struct ReloadResponse {
    success: bool,
    attempts: usize,
    errors: Vec<String>,
    reload_count: u64,
}

#[derive(Debug, Deserialize)]
struct MessageEntry {
    level: String,
    text: String,
}

/// Test fixture that starts the admin server on a unique port
struct TestServer {
    handle: tokio::task::JoinHandle<()>,
    shutdown: Arc<Shutdown>,
    mock: Arc<MockAdminClient>,
    base_url: String,
}

impl TestServer {
    async fn start(mock: MockAdminClient) -> Self {
        let port = next_port();
        let config = AdminConfig {
            address: format!("127.0.0.1:{}", port).parse().unwrap(),
            ..Default::default()
        };

        let mock = Arc::new(mock);
        let notifier = Arc::new(TracingNotifier::new(16));
        let shared: SharedNotifier = notifier.clone();

        let reloader =
            CoreReloader::new(mock.clone(), shared.clone()).with_policy(ReloadPolicy::immediate());
        let monitor = CoreStatusMonitor::new(
            CoreName::new("main").unwrap(),
            mock.clone(),
            Arc::new(MemoryStateStore::new()),
            shared.clone(),
        )
        .with_clock(Arc::new(ManualClock::new(1_700_000_000)));

        let state = AdminState::new(
            mock.clone(),
            shared,
            reloader,
            Arc::new(monitor),
            notifier.queue(),
        );

        let shutdown = Shutdown::new();
        let server = AdminServer::new(&config, Arc::new(state), shutdown.clone());
        let handle = tokio::spawn(async move {
            let _ = server.run().await;
        });

        // Wait for server to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        Self {
            handle,
            shutdown,
            mock,
            base_url: format!("http://127.0.0.1:{}", port),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn messages(&self) -> Vec<MessageEntry> {
        reqwest::get(self.url("/messages"))
            .await
            .expect("request failed")
            .json()
            .await
            .expect("invalid json")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
        self.handle.abort();
    }
}

#[tokio::test]
async fn test_healthz_returns_healthy() {
    let server = TestServer::start(MockAdminClient::healthy("main")).await;

    let resp = reqwest::get(server.url("/healthz"))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: HealthResponse = resp.json().await.expect("invalid json");
    assert_eq!(body.status, "healthy");
    assert_eq!(body.core, "main");
    assert!(!body.version.is_empty());
    assert_eq!(server.mock.total_calls(), 0);
}

#[tokio::test]
async fn test_status_before_any_check() {
    let server = TestServer::start(MockAdminClient::healthy("main")).await;

    let resp = reqwest::get(server.url("/status"))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: StatusResponse = resp.json().await.expect("invalid json");
    assert_eq!(body.core, "main");
    assert_eq!(body.state, "idle");
    assert_eq!(body.last_status_check, 0);
    assert!(body.last_status_check_at.is_none());
    assert!(body.snapshot.is_none());
}

#[tokio::test]
async fn test_forced_check_updates_status() {
    let server = TestServer::start(MockAdminClient::healthy("main")).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/check?force=true"))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = resp.json().await.expect("invalid json");
    assert_eq!(body["state"], "validated");

    let body: StatusResponse = client
        .get(server.url("/status"))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("invalid json");
    assert_eq!(body.state, "validated");
    assert_eq!(body.last_status_check, 1_700_000_000);
    assert_eq!(
        body.last_status_check_at.as_deref(),
        Some("2023-11-14T22:13:20+00:00")
    );
    assert_eq!(body.snapshot.unwrap()["core"]["name"], "main");
}

#[tokio::test]
async fn test_reload_success() {
    let server = TestServer::start(MockAdminClient::healthy("main")).await;

    let resp = reqwest::Client::new()
        .post(server.url("/reload"))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: ReloadResponse = resp.json().await.expect("invalid json");
    assert!(body.success);
    assert_eq!(body.attempts, 1);
    assert!(body.errors.is_empty());
    assert_eq!(body.reload_count, 1);

    let messages = server.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].level, "status");
    assert_eq!(
        messages[0].text,
        "Core configuration has been reloaded successfully."
    );

    // Drained
    assert!(server.messages().await.is_empty());
}

#[tokio::test]
async fn test_reload_failure_is_bad_gateway() {
    let server = TestServer::start(
        MockAdminClient::healthy("main")
            .with_fallback(AdminAction::Reload, MockReply::reload_failed(500, "broken")),
    )
    .await;

    let resp = reqwest::Client::new()
        .post(server.url("/reload"))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let body: ReloadResponse = resp.json().await.expect("invalid json");
    assert!(!body.success);
    assert_eq!(body.attempts, 3);
    assert_eq!(body.errors.len(), 3);
    assert_eq!(server.mock.calls(AdminAction::Reload), 3);
}

#[tokio::test]
async fn test_stats_failure_queues_message() {
    let server = TestServer::start(MockAdminClient::new()).await;

    let resp = reqwest::get(server.url("/stats"))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = resp.json().await.expect("invalid json");
    assert!(body["pending_docs"].is_null());

    let messages = server.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].level, "error");
    assert_eq!(messages[0].text, "Unable to get stats from server!");
}

#[tokio::test]
async fn test_metrics_disabled_without_exporter() {
    let server = TestServer::start(MockAdminClient::healthy("main")).await;

    let resp = reqwest::get(server.url("/metrics"))
        .await
        .expect("request failed");

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
