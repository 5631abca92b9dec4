//! Scripted admin client for testing without a search server.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::{debug, trace};

use super::{AdminClient, ClientError};
use crate::identity::CoreName;

/// Admin operation, used to script replies and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminAction {
    Reload,
    Status,
    Mbeans,
    Luke,
    File,
    System,
}

/// A scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Successful JSON body
    Json(Value),
    /// Successful raw body (file views)
    Text(String),
    /// Failure
    Error(ClientError),
}

impl MockReply {
    /// A successful RELOAD acknowledgement.
    pub fn reload_ok() -> Self {
        Self::Json(json!({"responseHeader": {"status": 0, "QTime": 12}}))
    }

    /// A server-side RELOAD failure.
    pub fn reload_failed(status: u16, message: &str) -> Self {
        Self::Error(ClientError::AdminOperation {
            status,
            message: message.to_string(),
        })
    }

    /// A STATUS body confirming `core` is active.
    pub fn status_active(core: &str, uptime_ms: u64) -> Self {
        Self::Json(json!({
            "responseHeader": {"status": 0},
            "status": {
                core: {
                    "name": core,
                    "uptime": uptime_ms,
                    "index": {"numDocs": 0}
                }
            }
        }))
    }

    /// A STATUS body for a core that is not loaded.
    pub fn status_missing(core: &str) -> Self {
        Self::Json(json!({"responseHeader": {"status": 0}, "status": {core: {}}}))
    }

    /// A network failure.
    pub fn transport(message: &str) -> Self {
        Self::Error(ClientError::Transport(message.to_string()))
    }
}

/// Admin client returning scripted replies.
///
/// Each action has a queue of one-shot replies and a fallback used once the
/// queue is empty.
#[derive(Debug)]
pub struct MockAdminClient {
    queued: Mutex<HashMap<AdminAction, VecDeque<MockReply>>>,
    fallback: Mutex<HashMap<AdminAction, MockReply>>,
    calls: Mutex<HashMap<AdminAction, u64>>,
    total_calls: AtomicU64,
    latency: Duration,
}

impl MockAdminClient {
    /// Create a mock where every action fails until scripted.
    pub fn new() -> Self {
        Self {
            queued: Mutex::new(HashMap::new()),
            fallback: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            total_calls: AtomicU64::new(0),
            latency: Duration::ZERO,
        }
    }

    /// Create a mock for a healthy server hosting `core`.
    pub fn healthy(core: &str) -> Self {
        Self::new()
            .with_fallback(AdminAction::Reload, MockReply::reload_ok())
            .with_fallback(AdminAction::Status, MockReply::status_active(core, 60_000))
            .with_fallback(
                AdminAction::File,
                MockReply::Text(
                    r#"<?xml version="1.0"?><schema name="drupal" version="1.6"><types/><fields/></schema>"#
                        .to_string(),
                ),
            )
            .with_fallback(
                AdminAction::System,
                MockReply::Json(json!({"core": {"schema": "drupal-8.x", "host": "mock"}})),
            )
    }

    /// Set the reply used when no one-shot reply is queued.
    pub fn with_fallback(self, action: AdminAction, reply: MockReply) -> Self {
        self.set_fallback(action, reply);
        self
    }

    /// Queue one-shot replies, consumed in order.
    pub fn with_replies(self, action: AdminAction, replies: Vec<MockReply>) -> Self {
        for reply in replies {
            self.push_reply(action, reply);
        }
        self
    }

    /// Set simulated latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn set_fallback(&self, action: AdminAction, reply: MockReply) {
        lock(&self.fallback).insert(action, reply);
    }

    pub fn push_reply(&self, action: AdminAction, reply: MockReply) {
        lock(&self.queued).entry(action).or_default().push_back(reply);
    }

    /// Number of calls made for an action.
    pub fn calls(&self, action: AdminAction) -> u64 {
        lock(&self.calls).get(&action).copied().unwrap_or(0)
    }

    /// Number of calls across all actions.
    pub fn total_calls(&self) -> u64 {
        self.total_calls.load(Ordering::Relaxed)
    }

    async fn respond(&self, action: AdminAction) -> MockReply {
        *lock(&self.calls).entry(action).or_insert(0) += 1;
        self.total_calls.fetch_add(1, Ordering::Relaxed);

        if !self.latency.is_zero() {
            trace!(latency_ms = self.latency.as_millis() as u64, "simulating latency");
            sleep(self.latency).await;
        }

        let queued = lock(&self.queued)
            .get_mut(&action)
            .and_then(VecDeque::pop_front);

        let reply = queued
            .or_else(|| lock(&self.fallback).get(&action).cloned())
            .unwrap_or_else(|| {
                MockReply::Error(ClientError::Transport(format!(
                    "no mock reply scripted for {:?}",
                    action
                )))
            });

        debug!(?action, "mock admin reply");
        reply
    }

    async fn json(&self, action: AdminAction) -> Result<Value, ClientError> {
        match self.respond(action).await {
            MockReply::Json(value) => Ok(value),
            MockReply::Text(text) => Ok(serde_json::from_str(&text)?),
            MockReply::Error(e) => Err(e),
        }
    }
}

impl Default for MockAdminClient {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl AdminClient for MockAdminClient {
    async fn reload(&self, _core: &CoreName) -> Result<Value, ClientError> {
        self.json(AdminAction::Reload).await
    }

    async fn core_status(&self, _core: &CoreName) -> Result<Value, ClientError> {
        self.json(AdminAction::Status).await
    }

    async fn mbeans_stats(&self) -> Result<Value, ClientError> {
        self.json(AdminAction::Mbeans).await
    }

    async fn luke_stats(&self) -> Result<Value, ClientError> {
        self.json(AdminAction::Luke).await
    }

    async fn view_file(&self, _name: Option<&str>) -> Result<String, ClientError> {
        match self.respond(AdminAction::File).await {
            MockReply::Text(text) => Ok(text),
            MockReply::Json(value) => Ok(value.to_string()),
            MockReply::Error(e) => Err(e),
        }
    }

    async fn server_info(&self, _core: &CoreName) -> Result<Value, ClientError> {
        self.json(AdminAction::System).await
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
