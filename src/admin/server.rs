//! Admin HTTP server.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing::info;

use crate::bootstrap::Shutdown;
use crate::client::SharedAdminClient;
use crate::config::AdminConfig;
use crate::monitor::CoreStatusMonitor;
use crate::notify::{MessageQueue, SharedNotifier};
use crate::reload::CoreReloader;
use crate::telemetry::Metrics;

use super::handlers::{
    check_handler, health_handler, messages_handler, metrics_handler, reload_handler,
    stats_handler, status_handler,
};

/// Admin server state.
pub struct AdminState {
    start_time: Instant,
    pub(crate) client: SharedAdminClient,
    pub(crate) notifier: SharedNotifier,
    pub(crate) reloader: CoreReloader,
    pub(crate) monitor: Arc<CoreStatusMonitor>,
    pub(crate) messages: Arc<MessageQueue>,
    pub(crate) metrics: Option<Arc<Metrics>>,
    reload_count: AtomicU64,
}

impl AdminState {
    pub fn new(
        client: SharedAdminClient,
        notifier: SharedNotifier,
        reloader: CoreReloader,
        monitor: Arc<CoreStatusMonitor>,
        messages: Arc<MessageQueue>,
    ) -> Self {
        Self {
            start_time: Instant::now(),
            client,
            notifier,
            reloader,
            monitor,
            messages,
            metrics: None,
            reload_count: AtomicU64::new(0),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Reloads requested through the API.
    pub fn reload_count(&self) -> u64 {
        self.reload_count.load(Ordering::Relaxed)
    }

    pub(crate) fn inc_reload_count(&self) -> u64 {
        self.reload_count.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Build the admin router.
pub fn router(state: Arc<AdminState>) -> Router {
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/status", get(status_handler))
        .route("/stats", get(stats_handler))
        .route("/messages", get(messages_handler))
        .route("/metrics", get(metrics_handler))
        .route("/reload", post(reload_handler))
        .route("/check", post(check_handler))
        .with_state(state)
}

/// Admin HTTP server.
pub struct AdminServer {
    config: AdminConfig,
    state: Arc<AdminState>,
    shutdown: Arc<Shutdown>,
}

impl AdminServer {
    pub fn new(config: &AdminConfig, state: Arc<AdminState>, shutdown: Arc<Shutdown>) -> Self {
        Self {
            config: config.clone(),
            state,
            shutdown,
        }
    }

    /// Serve until shutdown is triggered.
    pub async fn run(self) -> std::io::Result<()> {
        let addr = self.config.address;
        let listener = TcpListener::bind(addr).await?;
        info!(address = %listener.local_addr()?, "starting admin server");

        let shutdown = self.shutdown.clone();
        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(async move {
                shutdown.wait().await;
                info!("admin server shutting down");
            })
            .await
    }
}
