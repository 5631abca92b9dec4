//! Wires configuration, platform discovery and the components together.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use crate::admin::{AdminServer, AdminState};
use crate::client::{HttpAdminClient, SharedAdminClient};
use crate::config::{Config, ConnectionSettings, PlatformConfig};
use crate::identity::CoreName;
use crate::monitor::{CoreStatusMonitor, MonitorScheduler};
use crate::notify::{SharedNotifier, TracingNotifier};
use crate::reload::{CoreReloader, ReloadPolicy};
use crate::state::{create_state_store, SharedStateStore};
use crate::telemetry::Metrics;

use super::shutdown::{wait_for_signal, Shutdown};

/// Pick the platform settings: the environment wins when complete,
/// otherwise the `connection.platform` section of the config file.
pub fn resolve_platform(config: &Config, from_env: PlatformConfig) -> Result<PlatformConfig> {
    if from_env.is_present() {
        info!(core = %from_env.core, host = %from_env.host, "using platform configuration from environment");
        return Ok(from_env);
    }

    match &config.connection.platform {
        Some(platform) if platform.is_present() => {
            info!(core = %platform.core, host = %platform.host, "using platform configuration from config file");
            Ok(platform.clone())
        }
        _ => bail!(
            "platform configuration incomplete, missing: {}",
            from_env.missing().join(", ")
        ),
    }
}

/// Every long-lived component of a running coreguard instance.
pub struct Service {
    pub config: Arc<Config>,
    pub platform: PlatformConfig,
    pub core: CoreName,
    pub client: SharedAdminClient,
    pub store: SharedStateStore,
    pub notifier: Arc<TracingNotifier>,
    pub reloader: CoreReloader,
    pub monitor: Arc<CoreStatusMonitor>,
}

impl Service {
    /// Build with the HTTP admin client, reading platform settings from the
    /// environment.
    pub fn build(config: Config) -> Result<Self> {
        let platform = resolve_platform(&config, PlatformConfig::from_env())?;
        let settings = ConnectionSettings::compose(&platform, &config.connection);
        let client = HttpAdminClient::new(&settings).context("failed to create admin client")?;
        info!(base_url = %client.base_url(), "admin client ready");
        Self::with_client(config, platform, Arc::new(client))
    }

    /// Build around an existing admin client.
    pub fn with_client(
        config: Config,
        platform: PlatformConfig,
        client: SharedAdminClient,
    ) -> Result<Self> {
        let core = platform.core_name().context("invalid core name")?;
        let store = create_state_store(&config.state)?;
        let notifier = Arc::new(TracingNotifier::new(config.admin.message_capacity));
        let shared_notifier: SharedNotifier = notifier.clone();

        let reloader = CoreReloader::new(client.clone(), shared_notifier.clone())
            .with_policy(ReloadPolicy::from_config(&config.reload));

        let monitor = CoreStatusMonitor::new(
            core.clone(),
            client.clone(),
            store.clone(),
            shared_notifier,
        )
        .with_check_interval(config.monitor.check_interval);

        if let Some(expected) = &config.monitor.expected_schema_version {
            monitor
                .set_expected_schema_version(expected)
                .context("failed to record expected schema version")?;
            info!(expected = %expected, "expected schema version recorded");
        }

        info!(
            core = %core,
            client = client.name(),
            state = store.name(),
            "service assembled"
        );

        Ok(Self {
            config: Arc::new(config),
            platform,
            core,
            client,
            store,
            notifier,
            reloader,
            monitor: Arc::new(monitor),
        })
    }

    /// Run the scheduler and the admin API until SIGINT or SIGTERM.
    #[instrument(name = "coreguard", skip_all, fields(version = env!("CARGO_PKG_VERSION")))]
    pub async fn serve(self, metrics: Option<Arc<Metrics>>) -> Result<()> {
        let shutdown = Shutdown::new();
        let mut tasks: Vec<JoinHandle<()>> = Vec::new();

        if self.config.monitor.enabled {
            let scheduler = MonitorScheduler::new(
                self.monitor.clone(),
                self.config.monitor.tick,
                shutdown.clone(),
            );
            tasks.push(tokio::spawn(async move {
                scheduler.run().await;
            }));
        }

        if self.config.admin.enabled {
            let mut state = AdminState::new(
                self.client.clone(),
                self.notifier.clone(),
                self.reloader.clone(),
                self.monitor.clone(),
                self.notifier.queue(),
            );
            if let Some(metrics) = metrics {
                state = state.with_metrics(metrics);
            }
            let server = AdminServer::new(&self.config.admin, Arc::new(state), shutdown.clone());
            tasks.push(tokio::spawn(async move {
                if let Err(e) = server.run().await {
                    error!(error = %e, "admin server failed");
                }
            }));
        }

        info!(
            core = %self.core,
            monitor = self.config.monitor.enabled,
            admin = self.config.admin.enabled,
            admin_address = %self.config.admin.address,
            check_interval_secs = self.config.monitor.check_interval.as_secs(),
            "coreguard started"
        );

        wait_for_signal().await;
        shutdown.trigger();

        for task in tasks {
            if let Err(e) = task.await {
                error!(error = %e, "background task panicked");
            }
        }

        info!("coreguard stopped");
        Ok(())
    }
}
