//! Periodic, rate-limited core health and schema drift check.
//!
//! Each invocation reads the last check time from the state store and does
//! nothing else if the check interval has not elapsed. Otherwise it fetches
//! a fresh snapshot, persists it together with the new check time, and
//! validates it against the expected schema version.

mod clock;
mod scheduler;
mod snapshot;

pub use clock::{Clock, ManualClock, SystemClock};
pub use scheduler::MonitorScheduler;
pub use snapshot::{CoreSection, CoreStatusSnapshot, IndexSection, SchemaSection};

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::client::{ClientError, SharedAdminClient};
use crate::identity::CoreName;
use crate::notify::{LogEntry, SharedNotifier, UserMessage};
use crate::state::{
    SharedStateStore, StateError, CORE_STATUS_KEY, LAST_STATUS_CHECK_KEY, SCHEMA_VERSION_KEY,
};
use crate::telemetry::counters;

/// Minimum time between two unforced checks
pub const CHECK_INTERVAL: Duration = Duration::from_secs(3600);

/// Outcome of the most recent invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    /// Not run yet, or skipped by the interval gate
    Idle,
    Checking,
    Validated,
    Failed,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Checking => "checking",
            Self::Validated => "validated",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Persisted check state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckState {
    /// Unix seconds, 0 if never checked
    pub last_status_check: u64,
    pub snapshot: Option<CoreStatusSnapshot>,
}

impl CheckState {
    pub fn load(store: &dyn crate::state::StateStore) -> Result<Self, StateError> {
        let last_status_check = store.get_u64_or(LAST_STATUS_CHECK_KEY, 0)?;
        let snapshot = match store.get(CORE_STATUS_KEY)? {
            Some(value) => Some(serde_json::from_value(value)?),
            None => None,
        };
        Ok(Self {
            last_status_check,
            snapshot,
        })
    }
}

/// Something `validate_status` reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    SchemaMismatch {
        expected: Option<String>,
        current: Option<String>,
    },
    CoreNotResponding,
}

#[derive(Debug, Error)]
enum CheckError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Runs status checks for one core.
pub struct CoreStatusMonitor {
    core: CoreName,
    client: SharedAdminClient,
    store: SharedStateStore,
    notifier: SharedNotifier,
    clock: Arc<dyn Clock>,
    check_interval: Duration,
    state: Mutex<MonitorState>,
}

impl fmt::Debug for CoreStatusMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreStatusMonitor")
            .field("core", &self.core)
            .field("client", &self.client.name())
            .field("store", &self.store.name())
            .field("check_interval", &self.check_interval)
            .finish_non_exhaustive()
    }
}

impl CoreStatusMonitor {
    pub fn new(
        core: CoreName,
        client: SharedAdminClient,
        store: SharedStateStore,
        notifier: SharedNotifier,
    ) -> Self {
        Self {
            core,
            client,
            store,
            notifier,
            clock: Arc::new(SystemClock),
            check_interval: CHECK_INTERVAL,
            state: Mutex::new(MonitorState::Idle),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn core(&self) -> &CoreName {
        &self.core
    }

    /// Outcome of the last invocation.
    pub fn state(&self) -> MonitorState {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, state: MonitorState) {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = state;
    }

    /// Persisted check time and snapshot.
    pub fn check_state(&self) -> Result<CheckState, StateError> {
        CheckState::load(self.store.as_ref())
    }

    /// Record the schema version drift is measured against.
    pub fn set_expected_schema_version(&self, version: &str) -> Result<(), StateError> {
        self.store.set(SCHEMA_VERSION_KEY, json!(version))
    }

    /// Run a check unless one ran within the check interval.
    ///
    /// Errors are reported through the notifier and never returned.
    #[instrument(skip(self), fields(core = %self.core))]
    pub async fn check_core_status(&self, force: bool) -> MonitorState {
        let last = match self.store.get_u64_or(LAST_STATUS_CHECK_KEY, 0) {
            Ok(last) => last,
            Err(e) => {
                debug!(error = %e, "last check time unreadable, treating as never");
                0
            }
        };
        let now = self.clock.now_unix();

        if !force && now.saturating_sub(last) < self.check_interval.as_secs() {
            counters::status_check("skipped");
            self.set_state(MonitorState::Idle);
            return MonitorState::Idle;
        }

        self.set_state(MonitorState::Checking);

        let checked = self
            .refresh(now.max(last))
            .await
            .and_then(|snapshot| Ok(self.validate_status(&snapshot)?));

        let outcome = match checked {
            Ok(_) => MonitorState::Validated,
            Err(e) => {
                self.notifier.log(
                    LogEntry::error("Core status check failed: @message").with("message", &e),
                );
                self.notifier
                    .message(UserMessage::error("Core status check failed. Please check logs."));
                MonitorState::Failed
            }
        };

        counters::status_check(&outcome.to_string());
        self.set_state(outcome);
        outcome
    }

    async fn refresh(&self, checked_at: u64) -> Result<CoreStatusSnapshot, CheckError> {
        let snapshot = CoreStatusSnapshot::fetch(self.client.as_ref(), &self.core).await?;

        let value = serde_json::to_value(&snapshot).map_err(StateError::from)?;
        self.store.set(CORE_STATUS_KEY, value)?;
        self.store.set(LAST_STATUS_CHECK_KEY, json!(checked_at))?;

        Ok(snapshot)
    }

    /// Compare a snapshot against the expected schema version and check the
    /// core is up. Problems go to the notifier; the findings are returned too.
    ///
    /// Fails without notifying anything if the expected version cannot be
    /// read from the state store.
    pub fn validate_status(
        &self,
        snapshot: &CoreStatusSnapshot,
    ) -> Result<Vec<Finding>, StateError> {
        let mut findings = Vec::new();

        let expected = self.store.get_string(SCHEMA_VERSION_KEY)?;
        let current = snapshot.schema.version.clone();
        if expected != current {
            self.notifier.log(
                LogEntry::warning("Schema version mismatch. Expected: @expected, Found: @current")
                    .with("expected", expected.as_deref().unwrap_or("none"))
                    .with("current", current.as_deref().unwrap_or("none")),
            );
            self.notifier
                .message(UserMessage::warning("Schema version mismatch detected."));
            counters::schema_drift();
            findings.push(Finding::SchemaMismatch { expected, current });
        }

        let responding = snapshot.is_responding();
        counters::core_up(self.core.as_str(), responding);
        if !responding {
            self.notifier
                .message(UserMessage::error("Core is not responding properly."));
            findings.push(Finding::CoreNotResponding);
        }

        Ok(findings)
    }
}
