//! Status monitor integration tests: interval gate, drift and failure containment.

use std::sync::Arc;
use std::time::Duration;

use coreguard::client::{AdminAction, MockAdminClient, MockReply};
use coreguard::identity::CoreName;
use coreguard::monitor::{
    CoreSection, CoreStatusMonitor, CoreStatusSnapshot, Finding, ManualClock, MonitorState,
    SchemaSection,
};
use coreguard::notify::{LogLevel, MessageLevel, RecordingNotifier};
use coreguard::state::{
    MemoryStateStore, PersistentStateStore, SharedStateStore, StateError, StateStore,
    CORE_STATUS_KEY, LAST_STATUS_CHECK_KEY, SCHEMA_VERSION_KEY,
};
use serde_json::{json, Value};
use tempfile::TempDir;

const NOW: u64 = 1_700_000_000;

fn monitor(
    mock: &Arc<MockAdminClient>,
    store: SharedStateStore,
    notifier: &Arc<RecordingNotifier>,
    clock: &Arc<ManualClock>,
) -> CoreStatusMonitor {
    CoreStatusMonitor::new(
        CoreName::new("main").unwrap(),
        mock.clone(),
        store,
        notifier.clone(),
    )
    .with_clock(clock.clone())
}

/// Memory store that fails reads or writes of one key.
struct FaultyStore {
    inner: MemoryStateStore,
    failing_get: Option<&'static str>,
    failing_set: Option<&'static str>,
}

impl FaultyStore {
    fn failing_get(key: &'static str) -> Self {
        Self {
            inner: MemoryStateStore::new(),
            failing_get: Some(key),
            failing_set: None,
        }
    }

    fn failing_set(key: &'static str) -> Self {
        Self {
            inner: MemoryStateStore::new(),
            failing_get: None,
            failing_set: Some(key),
        }
    }
}

impl StateStore for FaultyStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StateError> {
        if self.failing_get == Some(key) {
            return Err(StateError::Backend("read failed".to_string()));
        }
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StateError> {
        if self.failing_set == Some(key) {
            return Err(StateError::Backend("disk full".to_string()));
        }
        self.inner.set(key, value)
    }

    fn delete(&self, key: &str) -> Result<bool, StateError> {
        self.inner.delete(key)
    }

    fn name(&self) -> &'static str {
        "faulty"
    }
}

fn responding(version: &str) -> CoreStatusSnapshot {
    CoreStatusSnapshot {
        core: CoreSection {
            name: Some("main".to_string()),
            uptime: Some(120_000),
        },
        schema: SchemaSection {
            version: Some(version.to_string()),
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn test_second_check_within_interval_makes_no_calls() {
    let mock = Arc::new(MockAdminClient::healthy("main"));
    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let monitor = monitor(&mock, Arc::new(MemoryStateStore::new()), &notifier, &clock);

    assert_eq!(monitor.check_core_status(false).await, MonitorState::Validated);
    let calls = mock.total_calls();
    assert!(calls > 0);

    clock.advance(Duration::from_secs(3599));
    assert_eq!(monitor.check_core_status(false).await, MonitorState::Idle);
    assert_eq!(mock.total_calls(), calls);
    assert!(notifier.logs().is_empty());
}

#[tokio::test]
async fn test_forced_check_ignores_interval() {
    let mock = Arc::new(MockAdminClient::healthy("main"));
    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let monitor = monitor(&mock, Arc::new(MemoryStateStore::new()), &notifier, &clock);

    for _ in 0..3 {
        assert_eq!(monitor.check_core_status(true).await, MonitorState::Validated);
    }
    assert_eq!(mock.calls(AdminAction::Status), 3);
}

#[tokio::test]
async fn test_interval_gate_survives_restart() {
    let dir = TempDir::new().unwrap();
    let mock = Arc::new(MockAdminClient::healthy("main"));
    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(ManualClock::new(NOW));

    {
        let store = PersistentStateStore::open(dir.path()).unwrap();
        let first = monitor(&mock, store, &notifier, &clock);
        assert_eq!(first.check_core_status(false).await, MonitorState::Validated);
    }

    clock.advance(Duration::from_secs(60));
    let store = PersistentStateStore::open(dir.path()).unwrap();
    assert_eq!(store.get_u64_or(LAST_STATUS_CHECK_KEY, 0).unwrap(), NOW);

    let second = monitor(&mock, store, &notifier, &clock);
    assert_eq!(second.check_core_status(false).await, MonitorState::Idle);
    assert_eq!(mock.calls(AdminAction::Status), 1);
}

#[test]
fn test_schema_mismatch_warns_once() {
    let mock = Arc::new(MockAdminClient::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let monitor = monitor(&mock, Arc::new(MemoryStateStore::new()), &notifier, &clock);
    monitor.set_expected_schema_version("1.5").unwrap();

    let findings = monitor.validate_status(&responding("1.6")).unwrap();

    assert_eq!(
        findings,
        vec![Finding::SchemaMismatch {
            expected: Some("1.5".to_string()),
            current: Some("1.6".to_string()),
        }]
    );
    assert_eq!(notifier.message_count(MessageLevel::Warning), 1);
    assert_eq!(notifier.messages().len(), 1);
    assert_eq!(notifier.log_count(LogLevel::Warning), 1);
    assert_eq!(
        notifier.rendered_logs(),
        vec!["Schema version mismatch. Expected: 1.5, Found: 1.6".to_string()]
    );
    assert_eq!(mock.total_calls(), 0);
}

#[test]
fn test_matching_schema_is_silent() {
    let mock = Arc::new(MockAdminClient::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let monitor = monitor(&mock, Arc::new(MemoryStateStore::new()), &notifier, &clock);
    monitor.set_expected_schema_version("1.6").unwrap();

    assert!(monitor
        .validate_status(&responding("1.6"))
        .unwrap()
        .is_empty());
    assert!(notifier.messages().is_empty());
    assert!(notifier.logs().is_empty());
}

#[tokio::test]
async fn test_failed_fetch_is_contained() {
    let mock = Arc::new(
        MockAdminClient::healthy("main")
            .with_fallback(AdminAction::Status, MockReply::transport("connection refused")),
    );
    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let store = Arc::new(MemoryStateStore::new());
    let monitor = monitor(&mock, store.clone(), &notifier, &clock);

    assert_eq!(monitor.check_core_status(false).await, MonitorState::Failed);

    assert_eq!(notifier.message_count(MessageLevel::Error), 1);
    assert_eq!(notifier.messages().len(), 1);
    assert_eq!(notifier.log_count(LogLevel::Error), 1);
    assert_eq!(notifier.logs().len(), 1);
    assert_eq!(
        notifier.rendered_logs(),
        vec!["Core status check failed: transport error: connection refused".to_string()]
    );

    // A failed check does not arm the interval gate
    assert_eq!(store.get_u64_or(LAST_STATUS_CHECK_KEY, 0).unwrap(), 0);
}

#[tokio::test]
async fn test_drift_detected_during_check() {
    let mock = Arc::new(MockAdminClient::healthy("main").with_fallback(
        AdminAction::File,
        MockReply::Text(r#"<schema name="drupal" version="1.5"><types/><fields/></schema>"#.into()),
    ));
    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let store = Arc::new(MemoryStateStore::new());
    store.set("search_api_pantheon.schema_version", json!("1.6")).unwrap();
    let monitor = monitor(&mock, store, &notifier, &clock);

    assert_eq!(monitor.check_core_status(true).await, MonitorState::Validated);

    let snapshot = monitor.check_state().unwrap().snapshot.unwrap();
    assert_eq!(snapshot.schema.version.as_deref(), Some("1.5"));
    assert_eq!(notifier.message_count(MessageLevel::Warning), 1);
}

#[tokio::test]
async fn test_unreadable_expected_version_fails_check() {
    let mock = Arc::new(MockAdminClient::healthy("main"));
    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let store = Arc::new(FaultyStore::failing_get(SCHEMA_VERSION_KEY));
    let monitor = monitor(&mock, store, &notifier, &clock);

    assert_eq!(monitor.check_core_status(true).await, MonitorState::Failed);
    assert_eq!(monitor.state(), MonitorState::Failed);

    assert_eq!(notifier.logs().len(), 1);
    assert_eq!(notifier.log_count(LogLevel::Error), 1);
    assert_eq!(
        notifier.rendered_logs(),
        vec!["Core status check failed: state backend error: read failed".to_string()]
    );
    assert_eq!(notifier.messages().len(), 1);
    assert_eq!(notifier.message_count(MessageLevel::Error), 1);
    assert_eq!(
        notifier.messages()[0].text,
        "Core status check failed. Please check logs."
    );
}

#[test]
fn test_validate_status_surfaces_store_error() {
    let mock = Arc::new(MockAdminClient::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let store = Arc::new(FaultyStore::failing_get(SCHEMA_VERSION_KEY));
    let monitor = monitor(&mock, store, &notifier, &clock);

    let err = monitor.validate_status(&responding("1.6")).unwrap_err();
    assert!(matches!(err, StateError::Backend(_)));
    assert!(notifier.logs().is_empty());
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn test_snapshot_write_failure_fails_check() {
    let mock = Arc::new(MockAdminClient::healthy("main"));
    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let store = Arc::new(FaultyStore::failing_set(CORE_STATUS_KEY));
    let monitor = monitor(&mock, store.clone(), &notifier, &clock);

    assert_eq!(monitor.check_core_status(false).await, MonitorState::Failed);

    assert_eq!(notifier.logs().len(), 1);
    assert_eq!(notifier.log_count(LogLevel::Error), 1);
    assert_eq!(
        notifier.rendered_logs(),
        vec!["Core status check failed: state backend error: disk full".to_string()]
    );
    assert_eq!(notifier.messages().len(), 1);
    assert_eq!(notifier.message_count(MessageLevel::Error), 1);

    // The gate is not armed, so the next unforced call checks again
    assert_eq!(store.get_u64_or(LAST_STATUS_CHECK_KEY, 0).unwrap(), 0);
    assert_eq!(monitor.check_core_status(false).await, MonitorState::Failed);
    assert_eq!(mock.calls(AdminAction::Status), 2);
}

#[tokio::test]
async fn test_check_time_write_failure_fails_check() {
    let mock = Arc::new(MockAdminClient::healthy("main"));
    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let store = Arc::new(FaultyStore::failing_set(LAST_STATUS_CHECK_KEY));
    let monitor = monitor(&mock, store.clone(), &notifier, &clock);

    assert_eq!(monitor.check_core_status(false).await, MonitorState::Failed);
    assert_eq!(notifier.log_count(LogLevel::Error), 1);
    assert_eq!(notifier.message_count(MessageLevel::Error), 1);
    assert_eq!(store.get_u64_or(LAST_STATUS_CHECK_KEY, 0).unwrap(), 0);
}

#[tokio::test]
async fn test_numeric_expected_version_is_drift() {
    let mock = Arc::new(MockAdminClient::healthy("main"));
    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let store = Arc::new(MemoryStateStore::new());
    store.set(SCHEMA_VERSION_KEY, json!(1.6)).unwrap();
    let monitor = monitor(&mock, store, &notifier, &clock);

    let findings = monitor.validate_status(&responding("1.6")).unwrap();
    assert_eq!(
        findings,
        vec![Finding::SchemaMismatch {
            expected: None,
            current: Some("1.6".to_string()),
        }]
    );
    assert_eq!(notifier.message_count(MessageLevel::Warning), 1);
}
