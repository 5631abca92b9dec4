//! Notifier that records everything, for assertions in tests.

use std::sync::Mutex;

use super::{LogEntry, LogLevel, MessageLevel, Notifier, UserMessage};

/// Records log entries and user messages in arrival order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    logs: Mutex<Vec<LogEntry>>,
    messages: Mutex<Vec<UserMessage>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        lock(&self.logs).clone()
    }

    pub fn messages(&self) -> Vec<UserMessage> {
        lock(&self.messages).clone()
    }

    pub fn log_count(&self, level: LogLevel) -> usize {
        lock(&self.logs).iter().filter(|e| e.level == level).count()
    }

    pub fn message_count(&self, level: MessageLevel) -> usize {
        lock(&self.messages)
            .iter()
            .filter(|m| m.level == level)
            .count()
    }

    /// Rendered log lines.
    pub fn rendered_logs(&self) -> Vec<String> {
        lock(&self.logs).iter().map(LogEntry::render).collect()
    }

    pub fn clear(&self) {
        lock(&self.logs).clear();
        lock(&self.messages).clear();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Notifier for RecordingNotifier {
    fn log(&self, entry: LogEntry) {
        lock(&self.logs).push(entry);
    }

    fn message(&self, message: UserMessage) {
        lock(&self.messages).push(message);
    }
}
