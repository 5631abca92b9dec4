//! Production notifier: logs through `tracing`, messages into a bounded queue.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{LogEntry, LogLevel, Notifier, UserMessage};

/// Bounded FIFO of user-facing messages. The oldest message is dropped when
/// the queue is full.
#[derive(Debug)]
pub struct MessageQueue {
    messages: Mutex<VecDeque<UserMessage>>,
    capacity: usize,
}

impl MessageQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, message: UserMessage) {
        let mut messages = self.lock();
        if messages.len() >= self.capacity {
            messages.pop_front();
        }
        messages.push_back(message);
    }

    /// Take every queued message.
    pub fn drain(&self) -> Vec<UserMessage> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<UserMessage>> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Notifier writing log entries as `tracing` events under `coreguard::notify`.
#[derive(Debug, Clone)]
pub struct TracingNotifier {
    queue: Arc<MessageQueue>,
}

impl TracingNotifier {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Arc::new(MessageQueue::new(capacity)),
        }
    }

    /// Queue shared with readers such as the admin API.
    pub fn queue(&self) -> Arc<MessageQueue> {
        Arc::clone(&self.queue)
    }
}

impl Notifier for TracingNotifier {
    fn log(&self, entry: LogEntry) {
        let message = entry.render();
        match entry.level {
            LogLevel::Info => {
                tracing::info!(target: "coreguard::notify", template = entry.template, "{}", message)
            }
            LogLevel::Warning => {
                tracing::warn!(target: "coreguard::notify", template = entry.template, "{}", message)
            }
            LogLevel::Error => {
                tracing::error!(target: "coreguard::notify", template = entry.template, "{}", message)
            }
        }
    }

    fn message(&self, message: UserMessage) {
        tracing::debug!(
            target: "coreguard::notify",
            level = ?message.level,
            text = %message.text,
            "user message queued"
        );
        self.queue.push(message);
    }
}
