//! Notification sink: a structured log channel plus user-facing messages.
//!
//! Log entries carry a template with `@name` placeholders and the values to
//! substitute, so sinks can keep the template as a stable event key while
//! still rendering a readable line.

mod recording;
mod tracing_sink;

pub use recording::RecordingNotifier;
pub use tracing_sink::{MessageQueue, TracingNotifier};

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Kind of user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Status,
    Warning,
    Error,
}

/// A structured log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub template: &'static str,
    pub params: Vec<(&'static str, String)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, template: &'static str) -> Self {
        Self {
            level,
            template,
            params: Vec::new(),
        }
    }

    pub fn info(template: &'static str) -> Self {
        Self::new(LogLevel::Info, template)
    }

    pub fn warning(template: &'static str) -> Self {
        Self::new(LogLevel::Warning, template)
    }

    pub fn error(template: &'static str) -> Self {
        Self::new(LogLevel::Error, template)
    }

    /// Attach a placeholder value. `name` is given without the leading `@`.
    pub fn with(mut self, name: &'static str, value: impl ToString) -> Self {
        self.params.push((name, value.to_string()));
        self
    }

    /// Value bound to a placeholder.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Render the template, substituting `@name` placeholders.
    ///
    /// Placeholders without a bound value are left as written.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.template.len() + 16);
        let mut rest = self.template;

        while let Some(at) = rest.find('@') {
            out.push_str(&rest[..at]);
            let after = &rest[at + 1..];
            let len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            let name = &after[..len];

            match self.param(name) {
                Some(value) if !name.is_empty() => out.push_str(value),
                _ => {
                    out.push('@');
                    out.push_str(name);
                }
            }
            rest = &after[len..];
        }

        out.push_str(rest);
        out
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// A message shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserMessage {
    pub level: MessageLevel,
    pub text: String,
}

impl UserMessage {
    pub fn status(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Status,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            text: text.into(),
        }
    }
}

/// Fire-and-forget notification sink.
pub trait Notifier: Send + Sync {
    /// Write a structured log entry.
    fn log(&self, entry: LogEntry);

    /// Queue a user-facing message.
    fn message(&self, message: UserMessage);
}

/// A shared notifier.
pub type SharedNotifier = Arc<dyn Notifier>;
