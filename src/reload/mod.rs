//! Retry-aware core reload with status verification.
//!
//! One call to [`CoreReloader::reload_core`] runs up to `max_attempts`
//! attempts. An attempt issues RELOAD and, if the server accepts it, polls
//! STATUS until the core reports itself loaded. A failed attempt is logged
//! and retried after the backoff delay. The operator gets exactly one
//! user-facing message per call: success or final failure.
//!
//! The protocol is serial. At most one admin request is in flight and the
//! calling task is held across all pauses.

mod backoff;

pub use backoff::Backoff;

use std::fmt;
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::client::{error_message, status_confirms, ClientError, SharedAdminClient};
use crate::config::ReloadConfig;
use crate::identity::CoreName;
use crate::notify::{LogEntry, SharedNotifier, UserMessage};
use crate::telemetry::counters;

/// RELOAD attempts per call
pub const MAX_RELOAD_RETRIES: u32 = 3;

/// Linear backoff unit: attempt `n` waits `n * RETRY_DELAY_BASE`
pub const RETRY_DELAY_BASE: Duration = Duration::from_secs(2);

/// STATUS polls per verification
pub const MAX_STATUS_ATTEMPTS: u32 = 5;

/// Pause between STATUS polls
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(1);

const RELOADED_MESSAGE: &str = "Core configuration has been reloaded successfully.";

/// Attempt counts and pauses for one reload call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub verify_attempts: u32,
    pub poll_interval: Duration,
}

impl Default for ReloadPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RELOAD_RETRIES,
            backoff: Backoff::default(),
            verify_attempts: MAX_STATUS_ATTEMPTS,
            poll_interval: STATUS_POLL_INTERVAL,
        }
    }
}

impl ReloadPolicy {
    /// Default counts with every pause removed.
    pub fn immediate() -> Self {
        Self {
            backoff: Backoff::None,
            poll_interval: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn from_config(config: &ReloadConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Backoff::from(&config.backoff),
            verify_attempts: config.verify_attempts.max(1),
            poll_interval: config.poll_interval,
        }
    }
}

/// Why an attempt failed.
#[derive(Debug, Clone)]
pub enum AttemptFailure {
    /// RELOAD itself failed
    Request(ClientError),
    /// RELOAD was accepted but STATUS never confirmed the core
    VerificationFailed,
    /// Cancelled while verifying
    Cancelled,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(e) => write!(f, "{e}"),
            Self::VerificationFailed => {
                write!(f, "Core reload completed but core status verification failed")
            }
            Self::Cancelled => write!(f, "reload cancelled"),
        }
    }
}

/// Result of one attempt.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    Verified,
    Failed(AttemptFailure),
}

/// One attempt within a reload call. Never persisted.
#[derive(Debug, Clone)]
pub struct ReloadAttempt {
    /// 1-based
    pub number: u32,
    pub outcome: AttemptOutcome,
}

impl ReloadAttempt {
    pub fn is_verified(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Verified)
    }

    pub fn error(&self) -> Option<String> {
        match &self.outcome {
            AttemptOutcome::Verified => None,
            AttemptOutcome::Failed(failure) => Some(failure.to_string()),
        }
    }
}

/// Result of one STATUS poll.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Confirmed,
    NotConfirmed,
    Failed(ClientError),
}

/// Everything that happened during one reload call.
#[derive(Debug, Clone)]
pub struct ReloadReport {
    pub core: CoreName,
    pub attempts: Vec<ReloadAttempt>,
    pub elapsed: Duration,
}

impl ReloadReport {
    pub fn success(&self) -> bool {
        self.attempts.last().is_some_and(ReloadAttempt::is_verified)
    }
}

/// Reloads a core and confirms it came back.
#[derive(Clone)]
pub struct CoreReloader {
    client: SharedAdminClient,
    notifier: SharedNotifier,
    policy: ReloadPolicy,
}

impl fmt::Debug for CoreReloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreReloader")
            .field("client", &self.client.name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl CoreReloader {
    pub fn new(client: SharedAdminClient, notifier: SharedNotifier) -> Self {
        Self {
            client,
            notifier,
            policy: ReloadPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ReloadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &ReloadPolicy {
        &self.policy
    }

    /// Reload `core` and verify it. Returns true once an attempt verifies.
    pub async fn reload_core(&self, core: &CoreName) -> bool {
        self.reload_core_until(core, &CancellationToken::new()).await
    }

    /// Like [`reload_core`](Self::reload_core), stopping early when `cancel`
    /// fires. Cancellation is observed between requests only.
    pub async fn reload_core_until(&self, core: &CoreName, cancel: &CancellationToken) -> bool {
        self.reload_core_with_report(core, cancel).await.success()
    }

    /// Run the reload protocol and return every attempt made.
    #[instrument(skip_all, fields(core = %core))]
    pub async fn reload_core_with_report(
        &self,
        core: &CoreName,
        cancel: &CancellationToken,
    ) -> ReloadReport {
        let started = Instant::now();
        let max = self.policy.max_attempts.max(1);
        let mut attempts = Vec::with_capacity(max as usize);

        for number in 1..=max {
            if cancel.is_cancelled() {
                info!(attempt = number, "reload cancelled before attempt");
                break;
            }

            let attempt = self.attempt(core, number, max, cancel).await;
            counters::reload_attempt(core.as_str(), attempt.is_verified());

            match &attempt.outcome {
                AttemptOutcome::Verified => {
                    self.notifier.log(
                        LogEntry::info("Core @core reloaded and verified successfully")
                            .with("core", core),
                    );
                    self.notifier.message(UserMessage::status(RELOADED_MESSAGE));
                    attempts.push(attempt);

                    let elapsed = started.elapsed();
                    counters::reload_outcome(core.as_str(), true, elapsed.as_secs_f64());
                    return ReloadReport {
                        core: core.clone(),
                        attempts,
                        elapsed,
                    };
                }
                AttemptOutcome::Failed(failure) => {
                    self.notifier.log(
                        LogEntry::error("Core reload attempt @attempt failed: @message")
                            .with("attempt", number)
                            .with("message", failure),
                    );
                }
            }
            attempts.push(attempt);

            if number < max {
                let delay = self.policy.backoff.delay(number);
                debug!(attempt = number, delay_ms = delay.as_millis() as u64, "backing off");
                if !pause(delay, cancel).await {
                    info!(attempt = number, "reload cancelled during backoff");
                    break;
                }
            }
        }

        let made = attempts.len();
        let text = if made < max as usize {
            format!("Core reload cancelled after {made} of {max} attempts. Please check logs for details.")
        } else {
            format!("Failed to reload core after {made} attempts. Please check logs for details.")
        };
        self.notifier.message(UserMessage::error(text));

        let elapsed = started.elapsed();
        counters::reload_outcome(core.as_str(), false, elapsed.as_secs_f64());
        ReloadReport {
            core: core.clone(),
            attempts,
            elapsed,
        }
    }

    async fn attempt(
        &self,
        core: &CoreName,
        number: u32,
        max: u32,
        cancel: &CancellationToken,
    ) -> ReloadAttempt {
        self.notifier.log(
            LogEntry::info("Attempting core reload (attempt @attempt of @max) for core: @core")
                .with("attempt", number)
                .with("max", max)
                .with("core", core),
        );

        let outcome = match self.send_reload(core).await {
            Err(e) => AttemptOutcome::Failed(AttemptFailure::Request(e)),
            Ok(()) => match self.verify(core, cancel).await {
                Verification::Confirmed => AttemptOutcome::Verified,
                Verification::Exhausted => {
                    AttemptOutcome::Failed(AttemptFailure::VerificationFailed)
                }
                Verification::Cancelled => AttemptOutcome::Failed(AttemptFailure::Cancelled),
            },
        };

        ReloadAttempt { number, outcome }
    }

    async fn send_reload(&self, core: &CoreName) -> Result<(), ClientError> {
        let body = self.client.reload(core).await?;
        match error_message(&body) {
            Some(message) => Err(ClientError::AdminOperation {
                status: 200,
                message,
            }),
            None => Ok(()),
        }
    }

    /// Poll STATUS until the core reports itself loaded.
    pub async fn verify_core_status(&self, core: &CoreName) -> bool {
        matches!(
            self.verify(core, &CancellationToken::new()).await,
            Verification::Confirmed
        )
    }

    #[instrument(skip_all, fields(core = %core))]
    async fn verify(&self, core: &CoreName, cancel: &CancellationToken) -> Verification {
        let polls = self.policy.verify_attempts.max(1);

        for number in 1..=polls {
            let outcome = self.poll(core).await;
            counters::status_poll(core.as_str(), matches!(outcome, PollOutcome::Confirmed));

            match outcome {
                PollOutcome::Confirmed => {
                    debug!(poll = number, "core status confirmed");
                    return Verification::Confirmed;
                }
                PollOutcome::NotConfirmed => {
                    debug!(poll = number, "core not yet active");
                }
                PollOutcome::Failed(e) => {
                    self.notifier.log(
                        LogEntry::warning("Core status check failed (attempt @attempt): @message")
                            .with("attempt", number)
                            .with("message", &e),
                    );
                }
            }

            if number < polls && !pause(self.policy.poll_interval, cancel).await {
                return Verification::Cancelled;
            }
        }

        Verification::Exhausted
    }

    async fn poll(&self, core: &CoreName) -> PollOutcome {
        match self.client.core_status(core).await {
            Ok(body) if status_confirms(&body, core) => PollOutcome::Confirmed,
            Ok(_) => PollOutcome::NotConfirmed,
            Err(e) => PollOutcome::Failed(e),
        }
    }
}

enum Verification {
    Confirmed,
    Exhausted,
    Cancelled,
}

/// Sleep for `delay`. Returns false if cancelled first.
async fn pause(delay: Duration, cancel: &CancellationToken) -> bool {
    if delay.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = sleep(delay) => true,
    }
}
