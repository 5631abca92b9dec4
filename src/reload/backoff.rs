//! Delay between failed reload attempts.

use std::time::Duration;

use crate::config::{BackoffConfig, BackoffKind};

/// Backoff strategy, indexed by the 1-based number of the attempt that
/// just failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry immediately
    None,
    /// Same delay after every attempt
    Fixed(Duration),
    /// `base * attempt`
    Linear { base: Duration },
    /// `base * 2^(attempt - 1)`, capped at `max`
    Exponential { base: Duration, max: Duration },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Linear {
            base: super::RETRY_DELAY_BASE,
        }
    }
}

impl Backoff {
    /// Delay to wait after `attempt` failed.
    pub fn delay(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match *self {
            Self::None => Duration::ZERO,
            Self::Fixed(delay) => delay,
            Self::Linear { base } => base.saturating_mul(attempt),
            Self::Exponential { base, max } => {
                let factor = 2u32.saturating_pow(attempt - 1);
                base.saturating_mul(factor).min(max)
            }
        }
    }
}

impl From<&BackoffConfig> for Backoff {
    fn from(config: &BackoffConfig) -> Self {
        match config.kind {
            BackoffKind::None => Self::None,
            BackoffKind::Fixed => Self::Fixed(config.base),
            BackoffKind::Linear => Self::Linear { base: config.base },
            BackoffKind::Exponential => Self::Exponential {
                base: config.base,
                max: config.max,
            },
        }
    }
}
