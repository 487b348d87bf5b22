//! Retry, backoff, and expiry policy

use chrono::{DateTime, Duration, Utc};
use maildrip_common::config::SchedulerConfig;

use super::queue::QueueEntry;

/// What to do with a queue entry at evaluation time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Scheduled moment not reached yet
    NotDue,
    /// Delivery window elapsed without a successful send
    Expired,
    /// Attempt budget spent
    Exhausted,
    /// Waiting out the delay after a failed attempt
    Backoff,
    /// Due, within the window, budget left: attempt delivery now
    Attempt,
}

/// Policy knobs for the dispatch loop
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub expiry_window: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::minutes(5),
            expiry_window: Duration::hours(24),
        }
    }
}

impl RetryPolicy {
    /// Build from configuration
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            retry_delay: Duration::seconds(config.retry_delay_secs as i64),
            expiry_window: Duration::seconds(config.expiry_window_secs as i64),
        }
    }

    /// Three-tier evaluation: not-due, expired, then attempt budget and
    /// backoff. Expiry takes precedence over the remaining attempt budget.
    pub fn disposition(&self, entry: &QueueEntry, now: DateTime<Utc>) -> Disposition {
        if now < entry.scheduled_at {
            return Disposition::NotDue;
        }
        if now - entry.scheduled_at > self.expiry_window {
            return Disposition::Expired;
        }
        if entry.attempts >= self.max_attempts {
            return Disposition::Exhausted;
        }
        if now - entry.last_attempt_at < self.retry_delay {
            return Disposition::Backoff;
        }
        Disposition::Attempt
    }
}
