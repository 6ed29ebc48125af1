//! Fetch scheduling and failure backoff.
//!
//! [`RetryState`] is the mutable record of past attempts; [`RetryPolicy`]
//! holds the configured intervals and decides from that record whether the
//! next dark tick should fetch.
//!
//! A fetch is due when the data is in error (and the failure budget is not
//! spent) or has gone stale, and in both cases only once the backoff since the
//! last failure has passed.

use chrono::{DateTime, Local};
use std::time::Duration;

use crate::config::Config;
use crate::phase::{BitPattern, FetchError};

/// Record of fetch attempts since the last reset.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryState {
    pub consecutive_failures: u32,
    /// `None` until the first attempt; treated as infinitely long ago.
    pub last_attempt: Option<DateTime<Local>>,
    /// `None` until the first failure; treated as infinitely long ago.
    pub last_failure: Option<DateTime<Local>>,
    /// Pattern currently to display: the last fetched phase or the error pattern.
    pub pattern: BitPattern,
}

impl RetryState {
    /// Fresh state showing `error_pattern`, so the first dark tick fetches.
    pub fn new(error_pattern: BitPattern) -> Self {
        Self {
            consecutive_failures: 0,
            last_attempt: None,
            last_failure: None,
            pattern: error_pattern,
        }
    }
}

/// Configured retry behavior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub error_pattern: BitPattern,
    pub error_retry: Duration,
    pub error_limit: u32,
    pub update_interval: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            error_pattern: config.error_pattern(),
            error_retry: config.error_retry(),
            error_limit: config.error_limit(),
            update_interval: config.update_interval(),
        }
    }

    /// A state fresh from reset under this policy.
    pub fn initial_state(&self) -> RetryState {
        RetryState::new(self.error_pattern)
    }

    /// Whether a fetch should be attempted at `now`.
    pub fn should_fetch(&self, state: &RetryState, now: DateTime<Local>) -> bool {
        let in_error = state.pattern == self.error_pattern
            && state.consecutive_failures < self.error_limit;
        let stale = elapsed_exceeds(state.last_attempt, now, self.update_interval);
        let backed_off = elapsed_exceeds(state.last_failure, now, self.error_retry);

        (in_error || stale) && backed_off
    }

    /// Fold the outcome of an attempt made at `now` into `state`.
    pub fn record_result(
        &self,
        state: &mut RetryState,
        now: DateTime<Local>,
        result: &Result<BitPattern, FetchError>,
    ) {
        state.last_attempt = Some(now);
        match result {
            Ok(pattern) => {
                state.consecutive_failures = 0;
                state.pattern = *pattern;
            }
            Err(_) => {
                state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                state.last_failure = Some(now);
                state.pattern = self.error_pattern;
            }
        }
    }

    /// Whether failures have used up the budget, leaving only the stale path.
    pub fn is_exhausted(&self, state: &RetryState) -> bool {
        state.pattern == self.error_pattern && state.consecutive_failures >= self.error_limit
    }
}

/// Strictly more than `limit` has passed since `since`. A clock that moved
/// backwards counts as no time passed.
fn elapsed_exceeds(since: Option<DateTime<Local>>, now: DateTime<Local>, limit: Duration) -> bool {
    match since {
        None => true,
        Some(at) => (now - at).to_std().is_ok_and(|elapsed| elapsed > limit),
    }
}
