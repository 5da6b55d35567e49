//! Retry budget and backoff schedule
//!
//! Backoff is per-chunk: each failed flush attempt doubles the base delay,
//! capped at `max_delay_secs`, then scaled by a random jitter factor in
//! [0.5, 1.5) so synchronized failures do not retry in lockstep.

use rand::Rng;
use serde::Deserialize;

use relay_buffer::RetryState;

/// Retry budget and backoff parameters for one destination
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Give up after this many failed attempts; `None` retries until
    /// `max_elapsed_secs` runs out
    pub max_attempts: Option<u32>,

    /// Give up once this much time has passed since the first failure
    pub max_elapsed_secs: Option<u64>,

    /// First backoff step, in seconds
    pub base_delay_secs: u64,

    /// Backoff ceiling before jitter, in seconds
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: Some(10),
            max_elapsed_secs: Some(72 * 3600),
            base_delay_secs: 1,
            max_delay_secs: 60,
        }
    }
}

impl RetryConfig {
    /// Backoff in seconds after `attempts` failures, before jitter
    #[must_use]
    pub fn backoff_secs(&self, attempts: u32) -> u64 {
        let factor = 2u64.saturating_pow(attempts.min(32));
        self.base_delay_secs
            .saturating_mul(factor)
            .min(self.max_delay_secs)
    }

    /// Record one more failure against a chunk's retry budget
    ///
    /// Returns the updated [`RetryState`] with the next dispatch deadline,
    /// or `None` when the budget is exhausted and the failure must be
    /// treated as permanent.
    #[must_use]
    pub fn next_retry(&self, previous: Option<RetryState>, now: i64) -> Option<RetryState> {
        let attempts = previous.map_or(0, |p| p.attempts) + 1;
        let started_at = previous.map_or(now, |p| p.started_at);

        if self.max_attempts.is_some_and(|limit| attempts > limit) {
            return None;
        }
        if self
            .max_elapsed_secs
            .is_some_and(|limit| now.saturating_sub(started_at) >= limit as i64)
        {
            return None;
        }

        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        let delay = ((self.backoff_secs(attempts) as f64) * jitter).round() as i64;

        Some(RetryState {
            attempts,
            started_at,
            not_before: now + delay.max(1),
        })
    }
}
