//! # Bounded retry policy for verification loops.
//!
//! [`RetryPolicy`] drives the two verification loops of the command layer:
//!
//! ```text
//! StartGame:  attempts=N  settle=2s  backoff=500ms const
//!   for attempt in 1..=N:
//!     close, launch, verify ─ ok? done
//!     sleep(settle), verify ─ ok? done
//!     sleep(backoff.next(attempt-1))   (not after the last attempt)
//!
//! FocusApp:   attempts=M  settle=0   backoff=250ms const
//!   focus once; for poll in 1..=M: verify ─ ok? done; sleep(backoff)
//! ```
//!
//! Retries are always bounded; there is no cancellation of a running loop.

use std::time::Duration;

use super::BackoffPolicy;

/// Bounded retry policy with an optional settle delay before re-verification.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Maximum number of attempts (at least 1 is always made).
    pub attempts: u32,
    /// Wait before re-verifying an attempt that did not verify immediately.
    /// `Duration::ZERO` disables the second verification.
    pub settle: Duration,
    /// Delay between attempts.
    pub backoff: BackoffPolicy,
}

impl RetryPolicy {
    /// Number of attempts, never less than one.
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.attempts.max(1)
    }

    /// Settle delay as an `Option` (`None` = no second verification).
    #[inline]
    pub fn settle(&self) -> Option<Duration> {
        (self.settle > Duration::ZERO).then_some(self.settle)
    }

    /// Delay after failed attempt `attempt` (1-based), or `None` after the last one.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.attempts() {
            return None;
        }
        Some(self.backoff.next(attempt.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    /// Three attempts, 2s settle, constant 500ms between attempts.
    fn default() -> Self {
        Self {
            attempts: 3,
            settle: Duration::from_secs(2),
            backoff: BackoffPolicy::default(),
        }
    }
}
