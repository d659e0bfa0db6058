//! # Countdown timer posting `Timeout` tasks.
//!
//! One timer serves the whole controller: the menu arms it with the menu
//! timeout, a running game with the game timeout.
//!
//! ## Rules
//! - `set` replaces any pending countdown; a length of zero disables the timer.
//! - `reset` re-arms with the last length (level reset, not additive).
//! - `stop` discards the pending countdown; no task is posted.
//! - An alert from a replaced or stopped countdown never posts: every countdown
//!   carries a generation number checked under the lock before posting.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::tasks::{Task, TaskKind, TaskSender};

/// Snapshot of the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerState {
    /// Length of the last `set`.
    pub length: Duration,
    /// Time left until expiry (zero when not running).
    pub remaining: Duration,
    pub running: bool,
}

#[derive(Debug, Default)]
struct Inner {
    length: Duration,
    deadline: Option<Instant>,
    generation: u64,
    cancel: Option<CancellationToken>,
}

impl Inner {
    fn disarm(&mut self) {
        self.deadline = None;
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
    }
}

/// Single countdown posting [`TaskKind::Timeout`] on expiry.
#[derive(Debug)]
pub struct Timer {
    inner: Arc<Mutex<Inner>>,
    tasks: TaskSender,
}

impl Timer {
    pub fn new(tasks: TaskSender) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            tasks,
        }
    }

    /// Arms the countdown with `length`, replacing any pending one.
    ///
    /// Must be called inside a tokio runtime.
    pub fn set(&self, length: Duration) {
        let mut inner = self.lock();
        inner.disarm();
        inner.length = length;
        inner.generation = inner.generation.wrapping_add(1);

        if length.is_zero() {
            debug!("timer disabled");
            return;
        }

        let deadline = Instant::now() + length;
        let token = CancellationToken::new();
        inner.deadline = Some(deadline);
        inner.cancel = Some(token.clone());
        debug!(secs = length.as_secs(), "timer set");

        tokio::spawn(alert(
            self.inner.clone(),
            self.tasks.clone(),
            inner.generation,
            deadline,
            token,
        ));
    }

    /// Re-arms with the last length.
    pub fn reset(&self) {
        let length = self.lock().length;
        self.set(length);
    }

    /// Discards the pending countdown.
    pub fn stop(&self) {
        let mut inner = self.lock();
        inner.generation = inner.generation.wrapping_add(1);
        inner.disarm();
        debug!("timer stopped");
    }

    pub fn state(&self) -> TimerState {
        let inner = self.lock();
        let remaining = inner
            .deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
            .unwrap_or_default();
        TimerState {
            length: inner.length,
            remaining,
            running: inner.deadline.is_some(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

async fn alert(
    inner: Arc<Mutex<Inner>>,
    tasks: TaskSender,
    generation: u64,
    deadline: Instant,
    token: CancellationToken,
) {
    tokio::select! {
        _ = token.cancelled() => return,
        _ = tokio::time::sleep_until(deadline) => {}
    }

    {
        let mut inner = inner.lock().unwrap_or_else(|p| p.into_inner());
        if inner.generation != generation {
            return;
        }
        inner.deadline = None;
        inner.cancel = None;
    }
    info!("timer ran out");
    tasks.post(Task::new(TaskKind::Timeout));
}
