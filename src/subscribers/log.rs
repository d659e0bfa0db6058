//! # LogWriter: renders events through `tracing`.
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO kioskvisor::subscribers::log: state changed from=in_menu to=in_game
//! INFO kioskvisor::subscribers::log: launch attempt app="pong" attempt=1
//! WARN kioskvisor::subscribers::log: app crashed app="pong" status="exit status: 1"
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let app = e.app.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        let state = e.state.map(|s| s.as_str()).unwrap_or("-");
        let task = e.task.map(|t| t.as_label()).unwrap_or("-");

        match e.kind {
            EventKind::TaskDispatched => {
                debug!(seq = e.seq, task, state, app, "task dispatched");
            }
            EventKind::StateChanged => {
                let from = e.from.map(|s| s.as_str()).unwrap_or("-");
                info!(from, to = state, "state changed");
            }
            EventKind::ActiveAppChanged => {
                info!(app, "active app changed");
            }
            EventKind::TaskFailed => {
                warn!(task, state, reason, "task handler failed");
            }
            EventKind::TaskPanicked => {
                error!(task, state, reason, "task handler panicked");
            }
            EventKind::StatusSent => {
                debug!(status = reason, bytes = e.attempt.unwrap_or(0), "status sent");
            }
            EventKind::LaunchAttempt => {
                info!(app, attempt = e.attempt.unwrap_or(0), "launch attempt");
            }
            EventKind::RetryScheduled => {
                info!(
                    app,
                    after_attempt = e.attempt.unwrap_or(0),
                    delay_ms = e.delay_ms.unwrap_or(0),
                    "launch retry scheduled"
                );
            }
            EventKind::AppLaunched => info!(app, "app launched"),
            EventKind::AppClosed => info!(app, "app closed"),
            EventKind::AppCrashed => warn!(app, status = reason, "app crashed"),
            EventKind::CrashSuppressed => {
                debug!(app, status = reason, "exit during start ignored");
            }
            EventKind::FocusFailed => warn!(app, "focus not acquired"),
            EventKind::SleepEntered => {
                info!(sleep_ms = e.delay_ms.unwrap_or(0), "entering suspend");
            }
            EventKind::Woke => info!(error = reason, "resumed"),
            EventKind::ShutdownRequested => info!("shutdown requested"),
            EventKind::SubscriberOverflow => warn!(reason, "subscriber overflow"),
            EventKind::SubscriberPanicked => error!(reason, "subscriber panicked"),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
