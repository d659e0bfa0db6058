//! # Runtime events emitted by the event loop, command layer and supervisor.
//!
//! Events are **observations**, not requests: nothing in the control path reacts
//! to them. Subscribers (logging, tests, dashboards) receive them through the
//! [`Bus`](super::Bus). Requests travel as [`Task`](crate::Task)s instead.
//!
//! The [`EventKind`] enum classifies events across four categories:
//! - **Loop events**: dispatch, state transitions, handler failures
//! - **App events**: launch attempts, retries, crashes, closes
//! - **Power events**: suspend and resume
//! - **Subscriber events**: overflow and panics inside subscriber workers
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use kioskvisor::{Event, EventKind, StateId};
//!
//! let ev = Event::new(EventKind::StateChanged)
//!     .with_from(StateId::InMenu)
//!     .with_state(StateId::InGame)
//!     .with_app("pong");
//!
//! assert_eq!(ev.kind, EventKind::StateChanged);
//! assert_eq!(ev.state, Some(StateId::InGame));
//! assert_eq!(ev.app.as_deref(), Some("pong"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::states::StateId;
use crate::tasks::TaskKind;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Loop events ===
    /// A task was handed to the active state.
    ///
    /// Sets: `task`, `state` (handler), `app` (payload after retargeting)
    TaskDispatched,

    /// The active state changed.
    ///
    /// Sets: `from`, `state` (new state)
    StateChanged,

    /// ActiveApp was set or cleared by a `SetActiveApp` task.
    ///
    /// Sets: `app` (none when cleared)
    ActiveAppChanged,

    /// A state handler returned an error; the loop continues.
    ///
    /// Sets: `task`, `state`, `reason`
    TaskFailed,

    /// A state handler panicked; the loop continues.
    ///
    /// Sets: `task`, `state`, `reason` (panic message)
    TaskPanicked,

    /// A status string was sent to the UI.
    ///
    /// Sets: `reason` (status text), `attempt` (bytes sent)
    StatusSent,

    // === App events ===
    /// StartGame is launching an app.
    ///
    /// Sets: `app`, `attempt` (1-based)
    LaunchAttempt,

    /// StartGame will retry after a delay.
    ///
    /// Sets: `app`, `attempt` (failed attempt), `delay_ms`
    RetryScheduled,

    /// An app process was spawned and is being watched.
    ///
    /// Sets: `app`
    AppLaunched,

    /// An app was closed on request.
    ///
    /// Sets: `app`
    AppClosed,

    /// An app process exited while it should have been running.
    ///
    /// Sets: `app`, `reason` (exit status)
    AppCrashed,

    /// An app process exited during a StartGame retry loop; no task was posted.
    ///
    /// Sets: `app`, `reason` (exit status)
    CrashSuppressed,

    /// FocusApp could not verify focus.
    ///
    /// Sets: `app`
    FocusFailed,

    // === Power events ===
    /// The machine is being suspended.
    ///
    /// Sets: `delay_ms` (requested sleep length)
    SleepEntered,

    /// The suspend call returned.
    ///
    /// Sets: `reason` (only if the suspend failed)
    Woke,

    /// Shutdown requested (OS signal or stop handle).
    ShutdownRequested,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `reason` (`subscriber=<name> info=<panic>`)
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `reason` (`subscriber=<name> reason=<full|closed>`)
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// State the event refers to (handler, or target of a transition).
    pub state: Option<StateId>,
    /// Previous state of a transition.
    pub from: Option<StateId>,
    /// Task kind the event refers to.
    pub task: Option<TaskKind>,
    /// App id, if applicable.
    pub app: Option<Arc<str>>,
    /// Attempt count (starting from 1), or a byte count for `StatusSent`.
    pub attempt: Option<u32>,
    /// Delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, status text, exit status).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            state: None,
            from: None,
            task: None,
            app: None,
            attempt: None,
            delay_ms: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_state(mut self, state: StateId) -> Self {
        self.state = Some(state);
        self
    }

    #[inline]
    pub fn with_from(mut self, from: StateId) -> Self {
        self.from = Some(from);
        self
    }

    #[inline]
    pub fn with_task(mut self, task: TaskKind) -> Self {
        self.task = Some(task);
        self
    }

    #[inline]
    pub fn with_app(mut self, app: impl Into<Arc<str>>) -> Self {
        self.app = Some(app.into());
        self
    }

    /// Attaches an app id if present.
    #[inline]
    pub fn with_app_opt(self, app: Option<&str>) -> Self {
        match app {
            Some(a) => self.with_app(a),
            None => self,
        }
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }
}
