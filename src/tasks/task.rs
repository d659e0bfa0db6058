//! # Tasks: immutable requests for the event loop.
//!
//! A [`Task`] is produced by any thread (transport, timer, crash watcher, sleep
//! check, input hook) and consumed only by the [`EventLoop`](crate::EventLoop).
//! Its [`TaskKind`] says what is requested; the optional `data` carries the
//! kind-specific payload (app id, state name, free text).
//!
//! ## Example
//! ```rust
//! use kioskvisor::{Task, TaskKind};
//!
//! let t = Task::new(TaskKind::StartApp).with_data("pong");
//! assert_eq!(t.kind(), TaskKind::StartApp);
//! assert_eq!(t.data(), Some("pong"));
//!
//! // Empty payloads are normalised to "no payload".
//! assert!(!Task::new(TaskKind::CloseApp).with_data("").has_data());
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::states::StateId;

/// Global sequence counter for task ordering.
static TASK_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Diagnostic task; states only log it.
    Test,
    /// User activity (re-posted raw input or a UI activity message).
    Interaction,
    /// Switch the active state. Data: state name. Handled by the loop itself.
    ChangeState,
    /// Launch an app. Data: app id.
    StartApp,
    /// Close an app. Data: app id (optional in `InGame`).
    CloseApp,
    /// Set or clear ActiveApp. Data: app id or none. Handled by the loop itself.
    SetActiveApp,
    /// An app process exited while it should be running. Data: app id.
    AppCrashed,
    /// The countdown timer expired.
    Timeout,
    /// The sleep window is active.
    Sleep,
    /// The machine resumed from suspend.
    Wake,
}

impl TaskKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskKind::Test => "test",
            TaskKind::Interaction => "interaction",
            TaskKind::ChangeState => "change_state",
            TaskKind::StartApp => "start_app",
            TaskKind::CloseApp => "close_app",
            TaskKind::SetActiveApp => "set_active_app",
            TaskKind::AppCrashed => "app_crashed",
            TaskKind::Timeout => "timeout",
            TaskKind::Sleep => "sleep",
            TaskKind::Wake => "wake",
        }
    }
}

/// Immutable task with optional payload.
///
/// - `seq`: monotonic global sequence (enqueue order across producers)
/// - `at`: wall-clock creation time (for logs)
#[derive(Clone, Debug)]
pub struct Task {
    seq: u64,
    at: SystemTime,
    kind: TaskKind,
    data: Option<Arc<str>>,
}

impl Task {
    /// Creates a task of the given kind without payload.
    pub fn new(kind: TaskKind) -> Self {
        Self {
            seq: TASK_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            data: None,
        }
    }

    /// Attaches a payload. An empty string means "no payload".
    #[inline]
    pub fn with_data(mut self, data: impl Into<Arc<str>>) -> Self {
        let data: Arc<str> = data.into();
        self.data = if data.is_empty() { None } else { Some(data) };
        self
    }

    /// `ChangeState` task targeting `state`.
    pub fn change_state(state: StateId) -> Self {
        Task::new(TaskKind::ChangeState).with_data(state.as_str())
    }

    /// `SetActiveApp` task; `None` clears ActiveApp.
    pub fn set_active_app(app_id: Option<&str>) -> Self {
        let task = Task::new(TaskKind::SetActiveApp);
        match app_id {
            Some(id) => task.with_data(id),
            None => task,
        }
    }

    /// `StartApp` task for `app_id`.
    pub fn start_app(app_id: &str) -> Self {
        Task::new(TaskKind::StartApp).with_data(app_id)
    }

    /// `AppCrashed` task for `app_id`.
    pub fn app_crashed(app_id: &str) -> Self {
        Task::new(TaskKind::AppCrashed).with_data(app_id)
    }

    #[inline]
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    #[inline]
    pub fn at(&self) -> SystemTime {
        self.at
    }

    /// Returns the payload, if any.
    #[inline]
    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    #[inline]
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Returns a copy of this task carrying `data` instead (same `seq`/`at`).
    ///
    /// Used by the loop to target ActiveApp with payload-less tasks in `InGame`.
    pub(crate) fn retarget(&self, data: Option<&str>) -> Task {
        Task {
            seq: self.seq,
            at: self.at,
            kind: self.kind,
            data: data.filter(|d| !d.is_empty()).map(Arc::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_follows_creation_order() {
        let a = Task::new(TaskKind::Test);
        let b = Task::new(TaskKind::Test);
        assert!(b.seq() > a.seq());
    }

    #[test]
    fn retarget_keeps_identity() {
        let t = Task::new(TaskKind::Timeout);
        let r = t.retarget(Some("pong"));
        assert_eq!(r.seq(), t.seq());
        assert_eq!(r.kind(), TaskKind::Timeout);
        assert_eq!(r.data(), Some("pong"));
        assert!(!t.has_data());
    }

    #[test]
    fn change_state_carries_state_name() {
        let t = Task::change_state(StateId::InMenu);
        assert_eq!(t.kind(), TaskKind::ChangeState);
        assert_eq!(t.data(), Some("in_menu"));
    }

    #[test]
    fn set_active_app_none_has_no_payload() {
        assert!(!Task::set_active_app(None).has_data());
        assert_eq!(Task::set_active_app(Some("pong")).data(), Some("pong"));
    }
}
