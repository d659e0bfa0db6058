//! # App supervisor: one OS process per logical app id.
//!
//! ```text
//! NotRunning ──start_app──► Launching ──verify_running──► Running
//!     ▲                                                    │
//!     └────────── close_app (Stopping) / watcher (Crashed) ┘
//! ```
//!
//! ## Architecture
//! ```text
//! start_app(id)
//!   ├─ catalog.launch_spec(id)            NotConfigured if absent
//!   ├─ existing record? stop it first
//!   ├─ spawn process, insert Record { should_be_running = true }
//!   └─ spawn watcher ─► select! { child.wait(), stop.cancelled() }
//!                         exit && should_be_running ─► post AppCrashed
//!
//! close_app(id)
//!   ├─ should_be_running = false          before anything is killed
//!   ├─ windows.kill_window(term)
//!   └─ cancel watcher, await it (bounded by stop_grace)
//! ```
//!
//! ## Rules
//! - The record map is owned by the supervisor; callers only use its methods.
//! - Watchers never touch state; they report by posting an `AppCrashed` task.
//! - Exits of an app inside a StartGame retry loop (see [`AppControl::mark_starting`])
//!   are reported as `CrashSuppressed` events instead. Clearing the mark returns
//!   `false` if such an exit happened.
//! - "Running" and "closed" are confirmed through the window manager.

use std::collections::{HashMap, HashSet};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::{Task, TaskSender};

use super::catalog::AppLookup;
use super::kind::LaunchSpec;
use super::window::WindowManager;

/// Process-lifecycle operations the command layer builds on.
///
/// Verification methods fail soft: any tool error reads as `false`.
#[async_trait]
pub trait AppControl: Send + Sync {
    /// Spawns `app_id`, replacing a previous process of the same id.
    async fn start_app(&self, app_id: &str) -> Result<(), AppError>;

    /// Record exists, process alive, and a matching window is visible.
    async fn verify_running(&self, app_id: &str) -> bool;

    /// Asks the window manager to focus the app window and waits for it.
    async fn focus_app_sync(&self, app_id: &str) -> bool;

    /// The focused window is the app's window.
    async fn verify_focus(&self, app_id: &str) -> bool;

    /// Kills the app window and process; idempotent.
    async fn close_app(&self, app_id: &str);

    /// No window matching the app is visible.
    async fn verify_closed(&self, app_id: &str) -> bool;

    /// Marks `app_id` as inside a StartGame retry loop, or clears the mark.
    ///
    /// Clearing returns `false` when the process already exited while marked.
    /// That exit was suppressed, so it is the caller's to handle.
    async fn mark_starting(&self, _app_id: &str, _starting: bool) -> bool {
        true
    }
}

/// Book-keeping for one spawned process.
struct Record {
    spec: LaunchSpec,
    should_be_running: Arc<AtomicBool>,
    exited: Arc<AtomicBool>,
    stop: CancellationToken,
    watcher: JoinHandle<()>,
}

/// Everything a watcher needs after the spawn.
struct Watch {
    app_id: String,
    should_be_running: Arc<AtomicBool>,
    exited: Arc<AtomicBool>,
    stop: CancellationToken,
    starting: Arc<RwLock<HashSet<String>>>,
    tasks: TaskSender,
    bus: Bus,
}

/// Production [`AppControl`].
pub struct AppSupervisor {
    catalog: Arc<dyn AppLookup>,
    windows: Arc<dyn WindowManager>,
    records: RwLock<HashMap<String, Record>>,
    starting: Arc<RwLock<HashSet<String>>>,
    tasks: TaskSender,
    bus: Bus,
    stop_grace: Duration,
}

impl AppSupervisor {
    pub fn new(
        catalog: Arc<dyn AppLookup>,
        windows: Arc<dyn WindowManager>,
        tasks: TaskSender,
        bus: Bus,
        stop_grace: Duration,
    ) -> Self {
        Self {
            catalog,
            windows,
            records: RwLock::new(HashMap::new()),
            starting: Arc::new(RwLock::new(HashSet::new())),
            tasks,
            bus,
            stop_grace,
        }
    }

    /// Sorted ids of apps with a live record.
    pub async fn running(&self) -> Vec<String> {
        let records = self.records.read().await;
        let mut ids: Vec<String> = records.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Closes every app. Used on shutdown.
    pub async fn close_all(&self) {
        let records: Vec<(String, Record)> = {
            let mut records = self.records.write().await;
            records.drain().collect()
        };
        for (_, r) in &records {
            r.should_be_running.store(false, Ordering::SeqCst);
        }
        for (app_id, r) in records {
            if let Err(e) = self.windows.kill_window(&r.spec.window_term).await {
                debug!(app = %app_id, error = %e, "window kill on shutdown failed");
            }
            self.stop_record(&app_id, r).await;
        }
    }

    /// Window search term: from the live record, else from the catalog.
    async fn window_term(&self, app_id: &str) -> Option<String> {
        if let Some(r) = self.records.read().await.get(app_id) {
            return Some(r.spec.window_term.clone());
        }
        self.catalog.launch_spec(app_id).ok().map(|s| s.window_term)
    }

    /// Cancels the watcher (killing the process) and waits for it.
    async fn stop_record(&self, app_id: &str, record: Record) {
        record.should_be_running.store(false, Ordering::SeqCst);
        record.stop.cancel();
        if tokio::time::timeout(self.stop_grace, record.watcher)
            .await
            .is_err()
        {
            warn!(app = app_id, grace_ms = self.stop_grace.as_millis() as u64, "app process did not stop in time");
        }
    }

    fn spawn(&self, app_id: &str, spec: &LaunchSpec) -> Result<Child, AppError> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }
        cmd.spawn().map_err(|source| AppError::Spawn {
            app_id: app_id.to_string(),
            source,
        })
    }
}

#[async_trait]
impl AppControl for AppSupervisor {
    async fn start_app(&self, app_id: &str) -> Result<(), AppError> {
        let spec = self.catalog.launch_spec(app_id)?;

        let previous = self.records.write().await.remove(app_id);
        if let Some(old) = previous {
            debug!(app = app_id, "replacing running process");
            self.stop_record(app_id, old).await;
        }

        let child = self.spawn(app_id, &spec)?;
        let should_be_running = Arc::new(AtomicBool::new(true));
        let exited = Arc::new(AtomicBool::new(false));
        let stop = CancellationToken::new();

        let watcher = tokio::spawn(watch(
            child,
            Watch {
                app_id: app_id.to_string(),
                should_be_running: should_be_running.clone(),
                exited: exited.clone(),
                stop: stop.clone(),
                starting: self.starting.clone(),
                tasks: self.tasks.clone(),
                bus: self.bus.clone(),
            },
        ));

        info!(app = app_id, program = %spec.program.display(), "app launched");
        self.records.write().await.insert(
            app_id.to_string(),
            Record {
                spec,
                should_be_running,
                exited,
                stop,
                watcher,
            },
        );
        self.bus
            .publish(Event::new(EventKind::AppLaunched).with_app(app_id));
        Ok(())
    }

    async fn verify_running(&self, app_id: &str) -> bool {
        let term = {
            let records = self.records.read().await;
            let Some(r) = records.get(app_id) else {
                return false;
            };
            let alive =
                r.should_be_running.load(Ordering::SeqCst) && !r.exited.load(Ordering::SeqCst);
            if !alive {
                return false;
            }
            r.spec.window_term.clone()
        };

        match self.windows.find_window(&term).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                debug!(app = app_id, error = %e, "window search failed");
                false
            }
        }
    }

    async fn focus_app_sync(&self, app_id: &str) -> bool {
        let Some(term) = self.window_term(app_id).await else {
            return false;
        };
        match self.windows.activate_sync(&term).await {
            Ok(()) => true,
            Err(e) => {
                warn!(app = app_id, error = %e, "focus failed");
                false
            }
        }
    }

    async fn verify_focus(&self, app_id: &str) -> bool {
        let Some(term) = self.window_term(app_id).await else {
            return false;
        };
        let active = self.windows.active_window().await;
        let window = self.windows.find_window(&term).await;
        match (active, window) {
            (Ok(active), Ok(Some(window))) => active == window,
            (Ok(_), Ok(None)) => false,
            (Err(e), _) | (_, Err(e)) => {
                debug!(app = app_id, error = %e, "focus check failed");
                false
            }
        }
    }

    async fn close_app(&self, app_id: &str) {
        let record = self.records.write().await.remove(app_id);
        if let Some(r) = &record {
            r.should_be_running.store(false, Ordering::SeqCst);
        }

        let term = match &record {
            Some(r) => Some(r.spec.window_term.clone()),
            None => self.catalog.launch_spec(app_id).ok().map(|s| s.window_term),
        };
        if let Some(term) = term {
            if let Err(e) = self.windows.kill_window(&term).await {
                debug!(app = app_id, error = %e, "window kill failed");
            }
        }

        if let Some(r) = record {
            self.stop_record(app_id, r).await;
            self.bus
                .publish(Event::new(EventKind::AppClosed).with_app(app_id));
        }
    }

    async fn verify_closed(&self, app_id: &str) -> bool {
        let Ok(spec) = self.catalog.launch_spec(app_id) else {
            return true;
        };
        match self.windows.find_window(&spec.window_term).await {
            Ok(found) => found.is_none(),
            Err(e) => {
                debug!(app = app_id, error = %e, "window search failed");
                false
            }
        }
    }

    async fn mark_starting(&self, app_id: &str, starting: bool) -> bool {
        {
            let mut set = self.starting.write().await;
            if starting {
                set.insert(app_id.to_string());
                return true;
            }
            set.remove(app_id);
        }

        // The watcher sets `exited` before it consults the starting set.
        let records = self.records.read().await;
        let Some(r) = records.get(app_id) else {
            return true;
        };
        let died = r.should_be_running.load(Ordering::SeqCst) && r.exited.load(Ordering::SeqCst);
        if died {
            warn!(app = app_id, "app exited before its start completed");
            self.bus.publish(
                Event::new(EventKind::AppCrashed)
                    .with_app(app_id)
                    .with_reason("exited during start"),
            );
        }
        !died
    }
}

/// Waits for the process to exit (or to be stopped) and reports crashes.
async fn watch(mut child: Child, w: Watch) {
    let status = tokio::select! {
        status = child.wait() => status,
        _ = w.stop.cancelled() => {
            let _ = child.start_kill();
            child.wait().await
        }
    };
    w.exited.store(true, Ordering::SeqCst);

    if !w.should_be_running.load(Ordering::SeqCst) {
        debug!(app = %w.app_id, "app process stopped");
        return;
    }

    let reason = match status {
        Ok(s) => s.to_string(),
        Err(e) => e.to_string(),
    };
    if w.starting.read().await.contains(&w.app_id) {
        debug!(app = %w.app_id, %reason, "exit during start ignored");
        w.bus.publish(
            Event::new(EventKind::CrashSuppressed)
                .with_app(w.app_id.as_str())
                .with_reason(reason),
        );
        return;
    }

    w.tasks.post(Task::app_crashed(&w.app_id));
    w.bus.publish(
        Event::new(EventKind::AppCrashed)
            .with_app(w.app_id.as_str())
            .with_reason(reason),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::{AppCatalog, AppDescriptor, AppKind, Media};
    use crate::tasks::{channel, TaskKind, TaskQueue};
    use crate::testing::FakeWindows;

    fn catalog(command: &str) -> Arc<AppCatalog> {
        let descriptor = AppDescriptor {
            kind: AppKind::MameRom {
                command: command.to_string(),
            },
            media: Media { logo: "logo.png".into() },
            button_colors: None,
        };
        Arc::new(AppCatalog::from_descriptors(
            "/tmp",
            [("demo".to_string(), descriptor)],
        ))
    }

    fn supervisor(command: &str, windows: Arc<FakeWindows>) -> (AppSupervisor, TaskQueue, Bus) {
        let (tx, rx) = channel();
        let bus = Bus::new(64);
        let sup = AppSupervisor::new(
            catalog(command),
            windows,
            tx,
            bus.clone(),
            Duration::from_secs(2),
        );
        (sup, rx, bus)
    }

    #[tokio::test]
    async fn normal_close_is_not_reported_as_crash() {
        // The process exits on its own while the window kill is still in flight.
        let windows = Arc::new(FakeWindows::new().with_kill_delay(Duration::from_millis(300)));
        let (sup, mut rx, bus) = supervisor("sleep 0.1", windows);
        let mut events = bus.subscribe();

        sup.start_app("demo").await.unwrap();
        sup.close_app("demo").await;
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(rx.try_next().is_none());
        assert!(sup.running().await.is_empty());
        let mut kinds = Vec::new();
        while let Ok(ev) = events.try_recv() {
            kinds.push(ev.kind);
        }
        assert_eq!(kinds, vec![EventKind::AppLaunched, EventKind::AppClosed]);
    }

    #[tokio::test]
    async fn unexpected_exit_posts_app_crashed() {
        let (sup, mut rx, _bus) = supervisor("sleep 0.1", Arc::new(FakeWindows::new()));
        sup.start_app("demo").await.unwrap();

        let task = tokio::time::timeout(Duration::from_secs(5), rx.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task.kind(), TaskKind::AppCrashed);
        assert_eq!(task.data(), Some("demo"));
        assert!(!sup.verify_running("demo").await);
    }

    #[tokio::test]
    async fn exit_during_start_is_suppressed() {
        let (sup, mut rx, bus) = supervisor("sleep 0.1", Arc::new(FakeWindows::new()));
        let mut events = bus.subscribe();

        sup.mark_starting("demo", true).await;
        sup.start_app("demo").await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!sup.mark_starting("demo", false).await);

        assert!(rx.try_next().is_none());
        let mut suppressed = false;
        while let Ok(ev) = events.try_recv() {
            suppressed |= ev.kind == EventKind::CrashSuppressed;
        }
        assert!(suppressed);
    }

    #[tokio::test]
    async fn clearing_the_start_mark_of_a_live_app_reports_success() {
        let (sup, mut rx, _bus) = supervisor("sleep 30", Arc::new(FakeWindows::new()));

        assert!(sup.mark_starting("demo", true).await);
        sup.start_app("demo").await.unwrap();
        assert!(sup.mark_starting("demo", false).await);

        // Nothing recorded after a close.
        sup.mark_starting("demo", true).await;
        sup.close_app("demo").await;
        assert!(sup.mark_starting("demo", false).await);
        assert!(rx.try_next().is_none());
    }

    #[tokio::test]
    async fn running_needs_a_window() {
        let windows = Arc::new(FakeWindows::new());
        let (sup, mut rx, _bus) = supervisor("sleep 30", windows.clone());

        sup.start_app("demo").await.unwrap();
        assert!(!sup.verify_running("demo").await);

        windows.show(7);
        assert!(sup.verify_running("demo").await);
        assert!(!sup.verify_closed("demo").await);
        assert!(sup.focus_app_sync("demo").await);
        assert!(sup.verify_focus("demo").await);

        sup.close_app("demo").await;
        assert!(!sup.verify_running("demo").await);
        assert!(sup.verify_closed("demo").await);
        assert!(rx.try_next().is_none());
    }

    #[tokio::test]
    async fn restart_replaces_process_without_crash() {
        let (sup, mut rx, _bus) = supervisor("sleep 30", Arc::new(FakeWindows::new()));
        sup.start_app("demo").await.unwrap();
        sup.start_app("demo").await.unwrap();
        assert_eq!(sup.running().await, vec!["demo".to_string()]);

        sup.close_all().await;
        assert!(sup.running().await.is_empty());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_next().is_none());
    }

    #[tokio::test]
    async fn unconfigured_app_is_rejected() {
        let (sup, _rx, _bus) = supervisor("sleep 1", Arc::new(FakeWindows::new()));
        let err = sup.start_app("pong").await.unwrap_err();
        assert!(matches!(err, AppError::NotConfigured { .. }));
        assert!(sup.verify_closed("pong").await);
    }
}
