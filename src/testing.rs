//! Test doubles shared by the unit tests of several modules.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::apps::{AppCatalog, AppControl, AppDescriptor, AppKind, Media, WindowId, WindowManager};
use crate::commands::{ColorScheme, CommandDeps, CommandLayer, CommandSettings, Commands, VolumeLevel};
use crate::error::{AppError, SleepError};
use crate::events::Bus;
use crate::hardware::{ColorData, Hardware};
use crate::sleep::{SleepScheduler, SleepWindow, Suspender};
use crate::states::StateId;
use crate::tasks::{channel, InteractionFeedback, TaskQueue, TaskSender};
use crate::timer::Timer;
use crate::transport::StatusSink;

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap()
}

// ---- commands ----

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    StartGame(String),
    CloseGame(String),
    FocusApp(String),
    SendToUi(String),
    EnterSleep,
    SetTimer(u64),
    SetTimerGame,
    SetTimerMenu,
    ResetTimer,
    StopTimer,
    ChangeState(StateId),
    SetActiveApp(Option<String>),
    SetInteractionFeedback(bool),
    SetButtonColors(ColorScheme),
    ClearButtonColors,
    SetVolume(VolumeLevel),
    FadeVolume(VolumeLevel),
}

/// [`Commands`] that only records what the states asked for.
pub(crate) struct RecordingCommands {
    calls: Mutex<Vec<Call>>,
    configured: HashSet<String>,
    start_result: bool,
}

impl RecordingCommands {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            configured: HashSet::new(),
            start_result: true,
        }
    }

    pub(crate) fn configure(mut self, app_id: &str) -> Self {
        self.configured.insert(app_id.to_string());
        self
    }

    pub(crate) fn start_result(mut self, ok: bool) -> Self {
        self.start_result = ok;
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::SendToUi(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn state_changes(&self) -> Vec<StateId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::ChangeState(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl Commands for RecordingCommands {
    async fn start_game(&self, app_id: &str) -> bool {
        self.record(Call::StartGame(app_id.into()));
        self.start_result
    }

    async fn close_game(&self, app_id: &str) -> bool {
        self.record(Call::CloseGame(app_id.into()));
        true
    }

    async fn focus_app(&self, app_id: &str) -> bool {
        self.record(Call::FocusApp(app_id.into()));
        true
    }

    async fn send_to_ui(&self, text: &str) -> usize {
        self.record(Call::SendToUi(text.into()));
        text.len()
    }

    async fn enter_sleep(&self) -> bool {
        self.record(Call::EnterSleep);
        true
    }

    fn set_timer(&self, seconds: u64) {
        self.record(Call::SetTimer(seconds));
    }

    fn set_timer_game(&self) {
        self.record(Call::SetTimerGame);
    }

    fn set_timer_menu(&self) {
        self.record(Call::SetTimerMenu);
    }

    fn reset_timer(&self) {
        self.record(Call::ResetTimer);
    }

    fn stop_timer(&self) {
        self.record(Call::StopTimer);
    }

    fn change_state(&self, state: StateId) {
        self.record(Call::ChangeState(state));
    }

    fn set_active_app(&self, app_id: Option<&str>) {
        self.record(Call::SetActiveApp(app_id.map(str::to_string)));
    }

    fn verify_app_is_configured(&self, app_id: &str) -> bool {
        self.configured.contains(app_id)
    }

    fn set_interaction_feedback(&self, enabled: bool) {
        self.record(Call::SetInteractionFeedback(enabled));
    }

    fn set_button_colors(&self, scheme: ColorScheme) {
        self.record(Call::SetButtonColors(scheme));
    }

    fn clear_button_colors(&self) {
        self.record(Call::ClearButtonColors);
    }

    fn set_volume(&self, level: VolumeLevel) {
        self.record(Call::SetVolume(level));
    }

    fn fade_volume(&self, level: VolumeLevel) {
        self.record(Call::FadeVolume(level));
    }
}

// ---- apps ----

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AppCall {
    Start(String),
    VerifyRunning(String),
    FocusSync(String),
    VerifyFocus(String),
    Close(String),
    VerifyClosed(String),
    MarkStarting(String, bool),
}

/// Scripted [`AppControl`]. Verifications answer from their script and fall
/// back to `false` once it is used up.
pub(crate) struct FakeApps {
    calls: Mutex<Vec<AppCall>>,
    running: Mutex<VecDeque<bool>>,
    focus: Mutex<VecDeque<bool>>,
    closed: AtomicBool,
    exit_during_start: AtomicBool,
}

impl FakeApps {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            running: Mutex::new(VecDeque::new()),
            focus: Mutex::new(VecDeque::new()),
            closed: AtomicBool::new(true),
            exit_during_start: AtomicBool::new(false),
        }
    }

    /// The process dies inside the start loop after passing verification.
    pub(crate) fn with_exit_during_start(self) -> Self {
        self.exit_during_start.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn with_running(self, script: impl IntoIterator<Item = bool>) -> Self {
        lock(&self.running).extend(script);
        self
    }

    pub(crate) fn with_focus(self, script: impl IntoIterator<Item = bool>) -> Self {
        lock(&self.focus).extend(script);
        self
    }

    pub(crate) fn with_closed(self, closed: bool) -> Self {
        self.closed.store(closed, Ordering::SeqCst);
        self
    }

    pub(crate) fn calls(&self) -> Vec<AppCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: AppCall) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl AppControl for FakeApps {
    async fn start_app(&self, app_id: &str) -> Result<(), AppError> {
        self.record(AppCall::Start(app_id.into()));
        self.closed.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn verify_running(&self, app_id: &str) -> bool {
        self.record(AppCall::VerifyRunning(app_id.into()));
        lock(&self.running).pop_front().unwrap_or(false)
    }

    async fn focus_app_sync(&self, app_id: &str) -> bool {
        self.record(AppCall::FocusSync(app_id.into()));
        true
    }

    async fn verify_focus(&self, app_id: &str) -> bool {
        self.record(AppCall::VerifyFocus(app_id.into()));
        lock(&self.focus).pop_front().unwrap_or(false)
    }

    async fn close_app(&self, app_id: &str) {
        self.record(AppCall::Close(app_id.into()));
        self.closed.store(true, Ordering::SeqCst);
    }

    async fn verify_closed(&self, app_id: &str) -> bool {
        self.record(AppCall::VerifyClosed(app_id.into()));
        self.closed.load(Ordering::SeqCst)
    }

    async fn mark_starting(&self, app_id: &str, starting: bool) -> bool {
        self.record(AppCall::MarkStarting(app_id.into(), starting));
        starting || !self.exit_during_start.load(Ordering::SeqCst)
    }
}

/// Executable descriptors for `ids`, without button colors.
pub(crate) fn catalog(ids: &[&str]) -> AppCatalog {
    AppCatalog::from_descriptors(
        "/tmp",
        ids.iter().map(|id| {
            let descriptor = AppDescriptor {
                kind: AppKind::Executable {
                    exe: format!("{id}.bin"),
                    debug_path: None,
                },
                media: Media {
                    logo: "logo.png".into(),
                },
                button_colors: None,
            };
            (id.to_string(), descriptor)
        }),
    )
}

// ---- windows ----

#[derive(Default)]
struct WindowState {
    shown: Option<WindowId>,
    active: Option<WindowId>,
}

/// In-memory window manager with at most one window.
pub(crate) struct FakeWindows {
    state: Mutex<WindowState>,
    kill_delay: Duration,
}

impl FakeWindows {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(WindowState::default()),
            kill_delay: Duration::ZERO,
        }
    }

    pub(crate) fn with_kill_delay(mut self, delay: Duration) -> Self {
        self.kill_delay = delay;
        self
    }

    pub(crate) fn show(&self, id: WindowId) {
        lock(&self.state).shown = Some(id);
    }
}

#[async_trait]
impl WindowManager for FakeWindows {
    async fn find_window(&self, _term: &str) -> Result<Option<WindowId>, AppError> {
        Ok(lock(&self.state).shown)
    }

    async fn active_window(&self) -> Result<WindowId, AppError> {
        lock(&self.state).active.ok_or_else(|| AppError::WindowTool {
            command: "getactivewindow".into(),
            reason: "no active window".into(),
        })
    }

    async fn activate_sync(&self, term: &str) -> Result<(), AppError> {
        let mut state = lock(&self.state);
        match state.shown {
            Some(id) => {
                state.active = Some(id);
                Ok(())
            }
            None => Err(AppError::WindowTool {
                command: format!("search {term}"),
                reason: "no window".into(),
            }),
        }
    }

    async fn kill_window(&self, _term: &str) -> Result<(), AppError> {
        if !self.kill_delay.is_zero() {
            tokio::time::sleep(self.kill_delay).await;
        }
        let mut state = lock(&self.state);
        state.shown = None;
        state.active = None;
        Ok(())
    }
}

// ---- sleep ----

enum SuspendMode {
    Immediate,
    Failing,
    Gated(Notify),
}

/// [`Suspender`] recording requested durations.
pub(crate) struct FakeSuspender {
    mode: SuspendMode,
    requested: Mutex<Vec<Duration>>,
}

impl FakeSuspender {
    fn with_mode(mode: SuspendMode) -> Self {
        Self {
            mode,
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Resumes right away.
    pub(crate) fn immediate() -> Self {
        Self::with_mode(SuspendMode::Immediate)
    }

    /// Reports a failed suspend.
    pub(crate) fn failing() -> Self {
        Self::with_mode(SuspendMode::Failing)
    }

    /// Resumes only after [`FakeSuspender::resume`].
    pub(crate) fn gated() -> Self {
        Self::with_mode(SuspendMode::Gated(Notify::new()))
    }

    pub(crate) fn resume(&self) {
        if let SuspendMode::Gated(gate) = &self.mode {
            gate.notify_one();
        }
    }

    pub(crate) fn requested(&self) -> Vec<Duration> {
        lock(&self.requested).clone()
    }
}

#[async_trait]
impl Suspender for FakeSuspender {
    async fn suspend(&self, duration: Duration) -> Result<(), SleepError> {
        lock(&self.requested).push(duration);
        match &self.mode {
            SuspendMode::Immediate => Ok(()),
            SuspendMode::Failing => Err(SleepError::Suspend {
                reason: "exit status: 1".into(),
            }),
            SuspendMode::Gated(gate) => {
                gate.notified().await;
                Ok(())
            }
        }
    }
}

// ---- hardware and transport ----

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HardwareCall {
    Colors(ColorData),
    Clear,
    QueueClear,
    Volume(u8),
    Fade(u8, Duration),
}

#[derive(Default)]
pub(crate) struct RecordingHardware {
    calls: Mutex<Vec<HardwareCall>>,
}

impl RecordingHardware {
    pub(crate) fn calls(&self) -> Vec<HardwareCall> {
        lock(&self.calls).clone()
    }
}

impl Hardware for RecordingHardware {
    fn set_button_colors(&self, colors: &ColorData) {
        lock(&self.calls).push(HardwareCall::Colors(colors.clone()));
    }

    fn clear_button_colors(&self) {
        lock(&self.calls).push(HardwareCall::Clear);
    }

    fn queue_clear_button_colors(&self) {
        lock(&self.calls).push(HardwareCall::QueueClear);
    }

    fn set_volume(&self, pct: u8) {
        lock(&self.calls).push(HardwareCall::Volume(pct));
    }

    fn fade_volume(&self, pct: u8, duration: Duration) {
        lock(&self.calls).push(HardwareCall::Fade(pct, duration));
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    sent: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub(crate) fn sent(&self) -> Vec<String> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl StatusSink for RecordingSink {
    async fn send_status(&self, text: &str) -> usize {
        lock(&self.sent).push(text.to_string());
        text.len()
    }
}

// ---- command layer harness ----

/// Fakes wired around a real [`CommandLayer`].
pub(crate) struct Harness {
    pub(crate) apps: Arc<FakeApps>,
    pub(crate) sink: Arc<RecordingSink>,
    pub(crate) hardware: Arc<RecordingHardware>,
    pub(crate) suspender: Arc<FakeSuspender>,
    pub(crate) feedback: Arc<InteractionFeedback>,
    pub(crate) timer: Arc<Timer>,
    pub(crate) bus: Bus,
    pub(crate) tasks: TaskSender,
    pub(crate) queue: TaskQueue,
}

impl Harness {
    pub(crate) fn new(apps: FakeApps, suspender: FakeSuspender) -> Self {
        let (tasks, queue) = channel();
        Self {
            apps: Arc::new(apps),
            sink: Arc::new(RecordingSink::default()),
            hardware: Arc::new(RecordingHardware::default()),
            suspender: Arc::new(suspender),
            feedback: Arc::new(InteractionFeedback::new(tasks.clone())),
            timer: Arc::new(Timer::new(tasks.clone())),
            bus: Bus::new(256),
            tasks,
            queue,
        }
    }

    /// Command layer over the fakes, with `ids` configured.
    pub(crate) fn commands(&self, ids: &[&str]) -> CommandLayer {
        let sleep = SleepScheduler::new(SleepWindow::new(0, 0), self.suspender.clone());
        let deps = CommandDeps {
            apps: self.apps.clone(),
            catalog: Arc::new(catalog(ids)),
            timer: self.timer.clone(),
            tasks: self.tasks.clone(),
            ui: self.sink.clone(),
            hardware: self.hardware.clone(),
            feedback: self.feedback.clone(),
            sleep: Arc::new(sleep),
            bus: self.bus.clone(),
        };
        CommandLayer::new(deps, CommandSettings::default())
    }
}
