//! # Production command layer.
//!
//! [`CommandLayer`] implements the [`Commands`] catalog on top of the app
//! supervisor, timer, transport, hardware and sleep scheduler. Dependencies are
//! passed in explicitly through [`CommandDeps`].
//!
//! ## StartGame
//! ```text
//! verify_closed? no ─► close_game
//! mark_starting(app)
//! for attempt in 1..=N:
//!     close_app, LaunchAttempt, start_app
//!     verify_running ─ ok ─► started
//!     sleep(settle); verify_running ─ ok ─► started
//!     RetryScheduled, sleep(delay)          (not after the last attempt)
//! exhausted ─► close_app
//! mark_starting(app) cleared ─ process gone ─► close_app, not started
//! ```
//! The loop always runs to success or exhaustion; it is not cancellable.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::apps::{AppControl, AppLookup};
use crate::config::Config;
use crate::error::AppError;
use crate::events::{Bus, Event, EventKind};
use crate::hardware::{ColorData, Hardware};
use crate::policies::RetryPolicy;
use crate::sleep::SleepScheduler;
use crate::states::StateId;
use crate::tasks::{InteractionFeedback, Task, TaskKind, TaskSender};
use crate::timer::Timer;
use crate::transport::StatusSink;

use super::{ColorScheme, CommandId, Commands, VolumeLevel};

/// Collaborators of the command layer.
pub struct CommandDeps {
    pub apps: Arc<dyn AppControl>,
    pub catalog: Arc<dyn AppLookup>,
    pub timer: Arc<Timer>,
    pub tasks: TaskSender,
    pub ui: Arc<dyn StatusSink>,
    pub hardware: Arc<dyn Hardware>,
    pub feedback: Arc<InteractionFeedback>,
    pub sleep: Arc<SleepScheduler>,
    pub bus: Bus,
}

/// Policies and presets of the command layer.
#[derive(Clone, Debug)]
pub struct CommandSettings {
    pub start_game: RetryPolicy,
    pub focus: RetryPolicy,
    pub menu_timeout: Duration,
    pub game_timeout: Duration,
    pub menu_colors: ColorData,
    pub idle_colors: ColorData,
    pub menu_volume: u8,
    pub idle_volume: u8,
    pub game_volume: u8,
    pub fade: Duration,
}

impl CommandSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            start_game: cfg.start_game_policy(),
            focus: cfg.focus_policy(),
            menu_timeout: cfg.menu_timeout(),
            game_timeout: cfg.game_timeout(),
            menu_colors: cfg.buttons.menu.clone(),
            idle_colors: cfg.buttons.idle.clone(),
            menu_volume: cfg.volume.menu,
            idle_volume: cfg.volume.idle,
            game_volume: cfg.volume.game,
            fade: cfg.fade_duration(),
        }
    }
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// [`Commands`] backed by the real collaborators.
pub struct CommandLayer {
    deps: CommandDeps,
    settings: CommandSettings,
}

impl CommandLayer {
    pub fn new(deps: CommandDeps, settings: CommandSettings) -> Self {
        Self { deps, settings }
    }

    pub fn settings(&self) -> &CommandSettings {
        &self.settings
    }

    /// Launch attempts of StartGame; `true` once a verification passes.
    async fn launch_with_retries(&self, app_id: &str) -> bool {
        let apps = &self.deps.apps;
        let policy = self.settings.start_game;

        for attempt in 1..=policy.attempts() {
            apps.close_app(app_id).await;
            self.deps.bus.publish(
                Event::new(EventKind::LaunchAttempt)
                    .with_app(app_id)
                    .with_attempt(attempt),
            );

            match apps.start_app(app_id).await {
                Ok(()) => {
                    if apps.verify_running(app_id).await {
                        return true;
                    }
                    if let Some(settle) = policy.settle() {
                        debug!(app = app_id, attempt, "not verified yet; settling");
                        tokio::time::sleep(settle).await;
                        if apps.verify_running(app_id).await {
                            return true;
                        }
                    }
                }
                Err(e @ AppError::NotConfigured { .. }) => {
                    warn!(app = app_id, error = %e, "launch impossible");
                    return false;
                }
                Err(e) => warn!(app = app_id, attempt, error = %e, "launch failed"),
            }

            if let Some(delay) = policy.delay_after(attempt) {
                self.deps.bus.publish(
                    Event::new(EventKind::RetryScheduled)
                        .with_app(app_id)
                        .with_attempt(attempt)
                        .with_delay(delay),
                );
                tokio::time::sleep(delay).await;
            }
        }
        false
    }

    fn colors(&self, scheme: &ColorScheme) -> ColorData {
        match scheme {
            ColorScheme::Menu => self.settings.menu_colors.clone(),
            ColorScheme::Idle => self.settings.idle_colors.clone(),
            ColorScheme::App(app_id) => self
                .deps
                .catalog
                .button_colors(app_id)
                .unwrap_or_else(|| self.settings.menu_colors.clone()),
        }
    }

    fn volume_pct(&self, level: VolumeLevel) -> u8 {
        match level {
            VolumeLevel::Menu => self.settings.menu_volume,
            VolumeLevel::Idle => self.settings.idle_volume,
            VolumeLevel::Game => self.settings.game_volume,
            VolumeLevel::Mute => 0,
        }
    }

    fn post(&self, command: CommandId, task: Task) {
        if !self.deps.tasks.post(task) {
            warn!(command = command.as_str(), "event loop gone; task dropped");
        }
    }
}

#[async_trait]
impl Commands for CommandLayer {
    async fn start_game(&self, app_id: &str) -> bool {
        let apps = &self.deps.apps;
        if !apps.verify_closed(app_id).await {
            debug!(app = app_id, "window still open; closing first");
            self.close_game(app_id).await;
        }

        apps.mark_starting(app_id, true).await;
        let mut started = self.launch_with_retries(app_id).await;
        if !started {
            apps.close_app(app_id).await;
        }
        if !apps.mark_starting(app_id, false).await && started {
            apps.close_app(app_id).await;
            started = false;
        }

        if started {
            info!(app = app_id, "app started");
        } else {
            warn!(
                app = app_id,
                attempts = self.settings.start_game.attempts(),
                "app could not be started"
            );
        }
        started
    }

    async fn close_game(&self, app_id: &str) -> bool {
        self.deps.apps.close_app(app_id).await;
        self.deps.apps.verify_closed(app_id).await
    }

    async fn focus_app(&self, app_id: &str) -> bool {
        let apps = &self.deps.apps;
        let policy = self.settings.focus;

        if !apps.focus_app_sync(app_id).await {
            debug!(app = app_id, "focus request failed; polling anyway");
        }
        for poll in 1..=policy.attempts() {
            if apps.verify_focus(app_id).await {
                return true;
            }
            if let Some(delay) = policy.delay_after(poll) {
                tokio::time::sleep(delay).await;
            }
        }

        self.deps
            .bus
            .publish(Event::new(EventKind::FocusFailed).with_app(app_id));
        false
    }

    async fn send_to_ui(&self, text: &str) -> usize {
        let sent = self.deps.ui.send_status(text).await;
        self.deps.bus.publish(
            Event::new(EventKind::StatusSent)
                .with_reason(text)
                .with_attempt(u32::try_from(sent).unwrap_or(u32::MAX)),
        );
        sent
    }

    async fn enter_sleep(&self) -> bool {
        let sleep = &self.deps.sleep;
        self.deps
            .bus
            .publish(Event::new(EventKind::SleepEntered).with_delay(sleep.until_wake()));

        let result = sleep.suspend().await;
        let woke = Event::new(EventKind::Woke);
        let ok = match result {
            Ok(()) => {
                self.deps.bus.publish(woke);
                true
            }
            Err(e) => {
                warn!(error = %e, label = e.as_label(), "suspend failed");
                self.deps.bus.publish(woke.with_reason(e.to_string()));
                false
            }
        };
        self.post(CommandId::EnterSleep, Task::new(TaskKind::Wake));
        ok
    }

    fn set_timer(&self, seconds: u64) {
        self.deps.timer.set(Duration::from_secs(seconds));
    }

    fn set_timer_game(&self) {
        self.deps.timer.set(self.settings.game_timeout);
    }

    fn set_timer_menu(&self) {
        self.deps.timer.set(self.settings.menu_timeout);
    }

    fn reset_timer(&self) {
        self.deps.timer.reset();
    }

    fn stop_timer(&self) {
        self.deps.timer.stop();
    }

    fn change_state(&self, state: StateId) {
        self.post(CommandId::ChangeState, Task::change_state(state));
    }

    fn set_active_app(&self, app_id: Option<&str>) {
        self.post(CommandId::SetActiveApp, Task::set_active_app(app_id));
    }

    fn verify_app_is_configured(&self, app_id: &str) -> bool {
        self.deps.catalog.is_configured(app_id)
    }

    fn set_interaction_feedback(&self, enabled: bool) {
        self.deps.feedback.set_enabled(enabled);
    }

    fn set_button_colors(&self, scheme: ColorScheme) {
        let colors = self.colors(&scheme);
        if matches!(scheme, ColorScheme::App(_)) {
            self.deps.hardware.queue_clear_button_colors();
        }
        self.deps.hardware.set_button_colors(&colors);
    }

    fn clear_button_colors(&self) {
        self.deps.hardware.clear_button_colors();
    }

    fn set_volume(&self, level: VolumeLevel) {
        self.deps.hardware.set_volume(self.volume_pct(level));
    }

    fn fade_volume(&self, level: VolumeLevel) {
        self.deps
            .hardware
            .fade_volume(self.volume_pct(level), self.settings.fade);
    }
}
