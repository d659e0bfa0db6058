//! # The command catalog.
//!
//! [`Commands`] is the only surface states act through. Every operation is a
//! named entry of [`CommandId`]; the production implementation is
//! [`CommandLayer`](super::CommandLayer), tests substitute a recorder.
//!
//! Commands report failure through their return value (`bool`, byte count),
//! never by returning an error, so the calling state can branch on it.
//!
//! | command                    | delegates to                                  |
//! |----------------------------|-----------------------------------------------|
//! | `start_game` `close_game` `focus_app` | app supervisor, with verification policy |
//! | `send_to_ui`               | status sink                                   |
//! | `set_timer*` `reset_timer` `stop_timer` | countdown timer                  |
//! | `change_state` `set_active_app` | task queue (handled by the event loop)   |
//! | `verify_app_is_configured` | app catalog                                   |
//! | `set_interaction_feedback` | raw-input switch                              |
//! | `set_button_colors` `clear_button_colors` `set_volume` `fade_volume` | hardware |
//! | `enter_sleep`              | sleep scheduler                               |

use async_trait::async_trait;

use crate::states::StateId;

/// Names of the catalog entries (for logs and errors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    StartGame,
    CloseGame,
    FocusApp,
    SendToUi,
    SetTimer,
    SetTimerGame,
    SetTimerMenu,
    ResetTimer,
    StopTimer,
    ChangeState,
    SetActiveApp,
    VerifyAppIsConfigured,
    SetInteractionFeedback,
    SetButtonColors,
    ClearButtonColors,
    SetVolume,
    FadeVolume,
    EnterSleep,
}

impl CommandId {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandId::StartGame => "start_game",
            CommandId::CloseGame => "close_game",
            CommandId::FocusApp => "focus_app",
            CommandId::SendToUi => "send_to_ui",
            CommandId::SetTimer => "set_timer",
            CommandId::SetTimerGame => "set_timer_game",
            CommandId::SetTimerMenu => "set_timer_menu",
            CommandId::ResetTimer => "reset_timer",
            CommandId::StopTimer => "stop_timer",
            CommandId::ChangeState => "change_state",
            CommandId::SetActiveApp => "set_active_app",
            CommandId::VerifyAppIsConfigured => "verify_app_is_configured",
            CommandId::SetInteractionFeedback => "set_interaction_feedback",
            CommandId::SetButtonColors => "set_button_colors",
            CommandId::ClearButtonColors => "clear_button_colors",
            CommandId::SetVolume => "set_volume",
            CommandId::FadeVolume => "fade_volume",
            CommandId::EnterSleep => "enter_sleep",
        }
    }
}

/// Which LED preset to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorScheme {
    Menu,
    Idle,
    /// The app's own colors; menu colors if it defines none.
    App(String),
}

/// Which volume preset to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeLevel {
    Menu,
    Idle,
    Game,
    Mute,
}

/// Capability set available to states.
#[async_trait]
pub trait Commands: Send + Sync {
    /// Launches `app_id` and verifies it runs. `true` only if a verification
    /// pass succeeded within the retry budget.
    async fn start_game(&self, app_id: &str) -> bool;

    /// Closes `app_id`; `true` if no window remains afterwards.
    async fn close_game(&self, app_id: &str) -> bool;

    /// Focuses the window of `app_id`; `true` if focus was verified.
    async fn focus_app(&self, app_id: &str) -> bool;

    /// Sends a status string to the UI. Returns bytes sent, 0 if nobody listens.
    async fn send_to_ui(&self, text: &str) -> usize;

    /// Suspends the machine until the wake time, then posts `Wake`.
    /// `false` if the suspend itself failed.
    async fn enter_sleep(&self) -> bool;

    /// Arms the countdown with `seconds` (0 disables it).
    fn set_timer(&self, seconds: u64);
    fn set_timer_game(&self);
    fn set_timer_menu(&self);
    /// Re-arms the countdown with its last length.
    fn reset_timer(&self);
    fn stop_timer(&self);

    /// Posts a `ChangeState` task.
    fn change_state(&self, state: StateId);
    /// Posts a `SetActiveApp` task.
    fn set_active_app(&self, app_id: Option<&str>);

    fn verify_app_is_configured(&self, app_id: &str) -> bool;
    fn set_interaction_feedback(&self, enabled: bool);

    fn set_button_colors(&self, scheme: ColorScheme);
    fn clear_button_colors(&self);
    fn set_volume(&self, level: VolumeLevel);
    fn fade_volume(&self, level: VolumeLevel);
}
