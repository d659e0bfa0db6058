//! # kioskvisor
//!
//! **Kioskvisor** is the controller core of a kiosk or arcade cabinet: a
//! task-driven state machine that decides what the cabinet shows, plus a
//! supervisor that launches, watches and closes the apps it runs.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌────────────┐ ┌──────────┐ ┌────────────────┐ ┌─────────────┐
//!  │ UdsServer  │ │  Timer   │ │ crash watchers │ │ sleep watch │   producers
//!  │ (UI lines) │ │(Timeout) │ │  (AppCrashed)  │ │   (Sleep)   │
//!  └─────┬──────┘ └────┬─────┘ └───────┬────────┘ └──────┬──────┘
//!        └─────────────┴──── post(Task) ┴─────────────────┘
//!                               ▼
//!                ┌──────────────────────────────┐
//!                │  TaskQueue (FIFO, unbounded) │
//!                └──────────────┬───────────────┘
//!                               ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │ EventLoop                                                     │
//! │  - ChangeState / SetActiveApp handled here                    │
//! │  - every other task goes to the active State                  │
//! │    Start ─► InMenu ◄─► Idle ─► Sleep ─► InMenu ◄─► InGame     │
//! └──────────────────────────────┬────────────────────────────────┘
//!                                ▼
//!                ┌──────────────────────────────┐
//!                │ Commands (CommandLayer)      │
//!                │  StartGame / FocusApp retry  │
//!                └──┬─────────┬─────────┬───────┘
//!                   ▼         ▼         ▼
//!           AppSupervisor  Hardware  SleepScheduler, Timer, StatusSink
//!
//!  EventLoop / CommandLayer / AppSupervisor ── Event ──► Bus ──► SubscriberSet
//! ```
//!
//! ### Rules
//! - Only the event loop mutates state; producers only post [`Task`]s.
//! - States act through the [`Commands`] catalog, never on collaborators.
//! - A crash is reported as a task; whichever state is active decides.
//! - Events are observations for subscribers; nothing in the control path
//!   reacts to them.
//!
//! ## Features
//! | Area            | Description                                                      | Key types                                  |
//! |-----------------|------------------------------------------------------------------|--------------------------------------------|
//! | **States**      | Five states with enter/task/exit handlers.                       | [`State`], [`StateId`], [`StatePool`]      |
//! | **Dispatch**    | FIFO task queue consumed by one loop.                            | [`EventLoop`], [`TaskSender`], [`Task`]    |
//! | **Commands**    | Verified app start/close/focus with bounded retries.             | [`Commands`], [`CommandLayer`], [`RetryPolicy`] |
//! | **Apps**        | Descriptors, process records, crash watchers, window queries.    | [`AppCatalog`], [`AppSupervisor`], [`WindowManager`] |
//! | **Hardware**    | Button LED colors and faded master volume.                       | [`Hardware`], [`ButtonController`], [`VolumeController`] |
//! | **Sleep**       | Nightly suspend window with RTC wake-up.                         | [`SleepScheduler`], [`SleepWindow`]        |
//! | **Observability** | Runtime events fanned out to subscribers.                      | [`Event`], [`Subscribe`], [`LogWriter`]    |
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use kioskvisor::{Config, Controller, LogWriter, Subscribe};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::load("/etc/kioskvisor.toml")?;
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!
//!     let controller = Controller::builder(cfg).with_subscribers(subs).build()?;
//!     controller.run().await?;
//!     Ok(())
//! }
//! ```

mod apps;
mod commands;
mod config;
mod core;
mod error;
mod events;
mod hardware;
mod policies;
mod sleep;
mod states;
mod subscribers;
mod tasks;
mod timer;
mod transport;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use apps::{
    AppCatalog, AppControl, AppDescriptor, AppKind, AppLookup, AppSupervisor, LaunchSpec, Media,
    WindowId, WindowManager, Xdotool,
};
pub use commands::{
    ColorScheme, CommandDeps, CommandId, CommandLayer, CommandSettings, Commands, VolumeLevel,
};
pub use config::Config;
pub use core::{Controller, ControllerBuilder, ControllerHandle, EventLoop};
pub use error::{AppError, ConfigError, RuntimeError, SleepError, StateError};
pub use events::{Bus, Event, EventKind};
pub use hardware::{
    Amixer, ButtonColors, ButtonController, Cabinet, ColorData, Hardware, Mixer, VolumeController,
    BUTTON_COUNT,
};
pub use policies::{BackoffPolicy, JitterPolicy, RetryPolicy};
pub use sleep::{RtcWake, SleepScheduler, SleepWindow, Suspender};
pub use states::{
    Idle, InGame, InMenu, Sleep, Start, State, StateContext, StateId, StateMachine, StatePool,
};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tasks::{channel, parse_message, InteractionFeedback, Message, Task, TaskKind, TaskQueue, TaskSender};
pub use timer::{Timer, TimerState};
pub use transport::{NullSink, StatusSink};

#[cfg(unix)]
pub use transport::UdsServer;
