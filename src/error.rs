//! Error types used by the kioskvisor runtime, its states and collaborators.
//!
//! - [`RuntimeError`]: fatal errors of the event loop itself.
//! - [`StateError`]: a state handler failed to handle one task (non-fatal).
//! - [`AppError`]: application lookup, launch and window-manager failures.
//! - [`ConfigError`]: configuration and descriptor loading failures.
//! - [`SleepError`]: suspend-and-resume failures.
//!
//! Every enum provides `as_label` (stable snake_case label for logs/metrics).

use std::path::PathBuf;

use thiserror::Error;

use crate::tasks::TaskKind;

/// # Errors that stop the event loop.
///
/// These indicate a defect or a broken environment, not a runtime condition:
/// the loop returns them from [`EventLoop::run`](crate::EventLoop::run) instead of
/// continuing with undefined behavior.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A `ChangeState` task named a state that does not exist.
    #[error("unknown state {name:?}")]
    UnknownState {
        /// The name carried by the task.
        name: String,
    },

    /// A `ChangeState` task carried no target at all.
    #[error("change_state task without a target state")]
    MissingStateTarget,

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// I/O failure while wiring the runtime (socket bind, signal registration).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use kioskvisor::RuntimeError;
    ///
    /// let err = RuntimeError::UnknownState { name: "lobby".into() };
    /// assert_eq!(err.as_label(), "runtime_unknown_state");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::UnknownState { .. } => "runtime_unknown_state",
            RuntimeError::MissingStateTarget => "runtime_missing_state_target",
            RuntimeError::Config(_) => "runtime_config",
            RuntimeError::Io(_) => "runtime_io",
        }
    }
}

/// # Errors produced while a state handles one task.
///
/// The loop logs these and continues with the next task.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StateError {
    /// The task needs an app id but neither the task nor ActiveApp provides one.
    #[error("{task:?} task carries no app id")]
    MissingApp {
        /// Kind of the offending task.
        task: TaskKind,
    },

    /// A command could not be carried out at all.
    #[error("command {command} failed: {reason}")]
    Command {
        /// Name of the command.
        command: &'static str,
        /// Failure description.
        reason: String,
    },
}

impl StateError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StateError::MissingApp { .. } => "state_missing_app",
            StateError::Command { .. } => "state_command_failed",
        }
    }
}

/// # Errors produced by the application supervisor and its collaborators.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AppError {
    /// No usable descriptor exists for the app id.
    #[error("app {app_id:?} is not configured")]
    NotConfigured {
        /// The requested app id.
        app_id: String,
    },

    /// The app has no live process record.
    #[error("app {app_id:?} is not running")]
    NotRunning {
        /// The requested app id.
        app_id: String,
    },

    /// Spawning the OS process failed.
    #[error("failed to spawn {app_id:?}: {source}")]
    Spawn {
        /// The app id being launched.
        app_id: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The window-manager tool failed or could not be run.
    #[error("window tool `{command}` failed: {reason}")]
    WindowTool {
        /// Command line that was run.
        command: String,
        /// Failure description.
        reason: String,
    },
}

impl AppError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use kioskvisor::AppError;
    ///
    /// let err = AppError::NotConfigured { app_id: "pong".into() };
    /// assert_eq!(err.as_label(), "app_not_configured");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            AppError::NotConfigured { .. } => "app_not_configured",
            AppError::NotRunning { .. } => "app_not_running",
            AppError::Spawn { .. } => "app_spawn_failed",
            AppError::WindowTool { .. } => "app_window_tool",
        }
    }
}

/// # Errors produced while loading configuration.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A file or directory could not be read.
    #[error("cannot read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The runtime config file is not valid TOML for [`Config`](crate::Config).
    #[error("cannot parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// An app descriptor is not valid.
    #[error("invalid app descriptor {path:?}: {source}")]
    Descriptor {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A wall-clock time is not in `HH:MM` form.
    #[error("invalid time of day {value:?} (expected HH:MM)")]
    InvalidTime { value: String },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "config_read",
            ConfigError::Parse { .. } => "config_parse",
            ConfigError::Descriptor { .. } => "config_descriptor",
            ConfigError::InvalidTime { .. } => "config_invalid_time",
        }
    }
}

/// # Errors produced by the suspend-and-resume action.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SleepError {
    /// The suspend command ran but reported failure.
    #[error("suspend failed: {reason}")]
    Suspend { reason: String },

    /// The suspend command could not be started.
    #[error("suspend io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SleepError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SleepError::Suspend { .. } => "sleep_suspend_failed",
            SleepError::Io(_) => "sleep_io",
        }
    }
}
