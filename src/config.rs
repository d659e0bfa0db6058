//! # Runtime configuration.
//!
//! [`Config`] is read from a TOML file; every key is optional and falls back to
//! its default.
//!
//! ```toml
//! socket_path = "/tmp/dmicade_socket.s"
//! apps_location = "/opt/dmicade/apps"
//!
//! [timeouts]
//! menu_secs = 120
//! game_secs = 600
//!
//! [start_game]
//! attempts = 3
//! settle_ms = 2000
//! retry_delay_ms = 500
//! jitter = "none"
//!
//! [sleep]
//! enabled = true
//! sleep_at = "23:00"
//! wake_at = "07:00"
//!
//! [buttons]
//! menu = { ALL = "FFFFFF" }
//! idle = "00F;00F;00F;00F;00F;00F;F00;F00;F00;F00;F00;F00"
//! ```
//!
//! ## Sentinel values
//! - `timeouts.*_secs = 0` → timer disabled in that state
//! - `start_game.settle_ms = 0` → no second verification per attempt

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::hardware::ColorData;
use crate::policies::{BackoffPolicy, JitterPolicy, RetryPolicy};
use crate::sleep::SleepWindow;

/// Controller configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Unix socket of the UI transport.
    pub socket_path: PathBuf,
    /// Directory holding one subdirectory with a `config.json` per app.
    pub apps_location: PathBuf,
    /// Capacity of the event bus ring buffer (min 1).
    pub bus_capacity: usize,
    /// How long a killed app process may take to exit.
    pub stop_grace_ms: u64,

    pub timeouts: Timeouts,
    pub start_game: StartGame,
    pub focus: Focus,
    pub sleep: Sleep,
    pub windows: Windows,
    pub buttons: Buttons,
    pub volume: Volume,
}

/// Inactivity timeouts.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub menu_secs: u64,
    pub game_secs: u64,
}

/// StartGame retry policy.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StartGame {
    pub attempts: u32,
    pub settle_ms: u64,
    pub retry_delay_ms: u64,
    /// Growth of the retry delay per attempt (`1.0` = constant).
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
    pub jitter: JitterPolicy,
}

/// FocusApp polling.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Focus {
    pub attempts: u32,
    pub delay_ms: u64,
}

/// Sleep window and suspend command.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Sleep {
    pub enabled: bool,
    /// Local `HH:MM`.
    pub sleep_at: String,
    /// Local `HH:MM`.
    pub wake_at: String,
    pub check_interval_secs: u64,
    pub program: String,
    pub mode: String,
}

/// Window-manager tool.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Windows {
    pub program: String,
}

/// LED presets.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Buttons {
    pub menu: ColorData,
    pub idle: ColorData,
}

/// Volume presets (percent) and mixer command.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Volume {
    pub menu: u8,
    pub idle: u8,
    pub game: u8,
    pub fade_secs: u64,
    pub program: String,
    pub device: String,
    pub control: String,
}

impl Config {
    /// Reads a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    #[inline]
    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    #[inline]
    pub fn menu_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.menu_secs)
    }

    #[inline]
    pub fn game_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.game_secs)
    }

    /// Retry policy of the StartGame command.
    pub fn start_game_policy(&self) -> RetryPolicy {
        let s = &self.start_game;
        let first = Duration::from_millis(s.retry_delay_ms);
        RetryPolicy {
            attempts: s.attempts,
            settle: Duration::from_millis(s.settle_ms),
            backoff: BackoffPolicy {
                first,
                max: Duration::from_millis(s.max_delay_ms).max(first),
                factor: s.backoff_factor,
                jitter: s.jitter,
            },
        }
    }

    /// Polling policy of the FocusApp command.
    pub fn focus_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.focus.attempts,
            settle: Duration::ZERO,
            backoff: BackoffPolicy::constant(Duration::from_millis(self.focus.delay_ms)),
        }
    }

    pub fn sleep_window(&self) -> Result<SleepWindow, ConfigError> {
        SleepWindow::from_hhmm(&self.sleep.sleep_at, &self.sleep.wake_at)
    }

    #[inline]
    pub fn sleep_check_interval(&self) -> Duration {
        Duration::from_secs(self.sleep.check_interval_secs)
    }

    #[inline]
    pub fn fade_duration(&self) -> Duration {
        Duration::from_secs(self.volume.fade_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/tmp/dmicade_socket.s"),
            apps_location: PathBuf::from("./apps"),
            bus_capacity: 1024,
            stop_grace_ms: 2000,
            timeouts: Timeouts::default(),
            start_game: StartGame::default(),
            focus: Focus::default(),
            sleep: Sleep::default(),
            windows: Windows::default(),
            buttons: Buttons::default(),
            volume: Volume::default(),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            menu_secs: 120,
            game_secs: 600,
        }
    }
}

impl Default for StartGame {
    fn default() -> Self {
        Self {
            attempts: 3,
            settle_ms: 2000,
            retry_delay_ms: 500,
            backoff_factor: 1.0,
            max_delay_ms: 10_000,
            jitter: JitterPolicy::None,
        }
    }
}

impl Default for Focus {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 250,
        }
    }
}

impl Default for Sleep {
    fn default() -> Self {
        Self {
            enabled: false,
            sleep_at: "23:00".into(),
            wake_at: "07:00".into(),
            check_interval_secs: 60,
            program: "rtcwake".into(),
            mode: "mem".into(),
        }
    }
}

impl Default for Windows {
    fn default() -> Self {
        Self {
            program: "xdotool".into(),
        }
    }
}

impl Default for Buttons {
    fn default() -> Self {
        Self {
            menu: all_buttons("FFFFFF"),
            idle: all_buttons("0000FF"),
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self {
            menu: 80,
            idle: 30,
            game: 100,
            fade_secs: 3,
            program: "amixer".into(),
            device: "pulse".into(),
            control: "Master".into(),
        }
    }
}

fn all_buttons(color: &str) -> ColorData {
    ColorData::Map(BTreeMap::from([("ALL".to_string(), color.to_string())]))
}
