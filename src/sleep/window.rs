use std::time::Duration;

use chrono::{NaiveTime, Timelike};

use crate::error::ConfigError;

const DAY_SECS: u32 = 24 * 60 * 60;

/// Daily wall-clock window in which the cabinet sleeps.
///
/// Both ends are seconds since local midnight. The window may wrap midnight
/// (`23:00`..`07:00`). Equal ends mean the window is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepWindow {
    sleep_of_day: u32,
    wake_of_day: u32,
}

impl SleepWindow {
    /// Window from `sleep_of_day` to `wake_of_day` (seconds, taken modulo a day).
    pub fn new(sleep_of_day: u32, wake_of_day: u32) -> Self {
        Self {
            sleep_of_day: sleep_of_day % DAY_SECS,
            wake_of_day: wake_of_day % DAY_SECS,
        }
    }

    /// Parses two `HH:MM` times.
    pub fn from_hhmm(sleep_at: &str, wake_at: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(second_of_day(sleep_at)?, second_of_day(wake_at)?))
    }

    pub fn sleep_of_day(&self) -> u32 {
        self.sleep_of_day
    }

    pub fn wake_of_day(&self) -> u32 {
        self.wake_of_day
    }

    /// Whether `second_of_day` falls inside the window (wake time excluded).
    pub fn contains(&self, second_of_day: u32) -> bool {
        let s = second_of_day % DAY_SECS;
        let (sleep, wake) = (self.sleep_of_day, self.wake_of_day);
        if sleep == wake {
            false
        } else if sleep < wake {
            sleep <= s && s < wake
        } else {
            s >= sleep || s < wake
        }
    }

    /// Time from `second_of_day` until the next wake time.
    pub fn until_wake(&self, second_of_day: u32) -> Duration {
        let s = second_of_day % DAY_SECS;
        let secs = (self.wake_of_day + DAY_SECS - s) % DAY_SECS;
        Duration::from_secs(u64::from(secs))
    }
}

fn second_of_day(value: &str) -> Result<u32, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map(|t| t.num_seconds_from_midnight())
        .map_err(|_| ConfigError::InvalidTime {
            value: value.to_string(),
        })
}
