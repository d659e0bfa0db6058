//! # Sleep scheduler.
//!
//! ```text
//! spawn_watch ─► every interval: refresh() ─► inside window? post Sleep
//!
//! Sleep state ─► EnterSleep ─► suspend(): suspender.suspend(until_wake) ─► returns on resume
//! ```
//!
//! The check is level-triggered: every tick inside the window posts `Sleep`.
//! States other than `Idle` ignore it, so the cabinet falls asleep on the first
//! tick after it went idle.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, Timelike};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::SleepError;
use crate::tasks::{Task, TaskKind, TaskSender};

use super::SleepWindow;

/// Suspends the machine and returns once it has resumed.
#[async_trait]
pub trait Suspender: Send + Sync {
    async fn suspend(&self, duration: Duration) -> Result<(), SleepError>;
}

/// [`Suspender`] running `rtcwake -m <mode> -s <seconds>`.
#[derive(Debug, Clone)]
pub struct RtcWake {
    program: String,
    mode: String,
}

impl RtcWake {
    pub fn new(program: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            mode: mode.into(),
        }
    }
}

impl Default for RtcWake {
    fn default() -> Self {
        Self::new("rtcwake", "mem")
    }
}

#[async_trait]
impl Suspender for RtcWake {
    async fn suspend(&self, duration: Duration) -> Result<(), SleepError> {
        let secs = duration.as_secs().max(1).to_string();
        let out = Command::new(&self.program)
            .args(["-m", &self.mode, "-s", &secs])
            .stdin(Stdio::null())
            .output()
            .await?;
        if out.status.success() {
            Ok(())
        } else {
            Err(SleepError::Suspend {
                reason: format!(
                    "{}: {}",
                    out.status,
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
            })
        }
    }
}

/// Evaluates the sleep window and performs the suspend.
pub struct SleepScheduler {
    window: SleepWindow,
    suspender: Arc<dyn Suspender>,
    is_sleep_time: AtomicBool,
}

impl SleepScheduler {
    pub fn new(window: SleepWindow, suspender: Arc<dyn Suspender>) -> Self {
        Self {
            window,
            suspender,
            is_sleep_time: AtomicBool::new(false),
        }
    }

    pub fn window(&self) -> SleepWindow {
        self.window
    }

    /// Result of the last evaluation.
    pub fn is_sleep_time(&self) -> bool {
        self.is_sleep_time.load(Ordering::SeqCst)
    }

    /// Re-evaluates the window against the local wall clock.
    pub fn refresh(&self) -> bool {
        self.refresh_at(local_second_of_day())
    }

    /// Re-evaluates the window at `second_of_day`.
    pub fn refresh_at(&self, second_of_day: u32) -> bool {
        let inside = self.window.contains(second_of_day);
        let was = self.is_sleep_time.swap(inside, Ordering::SeqCst);
        if was != inside {
            info!(sleep_time = inside, "sleep window changed");
        }
        inside
    }

    /// Time from now until the next wake time.
    pub fn until_wake(&self) -> Duration {
        self.window.until_wake(local_second_of_day())
    }

    /// Suspends until the wake time. Returns once the machine has resumed.
    pub async fn suspend(&self) -> Result<(), SleepError> {
        let duration = self.until_wake();
        info!(secs = duration.as_secs(), "suspending");
        self.suspender.suspend(duration).await
    }

    /// Spawns the periodic window check.
    pub fn spawn_watch(
        self: Arc<Self>,
        tasks: TaskSender,
        interval: Duration,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if self.refresh() {
                            tasks.post(Task::new(TaskKind::Sleep));
                        }
                    }
                }
            }
            debug!("sleep watch stopped");
        })
    }
}

fn local_second_of_day() -> u32 {
    Local::now().time().num_seconds_from_midnight()
}
