//! # Master volume with fades.
//!
//! A single background task owns the current level. [`VolumeController::fade`]
//! hands it a new goal; the task then moves the level 1% per step toward the
//! goal, applying each intermediate level through the [`Mixer`]. A new goal
//! replaces the previous one mid-fade.
//!
//! ```text
//! fade(goal, duration) ─► watch ─► fade task: level ±1, mixer.apply(level), sleep(step)
//!                                   step = duration / |goal - level|
//! ```

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Something that can set the master volume.
#[async_trait]
pub trait Mixer: Send + Sync + 'static {
    async fn apply(&self, pct: u8);
}

/// [`Mixer`] running `amixer -D <device> sset <control> N%`.
#[derive(Debug, Clone)]
pub struct Amixer {
    program: String,
    device: String,
    control: String,
}

impl Amixer {
    pub fn new(
        program: impl Into<String>,
        device: impl Into<String>,
        control: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            device: device.into(),
            control: control.into(),
        }
    }
}

impl Default for Amixer {
    fn default() -> Self {
        Self::new("amixer", "pulse", "Master")
    }
}

#[async_trait]
impl Mixer for Amixer {
    async fn apply(&self, pct: u8) {
        let result = Command::new(&self.program)
            .args(["-D", &self.device, "sset", &self.control, &format!("{pct}%")])
            .stdout(std::process::Stdio::null())
            .status()
            .await;
        match result {
            Ok(s) if s.success() => {}
            Ok(s) => warn!(program = %self.program, status = %s, "volume command failed"),
            Err(e) => warn!(program = %self.program, error = %e, "volume command not run"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fade {
    goal: u8,
    step: Duration,
}

/// Handle to the volume fade task.
pub struct VolumeController {
    goal: watch::Sender<Fade>,
    level: Arc<AtomicU8>,
}

impl VolumeController {
    /// Spawns the fade task. Must be called inside a tokio runtime.
    pub fn spawn(mixer: Arc<dyn Mixer>, initial: u8) -> Self {
        let initial = initial.min(100);
        let (tx, rx) = watch::channel(Fade {
            goal: initial,
            step: Duration::ZERO,
        });
        let level = Arc::new(AtomicU8::new(initial));
        tokio::spawn(run(mixer, rx, level.clone()));
        Self { goal: tx, level }
    }

    /// Moves to `pct` over `duration`, 1% at a time.
    pub fn fade(&self, pct: u8, duration: Duration) {
        let goal = pct.min(100);
        let distance = u32::from(goal.abs_diff(self.level()));
        if distance == 0 {
            self.set(goal);
            return;
        }
        let step = duration / distance;
        info!(from = self.level(), to = goal, secs = duration.as_secs_f32(), "volume fade");
        self.goal.send_replace(Fade { goal, step });
    }

    /// Jumps to `pct` immediately.
    pub fn set(&self, pct: u8) {
        self.goal.send_replace(Fade {
            goal: pct.min(100),
            step: Duration::ZERO,
        });
    }

    /// Level most recently applied.
    pub fn level(&self) -> u8 {
        self.level.load(Ordering::SeqCst)
    }
}

async fn run(mixer: Arc<dyn Mixer>, mut rx: watch::Receiver<Fade>, level: Arc<AtomicU8>) {
    'fades: loop {
        let fade = *rx.borrow_and_update();
        let mut current = level.load(Ordering::SeqCst);

        if fade.step.is_zero() {
            if current != fade.goal {
                mixer.apply(fade.goal).await;
                level.store(fade.goal, Ordering::SeqCst);
            }
        } else {
            while current != fade.goal {
                current = if fade.goal > current { current + 1 } else { current - 1 };
                mixer.apply(current).await;
                level.store(current, Ordering::SeqCst);

                tokio::select! {
                    _ = tokio::time::sleep(fade.step) => {}
                    changed = rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        // The new goal is already marked seen; read it now.
                        continue 'fades;
                    }
                }
            }
        }

        if rx.changed().await.is_err() {
            debug!("volume controller dropped");
            return;
        }
    }
}
