//! # Window-manager queries.
//!
//! The supervisor never trusts its own bookkeeping alone: "running" and
//! "closed" are confirmed by asking the window manager whether a window matching
//! the app's search term exists. [`Xdotool`] does this by running `xdotool`.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::AppError;

/// Window id as reported by the window manager.
pub type WindowId = u64;

/// Window-manager operations used by the supervisor.
#[async_trait]
pub trait WindowManager: Send + Sync {
    /// First visible window matching `term`, `None` if there is none.
    async fn find_window(&self, term: &str) -> Result<Option<WindowId>, AppError>;

    /// Currently focused window.
    async fn active_window(&self) -> Result<WindowId, AppError>;

    /// Activates the first window matching `term` and waits until it is active.
    async fn activate_sync(&self, term: &str) -> Result<(), AppError>;

    /// Kills every visible window matching `term`.
    async fn kill_window(&self, term: &str) -> Result<(), AppError>;
}

/// [`WindowManager`] backed by the `xdotool` command.
#[derive(Debug, Clone)]
pub struct Xdotool {
    program: String,
}

impl Xdotool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<std::process::Output, AppError> {
        let command = format!("{} {}", self.program, args.join(" "));
        debug!(%command, "window tool");
        Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AppError::WindowTool {
                command,
                reason: e.to_string(),
            })
    }

    async fn run_checked(&self, args: &[&str]) -> Result<String, AppError> {
        let out = self.run(args).await?;
        if !out.status.success() {
            return Err(AppError::WindowTool {
                command: format!("{} {}", self.program, args.join(" ")),
                reason: format!(
                    "{}: {}",
                    out.status,
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
            });
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

impl Default for Xdotool {
    fn default() -> Self {
        Self::new("xdotool")
    }
}

#[async_trait]
impl WindowManager for Xdotool {
    async fn find_window(&self, term: &str) -> Result<Option<WindowId>, AppError> {
        let out = self.run(&["search", "--onlyvisible", term]).await?;
        // search exits non-zero when nothing matches
        if !out.status.success() {
            return Ok(None);
        }
        Ok(first_window_id(&String::from_utf8_lossy(&out.stdout)))
    }

    async fn active_window(&self) -> Result<WindowId, AppError> {
        let stdout = self.run_checked(&["getactivewindow"]).await?;
        first_window_id(&stdout).ok_or_else(|| AppError::WindowTool {
            command: format!("{} getactivewindow", self.program),
            reason: format!("unexpected output {:?}", stdout.trim()),
        })
    }

    async fn activate_sync(&self, term: &str) -> Result<(), AppError> {
        self.run_checked(&["search", "--onlyvisible", term, "windowactivate", "--sync"])
            .await
            .map(drop)
    }

    async fn kill_window(&self, term: &str) -> Result<(), AppError> {
        self.run_checked(&["search", "--onlyvisible", term, "windowkill"])
            .await
            .map(drop)
    }
}

fn first_window_id(stdout: &str) -> Option<WindowId> {
    stdout.lines().find_map(|l| l.trim().parse().ok())
}
