use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::commands::VolumeLevel;
use crate::error::StateError;
use crate::tasks::{Task, TaskKind};

use super::{State, StateContext, StateId};

/// One app runs in the foreground.
///
/// Tasks without an app id reach this state already retargeted to ActiveApp by
/// the event loop. Only the first close, timeout or crash leaves; the others
/// already queued behind it are dropped.
#[derive(Default)]
pub struct InGame {
    leaving: AtomicBool,
}

impl InGame {
    async fn leave(&self, task: &Task, status: &str, ctx: &mut StateContext<'_>) {
        if self.leaving.swap(true, Ordering::SeqCst) {
            debug!(task = task.kind().as_label(), "in_game: already leaving");
            return;
        }
        let cmds = ctx.commands;
        cmds.stop_timer();
        match task.data() {
            Some(app_id) => {
                if !cmds.close_game(app_id).await {
                    warn!(app = app_id, "app window still present after close");
                }
            }
            None => warn!(task = task.kind().as_label(), "in_game without active app"),
        }
        cmds.send_to_ui(status).await;
        cmds.change_state(StateId::InMenu);
    }
}

#[async_trait]
impl State for InGame {
    fn id(&self) -> StateId {
        StateId::InGame
    }

    async fn on_enter(&self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        self.leaving.store(false, Ordering::SeqCst);
        ctx.commands.set_timer_game();
        ctx.commands.fade_volume(VolumeLevel::Game);
        Ok(())
    }

    async fn on_task(&self, task: &Task, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        match task.kind() {
            TaskKind::CloseApp | TaskKind::Timeout => self.leave(task, "app_closed", ctx).await,
            TaskKind::AppCrashed => {
                if task.data() != ctx.active_app.as_deref() {
                    debug!(app = task.data(), "in_game: stale crash report ignored");
                    return Ok(());
                }
                self.leave(task, "app_crashed", ctx).await;
            }
            TaskKind::Interaction => ctx.commands.reset_timer(),
            TaskKind::Test => info!(data = task.data(), "in_game: test task"),
            kind => debug!(task = kind.as_label(), "in_game: task ignored"),
        }
        Ok(())
    }

    async fn on_exit(&self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        if let Some(app) = ctx.active_app.take() {
            debug!(app = %app, "active app cleared");
        }
        Ok(())
    }
}
