use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::StateError;
use crate::tasks::{Task, TaskKind};

use super::{State, StateContext, StateId};

/// The machine is suspended.
///
/// `on_enter` does not return before the machine resumes, so no task is
/// dispatched while asleep. Tasks posted meanwhile wait in the queue.
pub struct Sleep;

#[async_trait]
impl State for Sleep {
    fn id(&self) -> StateId {
        StateId::Sleep
    }

    async fn on_enter(&self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        ctx.commands.clear_button_colors();
        if !ctx.commands.enter_sleep().await {
            warn!("suspend failed; waking immediately");
        }
        Ok(())
    }

    async fn on_task(&self, task: &Task, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        match task.kind() {
            TaskKind::Wake => ctx.commands.change_state(StateId::InMenu),
            TaskKind::Test => info!(data = task.data(), "sleep: test task"),
            kind => debug!(task = kind.as_label(), "sleep: task ignored"),
        }
        Ok(())
    }
}
