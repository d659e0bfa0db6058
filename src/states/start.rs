use async_trait::async_trait;
use tracing::debug;

use crate::error::StateError;
use crate::tasks::Task;

use super::{State, StateContext, StateId};

/// Bootstrap state: announces the boot and moves on to the menu.
pub struct Start;

#[async_trait]
impl State for Start {
    fn id(&self) -> StateId {
        StateId::Start
    }

    async fn on_enter(&self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        ctx.commands.send_to_ui("boot").await;
        ctx.commands.change_state(StateId::InMenu);
        Ok(())
    }

    async fn on_task(&self, task: &Task, _ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        debug!(task = task.kind().as_label(), "start: task ignored");
        Ok(())
    }
}
