//! # The state contract.
//!
//! A [`State`] is one mode of operation with three capabilities: `on_enter`,
//! `on_task` and `on_exit`. States are constructed once, kept in the
//! [`StatePool`](super::StatePool) and never destroyed.
//!
//! States reach the outside world only through the [`Commands`] catalog handed
//! in with the [`StateContext`]. They never call the supervisor, the timer or the
//! hardware directly, which lets tests assert the commands a state issues.
//!
//! ## Rules
//! - Handlers run on the event loop only, one at a time.
//! - A handler that needs another state posts `ChangeState` through
//!   [`Commands::change_state`]; it never switches states itself.
//! - Errors are returned, logged by the loop, and do not stop it.

use async_trait::async_trait;

use crate::commands::Commands;
use crate::error::StateError;
use crate::tasks::Task;

use super::StateId;

/// What a state handler may touch while it runs.
pub struct StateContext<'a> {
    /// Command catalog.
    pub commands: &'a dyn Commands,
    /// The app considered in foreground. Owned by the event loop.
    pub active_app: &'a mut Option<String>,
}

impl<'a> StateContext<'a> {
    pub fn new(commands: &'a dyn Commands, active_app: &'a mut Option<String>) -> Self {
        Self {
            commands,
            active_app,
        }
    }
}

/// Handler for one [`StateId`].
#[async_trait]
pub trait State: Send + Sync + 'static {
    /// Identity of this handler.
    fn id(&self) -> StateId;

    /// Runs once per transition into this state.
    async fn on_enter(&self, _ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        Ok(())
    }

    /// Handles one task that the loop did not intercept.
    async fn on_task(&self, task: &Task, ctx: &mut StateContext<'_>) -> Result<(), StateError>;

    /// Runs once per transition out of this state.
    async fn on_exit(&self, _ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        Ok(())
    }
}
