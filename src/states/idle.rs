use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::commands::{ColorScheme, VolumeLevel};
use crate::error::StateError;
use crate::tasks::{Task, TaskKind};

use super::{State, StateContext, StateId};

/// Attract mode, entered from the menu on timeout.
///
/// Raw input is turned into `Interaction` tasks while here. The first one (or a
/// `CloseApp` from the cabinet button) returns to the menu; the latch keeps
/// further interactions already queued from issuing a second transition.
#[derive(Default)]
pub struct Idle {
    leaving: AtomicBool,
}

impl Idle {
    fn wake_up(&self, ctx: &mut StateContext<'_>) {
        if self.leaving.swap(true, Ordering::SeqCst) {
            debug!("idle: already leaving");
            return;
        }
        ctx.commands.set_interaction_feedback(false);
        ctx.commands.change_state(StateId::InMenu);
    }
}

#[async_trait]
impl State for Idle {
    fn id(&self) -> StateId {
        StateId::Idle
    }

    async fn on_enter(&self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        self.leaving.store(false, Ordering::SeqCst);
        let cmds = ctx.commands;
        cmds.stop_timer();
        cmds.set_interaction_feedback(true);
        cmds.send_to_ui("idle_enter").await;
        cmds.set_button_colors(ColorScheme::Idle);
        cmds.fade_volume(VolumeLevel::Idle);
        Ok(())
    }

    async fn on_task(&self, task: &Task, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        match task.kind() {
            TaskKind::Interaction | TaskKind::CloseApp => self.wake_up(ctx),
            TaskKind::Sleep => ctx.commands.change_state(StateId::Sleep),
            TaskKind::Test => info!(data = task.data(), "idle: test task"),
            kind => debug!(task = kind.as_label(), "idle: task ignored"),
        }
        Ok(())
    }

    async fn on_exit(&self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        ctx.commands.set_interaction_feedback(false);
        ctx.commands.send_to_ui("idle_exit").await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingCommands};

    #[tokio::test]
    async fn enter_stops_timer_and_enables_feedback() {
        let cmds = RecordingCommands::new();
        let mut active = None;
        let mut ctx = StateContext::new(&cmds, &mut active);
        Idle::default().on_enter(&mut ctx).await.unwrap();

        assert_eq!(
            cmds.calls(),
            vec![
                Call::StopTimer,
                Call::SetInteractionFeedback(true),
                Call::SendToUi("idle_enter".into()),
                Call::SetButtonColors(ColorScheme::Idle),
                Call::FadeVolume(VolumeLevel::Idle),
            ]
        );
    }

    #[tokio::test]
    async fn repeated_interaction_transitions_once() {
        let idle = Idle::default();
        let cmds = RecordingCommands::new();
        let mut active = None;
        let mut ctx = StateContext::new(&cmds, &mut active);

        idle.on_enter(&mut ctx).await.unwrap();
        idle.on_task(&Task::new(TaskKind::Interaction), &mut ctx).await.unwrap();
        idle.on_task(&Task::new(TaskKind::Interaction), &mut ctx).await.unwrap();

        assert_eq!(cmds.state_changes(), vec![StateId::InMenu]);
    }

    #[tokio::test]
    async fn latch_resets_on_reentry() {
        let idle = Idle::default();
        let cmds = RecordingCommands::new();
        let mut active = None;
        let mut ctx = StateContext::new(&cmds, &mut active);

        idle.on_enter(&mut ctx).await.unwrap();
        idle.on_task(&Task::new(TaskKind::CloseApp), &mut ctx).await.unwrap();
        idle.on_exit(&mut ctx).await.unwrap();
        idle.on_enter(&mut ctx).await.unwrap();
        idle.on_task(&Task::new(TaskKind::Interaction), &mut ctx).await.unwrap();

        assert_eq!(cmds.state_changes(), vec![StateId::InMenu, StateId::InMenu]);
    }

    #[tokio::test]
    async fn sleep_task_enters_sleep() {
        let cmds = RecordingCommands::new();
        let mut active = None;
        let mut ctx = StateContext::new(&cmds, &mut active);
        Idle::default()
            .on_task(&Task::new(TaskKind::Sleep), &mut ctx)
            .await
            .unwrap();
        assert_eq!(cmds.state_changes(), vec![StateId::Sleep]);
    }
}
