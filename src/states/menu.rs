use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::commands::{ColorScheme, VolumeLevel};
use crate::error::StateError;
use crate::tasks::{Task, TaskKind};

use super::{State, StateContext, StateId};

/// Menu is shown; the only state from which apps are started.
pub struct InMenu;

impl InMenu {
    async fn start_app(&self, task: &Task, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        let app_id = task
            .data()
            .ok_or(StateError::MissingApp { task: task.kind() })?;
        let cmds = ctx.commands;
        // No menu timeout while the start runs.
        cmds.stop_timer();

        if !cmds.verify_app_is_configured(app_id) {
            info!(app = app_id, "start requested for unknown app");
            cmds.send_to_ui("app_not_found").await;
            cmds.set_timer_menu();
            return Ok(());
        }

        let started = cmds.start_game(app_id).await;
        cmds.send_to_ui(&format!("app_started:{started}")).await;

        if started {
            cmds.set_active_app(Some(app_id));
            cmds.change_state(StateId::InGame);
            if !cmds.focus_app(app_id).await {
                warn!(app = app_id, "app started without focus");
            }
            cmds.set_button_colors(ColorScheme::App(app_id.to_string()));
        } else {
            cmds.set_timer_menu();
            cmds.set_button_colors(ColorScheme::Menu);
        }
        Ok(())
    }
}

#[async_trait]
impl State for InMenu {
    fn id(&self) -> StateId {
        StateId::InMenu
    }

    async fn on_enter(&self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        let cmds = ctx.commands;
        cmds.set_timer_menu();
        cmds.send_to_ui("activate").await;
        cmds.set_button_colors(ColorScheme::Menu);
        cmds.fade_volume(VolumeLevel::Menu);
        Ok(())
    }

    async fn on_task(&self, task: &Task, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        match task.kind() {
            TaskKind::StartApp => self.start_app(task, ctx).await?,
            TaskKind::Timeout => ctx.commands.change_state(StateId::Idle),
            TaskKind::Interaction => ctx.commands.reset_timer(),
            TaskKind::Test => info!(data = task.data(), "in_menu: test task"),
            kind => debug!(task = kind.as_label(), "in_menu: task ignored"),
        }
        Ok(())
    }

    async fn on_exit(&self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        ctx.commands.send_to_ui("deactivate").await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingCommands};

    async fn run(cmds: &RecordingCommands, task: Task) -> Result<(), StateError> {
        let mut active = None;
        let mut ctx = StateContext::new(cmds, &mut active);
        InMenu.on_task(&task, &mut ctx).await
    }

    #[tokio::test]
    async fn unconfigured_app_reports_not_found() {
        let cmds = RecordingCommands::new();
        run(&cmds, Task::start_app("pong")).await.unwrap();

        assert!(!cmds.calls().iter().any(|c| matches!(c, Call::StartGame(_))));
        assert_eq!(cmds.sent(), vec!["app_not_found".to_string()]);
        assert!(cmds.state_changes().is_empty());
        assert_eq!(cmds.calls().last(), Some(&Call::SetTimerMenu));
    }

    #[tokio::test]
    async fn successful_start_moves_to_game() {
        let cmds = RecordingCommands::new().configure("pong");
        run(&cmds, Task::start_app("pong")).await.unwrap();

        let calls = cmds.calls();
        let pos = |c: &Call| calls.iter().position(|x| x == c).unwrap();
        assert!(pos(&Call::StopTimer) < pos(&Call::StartGame("pong".into())));
        assert!(!calls.contains(&Call::SetTimerMenu));
        assert!(pos(&Call::SetActiveApp(Some("pong".into()))) < pos(&Call::ChangeState(StateId::InGame)));
        assert!(calls.contains(&Call::FocusApp("pong".into())));
        assert!(calls.contains(&Call::SetButtonColors(ColorScheme::App("pong".into()))));
        assert_eq!(cmds.sent(), vec!["app_started:true".to_string()]);
    }

    #[tokio::test]
    async fn failed_start_restores_menu_colors() {
        let cmds = RecordingCommands::new().configure("pong").start_result(false);
        run(&cmds, Task::start_app("pong")).await.unwrap();

        assert_eq!(cmds.sent(), vec!["app_started:false".to_string()]);
        assert!(cmds.state_changes().is_empty());
        let calls = cmds.calls();
        assert_eq!(
            &calls[calls.len() - 2..],
            &[Call::SetTimerMenu, Call::SetButtonColors(ColorScheme::Menu)]
        );
    }

    #[tokio::test]
    async fn start_without_app_id_is_an_error() {
        let cmds = RecordingCommands::new();
        let err = run(&cmds, Task::new(TaskKind::StartApp)).await.unwrap_err();
        assert!(matches!(err, StateError::MissingApp { task: TaskKind::StartApp }));
    }

    #[tokio::test]
    async fn timeout_goes_idle_and_interaction_resets_timer() {
        let cmds = RecordingCommands::new();
        run(&cmds, Task::new(TaskKind::Interaction)).await.unwrap();
        run(&cmds, Task::new(TaskKind::Timeout)).await.unwrap();
        assert_eq!(
            cmds.calls(),
            vec![Call::ResetTimer, Call::ChangeState(StateId::Idle)]
        );
    }
}
