//! # Event loop: the single consumer of the task queue.
//!
//! The [`EventLoop`] owns the [`StateMachine`], ActiveApp and the [`TaskQueue`].
//! Every state mutation happens here, one task at a time.
//!
//! ## Dispatch
//! ```text
//! task ──► ChangeState   ──► machine.change_state(parse(data))     (unknown name: fatal)
//!      ├─► SetActiveApp  ──► active_app = data                      (any state)
//!      └─► otherwise     ──► InGame && no data ? data = active_app
//!                            machine.handle(task)
//! ```
//!
//! ## Rules
//! - A handler error is published as `TaskFailed`; a handler panic is caught and
//!   published as `TaskPanicked`. Neither stops the loop.
//! - `RuntimeError` (unknown or missing `ChangeState` target) stops the loop.
//! - Cancellation is observed between tasks only: the task being dispatched
//!   always runs to completion, queued tasks are not drained.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::commands::Commands;
use crate::error::{RuntimeError, StateError};
use crate::events::{Bus, Event, EventKind};
use crate::states::{StateContext, StateId, StateMachine, StatePool};
use crate::subscribers::panic_message;
use crate::tasks::{Task, TaskKind, TaskQueue};

type Outcome = std::thread::Result<Result<(), StateError>>;

/// Task dispatcher driving the state machine.
pub struct EventLoop {
    machine: StateMachine,
    queue: TaskQueue,
    active_app: Option<String>,
    commands: Arc<dyn Commands>,
    bus: Bus,
    token: CancellationToken,
}

impl EventLoop {
    pub fn new(
        pool: StatePool,
        queue: TaskQueue,
        commands: Arc<dyn Commands>,
        bus: Bus,
        token: CancellationToken,
    ) -> Self {
        Self {
            machine: StateMachine::new(pool),
            queue,
            active_app: None,
            commands,
            bus,
            token,
        }
    }

    /// The active state.
    pub fn state(&self) -> StateId {
        self.machine.current()
    }

    pub fn active_app(&self) -> Option<&str> {
        self.active_app.as_deref()
    }

    /// Enters the initial state, then dispatches tasks until cancelled.
    pub async fn run(&mut self) -> Result<(), RuntimeError> {
        self.enter_initial().await;
        loop {
            let task = tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                next = self.queue.next() => match next {
                    Some(task) => task,
                    None => break,
                },
            };
            self.dispatch(task).await?;
        }
        debug!(state = self.state().as_str(), "event loop stopped");
        Ok(())
    }

    /// Runs `on_enter` of the initial state.
    pub async fn enter_initial(&mut self) {
        let state = self.machine.current();
        let mut ctx = StateContext::new(self.commands.as_ref(), &mut self.active_app);
        let outcome = AssertUnwindSafe(self.machine.enter_initial(&mut ctx))
            .catch_unwind()
            .await;
        self.report(None, state, outcome);
    }

    /// Dispatches every task already queued without waiting for more.
    /// Returns the number of tasks dispatched.
    pub async fn run_pending(&mut self) -> Result<usize, RuntimeError> {
        let mut n = 0;
        while let Some(task) = self.queue.try_next() {
            self.dispatch(task).await?;
            n += 1;
        }
        Ok(n)
    }

    /// Dispatches one task.
    pub async fn dispatch(&mut self, task: Task) -> Result<(), RuntimeError> {
        match task.kind() {
            TaskKind::ChangeState => {
                let target: StateId = match task.data() {
                    Some(name) => name.parse::<StateId>().inspect_err(|e| {
                        error!(error = %e, label = e.as_label(), "fatal state change");
                    })?,
                    None => {
                        error!("change_state task without target");
                        return Err(RuntimeError::MissingStateTarget);
                    }
                };
                self.change_state(target).await;
            }
            TaskKind::SetActiveApp => {
                self.active_app = task.data().map(str::to_string);
                self.bus.publish(
                    Event::new(EventKind::ActiveAppChanged).with_app_opt(task.data()),
                );
            }
            _ => self.deliver(task).await,
        }
        Ok(())
    }

    async fn change_state(&mut self, target: StateId) {
        let from = self.machine.current();
        let mut ctx = StateContext::new(self.commands.as_ref(), &mut self.active_app);
        let outcome = AssertUnwindSafe(self.machine.change_state(target, &mut ctx))
            .catch_unwind()
            .await
            .map(|r| r.map(drop));

        let current = self.machine.current();
        if current != from {
            self.bus.publish(
                Event::new(EventKind::StateChanged)
                    .with_from(from)
                    .with_state(current),
            );
        }
        self.report(Some(TaskKind::ChangeState), current, outcome);
    }

    async fn deliver(&mut self, task: Task) {
        let state = self.machine.current();
        let task = if state == StateId::InGame && !task.has_data() {
            task.retarget(self.active_app.as_deref())
        } else {
            task
        };

        self.bus.publish(
            Event::new(EventKind::TaskDispatched)
                .with_task(task.kind())
                .with_state(state)
                .with_app_opt(task.data()),
        );

        let mut ctx = StateContext::new(self.commands.as_ref(), &mut self.active_app);
        let outcome = AssertUnwindSafe(self.machine.handle(&task, &mut ctx))
            .catch_unwind()
            .await;
        self.report(Some(task.kind()), state, outcome);
    }

    fn report(&self, task: Option<TaskKind>, state: StateId, outcome: Outcome) {
        let event = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => {
                warn!(
                    task = task.map(|t| t.as_label()),
                    state = state.as_str(),
                    error = %e,
                    label = e.as_label(),
                    "task handler failed"
                );
                Event::new(EventKind::TaskFailed).with_reason(e.to_string())
            }
            Err(panic) => {
                let msg = panic_message(panic.as_ref());
                error!(
                    task = task.map(|t| t.as_label()),
                    state = state.as_str(),
                    panic = %msg,
                    "task handler panicked"
                );
                Event::new(EventKind::TaskPanicked).with_reason(msg)
            }
        };
        let event = event.with_state(state);
        self.bus.publish(match task {
            Some(kind) => event.with_task(kind),
            None => event,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::broadcast;

    use crate::states::State;
    use crate::testing::{AppCall, Call, FakeApps, FakeSuspender, Harness, RecordingCommands};

    fn recording_loop() -> (EventLoop, Arc<RecordingCommands>, Bus) {
        let (_tx, queue) = crate::tasks::channel();
        let cmds = Arc::new(RecordingCommands::new());
        let bus = Bus::new(64);
        let el = EventLoop::new(
            StatePool::standard(),
            queue,
            cmds.clone(),
            bus.clone(),
            CancellationToken::new(),
        );
        (el, cmds, bus)
    }

    async fn wait_for(
        rx: &mut broadcast::Receiver<Event>,
        pred: impl Fn(&Event) -> bool,
    ) -> Vec<Event> {
        let mut seen = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let ev = rx.recv().await.unwrap();
                let hit = pred(&ev);
                seen.push(ev);
                if hit {
                    break;
                }
            }
        })
        .await
        .unwrap();
        seen
    }

    #[tokio::test]
    async fn in_game_tasks_without_data_target_active_app() {
        let (mut el, cmds, _bus) = recording_loop();
        el.dispatch(Task::change_state(StateId::InGame)).await.unwrap();
        el.dispatch(Task::set_active_app(Some("pong"))).await.unwrap();

        el.dispatch(Task::new(TaskKind::CloseApp)).await.unwrap();
        el.dispatch(Task::new(TaskKind::CloseApp).with_data("tetris"))
            .await
            .unwrap();

        let closes: Vec<Call> = cmds
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::CloseGame(_)))
            .collect();
        assert_eq!(
            closes,
            vec![Call::CloseGame("pong".into()), Call::CloseGame("tetris".into())]
        );
    }

    #[tokio::test]
    async fn set_active_app_applies_in_any_state() {
        let (mut el, _cmds, bus) = recording_loop();
        let mut events = bus.subscribe();

        el.dispatch(Task::set_active_app(Some("pong"))).await.unwrap();
        assert_eq!(el.state(), StateId::Start);
        assert_eq!(el.active_app(), Some("pong"));

        let ev = events.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ActiveAppChanged);
        assert_eq!(ev.app.as_deref(), Some("pong"));

        el.dispatch(Task::set_active_app(None)).await.unwrap();
        assert_eq!(el.active_app(), None);
    }

    #[tokio::test]
    async fn bad_state_target_is_fatal() {
        let (mut el, _cmds, _bus) = recording_loop();

        let err = el
            .dispatch(Task::new(TaskKind::ChangeState).with_data("lobby"))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::UnknownState { ref name } if name == "lobby"));

        let err = el
            .dispatch(Task::new(TaskKind::ChangeState))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::MissingStateTarget));
    }

    struct Exploding(StateId);

    #[async_trait]
    impl State for Exploding {
        fn id(&self) -> StateId {
            self.0
        }
        async fn on_task(&self, task: &Task, _ctx: &mut StateContext<'_>) -> Result<(), StateError> {
            match task.kind() {
                TaskKind::Test => panic!("boom"),
                kind => Err(StateError::MissingApp { task: kind }),
            }
        }
    }

    #[tokio::test]
    async fn handler_failures_do_not_stop_the_loop() {
        let (tx, queue) = crate::tasks::channel();
        let bus = Bus::new(64);
        let mut events = bus.subscribe();
        let mut el = EventLoop::new(
            StatePool::new(|id| Box::new(Exploding(id))),
            queue,
            Arc::new(RecordingCommands::new()),
            bus,
            CancellationToken::new(),
        );

        tx.post(Task::new(TaskKind::Test));
        tx.post(Task::new(TaskKind::StartApp));
        tx.post(Task::change_state(StateId::Idle));
        assert_eq!(el.run_pending().await.unwrap(), 3);
        assert_eq!(el.state(), StateId::Idle);

        let kinds: Vec<EventKind> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::TaskDispatched,
                EventKind::TaskPanicked,
                EventKind::TaskDispatched,
                EventKind::TaskFailed,
                EventKind::StateChanged,
            ]
        );
    }

    #[tokio::test]
    async fn menu_game_crash_round_trip() {
        let apps = FakeApps::new().with_running([true]).with_focus([true]);
        let h = Harness::new(apps, FakeSuspender::immediate());
        let cmds: Arc<dyn Commands> = Arc::new(h.commands(&["pong"]));
        let (tasks, apps, sink) = (h.tasks.clone(), h.apps.clone(), h.sink.clone());
        let mut el = EventLoop::new(
            StatePool::standard(),
            h.queue,
            cmds,
            h.bus.clone(),
            CancellationToken::new(),
        );

        el.enter_initial().await;
        el.run_pending().await.unwrap();
        assert_eq!(el.state(), StateId::InMenu);

        tasks.post(Task::start_app("tetris"));
        el.run_pending().await.unwrap();
        assert_eq!(el.state(), StateId::InMenu);

        tasks.post(Task::start_app("pong"));
        el.run_pending().await.unwrap();
        assert_eq!(el.state(), StateId::InGame);
        assert_eq!(el.active_app(), Some("pong"));

        tasks.post(Task::app_crashed("pong"));
        el.run_pending().await.unwrap();
        assert_eq!(el.state(), StateId::InMenu);
        assert_eq!(el.active_app(), None);

        assert_eq!(
            sink.sent(),
            vec![
                "boot",
                "activate",
                "app_not_found",
                "app_started:true",
                "deactivate",
                "app_crashed",
                "activate",
            ]
        );
        assert_eq!(apps.calls().last(), Some(&AppCall::VerifyClosed("pong".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn menu_timeout_cannot_fire_during_a_slow_start() {
        let apps = FakeApps::new().with_running([false, true]).with_focus([true]);
        let h = Harness::new(apps, FakeSuspender::immediate());
        let cmds: Arc<dyn Commands> = Arc::new(h.commands(&["pong"]));
        let (tasks, sink) = (h.tasks.clone(), h.sink.clone());
        let mut el = EventLoop::new(
            StatePool::standard(),
            h.queue,
            cmds,
            h.bus.clone(),
            CancellationToken::new(),
        );

        el.enter_initial().await;
        el.run_pending().await.unwrap();
        assert_eq!(el.state(), StateId::InMenu);

        // The settle delay of the start crosses the 120s menu timeout.
        tokio::time::sleep(Duration::from_secs(119)).await;
        tasks.post(Task::start_app("pong"));
        el.run_pending().await.unwrap();
        assert_eq!(el.state(), StateId::InGame);
        assert_eq!(el.active_app(), Some("pong"));

        tokio::time::sleep(Duration::from_secs(5)).await;
        el.run_pending().await.unwrap();
        assert_eq!(el.state(), StateId::InGame);
        assert!(!sink.sent().iter().any(|s| s == "idle_enter"));
    }

    #[tokio::test]
    async fn nothing_is_dispatched_while_suspended() {
        let h = Harness::new(FakeApps::new(), FakeSuspender::gated());
        let cmds: Arc<dyn Commands> = Arc::new(h.commands(&[]));
        let (tasks, suspender) = (h.tasks.clone(), h.suspender.clone());
        let mut events = h.bus.subscribe();
        let token = CancellationToken::new();
        let mut el = EventLoop::new(StatePool::standard(), h.queue, cmds, h.bus.clone(), token.clone());

        let handle = tokio::spawn(async move {
            el.run().await.unwrap();
            el
        });

        wait_for(&mut events, |e| e.state == Some(StateId::InMenu)).await;
        tasks.post(Task::new(TaskKind::Timeout));
        wait_for(&mut events, |e| {
            e.kind == EventKind::StateChanged && e.state == Some(StateId::Idle)
        })
        .await;
        tasks.post(Task::new(TaskKind::Sleep));
        wait_for(&mut events, |e| e.kind == EventKind::SleepEntered).await;
        tasks.post(Task::new(TaskKind::Test));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(events.try_recv().is_err());

        suspender.resume();
        let seen = wait_for(&mut events, |e| {
            e.kind == EventKind::StateChanged && e.state == Some(StateId::InMenu)
        })
        .await;
        let woke = seen.iter().position(|e| e.kind == EventKind::Woke).unwrap();
        let test = seen
            .iter()
            .position(|e| e.task == Some(TaskKind::Test))
            .unwrap();
        assert!(woke < test);
        assert_eq!(seen.last().unwrap().from, Some(StateId::Sleep));

        token.cancel();
        let el = handle.await.unwrap();
        assert_eq!(el.state(), StateId::InMenu);
        assert_eq!(suspender.requested().len(), 1);
    }
}
