//! # State pool and transition protocol.
//!
//! [`StatePool`] is the compile-time registry: one handler per [`StateId`],
//! built through an exhaustive match so a new id cannot be added without a
//! handler. [`StateMachine`] owns the pool and the active-state pointer.
//!
//! ## Transition protocol
//! ```text
//! change_state(target)
//!   target == current ? ──► no-op (no exit, no enter)
//!   current.on_exit()        error: logged, transition proceeds
//!   current = target
//!   target.on_enter()        error: returned, state already switched
//! ```
//! `on_exit` of the old state completes before `on_enter` of the new one starts.

use tracing::warn;

use crate::error::StateError;
use crate::tasks::Task;

use super::{
    game::InGame, idle::Idle, menu::InMenu, sleep::Sleep, start::Start, State, StateContext,
    StateId,
};

/// One handler per [`StateId`], indexed by [`StateId::index`].
pub struct StatePool {
    states: [Box<dyn State>; StateId::COUNT],
}

impl StatePool {
    /// Builds the pool by calling `build` once per id.
    ///
    /// # Panics
    /// If `build` returns a handler whose `id()` differs from the requested id.
    pub fn new(build: impl Fn(StateId) -> Box<dyn State>) -> Self {
        let states = std::array::from_fn(|i| {
            let id = StateId::ALL[i];
            let state = build(id);
            assert_eq!(state.id(), id, "state pool: handler registered under wrong id");
            state
        });
        Self { states }
    }

    /// The production handlers.
    pub fn standard() -> Self {
        Self::new(|id| match id {
            StateId::Start => Box::new(Start),
            StateId::InMenu => Box::new(InMenu),
            StateId::Idle => Box::new(Idle::default()),
            StateId::InGame => Box::new(InGame::default()),
            StateId::Sleep => Box::new(Sleep),
        })
    }

    #[inline]
    pub fn get(&self, id: StateId) -> &dyn State {
        self.states[id.index()].as_ref()
    }
}

impl Default for StatePool {
    fn default() -> Self {
        Self::standard()
    }
}

/// Owner of the active state.
pub struct StateMachine {
    pool: StatePool,
    current: StateId,
}

impl StateMachine {
    /// Creates a machine positioned at [`StateId::Start`] (not yet entered).
    pub fn new(pool: StatePool) -> Self {
        Self {
            pool,
            current: StateId::Start,
        }
    }

    /// The active state.
    #[inline]
    pub fn current(&self) -> StateId {
        self.current
    }

    /// Runs `on_enter` of the initial state.
    pub async fn enter_initial(&mut self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        self.pool.get(self.current).on_enter(ctx).await
    }

    /// Switches to `target`. Returns `Ok(false)` when `target` is already active.
    pub async fn change_state(
        &mut self,
        target: StateId,
        ctx: &mut StateContext<'_>,
    ) -> Result<bool, StateError> {
        if target == self.current {
            return Ok(false);
        }

        let from = self.current;
        if let Err(e) = self.pool.get(from).on_exit(ctx).await {
            warn!(state = from.as_str(), error = %e, "on_exit failed; continuing transition");
        }

        self.current = target;
        self.pool.get(target).on_enter(ctx).await?;
        Ok(true)
    }

    /// Hands `task` to the active state.
    pub async fn handle(&self, task: &Task, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        self.pool.get(self.current).on_task(task, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingCommands;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counts {
        enter: [AtomicUsize; StateId::COUNT],
        exit: [AtomicUsize; StateId::COUNT],
    }

    struct Probe {
        id: StateId,
        counts: Arc<Counts>,
    }

    #[async_trait]
    impl State for Probe {
        fn id(&self) -> StateId {
            self.id
        }
        async fn on_enter(&self, _ctx: &mut StateContext<'_>) -> Result<(), StateError> {
            self.counts.enter[self.id.index()].fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn on_task(&self, _task: &Task, _ctx: &mut StateContext<'_>) -> Result<(), StateError> {
            Ok(())
        }
        async fn on_exit(&self, _ctx: &mut StateContext<'_>) -> Result<(), StateError> {
            self.counts.exit[self.id.index()].fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn probe_machine() -> (StateMachine, Arc<Counts>) {
        let counts = Arc::new(Counts::default());
        let c = counts.clone();
        let pool = StatePool::new(move |id| {
            Box::new(Probe {
                id,
                counts: c.clone(),
            })
        });
        (StateMachine::new(pool), counts)
    }

    #[tokio::test]
    async fn change_to_current_state_is_a_no_op() {
        let (mut sm, counts) = probe_machine();
        let cmds = RecordingCommands::new();
        let mut active = None;
        let mut ctx = StateContext::new(&cmds, &mut active);

        assert!(sm.change_state(StateId::InMenu, &mut ctx).await.unwrap());
        assert!(!sm.change_state(StateId::InMenu, &mut ctx).await.unwrap());

        assert_eq!(sm.current(), StateId::InMenu);
        assert_eq!(counts.exit[StateId::Start.index()].load(Ordering::SeqCst), 1);
        assert_eq!(counts.enter[StateId::InMenu.index()].load(Ordering::SeqCst), 1);
        assert_eq!(counts.exit[StateId::InMenu.index()].load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn last_valid_target_wins_with_one_enter_exit_per_transition() {
        let (mut sm, counts) = probe_machine();
        let cmds = RecordingCommands::new();
        let mut active = None;
        let mut ctx = StateContext::new(&cmds, &mut active);

        let seq = [
            StateId::InMenu,
            StateId::Idle,
            StateId::Idle,
            StateId::InMenu,
            StateId::InGame,
            StateId::InMenu,
        ];
        for target in seq {
            sm.change_state(target, &mut ctx).await.unwrap();
        }

        assert_eq!(sm.current(), StateId::InMenu);
        let enters: usize = counts.enter.iter().map(|c| c.load(Ordering::SeqCst)).sum();
        let exits: usize = counts.exit.iter().map(|c| c.load(Ordering::SeqCst)).sum();
        assert_eq!(enters, 5);
        assert_eq!(exits, 5);
        assert_eq!(counts.enter[StateId::InMenu.index()].load(Ordering::SeqCst), 3);
    }

    #[test]
    #[should_panic(expected = "wrong id")]
    fn pool_rejects_mismatched_handler() {
        let counts = Arc::new(Counts::default());
        let _ = StatePool::new(move |_| {
            Box::new(Probe {
                id: StateId::Idle,
                counts: counts.clone(),
            })
        });
    }
}
