//! # Controller: wires producers, the event loop and subscribers together.
//!
//! The [`Controller`] owns every long-running piece of the runtime. It is built
//! by [`ControllerBuilder`](super::ControllerBuilder) and consumed by
//! [`Controller::run`].
//!
//! ## Runtime layout
//! ```text
//!   UdsServer ─────┐
//!   Timer ─────────┤
//!   app watchers ──┼──► TaskSender ──► TaskQueue ──► EventLoop ──► StateMachine
//!   sleep watch ───┤                                   │
//!   handle.post ───┘                                   └─► CommandLayer ──► collaborators
//!
//!   EventLoop / CommandLayer / AppSupervisor ── publish ──► Bus ──► listener ──► SubscriberSet
//! ```
//!
//! ## Shutdown path
//! ```text
//! OS signal or ControllerHandle::stop()
//!   └─► Bus.publish(ShutdownRequested)
//!   └─► runtime token cancelled ─► loop exits after the current task
//!                                ─► transport and sleep watch stop
//!   └─► AppSupervisor::close_all()
//!   └─► listener drains the bus, SubscriberSet::shutdown()
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::apps::AppSupervisor;
use crate::config::Config;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::sleep::SleepScheduler;
use crate::subscribers::SubscriberSet;
use crate::tasks::{Task, TaskSender};

use super::{event_loop::EventLoop, shutdown, ControllerBuilder};

/// Periodic sleep-window check, if enabled.
pub(super) struct SleepWatch {
    pub(super) scheduler: Arc<SleepScheduler>,
    pub(super) interval: Duration,
}

/// The assembled controller.
pub struct Controller {
    pub(super) event_loop: EventLoop,
    pub(super) tasks: TaskSender,
    pub(super) bus: Bus,
    pub(super) subs: SubscriberSet,
    pub(super) supervisor: Arc<AppSupervisor>,
    pub(super) sleep_watch: Option<SleepWatch>,
    pub(super) token: CancellationToken,
}

/// Cloneable handle for posting tasks and stopping a running controller.
#[derive(Clone, Debug)]
pub struct ControllerHandle {
    tasks: TaskSender,
    bus: Bus,
    token: CancellationToken,
}

impl ControllerHandle {
    /// Posts a task into the queue. Returns `false` once the controller is gone.
    pub fn post(&self, task: Task) -> bool {
        self.tasks.post(task)
    }

    /// Requests shutdown. The task being dispatched completes first.
    pub fn stop(&self) {
        if !self.token.is_cancelled() {
            self.bus.publish(Event::new(EventKind::ShutdownRequested));
            self.token.cancel();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Event bus of the controller.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }
}

impl Controller {
    pub fn builder(cfg: Config) -> ControllerBuilder {
        ControllerBuilder::new(cfg)
    }

    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle {
            tasks: self.tasks.clone(),
            bus: self.bus.clone(),
            token: self.token.clone(),
        }
    }

    /// Runs until a termination signal arrives or the handle is stopped.
    ///
    /// Returns the fatal error of the event loop, if any. Running apps are
    /// closed either way.
    pub async fn run(self) -> Result<(), RuntimeError> {
        let handle = self.handle();
        let signals = tokio::spawn(async move {
            match shutdown::wait_for_shutdown_signal().await {
                Ok(signal) => {
                    info!(signal, "termination signal received");
                    handle.stop();
                }
                Err(e) => warn!(error = %e, "signal handlers not installed"),
            }
        });

        let result = self.run_until_stopped().await;
        signals.abort();
        result
    }

    async fn run_until_stopped(self) -> Result<(), RuntimeError> {
        let Controller {
            mut event_loop,
            tasks,
            bus,
            subs,
            supervisor,
            sleep_watch,
            token,
        } = self;

        let listener_token = CancellationToken::new();
        let listener = subscriber_listener(&bus, subs, listener_token.clone());

        let watch = sleep_watch.map(|w| {
            info!(window = ?w.scheduler.window(), "sleep window check enabled");
            w.scheduler
                .spawn_watch(tasks.clone(), w.interval, token.child_token())
        });

        let result = event_loop.run().await;
        if let Err(e) = &result {
            warn!(error = %e, label = e.as_label(), "event loop failed");
        }

        token.cancel();
        supervisor.close_all().await;
        if let Some(watch) = watch {
            let _ = watch.await;
        }

        listener_token.cancel();
        let _ = listener.await;
        info!(state = event_loop.state().as_str(), "controller stopped");
        result
    }
}

/// Forwards bus events to the subscriber set until `token` is cancelled, then
/// drains what is left and shuts the set down.
fn subscriber_listener(bus: &Bus, subs: SubscriberSet, token: CancellationToken) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                ev = rx.recv() => match ev {
                    Ok(ev) => subs.emit(&ev),
                    Err(RecvError::Lagged(n)) => warn!(skipped = n, "subscriber listener lagged"),
                    Err(RecvError::Closed) => break,
                },
                _ = token.cancelled() => break,
            }
        }
        while let Ok(ev) = rx.try_recv() {
            subs.emit(&ev);
        }
        subs.shutdown().await;
    })
}
