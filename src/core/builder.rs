use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::controller::{Controller, SleepWatch};
use super::event_loop::EventLoop;
use crate::apps::{AppCatalog, AppLookup, AppSupervisor, WindowManager, Xdotool};
use crate::commands::{CommandDeps, CommandLayer, CommandSettings};
use crate::config::Config;
use crate::error::RuntimeError;
use crate::events::Bus;
use crate::hardware::{Amixer, ButtonController, Cabinet, Hardware, VolumeController};
use crate::sleep::{RtcWake, SleepScheduler, Suspender};
use crate::states::StatePool;
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::tasks::{channel, InteractionFeedback, TaskSender};
use crate::timer::Timer;
use crate::transport::StatusSink;

/// Builder for a [`Controller`].
///
/// Every collaborator defaults to the production implementation configured
/// from [`Config`]; the `with_*` methods substitute one.
pub struct ControllerBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    catalog: Option<Arc<dyn AppLookup>>,
    windows: Option<Arc<dyn WindowManager>>,
    hardware: Option<Arc<dyn Hardware>>,
    suspender: Option<Arc<dyn Suspender>>,
    status: Option<Arc<dyn StatusSink>>,
    pool: Option<StatePool>,
}

impl ControllerBuilder {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            catalog: None,
            windows: None,
            hardware: None,
            suspender: None,
            status: None,
            pool: None,
        }
    }

    /// Sets event subscribers.
    ///
    /// Each subscriber gets a dedicated worker with a bounded queue.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the app catalog loaded from `apps_location`.
    pub fn with_catalog(mut self, catalog: Arc<dyn AppLookup>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_windows(mut self, windows: Arc<dyn WindowManager>) -> Self {
        self.windows = Some(windows);
        self
    }

    pub fn with_hardware(mut self, hardware: Arc<dyn Hardware>) -> Self {
        self.hardware = Some(hardware);
        self
    }

    pub fn with_suspender(mut self, suspender: Arc<dyn Suspender>) -> Self {
        self.suspender = Some(suspender);
        self
    }

    /// Sends status strings to `sink` instead of the unix socket.
    ///
    /// No socket is bound in that case.
    pub fn with_status_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.status = Some(sink);
        self
    }

    /// Replaces the standard state handlers.
    pub fn with_states(mut self, pool: StatePool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Assembles the controller.
    ///
    /// Must be called inside a tokio runtime: subscriber workers, the volume
    /// fade task and the socket accept loop are spawned here.
    pub fn build(self) -> Result<Controller, RuntimeError> {
        let cfg = self.cfg;
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let token = CancellationToken::new();
        let (tasks, queue) = channel();

        let catalog: Arc<dyn AppLookup> = match self.catalog {
            Some(catalog) => catalog,
            None => {
                let catalog = AppCatalog::load(&cfg.apps_location)?;
                info!(apps = ?catalog.ids(), "app catalog loaded");
                Arc::new(catalog)
            }
        };
        let windows = self
            .windows
            .unwrap_or_else(|| Arc::new(Xdotool::new(cfg.windows.program.clone())));
        let hardware = self.hardware.unwrap_or_else(|| cabinet(&cfg));
        let suspender = self.suspender.unwrap_or_else(|| {
            Arc::new(RtcWake::new(cfg.sleep.program.clone(), cfg.sleep.mode.clone()))
        });

        let sleep = Arc::new(SleepScheduler::new(cfg.sleep_window()?, suspender));
        let feedback = Arc::new(InteractionFeedback::new(tasks.clone()));
        let ui = match self.status {
            Some(sink) => sink,
            None => status_sink(&cfg, &tasks, &feedback, &token)?,
        };

        let supervisor = Arc::new(AppSupervisor::new(
            catalog.clone(),
            windows,
            tasks.clone(),
            bus.clone(),
            cfg.stop_grace(),
        ));
        let deps = CommandDeps {
            apps: supervisor.clone(),
            catalog,
            timer: Arc::new(Timer::new(tasks.clone())),
            tasks: tasks.clone(),
            ui,
            hardware,
            feedback,
            sleep: sleep.clone(),
            bus: bus.clone(),
        };
        let commands = CommandLayer::new(deps, CommandSettings::from_config(&cfg));

        let event_loop = EventLoop::new(
            self.pool.unwrap_or_default(),
            queue,
            Arc::new(commands),
            bus.clone(),
            token.clone(),
        );
        let sleep_watch = cfg.sleep.enabled.then(|| SleepWatch {
            scheduler: sleep,
            interval: cfg.sleep_check_interval(),
        });

        Ok(Controller {
            event_loop,
            tasks,
            bus,
            subs,
            supervisor,
            sleep_watch,
            token,
        })
    }
}

fn cabinet(cfg: &Config) -> Arc<dyn Hardware> {
    let v = &cfg.volume;
    let mixer = Amixer::new(v.program.clone(), v.device.clone(), v.control.clone());
    let volume = VolumeController::spawn(Arc::new(mixer), v.menu);
    Arc::new(Cabinet::new(ButtonController::new(), volume))
}

#[cfg(unix)]
fn status_sink(
    cfg: &Config,
    tasks: &TaskSender,
    feedback: &Arc<InteractionFeedback>,
    token: &CancellationToken,
) -> Result<Arc<dyn StatusSink>, RuntimeError> {
    let server: Arc<dyn StatusSink> = crate::transport::UdsServer::start(
        cfg.socket_path.clone(),
        tasks.clone(),
        feedback.clone(),
        token.child_token(),
    )?;
    Ok(server)
}

#[cfg(not(unix))]
fn status_sink(
    _cfg: &Config,
    _tasks: &TaskSender,
    _feedback: &Arc<InteractionFeedback>,
    _token: &CancellationToken,
) -> Result<Arc<dyn StatusSink>, RuntimeError> {
    tracing::warn!("no ui transport on this platform");
    let sink: Arc<dyn StatusSink> = Arc::new(crate::transport::NullSink);
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSuspender, FakeWindows, RecordingHardware, RecordingSink};

    fn base(cfg: Config) -> ControllerBuilder {
        ControllerBuilder::new(cfg)
            .with_status_sink(Arc::new(RecordingSink::default()))
            .with_windows(Arc::new(FakeWindows::new()))
            .with_hardware(Arc::new(RecordingHardware::default()))
            .with_suspender(Arc::new(FakeSuspender::immediate()))
    }

    #[tokio::test]
    async fn missing_apps_location_fails_the_build() {
        let mut cfg = Config::default();
        cfg.apps_location = "/nonexistent/kioskvisor/apps".into();
        let err = base(cfg).build().err().unwrap();
        assert_eq!(err.as_label(), "runtime_config");
    }

    #[tokio::test]
    async fn invalid_sleep_window_fails_the_build() {
        let mut cfg = Config::default();
        cfg.sleep.sleep_at = "25:99".into();
        let dir = tempfile::tempdir().unwrap();
        cfg.apps_location = dir.path().to_path_buf();
        let err = base(cfg).build().err().unwrap();
        assert!(matches!(err, RuntimeError::Config(_)));
    }

    #[tokio::test]
    async fn binds_the_ui_socket_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.apps_location = dir.path().to_path_buf();
        cfg.socket_path = dir.path().join("ui.sock");

        let ctrl = ControllerBuilder::new(cfg)
            .with_windows(Arc::new(FakeWindows::new()))
            .with_hardware(Arc::new(RecordingHardware::default()))
            .build()
            .unwrap();
        assert!(dir.path().join("ui.sock").exists());
        ctrl.handle().stop();
    }
}
