//! # Interaction feedback switch.
//!
//! Raw input producers call [`InteractionFeedback::notify_input`] for every input
//! event. While the switch is enabled (the `Idle` state turns it on) each call
//! posts an `Interaction` task; otherwise the input is dropped here. Input
//! producers never touch state-machine, LED or volume state directly.

use std::sync::atomic::{AtomicBool, Ordering};

use super::{Task, TaskKind, TaskSender};

/// Shared on/off switch that converts raw input into `Interaction` tasks.
#[derive(Debug)]
pub struct InteractionFeedback {
    enabled: AtomicBool,
    tasks: TaskSender,
}

impl InteractionFeedback {
    /// Creates a disabled switch posting into `tasks`.
    pub fn new(tasks: TaskSender) -> Self {
        Self {
            enabled: AtomicBool::new(false),
            tasks,
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Handles one raw input event. Returns `true` if a task was posted.
    pub fn notify_input(&self) -> bool {
        if !self.is_enabled() {
            return false;
        }
        self.tasks.post(Task::new(TaskKind::Interaction))
    }
}
