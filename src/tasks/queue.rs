//! # Task queue shared by all producers.
//!
//! [`TaskSender`] is the producer side: cheap to clone, callable from any task or
//! thread, and never blocks. [`TaskQueue`] is the single consumer owned by the
//! [`EventLoop`](crate::EventLoop).
//!
//! ## Architecture
//! ```text
//! Producers (many):                    Consumer (one):
//!   transport ──┐
//!   timer     ──┤
//!   watchers  ──┼──► TaskSender ──► unbounded mpsc ──► TaskQueue ──► EventLoop
//!   sleep     ──┤
//!   commands  ──┘
//! ```
//!
//! ## Rules
//! - **FIFO** across all producers combined (single channel).
//! - **Unbounded**, no deduplication, no priorities.
//! - A task posted while another is being dispatched is appended behind every
//!   task already queued; it is never handled re-entrantly.

use tokio::sync::mpsc;

use super::task::Task;

/// Creates a connected sender/queue pair.
pub fn channel() -> (TaskSender, TaskQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TaskSender { tx }, TaskQueue { rx })
}

/// Producer handle of the task queue.
#[derive(Clone, Debug)]
pub struct TaskSender {
    tx: mpsc::UnboundedSender<Task>,
}

impl TaskSender {
    /// Appends a task. Returns `false` if the event loop is gone.
    pub fn post(&self, task: Task) -> bool {
        let kind = task.kind();
        match self.tx.send(task) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!(task = kind.as_label(), "task dropped: event loop closed");
                false
            }
        }
    }

    /// Returns `true` once the consumer has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side of the task queue.
#[derive(Debug)]
pub struct TaskQueue {
    rx: mpsc::UnboundedReceiver<Task>,
}

impl TaskQueue {
    /// Waits for the next task. Returns `None` when every sender is gone.
    pub async fn next(&mut self) -> Option<Task> {
        self.rx.recv().await
    }

    /// Pops the front task without waiting.
    pub fn try_next(&mut self) -> Option<Task> {
        self.rx.try_recv().ok()
    }
}
