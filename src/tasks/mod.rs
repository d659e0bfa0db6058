//! # Tasks and the task queue.
//!
//! - [`Task`] / [`TaskKind`] - immutable requests for the event loop
//! - [`TaskSender`] / [`TaskQueue`] - many-producer, single-consumer FIFO
//! - [`parse_message`] - transport line → [`Message`]
//! - [`InteractionFeedback`] - raw input → `Interaction` task switch

mod feedback;
mod parse;
mod queue;
mod task;

pub use feedback::InteractionFeedback;
pub use parse::{parse_message, Message};
pub use queue::{channel, TaskQueue, TaskSender};
pub use task::{Task, TaskKind};
