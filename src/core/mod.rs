//! Runtime core: dispatch, wiring and lifecycle.
//!
//! - [`EventLoop`]: single consumer of the task queue, drives the state machine;
//! - [`Controller`] / [`ControllerBuilder`]: assemble collaborators, run the loop,
//!   shut down on signal;
//! - [`ControllerHandle`]: post tasks into and stop a running controller;
//! - `shutdown`: termination signal handling.

mod builder;
mod controller;
mod event_loop;
mod shutdown;

pub use builder::ControllerBuilder;
pub use controller::{Controller, ControllerHandle};
pub use event_loop::EventLoop;
