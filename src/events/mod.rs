//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `EventLoop`, `CommandLayer`, `AppSupervisor`, `Controller`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the controller listener (fans out to `SubscriberSet`),
//!   and tests observing the loop.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
