//! # Sleep window and suspend-and-resume.
//!
//! - [`SleepWindow`] daily wall-clock window, may wrap midnight
//! - [`SleepScheduler`] periodic window check posting `Sleep`, and the suspend action
//! - [`Suspender`] / [`RtcWake`] the OS-level suspend

mod scheduler;
mod window;

pub use scheduler::{RtcWake, SleepScheduler, Suspender};
pub use window::SleepWindow;
