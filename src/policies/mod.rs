//! Retry policies.
//!
//! ## Contents
//! - [`RetryPolicy`] how many attempts, settle delay, delay between attempts
//! - [`BackoffPolicy`] how the delay between attempts evolves
//! - [`JitterPolicy`] randomization of that delay
//!
//! ## Defaults
//! - StartGame: 3 attempts, 2s settle, constant 500ms, no jitter.
//! - FocusApp: 3 polls, constant 250ms.

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::RetryPolicy;
