//! # Event subscribers.
//!
//! ```text
//! EventLoop / CommandLayer / AppSupervisor ── publish(Event) ──► Bus
//!                                                               │
//!                                              Controller listener
//!                                                               ▼
//!                                                        SubscriberSet
//!                                                    ┌──────────┼──────────┐
//!                                                    ▼          ▼          ▼
//!                                                LogWriter   custom ...  custom
//! ```

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub(crate) use set::panic_message;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
