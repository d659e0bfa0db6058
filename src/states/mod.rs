//! # States of the controller.
//!
//! ```text
//!            ┌────────────── Wake ──────────────┐
//!            ▼                                  │
//! Start ─► InMenu ── Timeout ──► Idle ── Sleep ─► Sleep
//!          ▲   │  ◄─ Interaction/CloseApp ─┘
//!          │   └─ StartApp (verified) ──► InGame
//!          └──── CloseApp / Timeout / AppCrashed ──┘
//! ```
//!
//! - [`State`] the handler contract, [`StateContext`] what a handler may touch
//! - [`StateId`] closed set of state identities
//! - [`StatePool`] compile-time registry, [`StateMachine`] transition protocol

mod game;
mod id;
mod idle;
mod machine;
mod menu;
mod sleep;
mod start;
mod state;

pub use game::InGame;
pub use id::StateId;
pub use idle::Idle;
pub use machine::{StateMachine, StatePool};
pub use menu::InMenu;
pub use sleep::Sleep;
pub use start::Start;
pub use state::{State, StateContext};
