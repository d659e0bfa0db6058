//! # Apps: descriptors, catalog, window manager and process supervisor.
//!
//! - [`AppKind`] / [`AppDescriptor`] / [`LaunchSpec`] what an app is and how it starts
//! - [`AppLookup`] / [`AppCatalog`] the read-only config collaborator
//! - [`WindowManager`] / [`Xdotool`] window queries used for verification
//! - [`AppControl`] / [`AppSupervisor`] process lifecycle and crash detection

mod catalog;
mod kind;
mod supervisor;
mod window;

pub use catalog::{AppCatalog, AppLookup};
pub use kind::{AppDescriptor, AppKind, LaunchSpec, Media};
pub use supervisor::{AppControl, AppSupervisor};
pub use window::{WindowId, WindowManager, Xdotool};
