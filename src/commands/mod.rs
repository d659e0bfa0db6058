//! # Commands: the operations states perform.
//!
//! - [`Commands`] / [`CommandId`] - the catalog
//! - [`ColorScheme`] / [`VolumeLevel`] - presets states refer to by name
//! - [`CommandLayer`] - production implementation over the collaborators

mod command;
mod layer;

pub use command::{ColorScheme, CommandId, Commands, VolumeLevel};
pub use layer::{CommandDeps, CommandLayer, CommandSettings};
