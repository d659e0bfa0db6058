//! # App descriptors and launch specs.
//!
//! Each app lives in `<apps_location>/<app_id>/` with a `config.json`:
//!
//! ```json
//! { "type": "executable", "exe": "pong.x86_64", "media": { "logo": "logo.png" } }
//! { "type": "mame_rom", "command": "mame -rompath %%path%%roms galaga", "media": { "logo": "galaga.png" } }
//! ```
//!
//! The two app types differ only in how the command line and the window search
//! term are derived, so they are one enum rather than separate types.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::hardware::ColorData;

/// Placeholder in `mame_rom` commands replaced by the apps location.
const PATH_PLACEHOLDER: &str = "%%path%%";

/// Window search term of every `mame_rom` app.
const MAME_WINDOW_TERM: &str = "MAME";

/// How an app is launched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppKind {
    /// A binary shipped in the app's own directory.
    Executable {
        /// Path relative to the app directory, optionally followed by arguments.
        exe: String,
        /// Full command line used instead of `exe` (development setups).
        #[serde(rename = "_debug_path", default)]
        debug_path: Option<String>,
    },
    /// A ROM run by the MAME emulator.
    MameRom {
        /// Emulator command line; `%%path%%` expands to the apps location.
        command: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Media {
    pub logo: String,
}

/// Parsed `config.json` of one app.
#[derive(Debug, Clone, Deserialize)]
pub struct AppDescriptor {
    #[serde(flatten)]
    pub kind: AppKind,
    pub media: Media,
    /// LED colors shown while the app runs.
    #[serde(default)]
    pub button_colors: Option<ColorData>,
}

/// Everything needed to spawn and find an app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Term passed to the window manager to find the app's window.
    pub window_term: String,
    /// Directory the process starts in, if any.
    pub working_dir: Option<PathBuf>,
}

impl AppKind {
    /// Term used to search the app's window.
    pub fn window_term(&self) -> &str {
        match self {
            AppKind::Executable { exe, .. } => exe,
            AppKind::MameRom { .. } => MAME_WINDOW_TERM,
        }
    }

    /// Derives the launch spec of `app_id` located under `apps_location`.
    ///
    /// Returns `None` if the configured command line is empty.
    pub fn launch_spec(&self, app_id: &str, apps_location: &Path) -> Option<LaunchSpec> {
        let app_dir = apps_location.join(app_id);
        let (program, args, working_dir) = match self {
            AppKind::Executable {
                debug_path: Some(cmd),
                ..
            } => {
                let (program, args) = split_command(cmd)?;
                (PathBuf::from(program), args, None)
            }
            AppKind::Executable { exe, .. } => {
                let (program, args) = split_command(exe)?;
                (app_dir.join(program), args, Some(app_dir))
            }
            AppKind::MameRom { command } => {
                let location = apps_location.to_string_lossy();
                let location = with_trailing_slash(&location);
                let expanded = command.replace(PATH_PLACEHOLDER, &location);
                let (program, args) = split_command(&expanded)?;
                (PathBuf::from(program), args, None)
            }
        };

        Some(LaunchSpec {
            program,
            args,
            window_term: self.window_term().to_string(),
            working_dir,
        })
    }
}

fn split_command(cmd: &str) -> Option<(String, Vec<String>)> {
    let mut parts = cmd.split_whitespace().map(str::to_string);
    let program = parts.next()?;
    Some((program, parts.collect()))
}

fn with_trailing_slash(s: &str) -> String {
    if s.ends_with('/') {
        s.to_string()
    } else {
        format!("{s}/")
    }
}
