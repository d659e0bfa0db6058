//! # App catalog: the read-only config collaborator.
//!
//! [`AppCatalog::load`] scans the apps location once at startup. Every
//! subdirectory with a valid `config.json` becomes an app named after the
//! directory; missing or invalid descriptors are skipped with a warning.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{AppError, ConfigError};
use crate::hardware::ColorData;

use super::kind::{AppDescriptor, LaunchSpec};

const DESCRIPTOR_FILE: &str = "config.json";

/// Read-only lookup of configured apps.
pub trait AppLookup: Send + Sync {
    /// Launch spec of `app_id`, or `NotConfigured`.
    fn launch_spec(&self, app_id: &str) -> Result<LaunchSpec, AppError>;

    /// LED colors of `app_id`, if it defines any.
    fn button_colors(&self, app_id: &str) -> Option<ColorData>;

    fn is_configured(&self, app_id: &str) -> bool {
        self.launch_spec(app_id).is_ok()
    }
}

/// Descriptors loaded from the apps location.
#[derive(Debug, Clone, Default)]
pub struct AppCatalog {
    location: PathBuf,
    apps: HashMap<String, AppDescriptor>,
}

impl AppCatalog {
    /// Scans `location` for `<app_id>/config.json` descriptors.
    ///
    /// Fails only if `location` itself cannot be read.
    pub fn load(location: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let location = location.into();
        let entries = fs::read_dir(&location).map_err(|source| ConfigError::Read {
            path: location.clone(),
            source,
        })?;

        let mut apps = HashMap::new();
        for entry in entries.flatten() {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            let Some(app_id) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            match read_descriptor(&dir.join(DESCRIPTOR_FILE)) {
                Ok(descriptor) => {
                    debug!(app = %app_id, "app descriptor loaded");
                    apps.insert(app_id, descriptor);
                }
                Err(e) => warn!(app = %app_id, error = %e, "app skipped"),
            }
        }

        info!(location = %location.display(), apps = apps.len(), "app catalog loaded");
        Ok(Self { location, apps })
    }

    /// Builds a catalog from already parsed descriptors.
    pub fn from_descriptors(
        location: impl Into<PathBuf>,
        apps: impl IntoIterator<Item = (String, AppDescriptor)>,
    ) -> Self {
        Self {
            location: location.into(),
            apps: apps.into_iter().collect(),
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn descriptor(&self, app_id: &str) -> Option<&AppDescriptor> {
        self.apps.get(app_id)
    }

    /// Configured app ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.apps.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

impl AppLookup for AppCatalog {
    fn launch_spec(&self, app_id: &str) -> Result<LaunchSpec, AppError> {
        self.apps
            .get(app_id)
            .and_then(|d| d.kind.launch_spec(app_id, &self.location))
            .ok_or_else(|| AppError::NotConfigured {
                app_id: app_id.to_string(),
            })
    }

    fn button_colors(&self, app_id: &str) -> Option<ColorData> {
        self.apps.get(app_id)?.button_colors.clone()
    }
}

fn read_descriptor(path: &Path) -> Result<AppDescriptor, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Descriptor {
        path: path.to_path_buf(),
        source,
    })
}
