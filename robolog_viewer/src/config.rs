//! Viewer configuration.

use robolog_core::model_locator::DEFAULT_FALLBACK_ROBOT;
use robolog_core::{ModelLocator, DEFAULT_ROOT_NAME};
use robolog_env::ViewerContext;
use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings resolved from the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Log opened at startup
    pub file: Option<PathBuf>,
    /// Root group of the log
    pub root_name: String,
    /// URDF used instead of searching
    pub model: Option<PathBuf>,
    /// Extra directory searched for `package://` meshes
    pub package_dir: Option<PathBuf>,
    /// Robot loaded when the log names none or an unknown one
    pub fallback_robot: String,
    /// Playback timer period in milliseconds
    pub period_ms: u64,
    /// Playback speed multiplier
    pub speed: f64,
    /// View snapshot applied at startup
    pub snapshot: Option<PathBuf>,
    /// Where the `s` key writes the view snapshot
    pub save_snapshot: PathBuf,
    /// Write the 3D stream to this `.rrd` file instead of spawning a viewer
    pub rerun_save: Option<PathBuf>,
    /// Lines kept in the console view
    pub console_capacity: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            file: None,
            root_name: DEFAULT_ROOT_NAME.to_string(),
            model: None,
            package_dir: None,
            fallback_robot: DEFAULT_FALLBACK_ROBOT.to_string(),
            period_ms: 30,
            speed: 1.0,
            snapshot: None,
            save_snapshot: PathBuf::from("robolog_view.json"),
            rerun_save: None,
            console_capacity: 500,
        }
    }
}

impl ViewerConfig {
    /// Reads settings from a JSON file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file '{}'", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("invalid config file '{}'", path.display()))
    }

    /// Playback timer period, at least one millisecond.
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms.max(1))
    }

    /// Model lookup configured from these settings.
    pub fn locator<'a>(&self, ctx: &'a dyn ViewerContext) -> ModelLocator<'a> {
        ModelLocator::new(ctx)
            .with_override(self.model.clone())
            .with_package_dir(self.package_dir.clone())
            .with_fallback(self.fallback_robot.clone())
    }
}
