//! View snapshots: the viewer layout saved as JSON.
//!
//! Unknown fields are ignored and missing fields take their defaults, so
//! files written by older or newer viewers of the same version load fine.
//! A snapshot with a higher version is rejected.

use crate::error::SnapshotError;
use crate::robot_state::RobotStatePaths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSnapshot {
    pub path: Option<PathBuf>,
    pub robot_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineSnapshot {
    pub index: usize,
    pub is_running: bool,
    pub current_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotSnapshot {
    pub title: String,
    /// Curves as `path/column`
    pub curves: Vec<String>,
}

impl Default for PlotSnapshot {
    fn default() -> Self {
        Self {
            title: "Plot".to_string(),
            curves: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySnapshot {
    pub label: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationSnapshot {
    pub points: Vec<OverlaySnapshot>,
    pub trajectories: Vec<OverlaySnapshot>,
    pub arrows: Vec<OverlaySnapshot>,
    pub robot_state: RobotStatePaths,
}

/// Everything needed to restore a viewer session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSnapshot {
    pub version: u32,
    pub dataset: DatasetSnapshot,
    pub timeline: TimelineSnapshot,
    /// Index of the visible plot tab
    pub active_plot: usize,
    pub plots: Vec<PlotSnapshot>,
    pub visualization: VisualizationSnapshot,
}

impl Default for ViewSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            dataset: DatasetSnapshot::default(),
            timeline: TimelineSnapshot::default(),
            active_plot: 0,
            plots: Vec::new(),
            visualization: VisualizationSnapshot::default(),
        }
    }
}

impl ViewSnapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(SnapshotError::Version {
                found: snapshot.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(snapshot)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        info!("Saved view snapshot to {}", path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let snapshot = Self::from_json(&std::fs::read_to_string(path)?)?;
        info!("Loaded view snapshot from {}", path.display());
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ViewSnapshot {
        ViewSnapshot {
            dataset: DatasetSnapshot {
                path: Some(PathBuf::from("/logs/walking.mat")),
                robot_name: Some("ergoCubSN000".into()),
            },
            timeline: TimelineSnapshot {
                index: 420,
                is_running: true,
                current_time: 4.2,
            },
            active_plot: 1,
            plots: vec![
                PlotSnapshot {
                    title: "Joints".into(),
                    curves: vec!["joints_state/positions/0".into(), "joints_state/positions/3".into()],
                },
                PlotSnapshot::default(),
            ],
            visualization: VisualizationSnapshot {
                points: vec![OverlaySnapshot {
                    label: "com".into(),
                    path: "balancing/com".into(),
                }],
                arrows: vec![OverlaySnapshot {
                    label: "l_foot".into(),
                    path: "contacts/l_foot".into(),
                }],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("view.json");

        let snapshot = sample();
        snapshot.save(&path).unwrap();
        assert_eq!(ViewSnapshot::load(&path).unwrap(), snapshot);
    }

    #[test]
    fn test_missing_and_unknown_fields() {
        let json = r#"{
            "version": 1,
            "window": {"geometry": "abc"},
            "timeline": {"index": 7},
            "plots": [{"curves": ["a/0"]}]
        }"#;
        let snapshot = ViewSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.timeline.index, 7);
        assert!(!snapshot.timeline.is_running);
        assert_eq!(snapshot.plots[0].title, "Plot");
        assert_eq!(
            snapshot.visualization.robot_state.joints.to_string(),
            "joints_state/positions"
        );
        assert!(snapshot.visualization.arrows.is_empty());
        assert_eq!(ViewSnapshot::from_json("{}").unwrap().version, SNAPSHOT_VERSION);
    }

    #[test]
    fn test_newer_version_rejected() {
        let err = ViewSnapshot::from_json(r#"{"version": 2}"#).unwrap_err();
        assert!(matches!(err, SnapshotError::Version { found: 2, supported: 1 }));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(ViewSnapshot::from_json("not json"), Err(SnapshotError::Json(_))));
        assert!(matches!(ViewSnapshot::load("/no/such/view.json"), Err(SnapshotError::Io(_))));
    }
}
