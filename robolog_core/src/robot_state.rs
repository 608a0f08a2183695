//! Robot state and 3D overlays extracted from a log at a cursor position.

use crate::log_file::RobotLog;
use crate::signals::SignalPath;
use nalgebra::{DVector, Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default number of samples on each side of a trajectory overlay.
pub const DEFAULT_TRAJECTORY_SPAN: usize = 200;

/// Signals the robot pose is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotStatePaths {
    pub joints: SignalPath,
    pub base_position: Option<SignalPath>,
    pub base_orientation: Option<SignalPath>,
}

impl Default for RobotStatePaths {
    fn default() -> Self {
        Self {
            joints: SignalPath::from("joints_state/positions"),
            base_position: None,
            base_orientation: None,
        }
    }
}

/// Joint positions and floating base pose at one cursor position.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotState {
    /// One value per logged joint, in log order
    pub joint_positions: DVector<f64>,
    pub base_position: Vector3<f64>,
    pub base_orientation: UnitQuaternion<f64>,
}

impl RobotState {
    /// Reads the state closest in time to axis sample `index`.
    pub fn at(log: &RobotLog, paths: &RobotStatePaths, index: usize) -> Self {
        let joint_positions = log
            .sample_at(&paths.joints, index)
            .unwrap_or_else(|| DVector::zeros(0));

        let base_position = paths
            .base_position
            .as_ref()
            .and_then(|path| log.sample_at(path, index))
            .map(|row| pad3(&row))
            .unwrap_or_else(Vector3::zeros);

        let base_orientation = paths
            .base_orientation
            .as_ref()
            .and_then(|path| log.sample_at(path, index))
            .map(|row| orientation_from_row(&row))
            .unwrap_or_else(UnitQuaternion::identity);

        Self {
            joint_positions,
            base_position,
            base_orientation,
        }
    }

    pub fn base_pose(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.base_position), self.base_orientation)
    }
}

/// Interprets 3 values as roll, pitch, yaw and 4 values as an `x y z w` quaternion.
fn orientation_from_row(row: &DVector<f64>) -> UnitQuaternion<f64> {
    match row.len() {
        3 => UnitQuaternion::from_euler_angles(row[0], row[1], row[2]),
        4 => {
            let q = Quaternion::new(row[3], row[0], row[1], row[2]);
            if q.norm() > f64::EPSILON {
                UnitQuaternion::from_quaternion(q)
            } else {
                UnitQuaternion::identity()
            }
        }
        n => {
            tracing::debug!("Ignoring base orientation with {} values", n);
            UnitQuaternion::identity()
        }
    }
}

/// First three values of `row`, zero padded.
pub fn pad3(row: &DVector<f64>) -> Vector3<f64> {
    let mut out = Vector3::zeros();
    for (i, v) in row.iter().take(3).enumerate() {
        out[i] = *v;
    }
    out
}

/// How an overlay signal is drawn in the 3D view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    Point,
    Trajectory,
    /// Origin xyz followed by vector xyz
    Arrow,
}

impl std::fmt::Display for OverlayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlayKind::Point => write!(f, "point"),
            OverlayKind::Trajectory => write!(f, "trajectory"),
            OverlayKind::Arrow => write!(f, "arrow"),
        }
    }
}

/// Signals shown in the 3D view as points, trajectories or arrows, keyed by label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlays {
    pub points: BTreeMap<String, SignalPath>,
    pub trajectories: BTreeMap<String, SignalPath>,
    pub arrows: BTreeMap<String, SignalPath>,
    pub trajectory_span: usize,
}

impl Default for Overlays {
    fn default() -> Self {
        Self {
            points: BTreeMap::new(),
            trajectories: BTreeMap::new(),
            arrows: BTreeMap::new(),
            trajectory_span: DEFAULT_TRAJECTORY_SPAN,
        }
    }
}

impl Overlays {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of_kind(&self, kind: OverlayKind) -> &BTreeMap<String, SignalPath> {
        match kind {
            OverlayKind::Point => &self.points,
            OverlayKind::Trajectory => &self.trajectories,
            OverlayKind::Arrow => &self.arrows,
        }
    }

    fn of_kind_mut(&mut self, kind: OverlayKind) -> &mut BTreeMap<String, SignalPath> {
        match kind {
            OverlayKind::Point => &mut self.points,
            OverlayKind::Trajectory => &mut self.trajectories,
            OverlayKind::Arrow => &mut self.arrows,
        }
    }

    /// Shows `path` as `kind`. Re-registering a label of the same kind replaces it.
    pub fn register(&mut self, kind: OverlayKind, label: impl Into<String>, path: SignalPath) {
        self.of_kind_mut(kind).insert(label.into(), path);
    }

    /// Removes one overlay of `kind`. Returns whether it was registered.
    pub fn unregister(&mut self, kind: OverlayKind, label: &str) -> bool {
        self.of_kind_mut(kind).remove(label).is_some()
    }

    pub fn contains(&self, kind: OverlayKind, label: &str) -> bool {
        self.of_kind(kind).contains_key(label)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.trajectories.is_empty() && self.arrows.is_empty()
    }

    /// Point positions at axis sample `index`. Labels whose signal is missing are skipped.
    pub fn points_at(&self, log: &RobotLog, index: usize) -> Vec<(String, Vector3<f64>)> {
        self.points
            .iter()
            .filter_map(|(label, path)| {
                log.sample_at(path, index)
                    .map(|row| (label.clone(), pad3(&row)))
            })
            .collect()
    }

    /// Trajectory windows around axis sample `index`.
    pub fn trajectories_at(&self, log: &RobotLog, index: usize) -> Vec<(String, Vec<Vector3<f64>>)> {
        self.trajectories
            .iter()
            .filter_map(|(label, path)| {
                let window = log.window_at(path, index, self.trajectory_span)?;
                let points = window
                    .row_iter()
                    .map(|row| pad3(&row.transpose()))
                    .collect();
                Some((label.clone(), points))
            })
            .collect()
    }

    /// Arrow origins and vectors at axis sample `index`.
    pub fn arrows_at(&self, log: &RobotLog, index: usize) -> Vec<(String, Arrow)> {
        self.arrows
            .iter()
            .filter_map(|(label, path)| {
                log.sample_at(path, index)
                    .map(|row| (label.clone(), Arrow::from_row(&row)))
            })
            .collect()
    }
}

/// A vector anchored at a point, e.g. a contact force at its application point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrow {
    pub origin: Vector3<f64>,
    pub vector: Vector3<f64>,
}

impl Arrow {
    /// Reads `[ox, oy, oz, vx, vy, vz]`, zero padding short rows.
    pub fn from_row(row: &DVector<f64>) -> Self {
        let mut values = [0.0; 6];
        for (slot, v) in values.iter_mut().zip(row.iter()) {
            *slot = *v;
        }
        Self {
            origin: Vector3::new(values[0], values[1], values[2]),
            vector: Vector3::new(values[3], values[4], values[5]),
        }
    }

    pub fn tip(&self) -> Vector3<f64> {
        self.origin + self.vector
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::{Signal, SignalTree};
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;
    use std::f64::consts::FRAC_PI_2;

    fn log_with(signals: Vec<(&str, DMatrix<f64>)>) -> RobotLog {
        let mut tree = SignalTree::new();
        for (path, data) in signals {
            let ts = (0..data.nrows()).map(|i| i as f64 * 0.01).collect();
            tree.insert(&path.into(), Signal::new(data, ts).unwrap());
        }
        RobotLog::from_tree("root", tree, vec![], None).unwrap()
    }

    #[test]
    fn test_state_without_base_signals() {
        let log = log_with(vec![(
            "joints_state/positions",
            DMatrix::from_fn(10, 3, |r, c| (r + c) as f64),
        )]);
        let state = RobotState::at(&log, &RobotStatePaths::default(), 4);

        assert_eq!(state.joint_positions.as_slice(), &[4.0, 5.0, 6.0]);
        assert_eq!(state.base_position, Vector3::zeros());
        assert_eq!(state.base_orientation, UnitQuaternion::identity());
    }

    #[test]
    fn test_state_missing_joints_is_empty() {
        let log = log_with(vec![("other", DMatrix::zeros(5, 1))]);
        let state = RobotState::at(&log, &RobotStatePaths::default(), 0);
        assert_eq!(state.joint_positions.len(), 0);
    }

    #[test]
    fn test_base_orientation_rpy_and_quaternion() {
        let rpy = DMatrix::from_row_slice(1, 3, &[0.0, 0.0, FRAC_PI_2]);
        // 90 degrees about z, stored x y z w
        let s = 0.5f64.sqrt();
        let quat = DMatrix::from_row_slice(1, 4, &[0.0, 0.0, s, s]);
        let pos = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        let log = log_with(vec![("rpy", rpy), ("quat", quat), ("pos", pos)]);

        let paths = RobotStatePaths {
            joints: "missing".into(),
            base_position: Some("pos".into()),
            base_orientation: Some("rpy".into()),
        };
        let from_rpy = RobotState::at(&log, &paths, 0);
        assert_eq!(from_rpy.base_position, Vector3::new(1.0, 2.0, 0.0));

        let paths = RobotStatePaths {
            base_orientation: Some("quat".into()),
            ..paths
        };
        let from_quat = RobotState::at(&log, &paths, 0);

        assert_relative_eq!(from_rpy.base_orientation, from_quat.base_orientation, epsilon = 1e-9);
        let x = from_quat.base_pose().transform_vector(&Vector3::x());
        assert_relative_eq!(x, Vector3::y(), epsilon = 1e-9);
    }

    #[test]
    fn test_overlays() {
        let log = log_with(vec![
            ("com", DMatrix::from_fn(500, 3, |r, c| (r * 3 + c) as f64)),
            ("zmp", DMatrix::from_fn(500, 2, |r, _| r as f64)),
        ]);
        let mut overlays = Overlays::new();
        overlays.register(OverlayKind::Point, "com", "com".into());
        overlays.register(OverlayKind::Point, "ghost", "not/there".into());
        overlays.register(OverlayKind::Trajectory, "zmp", "zmp".into());

        let points = overlays.points_at(&log, 10);
        assert_eq!(points, vec![("com".to_string(), Vector3::new(30.0, 31.0, 32.0))]);

        let trajectories = overlays.trajectories_at(&log, 100);
        assert_eq!(trajectories.len(), 1);
        // rows 0..=300
        assert_eq!(trajectories[0].1.len(), 301);
        assert_eq!(trajectories[0].1[5], Vector3::new(5.0, 5.0, 0.0));

        assert!(overlays.unregister(OverlayKind::Trajectory, "zmp"));
        assert!(!overlays.unregister(OverlayKind::Trajectory, "zmp"));
    }

    #[test]
    fn test_unregister_only_touches_one_kind() {
        let mut overlays = Overlays::new();
        overlays.register(OverlayKind::Point, "com", "com".into());
        overlays.register(OverlayKind::Trajectory, "com", "com".into());

        assert!(overlays.unregister(OverlayKind::Point, "com"));
        assert!(!overlays.contains(OverlayKind::Point, "com"));
        assert!(overlays.contains(OverlayKind::Trajectory, "com"));
        assert!(!overlays.is_empty());
    }

    #[test]
    fn test_arrows_at() {
        let force = DMatrix::from_fn(10, 6, |r, c| if c < 3 { r as f64 } else { 1.0 });
        let short = DMatrix::from_row_slice(1, 4, &[1.0, 2.0, 3.0, 4.0]);
        let log = log_with(vec![("l_foot_wrench", force), ("short", short)]);
        let mut overlays = Overlays::new();
        overlays.register(OverlayKind::Arrow, "l_foot", "l_foot_wrench".into());
        overlays.register(OverlayKind::Arrow, "short", "short".into());

        let arrows = overlays.arrows_at(&log, 2);
        assert_eq!(arrows.len(), 2);
        let (label, arrow) = &arrows[0];
        assert_eq!(label, "l_foot");
        assert_eq!(arrow.origin, Vector3::new(2.0, 2.0, 2.0));
        assert_eq!(arrow.tip(), Vector3::new(3.0, 3.0, 3.0));
        assert_eq!(arrows[1].1.vector, Vector3::new(4.0, 0.0, 0.0));
    }
}
