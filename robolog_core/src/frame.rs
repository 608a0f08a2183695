//! Per-redraw view model.
//!
//! A [`FrameSnapshot`] is captured once per redraw from the cursor and every
//! view draws from it, so all views agree on the displayed sample.

use crate::cursor::Cursor;
use crate::log_file::RobotLog;
use crate::robot_state::{Arrow, Overlays, RobotState, RobotStatePaths};
use crate::signals::CurveKey;
use nalgebra::Vector3;

/// Value of a plotted curve at the cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveValue {
    pub key: CurveKey,
    /// `path/element` using element names when available
    pub label: String,
    /// `None` when the curve's signal is not in the log
    pub value: Option<f64>,
}

impl CurveValue {
    pub fn at(log: &RobotLog, key: &CurveKey, index: usize) -> Self {
        let signal = log.signal(&key.path);
        let label = match signal {
            Some(signal) => format!("{}/{}", key.path, signal.column_label(key.column)),
            None => key.to_string(),
        };
        let value = signal.and_then(|signal| {
            let sample = signal.closest_index(log.axis.absolute_at(index));
            signal.value(sample, key.column)
        });
        Self {
            key: key.clone(),
            label,
            value,
        }
    }
}

/// Everything the views show for one cursor position.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    pub index: usize,
    /// Seconds since the start of the log
    pub time: f64,
    /// Cursor position in `[0, 1]`
    pub fraction: f64,
    pub robot: RobotState,
    pub points: Vec<(String, Vector3<f64>)>,
    pub trajectories: Vec<(String, Vec<Vector3<f64>>)>,
    pub arrows: Vec<(String, Arrow)>,
    pub values: Vec<CurveValue>,
}

impl FrameSnapshot {
    pub fn capture(
        log: &RobotLog,
        cursor: &Cursor,
        paths: &RobotStatePaths,
        overlays: &Overlays,
        curves: &[CurveKey],
    ) -> Self {
        let index = cursor.index();
        Self {
            index,
            time: cursor.current_time(&log.axis),
            fraction: cursor.fraction(),
            robot: RobotState::at(log, paths, index),
            points: overlays.points_at(log, index),
            trajectories: overlays.trajectories_at(log, index),
            arrows: overlays.arrows_at(log, index),
            values: curves.iter().map(|key| CurveValue::at(log, key, index)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot_state::OverlayKind;
    use crate::signals::{Signal, SignalTree};
    use nalgebra::DMatrix;
    use proptest::prelude::*;

    fn walking_log() -> RobotLog {
        let mut tree = SignalTree::new();
        let ts: Vec<f64> = (0..300).map(|i| 2.0 + i as f64 * 0.01).collect();
        tree.insert(
            &"joints_state/positions".into(),
            Signal::new(DMatrix::from_fn(300, 4, |r, c| (r as f64 * 0.01).sin() + c as f64), ts.clone())
                .unwrap()
                .with_elements_names(vec!["hip".into(), "knee".into(), "ankle".into(), "torso".into()]),
        );
        let slow: Vec<f64> = (0..30).map(|i| 2.0 + i as f64 * 0.1).collect();
        tree.insert(
            &"base/position".into(),
            Signal::new(DMatrix::from_fn(30, 3, |r, c| (r * 3 + c) as f64), slow).unwrap(),
        );
        RobotLog::from_tree("root", tree, vec![], None).unwrap()
    }

    #[test]
    fn test_capture_values() {
        let log = walking_log();
        let mut cursor = Cursor::new(log.len());
        cursor.set_index(100);

        let mut overlays = Overlays::new();
        overlays.register(OverlayKind::Point, "base", "base/position".into());
        overlays.register(OverlayKind::Arrow, "base", "base/position".into());
        let curves = vec![
            CurveKey::new("joints_state/positions", 1),
            CurveKey::new("base/position", 2),
            CurveKey::new("gone", 0),
        ];
        let frame = FrameSnapshot::capture(&log, &cursor, &RobotStatePaths::default(), &overlays, &curves);

        assert_eq!(frame.index, 100);
        assert!((frame.time - 1.0).abs() < 1e-9);
        assert_eq!(frame.robot.joint_positions.len(), 4);
        assert_eq!(frame.values[0].label, "joints_state/positions/knee");
        assert_eq!(frame.values[1].value, Some(32.0));
        assert_eq!(frame.values[2].value, None);
        assert_eq!(frame.points[0].1, Vector3::new(30.0, 31.0, 32.0));
        assert_eq!(frame.arrows[0].1.origin, Vector3::new(30.0, 31.0, 32.0));
        assert_eq!(frame.arrows[0].1.vector, Vector3::zeros());
    }

    proptest! {
        #[test]
        fn test_capture_is_deterministic(index in 0usize..400) {
            let log = walking_log();
            let mut cursor = Cursor::new(log.len());
            cursor.set_index(index);
            let mut overlays = Overlays::new();
            overlays.register(OverlayKind::Trajectory, "base", "base/position".into());
            let curves = log.signals.curve_keys();
            let paths = RobotStatePaths::default();

            let first = FrameSnapshot::capture(&log, &cursor, &paths, &overlays, &curves);
            let second = FrameSnapshot::capture(&log, &cursor, &paths, &overlays, &curves);
            prop_assert_eq!(first, second);
        }
    }
}
