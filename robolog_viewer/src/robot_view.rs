//! 3D robot view bridge.
//!
//! Forwards the robot model, link poses and overlays of each captured frame to
//! a Rerun recording. The 3D view is optional and only available with the
//! `visualization` feature; without it, or when the viewer can not be
//! spawned, every call is a no-op.

use robolog_core::{FrameSnapshot, RobotModel};
use std::path::Path;

#[cfg(feature = "visualization")]
use robolog_core::visualization::RerunVisualizer;

#[cfg(feature = "visualization")]
const APP_ID: &str = "robolog_viewer";

/// Rerun bridge for the 3D view.
pub struct RobotView {
    #[cfg(feature = "visualization")]
    viz: Option<RerunVisualizer>,

    /// Whether a recording is open
    enabled: bool,

    /// Index of the last frame sent
    last_index: Option<usize>,
}

impl RobotView {
    /// Creates a view that ignores every call.
    pub fn disabled() -> Self {
        Self {
            #[cfg(feature = "visualization")]
            viz: None,
            enabled: false,
            last_index: None,
        }
    }

    /// Spawns a Rerun viewer, or records to `save_path` when given.
    #[cfg(feature = "visualization")]
    pub fn new(save_path: Option<&Path>) -> Self {
        let result = match save_path {
            Some(path) => RerunVisualizer::new_to_file(APP_ID, &path.to_string_lossy()),
            None => RerunVisualizer::new(APP_ID),
        };
        match result {
            Ok(viz) => {
                tracing::info!("3D view enabled");
                Self {
                    viz: Some(viz),
                    enabled: true,
                    last_index: None,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to initialize the 3D view: {}", e);
                Self::disabled()
            }
        }
    }

    /// Returns a disabled view when the `visualization` feature is off.
    #[cfg(not(feature = "visualization"))]
    pub fn new(_save_path: Option<&Path>) -> Self {
        tracing::info!("3D view not available (compile with --features visualization)");
        Self::disabled()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Sends the model geometry. Call once per loaded model.
    #[cfg(feature = "visualization")]
    pub fn load_model(&mut self, model: &RobotModel) {
        self.last_index = None;
        if let Some(viz) = &self.viz {
            if let Err(e) = viz.log_model(model) {
                tracing::warn!("Failed to send model '{}' to the 3D view: {}", model.name, e);
            }
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn load_model(&mut self, _model: &RobotModel) {
        self.last_index = None;
    }

    /// Sends one frame. Frames for the index already shown are skipped.
    #[cfg(feature = "visualization")]
    pub fn show(&mut self, frame: &FrameSnapshot, model: Option<&RobotModel>) {
        if self.last_index == Some(frame.index) {
            return;
        }
        self.last_index = Some(frame.index);

        let Some(viz) = &self.viz else {
            return;
        };
        viz.set_frame(frame.index, frame.time);
        if let Some(model) = model {
            let poses = model.link_poses(&frame.robot.base_pose(), frame.robot.joint_positions.as_slice());
            if let Err(e) = viz.log_link_poses(&poses) {
                tracing::debug!("Failed to send link poses: {}", e);
            }
        }
        if let Err(e) = viz.log_frame(frame) {
            tracing::debug!("Failed to send overlays: {}", e);
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn show(&mut self, frame: &FrameSnapshot, _model: Option<&RobotModel>) {
        self.last_index = Some(frame.index);
    }

    /// Forces the next frame to be sent even if its index did not change.
    pub fn invalidate(&mut self) {
        self.last_index = None;
    }

    /// Index of the last frame sent.
    pub fn last_index(&self) -> Option<usize> {
        self.last_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use robolog_core::{Cursor, Overlays, RobotLog, RobotStatePaths, Signal, SignalTree};

    #[test]
    fn test_disabled_view() {
        let mut tree = SignalTree::new();
        tree.insert(&"a".into(), Signal::from_scalars(&[1.0, 2.0], vec![0.0, 1.0]).unwrap());
        let log = RobotLog::from_tree("root", tree, vec![], None).unwrap();
        let frame = robolog_core::FrameSnapshot::capture(
            &log,
            &Cursor::new(log.len()),
            &RobotStatePaths::default(),
            &Overlays::new(),
            &[],
        );

        let mut view = RobotView::disabled();
        assert!(!view.is_enabled());

        // These should be no-ops
        view.show(&frame, None);
        assert_eq!(view.last_index(), Some(0));
    }
}
