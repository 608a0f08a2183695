//! 3D robot playback using Rerun.io
//!
//! This module streams to a Rerun viewer:
//! - the robot model geometry (logged once, static)
//! - link transforms for every displayed cursor position
//! - point, trajectory and arrow overlays
//! - plotted curve values
//!
//! Enable with the `visualization` feature flag.

use crate::frame::FrameSnapshot;
use crate::robot_model::{LinkPose, LinkVisual, RobotModel, VisualGeometry};
use nalgebra::{Isometry3, Vector3};
use rerun::{RecordingStream, RecordingStreamBuilder};

/// Entity holding the robot links.
const ROBOT_ENTITY: &str = "world/robot";

fn position(v: &Vector3<f64>) -> [f32; 3] {
    [v.x as f32, v.y as f32, v.z as f32]
}

fn to_transform(pose: &Isometry3<f64>) -> rerun::Transform3D {
    let q = pose.rotation.quaternion();
    rerun::Transform3D::from_translation(position(&pose.translation.vector))
        .with_quaternion(rerun::Quaternion::from_xyzw([
            q.i as f32, q.j as f32, q.k as f32, q.w as f32,
        ]))
}

fn to_color(rgba: Option<[f32; 4]>) -> rerun::Color {
    let [r, g, b, a] = rgba.unwrap_or([0.7, 0.7, 0.7, 1.0]);
    let byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    rerun::Color::from_unmultiplied_rgba(byte(r), byte(g), byte(b), byte(a))
}

/// Rerun-based 3D view of a robot log
pub struct RerunVisualizer {
    rec: RecordingStream,
}

impl RerunVisualizer {
    /// Create a new visualizer that spawns the Rerun viewer
    pub fn new(app_id: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let rec = RecordingStreamBuilder::new(app_id).spawn()?;
        rec.log_static("world", &rerun::ViewCoordinates::RIGHT_HAND_Z_UP())?;
        Ok(Self { rec })
    }

    /// Create a visualizer that saves to a `.rrd` file
    pub fn new_to_file(app_id: &str, path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let rec = RecordingStreamBuilder::new(app_id).save(path)?;
        rec.log_static("world", &rerun::ViewCoordinates::RIGHT_HAND_Z_UP())?;
        Ok(Self { rec })
    }

    /// Log the model geometry once. Visuals hang below their link entity.
    ///
    /// A visual that fails to log (e.g. an unreadable mesh) is skipped.
    pub fn log_model(&self, model: &RobotModel) -> Result<(), Box<dyn std::error::Error>> {
        let mut skipped = 0;
        for (i, visual) in model.visuals().iter().enumerate() {
            let path = format!("{}/{}/visual_{}", ROBOT_ENTITY, visual.link, i);
            if let Err(e) = self.log_visual(&path, visual) {
                tracing::warn!("Skipping visual {} of link '{}': {}", i, visual.link, e);
                skipped += 1;
            }
        }

        self.rec.log_static(
            "logs/model",
            &rerun::TextLog::new(format!(
                "Loaded model '{}' ({} links, {} visuals skipped)",
                model.name,
                model.links().len(),
                skipped
            )),
        )?;

        Ok(())
    }

    fn log_visual(&self, path: &str, visual: &LinkVisual) -> Result<(), Box<dyn std::error::Error>> {
        let color = to_color(visual.color);
        match &visual.geometry {
            VisualGeometry::Box { size } => {
                self.rec.log_static(path, &rerun::Boxes3D::from_sizes([position(size)]).with_colors([color]))?;
            }
            VisualGeometry::Sphere { radius } => {
                let r = *radius as f32;
                self.rec.log_static(
                    path,
                    &rerun::Ellipsoids3D::from_half_sizes([[r, r, r]])
                        .with_colors([color])
                        .with_fill_mode(rerun::FillMode::Solid),
                )?;
            }
            VisualGeometry::Cylinder { radius, length } => {
                self.rec.log_static(
                    path,
                    &rerun::Cylinders3D::from_lengths_and_radii([*length as f32], [*radius as f32])
                        .with_colors([color]),
                )?;
            }
            VisualGeometry::Capsule { radius, length } => {
                // rerun capsules start at the origin, URDF capsules are centered
                self.rec.log_static(
                    path,
                    &rerun::Capsules3D::from_lengths_and_radii([*length as f32], [*radius as f32])
                        .with_translations([[0.0, 0.0, -(*length as f32) / 2.0]])
                        .with_colors([color]),
                )?;
            }
            VisualGeometry::Mesh { uri, path: file, scale } => {
                let Some(file) = file else {
                    tracing::debug!("Skipping unresolved mesh {}", uri);
                    return Ok(());
                };
                self.rec.log_static(path, &rerun::Asset3D::from_file_path(file)?)?;
                self.rec.log_static(path, &to_transform(&visual.origin).with_scale(position(scale)))?;
                return Ok(());
            }
        }
        self.rec.log_static(path, &to_transform(&visual.origin))?;
        Ok(())
    }

    /// Select the timeline position for the following logs
    pub fn set_frame(&self, index: usize, time: f64) {
        self.rec.set_time_sequence("cursor", index as i64);
        self.rec.set_duration_secs("log_time", time);
    }

    /// Log link transforms computed by forward kinematics
    pub fn log_link_poses(&self, poses: &[LinkPose]) -> Result<(), Box<dyn std::error::Error>> {
        for link in poses {
            self.rec.log(
                format!("{}/{}", ROBOT_ENTITY, link.link),
                &to_transform(&link.pose),
            )?;
        }
        Ok(())
    }

    /// Log overlays and curve values of a captured frame
    pub fn log_frame(&self, frame: &FrameSnapshot) -> Result<(), Box<dyn std::error::Error>> {
        for (label, point) in &frame.points {
            self.rec.log(
                format!("world/points/{}", label),
                &rerun::Points3D::new([position(point)])
                    .with_colors([rerun::Color::from_rgb(255, 100, 100)])
                    .with_radii([0.02])
                    .with_labels([label.as_str()]),
            )?;
        }

        for (label, points) in &frame.trajectories {
            let strip: Vec<[f32; 3]> = points.iter().map(position).collect();
            self.rec.log(
                format!("world/trajectories/{}", label),
                &rerun::LineStrips3D::new([strip]).with_colors([rerun::Color::from_rgb(0, 212, 255)]),
            )?;
        }

        for (label, arrow) in &frame.arrows {
            self.rec.log(
                format!("world/arrows/{}", label),
                &rerun::Arrows3D::from_vectors([position(&arrow.vector)])
                    .with_origins([position(&arrow.origin)])
                    .with_colors([rerun::Color::from_rgb(255, 200, 0)])
                    .with_labels([label.as_str()]),
            )?;
        }

        for value in &frame.values {
            if let Some(v) = value.value {
                self.rec.log(format!("curves/{}", value.key), &rerun::Scalars::new([v]))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_locator::ModelLocator;
    use robolog_env::ManualContext;

    const MESH_URDF: &str = r#"<robot name="meshy">
  <link name="base">
    <visual><geometry><mesh filename="package://meshy/body.stl"/></geometry></visual>
    <visual><geometry><box size="0.1 0.1 0.1"/></geometry></visual>
  </link>
</robot>"#;

    #[test]
    fn test_missing_mesh_does_not_abort_model() {
        let dir = tempfile::tempdir().unwrap();
        let mesh = dir.path().join("meshy/body.stl");
        std::fs::create_dir_all(mesh.parent().unwrap()).unwrap();
        std::fs::write(&mesh, b"solid body").unwrap();

        let ctx = ManualContext::new();
        let mut model = RobotModel::from_urdf_str(MESH_URDF, &[]).unwrap();
        model.resolve_meshes(&ModelLocator::new(&ctx).with_package_dir(Some(dir.path().to_path_buf())));
        assert!(matches!(&model.visuals()[0].geometry, VisualGeometry::Mesh { path: Some(_), .. }));

        // the mesh disappears between lookup and logging
        std::fs::remove_file(&mesh).unwrap();

        let (rec, _storage) = RecordingStreamBuilder::new("robolog_test").memory().unwrap();
        let viz = RerunVisualizer { rec };
        assert!(viz.log_model(&model).is_ok());
    }

    #[test]
    fn test_log_frame_with_arrows() {
        use crate::robot_state::{Arrow, RobotState};
        use nalgebra::{DVector, UnitQuaternion};

        let frame = FrameSnapshot {
            index: 0,
            time: 0.0,
            fraction: 0.0,
            robot: RobotState {
                joint_positions: DVector::zeros(0),
                base_position: Vector3::zeros(),
                base_orientation: UnitQuaternion::identity(),
            },
            points: vec![("com".into(), Vector3::new(0.0, 0.0, 0.5))],
            trajectories: vec![],
            arrows: vec![(
                "l_foot".into(),
                Arrow {
                    origin: Vector3::zeros(),
                    vector: Vector3::new(0.0, 0.0, 300.0),
                },
            )],
            values: vec![],
        };

        let (rec, _storage) = RecordingStreamBuilder::new("robolog_test").memory().unwrap();
        let viz = RerunVisualizer { rec };
        assert!(viz.log_frame(&frame).is_ok());
    }
}
