//! URDF robot model and forward kinematics.
//!
//! The model is parsed with `urdf-rs` into a kinematic tree rooted at the
//! one link that is never a joint child. Joints are kept in breadth-first
//! order so link poses can be computed in a single pass.
//!
//! The logged joints ("considered joints") are matched to movable URDF
//! joints by name. Logged joints missing from the model are reported once at
//! load time; model joints that are not logged stay at zero.

use crate::error::ModelError;
use crate::model_locator::ModelLocator;
use nalgebra::{Isometry3, Translation3, Unit, UnitQuaternion, Vector3};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// How a joint moves its child link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointKind {
    /// Rotates about the axis (revolute and continuous joints)
    Revolute,
    /// Translates along the axis
    Prismatic,
    /// Keeps its origin (fixed, floating, planar joints)
    Fixed,
}

#[derive(Debug, Clone)]
struct ModelJoint {
    name: String,
    kind: JointKind,
    origin: Isometry3<f64>,
    axis: Unit<Vector3<f64>>,
    parent: String,
    child: String,
    /// Column of the logged joint positions driving this joint
    log_index: Option<usize>,
}

impl ModelJoint {
    fn motion(&self, q: f64) -> Isometry3<f64> {
        match self.kind {
            JointKind::Revolute => Isometry3::rotation(self.axis.into_inner() * q),
            JointKind::Prismatic => Isometry3::translation(
                self.axis.x * q,
                self.axis.y * q,
                self.axis.z * q,
            ),
            JointKind::Fixed => Isometry3::identity(),
        }
    }
}

/// World pose of one link.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkPose {
    pub link: String,
    pub pose: Isometry3<f64>,
}

/// Shape of a visual element.
#[derive(Debug, Clone, PartialEq)]
pub enum VisualGeometry {
    Box { size: Vector3<f64> },
    Sphere { radius: f64 },
    Cylinder { radius: f64, length: f64 },
    Capsule { radius: f64, length: f64 },
    Mesh {
        /// URI as written in the URDF
        uri: String,
        /// Resolved file, if found
        path: Option<PathBuf>,
        scale: Vector3<f64>,
    },
}

/// One visual element attached to a link.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkVisual {
    pub link: String,
    /// Pose relative to the link frame
    pub origin: Isometry3<f64>,
    pub geometry: VisualGeometry,
    /// RGBA in `[0, 1]`
    pub color: Option<[f32; 4]>,
}

/// A robot description ready for rendering.
#[derive(Debug, Clone)]
pub struct RobotModel {
    pub name: String,
    /// URDF file the model was read from
    pub source: Option<PathBuf>,
    root: String,
    /// Breadth-first from the root
    joints: Vec<ModelJoint>,
    visuals: Vec<LinkVisual>,
    /// Considered joints with no movable counterpart in the model
    missing_joints: Vec<String>,
}

fn to_isometry(pose: &urdf_rs::Pose) -> Isometry3<f64> {
    let [x, y, z] = pose.xyz.0;
    let [roll, pitch, yaw] = pose.rpy.0;
    Isometry3::from_parts(
        Translation3::new(x, y, z),
        UnitQuaternion::from_euler_angles(roll, pitch, yaw),
    )
}

fn to_geometry(geometry: &urdf_rs::Geometry) -> VisualGeometry {
    match geometry {
        urdf_rs::Geometry::Box { size } => VisualGeometry::Box {
            size: Vector3::from(size.0),
        },
        urdf_rs::Geometry::Sphere { radius } => VisualGeometry::Sphere { radius: *radius },
        urdf_rs::Geometry::Cylinder { radius, length } => VisualGeometry::Cylinder {
            radius: *radius,
            length: *length,
        },
        urdf_rs::Geometry::Capsule { radius, length } => VisualGeometry::Capsule {
            radius: *radius,
            length: *length,
        },
        urdf_rs::Geometry::Mesh { filename, scale } => VisualGeometry::Mesh {
            uri: filename.clone(),
            path: None,
            scale: scale.as_ref().map(|s| Vector3::from(s.0)).unwrap_or_else(|| Vector3::repeat(1.0)),
        },
    }
}

fn rgba(color: &urdf_rs::Color) -> [f32; 4] {
    color.rgba.0.map(|c| c as f32)
}

impl RobotModel {
    /// Parses a URDF file.
    pub fn from_urdf_file(path: impl AsRef<Path>, considered_joints: &[String]) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let robot = urdf_rs::read_file(path).map_err(|e| ModelError::Urdf {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let mut model = Self::from_robot(robot, considered_joints)?;
        model.source = Some(path.to_path_buf());
        Ok(model)
    }

    /// Parses URDF text.
    pub fn from_urdf_str(urdf: &str, considered_joints: &[String]) -> Result<Self, ModelError> {
        let robot = urdf_rs::read_from_string(urdf).map_err(|e| ModelError::Urdf {
            path: PathBuf::from("<string>"),
            reason: e.to_string(),
        })?;
        Self::from_robot(robot, considered_joints)
    }

    fn from_robot(robot: urdf_rs::Robot, considered_joints: &[String]) -> Result<Self, ModelError> {
        let children: HashSet<&str> = robot.joints.iter().map(|j| j.child.link.as_str()).collect();
        let root = robot
            .links
            .iter()
            .find(|link| !children.contains(link.name.as_str()))
            .map(|link| link.name.clone())
            .ok_or_else(|| ModelError::Tree(format!("robot '{}' has no root link", robot.name)))?;

        // breadth-first over the joint tree
        let mut by_parent: HashMap<&str, Vec<&urdf_rs::Joint>> = HashMap::new();
        for joint in &robot.joints {
            by_parent.entry(joint.parent.link.as_str()).or_default().push(joint);
        }
        let mut joints = Vec::with_capacity(robot.joints.len());
        let mut queue = VecDeque::from([root.as_str()]);
        let mut visited = HashSet::from([root.as_str()]);
        while let Some(link) = queue.pop_front() {
            for joint in by_parent.get(link).into_iter().flatten() {
                if !visited.insert(joint.child.link.as_str()) {
                    warn!("Joint '{}' closes a kinematic loop, ignored", joint.name);
                    continue;
                }
                queue.push_back(joint.child.link.as_str());

                let kind = match joint.joint_type {
                    urdf_rs::JointType::Revolute | urdf_rs::JointType::Continuous => JointKind::Revolute,
                    urdf_rs::JointType::Prismatic => JointKind::Prismatic,
                    _ => JointKind::Fixed,
                };
                let axis = Unit::try_new(Vector3::from(joint.axis.xyz.0), 1e-9)
                    .unwrap_or_else(Vector3::x_axis);

                joints.push(ModelJoint {
                    name: joint.name.clone(),
                    kind,
                    origin: to_isometry(&joint.origin),
                    axis,
                    parent: joint.parent.link.clone(),
                    child: joint.child.link.clone(),
                    log_index: None,
                });
            }
        }
        if joints.len() < robot.joints.len() {
            debug!(
                "{} joints of '{}' are not connected to root '{}'",
                robot.joints.len() - joints.len(),
                robot.name,
                root
            );
        }

        let materials: HashMap<&str, [f32; 4]> = robot
            .materials
            .iter()
            .filter_map(|m| m.color.as_ref().map(|c| (m.name.as_str(), rgba(c))))
            .collect();

        let visuals = robot
            .links
            .iter()
            .flat_map(|link| {
                let materials = &materials;
                link.visual.iter().map(move |visual| {
                    let color = visual.material.as_ref().and_then(|m| {
                        m.color
                            .as_ref()
                            .map(rgba)
                            .or_else(|| materials.get(m.name.as_str()).copied())
                    });
                    LinkVisual {
                        link: link.name.clone(),
                        origin: to_isometry(&visual.origin),
                        geometry: to_geometry(&visual.geometry),
                        color,
                    }
                })
            })
            .collect();

        let mut model = Self {
            name: robot.name,
            source: None,
            root,
            joints,
            visuals,
            missing_joints: Vec::new(),
        };
        model.set_considered_joints(considered_joints);
        Ok(model)
    }

    /// Maps logged joint names onto the model's movable joints.
    pub fn set_considered_joints(&mut self, considered_joints: &[String]) {
        let by_name: BTreeMap<&str, usize> = considered_joints
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        let mut matched = HashSet::new();
        for joint in &mut self.joints {
            joint.log_index = match joint.kind {
                JointKind::Fixed => None,
                _ => by_name.get(joint.name.as_str()).copied(),
            };
            if joint.log_index.is_some() {
                matched.insert(joint.name.clone());
            }
        }

        self.missing_joints = considered_joints
            .iter()
            .filter(|name| !matched.contains(*name))
            .cloned()
            .collect();
        if !self.missing_joints.is_empty() {
            warn!(
                "Joints not found in model '{}': {}",
                self.name,
                self.missing_joints.join(", ")
            );
        }
    }

    pub fn root_link(&self) -> &str {
        &self.root
    }

    pub fn visuals(&self) -> &[LinkVisual] {
        &self.visuals
    }

    pub fn missing_joints(&self) -> &[String] {
        &self.missing_joints
    }

    /// Names of the movable joints driven by the log.
    pub fn driven_joints(&self) -> impl Iterator<Item = &str> {
        self.joints
            .iter()
            .filter(|j| j.log_index.is_some())
            .map(|j| j.name.as_str())
    }

    /// Every link in kinematic order, root first.
    pub fn links(&self) -> Vec<&str> {
        std::iter::once(self.root.as_str())
            .chain(self.joints.iter().map(|j| j.child.as_str()))
            .collect()
    }

    /// Forward kinematics. `joint_positions` is indexed like the considered joints;
    /// a short vector leaves the remaining joints at zero.
    pub fn link_poses(&self, base: &Isometry3<f64>, joint_positions: &[f64]) -> Vec<LinkPose> {
        let mut world: HashMap<&str, Isometry3<f64>> = HashMap::with_capacity(self.joints.len() + 1);
        world.insert(self.root.as_str(), *base);

        let mut poses = Vec::with_capacity(self.joints.len() + 1);
        poses.push(LinkPose {
            link: self.root.clone(),
            pose: *base,
        });

        for joint in &self.joints {
            let Some(parent) = world.get(joint.parent.as_str()).copied() else {
                continue;
            };
            let q = joint
                .log_index
                .and_then(|i| joint_positions.get(i))
                .copied()
                .unwrap_or(0.0);
            let pose = parent * joint.origin * joint.motion(q);
            world.insert(joint.child.as_str(), pose);
            poses.push(LinkPose {
                link: joint.child.clone(),
                pose,
            });
        }

        poses
    }

    /// Resolves mesh URIs to files on disk.
    pub fn resolve_meshes(&mut self, locator: &ModelLocator<'_>) {
        let base_dir = self.source.as_ref().and_then(|p| p.parent()).map(Path::to_path_buf);
        let mut unresolved = 0;
        for visual in &mut self.visuals {
            if let VisualGeometry::Mesh { uri, path, .. } = &mut visual.geometry {
                *path = locator.resolve_mesh(uri, base_dir.as_deref());
                if path.is_none() {
                    unresolved += 1;
                }
            }
        }
        if unresolved > 0 {
            warn!("{} meshes of '{}' could not be found", unresolved, self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    const TWO_LINK_URDF: &str = r#"<?xml version="1.0"?>
<robot name="two_link">
  <material name="blue"><color rgba="0 0 1 1"/></material>
  <link name="base_link">
    <visual>
      <geometry><box size="0.2 0.2 0.1"/></geometry>
      <material name="blue"/>
    </visual>
  </link>
  <link name="upper">
    <visual>
      <origin xyz="0.25 0 0" rpy="0 0 0"/>
      <geometry><cylinder radius="0.05" length="0.5"/></geometry>
    </visual>
  </link>
  <link name="slider">
    <visual>
      <geometry><mesh filename="package://two_link/meshes/slider.stl" scale="0.001 0.001 0.001"/></geometry>
    </visual>
  </link>
  <link name="tool">
    <visual><geometry><sphere radius="0.02"/></geometry></visual>
  </link>
  <joint name="shoulder" type="revolute">
    <parent link="base_link"/>
    <child link="upper"/>
    <origin xyz="1 0 0" rpy="0 0 0"/>
    <axis xyz="0 0 1"/>
    <limit lower="-3" upper="3" effort="10" velocity="1"/>
  </joint>
  <joint name="extend" type="prismatic">
    <parent link="upper"/>
    <child link="slider"/>
    <origin xyz="0.5 0 0" rpy="0 0 0"/>
    <axis xyz="1 0 0"/>
    <limit lower="0" upper="1" effort="10" velocity="1"/>
  </joint>
  <joint name="tool_mount" type="fixed">
    <parent link="slider"/>
    <child link="tool"/>
    <origin xyz="0 0 0.1" rpy="0 0 0"/>
  </joint>
</robot>
"#;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_tree() {
        let model = RobotModel::from_urdf_str(TWO_LINK_URDF, &[]).unwrap();
        assert_eq!(model.name, "two_link");
        assert_eq!(model.root_link(), "base_link");
        assert_eq!(model.links(), vec!["base_link", "upper", "slider", "tool"]);
        assert_eq!(model.visuals().len(), 4);
        assert_eq!(model.visuals()[0].color, Some([0.0, 0.0, 1.0, 1.0]));
        assert!(matches!(
            &model.visuals()[2].geometry,
            VisualGeometry::Mesh { uri, path: None, scale } if uri.starts_with("package://") && scale.x == 0.001
        ));
    }

    #[test]
    fn test_considered_joints() {
        let model = RobotModel::from_urdf_str(
            TWO_LINK_URDF,
            &names(&["extend", "ghost_joint", "shoulder", "tool_mount"]),
        )
        .unwrap();
        let driven: Vec<&str> = model.driven_joints().collect();
        assert_eq!(driven, vec!["shoulder", "extend"]);
        // fixed joints can not be driven
        assert_eq!(model.missing_joints(), &names(&["ghost_joint", "tool_mount"])[..]);
    }

    #[test]
    fn test_forward_kinematics() {
        let model = RobotModel::from_urdf_str(TWO_LINK_URDF, &names(&["shoulder", "extend"])).unwrap();
        let poses = model.link_poses(&Isometry3::identity(), &[FRAC_PI_2, 0.3]);

        let by_link: HashMap<&str, &Isometry3<f64>> =
            poses.iter().map(|p| (p.link.as_str(), &p.pose)).collect();

        assert_relative_eq!(by_link["upper"].translation.vector, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-9);
        // rotated 90 degrees: the slider moves along world y
        assert_relative_eq!(by_link["slider"].translation.vector, Vector3::new(1.0, 0.8, 0.0), epsilon = 1e-9);
        assert_relative_eq!(by_link["tool"].translation.vector, Vector3::new(1.0, 0.8, 0.1), epsilon = 1e-9);
    }

    #[test]
    fn test_unlogged_joints_stay_at_zero() {
        let model = RobotModel::from_urdf_str(TWO_LINK_URDF, &names(&["extend"])).unwrap();
        let base = Isometry3::translation(0.0, 0.0, 1.0);
        let poses = model.link_poses(&base, &[0.2]);

        assert_eq!(poses[0].pose, base);
        assert_relative_eq!(poses[2].pose.translation.vector, Vector3::new(1.7, 0.0, 1.0), epsilon = 1e-9);

        // no positions at all
        let poses = model.link_poses(&Isometry3::identity(), &[]);
        assert_relative_eq!(poses[2].pose.translation.vector, Vector3::new(1.5, 0.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_urdf() {
        let err = RobotModel::from_urdf_str("<robot", &[]).unwrap_err();
        assert!(matches!(err, ModelError::Urdf { .. }));
    }

    #[test]
    fn test_from_file_and_relative_mesh() {
        let dir = tempfile::tempdir().unwrap();
        let urdf = TWO_LINK_URDF.replace("package://two_link/meshes/slider.stl", "meshes/slider.stl");
        std::fs::create_dir(dir.path().join("meshes")).unwrap();
        std::fs::write(dir.path().join("meshes/slider.stl"), b"solid").unwrap();
        let path = dir.path().join("model.urdf");
        std::fs::write(&path, urdf).unwrap();

        let mut model = RobotModel::from_urdf_file(&path, &[]).unwrap();
        let ctx = robolog_env::ManualContext::new();
        model.resolve_meshes(&ModelLocator::new(&ctx));

        assert!(matches!(
            &model.visuals()[2].geometry,
            VisualGeometry::Mesh { path: Some(p), .. } if p.ends_with("meshes/slider.stl")
        ));
    }
}
