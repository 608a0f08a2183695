//! Robot description lookup through environment search paths.

use crate::error::ModelError;
use crate::robot_model::RobotModel;
use robolog_env::{SearchPath, ViewerContext};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Robot loaded when the log does not name one, or names an unknown one.
pub const DEFAULT_FALLBACK_ROBOT: &str = "iCubGenova09";

const MODEL_FILE: &str = "model.urdf";

/// Finds URDF files and the meshes they reference.
pub struct ModelLocator<'a> {
    ctx: &'a dyn ViewerContext,
    override_path: Option<PathBuf>,
    package_dir: Option<PathBuf>,
    fallback: String,
}

impl<'a> ModelLocator<'a> {
    pub fn new(ctx: &'a dyn ViewerContext) -> Self {
        Self {
            ctx,
            override_path: None,
            package_dir: None,
            fallback: DEFAULT_FALLBACK_ROBOT.to_string(),
        }
    }

    /// Uses `path` instead of searching.
    pub fn with_override(mut self, path: Option<PathBuf>) -> Self {
        self.override_path = path;
        self
    }

    /// Searches `dir` first when resolving `package://` URIs.
    pub fn with_package_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.package_dir = dir;
        self
    }

    pub fn with_fallback(mut self, name: impl Into<String>) -> Self {
        self.fallback = name.into();
        self
    }

    /// Every location tried for robot `name`, in search order.
    pub fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let robot_dir = Path::new("robots").join(name).join(MODEL_FILE);
        let mut candidates = Vec::new();

        if let Some(prefix) = self.ctx.var("ROBOTOLOGY_SUPERBUILD_INSTALL_PREFIX") {
            candidates.push(Path::new(&prefix).join("share/iCub").join(&robot_dir));
        }
        for dir in SearchPath::from_var(self.ctx, "YARP_DATA_DIRS").iter() {
            candidates.push(dir.join(&robot_dir));
        }
        for dir in SearchPath::from_var(self.ctx, "AMENT_PREFIX_PATH").iter() {
            candidates.push(dir.join("share/iCub").join(&robot_dir));
        }

        candidates
    }

    /// Finds the URDF for `robot_name`, falling back to the default robot.
    pub fn locate(&self, robot_name: Option<&str>) -> Result<PathBuf, ModelError> {
        if let Some(path) = &self.override_path {
            if path.is_file() {
                return Ok(path.clone());
            }
            return Err(ModelError::NotFound {
                name: path.display().to_string(),
                searched: vec![path.clone()],
            });
        }

        let mut names = Vec::with_capacity(2);
        if let Some(name) = robot_name.filter(|n| !n.is_empty()) {
            names.push(name);
        }
        if !names.contains(&self.fallback.as_str()) {
            names.push(self.fallback.as_str());
        }

        let mut searched = Vec::new();
        for name in &names {
            for candidate in self.candidates(name) {
                debug!("Looking for model at {}", candidate.display());
                if candidate.is_file() {
                    if Some(*name) != robot_name {
                        warn!(
                            "Model for '{}' not found, using '{}'",
                            robot_name.unwrap_or("<unnamed>"),
                            name
                        );
                    }
                    info!("Using model {}", candidate.display());
                    return Ok(candidate);
                }
                searched.push(candidate);
            }
        }

        Err(ModelError::NotFound {
            name: names.first().copied().unwrap_or(DEFAULT_FALLBACK_ROBOT).to_string(),
            searched,
        })
    }

    /// Directories holding ROS packages, in search order.
    pub fn package_dirs(&self) -> SearchPath {
        let mut dirs = SearchPath::new();
        if let Some(dir) = &self.package_dir {
            dirs.push(dir.clone());
        }
        dirs.extend(SearchPath::from_var(self.ctx, "ROS_PACKAGE_PATH"));
        dirs.extend(SearchPath::from_var(self.ctx, "AMENT_PREFIX_PATH").joined("share"));
        dirs.extend(SearchPath::from_var(self.ctx, "GAZEBO_MODEL_PATH"));
        dirs
    }

    /// Resolves a mesh URI to an existing file.
    ///
    /// `package://pkg/rest` is looked up as `<dir>/pkg/rest` in every package
    /// directory; the custom package directory may also be the package itself.
    /// `file://` is stripped and relative paths are taken from `base_dir`.
    pub fn resolve_mesh(&self, uri: &str, base_dir: Option<&Path>) -> Option<PathBuf> {
        if let Some(rest) = uri.strip_prefix("package://") {
            if let Some(found) = self.package_dirs().find(rest) {
                return Some(found);
            }
            let (_, inner) = rest.split_once('/')?;
            let own = self.package_dir.as_ref()?.join(inner);
            return own.is_file().then_some(own);
        }

        let path = Path::new(uri.strip_prefix("file://").unwrap_or(uri));
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir?.join(path)
        };
        path.is_file().then_some(path)
    }

    /// Locates, parses and resolves the meshes of a robot model.
    pub fn load(&self, robot_name: Option<&str>, considered_joints: &[String]) -> Result<RobotModel, ModelError> {
        let path = self.locate(robot_name)?;
        let mut model = RobotModel::from_urdf_file(&path, considered_joints)?;
        model.resolve_meshes(self);
        Ok(model)
    }
}
