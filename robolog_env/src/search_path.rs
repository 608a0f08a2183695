//! Directory lists read from path-style environment variables.

use crate::ViewerContext;
use std::path::{Path, PathBuf};

/// Ordered, de-duplicated list of directories.
///
/// Built from variables such as `YARP_DATA_DIRS` or `ROS_PACKAGE_PATH`,
/// using the platform separator (`:` on unix, `;` on windows).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    /// Creates an empty search path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads and splits a variable. Unset variables give an empty path.
    pub fn from_var<Ctx: ViewerContext + ?Sized>(ctx: &Ctx, name: &str) -> Self {
        let mut path = Self::new();
        if let Some(value) = ctx.var(name) {
            for dir in std::env::split_paths(&value) {
                path.push(dir);
            }
        }
        path
    }

    /// Appends a directory unless it is empty or already present.
    pub fn push(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if dir.as_os_str().is_empty() || self.dirs.contains(&dir) {
            return;
        }
        self.dirs.push(dir);
    }

    /// Appends every directory of another path.
    pub fn extend(&mut self, other: SearchPath) {
        for dir in other.dirs {
            self.push(dir);
        }
    }

    /// Returns a new path with `suffix` joined onto every entry.
    pub fn joined(&self, suffix: impl AsRef<Path>) -> Self {
        let mut out = Self::new();
        for dir in &self.dirs {
            out.push(dir.join(suffix.as_ref()));
        }
        out
    }

    /// Returns the first `<dir>/<relative>` that exists on disk.
    pub fn find(&self, relative: impl AsRef<Path>) -> Option<PathBuf> {
        self.dirs
            .iter()
            .map(|dir| dir.join(relative.as_ref()))
            .find(|candidate| candidate.exists())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.dirs.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::ManualContext;

    #[test]
    fn test_split_and_dedup() {
        let ctx = ManualContext::new().with_var("YARP_DATA_DIRS", "/opt/a::/opt/b:/opt/a");
        let path = SearchPath::from_var(&ctx, "YARP_DATA_DIRS");

        let dirs: Vec<_> = path.iter().collect();
        assert_eq!(dirs, vec![Path::new("/opt/a"), Path::new("/opt/b")]);
    }

    #[test]
    fn test_unset_is_empty() {
        let ctx = ManualContext::new();
        assert!(SearchPath::from_var(&ctx, "ROS_PACKAGE_PATH").is_empty());
    }

    #[test]
    fn test_find_first_existing() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(second.path().join("robots/ergoCub")).unwrap();
        std::fs::write(second.path().join("robots/ergoCub/model.urdf"), "<robot/>").unwrap();

        let value = format!("{}:{}", first.path().display(), second.path().display());
        let ctx = ManualContext::new().with_var("YARP_DATA_DIRS", value);
        let path = SearchPath::from_var(&ctx, "YARP_DATA_DIRS");

        assert_eq!(
            path.find("robots/ergoCub/model.urdf"),
            Some(second.path().join("robots/ergoCub/model.urdf"))
        );
        assert_eq!(path.find("robots/iCubGenova09/model.urdf"), None);
    }

    #[test]
    fn test_joined() {
        let ctx = ManualContext::new().with_var("AMENT_PREFIX_PATH", "/opt/ros/humble");
        let share = SearchPath::from_var(&ctx, "AMENT_PREFIX_PATH").joined("share");
        assert_eq!(share.iter().next(), Some(Path::new("/opt/ros/humble/share")));
    }
}
