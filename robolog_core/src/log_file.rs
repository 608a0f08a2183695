//! Robot logger MAT-file reader.
//!
//! MATLAB 7.3 MAT-files are HDF5 containers with a 512 byte text header.
//! Under the root group (`robot_logger_device` by default):
//! - every group with a `data` member is a signal leaf (`data`,
//!   `timestamps`, optional `elements_names`)
//! - every other group is a folder of signals
//! - `description_list` lists the logged joints
//! - `yarp_robot_name` names the robot model
//!
//! Struct-of-strings values are MATLAB cell arrays: datasets of object
//! references pointing to UTF-16 char arrays.

use crate::error::LoadError;
use crate::signals::{Signal, SignalNode, SignalPath, SignalTree};
use hdf5::{Dataset, File, Group, LocationType, ObjectReference1, ReferencedObject};
use nalgebra::{DMatrix, DVector};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Root group written by the robot logger device.
pub const DEFAULT_ROOT_NAME: &str = "robot_logger_device";

const HDF5_SIGNATURE: &[u8] = b"\x89HDF\r\n\x1a\n";
const MAT_HEADER_LEN: usize = 128;

// =============================================================================
// FILE VERSION
// =============================================================================

/// Container version found in the file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatVersion {
    /// MATLAB 7.3 (HDF5 with MAT header)
    V73,
    /// MATLAB 5 / 7 (proprietary Level 5 format)
    V5,
    /// Plain HDF5 file without MAT header
    Hdf5,
    Unknown,
}

impl MatVersion {
    /// Whether the loader can read this container.
    pub fn is_supported(self) -> bool {
        matches!(self, MatVersion::V73 | MatVersion::Hdf5)
    }
}

impl fmt::Display for MatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatVersion::V73 => "MATLAB 7.3",
            MatVersion::V5 => "MATLAB 5.0",
            MatVersion::Hdf5 => "HDF5",
            MatVersion::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Classifies the first bytes of a file.
///
/// The MAT header carries a version word at offset 124 followed by the
/// endian indicator `IM` (little endian) or `MI` (big endian).
pub fn detect_version(header: &[u8]) -> MatVersion {
    if header.starts_with(HDF5_SIGNATURE) {
        return MatVersion::Hdf5;
    }
    if header.starts_with(b"MATLAB 7.3") {
        return MatVersion::V73;
    }
    if header.len() >= MAT_HEADER_LEN && header.starts_with(b"MATLAB") {
        let word = match &header[126..128] {
            b"IM" => u16::from_le_bytes([header[124], header[125]]),
            b"MI" => u16::from_be_bytes([header[124], header[125]]),
            _ => return MatVersion::Unknown,
        };
        return match word {
            0x0200 => MatVersion::V73,
            0x0100 => MatVersion::V5,
            _ => MatVersion::Unknown,
        };
    }
    if header.starts_with(b"MATLAB 5.0") {
        return MatVersion::V5;
    }
    MatVersion::Unknown
}

fn read_version(path: &Path) -> Result<MatVersion, LoadError> {
    let mut header = Vec::with_capacity(MAT_HEADER_LEN);
    std::fs::File::open(path)?
        .take(MAT_HEADER_LEN as u64)
        .read_to_end(&mut header)?;
    Ok(detect_version(&header))
}

// =============================================================================
// TIME AXIS
// =============================================================================

/// The common time axis all views index into.
///
/// Built by scanning every leaf: a leaf that starts earlier than anything
/// seen so far, or ends later, donates its timestamps as the axis. Cursor
/// times are relative to the earliest start over all leaves.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    timestamps: Vec<f64>,
    initial_time: f64,
    end_time: f64,
}

impl TimeAxis {
    pub fn new() -> Self {
        Self {
            timestamps: Vec::new(),
            initial_time: f64::INFINITY,
            end_time: f64::NEG_INFINITY,
        }
    }

    /// Considers one leaf's timestamps.
    pub fn absorb(&mut self, timestamps: &[f64]) {
        let (Some(&first), Some(&last)) = (timestamps.first(), timestamps.last()) else {
            return;
        };
        if first < self.initial_time {
            self.timestamps = timestamps.to_vec();
            self.initial_time = first;
        }
        if last > self.end_time {
            self.timestamps = timestamps.to_vec();
            self.end_time = last;
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn initial_time(&self) -> f64 {
        self.initial_time
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    /// Absolute timestamp at `index` (clamped).
    pub fn absolute_at(&self, index: usize) -> f64 {
        match self.timestamps.get(index) {
            Some(&t) => t,
            None => self.timestamps.last().copied().unwrap_or(0.0),
        }
    }

    /// Seconds since the start of the log at `index` (clamped).
    pub fn time_at(&self, index: usize) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.absolute_at(index) - self.initial_time
    }

    /// Relative time of the last axis sample.
    pub fn duration(&self) -> f64 {
        self.time_at(self.len().saturating_sub(1))
    }
}

impl Default for TimeAxis {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ROBOT LOG
// =============================================================================

/// A loaded log: signals plus robot metadata.
#[derive(Debug, Clone)]
pub struct RobotLog {
    /// File the log was read from
    pub source: Option<PathBuf>,
    /// Name of the root group
    pub root_name: String,
    pub signals: SignalTree,
    pub axis: TimeAxis,
    /// Logged joints, in `data` column order of the joint signals
    pub joints: Vec<String>,
    pub robot_name: Option<String>,
}

impl RobotLog {
    /// Builds a log from signals already in memory.
    pub fn from_tree(
        root_name: impl Into<String>,
        signals: SignalTree,
        joints: Vec<String>,
        robot_name: Option<String>,
    ) -> Result<Self, LoadError> {
        let mut axis = TimeAxis::new();
        for (_, signal) in signals.leaves() {
            axis.absorb(signal.timestamps());
        }
        if axis.is_empty() {
            return Err(LoadError::EmptyLog);
        }
        Ok(Self {
            source: None,
            root_name: root_name.into(),
            signals,
            axis,
            joints,
            robot_name,
        })
    }

    /// Opens a MAT 7.3 log file.
    pub fn open(path: impl AsRef<Path>, root_name: &str) -> Result<Self, LoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LoadError::FileNotFound(path.to_path_buf()));
        }

        let version = read_version(path)?;
        if !version.is_supported() {
            return Err(LoadError::UnsupportedVersion {
                path: path.to_path_buf(),
                found: version.to_string(),
            });
        }
        debug!("Opening {} ({})", path.display(), version);

        let file = File::open(path)?;
        let root = file
            .group(root_name)
            .map_err(|_| LoadError::MissingRoot(root_name.to_string()))?;

        let mut prefix = Vec::new();
        let signals = SignalTree::from_children(read_group(&file, &root, &mut prefix)?);

        let joints = if root.link_exists("description_list") {
            match read_cell_strings(&file, &root.dataset("description_list")?) {
                Ok(joints) => joints,
                Err(e) => {
                    warn!("Unable to read the joint list: {}", e);
                    Vec::new()
                }
            }
        } else {
            warn!("Log has no joint list, the robot will not move");
            Vec::new()
        };

        let robot_name = if root.link_exists("yarp_robot_name") {
            root.dataset("yarp_robot_name")
                .and_then(|ds| read_chars(&ds))
                .ok()
                .filter(|name| !name.is_empty())
        } else {
            None
        };

        let mut log = Self::from_tree(root_name, signals, joints, robot_name)?;
        log.source = Some(path.to_path_buf());

        info!(
            "Loaded {} signals, {} samples ({:.2}s) from {}",
            log.signals.len_leaves(),
            log.len(),
            log.axis.duration(),
            path.display()
        );
        Ok(log)
    }

    /// Number of samples on the common axis.
    pub fn len(&self) -> usize {
        self.axis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axis.is_empty()
    }

    pub fn signal(&self, path: &SignalPath) -> Option<&Signal> {
        self.signals.get(path)
    }

    /// Sample index of `path` nearest in time to axis sample `index`.
    pub fn closest_sample(&self, path: &SignalPath, index: usize) -> Option<usize> {
        let signal = self.signal(path)?;
        Some(signal.closest_index(self.axis.absolute_at(index)))
    }

    /// Row of `path` nearest in time to axis sample `index`.
    pub fn sample_at(&self, path: &SignalPath, index: usize) -> Option<DVector<f64>> {
        let sample = self.closest_sample(path, index)?;
        self.signal(path).map(|signal| signal.row(sample))
    }

    /// Rows of `path` within `neighbor` samples of the one nearest to axis sample `index`.
    pub fn window_at(&self, path: &SignalPath, index: usize, neighbor: usize) -> Option<DMatrix<f64>> {
        let sample = self.closest_sample(path, index)?;
        self.signal(path).map(|signal| signal.window(sample, neighbor))
    }

    /// Display name of the log (file stem or root name).
    pub fn title(&self) -> String {
        self.source
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root_name.clone())
    }
}

// =============================================================================
// HDF5 TRAVERSAL
// =============================================================================

fn read_group(
    file: &File,
    group: &Group,
    prefix: &mut Vec<String>,
) -> Result<BTreeMap<String, SignalNode>, LoadError> {
    let mut children = BTreeMap::new();

    for name in group.member_names()? {
        if name == "#refs#" {
            continue;
        }
        if !matches!(group.loc_type_by_name(&name)?, LocationType::Group) {
            continue;
        }

        let child = group.group(&name)?;
        prefix.push(name.clone());
        let node = if child.link_exists("data") {
            SignalNode::Leaf(read_signal(file, &child, prefix)?)
        } else {
            SignalNode::Group(read_group(file, &child, prefix)?)
        };
        prefix.pop();

        children.insert(name, node);
    }

    Ok(children)
}

fn read_signal(file: &File, group: &Group, prefix: &[String]) -> Result<Signal, LoadError> {
    let path = prefix.join("/");

    if !group.link_exists("timestamps") {
        return Err(LoadError::shape(&path, "missing timestamps"));
    }
    let timestamps = group.dataset("timestamps")?.read_raw::<f64>()?;

    let data = group.dataset("data")?;
    let shape = data.shape();
    let raw = data.read_raw::<f64>()?;
    let matrix = to_sample_matrix(&shape, &raw, timestamps.len()).ok_or_else(|| {
        LoadError::shape(
            &path,
            format!("data {:?} does not match {} timestamps", shape, timestamps.len()),
        )
    })?;

    let mut signal = Signal::new(matrix, timestamps).map_err(|e| match e {
        LoadError::Shape { reason, .. } => LoadError::shape(&path, reason),
        other => other,
    })?;

    if group.link_exists("elements_names") {
        match read_cell_strings(file, &group.dataset("elements_names")?) {
            Ok(names) => signal = signal.with_elements_names(names),
            Err(e) => debug!("Ignoring elements_names of {}: {}", path, e),
        }
    }

    Ok(signal)
}

/// Reshapes raw dataset values into a `samples x elements` matrix.
///
/// MAT 7.3 stores a MATLAB `[k x 1 x N]` array as HDF5 dims `(N, 1, k)`,
/// so samples usually run along the slowest axis. Datasets with the
/// samples on the fastest axis are transposed.
pub(crate) fn to_sample_matrix(shape: &[usize], raw: &[f64], samples: usize) -> Option<DMatrix<f64>> {
    if samples == 0 || raw.is_empty() || raw.len() % samples != 0 {
        return None;
    }
    let width = raw.len() / samples;

    let dims: Vec<usize> = shape.iter().copied().filter(|&d| d != 1).collect();
    let samples_last = dims.len() > 1 && dims[0] != samples && dims[dims.len() - 1] == samples;
    if dims.len() > 1 && dims[0] == samples && dims[dims.len() - 1] == samples {
        debug!("Square data {:?}: reading samples along the first axis", shape);
    }

    if samples_last {
        Some(DMatrix::from_column_slice(samples, width, raw))
    } else {
        Some(DMatrix::from_row_slice(samples, width, raw))
    }
}

/// Reads a MATLAB char array.
fn read_chars(dataset: &Dataset) -> hdf5::Result<String> {
    let units = dataset.read_raw::<u16>()?;
    Ok(String::from_utf16_lossy(&units)
        .trim_end_matches('\0')
        .to_string())
}

/// Reads a MATLAB cell array of char arrays.
fn read_cell_strings(file: &File, dataset: &Dataset) -> Result<Vec<String>, LoadError> {
    let refs = dataset.read_raw::<ObjectReference1>()?;
    refs.iter()
        .map(|reference| match file.dereference(reference)? {
            ReferencedObject::Dataset(ds) => Ok(read_chars(&ds)?),
            _ => Err(LoadError::shape(
                dataset.name(),
                "cell array entry is not a char array",
            )),
        })
        .collect()
}
