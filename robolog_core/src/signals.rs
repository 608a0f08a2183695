//! Signal tree: named time series as stored by the robot logger.
//!
//! A leaf holds a `samples x elements` matrix and one timestamp per sample.
//! Leaves are addressed by [`SignalPath`] (`joints_state/positions`) and a
//! single plotted column by [`CurveKey`] (`joints_state/positions/3`).

use crate::error::LoadError;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Path from the log root down to a group or leaf.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalPath(Vec<String>);

impl SignalPath {
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Last segment (the leaf name).
    pub fn name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Returns a copy with `segment` appended.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }
}

impl From<&str> for SignalPath {
    fn from(path: &str) -> Self {
        Self(
            path.split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

impl<S: Into<String>> FromIterator<S> for SignalPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for SignalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// One column of a signal leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CurveKey {
    pub path: SignalPath,
    pub column: usize,
}

impl CurveKey {
    pub fn new(path: impl Into<SignalPath>, column: usize) -> Self {
        Self {
            path: path.into(),
            column,
        }
    }
}

impl fmt::Display for CurveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.path, self.column)
    }
}

impl FromStr for CurveKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (path, column) = s
            .rsplit_once('/')
            .ok_or_else(|| format!("curve '{}' has no column", s))?;
        let column = column
            .parse()
            .map_err(|_| format!("curve '{}' has a non numeric column", s))?;
        let path = SignalPath::from(path);
        if path.is_empty() {
            return Err(format!("curve '{}' has an empty path", s));
        }
        Ok(Self { path, column })
    }
}

/// A timestamped signal leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    /// One row per sample, one column per element
    data: DMatrix<f64>,
    /// Sample times in seconds, ascending
    timestamps: Vec<f64>,
    /// Optional per-column names
    elements_names: Option<Vec<String>>,
}

impl Signal {
    /// Creates a signal, checking that rows and timestamps line up.
    pub fn new(data: DMatrix<f64>, timestamps: Vec<f64>) -> Result<Self, LoadError> {
        if timestamps.is_empty() {
            return Err(LoadError::shape("<signal>", "no timestamps"));
        }
        if data.nrows() != timestamps.len() {
            return Err(LoadError::shape(
                "<signal>",
                format!("{} samples but {} timestamps", data.nrows(), timestamps.len()),
            ));
        }
        if let Some(i) = timestamps.windows(2).position(|w| matches!(w[1].partial_cmp(&w[0]), None | Some(std::cmp::Ordering::Less))) {
            return Err(LoadError::shape(
                "<signal>",
                format!("timestamp {} at sample {} is before its predecessor", timestamps[i + 1], i + 1),
            ));
        }
        Ok(Self {
            data,
            timestamps,
            elements_names: None,
        })
    }

    /// Builds a single column signal.
    pub fn from_scalars(values: &[f64], timestamps: Vec<f64>) -> Result<Self, LoadError> {
        Self::new(DMatrix::from_column_slice(values.len(), 1, values), timestamps)
    }

    /// Attaches column names. Ignored when the count does not match.
    pub fn with_elements_names(mut self, names: Vec<String>) -> Self {
        if names.len() == self.data.ncols() {
            self.elements_names = Some(names);
        } else {
            tracing::debug!(
                "Ignoring {} element names for a signal with {} columns",
                names.len(),
                self.data.ncols()
            );
        }
        self
    }

    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn elements_names(&self) -> Option<&[String]> {
        self.elements_names.as_deref()
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Number of elements per sample.
    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    /// Display name of a column: its element name, or the index.
    pub fn column_label(&self, column: usize) -> String {
        self.elements_names
            .as_ref()
            .and_then(|names| names.get(column).cloned())
            .unwrap_or_else(|| column.to_string())
    }

    /// Index of the sample nearest to `time`; ties go to the earlier sample.
    pub fn closest_index(&self, time: f64) -> usize {
        let ts = &self.timestamps;
        let upper = ts.partition_point(|&t| t < time);
        if upper == 0 {
            return 0;
        }
        if upper >= ts.len() {
            return ts.len() - 1;
        }
        let before = time - ts[upper - 1];
        let after = ts[upper] - time;
        if after < before {
            upper
        } else {
            upper - 1
        }
    }

    /// A sample as a vector.
    pub fn row(&self, index: usize) -> DVector<f64> {
        let index = index.min(self.len() - 1);
        self.data.row(index).transpose()
    }

    /// Samples within `neighbor` rows of `index`, inclusive on both sides.
    pub fn window(&self, index: usize, neighbor: usize) -> DMatrix<f64> {
        let index = index.min(self.len() - 1);
        let start = index.saturating_sub(neighbor);
        let end = (index + neighbor + 1).min(self.len());
        self.data.rows(start, end - start).into_owned()
    }

    /// Value of one column at one sample.
    pub fn value(&self, index: usize, column: usize) -> Option<f64> {
        if index >= self.len() || column >= self.width() {
            return None;
        }
        Some(self.data[(index, column)])
    }
}

/// Node of the signal tree.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalNode {
    Group(BTreeMap<String, SignalNode>),
    Leaf(Signal),
}

/// The signals under the log root, ordered by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalTree {
    root: BTreeMap<String, SignalNode>,
}

impl SignalTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_children(root: BTreeMap<String, SignalNode>) -> Self {
        Self { root }
    }

    pub fn children(&self) -> &BTreeMap<String, SignalNode> {
        &self.root
    }

    /// Inserts a leaf, creating intermediate groups. A leaf in the way is replaced.
    pub fn insert(&mut self, path: &SignalPath, signal: Signal) {
        let Some((name, parents)) = path.segments().split_last() else {
            return;
        };
        let mut level = &mut self.root;
        for segment in parents {
            let node = level
                .entry(segment.clone())
                .or_insert_with(|| SignalNode::Group(BTreeMap::new()));
            if matches!(node, SignalNode::Leaf(_)) {
                *node = SignalNode::Group(BTreeMap::new());
            }
            let SignalNode::Group(children) = node else {
                return;
            };
            level = children;
        }
        level.insert(name.clone(), SignalNode::Leaf(signal));
    }

    pub fn node(&self, path: &SignalPath) -> Option<&SignalNode> {
        let (first, rest) = path.segments().split_first()?;
        let mut node = self.root.get(first)?;
        for segment in rest {
            node = match node {
                SignalNode::Group(children) => children.get(segment)?,
                SignalNode::Leaf(_) => return None,
            };
        }
        Some(node)
    }

    /// The leaf at `path`, if `path` names a leaf.
    pub fn get(&self, path: &SignalPath) -> Option<&Signal> {
        match self.node(path)? {
            SignalNode::Leaf(signal) => Some(signal),
            SignalNode::Group(_) => None,
        }
    }

    /// Every leaf, depth first in name order.
    pub fn leaves(&self) -> Vec<(SignalPath, &Signal)> {
        fn walk<'a>(
            level: &'a BTreeMap<String, SignalNode>,
            prefix: &SignalPath,
            out: &mut Vec<(SignalPath, &'a Signal)>,
        ) {
            for (name, node) in level {
                let path = prefix.child(name.clone());
                match node {
                    SignalNode::Leaf(signal) => out.push((path, signal)),
                    SignalNode::Group(children) => walk(children, &path, out),
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.root, &SignalPath::default(), &mut out);
        out
    }

    pub fn leaf_paths(&self) -> Vec<SignalPath> {
        self.leaves().into_iter().map(|(path, _)| path).collect()
    }

    /// Every plottable column of every leaf.
    pub fn curve_keys(&self) -> Vec<CurveKey> {
        self.leaves()
            .into_iter()
            .flat_map(|(path, signal)| {
                (0..signal.width()).map(move |column| CurveKey {
                    path: path.clone(),
                    column,
                })
            })
            .collect()
    }

    pub fn len_leaves(&self) -> usize {
        self.leaves().len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize, width: usize, dt: f64) -> Signal {
        let data = DMatrix::from_fn(n, width, |r, c| (r * 10 + c) as f64);
        let ts = (0..n).map(|i| i as f64 * dt).collect();
        Signal::new(data, ts).unwrap()
    }

    #[test]
    fn test_signal_rejects_mismatched_rows() {
        let data = DMatrix::zeros(3, 2);
        let err = Signal::new(data, vec![0.0, 1.0]).unwrap_err();
        assert!(matches!(err, LoadError::Shape { .. }));
    }

    #[test]
    fn test_signal_rejects_decreasing_timestamps() {
        let err = Signal::from_scalars(&[1.0, 2.0, 3.0], vec![0.0, 0.2, 0.1]).unwrap_err();
        assert!(matches!(err, LoadError::Shape { ref reason, .. } if reason.contains("sample 2")));
        assert!(Signal::from_scalars(&[1.0, 2.0], vec![0.0, f64::NAN]).is_err());
        // repeated timestamps are fine
        assert!(Signal::from_scalars(&[1.0, 2.0, 3.0], vec![0.0, 0.1, 0.1]).is_ok());
    }

    #[test]
    fn test_closest_index() {
        let signal = Signal::from_scalars(&[0.0, 1.0, 2.0, 3.0], vec![0.0, 0.1, 0.2, 0.3]).unwrap();

        assert_eq!(signal.closest_index(-5.0), 0);
        assert_eq!(signal.closest_index(0.0), 0);
        assert_eq!(signal.closest_index(0.14), 1);
        assert_eq!(signal.closest_index(0.16), 2);
        assert_eq!(signal.closest_index(0.3), 3);
        assert_eq!(signal.closest_index(99.0), 3);
    }

    #[test]
    fn test_closest_index_tie_prefers_earlier() {
        let signal = Signal::from_scalars(&[0.0, 1.0], vec![0.0, 1.0]).unwrap();
        assert_eq!(signal.closest_index(0.5), 0);
    }

    #[test]
    fn test_window_is_clamped() {
        let signal = ramp(10, 2, 0.01);

        let w = signal.window(1, 3);
        assert_eq!(w.nrows(), 5); // rows 0..=4
        assert_eq!(w[(0, 0)], 0.0);

        let w = signal.window(9, 3);
        assert_eq!(w.nrows(), 4); // rows 6..=9
        assert_eq!(w[(3, 1)], 91.0);
    }

    #[test]
    fn test_row_and_value() {
        let signal = ramp(4, 3, 0.01);
        assert_eq!(signal.row(2).as_slice(), &[20.0, 21.0, 22.0]);
        assert_eq!(signal.value(3, 2), Some(32.0));
        assert_eq!(signal.value(4, 0), None);
        assert_eq!(signal.value(0, 3), None);
    }

    #[test]
    fn test_elements_names_must_match_width() {
        let named = ramp(2, 2, 0.1).with_elements_names(vec!["a".into(), "b".into()]);
        assert_eq!(named.column_label(1), "b");

        let unnamed = ramp(2, 2, 0.1).with_elements_names(vec!["a".into()]);
        assert_eq!(unnamed.elements_names(), None);
        assert_eq!(unnamed.column_label(1), "1");
    }

    #[test]
    fn test_tree_insert_and_lookup() {
        let mut tree = SignalTree::new();
        tree.insert(&"joints_state/positions".into(), ramp(5, 3, 0.1));
        tree.insert(&"joints_state/velocities".into(), ramp(5, 3, 0.1));
        tree.insert(&"fts/left_arm".into(), ramp(5, 6, 0.1));

        assert!(tree.get(&"joints_state/positions".into()).is_some());
        assert!(tree.get(&"joints_state".into()).is_none());
        assert!(tree.get(&"joints_state/positions/extra".into()).is_none());

        let names: Vec<String> = tree.leaf_paths().iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            vec!["fts/left_arm", "joints_state/positions", "joints_state/velocities"]
        );
        assert_eq!(tree.curve_keys().len(), 12);
    }

    #[test]
    fn test_curve_key_roundtrip() {
        let key: CurveKey = "joints_state/positions/3".parse().unwrap();
        assert_eq!(key.path, SignalPath::from("joints_state/positions"));
        assert_eq!(key.column, 3);
        assert_eq!(key.to_string(), "joints_state/positions/3");

        assert!("positions".parse::<CurveKey>().is_err());
        assert!("a/b/x".parse::<CurveKey>().is_err());
        assert!("/3".parse::<CurveKey>().is_err());
    }
}
