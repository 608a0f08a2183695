//! Plot tabs: which curves each time-series plot shows, and their data.

use robolog_core::{ColorPalette, CurveKey, RobotLog, Rgb};

/// One plot tab.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotTab {
    pub title: String,
    pub curves: Vec<CurveKey>,
    /// Highlighted curve when the plot has focus
    pub selected: usize,
}

impl PlotTab {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            curves: Vec::new(),
            selected: 0,
        }
    }

    /// Adds `key`, or removes it when already plotted. Returns whether it is now plotted.
    pub fn toggle(&mut self, key: &CurveKey) -> bool {
        if let Some(pos) = self.curves.iter().position(|k| k == key) {
            self.curves.remove(pos);
            self.selected = self.selected.min(self.curves.len().saturating_sub(1));
            false
        } else {
            self.curves.push(key.clone());
            true
        }
    }

    pub fn selected_curve(&self) -> Option<&CurveKey> {
        self.curves.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.curves.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Colour of the `i`-th curve.
    pub fn color(&self, i: usize) -> Rgb {
        ColorPalette::new().color(i)
    }
}

/// The tab strip. Always holds at least one tab.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotTabs {
    tabs: Vec<PlotTab>,
    active: usize,
    created: usize,
}

impl PlotTabs {
    pub fn new() -> Self {
        Self {
            tabs: vec![PlotTab::new("Plot 1")],
            active: 0,
            created: 1,
        }
    }

    /// Replaces every tab. An empty list leaves a single empty tab.
    pub fn restore(&mut self, tabs: Vec<PlotTab>, active: usize) {
        *self = Self::new();
        if !tabs.is_empty() {
            self.created = tabs.len();
            self.tabs = tabs;
        }
        self.active = active.min(self.tabs.len() - 1);
    }

    pub fn tabs(&self) -> &[PlotTab] {
        &self.tabs
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> &PlotTab {
        &self.tabs[self.active]
    }

    pub fn active_mut(&mut self) -> &mut PlotTab {
        &mut self.tabs[self.active]
    }

    /// Opens and activates a new empty tab.
    pub fn add_tab(&mut self) {
        self.created += 1;
        self.tabs.push(PlotTab::new(format!("Plot {}", self.created)));
        self.active = self.tabs.len() - 1;
    }

    /// Closes the active tab unless it is the last one.
    pub fn close_active(&mut self) -> bool {
        if self.tabs.len() <= 1 {
            return false;
        }
        self.tabs.remove(self.active);
        self.active = self.active.min(self.tabs.len() - 1);
        true
    }

    pub fn next(&mut self) {
        self.active = (self.active + 1) % self.tabs.len();
    }

    pub fn prev(&mut self) {
        self.active = (self.active + self.tabs.len() - 1) % self.tabs.len();
    }
}

impl Default for PlotTabs {
    fn default() -> Self {
        Self::new()
    }
}

/// `(relative time, value)` points of a curve, decimated to at most `max_points`.
pub fn series(log: &RobotLog, key: &CurveKey, max_points: usize) -> Vec<(f64, f64)> {
    let Some(signal) = log.signal(&key.path) else {
        return Vec::new();
    };
    if key.column >= signal.width() {
        return Vec::new();
    }
    let initial = log.axis.initial_time();
    let step = signal.len().div_ceil(max_points.max(1)).max(1);
    let data = signal.data();

    let mut points: Vec<(f64, f64)> = signal
        .timestamps()
        .iter()
        .enumerate()
        .step_by(step)
        .map(|(i, t)| (t - initial, data[(i, key.column)]))
        .collect();

    // keep the final sample so the curve spans the whole log
    let last = signal.len() - 1;
    if last % step != 0 {
        points.push((signal.timestamps()[last] - initial, data[(last, key.column)]));
    }
    points
}

/// Y range covering every series, padded by 5%.
pub fn value_bounds<'a>(series: impl IntoIterator<Item = &'a [(f64, f64)]>) -> [f64; 2] {
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for points in series {
        for &(_, y) in points {
            if y.is_finite() {
                lo = lo.min(y);
                hi = hi.max(y);
            }
        }
    }
    if !lo.is_finite() {
        return [-1.0, 1.0];
    }
    if (hi - lo).abs() < f64::EPSILON {
        return [lo - 1.0, hi + 1.0];
    }
    let pad = (hi - lo) * 0.05;
    [lo - pad, hi + pad]
}
