//! Viewer state and input handling.
//!
//! [`App`] owns the loaded [`Session`] (log, cursor, playback, overlays and
//! robot model) plus the UI state: plot tabs, the signal browser, focus and
//! the text prompt. Input events are mapped to [`Action`]s and applied
//! here; the dashboard only draws.

use crate::config::ViewerConfig;
use crate::console::SharedConsole;
use crate::keys::{map_key, Action};
use crate::plots::{PlotTab, PlotTabs};
use crate::robot_view::RobotView;
use crossterm::event::{Event, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use robolog_core::snapshot::{
    DatasetSnapshot, OverlaySnapshot, PlotSnapshot, TimelineSnapshot, VisualizationSnapshot,
};
use robolog_core::{
    Cursor, CurveKey, FrameSnapshot, OverlayKind, Overlays, Playback, RobotLog, RobotModel, RobotStatePaths,
    SignalPath, ViewSnapshot,
};
use robolog_env::ViewerContext;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Which pane receives Up / Down / Enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Signals,
    Plot,
}

/// What the text prompt's input is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    OpenFile,
    RenameTab,
}

impl PromptKind {
    pub fn title(self) -> &'static str {
        match self {
            PromptKind::OpenFile => "Open",
            PromptKind::RenameTab => "Rename",
        }
    }
}

/// Single line text input shown in the footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub text: String,
}

impl Prompt {
    pub fn open_file() -> Self {
        Self {
            kind: PromptKind::OpenFile,
            text: String::new(),
        }
    }
}

/// A loaded log and everything bound to it.
pub struct Session {
    pub log: RobotLog,
    pub cursor: Cursor,
    pub playback: Playback,
    pub overlays: Overlays,
    pub paths: RobotStatePaths,
    pub model: Option<RobotModel>,
}

impl Session {
    /// Seconds since the start of the log at the cursor.
    pub fn current_time(&self) -> f64 {
        self.cursor.current_time(&self.log.axis)
    }
}

/// Flat list of every plottable column.
#[derive(Debug, Clone, Default)]
pub struct SignalBrowser {
    keys: Vec<CurveKey>,
    labels: Vec<String>,
    selected: usize,
}

impl SignalBrowser {
    pub fn from_log(log: &RobotLog) -> Self {
        let keys = log.signals.curve_keys();
        let labels = keys
            .iter()
            .map(|key| match log.signal(&key.path) {
                Some(signal) => format!("{}/{}", key.path, signal.column_label(key.column)),
                None => key.to_string(),
            })
            .collect();
        Self {
            keys,
            labels,
            selected: 0,
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&CurveKey> {
        self.keys.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.keys.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// The viewer.
pub struct App {
    ctx: Arc<dyn ViewerContext>,
    pub config: ViewerConfig,
    pub console: SharedConsole,
    pub session: Option<Session>,
    pub plots: PlotTabs,
    pub browser: SignalBrowser,
    pub focus: Focus,
    pub prompt: Option<Prompt>,
    robot_view: RobotView,
    last_tick: Duration,
    /// Where the timeline was last drawn, for mouse hits
    pub timeline_area: Rect,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        config: ViewerConfig,
        ctx: Arc<dyn ViewerContext>,
        console: SharedConsole,
        robot_view: RobotView,
    ) -> Self {
        let last_tick = ctx.now();
        Self {
            ctx,
            config,
            console,
            session: None,
            plots: PlotTabs::new(),
            browser: SignalBrowser::default(),
            focus: Focus::Signals,
            prompt: None,
            robot_view,
            last_tick,
            timeline_area: Rect::default(),
            should_quit: false,
        }
    }

    /// Opens the configured log and snapshot, or shows the open-file prompt.
    pub fn startup(&mut self) {
        if let Some(path) = self.config.file.clone() {
            self.open_file(&path);
        }
        if let Some(path) = self.config.snapshot.clone() {
            match ViewSnapshot::load(&path) {
                Ok(snapshot) => self.apply_snapshot(&snapshot),
                Err(e) => error!("Unable to load view snapshot '{}': {}", path.display(), e),
            }
        }
        if self.session.is_none() {
            info!("Press 'o' and type the path of a log file");
            self.prompt = Some(Prompt::open_file());
        }
    }

    /// Loads a log file. Failures are reported on the console.
    pub fn open_file(&mut self, path: &Path) -> bool {
        match RobotLog::open(path, &self.config.root_name) {
            Ok(log) => {
                self.load_log(log);
                true
            }
            Err(e) => {
                error!("{}", e);
                false
            }
        }
    }

    /// Starts a session on an already loaded log.
    pub fn load_log(&mut self, log: RobotLog) {
        if let Some(old) = &mut self.session {
            old.playback.close();
        }

        let model = match self
            .config
            .locator(self.ctx.as_ref())
            .load(log.robot_name.as_deref(), &log.joints)
        {
            Ok(model) => {
                info!("Loaded model '{}' ({} joints driven)", model.name, model.driven_joints().count());
                self.robot_view.load_model(&model);
                Some(model)
            }
            Err(e) => {
                error!("{}", e);
                None
            }
        };

        self.browser = SignalBrowser::from_log(&log);
        self.plots = PlotTabs::new();
        self.focus = Focus::Signals;
        self.prompt = None;
        self.session = Some(Session {
            cursor: Cursor::new(log.len()),
            playback: Playback::new(self.config.period(), self.config.speed),
            overlays: Overlays::new(),
            paths: RobotStatePaths::default(),
            model,
            log,
        });
        self.last_tick = self.ctx.now();
        self.refresh_robot_view();
    }

    // =========================================================================
    // INPUT
    // =========================================================================

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => {
                if let Some(action) = map_key(key, self.prompt.is_some()) {
                    self.apply(action);
                }
            }
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            _ => {}
        }
    }

    /// Click or drag on the timeline moves the cursor.
    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if !matches!(
            mouse.kind,
            MouseEventKind::Down(MouseButton::Left) | MouseEventKind::Drag(MouseButton::Left)
        ) {
            return;
        }
        let area = self.timeline_area;
        let inside = mouse.column >= area.x
            && mouse.column < area.x + area.width
            && mouse.row >= area.y
            && mouse.row < area.y + area.height;
        if !inside || area.width == 0 {
            return;
        }
        let fraction = (mouse.column - area.x) as f64 / area.width.saturating_sub(1).max(1) as f64;
        self.move_cursor(|cursor| cursor.set_fraction(fraction));
    }

    pub fn apply(&mut self, action: Action) {
        debug!("Action {:?}", action);
        match action {
            Action::TogglePlay => {
                if let Some(session) = &mut self.session {
                    if session.cursor.at_end() && !session.playback.is_running() {
                        session.cursor.to_start();
                        session.playback.sync_to(&session.cursor, &session.log.axis);
                    }
                    session.playback.toggle();
                    self.last_tick = self.ctx.now();
                }
            }
            Action::Step(delta) => self.move_cursor(|cursor| cursor.step(delta)),
            Action::Jump(percent) => self.move_cursor(|cursor| {
                let delta = (cursor.len() as f64 * percent as f64 / 100.0).round() as isize;
                cursor.step(delta);
            }),
            Action::Home => self.move_cursor(Cursor::to_start),
            Action::End => self.move_cursor(Cursor::to_end),
            Action::SwitchFocus => {
                self.focus = match self.focus {
                    Focus::Signals => Focus::Plot,
                    Focus::Plot => Focus::Signals,
                };
            }
            Action::SelectPrev => match self.focus {
                Focus::Signals => self.browser.select_prev(),
                Focus::Plot => self.plots.active_mut().select_prev(),
            },
            Action::SelectNext => match self.focus {
                Focus::Signals => self.browser.select_next(),
                Focus::Plot => self.plots.active_mut().select_next(),
            },
            Action::ToggleCurve => {
                let key = match self.focus {
                    Focus::Signals => self.browser.selected().cloned(),
                    Focus::Plot => self.plots.active().selected_curve().cloned(),
                };
                if let Some(key) = key {
                    let tab = self.plots.active_mut();
                    let shown = tab.toggle(&key);
                    debug!("{} {} on {}", if shown { "Plotting" } else { "Removed" }, key, tab.title);
                }
            }
            Action::NewTab => self.plots.add_tab(),
            Action::CloseTab => {
                if !self.plots.close_active() {
                    warn!("The last plot can not be closed");
                }
            }
            Action::PrevTab => self.plots.prev(),
            Action::NextTab => self.plots.next(),
            Action::RenameTab => {
                self.prompt = Some(Prompt {
                    kind: PromptKind::RenameTab,
                    text: self.plots.active().title.clone(),
                });
            }
            Action::ToggleOverlay(kind) => self.toggle_overlay(kind),
            Action::UseAsBasePosition => self.set_base_signal(false),
            Action::UseAsBaseOrientation => self.set_base_signal(true),
            Action::OpenPrompt => self.prompt = Some(Prompt::open_file()),
            Action::SaveSnapshot => self.save_snapshot(),
            Action::Quit => {
                if let Some(session) = &mut self.session {
                    session.playback.close();
                }
                self.should_quit = true;
            }
            Action::PromptInput(c) => {
                if let Some(prompt) = &mut self.prompt {
                    prompt.text.push(c);
                }
            }
            Action::PromptBackspace => {
                if let Some(prompt) = &mut self.prompt {
                    prompt.text.pop();
                }
            }
            Action::PromptSubmit => {
                if let Some(prompt) = self.prompt.take() {
                    self.submit_prompt(prompt);
                }
            }
            Action::PromptCancel => self.prompt = None,
        }
    }

    fn move_cursor(&mut self, f: impl FnOnce(&mut Cursor)) {
        if let Some(session) = &mut self.session {
            f(&mut session.cursor);
            session.playback.sync_to(&session.cursor, &session.log.axis);
        }
        self.refresh_robot_view();
    }

    fn submit_prompt(&mut self, prompt: Prompt) {
        let text = prompt.text.trim();
        match prompt.kind {
            PromptKind::OpenFile => {
                if !text.is_empty() && !self.open_file(Path::new(text)) {
                    self.prompt = Some(Prompt {
                        kind: PromptKind::OpenFile,
                        text: text.to_string(),
                    });
                }
            }
            PromptKind::RenameTab => {
                if text.is_empty() {
                    warn!("Plot titles can not be empty");
                    return;
                }
                let tab = self.plots.active_mut();
                debug!("Renamed plot '{}' to '{}'", tab.title, text);
                tab.title = text.to_string();
            }
        }
    }

    fn toggle_overlay(&mut self, kind: OverlayKind) {
        let Some(path) = self.browser.selected().map(|key| key.path.clone()) else {
            return;
        };
        let Some(session) = &mut self.session else {
            return;
        };
        let label = path.to_string();
        if session.overlays.unregister(kind, &label) {
            info!("Removed {} overlay '{}'", kind, label);
        } else {
            info!("Showing '{}' as a {}", label, kind);
            session.overlays.register(kind, label, path);
        }
        self.robot_view_invalidate();
    }

    /// Reads the floating base position or orientation from the selected signal.
    fn set_base_signal(&mut self, orientation: bool) {
        let Some(path) = self.browser.selected().map(|key| key.path.clone()) else {
            return;
        };
        let Some(session) = &mut self.session else {
            return;
        };
        if orientation {
            info!("Using '{}' as base orientation", path);
            session.paths.base_orientation = Some(path);
        } else {
            info!("Using '{}' as base position", path);
            session.paths.base_position = Some(path);
        }
        self.robot_view_invalidate();
    }

    // =========================================================================
    // PLAYBACK
    // =========================================================================

    /// Timer tick: advances playback by the wall time since the last tick.
    pub fn on_tick(&mut self) {
        let now = self.ctx.now();
        let elapsed = now.saturating_sub(self.last_tick);
        self.last_tick = now;

        if let Some(session) = &mut self.session {
            session
                .playback
                .advance(elapsed, &mut session.cursor, &session.log.axis);
        }
        self.refresh_robot_view();
    }

    /// The view model for the next redraw.
    pub fn frame(&self) -> Option<FrameSnapshot> {
        let session = self.session.as_ref()?;
        Some(FrameSnapshot::capture(
            &session.log,
            &session.cursor,
            &session.paths,
            &session.overlays,
            &self.plots.active().curves,
        ))
    }

    fn refresh_robot_view(&mut self) {
        if let Some(frame) = self.frame() {
            let model = self.session.as_ref().and_then(|s| s.model.as_ref());
            self.robot_view.show(&frame, model);
        }
    }

    fn robot_view_invalidate(&mut self) {
        self.robot_view.invalidate();
        self.refresh_robot_view();
    }

    pub fn robot_view(&self) -> &RobotView {
        &self.robot_view
    }

    // =========================================================================
    // SNAPSHOTS
    // =========================================================================

    /// Captures the current layout.
    pub fn snapshot(&self) -> ViewSnapshot {
        let overlay_list = |map: &std::collections::BTreeMap<String, SignalPath>| {
            map.iter()
                .map(|(label, path)| OverlaySnapshot {
                    label: label.clone(),
                    path: path.to_string(),
                })
                .collect()
        };

        let mut snapshot = ViewSnapshot {
            active_plot: self.plots.active_index(),
            plots: self
                .plots
                .tabs()
                .iter()
                .map(|tab| PlotSnapshot {
                    title: tab.title.clone(),
                    curves: tab.curves.iter().map(ToString::to_string).collect(),
                })
                .collect(),
            ..Default::default()
        };

        if let Some(session) = &self.session {
            snapshot.dataset = DatasetSnapshot {
                path: session.log.source.clone(),
                robot_name: session.log.robot_name.clone(),
            };
            snapshot.timeline = TimelineSnapshot {
                index: session.cursor.index(),
                is_running: session.playback.is_running(),
                current_time: session.current_time(),
            };
            snapshot.visualization = VisualizationSnapshot {
                points: overlay_list(&session.overlays.points),
                trajectories: overlay_list(&session.overlays.trajectories),
                arrows: overlay_list(&session.overlays.arrows),
                robot_state: session.paths.clone(),
            };
        }
        snapshot
    }

    /// Restores a layout, opening its log when it differs from the loaded one.
    pub fn apply_snapshot(&mut self, snapshot: &ViewSnapshot) {
        if let Some(path) = &snapshot.dataset.path {
            let loaded = self
                .session
                .as_ref()
                .and_then(|s| s.log.source.as_deref())
                .is_some_and(|source| source == path.as_path());
            if !loaded && !self.open_file(path) {
                return;
            }
        }

        let tabs: Vec<PlotTab> = snapshot
            .plots
            .iter()
            .map(|plot| {
                let mut tab = PlotTab::new(plot.title.clone());
                for curve in &plot.curves {
                    match curve.parse::<CurveKey>() {
                        Ok(key) => tab.curves.push(key),
                        Err(e) => warn!("Skipping curve: {}", e),
                    }
                }
                tab
            })
            .collect();
        self.plots.restore(tabs, snapshot.active_plot);

        if let Some(session) = &mut self.session {
            let mut overlays = Overlays::new();
            let visualization = &snapshot.visualization;
            for (kind, entries) in [
                (OverlayKind::Point, &visualization.points),
                (OverlayKind::Trajectory, &visualization.trajectories),
                (OverlayKind::Arrow, &visualization.arrows),
            ] {
                for entry in entries {
                    overlays.register(kind, entry.label.clone(), SignalPath::from(entry.path.as_str()));
                }
            }
            session.overlays = overlays;
            session.paths = snapshot.visualization.robot_state.clone();

            session.cursor.set_index(snapshot.timeline.index);
            session.playback.sync_to(&session.cursor, &session.log.axis);
            if snapshot.timeline.is_running {
                session.playback.play();
            } else {
                session.playback.pause();
            }
        }
        self.last_tick = self.ctx.now();
        self.robot_view_invalidate();
    }

    pub fn save_snapshot(&self) {
        let path = &self.config.save_snapshot;
        if let Err(e) = self.snapshot().save(path) {
            error!("Unable to save view snapshot '{}': {}", path.display(), e);
        }
    }
}
