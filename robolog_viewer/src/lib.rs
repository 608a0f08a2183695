//! robolog Viewer - terminal front end for robot logger MAT-files
//!
//! Browses the signals of a log, plots them in tabs synchronized with a
//! timeline cursor, plays the log back in real time and mirrors the robot
//! pose to an optional Rerun 3D view.

pub mod app;
pub mod config;
pub mod console;
pub mod dashboard;
pub mod keys;
pub mod plots;
pub mod robot_view;
pub mod telemetry;

pub use app::{App, Focus, Prompt, PromptKind, Session, SignalBrowser};
pub use config::ViewerConfig;
pub use console::{ConsoleEntry, ConsoleLevel, ConsoleLog, SharedConsole};
pub use keys::Action;
pub use plots::{PlotTab, PlotTabs};
pub use robot_view::RobotView;
