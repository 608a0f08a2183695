//! robolog Core - Robot Log Playback Engine
//!
//! Loads robot logger MAT-files into memory and turns a single timeline
//! cursor into everything a view needs to draw:
//! 1. **Signals**: named time series with their own timestamps
//! 2. **Timeline**: a common time axis, a clamped cursor and timed playback
//! 3. **Robot pose**: joint/base state at the cursor, forward kinematics over a URDF

pub mod cursor;
pub mod error;
pub mod frame;
pub mod log_file;
pub mod model_locator;
pub mod palette;
pub mod playback;
pub mod robot_model;
pub mod robot_state;
pub mod signals;
pub mod snapshot;

#[cfg(feature = "visualization")]
pub mod visualization;

// Re-export key types for convenience
pub use cursor::Cursor;
pub use error::{LoadError, ModelError, SnapshotError};
pub use frame::{CurveValue, FrameSnapshot};
pub use log_file::{MatVersion, RobotLog, TimeAxis, DEFAULT_ROOT_NAME};
pub use model_locator::ModelLocator;
pub use palette::{ColorPalette, Rgb};
pub use playback::{Playback, PlaybackState};
pub use robot_model::{LinkPose, LinkVisual, RobotModel, VisualGeometry};
pub use robot_state::{Arrow, OverlayKind, Overlays, RobotState, RobotStatePaths};
pub use signals::{CurveKey, Signal, SignalNode, SignalPath, SignalTree};
pub use snapshot::ViewSnapshot;
