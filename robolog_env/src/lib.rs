//! robolog Environment Abstraction Layer
//!
//! Everything the viewer reads from "outside" the log file goes through
//! this crate:
//! - Time (`now()`), which drives playback
//! - Environment variables (`var()`), which drive robot model lookup
//!
//! Production code uses [`SystemContext`]. Tests use [`ManualContext`],
//! whose clock only moves when told to and whose variables are a fixed map,
//! so playback and model lookup are reproducible.
//!
//! # Example
//!
//! ```ignore
//! use robolog_env::{ViewerContext, SearchPath};
//!
//! fn yarp_dirs<Ctx: ViewerContext>(ctx: &Ctx) -> SearchPath {
//!     SearchPath::from_var(ctx, "YARP_DATA_DIRS")
//! }
//! ```

mod context;
mod error;
mod manual;
mod search_path;
mod system_impl;

pub use context::ViewerContext;
pub use error::EnvError;
pub use manual::ManualContext;
pub use search_path::SearchPath;
pub use system_impl::SystemContext;
