//! Core environment context trait for the viewer.

use crate::EnvError;
use std::time::Duration;

/// The central interface for environment interaction.
///
/// # Implementations
///
/// - **Production**: `SystemContext` - wraps `Instant` and `std::env`
/// - **Tests**: `ManualContext` - virtual clock and a fixed variable map
pub trait ViewerContext: Send + Sync + 'static {
    /// Returns the monotonic time since context creation.
    ///
    /// Playback measures elapsed time against this clock.
    fn now(&self) -> Duration;

    /// Looks up an environment variable.
    ///
    /// Returns `Ok(None)` when the variable is unset.
    fn try_var(&self, name: &str) -> Result<Option<String>, EnvError>;

    /// Looks up an environment variable, treating non-unicode values as unset.
    fn var(&self, name: &str) -> Option<String> {
        match self.try_var(name) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        }
    }
}
