//! Production implementation of ViewerContext.

use crate::{EnvError, ViewerContext};
use std::env::VarError;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Production context backed by the OS clock and process environment.
pub struct SystemContext {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl SystemContext {
    /// Creates a new SystemContext.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Creates an Arc-wrapped context for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for SystemContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewerContext for SystemContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn try_var(&self, name: &str) -> Result<Option<String>, EnvError> {
        match std::env::var(name) {
            Ok(value) => Ok(Some(value)),
            Err(VarError::NotPresent) => Ok(None),
            Err(VarError::NotUnicode(_)) => Err(EnvError::NotUnicode(name.to_string())),
        }
    }
}
