//! Deterministic context for tests and offline rendering.

use crate::{EnvError, ViewerContext};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Context with a virtual clock and a fixed set of variables.
///
/// The clock only moves through [`ManualContext::advance_time`]. Clones share
/// the clock, so a test can hold one handle while the code under test holds
/// another.
pub struct ManualContext {
    /// Current virtual time (nanoseconds since creation)
    virtual_time_ns: Arc<Mutex<u64>>,

    /// Environment seen by the code under test
    vars: HashMap<String, String>,
}

impl ManualContext {
    /// Creates a context at time zero with no variables.
    pub fn new() -> Self {
        Self {
            virtual_time_ns: Arc::new(Mutex::new(0)),
            vars: HashMap::new(),
        }
    }

    /// Adds a variable.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Advances virtual time by the given duration.
    pub fn advance_time(&self, duration: Duration) {
        let mut time = self.lock_time();
        *time += duration.as_nanos() as u64;
    }

    /// Returns the current virtual time in nanoseconds.
    pub fn time_ns(&self) -> u64 {
        *self.lock_time()
    }

    fn lock_time(&self) -> std::sync::MutexGuard<'_, u64> {
        // A poisoned clock still holds a valid counter.
        self.virtual_time_ns
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ManualContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ManualContext {
    fn clone(&self) -> Self {
        Self {
            virtual_time_ns: Arc::clone(&self.virtual_time_ns),
            vars: self.vars.clone(),
        }
    }
}

impl ViewerContext for ManualContext {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.time_ns())
    }

    fn try_var(&self, name: &str) -> Result<Option<String>, EnvError> {
        Ok(self.vars.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_context_time() {
        let ctx = ManualContext::new();
        assert_eq!(ctx.now(), Duration::ZERO);

        ctx.advance_time(Duration::from_secs(1));
        assert_eq!(ctx.now(), Duration::from_secs(1));

        ctx.advance_time(Duration::from_millis(500));
        assert_eq!(ctx.now(), Duration::from_millis(1500));
    }

    #[test]
    fn test_manual_context_clone_shares_time() {
        let ctx1 = ManualContext::new();
        let ctx2 = ctx1.clone();

        ctx1.advance_time(Duration::from_secs(5));

        assert_eq!(ctx1.now(), ctx2.now());
    }

    #[test]
    fn test_manual_context_vars() {
        let ctx = ManualContext::new().with_var("YARP_DATA_DIRS", "/opt/a:/opt/b");
        assert_eq!(ctx.var("YARP_DATA_DIRS").as_deref(), Some("/opt/a:/opt/b"));
        assert_eq!(ctx.var("ROS_PACKAGE_PATH"), None);
    }
}
