//! Error types for the robolog environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    /// Variable is set but its value is not valid unicode
    #[error("Environment variable {0} is not valid unicode")]
    NotUnicode(String),
}
