use thiserror::Error;

use crate::Path;

/// A failure tied to a location within a value, such as a conversion that
/// could not handle one nested element.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PathError {
    pub path: Path,
    pub message: String,
}

impl PathError {
    pub fn new(path: Path, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseNumberError {
    #[error("a number is required")]
    Empty,
    #[error("invalid number syntax {0:?}")]
    Syntax(String),
    #[error("exponent of {0:?} is out of range")]
    ExponentOutOfRange(String),
}
