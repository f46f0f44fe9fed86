// src/error.rs

//! Error types shared across the pantry library
//!
//! Every lifecycle failure is reported with the package reference, the
//! package ID and the stage that failed, wrapped around the underlying
//! error kind.

use crate::recipe::kitchen::{LifecycleState, Stage};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the pantry [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while loading, identifying, laying out and cooking recipes
#[derive(Debug, Error)]
pub enum Error {
    /// A setting or option is missing or has an invalid value
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The recipe's package_id hook failed
    #[error("Package ID computation failed: {0}")]
    IdentityComputationError(String),

    /// A layout directory could not be created or locked
    #[error("Layout error at {}: {reason}", path.display())]
    LayoutError { path: PathBuf, reason: String },

    /// An external toolchain step returned non-zero or could not run
    #[error("Build failed: {0}")]
    BuildFailure(String),

    /// Packaging produced no artifacts, or a required copy rule matched nothing
    #[error("Packaging failed: {0}")]
    PackagingFailure(String),

    /// Malformed recipe, profile or reference
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    /// Published package info is written once per identity
    #[error("Package {reference}:{package_id} is already published")]
    AlreadyPublished {
        reference: String,
        package_id: String,
    },

    /// The cook was cancelled by the orchestrator
    #[error("Cancelled")]
    Cancelled,

    /// A lifecycle stage failed for one package identity
    #[error("{reference}:{package_id} failed during {stage}: {source}")]
    Lifecycle {
        reference: String,
        package_id: String,
        stage: Stage,
        #[source]
        source: Box<Error>,
        /// States the cook passed through, ending in `FAILED`
        history: Vec<LifecycleState>,
    },
}

impl Error {
    /// Create a layout error for a path
    pub fn layout(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::LayoutError {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// The stage that failed, if this is a lifecycle error
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Lifecycle { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// State history of a failed cook
    pub fn history(&self) -> Option<&[LifecycleState]> {
        match self {
            Self::Lifecycle { history, .. } => Some(history),
            _ => None,
        }
    }

    /// The underlying error kind, unwrapping lifecycle context
    pub fn root_cause(&self) -> &Error {
        match self {
            Self::Lifecycle { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_error_display() {
        let err = Error::Lifecycle {
            reference: "glad/2.0.8".to_string(),
            package_id: "abcd".to_string(),
            stage: Stage::Build,
            source: Box::new(Error::BuildFailure("cmake exited with 2".to_string())),
            history: vec![
                LifecycleState::Declared,
                LifecycleState::LaidOut,
                LifecycleState::Configured,
                LifecycleState::Failed,
            ],
        };

        let msg = err.to_string();
        assert!(msg.contains("glad/2.0.8:abcd"));
        assert!(msg.contains("build"));
        assert!(msg.contains("cmake exited with 2"));
        assert_eq!(err.stage(), Some(Stage::Build));
        assert!(matches!(err.root_cause(), Error::BuildFailure(_)));
        assert_eq!(err.history().unwrap().last(), Some(&LifecycleState::Failed));
    }

    #[test]
    fn test_root_cause_of_plain_error() {
        let err = Error::Cancelled;
        assert!(matches!(err.root_cause(), Error::Cancelled));
        assert!(err.stage().is_none());
        assert!(err.history().is_none());
    }
}
