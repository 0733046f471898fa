//! Error kinds shared across the curation pipeline.
//!
//! The set is closed: every failure the core can report is one of the
//! [`CurationError`] variants. Application seams (CLI, config, probing)
//! wrap these in `anyhow` with context.

use std::path::PathBuf;

use thiserror::Error;

/// A name that does not match the canonical grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid canonical name '{name}': {reason}")]
pub struct FormatError {
    /// The rejected name
    pub name: String,

    /// What part of the grammar failed
    pub reason: String,
}

impl FormatError {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Curation failures
#[derive(Debug, Error)]
pub enum CurationError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Invalid metrics for {key}: {reason}")]
    InvalidMetrics { key: String, reason: String },

    #[error("Destination already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CurationError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error should be reported as a skipped action rather than a failure
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::AlreadyExists(_) | Self::InvalidMetrics { .. })
    }
}

pub type CurationResult<T> = std::result::Result<T, CurationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_message() {
        let err = FormatError::new("randomfile.mp4", "missing year segment");
        assert_eq!(
            err.to_string(),
            "Invalid canonical name 'randomfile.mp4': missing year segment"
        );
    }

    #[test]
    fn test_skip_classification() {
        assert!(CurationError::AlreadyExists(PathBuf::from("/a")).is_skip());
        let io = CurationError::io("/a", std::io::Error::other("boom"));
        assert!(!io.is_skip());
    }
}
