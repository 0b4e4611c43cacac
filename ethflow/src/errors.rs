//! Error types for ethflow operations.
//!
//! The taxonomy mirrors the failure semantics of the pipeline: fatal load
//! and lock errors propagate, per-item deployment and dispatch errors are
//! collected by their callers, and lookup failures carry enough context to
//! suggest alternatives to the user.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for ethflow operations.
#[derive(Debug, Error)]
pub enum EthflowError {
    /// The dataset file was absent when a load was attempted.
    #[error("dataset file not found: {}", path.display())]
    MissingInput {
        /// Path that was expected to hold the dataset.
        path: PathBuf,
    },

    /// The dataset file could not be decoded into a transaction graph.
    #[error("failed to deserialize graph dataset at {}: {message}", path.display())]
    Deserialization {
        /// Path of the offending file.
        path: PathBuf,
        /// Decoder error description.
        message: String,
    },

    /// The warehouse file lock was still held after the retry budget.
    #[error("warehouse lock still held after {attempts} attempts: {message}")]
    LockContention {
        /// Number of connection attempts made.
        attempts: u32,
        /// Underlying lock error description.
        message: String,
    },

    /// A warehouse operation failed for a reason other than lock contention.
    #[error("warehouse error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A single deployment submission was rejected by the orchestrator.
    #[error("failed to submit deployment '{deployment}': {message}")]
    Submission {
        /// Derived deployment name that was being submitted.
        deployment: String,
        /// Server or transport error description.
        message: String,
    },

    /// No registered flow matched the requested name or alias.
    #[error("no flow matches '{query}'")]
    FlowNotFound {
        /// The name the user asked for.
        query: String,
        /// Every alias the registry knows about, for suggestions.
        known: Vec<String>,
    },

    /// A flow invocation failed; caught at the dispatch boundary.
    #[error("flow '{flow}' failed: {message}")]
    FlowExecution {
        /// Declared name of the failing flow.
        flow: String,
        /// Failure description.
        message: String,
    },

    /// An orchestrator request failed at the transport level.
    #[error("orchestrator request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A compute session operation failed.
    #[error("compute session error: {message}")]
    Compute {
        /// Gateway or session error description.
        message: String,
    },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EthflowError {
    /// Creates a flow execution error from any displayable cause.
    #[must_use]
    pub fn flow_execution(flow: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::FlowExecution {
            flow: flow.into(),
            message: cause.to_string(),
        }
    }

    /// Creates a compute session error.
    #[must_use]
    pub fn compute(message: impl Into<String>) -> Self {
        Self::Compute {
            message: message.into(),
        }
    }

    /// Whether the underlying failure is a warehouse file-lock conflict.
    ///
    /// Used by the connection layer to decide between retrying and
    /// propagating immediately.
    #[must_use]
    pub fn is_lock_conflict(&self) -> bool {
        match self {
            Self::Database(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            Self::LockContention { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_not_found_display() {
        let err = EthflowError::FlowNotFound {
            query: "nope".to_string(),
            known: vec!["kaggle_data_prep".to_string()],
        };
        assert_eq!(err.to_string(), "no flow matches 'nope'");
    }

    #[test]
    fn test_lock_conflict_detection() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".to_string()),
        );
        assert!(EthflowError::Database(busy).is_lock_conflict());

        let err = EthflowError::compute("gateway unreachable");
        assert!(!err.is_lock_conflict());
    }

    #[test]
    fn test_deserialization_names_path() {
        let err = EthflowError::Deserialization {
            path: PathBuf::from("/data/raw/kaggle/MulDiGraph.bin"),
            message: "unexpected end of file".to_string(),
        };
        assert!(err.to_string().contains("MulDiGraph.bin"));
    }
}
