//! Error types for supergraph-core.

use thiserror::Error;

/// Result type alias for supergraph operations.
pub type Result<T> = std::result::Result<T, SupergraphError>;

/// Errors that can occur while extracting or superimposing graphs.
#[derive(Error, Debug)]
pub enum SupergraphError {
    /// The root handed to the scanner does not exist.
    #[error("Path does not exist: {path}")]
    RootNotFound {
        /// Path that was requested.
        path: String,
    },

    /// A single file could not be parsed by the in-process backend.
    ///
    /// Never aborts a project scan; the dispatcher downgrades the file to
    /// the regex backend and counts it.
    #[error("Failed to parse {path}: {message}")]
    FileParse {
        /// Relative path of the file.
        path: String,
        /// Parser diagnostic.
        message: String,
    },

    /// The external semantic backend could not be started or exited non-zero.
    #[error("Semantic backend failed ({status}): {stderr}")]
    BackendInvocation {
        /// Exit status or spawn failure description.
        status: String,
        /// Captured stderr (possibly truncated).
        stderr: String,
    },

    /// The external semantic backend produced output that is not a graph.
    #[error("Semantic backend returned malformed output: {message}")]
    BackendOutput {
        /// Deserialization diagnostic.
        message: String,
    },

    /// The external semantic backend exceeded its time budget and was killed.
    #[error("Semantic backend timed out after {seconds}s")]
    BackendTimeout {
        /// Configured timeout in seconds.
        seconds: u64,
    },

    /// A patch could not be produced for a marker.
    #[error("Patch generation failed for {path}: {message}")]
    PatchGeneration {
        /// File that could not be diffed.
        path: String,
        /// Description of the failure.
        message: String,
    },

    /// No snapshot is stored for the requested project and repo.
    #[error("No graph stored for project '{project}', repo '{repo}'")]
    RepoNotFound {
        /// Project name.
        project: String,
        /// Repo identifier.
        repo: String,
    },

    /// Extraction was cancelled before results were committed.
    #[error("Extraction cancelled")]
    Cancelled,

    /// IO error reading sources.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SupergraphError {
    /// True for errors raised by the external semantic backend, which callers
    /// recover from by falling back to the in-process pipeline.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            SupergraphError::BackendInvocation { .. }
                | SupergraphError::BackendOutput { .. }
                | SupergraphError::BackendTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SupergraphError::RepoNotFound {
            project: "shop".to_string(),
            repo: "left".to_string(),
        };
        assert!(err.to_string().contains("shop"));
        assert!(err.to_string().contains("left"));

        let err = SupergraphError::BackendTimeout { seconds: 600 };
        assert!(err.to_string().contains("600"));
    }

    #[test]
    fn test_backend_failure_classification() {
        assert!(SupergraphError::BackendOutput {
            message: "eof".to_string()
        }
        .is_backend_failure());
        assert!(!SupergraphError::Cancelled.is_backend_failure());
    }
}
