//! Errors raised while running analyses, and the crate-wide error.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while running one analysis task.
///
/// A failed task never affects the other tasks of the same run.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The commit's files could not be staged for the container.
    #[error("failed to stage commit {commit}: {source}")]
    Stage {
        /// Commit being staged.
        commit: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The container runtime could not be started.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        /// Program that was executed.
        program: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The container ran but exited unsuccessfully.
    #[error("analysis of {commit} exited with {status}")]
    Failed {
        /// Commit that was analysed.
        commit: String,
        /// Exit status as reported by the platform.
        status: String,
    },

    /// The task's output file could not be created or written.
    #[error("failed to write output {}: {source}", path.display())]
    Output {
        /// Output file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The worker pool could not be created.
    #[error("failed to start worker pool: {0}")]
    Pool(#[source] rayon::ThreadPoolBuildError),
}

impl ExecutionError {
    /// Wraps an error raised while staging `commit`.
    pub fn stage(commit: impl Into<String>, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Stage {
            commit: commit.into(),
            source: source.into(),
        }
    }
}

/// Top-level error type for a git-slice run.
///
/// Unifies configuration, repository and execution errors for callers that
/// orchestrate the full workflow.
#[derive(Debug, Error)]
pub enum SliceError {
    /// Configuration could not be read, parsed or validated.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// The repository could not be walked or queried.
    #[error(transparent)]
    Repository(#[from] crate::commit::RepositoryError),

    /// An analysis task failed.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}
