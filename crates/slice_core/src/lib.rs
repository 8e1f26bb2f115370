//! Commit selection and analysis dispatch engine for git-slice.
//!
//! This crate walks a repository's history, decides which commits to analyse
//! and runs one containerised analysis per selected commit on a worker pool.
//! It is embedded by the `git-slice` CLI, which supplies the git-backed
//! [`History`] and the container [`Executor`].
//!
//! # Main Types
//!
//! - [`Config`] - Run configuration loaded from `git-slice.toml`
//! - [`Selector`] - Single-pass filter turning commits into [`AnalysisTask`]s
//! - [`AnalysisMapping`] - Per-commit image and command with ancestor fallback
//! - [`Dispatcher`] - Non-blocking task submission with one completion barrier
//!
//! # Error Handling
//!
//! This crate uses [`thiserror`] for structured, typed errors:
//!
//! - [`ConfigError`] - Configuration loading and validation failures
//! - [`RepositoryError`] - Revision walk and object lookup failures
//! - [`ExecutionError`] - Failures of a single analysis task
//! - [`SliceError`] - Top-level error enum combining the above
//!
//! The CLI crate (`slice_cli`) uses `anyhow` for error propagation.

/// Per-commit analysis images and commands.
pub mod analysis;
/// Commits and the repository history interface.
pub mod commit;
/// Run configuration loaded from `git-slice.toml`.
pub mod config;
/// Diff summary line parsing.
pub mod diffstat;
/// Task dispatch onto a worker pool.
pub mod dispatch;
/// Compact duration parsing.
pub mod duration;
/// Error types for execution and the combined top-level error.
pub mod error;
/// Commit filters from the `[filters]` table.
pub mod filter;
/// Common re-exports for internal use.
pub mod prelude;
/// Numeric range expressions.
pub mod range;
/// Revision ranges and `git rev-list` arguments.
pub mod revision;
/// The commit selection pipeline.
pub mod selection;
/// Analysis tasks produced by selection.
pub mod task;
#[cfg(test)]
pub(crate) mod test_utils;
pub(crate) mod text;

pub use analysis::{AnalysisMapping, AnalysisSpec, AncestorOrder, Ancestors, DEFAULT_KEY};
pub use commit::{Commit, CommitStream, History, RepositoryError};
pub use config::{Config, ConfigError, RepositoryType};
pub use diffstat::DiffStat;
pub use dispatch::{
    Bind, Completion, DispatchOptions, Dispatcher, ExecutionPlan, Executor, TaskOutcome, dispatch, render_output_name,
    run_task,
};
pub use duration::parse_delta;
pub use error::{ExecutionError, SliceError};
pub use filter::{ChangeFilters, ChangeKind, FilterSpec, file_type_changed};
pub use range::{RangeClauseError, RangeExpression, evaluate};
pub use revision::{RevArg, RevisionArgs, RevisionQuery};
pub use selection::{Rejection, Selection, SelectionState, SelectionStats, Selector, Verdict};
pub use task::AnalysisTask;

/// Default filename for git-slice configuration.
pub const CONFIG_FILENAME: &str = "git-slice.toml";
