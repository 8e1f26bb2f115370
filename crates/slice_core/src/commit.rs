//! Commits and the repository interface the selection pipeline walks.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::diffstat::DiffStat;
use crate::revision::RevisionQuery;

const SHORT_HASH_LENGTH: usize = 7;

/// A commit as observed during traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commit {
    /// Full hex object id.
    pub id: String,
    /// Committer timestamp with the committer's UTC offset.
    pub time: DateTime<FixedOffset>,
    /// Parent ids in recorded order. Empty for a root commit.
    pub parents: Vec<String>,
}

impl Commit {
    /// Returns the abbreviated id (first 7 characters).
    #[must_use]
    pub fn short_id(&self) -> &str {
        self.id.get(..SHORT_HASH_LENGTH).unwrap_or(&self.id)
    }

    /// Returns `true` for commits with two or more parents.
    #[must_use]
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Returns the first parent, or `None` for a root commit.
    #[must_use]
    pub fn first_parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }
}

/// Boxed commit stream yielded by [`History::commits`].
pub type CommitStream<'a> = Box<dyn Iterator<Item = Result<Commit, RepositoryError>> + 'a>;

/// Read access to a repository's history.
///
/// Implementations own how commits are found and diffed; the pipeline only
/// relies on the order of [`History::commits`] and on the counts and paths
/// reported for each commit.
pub trait History {
    /// Streams the commits selected by `query`, in the repository's native
    /// traversal order.
    fn commits<'a>(&'a self, query: &RevisionQuery) -> Result<CommitStream<'a>, RepositoryError>;

    /// Returns the parent ids of the commit with `id`.
    fn parents(&self, id: &str) -> Result<Vec<String>, RepositoryError>;

    /// Returns change counts between `commit` and its first parent.
    fn diff_stat(&self, commit: &Commit) -> Result<DiffStat, RepositoryError>;

    /// Returns the paths changed between `commit` and its first parent.
    fn changed_files(&self, commit: &Commit) -> Result<Vec<String>, RepositoryError>;
}

/// Errors raised by a [`History`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A revision or object id could not be resolved.
    #[error("cannot resolve revision '{revision}'")]
    UnknownRevision {
        /// The revision that failed to resolve.
        revision: String,
    },

    /// The underlying repository backend failed.
    #[error("{operation} failed: {source}")]
    Backend {
        /// Short description of what was being attempted.
        operation: String,
        /// The backend error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RepositoryError {
    /// Wraps a backend error with a description of the failed operation.
    pub fn backend(operation: impl Into<String>, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend {
            operation: operation.into(),
            source: source.into(),
        }
    }
}
