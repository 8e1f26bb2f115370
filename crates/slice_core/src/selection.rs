//! The commit selection pipeline.
//!
//! A [`Selector`] makes one pass over the commits of a revision query and
//! decides for each commit, in a fixed order, whether it becomes an
//! [`AnalysisTask`]:
//!
//! 1. limit - stop the traversal once enough commits were accepted
//! 2. minimum delta - reject commits too close to the last accepted one
//! 3. change counts - reject commits whose diff counts fall outside a range
//! 4. file types - reject commits that touch no file with a wanted suffix
//! 5. skip - accept only every `skip + 1`-th commit that got this far
//!
//! The first failing gate decides; later gates are not evaluated.

use chrono::{DateTime, FixedOffset, TimeDelta};
use serde::Serialize;
#[cfg(feature = "tracing")]
use tracing::debug;

use crate::analysis::{AncestorOrder, AnalysisMapping};
use crate::commit::{Commit, History, RepositoryError};
use crate::filter::{ChangeKind, FilterSpec, file_type_changed};
use crate::revision::RevisionQuery;
use crate::task::AnalysisTask;

/// Running state of one selection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    /// Commits accepted so far.
    pub accepted: usize,
    /// Passing commits skipped since the last acceptance.
    pub skip_counter: usize,
    /// Commit time of the last accepted commit.
    pub last_accepted: Option<DateTime<FixedOffset>>,
}

/// Why a commit was not selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The commit is within the minimum delta of the last accepted commit.
    TooSoon {
        /// Commit time of the last accepted commit.
        last_accepted: DateTime<FixedOffset>,
    },
    /// A change count falls outside its configured range.
    OutOfRange {
        /// Which count failed.
        kind: ChangeKind,
        /// The commit's count.
        count: u64,
        /// The range it was tested against.
        expression: String,
    },
    /// No changed file ends with a configured suffix.
    FileTypes,
    /// The commit passed every filter but falls inside the skip interval.
    Skipped {
        /// How many passing commits have been skipped, including this one.
        position: usize,
        /// The configured skip count.
        of: usize,
    },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooSoon { last_accepted } => {
                write!(f, "within minimum delta of commit at {}", last_accepted.to_rfc3339())
            }
            Self::OutOfRange {
                kind,
                count,
                expression,
            } => write!(f, "{count} {kind} not within '{expression}'"),
            Self::FileTypes => f.write_str("no changed file has a selected type"),
            Self::Skipped { position, of } => write!(f, "skipped {position}/{of}"),
        }
    }
}

/// Outcome of running one commit through the gates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The limit is reached; the traversal ends without looking at this commit.
    Stop,
    /// The commit failed a gate.
    Rejected(Rejection),
    /// The commit was selected.
    Accepted(AnalysisTask),
}

/// Counters describing a finished selection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SelectionStats {
    /// Commits looked at, not counting the one that triggered the limit.
    pub examined: usize,
    /// Commits accepted.
    pub accepted: usize,
    /// Commits rejected by the minimum delta.
    pub too_soon: usize,
    /// Commits rejected by a change-count range.
    pub out_of_range: usize,
    /// Commits rejected by the file-type filter.
    pub wrong_file_types: usize,
    /// Passing commits dropped by the skip interval.
    pub skipped: usize,
    /// Whether the traversal ended early because the limit was reached.
    pub hit_limit: bool,
}

impl SelectionStats {
    fn record(&mut self, verdict: &Verdict) {
        match verdict {
            Verdict::Stop => {
                self.hit_limit = true;
                return;
            }
            Verdict::Accepted(_) => self.accepted += 1,
            Verdict::Rejected(Rejection::TooSoon { .. }) => self.too_soon += 1,
            Verdict::Rejected(Rejection::OutOfRange { .. }) => self.out_of_range += 1,
            Verdict::Rejected(Rejection::FileTypes) => self.wrong_file_types += 1,
            Verdict::Rejected(Rejection::Skipped { .. }) => self.skipped += 1,
        }
        self.examined += 1;
    }
}

/// The tasks chosen by a selection pass, in acceptance order.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Accepted commits turned into tasks.
    pub tasks: Vec<AnalysisTask>,
    /// Counters for the pass.
    pub stats: SelectionStats,
}

/// Stateful single-pass filter over a repository's commits.
///
/// A selector owns its [`SelectionState`]; independent runs each build
/// their own selector and never share state.
#[derive(Debug)]
pub struct Selector<'a, H: ?Sized> {
    history: &'a H,
    filters: &'a FilterSpec,
    mapping: &'a AnalysisMapping,
    order: AncestorOrder,
    min_delta: Option<TimeDelta>,
    state: SelectionState,
}

impl<'a, H: History + ?Sized> Selector<'a, H> {
    /// Creates a selector with fresh state.
    #[must_use]
    pub fn new(history: &'a H, filters: &'a FilterSpec, mapping: &'a AnalysisMapping) -> Self {
        Self {
            history,
            filters,
            mapping,
            order: AncestorOrder::default(),
            min_delta: filters.min_delta(),
            state: SelectionState::default(),
        }
    }

    /// Sets the ancestor order used to resolve analysis entries.
    #[must_use]
    pub const fn with_ancestor_order(mut self, order: AncestorOrder) -> Self {
        self.order = order;
        self
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Walks `query` and returns every accepted commit as a task.
    ///
    /// Repository errors abort the pass. An empty selection is not an error.
    pub fn run(self, query: &RevisionQuery) -> Result<Selection, RepositoryError> {
        let mut tasks = Vec::new();
        let stats = self.run_with(query, |task| tasks.push(task))?;
        Ok(Selection { tasks, stats })
    }

    /// Walks `query`, handing each accepted task to `on_accept` as soon as it
    /// is selected.
    pub fn run_with(
        mut self,
        query: &RevisionQuery,
        mut on_accept: impl FnMut(AnalysisTask),
    ) -> Result<SelectionStats, RepositoryError> {
        let mut stats = SelectionStats::default();

        for commit in self.history.commits(query)? {
            let commit = commit?;
            let verdict = self.classify(&commit)?;
            stats.record(&verdict);

            match verdict {
                Verdict::Stop => break,
                Verdict::Accepted(task) => on_accept(task),
                Verdict::Rejected(_) => {}
            }
        }

        #[cfg(feature = "tracing")]
        debug!(?stats, "selection finished");

        Ok(stats)
    }

    /// Runs `commit` through the gates, updating state on acceptance and on
    /// skip.
    pub fn classify(&mut self, commit: &Commit) -> Result<Verdict, RepositoryError> {
        if self.filters.limit.is_some_and(|limit| self.state.accepted >= limit) {
            #[cfg(feature = "tracing")]
            debug!(limit = self.filters.limit, "hit commit limit");
            return Ok(Verdict::Stop);
        }

        #[cfg(feature = "tracing")]
        debug!(commit = %commit.id, "testing commit");

        if let Some(rejection) = self.check_delta(commit) {
            return Ok(rejected(commit, rejection));
        }

        if let Some(rejection) = self.check_changes(commit)? {
            return Ok(rejected(commit, rejection));
        }

        if let Some(skip) = self.filters.skip()
            && self.state.skip_counter != skip
        {
            self.state.skip_counter += 1;
            let rejection = Rejection::Skipped {
                position: self.state.skip_counter,
                of: skip,
            };
            return Ok(rejected(commit, rejection));
        }

        let spec = self.mapping.resolve_commit(commit, self.history, self.order)?;
        let task = AnalysisTask::new(commit, spec);

        self.state.accepted += 1;
        self.state.skip_counter = 0;
        self.state.last_accepted = Some(commit.time);

        #[cfg(feature = "tracing")]
        debug!(commit = %commit.id, image = %task.image, "commit matches all filters and is selected");

        Ok(Verdict::Accepted(task))
    }

    fn check_delta(&self, commit: &Commit) -> Option<Rejection> {
        let delta = self.min_delta?;
        let last_accepted = self.state.last_accepted?;
        let threshold = last_accepted.checked_sub_signed(delta)?;

        (threshold < commit.time).then_some(Rejection::TooSoon { last_accepted })
    }

    fn check_changes(&self, commit: &Commit) -> Result<Option<Rejection>, RepositoryError> {
        let changes = &self.filters.changes;

        if changes.needs_diff_stat() {
            let stat = self.history.diff_stat(commit)?;

            #[cfg(feature = "tracing")]
            debug!(commit = %commit.id, %stat, "diff stat");

            if let Some((kind, expr)) = changes.first_failing_range(&stat) {
                return Ok(Some(Rejection::OutOfRange {
                    kind,
                    count: kind.count(&stat),
                    expression: expr.to_string(),
                }));
            }
        }

        if let Some(types) = changes.file_types() {
            let files = self.history.changed_files(commit)?;
            if !file_type_changed(&files, types) {
                return Ok(Some(Rejection::FileTypes));
            }
        }

        Ok(None)
    }
}

#[cfg_attr(not(feature = "tracing"), expect(unused_variables, reason = "only logged"))]
fn rejected(commit: &Commit, rejection: Rejection) -> Verdict {
    #[cfg(feature = "tracing")]
    debug!(commit = %commit.id, reason = %rejection, "commit deselected");

    Verdict::Rejected(rejection)
}
