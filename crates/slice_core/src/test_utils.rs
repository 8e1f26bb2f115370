//! Test utilities for `slice_core` (compiled only during testing).

use std::cell::Cell;
use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, TimeDelta, TimeZone};

use crate::analysis::AnalysisSpec;
use crate::commit::{Commit, CommitStream, History, RepositoryError};
use crate::diffstat::DiffStat;
use crate::revision::RevisionQuery;

/// Returns a fixed base time shifted by `hours`.
pub fn at(hours: i64) -> DateTime<FixedOffset> {
    let base = FixedOffset::east_opt(3600)
        .unwrap()
        .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
        .unwrap();
    base + TimeDelta::hours(hours)
}

pub fn commit(id: &str, time: DateTime<FixedOffset>, parents: &[&str]) -> Commit {
    Commit {
        id: id.to_string(),
        time,
        parents: parents.iter().map(ToString::to_string).collect(),
    }
}

pub fn spec(image: &str, command: &str) -> AnalysisSpec {
    AnalysisSpec {
        image: image.to_string(),
        command: command.to_string(),
    }
}

/// In-memory history that yields commits in insertion order.
#[derive(Debug, Default)]
pub struct FakeHistory {
    order: Vec<String>,
    commits: HashMap<String, Commit>,
    stats: HashMap<String, DiffStat>,
    files: HashMap<String, Vec<String>>,
    pub diff_calls: Cell<usize>,
}

impl FakeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_commit(mut self, id: &str, time: DateTime<FixedOffset>, parents: &[&str]) -> Self {
        self.order.push(id.to_string());
        self.commits.insert(id.to_string(), commit(id, time, parents));
        self
    }

    pub fn with_changes(mut self, id: &str, stat: DiffStat, files: &[&str]) -> Self {
        self.stats.insert(id.to_string(), stat);
        self.files
            .insert(id.to_string(), files.iter().map(ToString::to_string).collect());
        self
    }

    pub fn commit(&self, id: &str) -> Commit {
        self.commits[id].clone()
    }
}

impl History for FakeHistory {
    fn commits<'a>(&'a self, _query: &RevisionQuery) -> Result<CommitStream<'a>, RepositoryError> {
        Ok(Box::new(self.order.iter().map(|id| Ok(self.commits[id].clone()))))
    }

    fn parents(&self, id: &str) -> Result<Vec<String>, RepositoryError> {
        self.commits
            .get(id)
            .map(|c| c.parents.clone())
            .ok_or_else(|| RepositoryError::UnknownRevision { revision: id.to_string() })
    }

    fn diff_stat(&self, commit: &Commit) -> Result<DiffStat, RepositoryError> {
        self.diff_calls.set(self.diff_calls.get() + 1);
        Ok(self.stats.get(&commit.id).copied().unwrap_or_default())
    }

    fn changed_files(&self, commit: &Commit) -> Result<Vec<String>, RepositoryError> {
        Ok(self.files.get(&commit.id).cloned().unwrap_or_default())
    }
}
