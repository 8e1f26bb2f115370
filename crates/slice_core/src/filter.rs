//! Commit filters from the `[filters]` configuration table.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::diffstat::DiffStat;
use crate::duration::parse_delta;
use crate::range::{RangeClauseError, RangeExpression};

/// Limits and predicates applied to every commit during selection.
///
/// Every field is optional and an absent field places no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterSpec {
    /// Maximum number of commits to accept.
    #[serde(default)]
    pub limit: Option<usize>,

    /// Accept only every `skip + 1`-th commit that passes the other filters.
    #[serde(default)]
    pub skip: Option<usize>,

    /// Minimum time between consecutive accepted commits, e.g. `"1d12h"`.
    #[serde(default)]
    pub min_delta: Option<String>,

    /// Predicates on the diff against the first parent.
    #[serde(default)]
    pub changes: ChangeFilters,
}

/// Predicates on what a commit changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangeFilters {
    /// Range for the number of files changed.
    #[serde(default)]
    pub files: Option<RangeExpression>,

    /// Range for the number of inserted lines.
    #[serde(default)]
    pub additions: Option<RangeExpression>,

    /// Range for the number of deleted lines.
    #[serde(default)]
    pub deletions: Option<RangeExpression>,

    /// Path suffixes, at least one of which a changed file must end with.
    #[serde(default)]
    pub file_types: Option<Vec<String>>,
}

/// The diff count a range filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Files changed.
    Files,
    /// Inserted lines.
    Additions,
    /// Deleted lines.
    Deletions,
}

impl ChangeKind {
    /// Returns the count this kind refers to.
    #[must_use]
    pub const fn count(self, stat: &DiffStat) -> u64 {
        match self {
            Self::Files => stat.files_changed,
            Self::Additions => stat.additions,
            Self::Deletions => stat.deletions,
        }
    }

    /// Returns the configuration key for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Files => "files",
            Self::Additions => "additions",
            Self::Deletions => "deletions",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FilterSpec {
    /// Parses `min_delta`, returning `None` when it is absent or unparseable.
    #[must_use]
    pub fn min_delta(&self) -> Option<TimeDelta> {
        self.min_delta.as_deref().and_then(parse_delta)
    }

    /// Returns the skip count, treating zero as no skipping.
    #[must_use]
    pub fn skip(&self) -> Option<usize> {
        self.skip.filter(|&n| n > 0)
    }

    /// Collects problems in the lenient parts of the filter so they can be
    /// reported before traversal. None of them stop a run.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(text) = &self.min_delta
            && self.min_delta().is_none()
        {
            warnings.push(format!("min_delta '{text}' is not a delta like '1d2h30m' and will be ignored"));
        }

        for (kind, expr) in self.changes.ranges() {
            warnings.extend(
                expr.validate()
                    .into_iter()
                    .map(|e: RangeClauseError| format!("changes.{kind}: {e}")),
            );
        }

        warnings
    }
}

impl ChangeFilters {
    /// Returns the configured, non-blank range filters.
    pub fn ranges(&self) -> impl Iterator<Item = (ChangeKind, &RangeExpression)> {
        [
            (ChangeKind::Files, self.files.as_ref()),
            (ChangeKind::Additions, self.additions.as_ref()),
            (ChangeKind::Deletions, self.deletions.as_ref()),
        ]
        .into_iter()
        .filter_map(|(kind, expr)| expr.filter(|e| !e.is_unconstrained()).map(|e| (kind, e)))
    }

    /// Returns `true` if any range filter needs diff counts.
    #[must_use]
    pub fn needs_diff_stat(&self) -> bool {
        self.ranges().next().is_some()
    }

    /// Returns the first range filter that `stat` fails, if any.
    #[must_use]
    pub fn first_failing_range(&self, stat: &DiffStat) -> Option<(ChangeKind, &RangeExpression)> {
        self.ranges().find(|(kind, expr)| !expr.matches(kind.count(stat)))
    }

    /// Returns the configured suffixes, or `None` when the list is absent or empty.
    #[must_use]
    pub fn file_types(&self) -> Option<&[String]> {
        self.file_types.as_deref().filter(|types| !types.is_empty())
    }
}

/// Returns `true` if at least one path ends with one of `suffixes`.
///
/// Comparison is an exact, case-sensitive suffix match on the path text, so
/// `"py"` matches `test.py` and also `numpy`, but not `py.log`.
#[must_use]
pub fn file_type_changed<P: AsRef<str>>(changed_files: &[P], suffixes: &[String]) -> bool {
    changed_files
        .iter()
        .any(|path| suffixes.iter().any(|suffix| path.as_ref().ends_with(suffix.as_str())))
}
