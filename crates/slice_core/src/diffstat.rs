//! Parsing of `git diff --shortstat` summaries.

use serde::Serialize;

use crate::text::first_integer;

/// Change counts between a commit and its predecessor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStat {
    /// Number of files touched.
    pub files_changed: u64,
    /// Number of inserted lines.
    pub additions: u64,
    /// Number of deleted lines.
    pub deletions: u64,
}

impl DiffStat {
    /// Parses a summary such as `" 2 files changed, 4 insertions(+), 4 deletions(-)"`.
    ///
    /// Each comma-separated segment is classified by the word it contains and
    /// contributes its first integer. Categories that do not appear stay at
    /// zero, as do segments that fit no category.
    #[must_use]
    pub fn parse(summary: &str) -> Self {
        let mut stat = Self::default();

        for segment in summary.split(',') {
            let count = first_integer(segment).unwrap_or(0);

            if segment.contains("changed") {
                stat.files_changed = count;
            } else if segment.contains("insertion") {
                stat.additions = count;
            } else if segment.contains("deletion") {
                stat.deletions = count;
            }
        }

        stat
    }
}

impl std::fmt::Display for DiffStat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} files changed, {} additions, {} deletions",
            self.files_changed, self.additions, self.deletions
        )
    }
}
