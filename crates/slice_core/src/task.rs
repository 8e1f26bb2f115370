//! Analysis tasks: one selected commit paired with its image and command.

use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::Serialize;

use crate::analysis::AnalysisSpec;
use crate::commit::Commit;

/// One unit of analysis work: a commit plus the image and command to run on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisTask {
    /// Full commit id.
    pub commit_id: String,
    /// Committer timestamp.
    pub commit_time: DateTime<FixedOffset>,
    /// Container image reference.
    pub image: String,
    /// Shell command run inside the container.
    pub command: String,
}

impl AnalysisTask {
    /// Creates a task for `commit` using `spec`.
    #[must_use]
    pub fn new(commit: &Commit, spec: &AnalysisSpec) -> Self {
        Self {
            commit_id: commit.id.clone(),
            commit_time: commit.time,
            image: spec.image.clone(),
            command: spec.command.clone(),
        }
    }

    /// Returns the commit time as an ISO 8601 string with offset, e.g.
    /// `2020-01-01T10:00:00+01:00`.
    #[must_use]
    pub fn commit_time_iso(&self) -> String {
        self.commit_time.to_rfc3339_opts(SecondsFormat::Secs, false)
    }
}

impl std::fmt::Display for AnalysisTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {} running {} in {}",
            self.commit_id,
            self.commit_time_iso(),
            self.command,
            self.image
        )
    }
}
