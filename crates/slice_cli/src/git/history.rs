//! [`History`] implementation over a local clone.

use std::path::PathBuf;

use slice_core::{Commit, CommitStream, DiffStat, History, RepositoryError, RevisionQuery};

use super::LocalRepo;
use super::rev_list::RevList;

/// Repository history backed by `git rev-list`, `git diff` and `gix`.
#[derive(Debug)]
pub struct GitHistory {
    repo: LocalRepo,
    git_dir: PathBuf,
}

impl GitHistory {
    pub(super) const fn new(repo: LocalRepo, git_dir: PathBuf) -> Self {
        Self { repo, git_dir }
    }
}

impl History for GitHistory {
    fn commits<'a>(&'a self, query: &RevisionQuery) -> Result<CommitStream<'a>, RepositoryError> {
        let stream = RevList::spawn(&self.repo, &self.git_dir, query)?;
        Ok(Box::new(stream))
    }

    fn parents(&self, id: &str) -> Result<Vec<String>, RepositoryError> {
        self.repo
            .parents(id)
            .map_err(|e| RepositoryError::backend(format!("reading parents of {id}"), e))
    }

    fn diff_stat(&self, commit: &Commit) -> Result<DiffStat, RepositoryError> {
        let base = self.repo.diff_base(commit);
        let output = super::git_command(&self.git_dir)
            .args(["diff", "--shortstat", &base, &commit.id])
            .output()
            .map_err(|e| RepositoryError::backend("running git diff", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RepositoryError::backend(
                format!("git diff for {}", commit.short_id()),
                format!("{}: {}", output.status, stderr.trim()),
            ));
        }

        let summary = String::from_utf8_lossy(&output.stdout);
        Ok(DiffStat::parse(summary.trim_end()))
    }

    fn changed_files(&self, commit: &Commit) -> Result<Vec<String>, RepositoryError> {
        self.repo
            .changed_files(&commit.id)
            .map_err(|e| RepositoryError::backend(format!("listing changes of {}", commit.short_id()), e))
    }
}
