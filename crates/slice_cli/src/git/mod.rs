//! Git repository access for commit selection and content staging.

mod history;
mod local;
mod rev_list;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use gix::ThreadSafeRepository;

pub use self::history::GitHistory;
pub use self::local::LocalRepo;

/// Default object cache size for tree diffs (64 MB).
const DEFAULT_CACHE_SIZE: usize = 64 * 1024 * 1024;

/// Thread-safe handle to an opened git repository.
#[derive(Debug, Clone)]
pub struct Repo {
    inner: ThreadSafeRepository,
    cache_size: usize,
    git_dir: PathBuf,
}

impl Repo {
    /// Opens the repository at or above `path`.
    pub fn discover(path: &Path) -> anyhow::Result<Self> {
        let mut repo = gix::discover(path).with_context(|| format!("not a git repository: {}", path.display()))?;
        let cache_size = compute_cache_size(&repo);
        configure_cache(&mut repo, cache_size);
        let git_dir = repo.git_dir().to_path_buf();

        Ok(Self {
            inner: repo.into_sync(),
            cache_size,
            git_dir,
        })
    }

    /// Creates a thread-local repository handle for use within a worker.
    #[must_use]
    pub fn thread_local(&self) -> LocalRepo {
        let mut repo = self.inner.to_thread_local();
        configure_cache(&mut repo, self.cache_size);
        LocalRepo { inner: repo }
    }

    /// Returns a [`slice_core::History`] backed by this repository.
    #[must_use]
    pub fn history(&self) -> GitHistory {
        GitHistory::new(self.thread_local(), self.git_dir.clone())
    }
}

fn compute_cache_size(repo: &gix::Repository) -> usize {
    repo.index_or_empty()
        .map(|idx| repo.compute_object_cache_size_for_tree_diffs(&idx))
        .unwrap_or(DEFAULT_CACHE_SIZE)
}

fn configure_cache(repo: &mut gix::Repository, size: usize) {
    repo.object_cache_size_if_unset(size);
}

/// Builds a `git` command operating on `git_dir`.
fn git_command(git_dir: &Path) -> std::process::Command {
    let mut cmd = std::process::Command::new("git");
    cmd.arg("--git-dir").arg(git_dir);
    cmd
}
