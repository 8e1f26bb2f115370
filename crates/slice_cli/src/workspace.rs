//! Per-run working directory: repository copy and commit content mount.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::Context as _;
use slice_core::dispatch::COMMITS_BY_HASH;
use slice_core::prelude::*;
use uuid::Uuid;

/// Directories owned by one run, removed again by [`Workspace::teardown`].
///
/// The output directory lives outside the workspace and is never touched.
#[derive(Debug)]
pub struct Workspace {
    instance_id: Uuid,
    working_dir: PathBuf,
    repo_dir: PathBuf,
    mount_dir: PathBuf,
}

impl Workspace {
    /// Creates the working directory and brings the repository into it.
    ///
    /// A remote repository is cloned, a local one is copied. The commit
    /// content mount is only created when tasks will actually run.
    pub fn prepare(config: &Config, dry_run: bool) -> anyhow::Result<Self> {
        let (kind, source) = config.repository()?;

        let instance_id = Uuid::new_v4();
        let working_dir = config.temp_dir.join(instance_id.to_string());
        let workspace = Self {
            instance_id,
            repo_dir: working_dir.join(&config.repo_dir_name),
            mount_dir: working_dir.join(&config.mount_dir_name),
            working_dir,
        };

        tracing::debug!(instance = %workspace.instance_id, dir = %workspace.working_dir.display(), "preparing workspace");

        if let Err(e) = workspace.populate(kind, source, dry_run) {
            workspace.teardown();
            return Err(e);
        }

        Ok(workspace)
    }

    fn populate(&self, kind: RepositoryType, source: &str, dry_run: bool) -> anyhow::Result<()> {
        fs::create_dir_all(&self.working_dir)
            .with_context(|| format!("creating working directory {}", self.working_dir.display()))?;

        match kind {
            RepositoryType::Remote => {
                tracing::info!("repository type is remote, cloning from {source}");
                clone_repo(source, &self.repo_dir)?;
            }
            RepositoryType::Local => {
                tracing::info!("repository type is local, copying from {source} to {}", self.repo_dir.display());
                copy_tree(Path::new(source), &self.repo_dir)?;
            }
        }

        if !dry_run {
            let commits = self.mount_dir.join(COMMITS_BY_HASH);
            fs::create_dir_all(&commits).with_context(|| format!("creating {}", commits.display()))?;
        }

        Ok(())
    }

    /// Returns the unique id of this run.
    #[must_use]
    pub const fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Returns `temp_dir/<instance id>`.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Returns the directory holding the repository copy.
    #[must_use]
    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    /// Removes the working directory and everything in it.
    ///
    /// Failures are logged rather than returned so teardown can run on every
    /// exit path.
    pub fn teardown(&self) {
        tracing::debug!(dir = %self.working_dir.display(), "removing working directory");

        if let Err(e) = fs::remove_dir_all(&self.working_dir)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!("failed to remove {}: {e}", self.working_dir.display());
        }
    }
}

fn clone_repo(source: &str, dest: &Path) -> anyhow::Result<()> {
    let output = Command::new("git")
        .arg("clone")
        .arg("--quiet")
        .arg(source)
        .arg(dest)
        .stdin(Stdio::null())
        .output()
        .context("failed to run git clone")?;

    if !output.status.success() {
        anyhow::bail!(
            "git clone of {source} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(())
}

/// Recursively copies `source` into `dest`, including hidden and ignored
/// files. Symlinks are recreated, not followed.
fn copy_tree(source: &Path, dest: &Path) -> anyhow::Result<()> {
    if !source.is_dir() {
        anyhow::bail!("repository source {} is not a directory", source.display());
    }

    let walker = ignore::WalkBuilder::new(source)
        .standard_filters(false)
        .follow_links(false)
        .build();

    for entry in walker {
        let entry = entry.context("walking repository source")?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .context("walked outside the repository source")?;
        let target = dest.join(relative);

        let Some(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            fs::create_dir_all(&target).with_context(|| format!("creating {}", target.display()))?;
        } else if file_type.is_symlink() {
            copy_link(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| format!("copying {}", entry.path().display()))?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_link(link: &Path, target: &Path) -> anyhow::Result<()> {
    let points_to = fs::read_link(link).with_context(|| format!("reading link {}", link.display()))?;
    std::os::unix::fs::symlink(points_to, target).with_context(|| format!("linking {}", target.display()))
}

#[cfg(not(unix))]
fn copy_link(link: &Path, target: &Path) -> anyhow::Result<()> {
    fs::copy(link, target).with_context(|| format!("copying {}", link.display()))?;
    Ok(())
}
