//! Thread-local git repository operations.

use std::fs;
use std::path::Path;

use anyhow::Context as _;
use chrono::{DateTime, FixedOffset, Offset as _, Utc};
use gix::bstr::ByteSlice as _;
use gix::objs::tree::EntryKind;
use slice_core::Commit;

/// Non-`Send` repository handle for single-threaded git operations.
#[derive(Debug)]
pub struct LocalRepo {
    pub(super) inner: gix::Repository,
}

impl LocalRepo {
    /// Looks up a commit by full hex id.
    pub fn commit(&self, id: &str) -> anyhow::Result<Commit> {
        let commit = self.find_commit(id)?;
        let time = commit.time().with_context(|| format!("reading committer time of {id}"))?;

        let offset = FixedOffset::east_opt(time.offset).unwrap_or_else(|| Utc.fix());
        let time = DateTime::from_timestamp(time.seconds, 0)
            .with_context(|| format!("commit {id} has an out-of-range timestamp"))?
            .with_timezone(&offset);

        Ok(Commit {
            id: commit.id().to_string(),
            time,
            parents: commit.parent_ids().map(|p| p.to_string()).collect(),
        })
    }

    /// Returns the parent ids of `id` in recorded order.
    pub fn parents(&self, id: &str) -> anyhow::Result<Vec<String>> {
        let commit = self.find_commit(id)?;
        Ok(commit.parent_ids().map(|p| p.to_string()).collect())
    }

    /// Returns the revision `commit` is diffed against: its first parent, or
    /// the empty tree for a root commit.
    pub fn diff_base(&self, commit: &Commit) -> String {
        commit.first_parent().map_or_else(
            || gix::ObjectId::empty_tree(self.inner.object_hash()).to_string(),
            ToString::to_string,
        )
    }

    /// Returns every path added, modified, renamed or deleted by `id`
    /// relative to its first parent.
    pub fn changed_files(&self, id: &str) -> anyhow::Result<Vec<String>> {
        let commit = self.find_commit(id)?;
        let tree = commit.tree().context("reading commit tree")?;
        let from_tree = match self.first_parent_tree(&commit) {
            Some(parent) => parent,
            None => self.inner.empty_tree(),
        };

        let mut paths = Vec::new();
        let mut changes = from_tree.changes().context("preparing tree diff")?;
        changes
            .for_each_to_obtain_tree(&tree, |change| {
                use gix::object::tree::diff::Change;

                let location = match &change {
                    Change::Addition { location, .. }
                    | Change::Deletion { location, .. }
                    | Change::Modification { location, .. }
                    | Change::Rewrite { location, .. } => location,
                };
                paths.push(location.to_str_lossy().into_owned());

                Ok::<_, std::convert::Infallible>(std::ops::ControlFlow::Continue(()))
            })
            .with_context(|| format!("diffing {id} against its first parent"))?;

        Ok(paths)
    }

    /// Writes the full tree of `id` into `dest`.
    ///
    /// Does nothing when `dest` already exists, so an externally mounted
    /// view of the commit is used as-is.
    pub fn materialize(&self, id: &str, dest: &Path) -> anyhow::Result<()> {
        if dest.exists() {
            return Ok(());
        }

        let tree = self.find_commit(id)?.tree().context("reading commit tree")?;
        let mut recorder = gix::traverse::tree::Recorder::default();
        tree.traverse()
            .breadthfirst(&mut recorder)
            .with_context(|| format!("walking tree of {id}"))?;

        fs::create_dir_all(dest).with_context(|| format!("creating {}", dest.display()))?;

        for entry in recorder.records {
            let path = dest.join(entry.filepath.to_str_lossy().as_ref());

            match entry.mode.kind() {
                EntryKind::Tree | EntryKind::Commit => {
                    fs::create_dir_all(&path).with_context(|| format!("creating {}", path.display()))?;
                }
                EntryKind::Blob | EntryKind::BlobExecutable => {
                    let blob = self.inner.find_blob(entry.oid)?;
                    write_file(&path, &blob.data, entry.mode.kind() == EntryKind::BlobExecutable)?;
                }
                EntryKind::Link => {
                    let blob = self.inner.find_blob(entry.oid)?;
                    write_link(&path, &blob.data)?;
                }
            }
        }

        Ok(())
    }

    fn find_commit(&self, id: &str) -> anyhow::Result<gix::Commit<'_>> {
        let oid = gix::ObjectId::from_hex(id.as_bytes()).with_context(|| format!("invalid commit id '{id}'"))?;
        self.inner
            .find_commit(oid)
            .with_context(|| format!("commit {id} not found"))
    }

    fn first_parent_tree(&self, commit: &gix::Commit<'_>) -> Option<gix::Tree<'_>> {
        commit
            .parent_ids()
            .next()
            .and_then(|pid| self.inner.find_commit(pid).ok())
            .and_then(|pc| pc.tree().ok())
    }
}

fn write_file(path: &Path, data: &[u8], executable: bool) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, data).with_context(|| format!("writing {}", path.display()))?;

    #[cfg(unix)]
    if executable {
        use std::os::unix::fs::PermissionsExt as _;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }
    #[cfg(not(unix))]
    let _ = executable;

    Ok(())
}

fn write_link(path: &Path, target: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    #[cfg(unix)]
    {
        let target = target.to_str_lossy();
        std::os::unix::fs::symlink(target.as_ref(), path).with_context(|| format!("linking {}", path.display()))
    }

    #[cfg(not(unix))]
    {
        fs::write(path, target).with_context(|| format!("writing {}", path.display()))
    }
}
