//! Lazy reader over `git rev-list` output.

use std::io::{self, BufRead as _, BufReader, Lines, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Stdio};
use std::thread::{self, JoinHandle};

use slice_core::{Commit, RepositoryError, RevisionQuery};

use super::LocalRepo;

/// Streams commits from a running `git rev-list`, one id per line.
///
/// The child process is killed if the stream is dropped before the end, as
/// happens when selection stops at its limit.
#[derive(Debug)]
pub struct RevList<'r> {
    repo: &'r LocalRepo,
    target: String,
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    stderr: Option<JoinHandle<io::Result<String>>>,
    finished: bool,
}

impl<'r> RevList<'r> {
    /// Starts `git rev-list` for `query`.
    pub fn spawn(repo: &'r LocalRepo, git_dir: &Path, query: &RevisionQuery) -> Result<Self, RepositoryError> {
        let argv = query.to_rev_list_args();
        tracing::debug!(?argv, "starting git rev-list");

        let mut child = super::git_command(git_dir)
            .arg("rev-list")
            .args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RepositoryError::backend("starting git rev-list", e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RepositoryError::backend("starting git rev-list", "stdout was not captured"))?;

        let stderr = child.stderr.take().map(drain);

        Ok(Self {
            repo,
            target: query.target.clone(),
            child,
            lines: BufReader::new(stdout).lines(),
            stderr,
            finished: false,
        })
    }

    fn finish(&mut self) -> Result<(), RepositoryError> {
        self.finished = true;

        let stderr = match self.stderr.take().map(JoinHandle::join) {
            Some(Ok(read)) => read.map_err(|e| RepositoryError::backend("reading git rev-list errors", e))?,
            Some(Err(_panic)) => {
                return Err(RepositoryError::backend("reading git rev-list errors", "reader thread panicked"));
            }
            None => String::new(),
        };

        let status = self
            .child
            .wait()
            .map_err(|e| RepositoryError::backend("waiting for git rev-list", e))?;

        if status.success() {
            return Ok(());
        }

        let message = stderr.trim();
        if message.contains("unknown revision") || message.contains("bad revision") {
            return Err(RepositoryError::UnknownRevision {
                revision: self.target.clone(),
            });
        }

        Err(RepositoryError::backend(
            "git rev-list",
            format!("{status}: {message}"),
        ))
    }
}

/// Reads `pipe` to the end on its own thread.
fn drain(mut pipe: impl Read + Send + 'static) -> JoinHandle<io::Result<String>> {
    thread::spawn(move || {
        let mut text = String::new();
        pipe.read_to_string(&mut text)?;
        Ok(text)
    })
}

impl Iterator for RevList<'_> {
    type Item = Result<Commit, RepositoryError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            match self.lines.next() {
                Some(Ok(line)) => {
                    let id = line.trim();
                    if id.is_empty() {
                        continue;
                    }
                    return Some(
                        self.repo
                            .commit(id)
                            .map_err(|e| RepositoryError::backend(format!("reading commit {id}"), e)),
                    );
                }
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(RepositoryError::backend("reading git rev-list output", e)));
                }
                None => return self.finish().err().map(Err),
            }
        }
        None
    }
}

impl Drop for RevList<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
