//! Container executor running analyses through a Singularity-compatible runtime.

use std::io::{self, BufRead as _, BufReader, Read, Write};
use std::process::{Command, Stdio};

use slice_core::prelude::*;

use crate::git::Repo;

/// Runs each plan as `<runtime> exec ... <image> /bin/sh -c <command>`.
///
/// Before running, the commit's tree is written to the plan's content
/// directory unless something already provides it there.
#[derive(Debug)]
pub struct ContainerExecutor {
    runtime: String,
    repo: Repo,
}

impl ContainerExecutor {
    /// Creates an executor invoking `runtime` and staging content from `repo`.
    #[must_use]
    pub const fn new(runtime: String, repo: Repo) -> Self {
        Self { runtime, repo }
    }

    fn stage(&self, plan: &ExecutionPlan) -> Result<(), ExecutionError> {
        tracing::debug!("expecting {} to contain the commit files", plan.content_dir.display());
        self.repo
            .thread_local()
            .materialize(&plan.commit_id, &plan.content_dir)
            .map_err(|e| ExecutionError::stage(&plan.commit_id, e))
    }
}

impl Executor for ContainerExecutor {
    fn execute(&self, plan: &ExecutionPlan, output: &mut dyn Write) -> Result<(), ExecutionError> {
        self.stage(plan)?;

        let args = plan.runtime_args();
        tracing::debug!(runtime = %self.runtime, ?args, "starting container");

        let mut child = Command::new(&self.runtime)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ExecutionError::Spawn {
                program: self.runtime.clone(),
                source,
            })?;

        if let Some(stdout) = child.stdout.take()
            && let Err(source) = copy_lines(stdout, output)
        {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ExecutionError::Output {
                path: plan.output_path.clone(),
                source,
            });
        }

        let status = child.wait().map_err(|source| ExecutionError::Spawn {
            program: self.runtime.clone(),
            source,
        })?;

        if !status.success() {
            return Err(ExecutionError::Failed {
                commit: plan.commit_id.clone(),
                status: status.to_string(),
            });
        }

        Ok(())
    }
}

/// Copies `source` into `output` line by line as the container produces it.
fn copy_lines(source: impl Read, output: &mut dyn Write) -> io::Result<()> {
    let mut reader = BufReader::new(source);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(());
        }
        tracing::trace!("writing line to output: {}", String::from_utf8_lossy(&line).trim_end());
        output.write_all(&line)?;
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt as _;

    use super::*;

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn output_failure_stops_and_reaps_the_container() {
        let dir = tempfile::tempdir().unwrap();
        let status = Command::new("git").arg("init").arg("--quiet").arg(dir.path()).status().unwrap();
        assert!(status.success());

        let pid_file = dir.path().join("container.pid");
        let runtime = dir.path().join("runtime");
        fs::write(
            &runtime,
            format!("#!/bin/sh\necho $$ > '{}'\necho first\nexec sleep 30\n", pid_file.display()),
        )
        .unwrap();
        fs::set_permissions(&runtime, fs::Permissions::from_mode(0o755)).unwrap();

        let content_dir = dir.path().join("content");
        fs::create_dir_all(&content_dir).unwrap();
        let plan = ExecutionPlan {
            commit_id: "abc".into(),
            image: "img".into(),
            command: vec!["/bin/sh".into(), "-c".into(), "ls".into()],
            binds: Vec::new(),
            content_dir,
            output_path: dir.path().join("abc.txt"),
        };

        let repo = Repo::discover(dir.path()).unwrap();
        let executor = ContainerExecutor::new(runtime.display().to_string(), repo);

        let err = executor.execute(&plan, &mut FullDisk).unwrap_err();
        assert!(matches!(err, ExecutionError::Output { .. }));

        let pid = fs::read_to_string(&pid_file).unwrap();
        let alive = Command::new("sh")
            .arg("-c")
            .arg(format!("kill -0 {} 2>/dev/null", pid.trim()))
            .status()
            .unwrap();
        assert!(!alive.success(), "container process {} still exists", pid.trim());
    }
}
