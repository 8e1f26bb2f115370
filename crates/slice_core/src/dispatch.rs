//! Task dispatch onto a worker pool.
//!
//! Each [`AnalysisTask`] is turned into an [`ExecutionPlan`] (image, shell
//! command, bind mounts and output path) and handed to an [`Executor`] on a
//! rayon pool. [`Dispatcher::submit`] never blocks; [`Dispatcher::wait`] is
//! the single barrier and returns outcomes in submission order.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use rayon::{ThreadPool, ThreadPoolBuilder};
#[cfg(feature = "tracing")]
use tracing::{debug, info};

use crate::config::Config;
use crate::error::ExecutionError;
use crate::task::AnalysisTask;

/// Placeholder in the output template replaced with the commit id.
pub const COMMIT_ID_PLACEHOLDER: &str = "%COMMIT_ID%";
/// Placeholder in the output template replaced with the commit time.
pub const COMMIT_TIME_PLACEHOLDER: &str = "%COMMIT_TIME%";
/// Directory under the mount dir holding one subdirectory per commit.
pub const COMMITS_BY_HASH: &str = "commits-by-hash";
/// Container path of the commit's files.
pub const SOURCE_MOUNT: &str = "/src";
/// Container path of the run's working directory when staging.
pub const TEMP_MOUNT: &str = "/tmp";

/// Metadata entries of the commit mount that are never staged.
const STAGE_EXCLUDES: [&str; 5] = [".git-descendants", ".git-names", ".git-parents", ".author", ".author-email"];

/// Container options passed to the runtime's `exec`.
const EXEC_OPTIONS: [&str; 2] = ["--writable-tmpfs", "--containall"];

/// Settings shared by every task of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Directory receiving one output file per task.
    pub output_dir: PathBuf,
    /// Output file name template, without the `.txt` extension.
    pub output_format: String,
    /// Copy the commit's files into a scratch directory before running.
    pub stage_to_temp: bool,
    /// The run's working directory, bound at `/tmp` when staging.
    pub working_dir: PathBuf,
    /// Directory under which commit contents are made available.
    pub mount_dir: PathBuf,
    /// Log tasks instead of running them.
    pub dry_run: bool,
}

impl DispatchOptions {
    /// Builds options from `config` for a run rooted at `working_dir`.
    #[must_use]
    pub fn from_config(config: &Config, working_dir: &Path, dry_run: bool) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            output_format: config.output_format.clone(),
            stage_to_temp: config.rsync_to_temp,
            working_dir: working_dir.to_path_buf(),
            mount_dir: working_dir.join(&config.mount_dir_name),
            dry_run,
        }
    }

    /// Returns the host directory expected to hold `commit_id`'s files.
    #[must_use]
    pub fn content_dir(&self, commit_id: &str) -> PathBuf {
        self.mount_dir.join(COMMITS_BY_HASH).join(commit_id)
    }

    /// Returns the output file for `task`.
    #[must_use]
    pub fn output_path(&self, task: &AnalysisTask) -> PathBuf {
        let name = render_output_name(&self.output_format, task);
        self.output_dir.join(format!("{name}.txt"))
    }
}

/// Substitutes the commit placeholders of `template`.
#[must_use]
pub fn render_output_name(template: &str, task: &AnalysisTask) -> String {
    template
        .replace(COMMIT_ID_PLACEHOLDER, &task.commit_id)
        .replace(COMMIT_TIME_PLACEHOLDER, &task.commit_time_iso())
}

/// Wraps `command` so it runs on a private copy of `/src` in `/tmp/<commit>`.
fn staged_command(commit_id: &str, command: &str) -> String {
    let scratch = format!("{TEMP_MOUNT}/{commit_id}");
    let excludes = STAGE_EXCLUDES
        .iter()
        .map(|entry| format!("--exclude \"{entry}\""))
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "mkdir -p {scratch}; rsync --inplace {excludes} --chmod=Du=rwx,Dg=rx,Do=rx,Fu=rw,Fg=r,Fo=r \
         -r {SOURCE_MOUNT}/ {scratch} 2>&1 ; cd {scratch} ; {command} ; rm -rf {scratch}"
    )
}

/// A host directory made visible inside the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bind {
    /// Host path.
    pub host: PathBuf,
    /// Container path.
    pub container: String,
}

impl std::fmt::Display for Bind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host.display(), self.container)
    }
}

/// Everything an [`Executor`] needs to run one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Commit being analysed.
    pub commit_id: String,
    /// Container image reference.
    pub image: String,
    /// Program and arguments run inside the container.
    pub command: Vec<String>,
    /// Bind mounts, `/src` first.
    pub binds: Vec<Bind>,
    /// Host directory that must hold the commit's files before running.
    pub content_dir: PathBuf,
    /// File receiving the container's output.
    pub output_path: PathBuf,
}

impl ExecutionPlan {
    /// Builds the plan for `task`.
    #[must_use]
    pub fn new(task: &AnalysisTask, options: &DispatchOptions) -> Self {
        let content_dir = options.content_dir(&task.commit_id);
        let mut binds = vec![Bind {
            host: content_dir.clone(),
            container: SOURCE_MOUNT.to_string(),
        }];

        let shell = if options.stage_to_temp {
            binds.push(Bind {
                host: options.working_dir.clone(),
                container: TEMP_MOUNT.to_string(),
            });
            staged_command(&task.commit_id, &task.command)
        } else {
            task.command.clone()
        };

        Self {
            commit_id: task.commit_id.clone(),
            image: task.image.clone(),
            command: vec!["/bin/sh".to_string(), "-c".to_string(), shell],
            binds,
            content_dir,
            output_path: options.output_path(task),
        }
    }

    /// Returns the arguments following the runtime program, e.g.
    /// `exec --writable-tmpfs --containall --bind h:c <image> /bin/sh -c <cmd>`.
    #[must_use]
    pub fn runtime_args(&self) -> Vec<String> {
        let mut args = vec!["exec".to_string()];
        args.extend(EXEC_OPTIONS.iter().map(ToString::to_string));
        for bind in &self.binds {
            args.push("--bind".to_string());
            args.push(bind.to_string());
        }
        args.push(self.image.clone());
        args.extend(self.command.iter().cloned());
        args
    }
}

/// Runs a single plan, streaming the container's output into `output`.
pub trait Executor: Send + Sync {
    /// Executes `plan`.
    fn execute(&self, plan: &ExecutionPlan, output: &mut dyn Write) -> Result<(), ExecutionError>;
}

/// A successfully analysed commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Commit that was analysed.
    pub commit_id: String,
    /// Wall-clock time from start to finished output.
    pub elapsed: Duration,
    /// Where the output was written.
    pub output_path: PathBuf,
}

impl std::fmt::Display for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} completed analysis in {:.2} seconds",
            self.commit_id,
            self.elapsed.as_secs_f64()
        )
    }
}

/// The result of one dispatched task.
#[derive(Debug)]
pub struct TaskOutcome {
    /// The task that was run.
    pub task: AnalysisTask,
    /// Its completion or failure.
    pub result: Result<Completion, ExecutionError>,
}

impl TaskOutcome {
    /// Returns `true` if the task completed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs one task to completion on the calling thread.
pub fn run_task(
    executor: &dyn Executor,
    options: &DispatchOptions,
    task: &AnalysisTask,
) -> Result<Completion, ExecutionError> {
    let started = Instant::now();
    let plan = ExecutionPlan::new(task, options);

    #[cfg(feature = "tracing")]
    info!(commit = %task.commit_id, "beginning analysis");
    #[cfg(feature = "tracing")]
    debug!(
        image = %plan.image,
        command = ?plan.command,
        content = %plan.content_dir.display(),
        "running analysis"
    );

    let output_error = |source| ExecutionError::Output {
        path: plan.output_path.clone(),
        source,
    };

    if let Some(parent) = plan.output_path.parent() {
        fs::create_dir_all(parent).map_err(output_error)?;
    }
    let file = File::create(&plan.output_path).map_err(output_error)?;
    let mut writer = BufWriter::new(file);

    executor.execute(&plan, &mut writer)?;
    writer.flush().map_err(output_error)?;

    #[cfg(feature = "tracing")]
    info!(commit = %task.commit_id, "commit has been analysed");

    Ok(Completion {
        commit_id: task.commit_id.clone(),
        elapsed: started.elapsed(),
        output_path: plan.output_path,
    })
}

/// Non-blocking submitter with a single completion barrier.
///
/// Tasks run on a dedicated rayon pool. In dry mode nothing is executed and
/// [`wait`](Self::wait) returns immediately with no outcomes.
pub struct Dispatcher {
    pool: ThreadPool,
    executor: Arc<dyn Executor>,
    options: Arc<DispatchOptions>,
    sender: mpsc::Sender<(usize, TaskOutcome)>,
    receiver: mpsc::Receiver<(usize, TaskOutcome)>,
    submitted: usize,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("workers", &self.pool.current_num_threads())
            .field("options", &self.options)
            .field("submitted", &self.submitted)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher with `workers` threads, or one per CPU when `None`.
    pub fn new(
        executor: Arc<dyn Executor>,
        options: DispatchOptions,
        workers: Option<usize>,
    ) -> Result<Self, ExecutionError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("git-slice-worker-{i}"));
        if let Some(n) = workers {
            builder = builder.num_threads(n);
        }
        let pool = builder.build().map_err(ExecutionError::Pool)?;
        let (sender, receiver) = mpsc::channel();

        Ok(Self {
            pool,
            executor,
            options: Arc::new(options),
            sender,
            receiver,
            submitted: 0,
        })
    }

    /// Returns the number of tasks submitted so far.
    #[must_use]
    pub const fn submitted(&self) -> usize {
        self.submitted
    }

    /// Queues `task` and returns immediately.
    pub fn submit(&mut self, task: AnalysisTask) {
        let index = self.submitted;
        self.submitted += 1;

        if self.options.dry_run {
            #[cfg(feature = "tracing")]
            debug!(commit = %task.commit_id, "dry run, not submitting");
            return;
        }

        #[cfg(feature = "tracing")]
        debug!(commit = %task.commit_id, "submitting commit for analysis");

        let executor = Arc::clone(&self.executor);
        let options = Arc::clone(&self.options);
        let sender = self.sender.clone();

        self.pool.spawn(move || {
            let result = run_task(executor.as_ref(), &options, &task);
            // The receiver only goes away if the dispatcher was dropped without waiting.
            let _ = sender.send((index, TaskOutcome { task, result }));
        });
    }

    /// Blocks until every submitted task has finished.
    #[must_use]
    pub fn wait(self) -> Vec<TaskOutcome> {
        self.wait_with(|_| {})
    }

    /// Like [`wait`](Self::wait), calling `on_complete` as each task finishes.
    pub fn wait_with(self, mut on_complete: impl FnMut(&TaskOutcome)) -> Vec<TaskOutcome> {
        let Self { sender, receiver, .. } = self;
        drop(sender);

        #[cfg(feature = "tracing")]
        debug!("all commits submitted, waiting for analyses to complete");

        let mut outcomes: Vec<(usize, TaskOutcome)> = receiver
            .iter()
            .inspect(|(_, outcome)| on_complete(outcome))
            .collect();
        outcomes.sort_by_key(|(index, _)| *index);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

/// Submits every task and waits for all of them.
pub fn dispatch(
    tasks: impl IntoIterator<Item = AnalysisTask>,
    executor: Arc<dyn Executor>,
    options: DispatchOptions,
    workers: Option<usize>,
) -> Result<Vec<TaskOutcome>, ExecutionError> {
    let mut dispatcher = Dispatcher::new(executor, options, workers)?;
    for task in tasks {
        dispatcher.submit(task);
    }
    Ok(dispatcher.wait())
}
