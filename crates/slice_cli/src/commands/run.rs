//! Run command - selects commits and analyses each one in a container.

use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::ProgressBar;
use slice_core::prelude::*;

use super::context::SliceContext;
use crate::RunArgs;
use crate::executor::ContainerExecutor;
use crate::git::Repo;
use crate::ui::{self, exit, pluralise_word, print_command_header, print_info};
use crate::workspace::Workspace;

/// Counts reported once a run has finished.
#[derive(Debug)]
struct RunSummary {
    stats: SelectionStats,
    succeeded: usize,
    failed: usize,
    elapsed: Duration,
    dry_run: bool,
}

/// Executes the `git-slice run` command.
pub fn run(args: &RunArgs) -> super::Result {
    let context = SliceContext::load(args.config.as_deref())?;
    runtime_info(&context, args);

    print_command_header("run");

    let workspace = Workspace::prepare(&context.config, args.dry_run)?;
    tracing::debug!(instance = %workspace.instance_id(), "workspace ready");

    let result = analyse(&context.config, &workspace, args);
    workspace.teardown();
    let summary = result?;

    print_summary(&summary);

    if summary.failed > 0 {
        std::process::exit(exit::TASK_FAILED);
    }

    Ok(())
}

fn runtime_info(context: &SliceContext, args: &RunArgs) {
    tracing::debug!("runtime information:");
    tracing::debug!("  platform: {} ({})", std::env::consts::OS, std::env::consts::ARCH);
    tracing::debug!("  git-slice version: {}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("  config file: {}", context.config_path.display());
    tracing::debug!("  dry run mode: {}", args.dry_run);
}

fn analyse(config: &Config, workspace: &Workspace, args: &RunArgs) -> anyhow::Result<RunSummary> {
    let start = Instant::now();

    let repo = Repo::discover(workspace.repo_dir())?;
    let history = repo.history();

    let options = DispatchOptions::from_config(config, workspace.working_dir(), args.dry_run);
    let executor = Arc::new(ContainerExecutor::new(config.container_runtime.clone(), repo));
    let dispatcher = Dispatcher::new(executor, options, args.workers.or(config.workers))?;

    print_info("Searching repository to find commits to analyse...");
    let progress = (!args.dry_run).then(ui::create_task_progress);

    let (selected, outcomes) = select_and_dispatch(&history, config, dispatcher, progress.as_ref(), args.dry_run);

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let stats = selected?;
    let failed = outcomes.iter().filter(|o| !o.is_success()).count();

    Ok(RunSummary {
        stats,
        succeeded: outcomes.len() - failed,
        failed,
        elapsed: start.elapsed(),
        dry_run: args.dry_run,
    })
}

/// Streams accepted tasks into `dispatcher`, then waits for every submitted
/// task. The wait also happens when selection fails part way, so no analysis
/// outlives the workspace it reads from.
fn select_and_dispatch<H: History + ?Sized>(
    history: &H,
    config: &Config,
    mut dispatcher: Dispatcher,
    progress: Option<&ProgressBar>,
    dry_run: bool,
) -> (Result<SelectionStats, RepositoryError>, Vec<TaskOutcome>) {
    let selected = Selector::new(history, &config.filters, &config.analysis)
        .with_ancestor_order(config.ancestor_order)
        .run_with(&config.revision_query(), |task| {
            if dry_run {
                print_dry_run(&task);
            }
            if let Some(pb) = progress {
                pb.inc_length(1);
            }
            dispatcher.submit(task);
        });

    if let Err(e) = &selected {
        tracing::warn!(
            "selection stopped early, waiting for {} submitted analyses: {e}",
            dispatcher.submitted()
        );
    }

    let outcomes = dispatcher.wait_with(|outcome| {
        if let Some(pb) = progress {
            pb.inc(1);
            pb.suspend(|| println!("{}", describe(outcome)));
        }
    });

    (selected, outcomes)
}

fn print_dry_run(task: &AnalysisTask) {
    print_info(&format!("Would have submitted commit {} for analysis", task.commit_id));
    println!("    Image:   {}", ui::colors::accent().apply_to(&task.image));
    println!("    Command: {}", ui::colors::accent().apply_to(&task.command));
}

fn describe(outcome: &TaskOutcome) -> String {
    match &outcome.result {
        Ok(completion) => {
            tracing::info!("{completion}");
            ui::success_line(&completion.to_string())
        }
        Err(e) => {
            tracing::warn!(commit = %outcome.task.commit_id, "analysis failed: {e}");
            ui::failure_line(&format!("{} failed: {e}", outcome.task.commit_id))
        }
    }
}

fn print_summary(summary: &RunSummary) {
    let selected = summary.stats.accepted;
    let examined = summary.stats.examined;

    println!();
    if summary.dry_run {
        print_info(&format!(
            "{selected} {} would be analysed ({examined} examined)",
            pluralise_word(selected, "commit", "commits")
        ));
        return;
    }

    print_info(&format!(
        "Analysed {} {} in {} ({examined} examined)",
        summary.succeeded,
        pluralise_word(summary.succeeded, "commit", "commits"),
        ui::format_duration(summary.elapsed)
    ));

    if summary.failed > 0 {
        ui::print_warning(&format!(
            "{} {} failed",
            summary.failed,
            pluralise_word(summary.failed, "analysis", "analyses")
        ));
    }
}
