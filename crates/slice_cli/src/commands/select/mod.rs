//! Select command - previews the commits a configuration selects.

mod output;

use std::time::Instant;

use anyhow::Context as _;
use slice_core::prelude::*;

use self::output::OutputContext;
use super::context::SliceContext;
use crate::SelectArgs;
use crate::git::Repo;

/// Executes the `git-slice select` command.
pub fn run(args: &SelectArgs) -> super::Result {
    let context = SliceContext::load(args.config.as_deref())?;
    let config = &context.config;
    let start = Instant::now();

    let repo = Repo::discover(&args.repo)?;
    let history = repo.history();

    let selection = Selector::new(&history, &config.filters, &config.analysis)
        .with_ancestor_order(config.ancestor_order)
        .run(&config.revision_query())
        .context("selecting commits")?;

    let ctx = OutputContext {
        selection: &selection,
        elapsed: start.elapsed(),
    };

    output::write_output(args, &ctx)
}
