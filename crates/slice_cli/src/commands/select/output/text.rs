//! Plain-text output: one line per selected task and a summary.

use std::io::Write;

use super::OutputContext;
use crate::ui::{format_duration, pluralise_word};

/// Writes one line per task followed by a short summary.
pub fn write(ctx: &OutputContext, writer: &mut dyn Write) -> anyhow::Result<()> {
    for task in &ctx.selection.tasks {
        writeln!(writer, "{task}")?;
    }

    let stats = &ctx.selection.stats;
    let rejected = [
        (stats.too_soon, "too soon"),
        (stats.out_of_range, "out of range"),
        (stats.wrong_file_types, "wrong file types"),
        (stats.skipped, "skipped"),
    ]
    .iter()
    .filter(|(count, _)| *count > 0)
    .map(|(count, reason)| format!("{count} {reason}"))
    .collect::<Vec<_>>();

    writeln!(writer)?;
    write!(
        writer,
        "{} of {} {} selected in {}",
        stats.accepted,
        stats.examined,
        pluralise_word(stats.examined, "commit", "commits"),
        format_duration(ctx.elapsed)
    )?;
    if !rejected.is_empty() {
        write!(writer, " ({})", rejected.join(", "))?;
    }
    if stats.hit_limit {
        write!(writer, ", limit reached")?;
    }
    writeln!(writer)?;

    Ok(())
}
