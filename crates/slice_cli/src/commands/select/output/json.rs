//! JSON output: an array of selected tasks.

use std::io::Write;

use super::OutputContext;

/// Serialises the selected tasks as a pretty-printed JSON array.
pub fn write(ctx: &OutputContext, writer: &mut dyn Write) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &ctx.selection.tasks)?;
    writeln!(writer)?;
    Ok(())
}
