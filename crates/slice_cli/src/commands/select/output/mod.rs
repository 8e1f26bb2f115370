//! Output formatting for selection results.

mod json;
mod text;

use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::time::Duration;

use anyhow::Context as _;
use slice_core::prelude::*;

use crate::{OutputFormat, SelectArgs};

/// Everything needed to render selection output in any format.
#[derive(Debug)]
pub struct OutputContext<'a> {
    /// The finished selection.
    pub selection: &'a Selection,
    /// Wall-clock time for the selection pass.
    pub elapsed: Duration,
}

/// Writes selection output to a file or stdout in the requested format.
pub fn write_output(args: &SelectArgs, ctx: &OutputContext) -> anyhow::Result<()> {
    if let Some(path) = &args.output {
        let file = File::create(path).with_context(|| format!("failed to create output file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        write_format(args.format, ctx, &mut writer)?;
        writer.flush().context("failed to write output file")
    } else {
        let stdout = std::io::stdout();
        let mut writer = stdout.lock();
        write_format(args.format, ctx, &mut writer)
    }
}

fn write_format(format: OutputFormat, ctx: &OutputContext, writer: &mut dyn std::io::Write) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => text::write(ctx, writer),
        OutputFormat::Json => json::write(ctx, writer),
    }
}
