//! write-sample command - generate a sample container

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::CliConfig;

/// Execute the write-sample command
///
/// An explicit `alignment` wins over the configured `write.alignment`.
pub fn execute<W: Write>(
    path: &Path,
    tensors: usize,
    seed: u64,
    alignment: Option<u32>,
    config: &CliConfig,
    out: &mut W,
) -> Result<()> {
    let (mut container, arena) =
        ggkit::sample::build_sample(tensors, seed).context("Failed to build sample")?;

    let mut options = config.write.clone();
    if alignment.is_some() {
        options.alignment = alignment;
    }
    options.validate().context("Invalid write options")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut sink = std::io::BufWriter::new(file);
    let layout = container
        .write_with_options(&mut sink, &arena, &options)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    sink.flush().with_context(|| format!("Failed to flush {}", path.display()))?;

    info!(path = %path.display(), tensors, seed, "wrote sample");
    writeln!(
        out,
        "wrote {} ({} tensors, {} metadata keys, {} bytes, data at {})",
        path.display(),
        container.tensors().count(),
        container.metadata().count(),
        layout.total_len(),
        layout.data_offset
    )?;
    Ok(())
}
