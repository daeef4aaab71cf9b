//! verify command - load a sample container and check its contents

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use ggkit::{Container, TensorArena};
use tracing::info;

use crate::config::CliConfig;

/// Execute the verify command
pub fn execute<W: Write>(path: &Path, config: &CliConfig, out: &mut W) -> Result<()> {
    let mut arena = TensorArena::new();
    let container = Container::open_file_with_options(path, &config.read, Some(&mut arena))
        .with_context(|| format!("Failed to read {}", path.display()))?;

    for desc in container.tensors() {
        writeln!(
            out,
            "tensor {}: {} {:?} offset={}",
            desc.name, desc.element_type, desc.dims, desc.offset
        )?;
    }

    let report = ggkit::sample::verify_sample(&container, &arena)
        .with_context(|| format!("Failed to verify {}", path.display()))?;
    info!(
        tensors = report.tensors_checked,
        elements = report.elements_checked,
        "verification finished"
    );

    if !report.metadata_mismatches.is_empty() {
        bail!(
            "metadata differs from the sample: {}",
            report.metadata_mismatches.join(", ")
        );
    }
    if let Some(m) = &report.mismatch {
        bail!(
            "tensor {} element {} is {} (expected {})",
            m.tensor,
            m.index,
            m.found,
            m.expected
        );
    }

    writeln!(
        out,
        "ok: {} tensors, {} elements, {} bytes of data",
        report.tensors_checked,
        report.elements_checked,
        arena.total_bytes()
    )?;
    Ok(())
}
