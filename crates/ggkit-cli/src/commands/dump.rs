//! dump command - print the leading elements of one tensor

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use ggkit::{Container, ElementType, TensorArena, TensorView};

use crate::config::CliConfig;

/// Execute the dump command
pub fn execute<W: Write>(
    path: &Path,
    tensor: &str,
    limit: usize,
    config: &CliConfig,
    out: &mut W,
) -> Result<()> {
    let mut arena = TensorArena::new();
    let container = Container::open_file_with_options(path, &config.read, Some(&mut arena))
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let desc = container
        .tensors()
        .find(tensor)
        .with_context(|| format!("Tensor not found: {tensor}"))?;
    let view = arena.view(desc)?;

    writeln!(
        out,
        "{} {} {:?} ({} elements)",
        desc.name,
        desc.element_type,
        desc.dims,
        desc.element_count()
    )?;
    writeln!(out, "{}", format_elements(&view, limit)?)?;
    Ok(())
}

fn join<T: ToString>(items: &[T], limit: usize) -> String {
    let shown: Vec<String> = items.iter().take(limit).map(ToString::to_string).collect();
    let mut text = shown.join(" ");
    if items.len() > limit {
        text.push_str(" ...");
    }
    text
}

/// Render up to `limit` elements in their stored type
pub fn format_elements(view: &TensorView<'_>, limit: usize) -> Result<String> {
    Ok(match view.element_type().unwrap_or(ElementType::F32) {
        ElementType::F32 | ElementType::F16 | ElementType::BF16 => {
            join(view.to_f32_vec()?.as_slice(), limit)
        }
        ElementType::F64 => join(view.as_slice::<f64>()?, limit),
        ElementType::I8 => join(view.as_slice::<i8>()?, limit),
        ElementType::I16 => join(view.as_slice::<i16>()?, limit),
        ElementType::I32 => join(view.as_slice::<i32>()?, limit),
        ElementType::I64 => join(view.as_slice::<i64>()?, limit),
    })
}
