//! inspect command - summarize a container without loading tensor data

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use ggkit::{Container, Summary};
use tracing::debug;

use crate::config::CliConfig;

/// Execute the inspect command
///
/// With `key`, prints only that metadata value (as JSON when `json` is set).
pub fn execute<W: Write>(
    path: &Path,
    json: bool,
    key: Option<&str>,
    config: &CliConfig,
    out: &mut W,
) -> Result<()> {
    let container = Container::open_file_with_options(path, &config.read, None)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    debug!(path = %path.display(), tensors = container.tensors().count(), "opened container");

    let summary = Summary::new(&container);
    match key {
        Some(key) => {
            let entry = summary
                .key(key)
                .with_context(|| format!("Key not found: {key}"))?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(entry)?)?;
            } else {
                writeln!(out, "{}", entry.value)?;
            }
        }
        None if json => writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?,
        None => write!(out, "{summary}")?,
    }
    Ok(())
}
