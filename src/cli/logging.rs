//! Logging initialization

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Initialize logging based on debug flag
///
/// Without `debug`, warnings go to stderr (`RUST_LOG` overrides the level).
/// With `debug`, everything down to debug level is written to a temporary
/// log file whose path is returned.
pub fn init_logging(debug: bool) -> Result<Option<PathBuf>> {
    if !debug {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_target(false)
            .without_time()
            .init();
        return Ok(None);
    }

    let (file, path) = tempfile::Builder::new()
        .prefix("kube-lineage-")
        .suffix(".log")
        .tempfile()
        .context("Failed to create debug log file")?
        .keep()
        .context("Failed to keep debug log file")?;

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_ansi(false) // No ANSI codes in log file
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    Ok(Some(path))
}
