use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::error::CoreError;

pub const LOG_FILE_NAME: &str = "parley.log";

/// Install the global `tracing` subscriber, appending to `<dir>/parley.log`.
///
/// `RUST_LOG` takes precedence over `default_filter`. The terminal belongs to
/// the UI, so nothing is written to stderr.
pub fn init_file_logging(dir: &Path, default_filter: &str) -> Result<PathBuf, CoreError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| CoreError::Logging(e.to_string()))?;

    Ok(path)
}
