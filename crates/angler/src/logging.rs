//! Log setup: console plus a rotating set of files.
//!
//! On every start the files in the log directory shift up by one
//! (`log0.log` becomes `log1.log`, ...) and the oldest beyond the
//! configured count are deleted. The new run writes to `log0.log`.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("log directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("a global subscriber is already installed: {0}")]
    Init(#[from] TryInitError),
}

fn log_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("log{index}.log"))
}

/// Shifts `log{i}.log` to `log{i+1}.log`, keeping at most `count` files
/// including the one about to be written.
///
/// # Errors
/// Returns the first I/O error other than a missing file.
pub fn rotate_logs(dir: &Path, count: usize) -> std::io::Result<()> {
    let count = count.max(1);
    std::fs::create_dir_all(dir)?;

    // Anything at or past the limit goes.
    let mut index = count - 1;
    while log_path(dir, index).exists() {
        std::fs::remove_file(log_path(dir, index))?;
        index += 1;
    }

    for index in (0..count - 1).rev() {
        let from = log_path(dir, index);
        if from.exists() {
            std::fs::rename(&from, log_path(dir, index + 1))?;
        }
    }
    Ok(())
}

/// Installs the global subscriber: `RUST_LOG`-driven filter, a console
/// layer, and a plain-text file layer writing `<dir>/log0.log`.
///
/// # Errors
/// [`LoggingError::Io`] if the directory can't be prepared,
/// [`LoggingError::Init`] if a subscriber was already installed.
pub fn init_logging(dir: &Path, count: usize) -> Result<(), LoggingError> {
    rotate_logs(dir, count)?;
    let file = File::create(log_path(dir, 0))?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console_layer = fmt::layer().with_target(true).with_level(true);

    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;
    Ok(())
}
