//! Diagnostics via `tracing`.
//!
//! Events go to stderr (Alfred's debugger pane) and are appended to the
//! per-workflow log file under the volatile storage directory. Neither sink
//! ever touches stdout, which belongs to the feedback document.
//!
//! Filter: `RUST_LOG` when set, otherwise `debug` with `alfred_debug=1`,
//! otherwise `info`.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::WorkflowConfig;
use crate::error::WorkflowError;

pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

/// Installs the global subscriber. Returns `false` when one was already set.
pub fn init_logging(config: &WorkflowConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config.verbose)));

    let log_file = config.log_file();
    let (file, open_error) = match open_log_file(&log_file) {
        Ok(file) => (Some(file), None),
        Err(error) => (None, Some(error)),
    };
    let file_layer = file.map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(Mutex::new(file))
    });

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).compact())
        .with(file_layer)
        .try_init()
        .is_ok();

    if let Some(error) = open_error {
        tracing::warn!(error = %error, "log file unavailable; logging to stderr only");
    }
    installed
}

pub fn open_log_file(path: &Path) -> Result<File, WorkflowError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| WorkflowError::path(parent, error))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|error| WorkflowError::path(path, error))
}
