use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::WorkflowError;

/// Per-workflow storage roots. Alfred may clear the volatile directory at any
/// time; the non-volatile one survives upgrades.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageDirs {
    volatile: PathBuf,
    non_volatile: PathBuf,
}

impl StorageDirs {
    pub fn new(volatile: impl Into<PathBuf>, non_volatile: impl Into<PathBuf>) -> Self {
        Self {
            volatile: volatile.into(),
            non_volatile: non_volatile.into(),
        }
    }

    pub fn volatile_path(&self) -> &Path {
        &self.volatile
    }

    pub fn non_volatile_path(&self) -> &Path {
        &self.non_volatile
    }

    /// Volatile directory, created if absent.
    pub fn volatile(&self) -> Result<&Path, WorkflowError> {
        ensure_dir(&self.volatile)
    }

    /// Non-volatile directory, created if absent.
    pub fn non_volatile(&self) -> Result<&Path, WorkflowError> {
        ensure_dir(&self.non_volatile)
    }
}

fn ensure_dir(path: &Path) -> Result<&Path, WorkflowError> {
    fs::create_dir_all(path).map_err(|source| WorkflowError::path(path, source))?;
    Ok(path)
}

pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "target path must have a parent",
        )
    })?;
    fs::create_dir_all(parent)?;

    let tmp_path = path.with_extension(format!("{}.tmp", std::process::id()));
    fs::write(&tmp_path, bytes)?;
    fs::rename(tmp_path, path)?;
    Ok(())
}
