use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("scripting call failed: {0}")]
    Platform(String),
    #[error("no bundle identifier configured (set alfred_workflow_bundleid)")]
    MissingBundleId,
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    InvalidFormat(String),
    #[error("missing capability: {0}")]
    MissingCapability(String),
    #[error("{path}: {source}")]
    Path {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl WorkflowError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat(message.into())
    }

    pub fn path(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Path {
            path: path.into(),
            source,
        }
    }

    /// Process exit status reported for this error.
    pub fn status_code(&self) -> i32 {
        match self {
            Self::Platform(_) => 1,
            Self::MissingBundleId => 2,
            Self::InvalidArgument(_) => 10,
            Self::InvalidFormat(_) => 11,
            Self::MissingCapability(_) => 13,
            Self::Path { .. } => 14,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Platform(_) => "PlatformError",
            Self::MissingBundleId => "MissingBundleIdError",
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::InvalidFormat(_) => "InvalidFormat",
            Self::MissingCapability(_) => "MissingCapability",
            Self::Path { .. } => "PathError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_are_distinct_per_kind() {
        let errors = [
            WorkflowError::Platform("osascript exited 1".to_string()),
            WorkflowError::MissingBundleId,
            WorkflowError::invalid_argument("unsupported mode: list"),
            WorkflowError::invalid_format("settings file is not a mapping"),
            WorkflowError::MissingCapability("frontmost app lookup".to_string()),
            WorkflowError::path("/nope", io::Error::from(io::ErrorKind::NotFound)),
        ];

        let codes: Vec<i32> = errors.iter().map(WorkflowError::status_code).collect();
        assert_eq!(codes, vec![1, 2, 10, 11, 13, 14]);
    }

    #[test]
    fn path_error_message_names_the_path() {
        let error = WorkflowError::path(
            "/tmp/settings.yaml",
            io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        );

        assert!(error.to_string().contains("/tmp/settings.yaml"));
        assert_eq!(error.kind_name(), "PathError");
    }
}
