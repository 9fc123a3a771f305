use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::WorkflowConfig;
use crate::error::WorkflowError;
use crate::storage::write_atomic;

pub type SettingsMap = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsFormat {
    Yaml,
    Json,
    Toml,
}

impl SettingsFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Toml => "toml",
        }
    }

    fn decode(self, content: &str) -> Result<SettingsMap, String> {
        if content.trim().is_empty() {
            return Ok(SettingsMap::new());
        }

        match self {
            Self::Yaml => serde_saphyr::from_str(content).map_err(|error| error.to_string()),
            Self::Json => serde_json::from_str(content).map_err(|error| error.to_string()),
            Self::Toml => toml::from_str(content).map_err(|error| error.to_string()),
        }
    }

    fn encode(self, data: &SettingsMap) -> Result<String, String> {
        match self {
            Self::Yaml => serde_saphyr::to_string(data).map_err(|error| error.to_string()),
            Self::Json => serde_json::to_string_pretty(data)
                .map(|mut payload| {
                    payload.push('\n');
                    payload
                })
                .map_err(|error| error.to_string()),
            Self::Toml => toml::to_string(data).map_err(|error| error.to_string()),
        }
    }
}

/// Key/value settings bound to one file. The file is read on first access and
/// rewritten in full after every mutation.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    format: SettingsFormat,
    data: Option<SettingsMap>,
}

impl SettingsStore {
    pub fn open(path: impl Into<PathBuf>, format: SettingsFormat) -> Self {
        Self {
            path: path.into(),
            format,
            data: None,
        }
    }

    pub fn from_config(config: &WorkflowConfig) -> Self {
        Self::open(config.settings_file(), config.settings_format)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> SettingsFormat {
        self.format
    }

    /// Returns the stored value for `key`, or `default` when absent.
    pub fn get<T>(&mut self, key: &str, default: T) -> Result<T, WorkflowError>
    where
        T: DeserializeOwned,
    {
        let path = self.path.clone();
        let Some(value) = self.load()?.get(key) else {
            return Ok(default);
        };

        serde_json::from_value(value.clone()).map_err(|error| {
            WorkflowError::invalid_format(format!(
                "setting {key:?} in {} has an unexpected shape: {error}",
                path.display()
            ))
        })
    }

    pub fn contains(&mut self, key: &str) -> Result<bool, WorkflowError> {
        Ok(self.load()?.contains_key(key))
    }

    pub fn set<T>(&mut self, key: impl Into<String>, value: T) -> Result<(), WorkflowError>
    where
        T: Serialize,
    {
        let key = key.into();
        let value = serde_json::to_value(value).map_err(|error| {
            WorkflowError::invalid_format(format!("setting {key:?} is not serializable: {error}"))
        })?;

        self.load()?.insert(key, value);
        self.flush()
    }

    pub fn remove(&mut self, key: &str) -> Result<Option<Value>, WorkflowError> {
        let removed = self.load()?.remove(key);
        if removed.is_some() {
            self.flush()?;
        }
        Ok(removed)
    }

    fn load(&mut self) -> Result<&mut SettingsMap, WorkflowError> {
        if self.data.is_none() {
            let loaded = read_settings(&self.path, self.format)?;
            tracing::debug!(
                path = %self.path.display(),
                keys = loaded.len(),
                "loaded settings"
            );
            self.data = Some(loaded);
        }

        Ok(self.data.get_or_insert_with(SettingsMap::new))
    }

    fn flush(&self) -> Result<(), WorkflowError> {
        let Some(data) = self.data.as_ref() else {
            return Ok(());
        };

        let payload = self.format.encode(data).map_err(|error| {
            WorkflowError::invalid_format(format!(
                "failed to encode settings for {}: {error}",
                self.path.display()
            ))
        })?;
        write_atomic(&self.path, payload.as_bytes())
            .map_err(|source| WorkflowError::path(&self.path, source))?;

        tracing::debug!(path = %self.path.display(), keys = data.len(), "flushed settings");
        Ok(())
    }
}

fn read_settings(path: &Path, format: SettingsFormat) -> Result<SettingsMap, WorkflowError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(SettingsMap::new()),
        Err(source) => return Err(WorkflowError::path(path, source)),
    };

    format.decode(&content).map_err(|error| {
        WorkflowError::invalid_format(format!(
            "settings file {} is not a {} mapping: {error}",
            path.display(),
            format.extension()
        ))
    })
}
