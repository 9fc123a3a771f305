use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::WorkflowError;
use crate::feedback::FeedbackFormat;
use crate::settings::SettingsFormat;
use crate::storage::StorageDirs;

const BUNDLE_ID_ENV: &str = "alfred_workflow_bundleid";
const CACHE_DIR_ENV: &str = "alfred_workflow_cache";
const DATA_DIR_ENV: &str = "alfred_workflow_data";
const DEBUG_ENV: &str = "alfred_debug";
const SETTINGS_FORMAT_ENV: &str = "WORKFLOW_SETTINGS_FORMAT";
const FEEDBACK_FORMAT_ENV: &str = "WORKFLOW_FEEDBACK_FORMAT";
const FEEDBACK_CACHE_TTL_ENV: &str = "WORKFLOW_FEEDBACK_CACHE_TTL";
const RELOAD_SENTINEL_ENV: &str = "WORKFLOW_RELOAD_SENTINEL";
const RELOAD_FLAG_ENV: &str = "WORKFLOW_RELOAD_FLAG";
const HELP_FEEDBACK_ENV: &str = "WORKFLOW_HELP_FEEDBACK";
const RESCUE_FEEDBACK_ENV: &str = "WORKFLOW_RESCUE_FEEDBACK";
const OSASCRIPT_ENV: &str = "WORKFLOW_OSASCRIPT";

pub const DEFAULT_OSASCRIPT: &str = "osascript";
pub const VOLATILE_ROOT: &str = "$HOME/Library/Caches/com.runningwithcrayons.Alfred/Workflow Data";
pub const NON_VOLATILE_ROOT: &str = "$HOME/Library/Application Support/Alfred/Workflow Data";

/// How a query can ask for cached feedback to be rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadOptions {
    /// A lone `!` as first or last query token.
    pub sentinel: bool,
    /// The `-r/--reload` option.
    pub flag: bool,
}

impl ReloadOptions {
    pub fn is_configured(&self) -> bool {
        self.sentinel || self.flag
    }
}

impl Default for ReloadOptions {
    fn default() -> Self {
        Self {
            sentinel: true,
            flag: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    pub bundle_id: String,
    pub storage: StorageDirs,
    pub verbose: bool,
    pub settings_format: SettingsFormat,
    pub feedback_format: FeedbackFormat,
    /// Zero disables cached feedback.
    pub feedback_cache_ttl_secs: u64,
    pub reload: ReloadOptions,
    pub help_feedback: bool,
    pub rescue_feedback: bool,
    pub osascript_bin: String,
}

impl WorkflowConfig {
    pub fn new(bundle_id: impl Into<String>, storage: StorageDirs) -> Self {
        Self {
            bundle_id: bundle_id.into(),
            storage,
            verbose: false,
            settings_format: SettingsFormat::Yaml,
            feedback_format: FeedbackFormat::Xml,
            feedback_cache_ttl_secs: 0,
            reload: ReloadOptions::default(),
            help_feedback: true,
            rescue_feedback: true,
            osascript_bin: DEFAULT_OSASCRIPT.to_string(),
        }
    }

    pub fn from_env() -> Result<Self, WorkflowError> {
        Self::from_pairs(std::env::vars())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, WorkflowError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let env_map: HashMap<String, String> = pairs
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        let lookup = |key: &str| {
            env_map
                .get(key)
                .map(String::as_str)
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let bundle_id = lookup(BUNDLE_ID_ENV)
            .ok_or(WorkflowError::MissingBundleId)?
            .to_string();
        let home = env_map.get("HOME").map(String::as_str).unwrap_or_default();

        let volatile = lookup(CACHE_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| default_dir(VOLATILE_ROOT, home, &bundle_id));
        let non_volatile = lookup(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| default_dir(NON_VOLATILE_ROOT, home, &bundle_id));

        let mut config = Self::new(bundle_id, StorageDirs::new(volatile, non_volatile));
        config.verbose = parse_flag(lookup(DEBUG_ENV), false, DEBUG_ENV)?;
        if let Some(raw) = lookup(SETTINGS_FORMAT_ENV) {
            config.settings_format = SettingsFormat::parse(raw).ok_or_else(|| {
                WorkflowError::invalid_argument(format!(
                    "invalid {SETTINGS_FORMAT_ENV}: {raw} (expected yaml|json|toml)"
                ))
            })?;
        }
        if let Some(raw) = lookup(FEEDBACK_FORMAT_ENV) {
            config.feedback_format = FeedbackFormat::parse(raw).ok_or_else(|| {
                WorkflowError::invalid_argument(format!(
                    "invalid {FEEDBACK_FORMAT_ENV}: {raw} (expected xml|json)"
                ))
            })?;
        }
        if let Some(raw) = lookup(FEEDBACK_CACHE_TTL_ENV) {
            config.feedback_cache_ttl_secs = raw.parse::<u64>().map_err(|_| {
                WorkflowError::invalid_argument(format!("invalid {FEEDBACK_CACHE_TTL_ENV}: {raw}"))
            })?;
        }
        config.reload = ReloadOptions {
            sentinel: parse_flag(lookup(RELOAD_SENTINEL_ENV), true, RELOAD_SENTINEL_ENV)?,
            flag: parse_flag(lookup(RELOAD_FLAG_ENV), true, RELOAD_FLAG_ENV)?,
        };
        config.help_feedback = parse_flag(lookup(HELP_FEEDBACK_ENV), true, HELP_FEEDBACK_ENV)?;
        config.rescue_feedback =
            parse_flag(lookup(RESCUE_FEEDBACK_ENV), true, RESCUE_FEEDBACK_ENV)?;
        if let Some(raw) = lookup(OSASCRIPT_ENV) {
            config.osascript_bin = raw.to_string();
        }

        Ok(config)
    }

    pub fn settings_file(&self) -> PathBuf {
        self.storage
            .non_volatile_path()
            .join(format!("settings.{}", self.settings_format.extension()))
    }

    pub fn feedback_cache_file(&self) -> PathBuf {
        self.storage.volatile_path().join("feedback-cache.json")
    }

    pub fn log_file(&self) -> PathBuf {
        self.storage
            .volatile_path()
            .join(format!("{}.log", self.bundle_id))
    }

    pub fn feedback_cache_enabled(&self) -> bool {
        self.feedback_cache_ttl_secs > 0
    }
}

fn default_dir(root: &str, home: &str, bundle_id: &str) -> PathBuf {
    PathBuf::from(expand_home_tokens(root, home)).join(bundle_id)
}

pub fn expand_home_tokens(raw: &str, home: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let mut expanded = trimmed.replace("$HOME", home);

    if expanded == "~" {
        expanded = home.to_string();
    } else if let Some(rest) = expanded.strip_prefix("~/") {
        expanded = format!("{home}/{rest}");
    }

    expanded
}

fn parse_flag(raw: Option<&str>, default: bool, name: &str) -> Result<bool, WorkflowError> {
    let Some(value) = raw else {
        return Ok(default);
    };

    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(WorkflowError::invalid_argument(format!(
            "invalid {name}: {value} (expected true|false)"
        ))),
    }
}
