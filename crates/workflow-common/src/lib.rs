//! Runtime for Alfred workflow binaries.
//!
//! - `config`: environment-driven workflow settings and storage layout.
//! - `settings`: persisted key/value settings (YAML, JSON or TOML).
//! - `feedback`: item collection, output format selection, feedback cache.
//! - `handler`: the handler trait and its ordered controller.
//! - `help`: built-in handler describing the reload triggers.
//! - `dispatcher`: option parsing and the feedback/action lifecycle.
//! - `rescue`: exit-code mapping and the user-facing failure item.
//! - `platform`: OS side effects (search, open, reveal, shortcuts).
//! - `logging`: `tracing` subscriber wired to stderr and the log file.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod feedback;
pub mod handler;
pub mod help;
pub mod logging;
pub mod platform;
pub mod query;
pub mod rescue;
pub mod settings;
pub mod storage;

pub use alfred_core::{ArgsError, Item, ItemIcon, ItemKind, ItemModifier, decode_args, encode_args};
pub use config::{ReloadOptions, WorkflowConfig, expand_home_tokens};
pub use dispatcher::{Dispatcher, action_args};
pub use error::WorkflowError;
pub use feedback::{FeedbackBuilder, FeedbackCache, FeedbackFormat};
pub use handler::{ActionArgs, Handler, HandlerController, RunContext};
pub use help::HelpHandler;
pub use logging::init_logging;
pub use platform::{FrontmostApp, OsaScript, PlatformActions, PlatformCall, RecordingPlatform};
pub use query::{Modifier, Mode, Options, Query, RELOAD_SENTINEL};
pub use rescue::{Failure, run_friendly};
pub use settings::{SettingsFormat, SettingsMap, SettingsStore};
pub use storage::StorageDirs;
