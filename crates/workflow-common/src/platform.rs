//! OS side effects behind a narrow interface.
//!
//! The dispatcher and handlers only see [`PlatformActions`]. `OsaScript`
//! drives macOS through `osascript`; [`RecordingPlatform`] records calls for
//! tests and dry runs.

use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::WorkflowError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontmostApp {
    pub name: String,
    pub bundle_id: String,
}

pub trait PlatformActions {
    /// Opens Alfred with `query` typed into the search field.
    fn search(&self, query: &str) -> Result<(), WorkflowError>;
    fn frontmost_app(&self) -> Result<FrontmostApp, WorkflowError>;
    fn open_path(&self, path: &Path) -> Result<(), WorkflowError>;
    /// Writes a web-location file named `name` into `folder` and returns its path.
    fn create_shortcut(&self, name: &str, url: &str, folder: &Path)
    -> Result<PathBuf, WorkflowError>;
    /// Selects `path` in a Finder window.
    fn reveal_path(&self, path: &Path) -> Result<(), WorkflowError>;
}

const ALFRED_APP_ID: &str = "com.runningwithcrayons.Alfred";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsaScript {
    program: String,
}

impl OsaScript {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Runs `script` and returns its trimmed stdout.
    pub fn run_script(&self, script: &str) -> Result<String, WorkflowError> {
        tracing::debug!(program = %self.program, script, "running script");
        let output = Command::new(&self.program)
            .arg("-e")
            .arg(script)
            .stdin(Stdio::null())
            .output()
            .map_err(|error| {
                WorkflowError::Platform(format!("failed to run {}: {error}", self.program))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let status = output
                .status
                .code()
                .map(|code| code.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(WorkflowError::Platform(format!(
                "{} exited with {status}: {stderr}",
                self.program
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Default for OsaScript {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_OSASCRIPT)
    }
}

impl PlatformActions for OsaScript {
    fn search(&self, query: &str) -> Result<(), WorkflowError> {
        let script = format!(
            "tell application id {} to search {}",
            applescript_string(ALFRED_APP_ID),
            applescript_string(query)
        );
        self.run_script(&script).map(|_| ())
    }

    fn frontmost_app(&self) -> Result<FrontmostApp, WorkflowError> {
        let script = concat!(
            "tell application \"System Events\"\n",
            "set frontApp to first application process whose frontmost is true\n",
            "return (name of frontApp) & linefeed & (bundle identifier of frontApp)\n",
            "end tell"
        );
        let output = self.run_script(script)?;
        parse_frontmost_output(&output)
    }

    fn open_path(&self, path: &Path) -> Result<(), WorkflowError> {
        require_existing(path)?;
        let script = format!(
            "tell application \"Finder\" to open POSIX file {}",
            applescript_string(&path.to_string_lossy())
        );
        self.run_script(&script).map(|_| ())
    }

    fn create_shortcut(
        &self,
        name: &str,
        url: &str,
        folder: &Path,
    ) -> Result<PathBuf, WorkflowError> {
        alfred_plist::write_webloc(folder, name, url)
            .map_err(|error| WorkflowError::path(folder, io::Error::other(format!("{error:#}"))))
    }

    fn reveal_path(&self, path: &Path) -> Result<(), WorkflowError> {
        require_existing(path)?;
        let script = format!(
            "tell application \"Finder\"\nreveal POSIX file {}\nactivate\nend tell",
            applescript_string(&path.to_string_lossy())
        );
        self.run_script(&script).map(|_| ())
    }
}

fn require_existing(path: &Path) -> Result<(), WorkflowError> {
    if path.exists() {
        return Ok(());
    }
    Err(WorkflowError::path(
        path,
        io::Error::new(io::ErrorKind::NotFound, "path does not exist"),
    ))
}

fn parse_frontmost_output(output: &str) -> Result<FrontmostApp, WorkflowError> {
    let mut lines = output.lines().map(str::trim);
    let name = lines.next().filter(|line| !line.is_empty());
    let bundle_id = lines.next().filter(|line| !line.is_empty());

    match (name, bundle_id) {
        (Some(name), Some(bundle_id)) => Ok(FrontmostApp {
            name: name.to_string(),
            bundle_id: bundle_id.to_string(),
        }),
        _ => Err(WorkflowError::Platform(format!(
            "unexpected frontmost app output: {output:?}"
        ))),
    }
}

/// Quotes `raw` as an AppleScript string literal.
pub fn applescript_string(raw: &str) -> String {
    let mut quoted = String::with_capacity(raw.len() + 2);
    quoted.push('"');
    for ch in raw.chars() {
        match ch {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Search(String),
    FrontmostApp,
    Open(PathBuf),
    CreateShortcut {
        name: String,
        url: String,
        folder: PathBuf,
    },
    Reveal(PathBuf),
}

/// Records every call and performs no side effects.
#[derive(Debug, Default)]
pub struct RecordingPlatform {
    calls: RefCell<Vec<PlatformCall>>,
    frontmost: Option<FrontmostApp>,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frontmost(mut self, app: FrontmostApp) -> Self {
        self.frontmost = Some(app);
        self
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: PlatformCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl PlatformActions for RecordingPlatform {
    fn search(&self, query: &str) -> Result<(), WorkflowError> {
        self.record(PlatformCall::Search(query.to_string()));
        Ok(())
    }

    fn frontmost_app(&self) -> Result<FrontmostApp, WorkflowError> {
        self.record(PlatformCall::FrontmostApp);
        self.frontmost
            .clone()
            .ok_or_else(|| WorkflowError::MissingCapability("frontmost app lookup".to_string()))
    }

    fn open_path(&self, path: &Path) -> Result<(), WorkflowError> {
        self.record(PlatformCall::Open(path.to_path_buf()));
        Ok(())
    }

    fn create_shortcut(
        &self,
        name: &str,
        url: &str,
        folder: &Path,
    ) -> Result<PathBuf, WorkflowError> {
        self.record(PlatformCall::CreateShortcut {
            name: name.to_string(),
            url: url.to_string(),
            folder: folder.to_path_buf(),
        });
        Ok(folder.join(format!("{name}.{}", alfred_plist::WEBLOC_EXTENSION)))
    }

    fn reveal_path(&self, path: &Path) -> Result<(), WorkflowError> {
        self.record(PlatformCall::Reveal(path.to_path_buf()));
        Ok(())
    }
}
