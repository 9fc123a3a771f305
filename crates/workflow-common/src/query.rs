use clap::ArgMatches;
use clap::ValueEnum;

pub const RELOAD_SENTINEL: &str = "!";

/// Invocation tokens before and after option extraction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Query {
    pub raw: Vec<String>,
    pub parsed: Vec<String>,
}

impl Query {
    pub fn text(&self) -> String {
        self.parsed.join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.parsed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Feedback,
    Action,
}

impl Mode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "feedback" => Some(Self::Feedback),
            "action" => Some(Self::Action),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Feedback => "feedback",
            Self::Action => "action",
        }
    }
}

/// Keyboard modifier held when the user actioned an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Modifier {
    #[default]
    None,
    #[value(alias = "ctrl")]
    Control,
    #[value(alias = "cmd")]
    Command,
    #[value(aliases = ["option", "opt"])]
    Alt,
    Shift,
    Fn,
}

/// Options resolved for one run. `matches` keeps everything handlers
/// registered so they can read their own flags back.
#[derive(Debug, Clone)]
pub struct Options {
    pub mode: Mode,
    pub modifier: Modifier,
    pub reload: bool,
    pub matches: ArgMatches,
}

impl Options {
    pub fn flag(&self, id: &str) -> bool {
        self.matches
            .try_get_one::<bool>(id)
            .ok()
            .flatten()
            .copied()
            .unwrap_or(false)
    }

    pub fn value(&self, id: &str) -> Option<&str> {
        self.matches
            .try_get_one::<String>(id)
            .ok()
            .flatten()
            .map(String::as_str)
    }
}

/// Strips a `!` found at either end of `tokens`. Only one token is removed,
/// the leading position winning when both ends match.
pub fn strip_reload_sentinel(tokens: &mut Vec<String>) -> bool {
    if tokens.first().map(String::as_str) == Some(RELOAD_SENTINEL) {
        tokens.remove(0);
        return true;
    }
    if tokens.last().map(String::as_str) == Some(RELOAD_SENTINEL) {
        tokens.pop();
        return true;
    }
    false
}
