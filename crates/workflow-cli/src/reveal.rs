use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use workflow_common::{
    ActionArgs, FeedbackBuilder, Handler, Item, ItemIcon, ItemKind, ItemModifier, Modifier,
    RunContext, WorkflowError, encode_args, expand_home_tokens,
};

pub const LAST_PATH_KEY: &str = "last_path";
const ACTION_KEY: &str = "action";
const PATH_KEY: &str = "path";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathAction {
    Reveal,
    Open,
}

impl PathAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "reveal" => Some(Self::Reveal),
            "open" => Some(Self::Open),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reveal => "reveal",
            Self::Open => "open",
        }
    }
}

/// Suggests revealing the queried path in Finder, `cmd` to open it instead.
#[derive(Debug, Default)]
pub struct RevealHandler {
    home: Option<String>,
}

impl RevealHandler {
    pub fn new(home: Option<String>) -> Self {
        Self { home }
    }

    fn resolve(&self, raw: &str) -> PathBuf {
        match self.home.as_deref() {
            Some(home) => PathBuf::from(expand_home_tokens(raw, home)),
            None => PathBuf::from(raw.trim()),
        }
    }
}

impl Handler for RevealHandler {
    fn name(&self) -> &str {
        "reveal"
    }

    fn on_feedback(
        &mut self,
        ctx: &mut RunContext<'_>,
        feedback: &mut FeedbackBuilder,
    ) -> anyhow::Result<()> {
        let text = ctx.query.text();
        if !text.trim().is_empty() {
            let path = self.resolve(&text);
            if path.exists() {
                feedback.add_item(reveal_item(&path)?);
            } else {
                feedback.add_item(
                    Item::new("No such path")
                        .with_subtitle(path.display().to_string())
                        .with_valid(false),
                );
            }
        }

        if let Some(last) = ctx.settings.get::<Option<String>>(LAST_PATH_KEY, None)? {
            feedback.add_item(
                Item::new(format!("Last revealed: {last}"))
                    .with_uid("reveal: last")
                    .with_arg(encode_action(PathAction::Reveal, Path::new(&last))?)
                    .with_autocomplete(last.clone())
                    .with_valid(Path::new(&last).exists()),
            );
        }
        Ok(())
    }

    fn on_action(&mut self, ctx: &mut RunContext<'_>, args: &ActionArgs) -> anyhow::Result<()> {
        let Some(values) = args.mapping() else {
            return Err(WorkflowError::invalid_argument(
                "expected an encoded action argument",
            )
            .into());
        };

        let raw_action = values.get(ACTION_KEY).map(String::as_str).unwrap_or_default();
        let mut action = PathAction::parse(raw_action).ok_or_else(|| {
            WorkflowError::invalid_argument(format!("unknown action: {raw_action:?}"))
        })?;
        if ctx.options.modifier == Modifier::Command {
            action = PathAction::Open;
        }

        let path = values
            .get(PATH_KEY)
            .filter(|path| !path.trim().is_empty())
            .map(|path| self.resolve(path))
            .ok_or_else(|| WorkflowError::invalid_argument("action argument has no path"))?;

        tracing::info!(action = action.as_str(), path = %path.display(), "path action");
        match action {
            PathAction::Reveal => ctx.platform.reveal_path(&path)?,
            PathAction::Open => ctx.platform.open_path(&path)?,
        }

        ctx.settings
            .set(LAST_PATH_KEY, path.to_string_lossy().to_string())?;
        Ok(())
    }
}

fn reveal_item(path: &Path) -> anyhow::Result<Item> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let display = path.display().to_string();

    Ok(Item::new(format!("Reveal {name}"))
        .with_uid(format!("reveal: {display}"))
        .with_subtitle(display.clone())
        .with_arg(encode_action(PathAction::Reveal, path)?)
        .with_autocomplete(display.clone())
        .with_kind(ItemKind::File)
        .with_icon(ItemIcon::file_icon(display))
        .with_mod(
            "cmd",
            ItemModifier::new()
                .with_subtitle(format!("Open {name}"))
                .with_arg(encode_action(PathAction::Open, path)?),
        ))
}

pub fn encode_action(action: PathAction, path: &Path) -> anyhow::Result<String> {
    let values = BTreeMap::from([
        (ACTION_KEY.to_string(), action.as_str().to_string()),
        (PATH_KEY.to_string(), path.to_string_lossy().to_string()),
    ]);
    Ok(encode_args(&values)?)
}
