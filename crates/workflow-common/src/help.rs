use alfred_core::{Item, ItemIcon};
use clap::{Arg, ArgAction, Command};

use crate::config::ReloadOptions;
use crate::feedback::FeedbackBuilder;
use crate::handler::{Handler, RunContext};

pub const HELP_ARG_ID: &str = "help";
const HELP_ICON_PATH: &str =
    "/System/Library/CoreServices/CoreTypes.bundle/Contents/Resources/ToolbarInfo.icns";

#[derive(Debug, Default)]
pub struct HelpHandler;

impl HelpHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Handler for HelpHandler {
    fn name(&self) -> &str {
        "help"
    }

    fn register_options(&self, command: Command) -> Command {
        command.arg(
            Arg::new(HELP_ARG_ID)
                .short('h')
                .short_alias('?')
                .long("help")
                .help("Show workflow help")
                .action(ArgAction::SetTrue),
        )
    }

    fn on_feedback(
        &mut self,
        ctx: &mut RunContext<'_>,
        feedback: &mut FeedbackBuilder,
    ) -> anyhow::Result<()> {
        if !ctx.config.help_feedback || !ctx.options.flag(HELP_ARG_ID) {
            return Ok(());
        }

        if let Some(item) = reload_help_item(ctx.config.reload) {
            feedback.add_item(item);
        }
        Ok(())
    }
}

fn reload_help_item(reload: ReloadOptions) -> Option<Item> {
    if !reload.is_configured() {
        return None;
    }
    let subtitle = match (reload.sentinel, reload.flag) {
        (true, true) => "Add ! at the beginning or end of the query, or pass --reload",
        (true, false) => "Add ! at the beginning or end of the query",
        _ => "Pass --reload with the query",
    };

    Some(
        Item::new("Reload cached feedback")
            .with_uid("Workflow Help: reload")
            .with_subtitle(subtitle)
            .with_autocomplete("!")
            .with_valid(false)
            .with_icon(ItemIcon::new(HELP_ICON_PATH)),
    )
}
