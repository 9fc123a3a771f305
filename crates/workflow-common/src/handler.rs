use std::collections::BTreeMap;
use std::fmt;

use clap::Command;

use crate::config::WorkflowConfig;
use crate::feedback::FeedbackBuilder;
use crate::platform::PlatformActions;
use crate::query::{Options, Query};
use crate::settings::SettingsStore;

/// What an action-mode run hands to its handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionArgs {
    /// A single token that decoded as an argument document.
    Mapping(BTreeMap<String, String>),
    Tokens(Vec<String>),
}

impl ActionArgs {
    pub fn mapping(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::Mapping(values) => Some(values),
            Self::Tokens(_) => None,
        }
    }

    pub fn tokens(&self) -> Option<&[String]> {
        match self {
            Self::Mapping(_) => None,
            Self::Tokens(tokens) => Some(tokens),
        }
    }
}

/// Everything a handler may touch during one lifecycle step.
pub struct RunContext<'a> {
    pub config: &'a WorkflowConfig,
    pub settings: &'a mut SettingsStore,
    pub platform: &'a dyn PlatformActions,
    pub query: &'a Query,
    pub options: &'a Options,
}

/// A pluggable unit of workflow behaviour. Every hook defaults to a no-op.
pub trait Handler {
    fn name(&self) -> &str;

    /// Adds this handler's options to the invocation grammar.
    fn register_options(&self, command: Command) -> Command {
        command
    }

    fn on_feedback(
        &mut self,
        _ctx: &mut RunContext<'_>,
        _feedback: &mut FeedbackBuilder,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_action(&mut self, _ctx: &mut RunContext<'_>, _args: &ActionArgs) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_close(&mut self, _ctx: &mut RunContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Append-only, ordered handler list. Registration order is option order and
/// feedback order.
#[derive(Default)]
pub struct HandlerController {
    handlers: Vec<Box<dyn Handler>>,
}

impl HandlerController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, handler: Box<dyn Handler>) {
        self.handlers.push(handler);
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|handler| handler.name()).collect()
    }

    pub fn register_options(&self, command: Command) -> Command {
        self.handlers
            .iter()
            .fold(command, |command, handler| handler.register_options(command))
    }

    pub fn on_feedback(
        &mut self,
        ctx: &mut RunContext<'_>,
        feedback: &mut FeedbackBuilder,
    ) -> anyhow::Result<()> {
        for handler in &mut self.handlers {
            tracing::debug!(handler = handler.name(), "feedback");
            handler.on_feedback(ctx, feedback)?;
        }
        Ok(())
    }

    pub fn on_action(&mut self, ctx: &mut RunContext<'_>, args: &ActionArgs) -> anyhow::Result<()> {
        for handler in &mut self.handlers {
            tracing::debug!(handler = handler.name(), "action");
            handler.on_action(ctx, args)?;
        }
        Ok(())
    }

    /// Closes every handler even if an earlier one fails; the first error wins.
    pub fn on_close(&mut self, ctx: &mut RunContext<'_>) -> anyhow::Result<()> {
        let mut first_error = None;
        for handler in &mut self.handlers {
            if let Err(error) = handler.on_close(ctx) {
                tracing::warn!(handler = handler.name(), error = %error, "close failed");
                first_error.get_or_insert(error);
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for HandlerController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerController")
            .field("handlers", &self.names())
            .finish()
    }
}
