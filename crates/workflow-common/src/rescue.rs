//! Top-level failure handling: classify, log, optionally tell the user.

use std::io::{self, Write};

use alfred_core::{Item, ItemIcon};

use crate::config::WorkflowConfig;
use crate::dispatcher::Dispatcher;
use crate::error::WorkflowError;
use crate::feedback::FeedbackBuilder;
use crate::platform::PlatformActions;
use crate::query::Mode;

pub const RESCUE_UID: &str = "Rescue Feedback";
pub const INTERRUPTED_EXIT_CODE: i32 = 1;
pub const UNEXPECTED_EXIT_CODE: i32 = -1;
const ALERT_ICON_PATH: &str =
    "/System/Library/CoreServices/CoreTypes.bundle/Contents/Resources/AlertStopIcon.icns";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: &'static str,
    pub code: i32,
    pub message: String,
}

impl Failure {
    pub fn classify(error: &anyhow::Error) -> Self {
        let message = format!("{error:#}");

        if let Some(workflow_error) = error
            .chain()
            .find_map(|cause| cause.downcast_ref::<WorkflowError>())
        {
            return Self {
                kind: workflow_error.kind_name(),
                code: workflow_error.status_code(),
                message,
            };
        }

        let interrupted = error.chain().any(|cause| {
            cause
                .downcast_ref::<io::Error>()
                .is_some_and(|io_error| io_error.kind() == io::ErrorKind::Interrupted)
        });
        if interrupted {
            return Self {
                kind: "Interrupted",
                code: INTERRUPTED_EXIT_CODE,
                message,
            };
        }

        Self {
            kind: "UnexpectedError",
            code: UNEXPECTED_EXIT_CODE,
            message,
        }
    }
}

pub fn rescue_item(config: &WorkflowConfig, failure: &Failure) -> Item {
    Item::new(format!("{}: {}", failure.kind, failure.message))
        .with_uid(RESCUE_UID)
        .with_subtitle(format!(
            "Check log {} for extra debug info.",
            config.log_file().display()
        ))
        .with_autocomplete("")
        .with_valid(false)
        .with_icon(ItemIcon::new(ALERT_ICON_PATH))
}

/// Runs one invocation and turns any failure into an exit code.
///
/// Feedback runs that fail before emitting their document get a single
/// rescue item instead, when `rescue_feedback` is enabled.
pub fn run_friendly<P, W>(dispatcher: &mut Dispatcher<P>, tokens: &[String], out: &mut W) -> i32
where
    P: PlatformActions,
    W: Write,
{
    let error = match dispatcher.run(tokens, out) {
        Ok(()) => return 0,
        Err(error) => error,
    };

    let failure = Failure::classify(&error);
    tracing::error!(
        kind = failure.kind,
        code = failure.code,
        error = %failure.message,
        "workflow run failed"
    );

    let wants_rescue = dispatcher.config().rescue_feedback
        && dispatcher.mode() == Some(Mode::Feedback)
        && !dispatcher.emitted();
    if wants_rescue
        && let Err(write_error) = write_rescue(dispatcher, &failure, out)
    {
        tracing::warn!(error = %write_error, "failed to write rescue feedback");
    }

    failure.code
}

fn write_rescue<P, W>(
    dispatcher: &Dispatcher<P>,
    failure: &Failure,
    out: &mut W,
) -> anyhow::Result<()>
where
    P: PlatformActions,
    W: Write,
{
    let config = dispatcher.config();
    let query = dispatcher.query().map(|query| query.text()).unwrap_or_default();
    let mut feedback = FeedbackBuilder::new(config.feedback_format);
    feedback.add_item(rescue_item(config, failure));

    let mut document = feedback.to_alfred(&query)?;
    if !document.ends_with('\n') {
        document.push('\n');
    }
    out.write_all(document.as_bytes())?;
    out.flush()?;
    Ok(())
}
