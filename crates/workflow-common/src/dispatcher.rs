use std::io::Write;
use std::path::Path;

use alfred_core::decode_args;
use chrono::{DateTime, Utc};
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};

use crate::config::WorkflowConfig;
use crate::error::WorkflowError;
use crate::feedback::{FeedbackBuilder, FeedbackCache};
use crate::handler::{ActionArgs, Handler, HandlerController, RunContext};
use crate::platform::PlatformActions;
use crate::query::{Modifier, Mode, Options, Query, strip_reload_sentinel};
use crate::settings::SettingsStore;

pub const MODE_ARG: &str = "mode";
pub const MODIFIER_ARG: &str = "modifier";
pub const RELOAD_ARG: &str = "reload";
const QUERY_ARG: &str = "query";

/// Drives one invocation: parse, pick a mode, walk the handlers through it.
pub struct Dispatcher<P> {
    config: WorkflowConfig,
    settings: SettingsStore,
    platform: P,
    handlers: HandlerController,
    now: fn() -> DateTime<Utc>,
    query: Option<Query>,
    mode: Option<Mode>,
    emitted: bool,
}

impl<P: PlatformActions> Dispatcher<P> {
    pub fn new(config: WorkflowConfig, platform: P) -> Self {
        let settings = SettingsStore::from_config(&config);
        Self {
            config,
            settings,
            platform,
            handlers: HandlerController::new(),
            now: Utc::now,
            query: None,
            mode: None,
            emitted: false,
        }
    }

    pub fn with_handler(mut self, handler: impl Handler + 'static) -> Self {
        self.add_handler(handler);
        self
    }

    pub fn add_handler(&mut self, handler: impl Handler + 'static) {
        self.handlers.add(Box::new(handler));
    }

    pub fn with_clock(mut self, now: fn() -> DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Mode of the last run. Known before option parsing finishes, so a run
    /// that fails on a bad option still reports feedback mode; `None` when
    /// the requested mode is unsupported.
    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    pub fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    /// Whether the last run already wrote its feedback document.
    pub fn emitted(&self) -> bool {
        self.emitted
    }

    pub fn command(&self) -> Command {
        let mut command = Command::new("workflow")
            .no_binary_name(true)
            .disable_help_flag(true)
            .disable_version_flag(true)
            .arg(
                Arg::new(MODE_ARG)
                    .short('m')
                    .long("mode")
                    .value_name("MODE")
                    .help("feedback | action")
                    .default_value(Mode::Feedback.as_str())
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new(MODIFIER_ARG)
                    .long("modifier")
                    .value_name("MODIFIER")
                    .value_parser(value_parser!(Modifier))
                    .default_value("none")
                    .action(ArgAction::Set),
            );

        if self.config.reload.flag {
            command = command.arg(
                Arg::new(RELOAD_ARG)
                    .short('r')
                    .long("reload")
                    .help("Rebuild cached feedback")
                    .action(ArgAction::SetTrue),
            );
        }

        self.handlers.register_options(command).arg(
            Arg::new(QUERY_ARG)
                .value_name("QUERY")
                .num_args(0..)
                .action(ArgAction::Append),
        )
    }

    pub fn parse(&self, tokens: &[String]) -> Result<(Query, Options), WorkflowError> {
        let mut remaining = tokens.to_vec();
        let sentinel = self.config.reload.sentinel && strip_reload_sentinel(&mut remaining);

        let matches = self.match_options(&mut remaining)?;
        let raw_mode = matches
            .get_one::<String>(MODE_ARG)
            .map(String::as_str)
            .unwrap_or(Mode::Feedback.as_str());
        let mode = Mode::parse(raw_mode).ok_or_else(|| {
            WorkflowError::invalid_argument(format!("unsupported mode: {raw_mode}"))
        })?;
        let modifier = matches
            .get_one::<Modifier>(MODIFIER_ARG)
            .copied()
            .unwrap_or_default();
        let reload_flag = self.config.reload.flag && matches.get_flag(RELOAD_ARG);
        let parsed = matches
            .get_many::<String>(QUERY_ARG)
            .map(|values| values.cloned().collect())
            .unwrap_or_default();

        let query = Query {
            raw: tokens.to_vec(),
            parsed,
        };
        let options = Options {
            mode,
            modifier,
            reload: sentinel || reload_flag,
            matches,
        };
        Ok((query, options))
    }

    /// Unknown options are dropped one at a time until the rest parses.
    fn match_options(&self, remaining: &mut Vec<String>) -> Result<ArgMatches, WorkflowError> {
        let command = self.command();
        loop {
            let error = match command.clone().try_get_matches_from(remaining.iter()) {
                Ok(matches) => return Ok(matches),
                Err(error) => error,
            };

            if error.kind() != ErrorKind::UnknownArgument {
                return Err(WorkflowError::invalid_argument(clap_message(&error)));
            }

            let dropped = unknown_option(&error)
                .and_then(|unknown| drop_unknown_option(remaining, &unknown));
            let Some(dropped) = dropped else {
                return Err(WorkflowError::invalid_argument(clap_message(&error)));
            };
            tracing::debug!(option = %dropped, "ignoring unknown option");
        }
    }

    pub fn run<W: Write>(&mut self, tokens: &[String], out: &mut W) -> anyhow::Result<()> {
        self.query = None;
        self.mode = mode_hint(tokens);
        self.emitted = false;

        let (query, options) = self.parse(tokens)?;
        tracing::debug!(
            mode = options.mode.as_str(),
            modifier = ?options.modifier,
            reload = options.reload,
            query = %query.text(),
            "dispatching"
        );
        self.mode = Some(options.mode);
        self.query = Some(query.clone());

        let Self {
            config,
            settings,
            platform,
            handlers,
            now,
            emitted,
            ..
        } = self;
        let mut ctx = RunContext {
            config,
            settings,
            platform: &*platform,
            query: &query,
            options: &options,
        };

        let dispatched = match options.mode {
            Mode::Feedback => run_feedback(handlers, &mut ctx, *now, out, emitted),
            Mode::Action => run_action(handlers, &mut ctx),
        };
        let closed = handlers.on_close(&mut ctx);

        dispatched?;
        closed
    }
}

fn run_feedback<W: Write>(
    handlers: &mut HandlerController,
    ctx: &mut RunContext<'_>,
    now: fn() -> DateTime<Utc>,
    out: &mut W,
    emitted: &mut bool,
) -> anyhow::Result<()> {
    let query_text = ctx.query.text();
    let mut feedback = FeedbackBuilder::new(ctx.config.feedback_format);
    let cache = ctx
        .config
        .feedback_cache_enabled()
        .then(|| FeedbackCache::new(ctx.config.feedback_cache_file(), ctx.config.feedback_cache_ttl_secs));

    let cached = match cache.as_ref() {
        Some(cache) if !ctx.options.reload => cache.load(&query_text, now()),
        _ => None,
    };

    match cached {
        Some(items) => {
            tracing::debug!(items = items.len(), "reusing cached feedback");
            feedback.extend(items);
        }
        None => {
            handlers.on_feedback(ctx, &mut feedback)?;
            if let Some(cache) = cache.as_ref() {
                ctx.config.storage.volatile()?;
                cache.store(&query_text, feedback.items(), now())?;
            }
        }
    }

    let mut document = feedback.to_alfred(&query_text)?;
    if !document.ends_with('\n') {
        document.push('\n');
    }
    out.write_all(document.as_bytes())?;
    out.flush()?;
    *emitted = true;
    Ok(())
}

fn run_action(handlers: &mut HandlerController, ctx: &mut RunContext<'_>) -> anyhow::Result<()> {
    let args = action_args(&ctx.query.parsed);

    if handlers.is_empty() {
        return open_existing_paths(ctx.platform, &args);
    }
    handlers.on_action(ctx, &args)
}

/// A lone token that decodes as an argument document becomes a mapping.
pub fn action_args(parsed: &[String]) -> ActionArgs {
    if let [single] = parsed
        && let Ok(values) = decode_args(single)
    {
        return ActionArgs::Mapping(values);
    }
    ActionArgs::Tokens(parsed.to_vec())
}

fn open_existing_paths(platform: &dyn PlatformActions, args: &ActionArgs) -> anyhow::Result<()> {
    let Some(tokens) = args.tokens() else {
        tracing::debug!("no handlers registered; argument mapping ignored");
        return Ok(());
    };

    for token in tokens {
        let path = Path::new(token);
        if path.exists() {
            platform.open_path(path)?;
        } else {
            tracing::debug!(token = %token, "not an existing path; skipped");
        }
    }
    Ok(())
}

/// Removes the token (or the letter of a short-option cluster) that clap
/// rejected, returning what was dropped.
fn drop_unknown_option(remaining: &mut Vec<String>, unknown: &str) -> Option<String> {
    if let Some(position) = remaining.iter().position(|token| token == unknown) {
        return Some(remaining.remove(position));
    }

    if unknown.starts_with("--") {
        let prefix = format!("{unknown}=");
        let position = remaining.iter().position(|token| token.starts_with(&prefix))?;
        return Some(remaining.remove(position));
    }

    let letter = unknown.strip_prefix('-')?;
    let mut letters = letter.chars();
    let letter = letters.next()?;
    if letters.next().is_some() {
        return None;
    }

    let position = remaining.iter().position(|token| {
        token.len() > 1
            && token.starts_with('-')
            && !token.starts_with("--")
            && token[1..].contains(letter)
    })?;
    let cluster = &remaining[position][1..];
    let offset = cluster.find(letter)? + 1;
    let mut rest = remaining[position].clone();
    rest.remove(offset);
    if rest == "-" {
        remaining.remove(position);
    } else {
        remaining[position] = rest;
    }
    Some(format!("-{letter}"))
}

/// Mode requested on the command line, read without the full grammar.
/// Defaults to feedback; `None` for an unsupported value.
fn mode_hint(tokens: &[String]) -> Option<Mode> {
    let mut requested = None;
    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        if token == "--" {
            break;
        }
        let value = if token == "--mode" || token == "-m" {
            iter.next().map(String::as_str)
        } else if let Some(value) = token.strip_prefix("--mode=") {
            Some(value)
        } else if let Some(value) = token.strip_prefix("-m").filter(|value| !value.is_empty()) {
            Some(value.strip_prefix('=').unwrap_or(value))
        } else {
            continue;
        };
        requested = value;
    }

    match requested {
        Some(raw) => Mode::parse(raw),
        None => Some(Mode::Feedback),
    }
}

fn unknown_option(error: &clap::Error) -> Option<String> {
    match error.get(ContextKind::InvalidArg)? {
        ContextValue::String(value) => Some(value.clone()),
        _ => None,
    }
}

fn clap_message(error: &clap::Error) -> String {
    let rendered = error.to_string();
    rendered
        .lines()
        .next()
        .unwrap_or_default()
        .trim_start_matches("error: ")
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::fs;
    use std::rc::Rc;

    use alfred_core::{Item, encode_args};
    use chrono::TimeZone;
    use clap::{Arg, ArgAction};

    use crate::help::HelpHandler;
    use crate::platform::{PlatformCall, RecordingPlatform};
    use crate::storage::StorageDirs;

    use super::*;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Probe {
        name: &'static str,
        log: Log,
        fail_feedback: bool,
    }

    impl Probe {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                log: Rc::clone(log),
                fail_feedback: false,
            }
        }
    }

    impl Handler for Probe {
        fn name(&self) -> &str {
            self.name
        }

        fn on_feedback(
            &mut self,
            _ctx: &mut RunContext<'_>,
            feedback: &mut FeedbackBuilder,
        ) -> anyhow::Result<()> {
            self.log.borrow_mut().push(format!("{}:feedback", self.name));
            if self.fail_feedback {
                return Err(WorkflowError::invalid_argument("probe failed").into());
            }
            feedback.add_item(Item::new(format!("from {}", self.name)));
            Ok(())
        }

        fn on_action(&mut self, _ctx: &mut RunContext<'_>, args: &ActionArgs) -> anyhow::Result<()> {
            self.log
                .borrow_mut()
                .push(format!("{}:action:{args:?}", self.name));
            Ok(())
        }

        fn on_close(&mut self, _ctx: &mut RunContext<'_>) -> anyhow::Result<()> {
            self.log.borrow_mut().push(format!("{}:close", self.name));
            Ok(())
        }
    }

    struct Verbose;

    impl Handler for Verbose {
        fn name(&self) -> &str {
            "verbose"
        }

        fn register_options(&self, command: Command) -> Command {
            command.arg(
                Arg::new("verbose")
                    .long("verbose")
                    .action(ArgAction::SetTrue),
            )
        }

        fn on_feedback(
            &mut self,
            ctx: &mut RunContext<'_>,
            feedback: &mut FeedbackBuilder,
        ) -> anyhow::Result<()> {
            if ctx.options.flag("verbose") {
                feedback.add_item(Item::new("verbose on"));
            }
            Ok(())
        }
    }

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn fixture_config(root: &Path) -> WorkflowConfig {
        WorkflowConfig::new(
            "com.example.tests",
            StorageDirs::new(root.join("cache"), root.join("data")),
        )
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 10, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn run_to_string(
        dispatcher: &mut Dispatcher<RecordingPlatform>,
        args: &[&str],
    ) -> (anyhow::Result<()>, String) {
        let mut out = Vec::new();
        let result = dispatcher.run(&tokens(args), &mut out);
        (result, String::from_utf8(out).expect("utf8 output"))
    }

    #[test]
    fn feedback_items_follow_handler_registration_order() {
        let temp = tempfile::tempdir().expect("temp dir");
        let log = Log::default();
        let mut dispatcher = Dispatcher::new(fixture_config(temp.path()), RecordingPlatform::new())
            .with_handler(Probe::new("zeta", &log))
            .with_handler(Probe::new("alpha", &log))
            .with_handler(Probe::new("mid", &log));

        let (result, output) = run_to_string(&mut dispatcher, &["--mode", "feedback", "q"]);
        result.expect("run");

        let zeta = output.find("from zeta").expect("zeta item");
        let alpha = output.find("from alpha").expect("alpha item");
        let mid = output.find("from mid").expect("mid item");
        assert!(zeta < alpha && alpha < mid, "{output}");
        assert_eq!(
            *log.borrow(),
            vec![
                "zeta:feedback",
                "alpha:feedback",
                "mid:feedback",
                "zeta:close",
                "alpha:close",
                "mid:close",
            ]
        );
    }

    #[test]
    fn feedback_without_handlers_is_empty_document_with_query() {
        let temp = tempfile::tempdir().expect("temp dir");
        let mut dispatcher =
            Dispatcher::new(fixture_config(temp.path()), RecordingPlatform::new());

        let (result, output) = run_to_string(&mut dispatcher, &["hello", "world"]);
        result.expect("run");

        assert!(output.contains("<items query=\"hello world\"/>"), "{output}");
        assert_eq!(output.matches("<?xml").count(), 1);
        assert!(dispatcher.emitted());
    }

    #[test]
    fn action_with_single_encoded_token_passes_mapping() {
        let temp = tempfile::tempdir().expect("temp dir");
        let log = Log::default();
        let mut dispatcher = Dispatcher::new(fixture_config(temp.path()), RecordingPlatform::new())
            .with_handler(Probe::new("p", &log));
        let values = BTreeMap::from([("path".to_string(), "/tmp".to_string())]);
        let encoded = encode_args(&values).expect("encode");

        let (result, output) =
            run_to_string(&mut dispatcher, &["--mode", "action", encoded.as_str()]);
        result.expect("run");

        assert!(output.is_empty(), "action mode writes nothing");
        assert_eq!(
            log.borrow()[0],
            format!("p:action:{:?}", ActionArgs::Mapping(values))
        );
    }

    #[test]
    fn action_with_several_tokens_passes_token_list() {
        let temp = tempfile::tempdir().expect("temp dir");
        let log = Log::default();
        let mut dispatcher = Dispatcher::new(fixture_config(temp.path()), RecordingPlatform::new())
            .with_handler(Probe::new("p", &log));

        let (result, _) = run_to_string(&mut dispatcher, &["-m", "action", "<root/>", "two"]);
        result.expect("run");

        let expected = ActionArgs::Tokens(tokens(&["<root/>", "two"]));
        assert_eq!(log.borrow()[0], format!("p:action:{expected:?}"));
    }

    #[test]
    fn action_with_single_plain_token_passes_token_list() {
        assert_eq!(
            action_args(&tokens(&["/Users/tester"])),
            ActionArgs::Tokens(tokens(&["/Users/tester"]))
        );
    }

    #[test]
    fn unsupported_mode_is_invalid_argument_without_output() {
        let temp = tempfile::tempdir().expect("temp dir");
        let log = Log::default();
        let mut dispatcher = Dispatcher::new(fixture_config(temp.path()), RecordingPlatform::new())
            .with_handler(Probe::new("p", &log));

        let (result, output) = run_to_string(&mut dispatcher, &["--mode", "list", "q"]);
        let error = result.expect_err("unsupported mode");
        let workflow_error = error
            .downcast_ref::<WorkflowError>()
            .expect("workflow error");

        assert_eq!(workflow_error.status_code(), 10);
        assert!(workflow_error.to_string().contains("unsupported mode: list"));
        assert!(output.is_empty());
        assert!(log.borrow().is_empty(), "no handler step runs");
        assert_eq!(dispatcher.mode(), None);
    }

    #[test]
    fn unknown_options_are_dropped() {
        let temp = tempfile::tempdir().expect("temp dir");
        let dispatcher = Dispatcher::new(fixture_config(temp.path()), RecordingPlatform::new());

        let (query, options) = dispatcher
            .parse(&tokens(&["--bogus", "foo", "--also-bogus=1", "bar"]))
            .expect("unknown options are not fatal");

        assert_eq!(query.parsed, tokens(&["foo", "bar"]));
        assert_eq!(
            query.raw,
            tokens(&["--bogus", "foo", "--also-bogus=1", "bar"])
        );
        assert_eq!(options.mode, Mode::Feedback);
    }

    #[test]
    fn unknown_letters_in_short_clusters_are_dropped() {
        let temp = tempfile::tempdir().expect("temp dir");
        let dispatcher = Dispatcher::new(fixture_config(temp.path()), RecordingPlatform::new());

        let (query, options) = dispatcher
            .parse(&tokens(&["-rx", "foo"]))
            .expect("unknown short flag is not fatal");
        assert!(options.reload);
        assert_eq!(query.parsed, tokens(&["foo"]));

        let (query, _) = dispatcher
            .parse(&tokens(&["-xz", "foo"]))
            .expect("whole cluster unknown");
        assert_eq!(query.parsed, tokens(&["foo"]));
    }

    #[test]
    fn unknown_letter_next_to_handler_flag_is_dropped() {
        let temp = tempfile::tempdir().expect("temp dir");
        let dispatcher = Dispatcher::new(fixture_config(temp.path()), RecordingPlatform::new())
            .with_handler(HelpHandler::new());

        let (query, options) = dispatcher
            .parse(&tokens(&["-hz", "foo"]))
            .expect("unknown short flag is not fatal");
        assert!(options.flag(crate::help::HELP_ARG_ID));
        assert_eq!(query.parsed, tokens(&["foo"]));
    }

    #[test]
    fn mode_is_known_even_when_option_parsing_fails() {
        let temp = tempfile::tempdir().expect("temp dir");
        let mut dispatcher =
            Dispatcher::new(fixture_config(temp.path()), RecordingPlatform::new());

        let (result, _) = run_to_string(&mut dispatcher, &["--modifier", "hyper", "q"]);
        assert!(result.is_err());
        assert_eq!(dispatcher.mode(), Some(Mode::Feedback));

        let (result, _) = run_to_string(&mut dispatcher, &["-m", "action", "--modifier", "hyper"]);
        assert!(result.is_err());
        assert_eq!(dispatcher.mode(), Some(Mode::Action));
    }

    #[test]
    fn mode_hint_reads_every_spelling() {
        assert_eq!(mode_hint(&tokens(&["q"])), Some(Mode::Feedback));
        assert_eq!(mode_hint(&tokens(&["--mode=action"])), Some(Mode::Action));
        assert_eq!(mode_hint(&tokens(&["-maction"])), Some(Mode::Action));
        assert_eq!(mode_hint(&tokens(&["-m", "list"])), None);
        assert_eq!(
            mode_hint(&tokens(&["--", "--mode", "action"])),
            Some(Mode::Feedback)
        );
    }

    #[test]
    fn modifier_and_reload_flag_parse() {
        let temp = tempfile::tempdir().expect("temp dir");
        let dispatcher = Dispatcher::new(fixture_config(temp.path()), RecordingPlatform::new());

        let (query, options) = dispatcher
            .parse(&tokens(&["--modifier", "cmd", "-r", "foo"]))
            .expect("parse");

        assert_eq!(options.modifier, Modifier::Command);
        assert!(options.reload);
        assert_eq!(query.parsed, tokens(&["foo"]));
    }

    #[test]
    fn invalid_modifier_is_invalid_argument() {
        let temp = tempfile::tempdir().expect("temp dir");
        let dispatcher = Dispatcher::new(fixture_config(temp.path()), RecordingPlatform::new());

        let error = dispatcher
            .parse(&tokens(&["--modifier", "hyper"]))
            .expect_err("unknown modifier");
        assert_eq!(error.status_code(), 10);
    }

    #[test]
    fn reload_sentinel_sets_flag_only_at_either_end() {
        let temp = tempfile::tempdir().expect("temp dir");
        let dispatcher = Dispatcher::new(fixture_config(temp.path()), RecordingPlatform::new());

        for args in [["!", "foo"], ["foo", "!"]] {
            let (query, options) = dispatcher.parse(&tokens(&args)).expect("parse");
            assert!(options.reload, "{args:?}");
            assert_eq!(query.parsed, tokens(&["foo"]));
        }

        let (query, options) = dispatcher
            .parse(&tokens(&["foo", "!", "bar"]))
            .expect("parse");
        assert!(!options.reload);
        assert_eq!(query.parsed, tokens(&["foo", "!", "bar"]));
    }

    #[test]
    fn reload_sentinel_can_be_disabled() {
        let temp = tempfile::tempdir().expect("temp dir");
        let mut config = fixture_config(temp.path());
        config.reload.sentinel = false;
        config.reload.flag = false;
        let dispatcher = Dispatcher::new(config, RecordingPlatform::new());

        let (query, options) = dispatcher.parse(&tokens(&["!", "foo"])).expect("parse");
        assert!(!options.reload);
        assert_eq!(query.parsed, tokens(&["!", "foo"]));

        let (query, _) = dispatcher.parse(&tokens(&["--reload", "foo"])).expect("parse");
        assert_eq!(query.parsed, tokens(&["foo"]), "unregistered flag is dropped");
    }

    #[test]
    fn handler_options_are_registered() {
        let temp = tempfile::tempdir().expect("temp dir");
        let mut dispatcher = Dispatcher::new(fixture_config(temp.path()), RecordingPlatform::new())
            .with_handler(Verbose);

        let (result, output) = run_to_string(&mut dispatcher, &["--verbose", "x"]);
        result.expect("run");
        assert!(output.contains("verbose on"));
    }

    #[test]
    fn close_runs_even_when_feedback_fails() {
        let temp = tempfile::tempdir().expect("temp dir");
        let log = Log::default();
        let mut failing = Probe::new("failing", &log);
        failing.fail_feedback = true;
        let mut dispatcher = Dispatcher::new(fixture_config(temp.path()), RecordingPlatform::new())
            .with_handler(failing)
            .with_handler(Probe::new("after", &log));

        let (result, output) = run_to_string(&mut dispatcher, &["q"]);

        assert!(result.is_err());
        assert!(output.is_empty());
        assert!(!dispatcher.emitted());
        assert_eq!(
            *log.borrow(),
            vec!["failing:feedback", "failing:close", "after:close"]
        );
    }

    #[test]
    fn fallback_opens_existing_paths_when_no_handlers() {
        let temp = tempfile::tempdir().expect("temp dir");
        let existing = temp.path().join("report.txt");
        fs::write(&existing, "x").expect("write");
        let existing = existing.to_string_lossy().to_string();
        let mut dispatcher =
            Dispatcher::new(fixture_config(temp.path()), RecordingPlatform::new());

        let (result, _) = run_to_string(
            &mut dispatcher,
            &["--mode", "action", existing.as_str(), "/not/a/real/path"],
        );
        result.expect("run");

        assert_eq!(
            dispatcher.platform().calls(),
            vec![PlatformCall::Open(existing.into())]
        );
    }

    #[test]
    fn fallback_is_skipped_when_any_handler_is_registered() {
        let temp = tempfile::tempdir().expect("temp dir");
        let existing = temp.path().to_string_lossy().to_string();
        let mut dispatcher = Dispatcher::new(fixture_config(temp.path()), RecordingPlatform::new())
            .with_handler(HelpHandler::new());

        let (result, _) = run_to_string(&mut dispatcher, &["--mode", "action", existing.as_str()]);
        result.expect("run");

        assert!(dispatcher.platform().calls().is_empty());
    }

    #[test]
    fn help_handler_adds_reload_item_on_request() {
        let temp = tempfile::tempdir().expect("temp dir");
        let mut dispatcher = Dispatcher::new(fixture_config(temp.path()), RecordingPlatform::new())
            .with_handler(HelpHandler::new());

        let (result, output) = run_to_string(&mut dispatcher, &["--help"]);
        result.expect("run");
        assert!(output.contains("Reload cached feedback"));

        let (result, output) = run_to_string(&mut dispatcher, &["plain"]);
        result.expect("run");
        assert!(!output.contains("Reload cached feedback"));
    }

    #[test]
    fn cached_feedback_is_reused_until_reload() {
        let temp = tempfile::tempdir().expect("temp dir");
        let log = Log::default();
        let mut config = fixture_config(temp.path());
        config.feedback_cache_ttl_secs = 600;
        let mut dispatcher = Dispatcher::new(config, RecordingPlatform::new())
            .with_clock(fixed_now)
            .with_handler(Probe::new("p", &log));

        let (result, first) = run_to_string(&mut dispatcher, &["cached"]);
        result.expect("first run");
        let (result, second) = run_to_string(&mut dispatcher, &["cached"]);
        result.expect("second run");
        let (result, _) = run_to_string(&mut dispatcher, &["!", "cached"]);
        result.expect("reload run");

        assert_eq!(first, second);
        let feedback_calls = log
            .borrow()
            .iter()
            .filter(|entry| entry.ends_with(":feedback"))
            .count();
        assert_eq!(feedback_calls, 2, "second run is served from cache");
        assert!(dispatcher.config().feedback_cache_file().is_file());
    }
}
