use std::io::{self, Write};

use workflow_common::{
    Dispatcher, HelpHandler, OsaScript, PlatformActions, WorkflowConfig, init_logging,
    run_friendly,
};

mod reveal;

use reveal::RevealHandler;

fn main() {
    let tokens: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let stdout = io::stdout();
    let code = run(&tokens, &mut stdout.lock());
    std::process::exit(code);
}

fn run<W: Write>(tokens: &[String], out: &mut W) -> i32 {
    let config = match WorkflowConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("error: {error}");
            return error.status_code();
        }
    };

    init_logging(&config);
    let platform = OsaScript::new(config.osascript_bin.clone());
    let home = std::env::var("HOME").ok();
    run_with(config, platform, home, tokens, out)
}

fn run_with<P, W>(
    config: WorkflowConfig,
    platform: P,
    home: Option<String>,
    tokens: &[String],
    out: &mut W,
) -> i32
where
    P: PlatformActions,
    W: Write,
{
    tracing::debug!(bundle_id = %config.bundle_id, "starting workflow");
    let mut dispatcher = Dispatcher::new(config, platform);
    if dispatcher.config().help_feedback {
        dispatcher.add_handler(HelpHandler::new());
    }
    dispatcher.add_handler(RevealHandler::new(home));

    run_friendly(&mut dispatcher, tokens, out)
}
