//! Shared flow of the run subcommands: source variables, then a config file
//! or an interactive session, then the execution driver.

use serde::Serialize;
use serde_json::Value;

use hostrun::action::RunOptions;
use hostrun::command::ShellRunner;
use hostrun::config::RunConfig;
use hostrun::defaults::{load_defaults, Defaults};
use hostrun::operator::Operator;
use hostrun::paths::expand_user_path;
use hostrun::report::{RunReport, Stream, TerminalReporter};
use hostrun::runner;
use hostrun::session::ProcessLauncher;
use hostrun::sources::{SshCredentials, Variables};

use super::{CmdResult, CommonArgs, RunArgs, TargetArgs};

pub const INTERACTIVE_STEP: &str = "interactive_ssh";

/// Typed-in password marker for `--ssh-pass`.
const PROMPT_MARKER: &str = ":p";

#[derive(Debug, Serialize)]
#[serde(tag = "output", rename_all = "snake_case")]
pub enum RunOutput {
    /// No config and no session: the sourced variables as a config fragment.
    Vars { variables: Variables },
    Run(RunReport),
}

/// `--ssh-user` without a password (or with `:p`) prompts for one.
pub fn ssh_credentials(common: &CommonArgs, operator: &mut dyn Operator) -> hostrun::Result<SshCredentials> {
    let password = match (&common.ssh_user, common.ssh_pass.as_deref()) {
        (Some(user), None) | (Some(user), Some(PROMPT_MARKER)) => {
            operator.secret(&format!("SSH password for the user({}): ", user))?
        }
        (_, pass) => pass.map(str::to_string),
    };
    Ok(SshCredentials::new(common.ssh_user.clone(), password))
}

/// One `ssh-interactive` step; prompt patterns come from the defaults.
pub fn interactive_config(defaults: &Defaults) -> RunConfig {
    let mut config = RunConfig {
        main: vec![INTERACTIVE_STEP.to_string()],
        ..Default::default()
    };
    for (name, pattern) in &defaults.prompts {
        config
            .constants
            .insert(name.clone(), Value::from(pattern.clone()));
    }
    config
        .steps
        .insert(INTERACTIVE_STEP.to_string(), serde_json::json!({ "action": "ssh-int" }));
    config
}

pub fn options(defaults: Defaults, run: &RunArgs) -> RunOptions {
    let mut options = RunOptions::new(defaults).live(run.live_run);
    options.run_id = run.run_id.clone();
    options.shell = run.shell.clone();
    options
}

pub fn execute(
    variables: Option<Variables>,
    target: &TargetArgs,
    run: &RunArgs,
    operator: &mut dyn Operator,
) -> CmdResult<RunOutput> {
    let defaults = load_defaults();
    let mut config = match (&target.conf_file, target.interactive) {
        (Some(path), _) => RunConfig::load(&expand_user_path(path))?,
        (None, true) => interactive_config(&defaults),
        (None, false) => {
            return Ok((
                RunOutput::Vars {
                    variables: variables.unwrap_or_default(),
                },
                0,
            ))
        }
    };
    if let Some(variables) = variables {
        config.merge_variables(variables);
    }

    let options = options(defaults, run);
    let launcher = ProcessLauncher::new(options.defaults.pty_wrapper.clone());
    let runner = ShellRunner;
    let mut reporter = TerminalReporter::new(if target.interactive {
        Stream::Stdout
    } else {
        Stream::Stderr
    });

    let report = runner::run(&config, &options, &launcher, &runner, &mut reporter, operator)?;
    let exit_code = if report.failures() > 0 { 1 } else { 0 };
    Ok((RunOutput::Run(report), exit_code))
}
