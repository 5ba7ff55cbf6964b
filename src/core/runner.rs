//! Execution driver: loads variables once, then runs `main` in order.

use crate::action::{self, ExecContext, RunOptions};
use crate::command::LocalRunner;
use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::operator::Operator;
use crate::report::{Reporter, RunReport, StepReport};
use crate::session::Launcher;
use crate::step::{ActionKind, Step};
use crate::variables::{self, is_comment, VariableSet};

/// A `main` entry after upfront parsing.
#[derive(Debug)]
pub enum Planned {
    Disabled,
    Undefined,
    Invalid(Error),
    Ready(Step),
}

pub fn plan(config: &RunConfig, variables: &VariableSet) -> Vec<(String, Planned)> {
    config
        .main
        .iter()
        .map(|name| {
            let planned = if name.trim().is_empty() || is_comment(name) {
                Planned::Disabled
            } else {
                match config.step(name) {
                    None => Planned::Undefined,
                    Some(raw) => match Step::parse(name, raw, &variables.names) {
                        Ok(step) => Planned::Ready(step),
                        Err(err) => Planned::Invalid(err),
                    },
                }
            };
            (name.clone(), planned)
        })
        .collect()
}

pub fn run(
    config: &RunConfig,
    options: &RunOptions,
    launcher: &dyn Launcher,
    runner: &dyn LocalRunner,
    reporter: &mut dyn Reporter,
    operator: &mut dyn Operator,
) -> Result<RunReport> {
    if config.main.is_empty() {
        return Err(Error::config_missing_key("main", None)
            .with_hint("Nothing configured to execute. Add a \"main\" list of step names"));
    }

    let variables = variables::load(
        config,
        options.run_id.as_deref(),
        options.defaults.timeout_secs,
    )?;
    if !options.live {
        reporter.notice("Preview mode: commands are printed, not executed (use --live-run)");
    }

    let mut steps = Vec::new();
    for (index, (name, planned)) in plan(config, &variables).into_iter().enumerate() {
        let position = index + 1;
        let step_report = match planned {
            Planned::Disabled => {
                reporter.heading(&format!("{}. Skipping action... {}", position, name));
                StepReport::skipped(&name, None, "disabled with '-' or '#'")
            }
            Planned::Undefined => {
                reporter.heading(&format!("{}. Running action... {}", position, name));
                let reason = format!("Step \"{}\" is not defined in the config file", name);
                reporter.notice(&format!("{}. Skipping the action...", reason));
                StepReport::skipped(&name, None, reason)
            }
            Planned::Invalid(err) => {
                reporter.heading(&format!("{}. Running action... {}", position, name));
                reporter.notice(&format!("Skipping this action... Reason: {}", err.message));
                StepReport::skipped(&name, None, err.message)
            }
            Planned::Ready(step) => {
                reporter.heading(&format!(
                    "{}. Running action... {} ({})",
                    position,
                    name,
                    step.kind().as_str()
                ));
                let mut ctx = ExecContext {
                    options,
                    config,
                    variables: &variables,
                    launcher,
                    runner,
                    reporter: &mut *reporter,
                    operator: &mut *operator,
                };
                match action::execute(&step, &mut ctx) {
                    Ok(step_report) => step_report,
                    Err(err) if err.code.is_variable_stage() => return Err(err),
                    Err(err) => {
                        reporter.notice(&format!("Skipping this action... Reason: {}", err.message));
                        for hint in &err.hints {
                            reporter.notice(&hint.message);
                        }
                        skipped_with_kind(&name, step.kind(), err.message)
                    }
                }
            }
        };
        steps.push(step_report);
    }

    reporter.notice(&format!("Successfully completed with RUN ID : {}", variables.run_id));

    Ok(RunReport {
        run_id: variables.run_id,
        live: options.live,
        steps,
    })
}

fn skipped_with_kind(name: &str, kind: ActionKind, reason: String) -> StepReport {
    StepReport::skipped(name, Some(kind), reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::MockRunner;
    use crate::defaults::builtin_defaults;
    use crate::error::ErrorCode;
    use crate::operator::ScriptedOperator;
    use crate::report::{Outcome, RecordingReporter};
    use crate::session::{Script, ScriptedLauncher};
    use serde_json::json;

    fn drive(config: serde_json::Value, live: bool) -> (Result<RunReport>, RecordingReporter, MockRunner) {
        let config: RunConfig = serde_json::from_value(config).unwrap();
        let mut options = RunOptions::new(builtin_defaults()).live(live);
        options.run_id = Some("RID_TEST".into());
        let launcher = ScriptedLauncher::new(Script::new(""));
        let runner = MockRunner::new();
        let mut reporter = RecordingReporter::new();
        let mut operator = ScriptedOperator::default();
        let result = run(&config, &options, &launcher, &runner, &mut reporter, &mut operator);
        (result, reporter, runner)
    }

    #[test]
    fn disabled_and_undefined_steps_are_skipped_in_order() {
        let (result, _, runner) = drive(
            json!({
                "main": ["# off", "", "ghost", "ok", "-also-off"],
                "ok": { "action": "local", "commands": ["true"] }
            }),
            true,
        );
        let report = result.unwrap();
        assert_eq!(report.steps.len(), 5);
        assert!(report.steps[0].skipped.is_some());
        assert!(report.steps[2].skipped.as_deref().unwrap().contains("not defined"));
        assert_eq!(report.steps[3].records[0].outcome, Outcome::Succeeded);
        assert_eq!(runner.executed_commands(), vec!["true"]);
    }

    #[test]
    fn invalid_step_does_not_stop_the_run() {
        let (result, reporter, _) = drive(
            json!({
                "main": ["bad", "missing", "good"],
                "bad": { "action": "telnet" },
                "missing": { "action": "local", "commands": ["cat {nothing}"] },
                "good": { "action": "local", "commands": ["echo {run_id}"] }
            }),
            false,
        );
        let report = result.unwrap();
        assert_eq!(report.run_id, "RID_TEST");
        assert!(report.steps[0].skipped.as_deref().unwrap().contains("telnet"));
        assert!(report.steps[1].skipped.as_deref().unwrap().contains("nothing"));
        assert_eq!(reporter.commands(), vec!["echo RID_TEST"]);
    }

    #[test]
    fn variable_errors_abort_before_any_step() {
        let (result, reporter, _) = drive(
            json!({
                "variables": { "g.a": ["1", "2"], "g.b": ["1"] },
                "main": ["s"],
                "s": { "action": "local", "commands": ["true"] }
            }),
            true,
        );
        assert_eq!(result.unwrap_err().code, ErrorCode::ConfigGroupMisaligned);
        assert!(reporter.lines.is_empty());
    }

    #[test]
    fn empty_main_is_a_config_error() {
        let (result, _, _) = drive(json!({ "main": [] }), false);
        assert_eq!(result.unwrap_err().code, ErrorCode::ConfigMissingKey);
    }

    #[test]
    fn step_execution_error_skips_step_with_kind() {
        let (result, _, _) = drive(
            json!({
                "variables": {
                    "hostname": "h", "username": "u", "password": "p",
                    "password_prompt": "assword:", "progress_prompt": "%"
                },
                "main": ["copy"],
                "copy": {
                    "action": "scp", "direction": "sideways",
                    "source_dir": "/a", "source_files": "b", "target_dir": "/c"
                }
            }),
            false,
        );
        let report = result.unwrap();
        assert_eq!(report.steps[0].action, Some(ActionKind::Scp));
        assert!(report.steps[0].skipped.as_deref().unwrap().contains("sideways"));
    }
}
