use super::ExecContext;
use crate::binding::distinct_subset;
use crate::error::Result;
use crate::report::{CommandRecord, Outcome, StepReport};
use crate::step::{ActionKind, LocalParams, Step};

pub fn run(step: &Step, params: &LocalParams, ctx: &mut ExecContext<'_>) -> Result<StepReport> {
    let mut report = StepReport::new(&step.name, ActionKind::Local);

    for binding in distinct_subset(&step.params.combined, &ctx.variables.bindings) {
        let shell = match &params.shell {
            Some(template_str) => binding.format(template_str)?,
            None => ctx.options.shell().to_string(),
        };

        for template_str in &step.commands {
            let command = binding.format(template_str)?;
            ctx.reporter.command(&command);

            let outcome = if ctx.options.live {
                let output = ctx.runner.run(&shell, &command);
                ctx.reporter.output(&output.combined());
                if output.success {
                    Outcome::Succeeded
                } else {
                    Outcome::Failed {
                        exit_code: output.exit_code,
                    }
                }
            } else {
                Outcome::Previewed
            };

            let record = CommandRecord::new(command, outcome);
            ctx.reporter.outcome(&record);
            report.records.push(record);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use crate::action::{execute, ExecContext, RunOptions};
    use crate::command::{CommandOutput, MockRunner};
    use crate::config::RunConfig;
    use crate::defaults::builtin_defaults;
    use crate::operator::ScriptedOperator;
    use crate::report::{Outcome, RecordingReporter};
    use crate::session::{Script, ScriptedLauncher};
    use crate::step::Step;
    use crate::variables;
    use serde_json::json;

    fn run_local(step: serde_json::Value, live: bool, runner: &MockRunner) -> Vec<Outcome> {
        let config: RunConfig = serde_json::from_value(json!({
            "variables": { "x": ["1", "2"], "shell_name": "bash" },
            "main": ["s"],
            "s": step
        }))
        .unwrap();
        let vars = variables::load(&config, Some("R"), 60).unwrap();
        let parsed = Step::parse("s", &config.steps["s"], &vars.names).unwrap();
        let options = RunOptions::new(builtin_defaults()).live(live);
        let launcher = ScriptedLauncher::new(Script::new(""));
        let mut reporter = RecordingReporter::new();
        let mut operator = ScriptedOperator::default();
        let mut ctx = ExecContext {
            options: &options,
            config: &config,
            variables: &vars,
            launcher: &launcher,
            runner,
            reporter: &mut reporter,
            operator: &mut operator,
        };
        let report = execute(&parsed, &mut ctx).unwrap();
        assert!(launcher.spawned().is_empty());
        report.records.into_iter().map(|r| r.outcome).collect()
    }

    #[test]
    fn preview_never_runs_commands() {
        let runner = MockRunner::new();
        let outcomes = run_local(json!({ "action": "local", "commands": ["echo {x}"] }), false, &runner);
        assert_eq!(outcomes, vec![Outcome::Previewed, Outcome::Previewed]);
        assert!(runner.executed_commands().is_empty());
    }

    #[test]
    fn live_run_continues_after_failure() {
        let runner = MockRunner::with_responses(vec![
            CommandOutput::failed(2, "nope"),
            CommandOutput::ok("fine"),
        ]);
        let outcomes = run_local(json!({ "action": "local", "commands": ["test {x}"] }), true, &runner);
        assert_eq!(outcomes, vec![Outcome::Failed { exit_code: 2 }, Outcome::Succeeded]);
        assert_eq!(runner.executed_commands(), vec!["test 1", "test 2"]);
    }

    #[test]
    fn step_shell_field_selects_shell() {
        let runner = MockRunner::new();
        run_local(
            json!({ "action": "local", "shell": "{shell_name}", "commands": ["uptime"] }),
            true,
            &runner,
        );
        assert_eq!(runner.shells(), vec!["bash"]);
    }
}
