//! Operator-driven shell over one connection, with optional batch replay.

use std::time::Duration;

use serde_json::{Map, Value};

use super::{ssh, ssh_target, ExecContext};
use crate::binding::{distinct_subset, Binding};
use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::paths::expand_user_path;
use crate::report::{CommandRecord, Outcome, StepReport};
use crate::session::{Connection, Login, Reply};
use crate::shell::has_control_bytes;
use crate::step::{Action, ActionKind, SshParams, Step};
use crate::variables::{raw_mapping, VariableSet};

pub const REPLAY_STEP: &str = "replay_ssh";

pub fn run(step: &Step, params: &SshParams, ctx: &mut ExecContext<'_>) -> Result<StepReport> {
    let mut report = StepReport::new(&step.name, ActionKind::SshInteractive);
    let action_bindings = distinct_subset(&step.params.action, &ctx.variables.bindings);
    let Some(first) = action_bindings.first() else {
        ctx.reporter.notice("No host to connect to");
        return Ok(report);
    };

    let target = ssh_target(params, first, ctx.options)?;
    ctx.reporter.command(&target.command);
    if !ctx.options.live {
        report.record(target.command, Outcome::Previewed);
        return Ok(report);
    }

    let session = match ctx.launcher.spawn(&target.command) {
        Ok(session) => session,
        Err(err) => {
            ctx.reporter.notice(&format!("Unable to ssh: {}", err.message));
            return Ok(report);
        }
    };
    let mut connection = Connection::new(session, target.context);
    if let Login::Failed { output, timed_out } = connection.login()? {
        ctx.reporter.output(&output);
        ctx.reporter.notice(if timed_out {
            "Unable to ssh: no shell prompt before timeout"
        } else {
            "Unable to ssh: connection closed"
        });
        connection.abandon();
        return Ok(report);
    }
    ctx.reporter.notice("Connection established...");

    let prompt = format!("{}@{} $ ", target.username, target.hostname);
    let wait = Duration::from_secs(ctx.options.defaults.interactive_timeout_secs);
    let recorded = read_eval(&mut connection, &prompt, wait, &mut report, ctx)?;
    if connection.is_open() {
        connection.close();
    }

    if recorded.is_empty() {
        return Ok(report);
    }

    let remaining = action_bindings.len() - 1;
    if remaining > 0
        && ctx.operator.confirm(&format!(
            "Replay {} recorded command(s) on the remaining {} host(s)?",
            recorded.len(),
            remaining
        ))?
    {
        match replay(step, &recorded, first, ctx) {
            Ok(replayed) => report.records.extend(replayed.records),
            Err(err) => {
                ctx.reporter
                    .notice(&format!("Unable to replay recorded commands: {}", err.message));
                for hint in &err.hints {
                    ctx.reporter.notice(&hint.message);
                }
            }
        }
    }

    if ctx.operator.confirm("Save the recorded commands as a config file?")? {
        if let Some(path) = ctx.operator.ask("Config file path: ")? {
            let path = expand_user_path(&path);
            match replay_config(step, &recorded, ctx.config).and_then(|c| c.save(&path)) {
                Ok(()) => ctx
                    .reporter
                    .notice(&format!("Saved replay config to {}", path.display())),
                Err(err) => ctx
                    .reporter
                    .notice(&format!("Unable to save replay config: {}", err.message)),
            }
        }
    }

    Ok(report)
}

/// Operator loop until `exit`, end of input or a lost connection.
/// Returns the commands that were sent.
fn read_eval(
    connection: &mut Connection,
    prompt: &str,
    wait: Duration,
    report: &mut StepReport,
    ctx: &mut ExecContext<'_>,
) -> Result<Vec<String>> {
    let mut recorded = Vec::new();

    while let Some(line) = ctx.operator.read_line(prompt)? {
        if has_control_bytes(&line) {
            ctx.reporter.notice("Discarded input containing control characters");
            continue;
        }

        let line = line.trim().to_string();
        if line == "exit" {
            break;
        }
        let reply = if line.is_empty() {
            if !connection.is_busy() {
                continue;
            }
            connection.wait(wait)
        } else {
            recorded.push(line.clone());
            connection.run(&line, wait)
        };

        let label = if line.is_empty() { "(wait)" } else { line.as_str() };
        let reply = reply.unwrap_or_else(|err| {
            ctx.reporter.notice(&format!("Session error: {}", err.message));
            Reply::Lost(String::new())
        });
        let (outcome, output) = match reply {
            Reply::Done(output) => (Outcome::Succeeded, output),
            Reply::Stalled(output) => (Outcome::Waiting, output),
            Reply::Lost(output) => (Outcome::Disconnected, output),
        };
        ctx.reporter.output(&output);
        let record = CommandRecord::new(label, outcome);
        ctx.reporter.outcome(&record);
        let lost = record.outcome == Outcome::Disconnected;
        report.records.push(record);
        if lost {
            break;
        }
    }

    Ok(recorded)
}

/// The step document a batch replay runs, as it would appear in a config.
pub fn replay_step(step: &Step, recorded: &[String]) -> Result<Value> {
    let fields = serde_json::to_value(&step.fields)
        .map_err(|e| Error::internal_json(e.to_string(), Some("serialize step".to_string())))?;
    let mut object = Map::new();
    object.insert("action".to_string(), Value::from(ActionKind::Ssh.as_str()));
    if let Value::Object(fields) = fields {
        object.extend(fields);
    }
    object.insert("commands".to_string(), Value::from(recorded.to_vec()));
    Ok(Value::Object(object))
}

pub fn replay_config(step: &Step, recorded: &[String], config: &RunConfig) -> Result<RunConfig> {
    let mut replay = RunConfig {
        variables: raw_mapping(config),
        main: vec![REPLAY_STEP.to_string()],
        ..Default::default()
    };
    replay
        .steps
        .insert(REPLAY_STEP.to_string(), replay_step(step, recorded)?);
    Ok(replay)
}

fn replay(
    step: &Step,
    recorded: &[String],
    first: &Binding,
    ctx: &mut ExecContext<'_>,
) -> Result<StepReport> {
    let replay = Step::parse(
        REPLAY_STEP,
        &replay_step(step, recorded)?,
        &ctx.variables.names,
    )?;
    let Action::Ssh(params) = &replay.action else {
        return Err(Error::internal_unexpected("replay step is not a batch ssh step"));
    };

    let remaining = VariableSet {
        run_id: ctx.variables.run_id.clone(),
        names: ctx.variables.names.clone(),
        bindings: ctx
            .variables
            .bindings
            .iter()
            .filter(|b| b.project(&step.params.action) != *first)
            .cloned()
            .collect(),
    };

    ctx.reporter.heading(&format!("{} (replay)", step.name));
    let mut replay_ctx = ExecContext {
        options: ctx.options,
        config: ctx.config,
        variables: &remaining,
        launcher: ctx.launcher,
        runner: ctx.runner,
        reporter: &mut *ctx.reporter,
        operator: &mut *ctx.operator,
    };
    ssh::run(&replay, params, &mut replay_ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{execute, RunOptions};
    use crate::command::MockRunner;
    use crate::defaults::builtin_defaults;
    use crate::operator::ScriptedOperator;
    use crate::report::RecordingReporter;
    use crate::session::{Script, ScriptedLauncher, ScriptedReply};
    use crate::variables;
    use serde_json::json;

    fn config(hosts: &[&str]) -> RunConfig {
        let users = vec!["u"; hosts.len()];
        let passwords = vec!["pw"; hosts.len()];
        serde_json::from_value(json!({
            "variables": {
                "credentials.hostname": hosts,
                "credentials.username": users,
                "credentials.password": passwords
            },
            "constants": {
                "password_prompt": "assword:",
                "shell_prompt": "\\$ $"
            },
            "main": ["interactive_ssh"],
            "interactive_ssh": { "action": "ssh-int" }
        }))
        .unwrap()
    }

    fn run(
        config: &RunConfig,
        live: bool,
        launcher: &ScriptedLauncher,
        operator: &mut ScriptedOperator,
    ) -> (StepReport, RecordingReporter) {
        let vars = variables::load(config, Some("R"), 60).unwrap();
        let step = Step::parse(
            "interactive_ssh",
            &config.steps["interactive_ssh"],
            &vars.names,
        )
        .unwrap();
        let options = RunOptions::new(builtin_defaults()).live(live);
        let runner = MockRunner::new();
        let mut reporter = RecordingReporter::new();
        let report = {
            let mut ctx = ExecContext {
                options: &options,
                config,
                variables: &vars,
                launcher,
                runner: &runner,
                reporter: &mut reporter,
                operator,
            };
            execute(&step, &mut ctx).unwrap()
        };
        (report, reporter)
    }

    fn shell_host() -> Script {
        Script::new("u@h:~$ ").otherwise("ok\nu@h:~$ ")
    }

    #[test]
    fn preview_does_not_connect() {
        let launcher = ScriptedLauncher::new(shell_host());
        let mut operator = ScriptedOperator::new(["ls"]);
        let (report, _) = run(&config(&["h1"]), false, &launcher, &mut operator);
        assert!(launcher.spawned().is_empty());
        assert_eq!(report.records[0].outcome, Outcome::Previewed);
        assert!(operator.prompts.is_empty());
    }

    #[test]
    fn only_first_host_is_connected() {
        let launcher = ScriptedLauncher::new(shell_host());
        let mut operator = ScriptedOperator::new(["uptime", "exit", "n", "n"]);
        let (report, _) = run(&config(&["h1", "h2"]), true, &launcher, &mut operator);
        assert_eq!(launcher.spawned().len(), 1);
        assert!(launcher.spawned()[0].ends_with("u@h1"));
        assert_eq!(report.commands(), vec!["uptime"]);
        assert_eq!(launcher.sent_lines(), vec!["uptime", "exit"]);
    }

    #[test]
    fn control_bytes_are_never_sent() {
        let launcher = ScriptedLauncher::new(shell_host());
        let mut operator = ScriptedOperator::new(["\u{1b}[A", "id"]);
        let (_, reporter) = run(&config(&["h1"]), true, &launcher, &mut operator);
        assert_eq!(launcher.sent_lines(), vec!["id", "exit"]);
        assert!(reporter
            .notices()
            .contains(&"Discarded input containing control characters"));
    }

    #[test]
    fn slow_command_keeps_waiting_on_empty_line() {
        let launcher = ScriptedLauncher::new(
            Script::new("u@h:~$ ")
                .reply(ScriptedReply::Output("building...".into()))
                .otherwise("u@h:~$ "),
        );
        let mut operator = ScriptedOperator::new(["make", ""]);
        let (report, _) = run(&config(&["h1"]), true, &launcher, &mut operator);
        let outcomes: Vec<&Outcome> = report.records.iter().map(|r| &r.outcome).collect();
        assert_eq!(outcomes, vec![&Outcome::Waiting, &Outcome::Waiting]);
        assert_eq!(report.commands(), vec!["make", "(wait)"]);
    }

    #[test]
    fn replay_runs_recorded_commands_on_remaining_hosts() {
        let launcher = ScriptedLauncher::new(shell_host());
        let mut operator = ScriptedOperator::new(["df -h", "exit", "y", "n"]);
        let (report, _) = run(&config(&["h1", "h2", "h3"]), true, &launcher, &mut operator);

        let spawned = launcher.spawned();
        assert_eq!(spawned.len(), 3);
        assert!(spawned[1].ends_with("u@h2"));
        assert!(spawned[2].ends_with("u@h3"));
        assert_eq!(report.commands(), vec!["df -h", "df -h", "df -h"]);
    }

    #[test]
    fn unreplayable_commands_still_reach_the_save_offer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.json");
        let launcher = ScriptedLauncher::new(shell_host());
        let mut operator = ScriptedOperator::new([
            "ls ${HOME}",
            "exit",
            "y",
            "y",
            path.display().to_string().as_str(),
        ]);
        let (report, reporter) = run(&config(&["h1", "h2"]), true, &launcher, &mut operator);

        assert_eq!(report.commands(), vec!["ls ${HOME}"]);
        assert_eq!(launcher.spawned().len(), 1);
        assert!(reporter
            .notices()
            .iter()
            .any(|n| n.starts_with("Unable to replay recorded commands:")));
        assert_eq!(operator.prompts.last().map(String::as_str), Some("Config file path: "));
        let saved = RunConfig::load(&path).unwrap();
        assert_eq!(saved.step(REPLAY_STEP).unwrap()["commands"], json!(["ls ${HOME}"]));
    }

    #[test]
    fn failed_write_is_reported_before_disconnect() {
        let launcher = ScriptedLauncher::new(
            Script::new("u@h:~$ ").reply(ScriptedReply::BrokenPipe),
        );
        let mut operator = ScriptedOperator::new(["uptime", "id"]);
        let (report, reporter) = run(&config(&["h1"]), true, &launcher, &mut operator);

        assert_eq!(report.records[0].outcome, Outcome::Disconnected);
        assert_eq!(report.records.len(), 1);
        assert!(reporter
            .notices()
            .contains(&"Session error: Interactive process input is closed"));
    }

    #[test]
    fn recorded_commands_are_saved_as_batch_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.json");
        let launcher = ScriptedLauncher::new(shell_host());
        let mut operator =
            ScriptedOperator::new(["hostname", "exit", "y", path.display().to_string().as_str()]);
        run(&config(&["h1"]), true, &launcher, &mut operator);

        let saved = RunConfig::load(&path).unwrap();
        assert_eq!(saved.main, vec![REPLAY_STEP]);
        let step = saved.step(REPLAY_STEP).unwrap();
        assert_eq!(step["action"], "ssh");
        assert_eq!(step["commands"], json!(["hostname"]));
        assert_eq!(step["hostname"], "{hostname}");
        assert_eq!(saved.variables["credentials.hostname"], json!(["h1"]));
        assert_eq!(saved.variables["shell_prompt"], "\\$ $");
    }
}
