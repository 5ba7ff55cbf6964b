use super::{ssh_target, ExecContext};
use crate::binding::{distinct_subset, filter_by, Binding};
use crate::error::Result;
use crate::report::{CommandRecord, Outcome, StepReport};
use crate::session::{Connection, Login, Reply};
use crate::step::{ActionKind, SshParams, Step};

/// Commands for one action-level binding, in binding then template order.
pub(crate) fn commands_for(step: &Step, action: &Binding, combined: &[Binding]) -> Result<Vec<String>> {
    let mut commands = Vec::new();
    for binding in filter_by(action, combined) {
        let merged = action.merged_with(&binding);
        for template_str in &step.commands {
            commands.push(merged.format(template_str)?);
        }
    }
    Ok(commands)
}

pub fn run(step: &Step, params: &SshParams, ctx: &mut ExecContext<'_>) -> Result<StepReport> {
    let mut report = StepReport::new(&step.name, ActionKind::Ssh);
    let bindings = &ctx.variables.bindings;
    let action_bindings = distinct_subset(&step.params.action, bindings);
    let combined = distinct_subset(&step.params.combined, bindings);

    for action in &action_bindings {
        let target = ssh_target(params, action, ctx.options)?;
        let commands = commands_for(step, action, &combined)?;
        ctx.reporter.command(&target.command);

        if !ctx.options.live {
            for command in commands {
                ctx.reporter.command(&command);
                report.record(command, Outcome::Previewed);
            }
            continue;
        }

        let timeout = target.context.timeout;
        let session = match ctx.launcher.spawn(&target.command) {
            Ok(session) => session,
            Err(err) => {
                ctx.reporter.notice(&format!("Unable to ssh: {}", err.message));
                skip_all(&mut report, ctx, commands);
                continue;
            }
        };

        let mut connection = Connection::new(session, target.context);
        if let Login::Failed { output, timed_out } = connection.login()? {
            ctx.reporter.output(&output);
            ctx.reporter.notice(if timed_out {
                "Unable to ssh: no prompt before timeout"
            } else {
                "Unable to ssh: connection closed"
            });
            connection.abandon();
            skip_all(&mut report, ctx, commands);
            continue;
        }
        ctx.reporter.notice("Connection established...");

        let mut pending = commands.into_iter();
        let mut dead = false;
        for command in pending.by_ref() {
            ctx.reporter.command(&command);
            let reply = connection.run(&command, timeout).unwrap_or_else(|err| {
                ctx.reporter.notice(&format!("Session error: {}", err.message));
                Reply::Lost(String::new())
            });
            let outcome = match reply {
                Reply::Done(output) => {
                    ctx.reporter.output(&output);
                    Outcome::Succeeded
                }
                Reply::Stalled(output) => {
                    ctx.reporter.output(&output);
                    dead = true;
                    Outcome::TimedOut
                }
                Reply::Lost(output) => {
                    ctx.reporter.output(&output);
                    dead = true;
                    Outcome::Disconnected
                }
            };
            let record = CommandRecord::new(command, outcome);
            ctx.reporter.outcome(&record);
            report.records.push(record);
            if dead {
                break;
            }
        }

        if dead {
            connection.abandon();
            skip_all(&mut report, ctx, pending.collect());
        } else {
            connection.close();
        }
    }

    Ok(report)
}

fn skip_all(report: &mut StepReport, ctx: &mut ExecContext<'_>, commands: Vec<String>) {
    for command in commands {
        let record = CommandRecord::new(command, Outcome::Skipped);
        ctx.reporter.outcome(&record);
        report.records.push(record);
    }
}
