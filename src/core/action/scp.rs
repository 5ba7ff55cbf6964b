use std::time::Duration;

use super::{timeout_for, ExecContext, RunOptions};
use crate::binding::distinct_subset;
use crate::error::{Error, Result};
use crate::report::{CommandRecord, Outcome, StepReport};
use crate::session::{compile_prompt, Expectation, Session};
use crate::shell::{join_path, wrap_for_bash};
use crate::step::{ActionKind, ScpParams, Step};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Get,
    Send,
}

impl Direction {
    pub fn parse(step: &str, value: &str) -> Result<Self> {
        match value {
            "get" => Ok(Direction::Get),
            "send" => Ok(Direction::Send),
            other => Err(Error::step_unsupported_direction(step, other)),
        }
    }
}

pub fn scp_command(
    options: &RunOptions,
    direction: Direction,
    username: &str,
    hostname: &str,
    source: &str,
    target_dir: &str,
) -> String {
    let opts = &options.defaults.ssh_options;
    match direction {
        Direction::Get => format!(
            "scp -r {} {}@{}:{} {}",
            opts, username, hostname, source, target_dir
        ),
        Direction::Send => {
            let command = format!(
                "scp -r {} {} {}@{}:{}",
                opts, source, username, hostname, target_dir
            );
            if source.contains('*') {
                wrap_for_bash(&command)
            } else {
                command
            }
        }
    }
}

pub fn run(step: &Step, params: &ScpParams, ctx: &mut ExecContext<'_>) -> Result<StepReport> {
    let mut report = StepReport::new(&step.name, ActionKind::Scp);

    for binding in distinct_subset(&step.params.combined, &ctx.variables.bindings) {
        let direction = match &params.direction {
            Some(template_str) => Direction::parse(&step.name, &binding.format(template_str)?)?,
            None => Direction::Get,
        };
        let hostname = binding.format(&params.hostname)?;
        let username = binding.format(&params.username)?;
        let password = binding.format(&params.password)?;
        let password_prompt = binding.format(&params.password_prompt)?;
        let progress_prompt = binding.format(&params.progress_prompt)?;
        let source_dir = binding.format(&params.source_dir)?;
        let target_dir = binding.format(&params.target_dir)?;
        let timeout = timeout_for(
            params.timeout_secs.as_deref(),
            &binding,
            ctx.options.defaults.timeout_secs,
        )?;

        for file_template in &params.source_files {
            let source = join_path(&source_dir, &binding.format(file_template)?);
            let command = scp_command(
                ctx.options,
                direction,
                &username,
                &hostname,
                &source,
                &target_dir,
            );
            ctx.reporter.command(&command);

            let outcome = if ctx.options.live {
                let transfer = Transfer {
                    password: &password,
                    password_prompt: &password_prompt,
                    progress_prompt: &progress_prompt,
                    timeout: Duration::from_secs(timeout),
                };
                transfer.drive(&command, ctx)
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

struct Transfer<'a> {
    password: &'a str,
    password_prompt: &'a str,
    progress_prompt: &'a str,
    timeout: Duration,
}

impl Transfer<'_> {
    /// Failures are reported and turned into an outcome; nothing is retried.
    fn drive(&self, command: &str, ctx: &mut ExecContext<'_>) -> Outcome {
        let mut session = match ctx.launcher.spawn(command) {
            Ok(session) => session,
            Err(err) => {
                ctx.reporter.notice(&format!("Unable to scp: {}", err.message));
                return Outcome::Failed { exit_code: -1 };
            }
        };
        let outcome = match self.exchange(session.as_mut(), ctx) {
            Ok(outcome) => outcome,
            Err(err) => {
                ctx.reporter.notice(&format!("Unable to scp: {}", err.message));
                Outcome::Failed { exit_code: -1 }
            }
        };
        session.close();
        outcome
    }

    fn exchange(&self, session: &mut dyn Session, ctx: &mut ExecContext<'_>) -> Result<Outcome> {
        let password_prompt = compile_prompt("password_prompt", self.password_prompt)?;
        let progress_prompt = compile_prompt("progress_prompt", self.progress_prompt)?;

        match session.expect(&[&password_prompt], self.timeout)? {
            Expectation::Matched { .. } => session.send_line(self.password)?,
            Expectation::Timeout { before } => {
                ctx.reporter.output(&before);
                ctx.reporter.notice("Timed out waiting for the password prompt");
                return Ok(Outcome::TimedOut);
            }
            Expectation::Eof { before } => {
                ctx.reporter.output(&before);
                ctx.reporter.notice("Connection closed before the password prompt");
                return Ok(Outcome::Disconnected);
            }
        }

        loop {
            match session.expect(&[&progress_prompt], self.timeout)? {
                Expectation::Matched {
                    before, matched, ..
                } => ctx.reporter.output(&format!("{}{}", before, matched)),
                Expectation::Eof { before } => {
                    ctx.reporter.output(&before);
                    return Ok(Outcome::Succeeded);
                }
                Expectation::Timeout { before } => {
                    ctx.reporter.output(&before);
                    ctx.reporter.notice("Timed out. Potentially very big file");
                    return Ok(Outcome::TimedOut);
                }
            }
        }
    }
}
