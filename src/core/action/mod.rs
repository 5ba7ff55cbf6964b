//! Action executor: one handler per action kind.

pub mod interactive;
pub mod local;
pub mod scp;
pub mod ssh;

use crate::binding::Binding;
use crate::command::LocalRunner;
use crate::config::RunConfig;
use crate::defaults::Defaults;
use crate::error::Result;
use crate::operator::Operator;
use crate::report::{Reporter, StepReport};
use crate::session::{Launcher, SessionContext};
use crate::step::{Action, SshParams, Step};
use crate::variables::{parse_timeout, VariableSet, TIMEOUT_SECS};

/// Run-wide switches threaded through the driver and every handler.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Preview unless set: commands are printed, nothing is spawned.
    pub live: bool,
    pub run_id: Option<String>,
    pub shell: Option<String>,
    pub defaults: Defaults,
}

impl RunOptions {
    pub fn new(defaults: Defaults) -> Self {
        Self {
            live: false,
            run_id: None,
            shell: None,
            defaults,
        }
    }

    pub fn live(mut self, live: bool) -> Self {
        self.live = live;
        self
    }

    pub fn shell(&self) -> &str {
        self.shell.as_deref().unwrap_or(&self.defaults.shell)
    }
}

/// Collaborators a handler needs for one step.
pub struct ExecContext<'a> {
    pub options: &'a RunOptions,
    pub config: &'a RunConfig,
    pub variables: &'a VariableSet,
    pub launcher: &'a dyn Launcher,
    pub runner: &'a dyn LocalRunner,
    pub reporter: &'a mut dyn Reporter,
    pub operator: &'a mut dyn Operator,
}

pub fn execute(step: &Step, ctx: &mut ExecContext<'_>) -> Result<StepReport> {
    match &step.action {
        Action::Local(params) => local::run(step, params, ctx),
        Action::Scp(params) => scp::run(step, params, ctx),
        Action::Ssh(params) => ssh::run(step, params, ctx),
        Action::SshInteractive(params) => interactive::run(step, params, ctx),
    }
}

/// A step-level `timeout_secs` wins over the binding's value.
pub(crate) fn timeout_for(step_timeout: Option<&str>, binding: &Binding, default_secs: u64) -> Result<u64> {
    let value = match step_timeout {
        Some(template_str) => Some(binding.format(template_str)?),
        None => binding.get(TIMEOUT_SECS).map(str::to_string),
    };
    Ok(value
        .map(|v| parse_timeout(&v, default_secs))
        .unwrap_or(default_secs))
}

pub(crate) fn ssh_command(options: &RunOptions, username: &str, hostname: &str) -> String {
    format!(
        "ssh {} {}@{}",
        options.defaults.ssh_options, username, hostname
    )
}

/// Resolved connection parameters for one action-level binding.
pub(crate) struct Target {
    pub hostname: String,
    pub username: String,
    pub command: String,
    pub context: SessionContext,
}

pub(crate) fn ssh_target(
    params: &SshParams,
    binding: &Binding,
    options: &RunOptions,
) -> Result<Target> {
    let hostname = binding.format(&params.hostname)?;
    let username = binding.format(&params.username)?;
    let timeout = timeout_for(
        params.timeout_secs.as_deref(),
        binding,
        options.defaults.timeout_secs,
    )?;
    let context = SessionContext::new(
        &binding.format(&params.password)?,
        &binding.format(&params.password_prompt)?,
        &binding.format(&params.shell_prompt)?,
        &binding.format(&params.sudo_password_prompt)?,
        timeout,
    )?;
    Ok(Target {
        command: ssh_command(options, &username, &hostname),
        hostname,
        username,
        context,
    })
}
