//! Local command execution.
//!
//! `LocalRunner` is the seam the `local` action runs commands through.
//! `ShellRunner` spawns `<shell> -c <command>`; `MockRunner` records calls and
//! returns preset outputs.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::process::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
            exit_code: 0,
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
            exit_code,
        }
    }

    /// Stdout followed by stderr.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}{}", self.stdout, self.stderr),
        }
    }
}

pub trait LocalRunner {
    fn run(&self, shell: &str, command: &str) -> CommandOutput;
}

pub struct ShellRunner;

impl LocalRunner for ShellRunner {
    fn run(&self, shell: &str, command: &str) -> CommandOutput {
        #[cfg(windows)]
        let mut cmd = {
            let _ = shell;
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", command]);
            cmd
        };

        #[cfg(not(windows))]
        let mut cmd = {
            let mut cmd = Command::new(shell);
            cmd.args(["-c", command]);
            cmd
        };

        match cmd.output() {
            Ok(out) => CommandOutput {
                stdout: String::from_utf8_lossy(&out.stdout).to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).to_string(),
                success: out.status.success(),
                exit_code: out.status.code().unwrap_or(-1),
            },
            Err(e) => CommandOutput::failed(-1, format!("Command error: {}", e)),
        }
    }
}

/// Records `(shell, command)` pairs; answers from a queue, then with empty success.
#[derive(Default)]
pub struct MockRunner {
    responses: RefCell<VecDeque<CommandOutput>>,
    calls: RefCell<Vec<(String, String)>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(responses: Vec<CommandOutput>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn executed_commands(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn shells(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(s, _)| s.clone()).collect()
    }
}

impl LocalRunner for MockRunner {
    fn run(&self, shell: &str, command: &str) -> CommandOutput {
        self.calls
            .borrow_mut()
            .push((shell.to_string(), command.to_string()));
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| CommandOutput::ok(""))
    }
}
