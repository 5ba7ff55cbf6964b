//! Run transcript sink and the per-step records it accumulates.

use std::io::{self, Write};

use serde::Serialize;

use crate::step::ActionKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Printed only; preview mode.
    Previewed,
    Succeeded,
    Failed { exit_code: i32 },
    TimedOut,
    Disconnected,
    Skipped,
    /// Interactive command still running when the prompt wait expired.
    Waiting,
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Outcome::Failed { .. } | Outcome::TimedOut | Outcome::Disconnected
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandRecord {
    pub command: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl CommandRecord {
    pub fn new(command: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            command: command.into(),
            outcome,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionKind>,
    pub records: Vec<CommandRecord>,
    /// Why the step did not run, when it was skipped as a whole.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

impl StepReport {
    pub fn new(step: &str, action: ActionKind) -> Self {
        Self {
            step: step.to_string(),
            action: Some(action),
            records: Vec::new(),
            skipped: None,
        }
    }

    pub fn skipped(step: &str, action: Option<ActionKind>, reason: impl Into<String>) -> Self {
        Self {
            step: step.to_string(),
            action,
            records: Vec::new(),
            skipped: Some(reason.into()),
        }
    }

    pub fn record(&mut self, command: impl Into<String>, outcome: Outcome) {
        self.records.push(CommandRecord::new(command, outcome));
    }

    pub fn commands(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.command.as_str()).collect()
    }

    pub fn failures(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_failure()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub live: bool,
    pub steps: Vec<StepReport>,
}

impl RunReport {
    pub fn failures(&self) -> usize {
        self.steps.iter().map(StepReport::failures).sum()
    }

    pub fn step(&self, name: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.step == name)
    }
}

/// Receives the human-readable run transcript.
pub trait Reporter {
    fn heading(&mut self, text: &str);
    /// A fully resolved command about to run, or shown in preview.
    fn command(&mut self, command: &str);
    fn output(&mut self, text: &str);
    fn notice(&mut self, text: &str);
    fn outcome(&mut self, record: &CommandRecord);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Stream {
    #[default]
    Stdout,
    /// Keeps stdout free for a JSON envelope.
    Stderr,
}

/// Writes the transcript to a terminal stream.
#[derive(Debug, Default)]
pub struct TerminalReporter {
    stream: Stream,
}

impl TerminalReporter {
    pub fn new(stream: Stream) -> Self {
        Self { stream }
    }

    fn write(&self, text: &str) {
        let _ = match self.stream {
            Stream::Stdout => writeln!(io::stdout().lock(), "{}", text),
            Stream::Stderr => writeln!(io::stderr().lock(), "{}", text),
        };
    }
}

impl Reporter for TerminalReporter {
    fn heading(&mut self, text: &str) {
        self.write(&format!("\n=== {} ===", text));
    }

    fn command(&mut self, command: &str) {
        self.write(&format!("$ {}", command));
    }

    fn output(&mut self, text: &str) {
        let trimmed = text.trim_end();
        if !trimmed.is_empty() {
            self.write(trimmed);
        }
    }

    fn notice(&mut self, text: &str) {
        self.write(&format!("** {}", text));
    }

    fn outcome(&mut self, record: &CommandRecord) {
        match &record.outcome {
            Outcome::Previewed | Outcome::Succeeded => {}
            Outcome::Failed { exit_code } => {
                self.write(&format!("** FAILED (exit {}): {}", exit_code, record.command))
            }
            Outcome::TimedOut => self.write(&format!("** TIMEOUT: {}", record.command)),
            Outcome::Disconnected => {
                self.write(&format!("** DISCONNECTED: {}", record.command))
            }
            Outcome::Skipped => self.write(&format!("** SKIPPED: {}", record.command)),
            Outcome::Waiting => self.write("** wait"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Heading(String),
    Command(String),
    Output(String),
    Notice(String),
    Outcome(CommandRecord),
}

/// Keeps every transcript line in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub lines: Vec<Line>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                Line::Command(c) => Some(c.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                Line::Notice(n) => Some(n.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn heading(&mut self, text: &str) {
        self.lines.push(Line::Heading(text.to_string()));
    }

    fn command(&mut self, command: &str) {
        self.lines.push(Line::Command(command.to_string()));
    }

    fn output(&mut self, text: &str) {
        self.lines.push(Line::Output(text.to_string()));
    }

    fn notice(&mut self, text: &str) {
        self.lines.push(Line::Notice(text.to_string()));
    }

    fn outcome(&mut self, record: &CommandRecord) {
        self.lines.push(Line::Outcome(record.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_serializes_with_status_tag() {
        let record = CommandRecord::new("false", Outcome::Failed { exit_code: 1 });
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["command"], "false");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["exit_code"], 1);
    }

    #[test]
    fn failures_count_only_failed_outcomes() {
        let mut step = StepReport::new("s", ActionKind::Local);
        step.record("a", Outcome::Succeeded);
        step.record("b", Outcome::TimedOut);
        step.record("c", Outcome::Previewed);
        step.record("d", Outcome::Failed { exit_code: 2 });
        let report = RunReport {
            run_id: "R".into(),
            live: true,
            steps: vec![step, StepReport::skipped("t", None, "missing")],
        };
        assert_eq!(report.failures(), 2);
        assert_eq!(report.step("t").unwrap().skipped.as_deref(), Some("missing"));
    }

    #[test]
    fn recording_reporter_keeps_commands_in_order() {
        let mut reporter = RecordingReporter::new();
        reporter.heading("step");
        reporter.command("echo 1");
        reporter.notice("skipping");
        reporter.command("echo 2");
        assert_eq!(reporter.commands(), vec!["echo 1", "echo 2"]);
        assert_eq!(reporter.notices(), vec!["skipping"]);
    }
}
