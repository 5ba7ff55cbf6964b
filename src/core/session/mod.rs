//! Interactive subprocess sessions.
//!
//! - `protocol` - the prompt automaton and the `Connection` that drives it
//! - `process` - the production subprocess backend
//! - `scripted` - a transcript-driven test double

pub mod process;
pub mod protocol;
pub mod scripted;

use std::time::Duration;

use regex::Regex;

use crate::error::{Error, Result};

pub use process::{ProcessLauncher, ProcessSession};
pub use protocol::{Connection, Effect, Event, Login, Prompt, Protocol, Reply, State};
pub use scripted::{Script, ScriptedLauncher, ScriptedReply};

/// Result of waiting for one of several patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    Matched {
        index: usize,
        before: String,
        matched: String,
    },
    Eof {
        before: String,
    },
    Timeout {
        before: String,
    },
}

/// A running interactive process.
pub trait Session {
    /// Wait for the earliest match of any pattern in the process output.
    fn expect(&mut self, patterns: &[&Regex], timeout: Duration) -> Result<Expectation>;
    fn send_line(&mut self, line: &str) -> Result<()>;
    fn close(&mut self);
}

/// Starts sessions from a full command line.
pub trait Launcher {
    fn spawn(&self, command: &str) -> Result<Box<dyn Session>>;
}

/// Password, prompt patterns and wait limit for one connection.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub password: String,
    pub password_prompt: Regex,
    pub shell_prompt: Regex,
    pub sudo_prompt: Regex,
    pub timeout: Duration,
}

impl SessionContext {
    pub fn new(
        password: &str,
        password_prompt: &str,
        shell_prompt: &str,
        sudo_prompt: &str,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            password: password.to_string(),
            password_prompt: compile_prompt("password_prompt", password_prompt)?,
            shell_prompt: compile_prompt("shell_prompt", shell_prompt)?,
            sudo_prompt: compile_prompt("sudo_password_prompt", sudo_prompt)?,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn pattern(&self, prompt: Prompt) -> &Regex {
        match prompt {
            Prompt::Password => &self.password_prompt,
            Prompt::Shell => &self.shell_prompt,
            Prompt::Sudo => &self.sudo_prompt,
        }
    }
}

pub fn compile_prompt(name: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        Error::config_invalid_value(name, Some(pattern.to_string()), e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn invalid_prompt_pattern_is_a_config_error() {
        let err = SessionContext::new("pw", "(", "$", "sudo", 5).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
        assert_eq!(err.details["key"], "password_prompt");
    }

    #[test]
    fn pattern_lookup_follows_prompt_kind() {
        let ctx = SessionContext::new("pw", "assword:", r"\$ $", "sudo", 5).unwrap();
        assert!(ctx.pattern(Prompt::Password).is_match("Password:"));
        assert!(ctx.pattern(Prompt::Shell).is_match("user@h:~$ "));
        assert_eq!(ctx.timeout, Duration::from_secs(5));
    }
}
