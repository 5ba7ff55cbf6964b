//! Terminal I/O utilities for CLI.
//!
//! Provides TTY detection and the stdin-backed operator.

use std::io::{self, BufRead, IsTerminal, Write};

use dialoguer::Password;

use hostrun::operator::Operator;

pub fn is_stdin_tty() -> bool {
    io::stdin().is_terminal()
}

pub fn is_stdout_tty() -> bool {
    io::stdout().is_terminal()
}

pub fn require_tty_for_interactive() -> bool {
    is_stdin_tty() && is_stdout_tty()
}

/// Prompt on stderr and read one line. `None` at end of input.
pub fn prompt(message: &str) -> hostrun::Result<Option<String>> {
    eprint!("{}", message);
    io::stderr().flush().ok();

    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line).map_err(|e| {
        hostrun::Error::internal_io(e.to_string(), Some("read operator input".to_string()))
    })?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Read a secret without echo. Falls back to a plain line when stdin is piped.
pub fn prompt_password(message: &str) -> hostrun::Result<Option<String>> {
    if !is_stdin_tty() {
        return prompt(message);
    }
    Password::new()
        .with_prompt(password_label(message))
        .allow_empty_password(true)
        .interact()
        .map(Some)
        .map_err(|e| hostrun::Error::internal_io(e.to_string(), Some("read password".to_string())))
}

/// dialoguer appends its own `: ` to the prompt.
fn password_label(message: &str) -> &str {
    message.trim_end().trim_end_matches(':')
}

/// Print status message to stderr if running in a terminal.
pub fn status(message: &str) {
    if io::stderr().is_terminal() {
        eprintln!("{}", message);
    }
}

/// Operator reading from the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalOperator;

impl Operator for TerminalOperator {
    fn read_line(&mut self, prompt_text: &str) -> hostrun::Result<Option<String>> {
        prompt(prompt_text)
    }

    fn secret(&mut self, prompt_text: &str) -> hostrun::Result<Option<String>> {
        prompt_password(prompt_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_label_drops_trailing_colon() {
        assert_eq!(
            password_label("SSH password for the user(ops): "),
            "SSH password for the user(ops)"
        );
        assert_eq!(password_label("Ambari password"), "Ambari password");
    }
}
