//! Prompt automaton for password-authenticated shell sessions.

use std::time::Duration;

use super::{Expectation, Session, SessionContext};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Login,
    Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Connecting,
    AwaitingShellPrompt(Purpose),
    Ready,
    RunningCommand,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Password,
    Shell,
    Sudo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Prompt(Prompt),
    Timeout,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    SendPassword,
    Established,
    CommandDone,
    Stalled,
    Lost,
    /// No prompt arrived before the login timeout.
    ConnectTimedOut,
    /// The peer closed before a shell prompt.
    ConnectClosed,
    /// The event has no transition from the current state.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protocol {
    state: State,
}

impl Default for Protocol {
    fn default() -> Self {
        Self::new()
    }
}

impl Protocol {
    pub fn new() -> Self {
        Self {
            state: State::Connecting,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn expected(&self) -> &'static [Prompt] {
        match self.state {
            State::Connecting => &[Prompt::Password, Prompt::Shell],
            State::AwaitingShellPrompt(Purpose::Login) => &[Prompt::Shell],
            State::AwaitingShellPrompt(Purpose::Command) | State::RunningCommand => {
                &[Prompt::Shell, Prompt::Sudo]
            }
            State::Ready | State::Disconnected => &[],
        }
    }

    /// True while a sent command has not returned to the shell prompt.
    pub fn is_busy(&self) -> bool {
        matches!(
            self.state,
            State::RunningCommand | State::AwaitingShellPrompt(Purpose::Command)
        )
    }

    pub fn on_event(&mut self, event: Event) -> Effect {
        const LOGIN: State = State::AwaitingShellPrompt(Purpose::Login);
        const SUDO: State = State::AwaitingShellPrompt(Purpose::Command);

        let (next, effect) = match (self.state, event) {
            (State::Connecting, Event::Prompt(Prompt::Password)) => (LOGIN, Effect::SendPassword),
            (State::Connecting, Event::Prompt(Prompt::Shell)) => (State::Ready, Effect::Established),
            (State::Connecting, Event::Timeout) => (State::Disconnected, Effect::ConnectTimedOut),
            (State::Connecting, Event::Eof) => (State::Disconnected, Effect::ConnectClosed),

            (LOGIN, Event::Prompt(Prompt::Shell)) => (State::Ready, Effect::Established),
            (LOGIN, Event::Timeout) => (State::Disconnected, Effect::ConnectTimedOut),
            (LOGIN, Event::Eof) => (State::Disconnected, Effect::ConnectClosed),

            (SUDO, Event::Prompt(Prompt::Shell)) => (State::Ready, Effect::CommandDone),
            (SUDO, Event::Prompt(Prompt::Sudo)) => (SUDO, Effect::SendPassword),
            (SUDO, Event::Timeout) => (SUDO, Effect::Stalled),
            (State::AwaitingShellPrompt(_), Event::Eof) => (State::Disconnected, Effect::Lost),

            (State::RunningCommand, Event::Prompt(Prompt::Shell)) => {
                (State::Ready, Effect::CommandDone)
            }
            (State::RunningCommand, Event::Prompt(Prompt::Sudo)) => (SUDO, Effect::SendPassword),
            (State::RunningCommand, Event::Timeout) => (State::RunningCommand, Effect::Stalled),
            (State::RunningCommand, Event::Eof) => (State::Disconnected, Effect::Lost),

            (state, _) => (state, Effect::Ignored),
        };

        self.state = next;
        effect
    }

    pub fn command_sent(&mut self) -> bool {
        match self.state {
            State::Ready | State::RunningCommand => {
                self.state = State::RunningCommand;
                true
            }
            State::AwaitingShellPrompt(Purpose::Command) => true,
            _ => false,
        }
    }

    pub fn disconnect(&mut self) {
        self.state = State::Disconnected;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Login {
    Established,
    Failed { output: String, timed_out: bool },
}

/// How a command ended, with the output seen before the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Done(String),
    Stalled(String),
    Lost(String),
}

/// A session driven by the prompt automaton.
pub struct Connection {
    session: Box<dyn Session>,
    protocol: Protocol,
    context: SessionContext,
}

impl Connection {
    pub fn new(session: Box<dyn Session>, context: SessionContext) -> Self {
        Self {
            session,
            protocol: Protocol::new(),
            context,
        }
    }

    pub fn state(&self) -> State {
        self.protocol.state()
    }

    pub fn is_open(&self) -> bool {
        self.protocol.state() != State::Disconnected
    }

    pub fn is_busy(&self) -> bool {
        self.protocol.is_busy()
    }

    pub fn login(&mut self) -> Result<Login> {
        let timeout = self.context.timeout;
        let (effect, output) = self.drive(timeout)?;
        match effect {
            Effect::Established => Ok(Login::Established),
            Effect::ConnectTimedOut => Ok(Login::Failed {
                output,
                timed_out: true,
            }),
            _ => Ok(Login::Failed {
                output,
                timed_out: false,
            }),
        }
    }

    pub fn run(&mut self, command: &str, timeout: Duration) -> Result<Reply> {
        if !self.protocol.command_sent() {
            return Err(Error::session_closed(command));
        }
        self.session.send_line(command)?;
        self.wait(timeout)
    }

    /// Keep waiting for a busy command to return to the prompt.
    pub fn wait(&mut self, timeout: Duration) -> Result<Reply> {
        let (effect, output) = self.drive(timeout)?;
        Ok(match effect {
            Effect::CommandDone => Reply::Done(output),
            Effect::Stalled => Reply::Stalled(output),
            _ => Reply::Lost(output),
        })
    }

    /// Stop using the connection without a clean logout.
    pub fn abandon(mut self) {
        self.protocol.disconnect();
        self.session.close();
    }

    pub fn close(mut self) {
        if self.is_open() {
            let _ = self.session.send_line("exit");
            self.protocol.disconnect();
        }
        self.session.close();
    }

    fn drive(&mut self, timeout: Duration) -> Result<(Effect, String)> {
        let mut output = String::new();
        loop {
            let prompts = self.protocol.expected();
            if prompts.is_empty() {
                return Err(Error::internal_unexpected(format!(
                    "no prompt expected in state {:?}",
                    self.protocol.state()
                )));
            }
            let patterns: Vec<&regex::Regex> =
                prompts.iter().map(|p| self.context.pattern(*p)).collect();

            let event = match self.session.expect(&patterns, timeout)? {
                Expectation::Matched { index, before, .. } => {
                    output.push_str(&before);
                    Event::Prompt(prompts[index])
                }
                Expectation::Timeout { before } => {
                    output.push_str(&before);
                    Event::Timeout
                }
                Expectation::Eof { before } => {
                    output.push_str(&before);
                    Event::Eof
                }
            };

            match self.protocol.on_event(event) {
                Effect::SendPassword => self.session.send_line(&self.context.password)?,
                Effect::Ignored => {}
                effect => return Ok((effect, output)),
            }
        }
    }
}
