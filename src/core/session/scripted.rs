//! Transcript-driven `Launcher`/`Session` test double.
//!
//! Each spawn consumes the next queued `Script` (the last one repeats). A
//! session shows the script's banner, then answers every sent line with the
//! next scripted reply. Expectations never block: a pattern that is not in the
//! pending output is an immediate timeout.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use regex::Regex;

use super::{Expectation, Launcher, Session};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    Output(String),
    /// Nothing is printed; the next expectation times out.
    Silence,
    /// The peer closes its end.
    Hangup,
    /// Output, then the peer closes its end.
    Closing(String),
    /// Writing the line fails and the session is gone.
    BrokenPipe,
}

#[derive(Debug, Clone, Default)]
pub struct Script {
    banner: String,
    replies: VecDeque<ScriptedReply>,
    fallback: Option<String>,
}

impl Script {
    pub fn new(banner: impl Into<String>) -> Self {
        Self {
            banner: banner.into(),
            ..Default::default()
        }
    }

    pub fn reply(mut self, reply: ScriptedReply) -> Self {
        self.replies.push_back(reply);
        self
    }

    /// Output sent once the scripted replies run out.
    pub fn otherwise(mut self, output: impl Into<String>) -> Self {
        self.fallback = Some(output.into());
        self
    }
}

#[derive(Default)]
struct Log {
    spawned: Vec<String>,
    sent: Vec<String>,
}

#[derive(Default)]
pub struct ScriptedLauncher {
    scripts: RefCell<VecDeque<Script>>,
    log: Rc<RefCell<Log>>,
}

impl ScriptedLauncher {
    pub fn new(script: Script) -> Self {
        Self::with_scripts(vec![script])
    }

    pub fn with_scripts(scripts: Vec<Script>) -> Self {
        Self {
            scripts: RefCell::new(scripts.into()),
            log: Rc::new(RefCell::new(Log::default())),
        }
    }

    /// Commands passed to `spawn`, in order.
    pub fn spawned(&self) -> Vec<String> {
        self.log.borrow().spawned.clone()
    }

    /// Lines sent to any session, in order.
    pub fn sent_lines(&self) -> Vec<String> {
        self.log.borrow().sent.clone()
    }

    fn next_script(&self) -> Script {
        let mut scripts = self.scripts.borrow_mut();
        if scripts.len() > 1 {
            scripts.pop_front().unwrap_or_default()
        } else {
            scripts.front().cloned().unwrap_or_default()
        }
    }
}

impl Launcher for ScriptedLauncher {
    fn spawn(&self, command: &str) -> Result<Box<dyn Session>> {
        self.log.borrow_mut().spawned.push(command.to_string());
        let script = self.next_script();
        Ok(Box::new(ScriptedSession {
            command: command.to_string(),
            pending: script.banner.clone(),
            script,
            log: Rc::clone(&self.log),
            eof: false,
            closed: false,
        }))
    }
}

struct ScriptedSession {
    command: String,
    pending: String,
    script: Script,
    log: Rc<RefCell<Log>>,
    eof: bool,
    closed: bool,
}

impl Session for ScriptedSession {
    fn expect(&mut self, patterns: &[&Regex], _timeout: Duration) -> Result<Expectation> {
        let earliest = patterns
            .iter()
            .enumerate()
            .filter_map(|(index, pattern)| {
                pattern
                    .find(&self.pending)
                    .map(|found| (index, found.start(), found.end()))
            })
            .min_by_key(|&(index, start, _)| (start, index));

        if let Some((index, start, end)) = earliest {
            let matched = self.pending[start..end].to_string();
            let before = self.pending[..start].to_string();
            self.pending.drain(..end);
            return Ok(Expectation::Matched {
                index,
                before,
                matched,
            });
        }

        let before = std::mem::take(&mut self.pending);
        if self.eof {
            Ok(Expectation::Eof { before })
        } else {
            Ok(Expectation::Timeout { before })
        }
    }

    fn send_line(&mut self, line: &str) -> Result<()> {
        if self.eof || self.closed {
            return Err(Error::session_closed(&self.command));
        }
        if self.script.replies.front() == Some(&ScriptedReply::BrokenPipe) {
            self.script.replies.pop_front();
            self.eof = true;
            return Err(Error::session_closed(&self.command));
        }
        self.log.borrow_mut().sent.push(line.to_string());
        match self.script.replies.pop_front() {
            Some(ScriptedReply::Output(output)) => self.pending.push_str(&output),
            Some(ScriptedReply::Silence) => {}
            Some(ScriptedReply::Hangup) => self.eof = true,
            Some(ScriptedReply::Closing(output)) => {
                self.pending.push_str(&output);
                self.eof = true;
            }
            Some(ScriptedReply::BrokenPipe) => {}
            None => {
                if let Some(fallback) = &self.script.fallback {
                    self.pending.push_str(fallback);
                }
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_spawn_takes_next_script_and_last_repeats() {
        let launcher = ScriptedLauncher::with_scripts(vec![Script::new("one"), Script::new("two")]);
        let pattern = Regex::new(".+").unwrap();
        for expected in ["one", "two", "two"] {
            let mut session = launcher.spawn("cmd").unwrap();
            match session.expect(&[&pattern], Duration::ZERO).unwrap() {
                Expectation::Matched { matched, .. } => assert_eq!(matched, expected),
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(launcher.spawned().len(), 3);
    }

    #[test]
    fn hangup_turns_into_eof() {
        let launcher = ScriptedLauncher::new(Script::new("").reply(ScriptedReply::Hangup));
        let mut session = launcher.spawn("cmd").unwrap();
        session.send_line("bye").unwrap();
        let never = Regex::new("never").unwrap();
        assert_eq!(
            session.expect(&[&never], Duration::ZERO).unwrap(),
            Expectation::Eof { before: String::new() }
        );
        assert!(session.send_line("again").is_err());
    }
}
