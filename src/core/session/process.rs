//! Subprocess sessions over piped stdio.
//!
//! Output from stdout and stderr is forwarded by reader threads into one
//! channel so `expect` can wait with a timeout.

use std::io::{Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use regex::Regex;

use super::{Expectation, Launcher, Session};
use crate::error::{Error, Result};

pub struct ProcessSession {
    command: String,
    child: Child,
    stdin: Option<ChildStdin>,
    output: Receiver<String>,
    buffer: String,
    eof: bool,
}

impl ProcessSession {
    pub fn spawn(argv: &[String], display: &str) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| Error::session_spawn_failed(display, "empty command"))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::session_spawn_failed(display, e.to_string()))?;

        let (sender, receiver) = mpsc::channel();
        if let Some(stdout) = child.stdout.take() {
            forward(stdout, sender.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward(stderr, sender);
        }

        Ok(Self {
            command: display.to_string(),
            stdin: child.stdin.take(),
            child,
            output: receiver,
            buffer: String::new(),
            eof: false,
        })
    }

    fn take_match(&mut self, patterns: &[&Regex]) -> Option<Expectation> {
        let (index, start, end) = patterns
            .iter()
            .enumerate()
            .filter_map(|(index, pattern)| {
                pattern
                    .find(&self.buffer)
                    .map(|found| (index, found.start(), found.end()))
            })
            .min_by_key(|&(index, start, _)| (start, index))?;

        let matched = self.buffer[start..end].to_string();
        let before = self.buffer[..start].to_string();
        self.buffer.drain(..end);
        Some(Expectation::Matched {
            index,
            before,
            matched,
        })
    }
}

fn forward<R: Read + Send + 'static>(mut reader: R, sender: mpsc::Sender<String>) {
    thread::spawn(move || {
        let mut decoder = Utf8Decoder::default();
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let text = decoder.push(&chunk[..n]);
                    if !text.is_empty() && sender.send(text).is_err() {
                        return;
                    }
                }
            }
        }
        let rest = decoder.finish();
        if !rest.is_empty() {
            let _ = sender.send(rest);
        }
    });
}

/// Incremental UTF-8 decoding that holds back a character split across reads.
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut text = String::new();
        let mut rest: &[u8] = &self.pending;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    // Checked by from_utf8 above.
                    text.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match err.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }
        self.pending = rest.to_vec();
        text
    }

    fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}

impl Session for ProcessSession {
    fn expect(&mut self, patterns: &[&Regex], timeout: Duration) -> Result<Expectation> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(found) = self.take_match(patterns) {
                return Ok(found);
            }
            if self.eof {
                return Ok(Expectation::Eof {
                    before: std::mem::take(&mut self.buffer),
                });
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.output.recv_timeout(remaining) {
                Ok(text) => self.buffer.push_str(&text),
                Err(RecvTimeoutError::Timeout) => {
                    return Ok(Expectation::Timeout {
                        before: std::mem::take(&mut self.buffer),
                    });
                }
                Err(RecvTimeoutError::Disconnected) => self.eof = true,
            }
        }
    }

    fn send_line(&mut self, line: &str) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| Error::session_closed(&self.command))?;
        writeln!(stdin, "{}", line)
            .and_then(|_| stdin.flush())
            .map_err(|_| Error::session_closed(&self.command))
    }

    fn close(&mut self) {
        self.stdin.take();
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

impl Drop for ProcessSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Spawns commands through the configured pty wrapper, or `sh -c` without one.
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher {
    wrapper: Vec<String>,
}

impl ProcessLauncher {
    pub fn new(wrapper: Vec<String>) -> Self {
        Self { wrapper }
    }

    pub fn argv(&self, command: &str) -> Vec<String> {
        if self.wrapper.is_empty() {
            return vec!["sh".to_string(), "-c".to_string(), command.to_string()];
        }
        self.wrapper
            .iter()
            .map(|arg| arg.replace("{command}", command))
            .collect()
    }
}

impl Launcher for ProcessLauncher {
    fn spawn(&self, command: &str) -> Result<Box<dyn Session>> {
        log_status!("session", "Spawning: {}", command);
        let session = ProcessSession::spawn(&self.argv(command), command)?;
        Ok(Box::new(session))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn pattern(p: &str) -> Regex {
        Regex::new(p).unwrap()
    }

    #[test]
    fn wrapper_receives_full_command() {
        let launcher = ProcessLauncher::new(vec![
            "script".into(),
            "-qfec".into(),
            "{command}".into(),
            "/dev/null".into(),
        ]);
        assert_eq!(
            launcher.argv("ssh u@h"),
            vec!["script", "-qfec", "ssh u@h", "/dev/null"]
        );
        assert_eq!(ProcessLauncher::default().argv("ls"), vec!["sh", "-c", "ls"]);
    }

    #[test]
    fn expect_matches_output_then_reports_eof() {
        let launcher = ProcessLauncher::default();
        let mut session = launcher.spawn("printf 'hello\\nprompt> '").unwrap();
        let prompt = pattern("> ");
        match session.expect(&[&prompt], Duration::from_secs(5)).unwrap() {
            Expectation::Matched { index, before, .. } => {
                assert_eq!(index, 0);
                assert_eq!(before, "hello\nprompt");
            }
            other => panic!("unexpected {:?}", other),
        }
        let next = session.expect(&[&prompt], Duration::from_secs(5)).unwrap();
        assert_eq!(next, Expectation::Eof { before: String::new() });
        session.close();
    }

    #[test]
    fn send_line_reaches_process() {
        let launcher = ProcessLauncher::default();
        let mut session = launcher.spawn("read line; echo got-$line").unwrap();
        session.send_line("value").unwrap();
        let done = pattern("got-value");
        let found = session.expect(&[&done], Duration::from_secs(5)).unwrap();
        assert!(matches!(found, Expectation::Matched { .. }));
        session.close();
    }

    #[test]
    fn silent_process_times_out() {
        let launcher = ProcessLauncher::default();
        let mut session = launcher.spawn("sleep 5").unwrap();
        let found = session
            .expect(&[&pattern("never")], Duration::from_millis(100))
            .unwrap();
        assert!(matches!(found, Expectation::Timeout { .. }));
        session.close();
    }

    #[test]
    fn earliest_match_wins() {
        let launcher = ProcessLauncher::default();
        let mut session = launcher.spawn("printf 'b then a'").unwrap();
        let (a, b) = (pattern("a"), pattern("b"));
        match session.expect(&[&a, &b], Duration::from_secs(5)).unwrap() {
            Expectation::Matched { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn character_split_across_reads_is_kept_whole() {
        let mut decoder = Utf8Decoder::default();
        let bytes = "mot de passe é:".as_bytes();
        let split = bytes.len() - 2;
        assert_eq!(decoder.push(&bytes[..split]), "mot de passe ");
        assert_eq!(decoder.push(&bytes[split..]), "é:");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn invalid_bytes_become_replacement_characters() {
        let mut decoder = Utf8Decoder::default();
        assert_eq!(decoder.push(b"a\xffb"), "a\u{fffd}b");
        assert_eq!(decoder.push(b"\xc3"), "");
        assert_eq!(decoder.finish(), "\u{fffd}");
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let err = ProcessSession::spawn(&["/nonexistent/hostrun-bin".to_string()], "x")
            .err()
            .unwrap();
        assert_eq!(err.code, ErrorCode::SessionSpawnFailed);
    }
}
