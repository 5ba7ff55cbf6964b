//! Operator input: interactive command lines, confirmations and choices.

use std::collections::VecDeque;

use crate::error::Result;

pub trait Operator {
    /// One line of input. `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    fn confirm(&mut self, question: &str) -> Result<bool> {
        Ok(self
            .read_line(&format!("{} [y/N]: ", question))?
            .map(|answer| matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
            .unwrap_or(false))
    }

    /// Secret input such as a password.
    fn secret(&mut self, prompt: &str) -> Result<Option<String>> {
        self.read_line(prompt)
    }

    /// Free-form answer; empty input is `None`.
    fn ask(&mut self, question: &str) -> Result<Option<String>> {
        Ok(self
            .read_line(question)?
            .map(|answer| answer.trim().to_string())
            .filter(|answer| !answer.is_empty()))
    }

    /// Pick one of `options` by number. Invalid input is `None`.
    fn select(&mut self, title: &str, options: &[String]) -> Result<Option<usize>> {
        let mut menu = format!("{}\n", title);
        for (index, option) in options.iter().enumerate() {
            menu.push_str(&format!("  {}) {}\n", index + 1, option));
        }
        menu.push_str("Select: ");
        Ok(self
            .ask(&menu)?
            .and_then(|answer| answer.parse::<usize>().ok())
            .filter(|n| (1..=options.len()).contains(n))
            .map(|n| n - 1))
    }
}

/// Answers from a fixed list of lines, then reports end of input.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    lines: VecDeque<String>,
    pub prompts: Vec<String>,
}

impl ScriptedOperator {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }
}

impl Operator for ScriptedOperator {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.lines.pop_front())
    }
}
