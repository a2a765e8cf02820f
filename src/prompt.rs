//! Interactive input for issue creation.
//!
//! Questions go through the [`Prompter`] trait so the binary can read the
//! terminal while tests feed scripted answers.

use crate::error::{IssueError, Result};
use crate::registry::Registry;
use crate::types::{Confirmation, Issue, IssueDraft};
use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use tracing::debug;

/// Source of answers to interactive questions
pub trait Prompter {
    /// Ask `question` and return the answer without surrounding whitespace.
    ///
    /// Running out of input cancels the current operation.
    fn ask(&mut self, question: &str) -> Result<String>;
}

/// Prompter over a line reader and a writer, normally stdin and stdout
pub struct LinePrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl LinePrompter<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
    fn ask(&mut self, question: &str) -> Result<String> {
        let flush = write!(self.output, "{}", question).and_then(|_| self.output.flush());
        if let Err(e) = flush {
            debug!("prompt write failed: {}", e);
        }

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => Err(IssueError::cancelled("end of input")),
            Ok(_) => Ok(line.trim().to_string()),
            Err(e) => Err(IssueError::cancelled(format!("failed to read answer: {}", e))),
        }
    }
}

/// Prompter that replays prepared answers in order
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    /// Questions asked so far
    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, question: &str) -> Result<String> {
        self.asked.push(question.to_string());
        self.answers
            .pop_front()
            .map(|a| a.trim().to_string())
            .ok_or_else(|| IssueError::cancelled("end of input"))
    }
}

/// Answers supplied up front; any `None` is asked interactively
#[derive(Debug, Clone, Default)]
pub struct Preset {
    pub name: Option<String>,
    pub info: Option<String>,
    pub urge: Option<u32>,
    pub overwrite: Option<Confirmation>,
}

/// Collect a new issue from `prompter` and add it to `registry`
///
/// When the name is already in use the user is asked whether to override:
/// yes replaces the existing issue, no or an unrecognized answer cancels.
pub fn create_interactive<P: Prompter>(
    registry: &mut Registry,
    prompter: &mut P,
    preset: &Preset,
    at: DateTime<Local>,
) -> Result<Issue> {
    let name = match &preset.name {
        Some(name) => name.trim().to_string(),
        None => prompter.ask("Name: ")?,
    };
    if name.is_empty() {
        return Err(IssueError::cancelled("an issue needs a name"));
    }

    let mut replace = false;
    if !registry.find_by_name(&name).is_empty() {
        let answer = match &preset.overwrite {
            Some(answer) => answer.clone(),
            None => Confirmation::parse(&prompter.ask(&format!(
                "Issue with name {} already exists, Override? [Y/n] default: Y ",
                name
            ))?),
        };
        match answer {
            Confirmation::Yes => replace = true,
            Confirmation::No => return Err(IssueError::cancelled("creation declined")),
            Confirmation::Unrecognized(value) => {
                return Err(IssueError::cancelled(format!("Unknown value: {}", value)))
            }
        }
    }

    let info = match &preset.info {
        Some(info) => info.trim().to_string(),
        None => prompter.ask("Info: ")?,
    };
    let urge = match preset.urge {
        Some(urge) => urge,
        None => IssueDraft::parse_urge(&prompter.ask("Urge: ")?),
    };

    let mut draft = IssueDraft::new(name).with_urge(urge);
    if !info.is_empty() {
        draft = draft.with_info(info);
    }

    let issue = if replace {
        registry.create_replacing(draft, at)?
    } else {
        registry.create(draft, at)?
    };
    Ok(issue.clone())
}
