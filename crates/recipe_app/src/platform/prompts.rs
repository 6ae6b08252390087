//! Terminal adapters for the selection menu, free-text input and the editor.

use std::fs;
use std::io::{self, Write};
use std::process::Command;

use dialoguer::{Input, Select};
use thiserror::Error;

const GO_BACK: &str = "go back";

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("interrupted")]
    Interrupted,
    #[error("terminal io error: {0}")]
    Io(#[from] io::Error),
    #[error("editor failed: {0}")]
    Editor(String),
}

impl From<dialoguer::Error> for PromptError {
    fn from(err: dialoguer::Error) -> Self {
        let dialoguer::Error::IO(err) = err;
        if err.kind() == io::ErrorKind::Interrupted {
            PromptError::Interrupted
        } else {
            PromptError::Io(err)
        }
    }
}

/// Answer of the selection menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Picked(usize),
    GoBack,
}

pub trait Prompter {
    /// Shows `options`; with `allow_back` a trailing "go back" entry is added.
    fn choose(
        &mut self,
        prompt: &str,
        options: &[&str],
        allow_back: bool,
    ) -> Result<Choice, PromptError>;

    /// Reads one line of free text; may be empty.
    fn input(&mut self, prompt: &str) -> Result<String, PromptError>;
}

pub trait StepEditor {
    fn edit(&mut self, text: &str) -> Result<String, PromptError>;
}

#[derive(Debug, Default)]
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn choose(
        &mut self,
        prompt: &str,
        options: &[&str],
        allow_back: bool,
    ) -> Result<Choice, PromptError> {
        let mut items = options.to_vec();
        if allow_back {
            items.push(GO_BACK);
        }
        let picked = Select::new()
            .with_prompt(prompt)
            .items(&items)
            .default(0)
            .interact()?;
        if picked >= options.len() {
            Ok(Choice::GoBack)
        } else {
            Ok(Choice::Picked(picked))
        }
    }

    fn input(&mut self, prompt: &str) -> Result<String, PromptError> {
        let text: String = Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        Ok(text.trim().to_string())
    }
}

/// Opens the text in `$EDITOR` through a temp file.
#[derive(Debug, Clone)]
pub struct ExternalEditor {
    command: String,
}

impl ExternalEditor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl StepEditor for ExternalEditor {
    fn edit(&mut self, text: &str) -> Result<String, PromptError> {
        let mut file = tempfile::Builder::new()
            .prefix("recipe-steps-")
            .suffix(".txt")
            .tempfile()?;
        file.write_all(text.as_bytes())?;
        file.flush()?;

        // `$EDITOR` may carry arguments, e.g. `code --wait`.
        let mut parts = self.command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| PromptError::Editor("no editor configured".into()))?;
        let status = Command::new(program)
            .args(parts)
            .arg(file.path())
            .status()
            .map_err(|err| PromptError::Editor(format!("could not launch `{program}`: {err}")))?;
        if !status.success() {
            return Err(PromptError::Editor(format!("`{program}` exited with {status}")));
        }

        Ok(fs::read_to_string(file.path())?)
    }
}
