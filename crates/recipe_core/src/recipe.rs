use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Target language of the generated execution units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Terraform,
    Shell,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Terraform, Language::Shell];

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Terraform => "terraform",
            Language::Shell => "shell",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown language `{0}` (expected terraform or shell)")]
pub struct ParseLanguageError(pub String);

impl FromStr for Language {
    type Err = ParseLanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseLanguageError(s.to_string()))
    }
}

/// A parameter as received from the generation service, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameter {
    raw: Value,
}

impl Parameter {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn name(&self) -> Option<&str> {
        self.raw.get("name").and_then(Value::as_str)
    }

    pub fn description(&self) -> Option<&str> {
        self.raw.get("description").and_then(Value::as_str)
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// One generated artifact. The `key` correlates progress notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionUnit {
    raw: Value,
}

impl ExecutionUnit {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn key(&self) -> Option<&str> {
        self.raw.get("key").and_then(Value::as_str)
    }

    /// Generated file body, when the unit carries one.
    pub fn content(&self) -> Option<&str> {
        self.raw.get("content").and_then(Value::as_str)
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// Outcome reported by the executor. A failure is data, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub diagnostic: String,
}

impl ExecutionResult {
    pub fn succeeded(diagnostic: impl Into<String>) -> Self {
        Self {
            success: true,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn failed(diagnostic: impl Into<String>) -> Self {
        Self {
            success: false,
            diagnostic: diagnostic.into(),
        }
    }
}

/// The evolving artifact of one conversation.
///
/// Sequences are append-only while a stream is being ingested; they are only
/// cleared when a new streaming call for the same sequence begins.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Option<String>,
    pub prompt: String,
    pub language: Language,
    pub steps: Vec<String>,
    pub parameters: Vec<Parameter>,
    pub execution: Vec<ExecutionUnit>,
}

impl Recipe {
    pub fn new(prompt: impl Into<String>, language: Language) -> Self {
        Self {
            prompt: prompt.into(),
            language,
            ..Self::default()
        }
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Appends a step and returns its 1-based position.
    pub fn push_step(&mut self, step: impl Into<String>) -> usize {
        self.steps.push(step.into());
        self.steps.len()
    }

    pub fn push_parameter(&mut self, parameter: Parameter) {
        self.parameters.push(parameter);
    }

    pub fn push_execution(&mut self, unit: ExecutionUnit) {
        self.execution.push(unit);
    }

    /// Clears the outline ahead of a fresh outline stream.
    pub fn begin_outline(&mut self) {
        self.steps.clear();
    }

    /// Clears generated units and parameters ahead of a generation stream.
    pub fn begin_generation(&mut self) {
        self.execution.clear();
        self.parameters.clear();
    }

    /// Non-blank steps joined one per line, as handed to the editor.
    pub fn steps_text(&self) -> String {
        self.steps
            .iter()
            .filter(|step| !step.trim().is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Replaces the outline with the non-blank lines of `text`.
    pub fn replace_steps_from_text(&mut self, text: &str) {
        self.steps = parse_steps(text);
    }

    /// Steps rendered `"<n>. <step>"`, 1-based.
    pub fn numbered_steps(&self) -> Vec<String> {
        self.steps
            .iter()
            .enumerate()
            .map(|(idx, step)| format!("{}. {}", idx + 1, step))
            .collect()
    }
}

fn parse_steps(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Entry of the saved-recipe listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub language: String,
}

impl RecipeSummary {
    /// Language of the saved recipe, falling back to the default for unknown tags.
    pub fn language(&self) -> Language {
        self.language.parse().unwrap_or_default()
    }
}
