use std::path::PathBuf;
use std::process::{Command, Stdio};

use recipe_core::{ExecutionResult, Recipe};
use recipe_logging::{recipe_debug, recipe_info};

use crate::{AtomicFileWriter, Console, ExecutorError};

pub const PARAMETERS_FILENAME: &str = "parameters.json";

/// External executor capability: applies a generated recipe.
///
/// An unsuccessful run is reported through [`ExecutionResult`]; `Err` is
/// reserved for failures to hand the recipe over at all. Regeneration is left
/// to the caller.
pub trait Executor: Send {
    fn apply(&mut self, recipe: &Recipe) -> Result<ExecutionResult, ExecutorError>;
}

/// Writes execution units into a work directory and runs an apply command there.
pub struct WorkdirExecutor {
    writer: AtomicFileWriter,
    command: String,
    console: Console,
}

impl WorkdirExecutor {
    pub fn new(dir: PathBuf, command: impl Into<String>, console: Console) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
            command: command.into(),
            console,
        }
    }

    /// Writes every unit under its key plus the parameters file.
    pub fn write_units(&self, recipe: &Recipe) -> Result<Vec<PathBuf>, ExecutorError> {
        let mut written = Vec::with_capacity(recipe.execution.len() + 1);
        for unit in &recipe.execution {
            let key = unit.key().ok_or(ExecutorError::MissingKey)?;
            let body = match unit.content() {
                Some(content) => content.to_string(),
                None => serde_json::to_string_pretty(unit.raw()).map_err(|source| {
                    ExecutorError::Encode {
                        what: "execution unit",
                        source,
                    }
                })?,
            };
            written.push(self.writer.write(key, &body)?);
        }

        let parameters = serde_json::to_string_pretty(&recipe.parameters).map_err(|source| {
            ExecutorError::Encode {
                what: "parameters",
                source,
            }
        })?;
        written.push(self.writer.write(PARAMETERS_FILENAME, &parameters)?);
        Ok(written)
    }

    fn run_command(&self) -> Result<ExecutionResult, ExecutorError> {
        let (shell, flag) = if cfg!(windows) { ("cmd", "/C") } else { ("sh", "-c") };
        recipe_info!(
            "running `{}` in {}",
            self.command,
            self.writer.dir().display()
        );
        let output = Command::new(shell)
            .arg(flag)
            .arg(&self.command)
            .current_dir(self.writer.dir())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| ExecutorError::Launch {
                command: self.command.clone(),
                source,
            })?;

        if !output.stderr.is_empty() {
            let _ = self.console.write_bytes(&output.stderr);
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if output.status.success() {
            Ok(ExecutionResult::succeeded(stderr))
        } else {
            let diagnostic = if stderr.is_empty() {
                format!("`{}` exited with {}", self.command, output.status)
            } else {
                stderr
            };
            Ok(ExecutionResult::failed(diagnostic))
        }
    }
}

impl Executor for WorkdirExecutor {
    fn apply(&mut self, recipe: &Recipe) -> Result<ExecutionResult, ExecutorError> {
        let written = self.write_units(recipe)?;
        recipe_debug!("wrote {} files for recipe {:?}", written.len(), recipe.id);
        self.run_command()
    }
}
