//! Scripted collaborators for driving whole conversations in tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use recipe_core::{ExecutionResult, Recipe, RecipeSummary};
use recipe_engine::{Executor, ExecutorError, RecipeService, ServiceError, StreamCall, StreamIngestor};

use super::prompts::{Choice, PromptError, Prompter, StepEditor};

/// Service whose streams replay canned lines and which records every call.
#[derive(Default)]
pub struct FakeService {
    init: Mutex<VecDeque<Vec<String>>>,
    clarify: Mutex<VecDeque<Vec<String>>>,
    execution: Mutex<VecDeque<Vec<String>>>,
    regenerated_ids: Mutex<VecDeque<Option<String>>>,
    saved: Mutex<Vec<RecipeSummary>>,
    calls: Mutex<Vec<String>>,
}

fn lines(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|line| line.to_string()).collect()
}

impl FakeService {
    pub fn push_init(&self, body: &[&str]) {
        self.init.lock().unwrap().push_back(lines(body));
    }

    pub fn push_clarify(&self, body: &[&str]) {
        self.clarify.lock().unwrap().push_back(lines(body));
    }

    pub fn push_execution(&self, body: &[&str]) {
        self.execution.lock().unwrap().push_back(lines(body));
    }

    pub fn reassign_ids(&self, ids: Vec<Option<String>>) {
        self.regenerated_ids.lock().unwrap().extend(ids);
    }

    pub fn with_saved(self, saved: Vec<RecipeSummary>) -> Self {
        *self.saved.lock().unwrap() = saved;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl RecipeService for FakeService {
    async fn stream(
        &self,
        call: StreamCall,
        ingestor: &mut StreamIngestor<'_>,
    ) -> Result<(), ServiceError> {
        let (queue, label) = match &call {
            StreamCall::Init { recipe_id, .. } => {
                (&self.init, format!("init {}", recipe_id.as_deref().unwrap_or("-")))
            }
            StreamCall::Clarify { clarification, .. } => {
                (&self.clarify, format!("clarify {clarification}"))
            }
            StreamCall::Execution { id } => {
                (&self.execution, format!("execution {}", id.as_deref().unwrap_or("-")))
            }
        };
        self.record(label);
        let body = queue.lock().unwrap().pop_front().unwrap_or_default();
        for line in body {
            ingestor.feed_line(&line)?;
        }
        Ok(())
    }

    async fn persist_steps(&self, recipe: &Recipe) -> Result<(), ServiceError> {
        self.record(format!("steps {}", recipe.steps.join("|")));
        Ok(())
    }

    async fn regenerate(
        &self,
        recipe: &Recipe,
        clarification: &str,
    ) -> Result<Option<String>, ServiceError> {
        self.record(format!(
            "regenerate {} {}",
            recipe.id.as_deref().unwrap_or("-"),
            clarification
        ));
        Ok(self.regenerated_ids.lock().unwrap().pop_front().flatten())
    }

    async fn save(&self, recipe: &Recipe, name: &str) -> Result<(), ServiceError> {
        self.record(format!(
            "save {} {} units={}",
            recipe.id.as_deref().unwrap_or("-"),
            name,
            recipe.execution.len()
        ));
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RecipeSummary>, ServiceError> {
        self.record("list".to_string());
        Ok(self.saved.lock().unwrap().clone())
    }
}

/// Executor replaying scripted results; running out is a launch error.
pub struct FakeExecutor {
    results: VecDeque<ExecutionResult>,
    applied: Arc<Mutex<Vec<usize>>>,
}

impl FakeExecutor {
    pub fn new(results: Vec<ExecutionResult>) -> Self {
        Self {
            results: results.into(),
            applied: Arc::default(),
        }
    }

    /// Number of execution units seen by each `apply`.
    pub fn applied(&self) -> Arc<Mutex<Vec<usize>>> {
        self.applied.clone()
    }
}

impl Executor for FakeExecutor {
    fn apply(&mut self, recipe: &Recipe) -> Result<ExecutionResult, ExecutorError> {
        self.applied.lock().unwrap().push(recipe.execution.len());
        self.results.pop_front().ok_or(ExecutorError::MissingKey)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Pick(usize),
    Back,
    Text(String),
}

/// Answers menus and inputs from a script; an exhausted script is an interrupt.
pub struct ScriptedPrompter {
    answers: VecDeque<Answer>,
}

impl ScriptedPrompter {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: answers.into(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn choose(
        &mut self,
        _prompt: &str,
        _options: &[&str],
        _allow_back: bool,
    ) -> Result<Choice, PromptError> {
        match self.answers.pop_front() {
            Some(Answer::Pick(index)) => Ok(Choice::Picked(index)),
            Some(Answer::Back) => Ok(Choice::GoBack),
            None => Err(PromptError::Interrupted),
            Some(other) => panic!("expected a menu answer, got {other:?}"),
        }
    }

    fn input(&mut self, _prompt: &str) -> Result<String, PromptError> {
        match self.answers.pop_front() {
            Some(Answer::Text(text)) => Ok(text),
            None => Err(PromptError::Interrupted),
            Some(other) => panic!("expected text input, got {other:?}"),
        }
    }
}

/// Editor returning scripted buffers and remembering what it was given.
pub struct ScriptedEditor {
    outputs: VecDeque<String>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl ScriptedEditor {
    pub fn new(outputs: Vec<&str>) -> Self {
        Self {
            outputs: outputs.into_iter().map(str::to_string).collect(),
            seen: Arc::default(),
        }
    }

    pub fn seen(&self) -> Arc<Mutex<Vec<String>>> {
        self.seen.clone()
    }
}

impl StepEditor for ScriptedEditor {
    fn edit(&mut self, text: &str) -> Result<String, PromptError> {
        self.seen.lock().unwrap().push(text.to_string());
        self.outputs
            .pop_front()
            .ok_or_else(|| PromptError::Editor("no scripted edit left".into()))
    }
}
