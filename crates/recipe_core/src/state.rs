use crate::view_model::RecipeView;
use crate::{ExecutionResult, Language, Recipe};

/// Lifecycle phase of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Empty,
    Outlining,
    Outlined,
    Clarifying,
    Generating,
    Generated,
    Executing,
    /// Clarification after a failed execution is being sent.
    Regenerating,
    Executed,
    Saved,
    /// Left without saving, or nothing to work on.
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    phase: Phase,
    recipe: Recipe,
    /// Outline as it stood when the edit loop was first entered.
    outline_baseline: Option<Vec<String>>,
    /// Fresh recipes are offered for saving; reloaded ones are not.
    offers_save: bool,
    last_result: Option<ExecutionResult>,
    generation_rounds: usize,
    regenerations: usize,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    /// Mutable access for stream ingestion while a streaming effect runs.
    pub fn recipe_mut(&mut self) -> &mut Recipe {
        &mut self.recipe
    }

    pub fn last_result(&self) -> Option<&ExecutionResult> {
        self.last_result.as_ref()
    }

    pub fn offers_save(&self) -> bool {
        self.offers_save
    }

    pub fn is_terminal(&self) -> bool {
        match self.phase {
            Phase::Saved | Phase::Closed => true,
            Phase::Executed => !self.offers_save,
            _ => false,
        }
    }

    pub fn view(&self) -> RecipeView {
        RecipeView {
            phase: self.phase,
            recipe_id: self.recipe.id.clone(),
            steps: self.recipe.steps.clone(),
            parameter_count: self.recipe.parameters.len(),
            execution_count: self.recipe.execution.len(),
            generation_rounds: self.generation_rounds,
            regenerations: self.regenerations,
            last_result: self.last_result.clone(),
        }
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn start_fresh(&mut self, prompt: String, language: Language, offers_save: bool) {
        self.recipe = Recipe::new(prompt, language);
        self.offers_save = offers_save;
        self.outline_baseline = None;
        self.last_result = None;
    }

    /// Records the loop-entry outline once; later entries keep the first one.
    pub(crate) fn remember_outline(&mut self) {
        if self.outline_baseline.is_none() {
            self.outline_baseline = Some(self.recipe.steps.clone());
        }
    }

    pub(crate) fn outline_changed(&self) -> bool {
        self.outline_baseline
            .as_ref()
            .is_some_and(|baseline| *baseline != self.recipe.steps)
    }

    pub(crate) fn begin_generation(&mut self) {
        self.recipe.begin_generation();
        self.generation_rounds += 1;
        self.phase = Phase::Generating;
    }

    pub(crate) fn record_result(&mut self, result: ExecutionResult) {
        self.last_result = Some(result);
    }

    pub(crate) fn count_regeneration(&mut self) {
        self.regenerations += 1;
    }
}
