use crate::{ExecutionResult, Phase};

/// Read-only snapshot of the lifecycle, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecipeView {
    pub phase: Phase,
    pub recipe_id: Option<String>,
    pub steps: Vec<String>,
    pub parameter_count: usize,
    pub execution_count: usize,
    /// Number of times the lifecycle entered `Generating`.
    pub generation_rounds: usize,
    pub regenerations: usize,
    pub last_result: Option<ExecutionResult>,
}
