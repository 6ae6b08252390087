use std::sync::Arc;

use recipe_core::{ExecutionResult, Msg, Recipe};
use recipe_engine::{Console, Executor, RecipeService, ServiceError};
use recipe_logging::{recipe_error, recipe_info};

use super::prompts::{Choice, PromptError, Prompter};

const FAILURE_OPTIONS: [&str; 2] = ["regenerate with more details", "exit"];

/// Runs a generated recipe through the executor and handles the failure branch.
///
/// Never retries on its own: a failure is shown and the user decides whether
/// to send a clarification. There is no cap on how often that happens.
pub struct ExecutionCoordinator {
    executor: Box<dyn Executor>,
    service: Arc<dyn RecipeService>,
    console: Console,
}

impl ExecutionCoordinator {
    pub fn new(
        executor: Box<dyn Executor>,
        service: Arc<dyn RecipeService>,
        console: Console,
    ) -> Self {
        Self {
            executor,
            service,
            console,
        }
    }

    /// Applies the recipe. A launch failure becomes a failed result so the
    /// user can still ask for a regeneration.
    pub fn execute(&mut self, recipe: &Recipe) -> ExecutionResult {
        self.console.blank();
        match self.executor.apply(recipe) {
            Ok(result) => {
                recipe_info!("execution finished, success={}", result.success);
                result
            }
            Err(err) => {
                recipe_error!("executor could not run: {}", err);
                ExecutionResult::failed(err.to_string())
            }
        }
    }

    pub fn offer_regeneration(
        &self,
        prompter: &mut dyn Prompter,
        diagnostic: &str,
    ) -> Result<Msg, PromptError> {
        self.console.blank();
        self.console.line("Execution failed:");
        if !diagnostic.trim().is_empty() {
            self.console.line(diagnostic.trim_end());
        }
        self.console.blank();

        match prompter.choose("How would you like to proceed?", &FAILURE_OPTIONS, false)? {
            Choice::Picked(0) => {
                let clarification = prompter.input("what should change?")?;
                Ok(Msg::RegenerationRequested(clarification))
            }
            _ => Ok(Msg::RegenerationDeclined),
        }
    }

    /// Sends the clarification; the caller re-streams the execution units.
    pub async fn regenerate(
        &self,
        recipe: &Recipe,
        clarification: &str,
    ) -> Result<Option<String>, ServiceError> {
        recipe_info!("regenerating recipe {:?}", recipe.id);
        self.service.regenerate(recipe, clarification).await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use recipe_core::Language;

    use super::*;
    use crate::platform::fakes::{Answer, FakeExecutor, FakeService, ScriptedPrompter};

    fn coordinator(results: Vec<ExecutionResult>) -> (ExecutionCoordinator, Arc<FakeService>) {
        let service = Arc::new(FakeService::default());
        let (console, _out) = Console::capture();
        let coordinator = ExecutionCoordinator::new(
            Box::new(FakeExecutor::new(results)),
            service.clone(),
            console,
        );
        (coordinator, service)
    }

    #[test]
    fn execute_passes_the_executor_result_through() {
        let (mut coordinator, _) = coordinator(vec![ExecutionResult::failed("bad provider")]);
        let result = coordinator.execute(&Recipe::new("p", Language::Terraform));
        assert_eq!(result, ExecutionResult::failed("bad provider"));
    }

    #[test]
    fn executor_launch_error_becomes_a_failed_result() {
        let (mut coordinator, _) = coordinator(Vec::new());
        let result = coordinator.execute(&Recipe::default());
        assert!(!result.success);
        assert!(!result.diagnostic.is_empty());
    }

    #[test]
    fn picking_regenerate_collects_clarification() {
        let (coordinator, _) = coordinator(Vec::new());
        let mut prompter =
            ScriptedPrompter::new(vec![Answer::Pick(0), Answer::Text("use us-east-1".into())]);
        let msg = coordinator.offer_regeneration(&mut prompter, "boom").unwrap();
        assert_eq!(msg, Msg::RegenerationRequested("use us-east-1".into()));
    }

    #[test]
    fn picking_exit_declines() {
        let (coordinator, _) = coordinator(Vec::new());
        let mut prompter = ScriptedPrompter::new(vec![Answer::Pick(1)]);
        let msg = coordinator.offer_regeneration(&mut prompter, "boom").unwrap();
        assert_eq!(msg, Msg::RegenerationDeclined);
    }

    #[test]
    fn regenerate_forwards_to_the_service() {
        let (coordinator, service) = coordinator(Vec::new());
        service.reassign_ids(vec![Some("abc-2".into())]);
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut recipe = Recipe::default();
        recipe.set_id("abc");

        let id = runtime
            .block_on(coordinator.regenerate(&recipe, "fix it"))
            .unwrap();

        assert_eq!(id.as_deref(), Some("abc-2"));
        assert_eq!(service.calls(), vec!["regenerate abc fix it"]);
    }
}
