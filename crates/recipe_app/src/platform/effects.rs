use std::sync::Arc;

use anyhow::Context;
use recipe_core::{AppState, Effect, Msg, OutlineAction, RecipeSummary};
use recipe_engine::{
    CancellationToken, Console, RecipeService, ServiceError, StreamCall, StreamIngestor,
};
use recipe_logging::{recipe_debug, recipe_info, recipe_warn};
use tokio::runtime::Runtime;

use super::coordinator::ExecutionCoordinator;
use super::prompts::{Choice, Prompter, StepEditor};

const INIT_BANNER: &str =
    "Based on your requirements, I've set the project outline to include the following steps: ";
const CLARIFY_BANNER: &str = "Based on your requirements & extra details, I've set the project outline to include the following steps: ";
const OUTLINE_SPINNER: &str = "getting an outline ready...";
const GENERATION_SPINNER: &str =
    "generating files, please be patient as this can take several minutes...";
const NO_SAVED_RECIPES: &str =
    "You don't have any saved recipes. To create a recipe try 'recipe <prompt>'";
const SAVED_HINT: &str = "To use a saved recipe, simply type 'recipe'";

/// Performs the effects requested by `update` and reports back with messages.
pub struct EffectRunner {
    runtime: Runtime,
    service: Arc<dyn RecipeService>,
    coordinator: ExecutionCoordinator,
    prompter: Box<dyn Prompter>,
    editor: Box<dyn StepEditor>,
    console: Console,
    cancel: CancellationToken,
}

impl EffectRunner {
    pub fn new(
        runtime: Runtime,
        service: Arc<dyn RecipeService>,
        coordinator: ExecutionCoordinator,
        prompter: Box<dyn Prompter>,
        editor: Box<dyn StepEditor>,
        console: Console,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            runtime,
            service,
            coordinator,
            prompter,
            editor,
            console,
            cancel,
        }
    }

    pub fn perform(&mut self, effect: Effect, state: &mut AppState) -> anyhow::Result<Vec<Msg>> {
        if self.cancel.is_cancelled() {
            return Err(ServiceError::Cancelled.into());
        }
        recipe_debug!("effect in {:?}: {:?}", state.phase(), effect);

        let msgs = match effect {
            Effect::PickSavedRecipe => vec![self.pick_saved_recipe()?],
            Effect::StreamInit { recipe_id } => {
                let recipe = state.recipe();
                let call = StreamCall::init(recipe.prompt.clone(), recipe.language, recipe_id);
                self.stream(state, call, OUTLINE_SPINNER, Some(INIT_BANNER))?;
                vec![Msg::OutlineStreamed]
            }
            Effect::StreamClarify { clarification } => {
                let call = StreamCall::clarify(state.recipe(), clarification);
                self.stream(state, call, OUTLINE_SPINNER, Some(CLARIFY_BANNER))?;
                vec![Msg::OutlineStreamed]
            }
            Effect::ChooseOutlineAction => {
                self.console.blank();
                let labels = OutlineAction::ALL.map(OutlineAction::label);
                let index = self.pick("What would you like to do?", &labels)?;
                vec![Msg::OutlineActionChosen(OutlineAction::ALL[index])]
            }
            Effect::EditSteps { text } => {
                let edited = self.editor.edit(&text).context("editing the outline")?;
                vec![Msg::StepsEdited(edited)]
            }
            Effect::AskClarification => {
                let text = self.prompter.input("add details")?;
                vec![Msg::ClarificationSubmitted(text)]
            }
            Effect::PrintSteps => {
                self.console.blank();
                for line in state.recipe().numbered_steps() {
                    self.console.line(line);
                }
                self.console.blank();
                Vec::new()
            }
            Effect::PersistSteps { steps } => {
                recipe_info!("persisting {} edited steps", steps.len());
                self.runtime
                    .block_on(self.service.persist_steps(state.recipe()))
                    .context("saving the edited outline")?;
                Vec::new()
            }
            Effect::StreamExecution => {
                let call = StreamCall::execution(state.recipe());
                self.console.blank();
                self.stream(state, call, GENERATION_SPINNER, None)?;
                vec![Msg::GenerationStreamed]
            }
            Effect::Execute => vec![Msg::ExecutionStarted],
            Effect::ApplyRecipe => {
                let result = self.coordinator.execute(state.recipe());
                if self.cancel.is_cancelled() {
                    return Err(ServiceError::Cancelled.into());
                }
                vec![Msg::ExecutionFinished(result)]
            }
            Effect::OfferRegeneration { diagnostic } => {
                vec![self
                    .coordinator
                    .offer_regeneration(self.prompter.as_mut(), &diagnostic)?]
            }
            Effect::Regenerate { clarification } => {
                let id = self
                    .runtime
                    .block_on(self.coordinator.regenerate(state.recipe(), &clarification))
                    .context("requesting a regeneration")?;
                vec![Msg::Regenerated { id }]
            }
            Effect::OfferSave => vec![self.offer_save()?],
            Effect::SaveRecipe { name } => {
                self.runtime
                    .block_on(self.service.save(state.recipe(), &name))
                    .context("saving the recipe")?;
                self.console.blank();
                self.console.line(SAVED_HINT);
                Vec::new()
            }
        };
        Ok(msgs)
    }

    /// Runs one streaming call; the reporter is stopped before this returns.
    fn stream(
        &mut self,
        state: &mut AppState,
        call: StreamCall,
        spinner: &str,
        banner: Option<&str>,
    ) -> anyhow::Result<()> {
        let path = call.path();
        let mut ingestor = StreamIngestor::new(state.recipe_mut(), self.console.clone(), &self.cancel)
            .with_spinner(spinner);
        if let Some(banner) = banner {
            ingestor = ingestor.with_banner(banner);
        }
        let outcome = self
            .runtime
            .block_on(self.service.stream(call, &mut ingestor));
        let report = ingestor.finish();
        recipe_debug!(
            "{} dispatched {} events ({} unknown)",
            path,
            report.dispatched,
            report.unknown
        );
        if report.unknown > 0 {
            recipe_warn!("{} ignored {} unknown json objects", path, report.unknown);
        }
        outcome.with_context(|| format!("streaming {path}"))
    }

    fn pick_saved_recipe(&mut self) -> anyhow::Result<Msg> {
        let recipes = self
            .runtime
            .block_on(self.service.list())
            .context("listing saved recipes")?;
        if recipes.is_empty() {
            self.console.line(NO_SAVED_RECIPES);
            return Ok(Msg::BrowseAbandoned);
        }

        let names: Vec<&str> = recipes.iter().map(|recipe| recipe.name.as_str()).collect();
        loop {
            self.console.line("Select from available recipes: ");
            let index = self.pick("recipe", &names)?;
            let picked: &RecipeSummary = &recipes[index];
            self.console.blank();
            self.console.line(format!("{}: {}", picked.name, picked.prompt));
            match self.prompter.choose("Use this recipe?", &["yes"], true)? {
                Choice::Picked(_) => return Ok(Msg::SavedRecipeSelected(picked.clone())),
                Choice::GoBack => self.console.blank(),
            }
        }
    }

    fn offer_save(&mut self) -> anyhow::Result<Msg> {
        self.console.blank();
        self.console
            .line("Would you like to save this as a reusable recipe?");
        self.console.blank();
        if self.pick("save or exit", &["save", "exit"])? != 0 {
            return Ok(Msg::SaveDeclined);
        }
        loop {
            let name = self.prompter.input("Enter a name for the saved recipe")?;
            if !name.trim().is_empty() {
                return Ok(Msg::SaveRequested {
                    name: name.trim().to_string(),
                });
            }
        }
    }

    /// Menu without a "go back" entry; asks again if one comes back anyway.
    fn pick(&mut self, prompt: &str, options: &[&str]) -> anyhow::Result<usize> {
        loop {
            if let Choice::Picked(index) = self.prompter.choose(prompt, options, false)? {
                if index < options.len() {
                    return Ok(index);
                }
            }
        }
    }
}
