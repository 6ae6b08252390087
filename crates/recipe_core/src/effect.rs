/// Side effects requested by [`crate::update`]; performed by the app's effect runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// List saved recipes and let the user pick one.
    PickSavedRecipe,
    /// Stream the outline through `init`.
    StreamInit { recipe_id: Option<String> },
    /// Stream a refined outline through `clarify`.
    StreamClarify { clarification: String },
    /// Show the edit/clarify/continue menu.
    ChooseOutlineAction,
    /// Open the editor on `text`.
    EditSteps { text: String },
    /// Ask for outline clarification text.
    AskClarification,
    /// Reprint the outline.
    PrintSteps,
    /// Persist the edited outline through `steps`.
    PersistSteps { steps: Vec<String> },
    /// Stream execution units and parameters through `execution`.
    StreamExecution,
    /// Hand the recipe to the execution coordinator.
    Execute,
    /// Run the external executor on the recipe.
    ApplyRecipe,
    /// Surface an execution failure and ask whether to regenerate.
    OfferRegeneration { diagnostic: String },
    /// Send the regeneration clarification.
    Regenerate { clarification: String },
    /// Ask whether to save the recipe.
    OfferSave,
    /// Persist the recipe through `save`.
    SaveRecipe { name: String },
}
