use crate::{ExecutionResult, Language, RecipeSummary};

/// Choice offered while the outline is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlineAction {
    EditSteps,
    Clarify,
    Continue,
}

impl OutlineAction {
    pub const ALL: [OutlineAction; 3] = [
        OutlineAction::EditSteps,
        OutlineAction::Clarify,
        OutlineAction::Continue,
    ];

    pub fn label(self) -> &'static str {
        match self {
            OutlineAction::EditSteps => "edit in editor",
            OutlineAction::Clarify => "clarify",
            OutlineAction::Continue => "continue",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User supplied a fresh natural-language request.
    PromptSubmitted { prompt: String, language: Language },
    /// User asked to reuse a saved recipe instead of writing a prompt.
    BrowseRequested,
    /// User picked and confirmed a saved recipe.
    SavedRecipeSelected(RecipeSummary),
    /// Nothing was picked (empty listing or abandoned pick).
    BrowseAbandoned,
    /// An `init` or `clarify` stream was fully consumed.
    OutlineStreamed,
    /// User answered the edit/clarify/continue menu.
    OutlineActionChosen(OutlineAction),
    /// Raw text returned by the editor.
    StepsEdited(String),
    /// Clarification text for the outline.
    ClarificationSubmitted(String),
    /// An `execution` stream was fully consumed.
    GenerationStreamed,
    /// The recipe was handed to the executor.
    ExecutionStarted,
    /// The executor reported back.
    ExecutionFinished(ExecutionResult),
    /// User wants another generation round after a failure.
    RegenerationRequested(String),
    /// User accepted the failure.
    RegenerationDeclined,
    /// The service accepted the regeneration request, possibly reassigning the id.
    Regenerated { id: Option<String> },
    /// User wants the recipe saved under `name`.
    SaveRequested { name: String },
    /// User chose to exit without saving.
    SaveDeclined,
}
