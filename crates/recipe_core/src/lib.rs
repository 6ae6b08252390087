//! Recipe core: data model and the pure lifecycle state machine.
mod effect;
mod msg;
mod recipe;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::{Msg, OutlineAction};
pub use recipe::{
    ExecutionResult, ExecutionUnit, Language, Parameter, ParseLanguageError, Recipe, RecipeSummary,
};
pub use state::{AppState, Phase};
pub use update::update;
pub use view_model::RecipeView;
