use crate::{AppState, Effect, Msg, OutlineAction, Phase};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages that do not apply to the current phase leave the state untouched
/// and produce no effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match (state.phase(), msg) {
        (Phase::Empty, Msg::PromptSubmitted { prompt, language }) => {
            let prompt = prompt.trim().to_string();
            if prompt.is_empty() {
                return (state, Vec::new());
            }
            state.start_fresh(prompt, language, true);
            state.set_phase(Phase::Outlining);
            vec![Effect::StreamInit { recipe_id: None }]
        }
        (Phase::Empty, Msg::BrowseRequested) => vec![Effect::PickSavedRecipe],
        (Phase::Empty, Msg::SavedRecipeSelected(summary)) => {
            let language = summary.language();
            state.start_fresh(summary.prompt, language, false);
            state.recipe_mut().set_id(summary.id.clone());
            state.set_phase(Phase::Outlining);
            vec![Effect::StreamInit {
                recipe_id: Some(summary.id),
            }]
        }
        (Phase::Empty, Msg::BrowseAbandoned) => {
            state.set_phase(Phase::Closed);
            Vec::new()
        }
        (Phase::Outlining | Phase::Clarifying, Msg::OutlineStreamed) => {
            state.set_phase(Phase::Outlined);
            state.remember_outline();
            vec![Effect::ChooseOutlineAction]
        }
        (Phase::Outlined, Msg::OutlineActionChosen(action)) => match action {
            OutlineAction::EditSteps => vec![Effect::EditSteps {
                text: state.recipe().steps_text(),
            }],
            OutlineAction::Clarify => vec![Effect::AskClarification],
            OutlineAction::Continue => {
                let mut effects = Vec::with_capacity(2);
                if state.outline_changed() {
                    effects.push(Effect::PersistSteps {
                        steps: state.recipe().steps.clone(),
                    });
                }
                state.begin_generation();
                effects.push(Effect::StreamExecution);
                effects
            }
        },
        (Phase::Outlined, Msg::StepsEdited(text)) => {
            state.recipe_mut().replace_steps_from_text(&text);
            vec![Effect::PrintSteps, Effect::ChooseOutlineAction]
        }
        (Phase::Outlined, Msg::ClarificationSubmitted(clarification)) => {
            let clarification = clarification.trim().to_string();
            if clarification.is_empty() {
                return (state, vec![Effect::ChooseOutlineAction]);
            }
            state.recipe_mut().begin_outline();
            state.set_phase(Phase::Clarifying);
            vec![Effect::StreamClarify { clarification }]
        }
        (Phase::Generating, Msg::GenerationStreamed) => {
            state.set_phase(Phase::Generated);
            vec![Effect::Execute]
        }
        (Phase::Generated, Msg::ExecutionStarted) => {
            state.set_phase(Phase::Executing);
            vec![Effect::ApplyRecipe]
        }
        (Phase::Executing, Msg::ExecutionFinished(result)) => {
            let success = result.success;
            let diagnostic = result.diagnostic.clone();
            state.record_result(result);
            if success {
                finish_execution(&mut state)
            } else {
                vec![Effect::OfferRegeneration { diagnostic }]
            }
        }
        (Phase::Executing, Msg::RegenerationRequested(clarification)) => {
            let clarification = clarification.trim().to_string();
            if clarification.is_empty() {
                finish_execution(&mut state)
            } else {
                state.set_phase(Phase::Regenerating);
                vec![Effect::Regenerate { clarification }]
            }
        }
        (Phase::Executing, Msg::RegenerationDeclined) => finish_execution(&mut state),
        (Phase::Regenerating, Msg::Regenerated { id }) => {
            if let Some(id) = id {
                state.recipe_mut().set_id(id);
            }
            state.count_regeneration();
            state.begin_generation();
            vec![Effect::StreamExecution]
        }
        (Phase::Executed, Msg::SaveRequested { name }) => {
            if !state.offers_save() {
                return (state, Vec::new());
            }
            state.set_phase(Phase::Saved);
            vec![Effect::SaveRecipe { name }]
        }
        (Phase::Executed, Msg::SaveDeclined) => {
            state.set_phase(Phase::Closed);
            Vec::new()
        }
        _ => Vec::new(),
    };

    (state, effects)
}

fn finish_execution(state: &mut AppState) -> Vec<Effect> {
    state.set_phase(Phase::Executed);
    if state.offers_save() {
        vec![Effect::OfferSave]
    } else {
        Vec::new()
    }
}
