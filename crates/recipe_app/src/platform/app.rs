use std::collections::VecDeque;
use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use crossterm::{cursor, execute};
use recipe_core::{update, AppState, Msg};
use recipe_engine::{
    CancellationToken, Console, HttpRecipeService, RecipeService, ServiceError, WorkdirExecutor,
};
use recipe_logging::{recipe_debug, recipe_error};

use super::config::{AppConfig, Cli};
use super::coordinator::ExecutionCoordinator;
use super::effects::EffectRunner;
use super::prompts::{DialoguerPrompter, ExternalEditor, PromptError};

const INTERRUPTED: u8 = 130;

pub fn run_app() -> ExitCode {
    let config = AppConfig::from_cli(Cli::parse());
    recipe_logging::initialize(config.log_destination.clone(), config.log_level);

    match run(config) {
        Ok(state) => {
            recipe_debug!("finished in {:?}", state.phase());
            ExitCode::SUCCESS
        }
        Err(err) if is_cancellation(&err) => {
            recipe_debug!("interrupted: {:#}", err);
            restore_cursor();
            ExitCode::from(INTERRUPTED)
        }
        Err(err) => {
            recipe_error!("{:?}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: AppConfig) -> anyhow::Result<AppState> {
    let cancel = CancellationToken::new();
    install_interrupt_handler(&cancel)?;

    let console = Console::stdout();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting the async runtime")?;
    let service: Arc<dyn RecipeService> =
        Arc::new(HttpRecipeService::new(config.service.clone(), &cancel)?);
    let executor = WorkdirExecutor::new(
        config.workdir.clone(),
        config.apply_command.clone(),
        console.clone(),
    );
    let coordinator = ExecutionCoordinator::new(Box::new(executor), service.clone(), console.clone());
    let mut runner = EffectRunner::new(
        runtime,
        service,
        coordinator,
        Box::new(DialoguerPrompter),
        Box::new(ExternalEditor::new(config.editor.clone())),
        console,
        cancel,
    );

    let first = match config.prompt {
        Some(prompt) => Msg::PromptSubmitted {
            prompt,
            language: config.language,
        },
        None => Msg::BrowseRequested,
    };
    drive(AppState::new(), first, &mut runner)
}

/// Feeds messages through `update` and performs the effects until the inbox is empty.
fn drive(mut state: AppState, first: Msg, runner: &mut EffectRunner) -> anyhow::Result<AppState> {
    let mut inbox = VecDeque::from([first]);
    while let Some(msg) = inbox.pop_front() {
        let (next, effects) = update(state, msg);
        state = next;
        for effect in effects {
            inbox.extend(runner.perform(effect, &mut state)?);
        }
    }
    if !state.is_terminal() {
        bail!("lifecycle stalled in {:?}", state.phase());
    }
    Ok(state)
}

/// First Ctrl-C cancels the token; a second one exits on the spot.
fn install_interrupt_handler(cancel: &CancellationToken) -> anyhow::Result<()> {
    let cancel = cancel.clone();
    ctrlc::set_handler(move || {
        if cancel.is_cancelled() {
            restore_cursor();
            std::process::exit(i32::from(INTERRUPTED));
        }
        recipe_debug!("interrupt received, cancelling");
        cancel.cancel();
    })
    .context("installing the interrupt handler")
}

fn is_cancellation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<ServiceError>()
            .is_some_and(ServiceError::is_cancelled)
            || matches!(
                cause.downcast_ref::<PromptError>(),
                Some(PromptError::Interrupted)
            )
    })
}

fn restore_cursor() {
    let _ = execute!(io::stdout(), cursor::Show);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use recipe_core::{ExecutionResult, Language, Phase, RecipeSummary};
    use recipe_engine::CapturedOutput;

    use super::*;
    use crate::platform::fakes::{Answer, FakeExecutor, FakeService, ScriptedEditor, ScriptedPrompter};

    const OUTLINE: [&str; 4] = [
        r#"{"id":"abc"}"#,
        r#"{"step":"step1"}"#,
        r#"{"step":""}"#,
        r#"{"step":"step2"}"#,
    ];
    const GENERATED: [&str; 3] = [
        r#"{"files":["main.tf"]}"#,
        r#"{"execution":{"key":"main.tf","content":"resource {}"}}"#,
        r#"{"parameter":{"name":"region"}}"#,
    ];

    fn runner(
        service: &Arc<FakeService>,
        executor: FakeExecutor,
        answers: Vec<Answer>,
        editor: ScriptedEditor,
    ) -> (EffectRunner, CapturedOutput) {
        let (console, out) = Console::capture();
        let service: Arc<dyn RecipeService> = service.clone();
        let coordinator =
            ExecutionCoordinator::new(Box::new(executor), service.clone(), console.clone());
        let runner = EffectRunner::new(
            tokio::runtime::Runtime::new().unwrap(),
            service,
            coordinator,
            Box::new(ScriptedPrompter::new(answers)),
            Box::new(editor),
            console,
            CancellationToken::new(),
        );
        (runner, out)
    }

    fn prompt(text: &str) -> Msg {
        Msg::PromptSubmitted {
            prompt: text.to_string(),
            language: Language::Terraform,
        }
    }

    #[test]
    fn edited_outline_is_persisted_then_generated_executed_and_saved() {
        let service = Arc::new(FakeService::default());
        service.push_init(&OUTLINE);
        service.push_execution(&GENERATED);
        let editor = ScriptedEditor::new(vec!["stepA\n\nstepB\n"]);
        let seen = editor.seen();
        let (mut runner, out) = runner(
            &service,
            FakeExecutor::new(vec![ExecutionResult::succeeded("")]),
            vec![
                Answer::Pick(0),
                Answer::Pick(2),
                Answer::Pick(0),
                Answer::Text(String::new()),
                Answer::Text("bucket".into()),
            ],
            editor,
        );

        let state = drive(AppState::new(), prompt("make a bucket"), &mut runner).unwrap();

        assert_eq!(state.phase(), Phase::Saved);
        assert_eq!(*seen.lock().unwrap(), vec!["step1\nstep2".to_string()]);
        assert_eq!(state.recipe().steps, vec!["stepA", "stepB"]);
        assert_eq!(
            service.calls(),
            vec![
                "init -",
                "steps stepA|stepB",
                "execution abc",
                "save abc bucket units=1",
            ]
        );
        let lines = out.text_lines();
        assert!(lines.iter().any(|line| line.starts_with("Based on your requirements,")));
        assert!(lines.contains(&"1. stepA".to_string()));
        assert!(lines.contains(&"2. stepB".to_string()));
    }

    #[test]
    fn continuing_without_edits_skips_persistence() {
        let service = Arc::new(FakeService::default());
        service.push_init(&OUTLINE);
        service.push_execution(&GENERATED);
        let (mut runner, _out) = runner(
            &service,
            FakeExecutor::new(vec![ExecutionResult::succeeded("")]),
            vec![Answer::Pick(2), Answer::Pick(1)],
            ScriptedEditor::new(Vec::new()),
        );

        let state = drive(AppState::new(), prompt("make a bucket"), &mut runner).unwrap();

        assert_eq!(state.phase(), Phase::Closed);
        assert_eq!(service.calls(), vec!["init -", "execution abc"]);
        assert_eq!(state.recipe().parameters.len(), 1);
    }

    #[test]
    fn clarified_outline_is_persisted() {
        let service = Arc::new(FakeService::default());
        service.push_init(&OUTLINE);
        service.push_clarify(&[r#"{"step":"use eu-west-1"}"#]);
        service.push_execution(&GENERATED);
        let (mut runner, out) = runner(
            &service,
            FakeExecutor::new(vec![ExecutionResult::succeeded("")]),
            vec![
                Answer::Pick(1),
                Answer::Text("in europe".into()),
                Answer::Pick(2),
                Answer::Pick(1),
            ],
            ScriptedEditor::new(Vec::new()),
        );

        drive(AppState::new(), prompt("make a bucket"), &mut runner).unwrap();

        assert_eq!(
            service.calls(),
            vec![
                "init -",
                "clarify in europe",
                "steps use eu-west-1",
                "execution abc",
            ]
        );
        assert!(out
            .text_lines()
            .iter()
            .any(|line| line.starts_with("Based on your requirements & extra details")));
    }

    #[test]
    fn repeated_failures_regenerate_without_a_cap() {
        const ROUNDS: usize = 12;
        let service = Arc::new(FakeService::default());
        service.push_init(&OUTLINE);
        for _ in 0..=ROUNDS {
            service.push_execution(&GENERATED);
        }
        let mut results: Vec<ExecutionResult> = (0..ROUNDS)
            .map(|round| ExecutionResult::failed(format!("failure {round}")))
            .collect();
        results.push(ExecutionResult::succeeded(""));
        let executor = FakeExecutor::new(results);
        let applied = executor.applied();

        let mut answers = vec![Answer::Pick(2)];
        for round in 0..ROUNDS {
            answers.push(Answer::Pick(0));
            answers.push(Answer::Text(format!("fix {round}")));
        }
        answers.push(Answer::Pick(1));
        let (mut runner, out) = runner(&service, executor, answers, ScriptedEditor::new(Vec::new()));

        let state = drive(AppState::new(), prompt("make a bucket"), &mut runner).unwrap();

        assert_eq!(state.phase(), Phase::Closed);
        assert_eq!(state.view().regenerations, ROUNDS);
        assert_eq!(*applied.lock().unwrap(), vec![1; ROUNDS + 1]);
        let calls = service.calls();
        assert_eq!(calls.iter().filter(|c| c.starts_with("execution")).count(), ROUNDS + 1);
        assert_eq!(calls.iter().filter(|c| c.starts_with("regenerate")).count(), ROUNDS);
        assert!(out.text_lines().contains(&"failure 0".to_string()));
        assert!(state.last_result().is_some_and(|result| result.success));
    }

    #[test]
    fn declined_regeneration_keeps_the_failure() {
        let service = Arc::new(FakeService::default());
        service.push_init(&OUTLINE);
        service.push_execution(&GENERATED);
        let (mut runner, _out) = runner(
            &service,
            FakeExecutor::new(vec![ExecutionResult::failed("provider error")]),
            vec![Answer::Pick(2), Answer::Pick(1), Answer::Pick(1)],
            ScriptedEditor::new(Vec::new()),
        );

        let state = drive(AppState::new(), prompt("make a bucket"), &mut runner).unwrap();

        assert_eq!(state.phase(), Phase::Closed);
        assert_eq!(
            state.last_result(),
            Some(&ExecutionResult::failed("provider error"))
        );
    }

    #[test]
    fn saved_recipe_is_picked_after_going_back_and_never_offered_for_saving() {
        let saved = vec![
            RecipeSummary {
                id: "r1".into(),
                name: "bucket".into(),
                prompt: "make a bucket".into(),
                language: "terraform".into(),
            },
            RecipeSummary {
                id: "r2".into(),
                name: "files".into(),
                prompt: "list files".into(),
                language: "shell".into(),
            },
        ];
        let service = Arc::new(FakeService::default().with_saved(saved));
        service.push_init(&[r#"{"step":"list"}"#]);
        service.push_execution(&GENERATED);
        let (mut runner, out) = runner(
            &service,
            FakeExecutor::new(vec![ExecutionResult::succeeded("")]),
            vec![
                Answer::Pick(0),
                Answer::Back,
                Answer::Pick(1),
                Answer::Pick(0),
                Answer::Pick(2),
            ],
            ScriptedEditor::new(Vec::new()),
        );

        let state = drive(AppState::new(), Msg::BrowseRequested, &mut runner).unwrap();

        assert_eq!(state.phase(), Phase::Executed);
        assert_eq!(state.recipe().language, Language::Shell);
        assert_eq!(service.calls(), vec!["list", "init r2", "execution r2"]);
        let lines = out.text_lines();
        assert!(lines.contains(&"bucket: make a bucket".to_string()));
        assert!(lines.contains(&"files: list files".to_string()));
    }

    #[test]
    fn empty_listing_prints_a_hint_and_closes() {
        let service = Arc::new(FakeService::default());
        let (mut runner, out) = runner(
            &service,
            FakeExecutor::new(Vec::new()),
            Vec::new(),
            ScriptedEditor::new(Vec::new()),
        );

        let state = drive(AppState::new(), Msg::BrowseRequested, &mut runner).unwrap();

        assert_eq!(state.phase(), Phase::Closed);
        assert!(out.text_lines()[0].starts_with("You don't have any saved recipes"));
    }

    #[test]
    fn interrupted_menu_is_a_cancellation() {
        let service = Arc::new(FakeService::default());
        service.push_init(&OUTLINE);
        let (mut runner, _out) = runner(
            &service,
            FakeExecutor::new(Vec::new()),
            Vec::new(),
            ScriptedEditor::new(Vec::new()),
        );

        let err = drive(AppState::new(), prompt("make a bucket"), &mut runner).unwrap_err();

        assert!(is_cancellation(&err));
    }

    #[test]
    fn cancelled_token_stops_before_the_next_effect() {
        let service = Arc::new(FakeService::default());
        let (console, _out) = Console::capture();
        let cancel = CancellationToken::new();
        let shared: Arc<dyn RecipeService> = service.clone();
        let mut runner = EffectRunner::new(
            tokio::runtime::Runtime::new().unwrap(),
            shared.clone(),
            ExecutionCoordinator::new(Box::new(FakeExecutor::new(Vec::new())), shared, console.clone()),
            Box::new(ScriptedPrompter::new(Vec::new())),
            Box::new(ScriptedEditor::new(Vec::new())),
            console,
            cancel.clone(),
        );
        cancel.cancel();

        let err = drive(AppState::new(), prompt("make a bucket"), &mut runner).unwrap_err();

        assert!(is_cancellation(&err));
        assert!(service.calls().is_empty());
    }

    #[test]
    fn other_errors_are_not_cancellations() {
        let err = anyhow::Error::new(ServiceError::Status {
            code: 500,
            body: "boom".into(),
        })
        .context("streaming /recipe/stream/init");
        assert!(!is_cancellation(&err));
    }
}
