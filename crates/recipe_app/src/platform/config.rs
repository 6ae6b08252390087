use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;
use recipe_core::Language;
use recipe_engine::ServiceSettings;
use recipe_logging::{LogDestination, LOG_FILENAME};

pub const ENV_ENDPOINT: &str = "RECIPE_ENDPOINT";
pub const ENV_USER_ID: &str = "RECIPE_USER_ID";
pub const ENV_WORKDIR: &str = "RECIPE_WORKDIR";
pub const ENV_APPLY_COMMAND: &str = "RECIPE_APPLY_COMMAND";
pub const ENV_EDITOR: &str = "EDITOR";

const DEFAULT_WORKDIR: &str = "./recipe-output";
const DEFAULT_APPLY_COMMAND: &str = "terraform init && terraform apply";
const DEFAULT_EDITOR: &str = "vim";

/// Turn a natural-language request into an applied recipe.
#[derive(Debug, Parser)]
#[command(name = "recipe", version)]
pub struct Cli {
    /// What to build. Leave empty to pick one of your saved recipes.
    pub prompt: Vec<String>,

    /// Target language of the generated files.
    #[arg(long, short, default_value = "terraform")]
    pub language: Language,

    /// Log debug output to stderr.
    #[arg(long, short)]
    pub verbose: bool,

    /// Also write the log to ./recipe.log.
    #[arg(long)]
    pub log_file: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` means browse saved recipes.
    pub prompt: Option<String>,
    pub language: Language,
    pub service: ServiceSettings,
    pub workdir: PathBuf,
    pub apply_command: String,
    pub editor: String,
    pub log_level: LevelFilter,
    pub log_destination: LogDestination,
}

impl AppConfig {
    pub fn from_cli(cli: Cli) -> Self {
        Self::resolve(cli, |key| std::env::var(key).ok())
    }

    /// Layers CLI flags over values read through `lookup`. Blank values count as unset.
    pub fn resolve(cli: Cli, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let prompt = cli.prompt.join(" ").trim().to_string();
        let mut service = ServiceSettings::default();
        if let Some(endpoint) = env(ENV_ENDPOINT) {
            service.endpoint = endpoint;
        }
        if let Some(user_id) = env(ENV_USER_ID) {
            service.user_id = user_id;
        }

        let log_level = if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        };
        let log_destination = if cli.log_file {
            LogDestination::Both(PathBuf::from(".").join(LOG_FILENAME))
        } else {
            LogDestination::Terminal
        };

        Self {
            prompt: (!prompt.is_empty()).then_some(prompt),
            language: cli.language,
            service,
            workdir: env(ENV_WORKDIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKDIR)),
            apply_command: env(ENV_APPLY_COMMAND).unwrap_or_else(|| DEFAULT_APPLY_COMMAND.into()),
            editor: env(ENV_EDITOR).unwrap_or_else(|| DEFAULT_EDITOR.into()),
            log_level,
            log_destination,
        }
    }
}
