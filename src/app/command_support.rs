use crate::config::{self, Settings};
use crate::orchestration::{RunInputs, RunOrchestrator};
use crate::runtime::start_service;
use crate::shared::init_logging;
use serde::Serialize;
use std::path::PathBuf;

/// Flags shared by every verb, plus the positional arguments left over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOptions {
    pub config: Option<PathBuf>,
    pub run_id: Option<String>,
    pub prompt: Option<String>,
    pub negative: Option<String>,
    pub seed: Option<u64>,
    pub logo: Option<String>,
    pub mood: Option<String>,
    pub positional: Vec<String>,
}

impl CommandOptions {
    /// Builds run inputs from the flags. `None` when no prompt was given.
    pub fn inputs(&self) -> Option<RunInputs> {
        let prompt = self.prompt.as_ref()?;
        let mut inputs = RunInputs::new(prompt.clone());
        inputs.negative_prompt = self.negative.clone();
        inputs.seed = self.seed;
        inputs.logo_image = self.logo.clone();
        inputs.mood_image = self.mood.clone();
        Some(inputs)
    }

    pub fn require_inputs(&self) -> Result<RunInputs, String> {
        self.inputs()
            .ok_or_else(|| "missing required flag --prompt".to_string())
    }

    pub fn single_run_id(&self, usage: &str) -> Result<&str, String> {
        match self.positional.as_slice() {
            [run_id] => Ok(run_id.as_str()),
            _ => Err(format!("usage: {usage}")),
        }
    }

    pub fn expect_no_positional(&self, usage: &str) -> Result<(), String> {
        if self.positional.is_empty() {
            Ok(())
        } else {
            Err(format!("usage: {usage}"))
        }
    }
}

pub fn parse_command_options(args: &[String]) -> Result<CommandOptions, String> {
    let mut options = CommandOptions::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("missing value for {flag}"))
        };
        match arg.as_str() {
            "--config" => options.config = Some(PathBuf::from(value("--config")?)),
            "--id" => options.run_id = Some(value("--id")?),
            "--prompt" => options.prompt = Some(value("--prompt")?),
            "--negative" => options.negative = Some(value("--negative")?),
            "--seed" => {
                let raw = value("--seed")?;
                let seed = raw
                    .parse::<u64>()
                    .map_err(|_| format!("invalid --seed `{raw}`: expected an unsigned integer"))?;
                options.seed = Some(seed);
            }
            "--logo" => options.logo = Some(value("--logo")?),
            "--mood" => options.mood = Some(value("--mood")?),
            flag if flag.starts_with("--") => return Err(format!("unknown flag `{flag}`")),
            _ => options.positional.push(arg.clone()),
        }
    }
    Ok(options)
}

/// Loads and validates settings, then installs logging with the configured
/// filter.
pub fn load_settings(options: &CommandOptions) -> Result<Settings, String> {
    let settings = config::load_settings(options.config.as_deref()).map_err(|e| e.to_string())?;
    init_logging(&settings.log_filter);
    Ok(settings)
}

/// Full service startup for the run verbs, including the retention sweep.
pub fn open_orchestrator(settings: &Settings) -> Result<RunOrchestrator, String> {
    start_service(settings).map_err(|e| e.to_string())
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("failed to encode output: {e}"))
}
