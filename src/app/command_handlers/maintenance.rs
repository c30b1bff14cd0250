use crate::app::command_support::{load_settings, to_json, CommandOptions};
use crate::engine::engine_from_settings;
use crate::runtime::{bootstrap_runs_root, check_health, RetentionSweeper, RunsPaths};

pub fn cmd_sweep(options: &CommandOptions) -> Result<String, String> {
    options.expect_no_positional("sweep")?;
    let settings = load_settings(options)?;
    bootstrap_runs_root(&RunsPaths::new(settings.runs_dir.clone())).map_err(|e| e.to_string())?;
    let outcome = RetentionSweeper::from_settings(&settings)
        .sweep()
        .map_err(|e| e.to_string())?;
    to_json(&outcome)
}

/// Reports without starting the service, so a missing template shows up
/// here instead of aborting.
pub fn cmd_health(options: &CommandOptions) -> Result<String, String> {
    options.expect_no_positional("health")?;
    let settings = load_settings(options)?;
    let engine = engine_from_settings(&settings);
    let report = check_health(&settings, engine.as_ref());
    to_json(&report)
}
