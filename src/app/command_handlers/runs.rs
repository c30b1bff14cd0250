use crate::app::command_support::{load_settings, open_orchestrator, to_json, CommandOptions};
use crate::orchestration::RunIdInput;
use serde_json::json;

pub fn cmd_create(options: &CommandOptions) -> Result<String, String> {
    options.expect_no_positional("create [--id <run_id>] --prompt <text>")?;
    let inputs = options.require_inputs()?;
    let settings = load_settings(options)?;
    let orchestrator = open_orchestrator(&settings)?;
    let id = RunIdInput::from(options.run_id.clone());
    let run = orchestrator
        .create_with_id(id, inputs)
        .map_err(|e| e.to_string())?;
    to_json(&run)
}

pub fn cmd_start(options: &CommandOptions) -> Result<String, String> {
    let run_id = options.single_run_id("start <run_id> [--prompt <text>]")?;
    let settings = load_settings(options)?;
    let orchestrator = open_orchestrator(&settings)?;
    let inputs = match options.inputs() {
        Some(inputs) => inputs,
        None => orchestrator.get(run_id).map_err(|e| e.to_string())?.inputs,
    };
    let run = orchestrator
        .start(run_id, &inputs)
        .map_err(|e| e.to_string())?;
    to_json(&run)
}

pub fn cmd_generate(options: &CommandOptions) -> Result<String, String> {
    options.expect_no_positional("generate --prompt <text>")?;
    let inputs = options.require_inputs()?;
    let settings = load_settings(options)?;
    let orchestrator = open_orchestrator(&settings)?;
    let run = orchestrator.generate(inputs).map_err(|e| e.to_string())?;
    to_json(&run)
}

pub fn cmd_finalize(options: &CommandOptions) -> Result<String, String> {
    let run_id = options.single_run_id("finalize <run_id>")?;
    let settings = load_settings(options)?;
    let orchestrator = open_orchestrator(&settings)?;
    let run = orchestrator.finalize(run_id).map_err(|e| e.to_string())?;
    to_json(&run)
}

pub fn cmd_cancel(options: &CommandOptions) -> Result<String, String> {
    let run_id = options.single_run_id("cancel <run_id>")?;
    let settings = load_settings(options)?;
    let orchestrator = open_orchestrator(&settings)?;
    let run = orchestrator.cancel(run_id).map_err(|e| e.to_string())?;
    to_json(&run)
}

pub fn cmd_list(options: &CommandOptions) -> Result<String, String> {
    options.expect_no_positional("list")?;
    let settings = load_settings(options)?;
    let orchestrator = open_orchestrator(&settings)?;
    let runs = orchestrator.list().map_err(|e| e.to_string())?;
    to_json(&runs)
}

pub fn cmd_get(options: &CommandOptions) -> Result<String, String> {
    let run_id = options.single_run_id("get <run_id>")?;
    let settings = load_settings(options)?;
    let orchestrator = open_orchestrator(&settings)?;
    let run = orchestrator.get(run_id).map_err(|e| e.to_string())?;
    to_json(&run)
}

pub fn cmd_delete(options: &CommandOptions) -> Result<String, String> {
    let run_id = options.single_run_id("delete <run_id>")?;
    let settings = load_settings(options)?;
    let orchestrator = open_orchestrator(&settings)?;
    orchestrator.delete(run_id).map_err(|e| e.to_string())?;
    to_json(&json!({ "ok": true, "deleted": run_id }))
}

pub fn cmd_archive(options: &CommandOptions) -> Result<String, String> {
    let run_id = options.single_run_id("archive <run_id>")?;
    let settings = load_settings(options)?;
    let orchestrator = open_orchestrator(&settings)?;
    let path = orchestrator.archive(run_id).map_err(|e| e.to_string())?;
    to_json(&json!({ "run_id": run_id, "archive": path.display().to_string() }))
}
