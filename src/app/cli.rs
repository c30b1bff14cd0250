#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Create,
    Start,
    Generate,
    Finalize,
    Cancel,
    List,
    Get,
    Delete,
    Archive,
    Sweep,
    Health,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "create" => CliVerb::Create,
        "start" => CliVerb::Start,
        "generate" => CliVerb::Generate,
        "finalize" => CliVerb::Finalize,
        "cancel" => CliVerb::Cancel,
        "list" => CliVerb::List,
        "get" => CliVerb::Get,
        "delete" => CliVerb::Delete,
        "archive" => CliVerb::Archive,
        "sweep" => CliVerb::Sweep,
        "health" => CliVerb::Health,
        "help" | "-h" | "--help" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  create [--id <run_id>] --prompt <text>  Create a PENDING run".to_string(),
        "  start <run_id> [--prompt <text>]        Submit a PENDING run to the engine".to_string(),
        "  generate --prompt <text>                Create and start a run".to_string(),
        "  finalize <run_id>                       Wait for the job and collect artifacts"
            .to_string(),
        "  cancel <run_id>                         Mark a non-terminal run CANCELLED".to_string(),
        "  list                                    List run summaries, newest first".to_string(),
        "  get <run_id>                            Show one run record".to_string(),
        "  delete <run_id>                         Remove a run and its archive".to_string(),
        "  archive <run_id>                        Print the path of a run's archive".to_string(),
        "  sweep                                   Remove runs past the retention window"
            .to_string(),
        "  health                                  Check storage, template and engine".to_string(),
        "  help                                    Show this help".to_string(),
    ]
}

pub fn option_help_lines() -> Vec<String> {
    vec![
        "Options:".to_string(),
        "  --config <path>     Load settings from a YAML file instead of the environment"
            .to_string(),
        "  --prompt <text>     Positive prompt".to_string(),
        "  --negative <text>   Negative prompt".to_string(),
        "  --seed <n>          Sampler seed".to_string(),
        "  --logo <path>       Logo reference image".to_string(),
        "  --mood <path>       Mood reference image".to_string(),
        "  --id <run_id>       Explicit run id for create".to_string(),
    ]
}

pub(crate) fn help_text() -> String {
    let mut lines = cli_help_lines();
    lines.push(String::new());
    lines.extend(option_help_lines());
    lines.join("\n")
}
