use crate::app::cli::{help_text, parse_cli_verb, CliVerb};
use crate::app::command_support::parse_command_options;

pub mod maintenance;
pub mod runs;

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    if args.is_empty() {
        return Ok(help_text());
    }

    let verb = parse_cli_verb(args[0].as_str());
    if verb == CliVerb::Unknown {
        return Err(format!("unknown command `{}`", args[0]));
    }
    if verb == CliVerb::Help {
        return Ok(help_text());
    }

    let options = parse_command_options(&args[1..])?;
    match verb {
        CliVerb::Create => runs::cmd_create(&options),
        CliVerb::Start => runs::cmd_start(&options),
        CliVerb::Generate => runs::cmd_generate(&options),
        CliVerb::Finalize => runs::cmd_finalize(&options),
        CliVerb::Cancel => runs::cmd_cancel(&options),
        CliVerb::List => runs::cmd_list(&options),
        CliVerb::Get => runs::cmd_get(&options),
        CliVerb::Delete => runs::cmd_delete(&options),
        CliVerb::Archive => runs::cmd_archive(&options),
        CliVerb::Sweep => maintenance::cmd_sweep(&options),
        CliVerb::Health => maintenance::cmd_health(&options),
        CliVerb::Help | CliVerb::Unknown => Ok(help_text()),
    }
}
