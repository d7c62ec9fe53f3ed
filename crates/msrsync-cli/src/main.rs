mod cli;
mod dispatch;
mod output;
mod stdout_io;

use std::process::ExitCode;

use clap::{Parser, error::ErrorKind};
use msrsync_client::ClientError;
use stdout_io::write_stdout_block;
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "MSRSYNC_LOG";
const DEFAULT_LOG_FILTER: &str = "msrsync_client=warn";

const ROOT_HELP: &str = "msrsync - keep MSR and WSR ledgers current from timesheet hours

Usage:
  msrsync <command>

Start here:
  msrsync period Jan-26
  msrsync update --help
  msrsync reports list <family>
";

const TOP_LEVEL_HELP: &str = "msrsync - keep MSR and WSR ledgers current from timesheet hours

USAGE: msrsync <command>

Check how a period label is read:
  msrsync period \"January 2026\"                      Show the canonical key and accepted labels
  msrsync period 2026-01-14 --cadence weekly          Show the work week a date falls in

Write actual hours into a report:
  1. msrsync update <family> <period> --hours <file> --dry-run
                                                      Resolve and plan without writing
  2. msrsync update <family> <period> --hours <file>  Carry forward and write actuals
     msrsync update <family> --from <p> --to <p> --hours <file>
                                                      Catch up several periods, oldest first
     msrsync update-all <month> --hours <file>        Write the month into every monthly family

Close out a month of weekly reports:
  msrsync rollup <family> <month>                     Total actual hours and cost per entity
  msrsync rollup <family> <month> --export <file>     Also publish invoice line items

Manage stored reports:
  msrsync reports list <family>                       Show stored instances, newest first
  msrsync reports archive <family> <period>           Mark an instance completed

Every command accepts --json for machine-readable output.
Set MSRSYNC_HOME to use a workspace other than ~/Documents/MSRs,
and MSRSYNC_LOG (for example `msrsync_client=debug`) for diagnostics on stderr.
";

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(code) => code,
        Err(code) => code,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<ExitCode, ExitCode> {
    let raw_args = std::env::args().collect::<Vec<String>>();
    if raw_args.len() == 1 {
        if write_stdout_block(ROOT_HELP).is_err() {
            return Err(ExitCode::from(2));
        }
        return Ok(ExitCode::SUCCESS);
    }
    let parsed = cli::Cli::try_parse();
    let cli = match parsed {
        Ok(value) => value,
        Err(err) => {
            if matches!(
                err.kind(),
                ErrorKind::DisplayHelp
                    | ErrorKind::DisplayVersion
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) {
                let body = if is_top_level_help_request(&raw_args) {
                    TOP_LEVEL_HELP.to_string()
                } else {
                    err.to_string()
                };
                if write_stdout_block(&body).is_err() {
                    return Err(ExitCode::from(2));
                }
                return Ok(ExitCode::SUCCESS);
            }
            let command_hint = if matches!(
                err.kind(),
                ErrorKind::MissingRequiredArgument
                    | ErrorKind::InvalidValue
                    | ErrorKind::ValueValidation
                    | ErrorKind::WrongNumberOfValues
                    | ErrorKind::UnknownArgument
                    | ErrorKind::InvalidSubcommand
                    | ErrorKind::ArgumentConflict
            ) {
                command_path_from_args(&raw_args)
            } else {
                None
            };
            let clean_message = strip_clap_boilerplate(&err.to_string());
            let parse_error =
                parse_error_with_command_hint(&clean_message, command_hint.as_deref());
            let mode = infer_requested_output_mode(&raw_args);
            if output::print_failure(&parse_error, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            return Err(ExitCode::from(1));
        }
    };
    let mode = output::mode_for_command(&cli.command);

    match dispatch::dispatch(&cli) {
        Ok(success) => {
            if output::print_success(&success, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            if output::print_failure(&error, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Err(exit_code_for_error(&error))
        }
    }
}

fn is_top_level_help_request(raw_args: &[String]) -> bool {
    raw_args.len() == 2 && matches!(raw_args[1].as_str(), "--help" | "-h")
}

/// Strips clap's trailing boilerplate (Usage line, "For more information" hint)
/// so the "What to do next" section is the single source of guidance.
fn strip_clap_boilerplate(message: &str) -> String {
    let trimmed = if let Some(pos) = message.find("\n\nUsage:") {
        &message[..pos]
    } else if let Some(pos) = message.find("\nFor more information") {
        &message[..pos]
    } else {
        message
    };
    trimmed.trim_end().to_string()
}

/// Builds the subcommand path from raw CLI args for use in help hints.
fn command_path_from_args(raw_args: &[String]) -> Option<String> {
    let non_flags: Vec<&str> = raw_args
        .iter()
        .skip(1)
        .filter(|value| !value.starts_with('-'))
        .map(String::as_str)
        .collect();

    let hint = match non_flags.as_slice() {
        ["update", ..] => Some("update"),
        ["update-all", ..] => Some("update-all"),
        ["rollup", ..] => Some("rollup"),
        ["reports", "list", ..] => Some("reports list"),
        ["reports", "archive", ..] => Some("reports archive"),
        ["reports", ..] => Some("reports"),
        ["period", ..] => Some("period"),
        _ => None,
    };
    hint.map(std::string::ToString::to_string)
}

fn parse_error_with_command_hint(clean_message: &str, command_hint: Option<&str>) -> ClientError {
    if command_hint == Some("update") && clean_message.contains("cannot be used with") {
        return ClientError::invalid_argument_with_recovery(
            "Give either one period or a --from/--to range, not both.",
            vec![
                "Single period: `msrsync update <family> Jan-26 --hours <file>`.".to_string(),
                "Range: `msrsync update <family> --from Nov-25 --to Jan-26 --hours <file>`."
                    .to_string(),
            ],
        );
    }

    ClientError::invalid_argument_for_command(clean_message, command_hint)
}

fn exit_code_for_error(error: &ClientError) -> ExitCode {
    if is_internal_error(error) {
        ExitCode::from(2)
    } else {
        ExitCode::from(1)
    }
}

fn infer_requested_output_mode(raw_args: &[String]) -> output::OutputMode {
    if raw_args.iter().skip(1).any(|value| value == "--json") {
        return output::OutputMode::Json;
    }
    output::OutputMode::Text
}

fn is_internal_error(error: &ClientError) -> bool {
    error.code.starts_with("internal_")
        || matches!(
            error.code.as_str(),
            "workspace_permission_denied" | "workspace_init_failed" | "report_corrupt"
        )
}

#[cfg(test)]
mod tests {
    use msrsync_client::ClientError;

    use super::{
        command_path_from_args, is_internal_error, parse_error_with_command_hint,
        strip_clap_boilerplate,
    };

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn command_path_skips_flags_and_positionals() {
        assert_eq!(
            command_path_from_args(&args(&["msrsync", "reports", "list", "TO1", "--json"])),
            Some("reports list".to_string())
        );
        assert_eq!(
            command_path_from_args(&args(&["msrsync", "--json", "update", "TO1"])),
            Some("update".to_string())
        );
        assert_eq!(command_path_from_args(&args(&["msrsync", "bogus"])), None);
    }

    #[test]
    fn clap_usage_tail_is_removed() {
        let message = "error: unexpected argument '--nope' found\n\nUsage: msrsync update";
        assert_eq!(
            strip_clap_boilerplate(message),
            "error: unexpected argument '--nope' found"
        );
    }

    #[test]
    fn period_and_range_conflict_gets_targeted_recovery() {
        let error = parse_error_with_command_hint(
            "error: the argument '[PERIOD]' cannot be used with '--from <FROM>'",
            Some("update"),
        );
        assert_eq!(error.code, "invalid_argument");
        assert!(error.recovery_steps.iter().any(|step| step.contains("--from")));
    }

    #[test]
    fn workspace_failures_are_internal() {
        assert!(is_internal_error(&ClientError::internal_serialization("boom")));
        assert!(!is_internal_error(&ClientError::unknown_family("TO9")));
    }
}
