use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use msrsync_client::Cadence;

/// Extended help shown after `msrsync update --help`.
pub const UPDATE_AFTER_HELP: &str = "\
How an update works:
  1. The newest report before the target period is carried forward
     (or the family's blank template when none exists).
  2. The period's column is located by its header label.
  3. Hours are mapped to rows through the configured mappings and written,
     copying each row's style from the previous period's column.
  4. The result is saved as the period's report under `completed/`.

Period labels:
  Months: Jan-26, January 2026, 2026-01
  Weeks:  2026-01-12 (any day of the week), Jan 12-16, 2026, 2026-W03

Hours input:
  CSV  timesheet export with fname, lname, hours, jobcode_1, jobcode_2
       and optionally local_date (rows outside the period are ignored)
  JSON { \"Entity Name\": { \"Charge Code\": 12.5 } }, optionally keyed by period
       label first, e.g. { \"Jan-26\": { ... } }

Batch runs (--from/--to) process periods oldest first and stop at the first
failure; they need dated hours.
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CadenceArg {
    Monthly,
    Weekly,
}

impl From<CadenceArg> for Cadence {
    fn from(value: CadenceArg) -> Self {
        match value {
            CadenceArg::Monthly => Cadence::Monthly,
            CadenceArg::Weekly => Cadence::Weekly,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "msrsync",
    version,
    about = "keeps MSR/WSR report chains in sync with timesheet hours",
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write a period's hours into a family's report chain
    #[command(after_long_help = UPDATE_AFTER_HELP, arg_required_else_help = true)]
    Update {
        /// Report family (e.g. TO1, WSR)
        family: String,
        /// Target period (omit when using --from/--to)
        #[arg(conflicts_with_all = ["from", "to"])]
        period: Option<String>,
        /// First period of a batch
        #[arg(long, requires = "to")]
        from: Option<String>,
        /// Last period of a batch
        #[arg(long, requires = "from")]
        to: Option<String>,
        /// Timesheet CSV export or JSON hours document
        #[arg(long, value_name = "PATH")]
        hours: PathBuf,
        /// Resolve and compute everything without writing reports
        #[arg(long)]
        dry_run: bool,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Write one month's hours into every monthly family
    #[command(arg_required_else_help = true)]
    UpdateAll {
        /// Target month (e.g. Jan-26)
        period: String,
        /// Timesheet CSV export or JSON hours document
        #[arg(long, value_name = "PATH")]
        hours: PathBuf,
        /// Resolve and compute everything without writing reports
        #[arg(long)]
        dry_run: bool,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Roll a weekly family's actual hours up into a month
    #[command(arg_required_else_help = true)]
    Rollup {
        /// Weekly report family with a rollup section
        family: String,
        /// Month to roll up (e.g. Jan-26)
        month: String,
        /// Write invoice line items to this JSON file
        #[arg(long, value_name = "PATH")]
        export: Option<PathBuf>,
        /// Compute the rollup without storing or exporting it
        #[arg(long)]
        dry_run: bool,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Inspect and finalize stored report instances
    #[command(arg_required_else_help = true)]
    Reports {
        #[command(subcommand)]
        command: ReportsCommand,
    },
    /// Show how a period label normalizes
    Period {
        /// Any supported month or week label
        text: String,
        /// Read bare dates as months or weeks (default: weeks)
        #[arg(long, value_enum)]
        cadence: Option<CadenceArg>,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ReportsCommand {
    /// List a family's stored reports, newest first
    List {
        family: String,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Mark a draft report completed so it can no longer change
    Archive {
        family: String,
        period: String,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
pub fn parse_from<I, T>(itr: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(itr)
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::{CadenceArg, Commands, ReportsCommand, parse_from};

    #[test]
    fn parse_single_period_update() {
        let parsed = parse_from([
            "msrsync",
            "update",
            "TO1",
            "Jan-26",
            "--hours",
            "export.csv",
            "--dry-run",
            "--json",
        ]);
        assert!(parsed.is_ok());
        if let Ok(cli) = parsed {
            assert!(matches!(
                cli.command,
                Commands::Update {
                    period: Some(_),
                    from: None,
                    dry_run: true,
                    json: true,
                    ..
                }
            ));
        }
    }

    #[test]
    fn parse_batch_update_requires_both_bounds() {
        let batch = parse_from([
            "msrsync", "update", "WSR", "--from", "2026-01-05", "--to", "2026-01-26", "--hours",
            "hours.json",
        ]);
        assert!(batch.is_ok());

        let half = parse_from(["msrsync", "update", "WSR", "--from", "2026-01-05", "--hours", "h.json"]);
        assert!(half.is_err());

        let mixed = parse_from([
            "msrsync", "update", "WSR", "2026-01-12", "--from", "2026-01-05", "--to", "2026-01-26",
            "--hours", "h.json",
        ]);
        assert!(mixed.is_err());
    }

    #[test]
    fn update_without_hours_is_rejected() {
        let parsed = parse_from(["msrsync", "update", "TO1", "Jan-26"]);
        assert!(parsed.is_err());
        if let Err(err) = parsed {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn parse_update_all_for_one_month() {
        let parsed = parse_from([
            "msrsync", "update-all", "Jan-26", "--hours", "export.csv", "--dry-run",
        ]);
        assert!(parsed.is_ok());
        if let Ok(cli) = parsed {
            assert!(matches!(
                cli.command,
                Commands::UpdateAll {
                    dry_run: true,
                    json: false,
                    ..
                }
            ));
        }

        let missing_hours = parse_from(["msrsync", "update-all", "Jan-26"]);
        assert!(missing_hours.is_err());
    }

    #[test]
    fn parse_rollup_with_export() {
        let parsed = parse_from([
            "msrsync", "rollup", "WSR", "Jan-26", "--export", "invoice.json",
        ]);
        assert!(parsed.is_ok());
        if let Ok(cli) = parsed {
            assert!(matches!(cli.command, Commands::Rollup { export: Some(_), json: false, .. }));
        }
    }

    #[test]
    fn parse_reports_subcommands() {
        let list = parse_from(["msrsync", "reports", "list", "TO1", "--json"]);
        assert!(list.is_ok());
        if let Ok(cli) = list {
            assert!(matches!(
                cli.command,
                Commands::Reports {
                    command: ReportsCommand::List { json: true, .. },
                }
            ));
        }

        let archive = parse_from(["msrsync", "reports", "archive", "TO1", "Dec-25"]);
        assert!(archive.is_ok());
    }

    #[test]
    fn parse_period_cadence_flag() {
        let parsed = parse_from(["msrsync", "period", "2026-01-14", "--cadence", "monthly"]);
        assert!(parsed.is_ok());
        if let Ok(cli) = parsed {
            assert!(matches!(
                cli.command,
                Commands::Period {
                    cadence: Some(CadenceArg::Monthly),
                    ..
                }
            ));
        }
    }

    #[test]
    fn bare_reports_shows_help() {
        let parsed = parse_from(["msrsync", "reports"]);
        assert!(parsed.is_err());
        if let Err(err) = parsed {
            assert_eq!(
                err.kind(),
                ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            );
        }
    }

    #[test]
    fn help_command_is_rejected() {
        let parsed = parse_from(["msrsync", "help"]);
        assert!(parsed.is_err());
    }
}
