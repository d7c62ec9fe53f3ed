use msrsync_client::commands;
use msrsync_client::{ClientResult, SuccessEnvelope};

use crate::cli::{Cli, Commands, ReportsCommand};

pub fn dispatch(cli: &Cli) -> ClientResult<SuccessEnvelope> {
    match &cli.command {
        Commands::Update {
            family,
            period,
            from,
            to,
            hours,
            dry_run,
            json: _,
        } => commands::update::run(
            family,
            period.as_deref(),
            from.as_deref(),
            to.as_deref(),
            hours,
            *dry_run,
        ),
        Commands::UpdateAll {
            period,
            hours,
            dry_run,
            json: _,
        } => commands::update::run_all(period, hours, *dry_run),
        Commands::Rollup {
            family,
            month,
            export,
            dry_run,
            json: _,
        } => commands::rollup::run(family, month, export.as_deref(), *dry_run),
        Commands::Reports { command } => match command {
            ReportsCommand::List { family, .. } => commands::reports::list(family),
            ReportsCommand::Archive { family, period, .. } => {
                commands::reports::archive(family, period)
            }
        },
        Commands::Period { text, cadence, .. } => {
            commands::period::run(text, cadence.map(Into::into))
        }
    }
}
