use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::info;

use crate::commands::common::{load_setup, parse_month, timestamp_now};
use crate::contracts::envelope::{SuccessEnvelope, success_with_warnings};
use crate::contracts::types::{RollupData, RunWarning};
use crate::ledger::rollup::{self, INCOMPLETE_WEEKS_CODE, RollupOutcome};
use crate::period::Period;
use crate::report::store::{load_instance, save_instance, scan_chain};
use crate::setup::WorkspaceContext;
use crate::sources::invoice::{InvoiceSink, JsonExportSink};
use crate::sources::retry::with_retries;
use crate::state::FamilyLock;
use crate::{ClientError, ClientResult};

const COMMAND: &str = "rollup";

#[derive(Debug, Default)]
pub struct RollupRunOptions<'a> {
    pub family: String,
    pub month: String,
    pub export_path: Option<PathBuf>,
    pub dry_run: bool,
    pub home_override: Option<&'a Path>,
}

pub fn run(
    family: &str,
    month: &str,
    export_path: Option<&Path>,
    dry_run: bool,
) -> ClientResult<SuccessEnvelope> {
    run_with_options(RollupRunOptions {
        family: family.to_string(),
        month: month.to_string(),
        export_path: export_path.map(Path::to_path_buf),
        dry_run,
        home_override: None,
    })
}

#[doc(hidden)]
pub fn run_with_options(options: RollupRunOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let setup = load_setup(options.home_override)?;
    let mut sink = options.export_path.as_deref().map(JsonExportSink::new);
    execute(
        &setup,
        &options,
        sink.as_mut().map(|value| value as &mut dyn InvoiceSink),
    )
}

/// Runs a rollup that publishes to any invoicing collaborator.
#[doc(hidden)]
pub fn run_with_sink(
    options: RollupRunOptions<'_>,
    sink: &mut dyn InvoiceSink,
) -> ClientResult<SuccessEnvelope> {
    let setup = load_setup(options.home_override)?;
    execute(&setup, &options, Some(sink))
}

fn execute(
    setup: &WorkspaceContext,
    options: &RollupRunOptions<'_>,
    sink: Option<&mut dyn InvoiceSink>,
) -> ClientResult<SuccessEnvelope> {
    let family = options.family.as_str();
    let family_config = setup.config.family(family)?;
    let month = parse_month(&options.month, COMMAND)?;

    let _lock = FamilyLock::acquire(&setup.home, family)?;
    let chain = scan_chain(&setup.home, family, family_config.cadence)?;

    // The newest instance that can hold every week of the month.
    let last_week = month.work_weeks().last().copied().unwrap_or(month);
    let Some((source_period, source_path)) = chain.range(..=last_week).next_back() else {
        return Err(ClientError::report_not_found(family, &month.key()));
    };
    let mut instance = load_instance(source_path)?;
    if instance.is_completed() && !options.dry_run {
        return Err(ClientError::report_archived(
            family,
            &source_period.key(),
            source_path,
        ));
    }

    let outcome = rollup::compute(&setup.config, family, &instance, &month)?;

    // The export has to land before the records are stored.
    let export = match sink {
        Some(target) if !options.dry_run => {
            let collaborator = target.name().to_string();
            Some(with_retries(&setup.config.retry, &collaborator, || {
                target.publish(family, &month, &outcome.records)
            })?)
        }
        _ => None,
    };

    if !options.dry_run {
        rollup::store(&mut instance, &outcome);
        instance.updated_at = Some(timestamp_now());
        save_instance(source_path, &instance)?;
        info!(
            family,
            month = %month,
            source = %source_period,
            records = outcome.records.len(),
            "stored monthly rollup"
        );
    }

    let warnings = incomplete_week_warnings(&month, &outcome);
    let data = RollupData {
        family: family.to_string(),
        month: month.key(),
        month_label: month.label(),
        dry_run: options.dry_run,
        source_period: source_period.key(),
        source_path: source_path.display().to_string(),
        persisted: !options.dry_run,
        weeks: outcome.weeks.clone(),
        records: outcome.records.values().cloned().collect(),
        total_hours: outcome.total_hours(),
        total_cost: outcome.total_cost(),
        export,
    };
    success_with_warnings(COMMAND, data, warnings)
}

fn incomplete_week_warnings(month: &Period, outcome: &RollupOutcome) -> Vec<RunWarning> {
    let incomplete = outcome.incomplete_weeks();
    if incomplete.is_empty() {
        return Vec::new();
    }
    let weeks = incomplete
        .iter()
        .map(|coverage| json!({ "week": coverage.week.key(), "state": coverage.state.as_str() }))
        .collect::<Vec<_>>();
    vec![
        RunWarning::new(
            INCOMPLETE_WEEKS_CODE,
            &format!(
                "{} of {} weeks in {} are not actual yet; totals are partial.",
                incomplete.len(),
                outcome.weeks.len(),
                month.label()
            ),
        )
        .with_data(json!({ "month": month.key(), "weeks": weeks })),
    ]
}
