use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tracing::{info, warn};
use ulid::Ulid;

use crate::commands::common::{
    hours_source_for, load_setup, parse_family_period, parse_month, timestamp_now,
};
use crate::config::mapping::plan;
use crate::contracts::envelope::{SuccessEnvelope, failure_from_error, success, success_with_warnings};
use crate::contracts::types::{
    BaseData, FamilyUpdateOutcome, PeriodUpdateData, RunWarning, UpdateAllData, UpdateData,
};
use crate::ledger::writer::{self, WriteRequest};
use crate::period::{Cadence, Period};
use crate::report::carry_forward::{BaseSource, CarryForward, resolve_from_chain, select_prior};
use crate::report::model::{InstanceStatus, ReportInstance};
use crate::report::store::{instance_path, load_instance, save_instance, scan_chain};
use crate::setup::WorkspaceContext;
use crate::sources::hours::HoursSource;
use crate::sources::retry::with_retries;
use crate::state::FamilyLock;
use crate::{ClientError, ClientResult};

const COMMAND: &str = "update";
const ALL_COMMAND: &str = "update-all";
const FAMILY_FAILED_CODE: &str = "family_failed";

#[derive(Debug, Default)]
pub struct UpdateRunOptions<'a> {
    pub family: String,
    pub period: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub hours_path: Option<PathBuf>,
    pub dry_run: bool,
    pub home_override: Option<&'a Path>,
}

pub fn run(
    family: &str,
    period: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
    hours_path: &Path,
    dry_run: bool,
) -> ClientResult<SuccessEnvelope> {
    run_with_options(UpdateRunOptions {
        family: family.to_string(),
        period: period.map(std::string::ToString::to_string),
        from: from.map(std::string::ToString::to_string),
        to: to.map(std::string::ToString::to_string),
        hours_path: Some(hours_path.to_path_buf()),
        dry_run,
        home_override: None,
    })
}

#[doc(hidden)]
pub fn run_with_options(options: UpdateRunOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let setup = load_setup(options.home_override)?;
    let Some(hours_path) = options.hours_path.as_deref() else {
        return Err(ClientError::invalid_argument_for_command(
            "An hours input is required (`--hours <path>`).",
            Some(COMMAND),
        ));
    };
    let mut source = hours_source_for(hours_path, &setup.config.skip_categories)?;
    execute(&setup, &options, source.as_mut())
}

/// Runs an update against any hours collaborator.
#[doc(hidden)]
pub fn run_with_source(
    options: UpdateRunOptions<'_>,
    source: &mut dyn HoursSource,
) -> ClientResult<SuccessEnvelope> {
    let setup = load_setup(options.home_override)?;
    execute(&setup, &options, source)
}

/// Every monthly family for one month, from one hours input.
#[derive(Debug, Default)]
pub struct UpdateAllOptions<'a> {
    pub period: String,
    pub hours_path: Option<PathBuf>,
    pub dry_run: bool,
    pub home_override: Option<&'a Path>,
}

pub fn run_all(period: &str, hours_path: &Path, dry_run: bool) -> ClientResult<SuccessEnvelope> {
    run_all_with_options(UpdateAllOptions {
        period: period.to_string(),
        hours_path: Some(hours_path.to_path_buf()),
        dry_run,
        home_override: None,
    })
}

#[doc(hidden)]
pub fn run_all_with_options(options: UpdateAllOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let setup = load_setup(options.home_override)?;
    let Some(hours_path) = options.hours_path.as_deref() else {
        return Err(ClientError::invalid_argument_for_command(
            "An hours input is required (`--hours <path>`).",
            Some(ALL_COMMAND),
        ));
    };
    let mut source = hours_source_for(hours_path, &setup.config.skip_categories)?;
    execute_all(&setup, &options, source.as_mut())
}

/// Runs each monthly family in name order, each under its own lock. A failing
/// family is reported and the remaining families still run.
fn execute_all(
    setup: &WorkspaceContext,
    options: &UpdateAllOptions<'_>,
    source: &mut dyn HoursSource,
) -> ClientResult<SuccessEnvelope> {
    let month = parse_month(&options.period, ALL_COMMAND)?;
    let families = setup
        .config
        .families
        .iter()
        .filter(|(_, family_config)| family_config.cadence == Cadence::Monthly)
        .map(|(name, _)| name.clone())
        .collect::<Vec<String>>();
    if families.is_empty() {
        return Err(ClientError::invalid_argument_for_command(
            "No monthly report families are configured.",
            Some(ALL_COMMAND),
        ));
    }

    let mut outcomes = Vec::with_capacity(families.len());
    let mut warnings = Vec::new();
    for family in families {
        let family_options = UpdateRunOptions {
            family: family.clone(),
            period: Some(month.key()),
            dry_run: options.dry_run,
            ..UpdateRunOptions::default()
        };
        match execute_family(setup, &family_options, source) {
            Ok(update) => outcomes.push(FamilyUpdateOutcome {
                family,
                ok: true,
                update: Some(update),
                error: None,
            }),
            Err(error) => {
                warn!(family = %family, code = %error.code, "family update failed; continuing");
                warnings.push(
                    RunWarning::new(FAMILY_FAILED_CODE, &format!("{family}: {}", error.message))
                        .with_data(json!({ "family": family, "code": error.code })),
                );
                outcomes.push(FamilyUpdateOutcome {
                    family,
                    ok: false,
                    update: None,
                    error: Some(failure_from_error(&error).error),
                });
            }
        }
    }

    let succeeded = outcomes.iter().filter(|outcome| outcome.ok).count();
    info!(
        period = %month,
        succeeded,
        failed = outcomes.len() - succeeded,
        "finished all-families update"
    );
    let data = UpdateAllData {
        period: month.key(),
        period_label: month.label(),
        dry_run: options.dry_run,
        hours_source: source.name().to_string(),
        succeeded,
        failed: outcomes.len() - succeeded,
        families: outcomes,
    };
    success_with_warnings(ALL_COMMAND, data, warnings)
}

fn execute(
    setup: &WorkspaceContext,
    options: &UpdateRunOptions<'_>,
    source: &mut dyn HoursSource,
) -> ClientResult<SuccessEnvelope> {
    let data = execute_family(setup, options, source)?;
    success(COMMAND, data)
}

fn execute_family(
    setup: &WorkspaceContext,
    options: &UpdateRunOptions<'_>,
    source: &mut dyn HoursSource,
) -> ClientResult<UpdateData> {
    let family = options.family.as_str();
    let family_config = setup.config.family(family)?;
    let periods = requested_periods(options, family_config)?;
    if periods.len() > 1 && !source.is_period_aware() {
        return Err(ClientError::invalid_argument_for_command(
            &format!(
                "A batch over {} periods needs dated hours; `{}` has no per-period data.",
                periods.len(),
                source.name()
            ),
            Some(COMMAND),
        ));
    }

    let _lock = FamilyLock::acquire(&setup.home, family)?;
    let run_id = format!("run_{}", Ulid::new());
    info!(
        family,
        run_id = %run_id,
        periods = periods.len(),
        dry_run = options.dry_run,
        "starting update run"
    );

    let run = PeriodRun {
        setup,
        family,
        run_id: &run_id,
        dry_run: options.dry_run,
    };
    let mut chain = scan_chain(&setup.home, family, family_config.cadence)?;
    let mut previous_output: Option<(Period, ReportInstance)> = None;
    let mut results = Vec::with_capacity(periods.len());

    for period in &periods {
        let outcome = update_period(&run, *period, source, &chain, previous_output.as_ref());
        let (result, instance) = match outcome {
            Ok(value) => value,
            Err(error) => return Err(with_completed_periods(error, &results)),
        };
        if !options.dry_run {
            chain.insert(*period, PathBuf::from(&result.instance_path));
        }
        previous_output = Some((*period, instance));
        results.push(result);
    }

    let data = UpdateData {
        family: family.to_string(),
        cadence: family_config.cadence.as_str().to_string(),
        dry_run: options.dry_run,
        run_id,
        hours_source: source.name().to_string(),
        periods: results,
    };
    Ok(data)
}

fn requested_periods(
    options: &UpdateRunOptions<'_>,
    family_config: &crate::config::FamilyConfig,
) -> ClientResult<Vec<Period>> {
    let family = options.family.as_str();
    match (&options.period, &options.from, &options.to) {
        (Some(period), None, None) => Ok(vec![parse_family_period(
            period,
            family,
            family_config,
            COMMAND,
        )?]),
        (None, Some(from), Some(to)) => {
            let start = parse_family_period(from, family, family_config, COMMAND)?;
            let end = parse_family_period(to, family, family_config, COMMAND)?;
            if start > end {
                return Err(ClientError::invalid_argument_for_command(
                    &format!("`--from {from}` is after `--to {to}`."),
                    Some(COMMAND),
                ));
            }
            Ok(Period::range_inclusive(start, end))
        }
        _ => Err(ClientError::invalid_argument_for_command(
            "Pass either one period or both `--from` and `--to`.",
            Some(COMMAND),
        )),
    }
}

struct PeriodRun<'a> {
    setup: &'a WorkspaceContext,
    family: &'a str,
    run_id: &'a str,
    dry_run: bool,
}

fn update_period(
    run: &PeriodRun<'_>,
    period: Period,
    source: &mut dyn HoursSource,
    chain: &BTreeMap<Period, PathBuf>,
    previous_output: Option<&(Period, ReportInstance)>,
) -> ClientResult<(PeriodUpdateData, ReportInstance)> {
    let PeriodRun {
        setup,
        family,
        run_id,
        dry_run,
    } = *run;
    let family_config = setup.config.family(family)?;
    let target_path = instance_path(&setup.home, family, &period);
    let existing_path = chain.get(&period).cloned();
    if let Some(path) = &existing_path {
        let existing = load_instance(path)?;
        if existing.is_completed() {
            return Err(ClientError::report_archived(family, &period.key(), path));
        }
    }

    let base = resolve_base(setup, family, &period, chain, previous_output)?;

    let collaborator = source.name().to_string();
    let hours = with_retries(&setup.config.retry, &collaborator, || source.hours_for(&period))?;
    let writes = plan(&setup.config, &hours, family)?;

    let request = WriteRequest {
        family,
        period,
        family_config,
        writes: &writes,
        copy_styles: !base.is_uninitialized(),
    };
    let (mut instance, summary) = writer::apply(&base.instance, &request)?;
    instance.family = family.to_string();
    instance.status = InstanceStatus::Draft;
    instance.run_id = Some(run_id.to_string());
    instance.updated_at = Some(timestamp_now());

    let path = existing_path.unwrap_or(target_path);
    if dry_run {
        info!(family, period = %period, "dry run; instance not written");
    } else {
        save_instance(&path, &instance)?;
        info!(family, period = %period, path = %path.display(), "persisted report instance");
    }

    let result = PeriodUpdateData {
        period: period.key(),
        period_label: period.label(),
        base: base_data(&base),
        instance_path: path.display().to_string(),
        replaced_draft: chain.contains_key(&period),
        persisted: !dry_run,
        hours_total: hours.total(),
        entity_count: hours.entity_count(),
        write: summary,
    };
    Ok((result, instance))
}

/// The carry-forward base, preferring this run's own previous output so a dry
/// run batch chains the same way a real one does.
fn resolve_base(
    setup: &WorkspaceContext,
    family: &str,
    period: &Period,
    chain: &BTreeMap<Period, PathBuf>,
    previous_output: Option<&(Period, ReportInstance)>,
) -> ClientResult<CarryForward> {
    if let Some((previous, instance)) = previous_output {
        let newer_on_disk = select_prior(chain, period).is_some_and(|(prior, _)| prior > previous);
        if previous < period && !newer_on_disk {
            return Ok(CarryForward {
                instance: instance.clone(),
                source: BaseSource::Prior {
                    period: *previous,
                    path: instance_path(&setup.home, family, previous),
                },
            });
        }
    }
    resolve_from_chain(&setup.home, family, chain, period)
}

fn base_data(base: &CarryForward) -> BaseData {
    match &base.source {
        BaseSource::Prior { period, path } => BaseData {
            kind: "prior".to_string(),
            period: Some(period.key()),
            path: path.display().to_string(),
        },
        BaseSource::Template { path } => BaseData {
            kind: "template".to_string(),
            period: None,
            path: path.display().to_string(),
        },
    }
}

fn with_completed_periods(error: ClientError, results: &[PeriodUpdateData]) -> ClientError {
    if results.is_empty() {
        return error;
    }
    let completed = results
        .iter()
        .map(|result| result.period.clone())
        .collect::<Vec<String>>();
    warn!(?completed, code = %error.code, "batch stopped after partial progress");

    let mut data = match error.data.clone() {
        Some(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };
    data.insert("completed_periods".to_string(), json!(completed));
    error.with_data(Value::Object(data))
}
