//! Weekly-to-monthly rollup.
//!
//! Weekly cells start as `estimate` in the template and become `actual` when
//! the writer fills them; nothing moves a cell back. A monthly rollup sums the
//! `actual` cells of every work week in the month per entity, prices them with
//! the configured rate, and replaces that month's record set in the instance.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::RunConfig;
use crate::period::Period;
use crate::report::columns::{ColumnMatch, locate_column};
use crate::report::model::{Cell, CellStatus, ReportInstance};
use crate::{ClientError, ClientResult};

pub const INCOMPLETE_WEEKS_CODE: &str = "incomplete_weeks";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollupRecord {
    pub entity: String,
    pub hours: f64,
    pub rate: f64,
    pub cost: f64,
    pub month: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekState {
    Actual,
    Estimate,
    MissingColumn,
}

impl WeekState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Actual => "actual",
            Self::Estimate => "estimate",
            Self::MissingColumn => "missing_column",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekCoverage {
    pub week: Period,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    pub state: WeekState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollupOutcome {
    pub month: Period,
    pub weeks: Vec<WeekCoverage>,
    pub records: BTreeMap<String, RollupRecord>,
}

impl RollupOutcome {
    pub fn incomplete_weeks(&self) -> Vec<&WeekCoverage> {
        self.weeks
            .iter()
            .filter(|coverage| coverage.state != WeekState::Actual)
            .collect()
    }

    pub fn total_hours(&self) -> f64 {
        self.records.values().map(|record| record.hours).sum()
    }

    pub fn total_cost(&self) -> f64 {
        round_cents(self.records.values().map(|record| record.cost).sum())
    }
}

/// Estimate -> Actual. Writing an already actual cell keeps it actual.
pub fn record_actual(cell: &mut Cell) {
    if cell.status == Some(CellStatus::Estimate) {
        debug!("cell promoted from estimate to actual");
    }
    cell.status = Some(CellStatus::Actual);
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

struct EntityRows {
    rows: BTreeSet<u32>,
    rate: f64,
}

pub fn compute(
    config: &RunConfig,
    family: &str,
    instance: &ReportInstance,
    month: &Period,
) -> ClientResult<RollupOutcome> {
    if !matches!(month, Period::Month { .. }) {
        return Err(ClientError::invalid_argument_for_command(
            &format!("Rollups run per month; `{month}` is a week."),
            Some("rollup"),
        ));
    }
    let family_config = config.family(family)?;
    let Some(rollup) = &family_config.rollup else {
        return Err(ClientError::invalid_argument_for_command(
            &format!("Family `{family}` has no rollup section configured."),
            Some("rollup"),
        ));
    };
    let section_name = rollup.section.as_str();
    let Some(layout) = family_config.sections.get(section_name) else {
        return Err(ClientError::unknown_family(family));
    };
    let section = instance.section(section_name).cloned().unwrap_or_default();

    let mut entities: BTreeMap<String, EntityRows> = BTreeMap::new();
    for mapping in config
        .mappings_for(family)
        .filter(|mapping| mapping.section == section_name)
    {
        let Some(rate) = config.rate_for(mapping) else {
            return Err(ClientError::invalid_argument(&format!(
                "`{}` has no rate for invoicing.",
                mapping.entity
            )));
        };
        entities
            .entry(mapping.entity.clone())
            .or_insert_with(|| EntityRows {
                rows: BTreeSet::new(),
                rate,
            })
            .rows
            .insert(mapping.row);
    }

    let mut hours: BTreeMap<&str, f64> = entities.keys().map(|entity| (entity.as_str(), 0.0)).collect();
    let mut weeks = Vec::new();

    for week in month.work_weeks() {
        let column = match locate_column(&section, layout.header_row, &week) {
            ColumnMatch::Found(column) => column,
            ColumnMatch::Missing => {
                weeks.push(WeekCoverage {
                    week,
                    column: None,
                    state: WeekState::MissingColumn,
                });
                continue;
            }
            ColumnMatch::Ambiguous(columns) => {
                return Err(ClientError::ambiguous_column(
                    family,
                    section_name,
                    &week.key(),
                    &columns,
                ));
            }
        };

        let mut complete = true;
        for (entity, rows) in &entities {
            for row in &rows.rows {
                let cell = section.cell(*row, column);
                match cell.and_then(|cell| cell.status) {
                    Some(CellStatus::Actual) => {
                        let value = cell.and_then(|cell| cell.value.as_number()).unwrap_or(0.0);
                        *hours.entry(entity.as_str()).or_insert(0.0) += value;
                    }
                    _ => complete = false,
                }
            }
        }

        weeks.push(WeekCoverage {
            week,
            column: Some(column),
            state: if complete {
                WeekState::Actual
            } else {
                WeekState::Estimate
            },
        });
    }

    let month_key = month.key();
    let records = entities
        .iter()
        .map(|(entity, rows)| {
            let total = hours.get(entity.as_str()).copied().unwrap_or(0.0);
            (
                entity.clone(),
                RollupRecord {
                    entity: entity.clone(),
                    hours: total,
                    rate: rows.rate,
                    cost: round_cents(total * rows.rate),
                    month: month_key.clone(),
                },
            )
        })
        .collect::<BTreeMap<String, RollupRecord>>();

    let outcome = RollupOutcome {
        month: *month,
        weeks,
        records,
    };
    let incomplete = outcome.incomplete_weeks();
    if !incomplete.is_empty() {
        warn!(
            family,
            month = %month,
            weeks = ?incomplete.iter().map(|coverage| coverage.week.key()).collect::<Vec<String>>(),
            "rollup includes weeks that are not yet actual"
        );
    }
    Ok(outcome)
}

/// Replaces the month's record set wholesale. Other months are left as is.
pub fn store(instance: &mut ReportInstance, outcome: &RollupOutcome) {
    instance
        .rollups
        .insert(outcome.month.key(), outcome.records.clone());
}
