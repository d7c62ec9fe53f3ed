//! Applies planned row writes to one period column of a report.
//!
//! All mutation happens on a clone of the carry-forward base. The clone is only
//! handed back when every write, style copy, and total succeeded, so a failure
//! leaves both the base and the persisted chain untouched.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{FamilyConfig, SectionLayout};
use crate::config::mapping::PlannedWrite;
use crate::ledger::rollup::record_actual;
use crate::period::Period;
use crate::report::columns::{ColumnMatch, locate_column, require_column};
use crate::report::model::{Cell, CellStatus, CellValue, ReportInstance, Section, StyleToken};
use crate::{ClientError, ClientResult};

pub const STATUS_TEXT: &str = "Actual";

const CONFLICT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct WriteRequest<'a> {
    pub family: &'a str,
    pub period: Period,
    pub family_config: &'a FamilyConfig,
    pub writes: &'a [PlannedWrite],
    /// False for blank templates, which have no meaningful preceding column.
    pub copy_styles: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellUpdate {
    pub section: String,
    pub row: u32,
    pub column: u32,
    pub previous: Option<f64>,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleToken>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalUpdate {
    pub section: String,
    pub row: u32,
    pub column: u32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionSummary {
    pub section: String,
    pub column: u32,
    pub hours: f64,
    pub cells_written: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_source_column: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteSummary {
    pub period: String,
    pub sections: Vec<SectionSummary>,
    pub cells: Vec<CellUpdate>,
    pub totals: Vec<TotalUpdate>,
}

impl WriteSummary {
    pub fn total_hours(&self) -> f64 {
        self.sections.iter().map(|section| section.hours).sum()
    }
}

type CellKey = (String, u32, u32);

pub fn apply(base: &ReportInstance, request: &WriteRequest<'_>) -> ClientResult<(ReportInstance, WriteSummary)> {
    let mut working = base.clone();
    let mut written: BTreeMap<CellKey, f64> = BTreeMap::new();
    let mut summary = WriteSummary {
        period: request.period.key(),
        sections: Vec::new(),
        cells: Vec::new(),
        totals: Vec::new(),
    };

    for (section_name, writes) in group_by_section(request.writes) {
        let Some(layout) = request.family_config.sections.get(section_name) else {
            return Err(ClientError::invalid_argument(&format!(
                "Section `{section_name}` is not configured for {}.",
                request.family
            )));
        };
        let Some(section) = working.sections.get_mut(section_name) else {
            return Err(ClientError::column_not_found(
                request.family,
                section_name,
                &request.period.key(),
            ));
        };

        let section_summary = write_section(
            request,
            section_name,
            layout,
            section,
            &writes,
            &mut written,
            &mut summary,
        )?;
        summary.sections.push(section_summary);
    }

    working.period = Some(request.period);
    Ok((working, summary))
}

fn group_by_section(writes: &[PlannedWrite]) -> BTreeMap<&str, Vec<&PlannedWrite>> {
    let mut grouped: BTreeMap<&str, Vec<&PlannedWrite>> = BTreeMap::new();
    for write in writes {
        grouped.entry(write.section.as_str()).or_default().push(write);
    }
    grouped
}

fn write_section(
    request: &WriteRequest<'_>,
    section_name: &str,
    layout: &SectionLayout,
    section: &mut Section,
    writes: &[&PlannedWrite],
    written: &mut BTreeMap<CellKey, f64>,
    summary: &mut WriteSummary,
) -> ClientResult<SectionSummary> {
    let column = require_column(
        request.family,
        section_name,
        section,
        layout.header_row,
        &request.period,
    )?;
    let style_column = if request.copy_styles {
        previous_column(request, section_name, section, layout)
    } else {
        None
    };

    let mut hours = 0.0;
    let mut totals = Vec::new();
    for write in writes {
        let key = (section_name.to_string(), write.row, column);
        if let Some(existing) = written.get(&key)
            && (existing - write.hours).abs() > CONFLICT_TOLERANCE
        {
            return Err(ClientError::cell_write_conflict(
                request.family,
                section_name,
                write.row,
                column,
                *existing,
                write.hours,
            ));
        }
        written.insert(key, write.hours);

        let style = write
            .style
            .clone()
            .or_else(|| carried_style(section, layout, style_column, write.row))
            .or_else(|| section.style_at(write.row, column).cloned());
        let previous = section.number_at(write.row, column);

        let cell = section.cell_mut(write.row, column);
        cell.value = CellValue::Number(write.hours);
        cell.style = style.clone();
        record_actual(cell);
        debug!(
            section = section_name,
            row = write.row,
            column,
            hours = write.hours,
            "wrote cell"
        );

        hours += write.hours;
        summary.cells.push(CellUpdate {
            section: section_name.to_string(),
            row: write.row,
            column,
            previous,
            value: write.hours,
            style,
        });
        totals = recompute_totals(section, layout, column);
    }

    if let Some(status_row) = layout.status_row {
        let fixed_rows = writes
            .iter()
            .filter(|write| write.style.is_some())
            .map(|write| write.row)
            .collect::<BTreeSet<u32>>();
        mark_status(section, layout, status_row, column, style_column, &fixed_rows);
    }

    summary
        .totals
        .extend(totals.into_iter().map(|(row, value)| TotalUpdate {
            section: section_name.to_string(),
            row,
            column,
            value,
        }));

    Ok(SectionSummary {
        section: section_name.to_string(),
        column,
        hours,
        cells_written: writes.len(),
        style_source_column: style_column,
    })
}

fn previous_column(
    request: &WriteRequest<'_>,
    section_name: &str,
    section: &Section,
    layout: &SectionLayout,
) -> Option<u32> {
    let previous = request.period.previous();
    match locate_column(section, layout.header_row, &previous) {
        ColumnMatch::Found(column) => Some(column),
        ColumnMatch::Missing => {
            warn!(
                family = request.family,
                section = section_name,
                previous = %previous,
                "no preceding period column; styles fall back"
            );
            None
        }
        ColumnMatch::Ambiguous(columns) => {
            warn!(
                family = request.family,
                section = section_name,
                previous = %previous,
                ?columns,
                "preceding period column is ambiguous; styles fall back"
            );
            None
        }
    }
}

fn carried_style(
    section: &Section,
    layout: &SectionLayout,
    style_column: Option<u32>,
    row: u32,
) -> Option<StyleToken> {
    let column = style_column?;
    section
        .style_at(row, column)
        .cloned()
        .or_else(|| layout.fallback_style.clone())
}

fn mark_status(
    section: &mut Section,
    layout: &SectionLayout,
    status_row: u32,
    column: u32,
    style_column: Option<u32>,
    fixed_rows: &BTreeSet<u32>,
) {
    let style = carried_style(section, layout, style_column, status_row)
        .or_else(|| section.style_at(status_row, column).cloned());

    let cell = section.cell_mut(status_row, column);
    cell.value = CellValue::Text(STATUS_TEXT.to_string());
    cell.status = Some(CellStatus::Actual);
    if style.is_some() {
        cell.style = style.clone();
    }

    if let (Some(range), Some(token)) = (layout.fill_range, style) {
        // Rows with a mapping style keep it.
        for row in range.rows().filter(|row| !fixed_rows.contains(row)) {
            section.cell_mut(row, column).style = Some(token.clone());
        }
    }
}

/// Sums each total rule's own row range in `column`. Returns `(row, value)`.
pub fn recompute_totals(section: &mut Section, layout: &SectionLayout, column: u32) -> Vec<(u32, f64)> {
    let mut results = Vec::with_capacity(layout.totals.len());
    for rule in &layout.totals {
        let value = rule
            .range
            .rows()
            .filter_map(|row| section.number_at(row, column))
            .sum::<f64>();
        let cell: &mut Cell = section.cell_mut(rule.row, column);
        cell.value = CellValue::Number(value);
        results.push((rule.row, value));
    }
    results
}
