use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ledger::rollup::RollupRecord;
use crate::period::Period;

/// Opaque style handle (fill colour, number format, ...). Copied between cells,
/// never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleToken(pub String);

impl StyleToken {
    pub fn new(value: &str) -> Self {
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellStatus {
    Estimate,
    Actual,
}

impl CellStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Estimate => "estimate",
            Self::Actual => "actual",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl CellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub value: CellValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CellStatus>,
}

impl Cell {
    pub fn number(value: f64) -> Self {
        Self {
            value: CellValue::Number(value),
            ..Self::default()
        }
    }

    pub fn text(value: &str) -> Self {
        Self {
            value: CellValue::Text(value.to_string()),
            ..Self::default()
        }
    }

    pub fn date(value: NaiveDate) -> Self {
        Self {
            value: CellValue::Date(value),
            ..Self::default()
        }
    }

    pub fn styled(mut self, style: &str) -> Self {
        self.style = Some(StyleToken::new(style));
        self
    }

    pub fn with_status(mut self, status: CellStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// One named sheet or sub-ledger. Rows and columns are 1-based.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub rows: BTreeMap<u32, BTreeMap<u32, Cell>>,
}

impl Section {
    pub fn cell(&self, row: u32, column: u32) -> Option<&Cell> {
        self.rows.get(&row).and_then(|cells| cells.get(&column))
    }

    pub fn cell_mut(&mut self, row: u32, column: u32) -> &mut Cell {
        self.rows.entry(row).or_default().entry(column).or_default()
    }

    pub fn set(&mut self, row: u32, column: u32, cell: Cell) {
        self.rows.entry(row).or_default().insert(column, cell);
    }

    pub fn number_at(&self, row: u32, column: u32) -> Option<f64> {
        self.cell(row, column).and_then(|cell| cell.value.as_number())
    }

    pub fn style_at(&self, row: u32, column: u32) -> Option<&StyleToken> {
        self.cell(row, column).and_then(|cell| cell.style.as_ref())
    }

    /// Header row cells in column order.
    pub fn row_cells(&self, row: u32) -> Vec<(u32, &Cell)> {
        self.rows
            .get(&row)
            .map(|cells| cells.iter().map(|(column, cell)| (*column, cell)).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    #[default]
    Draft,
    Completed,
}

impl InstanceStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Completed => "completed",
        }
    }
}

/// One persisted report document for one family and one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportInstance {
    pub family: String,
    /// `None` only for blank templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
    #[serde(default)]
    pub status: InstanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub sections: BTreeMap<String, Section>,
    /// Month key -> entity -> record. Rebuilt wholesale per month.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rollups: BTreeMap<String, BTreeMap<String, RollupRecord>>,
}

impl ReportInstance {
    pub fn blank(family: &str) -> Self {
        Self {
            family: family.to_string(),
            period: None,
            status: InstanceStatus::Draft,
            run_id: None,
            updated_at: None,
            sections: BTreeMap::new(),
            rollups: BTreeMap::new(),
        }
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    pub fn section_mut(&mut self, name: &str) -> &mut Section {
        self.sections.entry(name.to_string()).or_default()
    }

    pub fn is_completed(&self) -> bool {
        self.status == InstanceStatus::Completed
    }
}
