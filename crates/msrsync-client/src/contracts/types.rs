use serde::Serialize;
use serde_json::Value;

use crate::contracts::envelope::ErrorContract;
use crate::ledger::rollup::{RollupRecord, WeekCoverage};
use crate::ledger::writer::WriteSummary;
use crate::sources::invoice::PublishReceipt;

#[derive(Debug, Clone, Serialize)]
pub struct RunWarning {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RunWarning {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BaseData {
    /// `prior` or `template`.
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodUpdateData {
    pub period: String,
    pub period_label: String,
    pub base: BaseData,
    pub instance_path: String,
    /// True when the instance replaced an earlier draft for the same period.
    pub replaced_draft: bool,
    pub persisted: bool,
    pub hours_total: f64,
    pub entity_count: usize,
    pub write: WriteSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateData {
    pub family: String,
    pub cadence: String,
    pub dry_run: bool,
    pub run_id: String,
    pub hours_source: String,
    pub periods: Vec<PeriodUpdateData>,
}

/// One family's result within an all-families update.
#[derive(Debug, Clone, Serialize)]
pub struct FamilyUpdateOutcome {
    pub family: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<UpdateData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorContract>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateAllData {
    pub period: String,
    pub period_label: String,
    pub dry_run: bool,
    pub hours_source: String,
    pub succeeded: usize,
    pub failed: usize,
    pub families: Vec<FamilyUpdateOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RollupData {
    pub family: String,
    pub month: String,
    pub month_label: String,
    pub dry_run: bool,
    pub source_period: String,
    pub source_path: String,
    pub persisted: bool,
    pub weeks: Vec<WeekCoverage>,
    pub records: Vec<RollupRecord>,
    pub total_hours: f64,
    pub total_cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<PublishReceipt>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportListItem {
    pub period: String,
    pub label: String,
    pub status: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportListData {
    pub family: String,
    pub cadence: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_path: Option<String>,
    pub reports: Vec<ReportListItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveData {
    pub family: String,
    pub period: String,
    pub path: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodData {
    pub input: String,
    pub key: String,
    pub label: String,
    pub cadence: String,
    pub start: String,
    pub end: String,
    pub variants: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub work_weeks: Vec<String>,
    pub previous: String,
    pub next: String,
}
