use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::ledger::rollup::RollupRecord;
use crate::period::Period;
use crate::state::write_atomic;
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishReceipt {
    pub destination: String,
    pub line_items: usize,
}

/// The invoicing collaborator. Receives a month's records read-only.
pub trait InvoiceSink {
    fn name(&self) -> &str;

    fn publish(
        &mut self,
        family: &str,
        month: &Period,
        records: &BTreeMap<String, RollupRecord>,
    ) -> ClientResult<PublishReceipt>;
}

#[derive(Debug, Clone, Serialize)]
struct LineItem<'a> {
    entity: &'a str,
    description: String,
    hours: f64,
    rate: f64,
    cost: f64,
}

#[derive(Debug, Clone, Serialize)]
struct InvoiceExport<'a> {
    family: &'a str,
    month: String,
    month_label: String,
    line_items: Vec<LineItem<'a>>,
    total_hours: f64,
    total_cost: f64,
}

/// Writes line items to a JSON file for the invoicing step to pick up.
#[derive(Debug, Clone)]
pub struct JsonExportSink {
    path: PathBuf,
}

impl JsonExportSink {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl InvoiceSink for JsonExportSink {
    fn name(&self) -> &str {
        "invoice export"
    }

    fn publish(
        &mut self,
        family: &str,
        month: &Period,
        records: &BTreeMap<String, RollupRecord>,
    ) -> ClientResult<PublishReceipt> {
        let line_items = records
            .values()
            .filter(|record| record.hours > 0.0)
            .map(|record| LineItem {
                entity: &record.entity,
                description: format!("{} - {family} {}", record.entity, month.label()),
                hours: record.hours,
                rate: record.rate,
                cost: record.cost,
            })
            .collect::<Vec<LineItem<'_>>>();
        let export = InvoiceExport {
            family,
            month: month.key(),
            month_label: month.label(),
            total_hours: line_items.iter().map(|item| item.hours).sum(),
            total_cost: (line_items.iter().map(|item| item.cost).sum::<f64>() * 100.0).round()
                / 100.0,
            line_items,
        };

        let body = serde_json::to_vec_pretty(&export)
            .map_err(|error| ClientError::internal_serialization(&error.to_string()))?;
        write_atomic(&self.path, &body).map_err(|error| {
            ClientError::collaborator_unavailable(self.name(), &error.message)
        })?;

        info!(
            family,
            month = %month,
            destination = %self.path.display(),
            line_items = export.line_items.len(),
            "published invoice export"
        );
        Ok(PublishReceipt {
            destination: self.path.display().to_string(),
            line_items: export.line_items.len(),
        })
    }
}
