use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::period::Period;
use crate::{ClientError, ClientResult};

/// Aggregated hours: entity -> charge code -> hours.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct HoursTable {
    entries: BTreeMap<String, BTreeMap<String, f64>>,
}

impl HoursTable {
    pub fn add(&mut self, entity: &str, charge_code: &str, hours: f64) {
        *self
            .entries
            .entry(entity.to_string())
            .or_default()
            .entry(charge_code.to_string())
            .or_insert(0.0) += hours;
    }

    pub fn get(&self, entity: &str, charge_code: &str) -> f64 {
        self.entries
            .get(entity)
            .and_then(|codes| codes.get(charge_code))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.entries.iter().flat_map(|(entity, codes)| {
            codes
                .iter()
                .map(move |(code, hours)| (entity.as_str(), code.as_str(), *hours))
        })
    }

    pub fn entity_count(&self) -> usize {
        self.entries.len()
    }

    pub fn total(&self) -> f64 {
        self.entries().map(|(_, _, hours)| hours).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The time-tracking collaborator, already filtered of skip categories.
pub trait HoursSource {
    fn name(&self) -> &str;

    fn hours_for(&mut self, period: &Period) -> ClientResult<HoursTable>;

    /// Whether different periods can yield different hours from this source.
    fn is_period_aware(&self) -> bool;
}

const REQUIRED_CSV_HEADERS: [&str; 4] = ["fname", "lname", "hours", "jobcode_1"];
const DATE_HEADERS: [&str; 2] = ["local_date", "date"];

/// A TSheets-style timesheet export.
#[derive(Debug, Clone)]
pub struct CsvExportSource {
    path: PathBuf,
    skip_categories: Vec<String>,
    dated: Option<bool>,
}

impl CsvExportSource {
    pub fn new(path: &Path, skip_categories: &[String]) -> Self {
        Self {
            path: path.to_path_buf(),
            skip_categories: skip_categories.to_vec(),
            dated: None,
        }
    }
}

impl HoursSource for CsvExportSource {
    fn name(&self) -> &str {
        "timesheet export"
    }

    fn hours_for(&mut self, period: &Period) -> ClientResult<HoursTable> {
        let body = read_source(&self.path, self.name())?;
        let parsed = parse_timesheet_csv(&body, &self.skip_categories, Some(period))
            .map_err(|detail| {
                ClientError::hours_source_invalid(&self.path.display().to_string(), &detail)
            })?;
        self.dated = Some(parsed.dated);
        Ok(parsed.hours)
    }

    fn is_period_aware(&self) -> bool {
        if let Some(dated) = self.dated {
            return dated;
        }
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|body| {
                csv::ReaderBuilder::new()
                    .has_headers(true)
                    .from_reader(body.as_bytes())
                    .headers()
                    .ok()
                    .map(|headers| {
                        headers
                            .iter()
                            .any(|header| DATE_HEADERS.contains(&header.trim()))
                    })
            })
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ParsedTimesheet {
    pub(crate) hours: HoursTable,
    pub(crate) dated: bool,
}

pub(crate) fn parse_timesheet_csv(
    content: &str,
    skip_categories: &[String],
    period: Option<&Period>,
) -> Result<ParsedTimesheet, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|_| "CSV header row is missing or unreadable.".to_string())?
        .iter()
        .map(|value| value.trim().to_string())
        .collect::<Vec<String>>();

    let missing = REQUIRED_CSV_HEADERS
        .iter()
        .filter(|required| !headers.iter().any(|header| header == *required))
        .copied()
        .collect::<Vec<&str>>();
    if !missing.is_empty() {
        return Err(format!("missing CSV headers: {}", missing.join(", ")));
    }

    let index_by_name = headers
        .iter()
        .enumerate()
        .map(|(index, name)| (name.to_string(), index))
        .collect::<HashMap<String, usize>>();
    let date_header = DATE_HEADERS
        .iter()
        .find(|name| index_by_name.contains_key(**name))
        .copied();

    let mut hours = HoursTable::default();
    for (row_index, result_row) in reader.records().enumerate() {
        let row = row_index + 2;
        let record = result_row.map_err(|_| format!("row {row} is malformed or not UTF-8"))?;

        let category = value_for(&record, &index_by_name, "jobcode_1");
        if skip_categories.iter().any(|skip| skip == &category) {
            continue;
        }

        if let (Some(header), Some(target)) = (date_header, period) {
            let raw_date = value_for(&record, &index_by_name, header);
            let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")
                .map_err(|_| format!("row {row} has invalid {header} `{raw_date}`"))?;
            if !target.contains(date) {
                continue;
            }
        }

        let raw_hours = value_for(&record, &index_by_name, "hours");
        let value = if raw_hours.is_empty() {
            0.0
        } else {
            raw_hours
                .parse::<f64>()
                .map_err(|_| format!("row {row} has non-numeric hours `{raw_hours}`"))?
        };
        if !value.is_finite() || value < 0.0 {
            return Err(format!("row {row} has invalid hours `{raw_hours}`"));
        }

        let sub_code = value_for(&record, &index_by_name, "jobcode_2");
        let charge_code = if sub_code.is_empty() { category } else { sub_code };
        let entity = format!(
            "{} {}",
            value_for(&record, &index_by_name, "fname"),
            value_for(&record, &index_by_name, "lname")
        )
        .trim()
        .to_string();

        if charge_code.is_empty() || entity.is_empty() || value <= 0.0 {
            continue;
        }
        hours.add(&entity, &charge_code, value);
    }

    Ok(ParsedTimesheet {
        hours,
        dated: date_header.is_some(),
    })
}

fn value_for(
    record: &csv::StringRecord,
    index_by_name: &HashMap<String, usize>,
    field_name: &str,
) -> String {
    index_by_name
        .get(field_name)
        .and_then(|index| record.get(*index))
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

/// A pre-aggregated JSON document, either flat (`entity -> code -> hours`) or
/// keyed by period label first.
#[derive(Debug, Clone)]
pub struct JsonHoursSource {
    path: PathBuf,
}

impl JsonHoursSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl HoursSource for JsonHoursSource {
    fn name(&self) -> &str {
        "hours document"
    }

    fn hours_for(&mut self, period: &Period) -> ClientResult<HoursTable> {
        let body = read_source(&self.path, self.name())?;
        parse_hours_json(&body, period).map_err(|detail| {
            ClientError::hours_source_invalid(&self.path.display().to_string(), &detail)
        })
    }

    fn is_period_aware(&self) -> bool {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|body| serde_json::from_str::<Value>(&body).ok())
            .map(|value| is_period_keyed(&value))
            .unwrap_or(false)
    }
}

fn is_period_keyed(value: &Value) -> bool {
    value
        .as_object()
        .and_then(|object| object.values().next())
        .and_then(Value::as_object)
        .and_then(|inner| inner.values().next())
        .is_some_and(Value::is_object)
}

pub(crate) fn parse_hours_json(content: &str, period: &Period) -> Result<HoursTable, String> {
    let parsed = serde_json::from_str::<Value>(content)
        .map_err(|error| format!("invalid JSON: {error}"))?;
    let Some(root) = parsed.as_object() else {
        return Err("expected a JSON object".to_string());
    };

    if !is_period_keyed(&parsed) {
        return table_from_object(&parsed);
    }

    let mut selected = None;
    for (label, body) in root {
        let keyed = Period::parse_for(label, period.cadence())
            .map_err(|_| format!("`{label}` is not a period label"))?;
        if keyed == *period {
            if selected.is_some() {
                return Err(format!("more than one entry for {}", period.key()));
            }
            selected = Some(body);
        }
    }

    match selected {
        Some(body) => table_from_object(body),
        None => Ok(HoursTable::default()),
    }
}

fn table_from_object(value: &Value) -> Result<HoursTable, String> {
    let Some(entities) = value.as_object() else {
        return Err("expected an object of entities".to_string());
    };
    let mut table = HoursTable::default();
    for (entity, codes) in entities {
        let Some(codes) = codes.as_object() else {
            return Err(format!("`{entity}` must map charge codes to hours"));
        };
        for (code, hours) in codes {
            let Some(value) = hours.as_f64() else {
                return Err(format!("`{entity}` / `{code}` hours must be a number"));
            };
            if !value.is_finite() || value < 0.0 {
                return Err(format!("`{entity}` / `{code}` hours must be non-negative"));
            }
            table.add(entity, code, value);
        }
    }
    Ok(table)
}

fn read_source(path: &Path, collaborator: &str) -> ClientResult<String> {
    fs::read_to_string(path).map_err(|error| match error.kind() {
        ErrorKind::Interrupted | ErrorKind::TimedOut | ErrorKind::WouldBlock => {
            ClientError::collaborator_unavailable(collaborator, &error.to_string())
        }
        _ => ClientError::hours_source_invalid(&path.display().to_string(), &error.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use crate::period::Period;

    use super::{parse_hours_json, parse_timesheet_csv};

    fn skip() -> Vec<String> {
        vec!["PTO".to_string(), "Holiday".to_string()]
    }

    #[test]
    fn prefers_sub_code_and_drops_skip_categories() {
        let csv = "fname,lname,hours,jobcode_1,jobcode_2\n\
                   Ada,Park,6.5,Athena,TO1 Dev\n\
                   Ada,Park,1.5,Athena,\n\
                   Ada,Park,8,PTO,\n\
                   Ben,Ito,0,Athena,TO1 Dev\n\
                   Ada,Park,2,Athena,TO1 Dev\n";
        let parsed = parse_timesheet_csv(csv, &skip(), None);
        assert!(parsed.is_ok());
        if let Ok(result) = parsed {
            assert!(!result.dated);
            assert_eq!(result.hours.get("Ada Park", "TO1 Dev"), 8.5);
            assert_eq!(result.hours.get("Ada Park", "Athena"), 1.5);
            assert_eq!(result.hours.get("Ada Park", "PTO"), 0.0);
            assert_eq!(result.hours.entity_count(), 1);
        }
    }

    #[test]
    fn dated_rows_outside_the_period_are_dropped() {
        let csv = "fname,lname,hours,jobcode_1,jobcode_2,local_date\n\
                   Ada,Park,8,Magni,,2026-01-12\n\
                   Ada,Park,7,Magni,,2026-01-13\n\
                   Ada,Park,9,Magni,,2026-01-19\n";
        let week = Period::parse("2026-01-12");
        assert!(week.is_ok());
        if let Ok(period) = week {
            let parsed = parse_timesheet_csv(csv, &skip(), Some(&period));
            assert!(parsed.is_ok());
            if let Ok(result) = parsed {
                assert!(result.dated);
                assert_eq!(result.hours.get("Ada Park", "Magni"), 15.0);
            }
        }
    }

    #[test]
    fn reports_missing_headers_and_bad_numbers() {
        let missing = parse_timesheet_csv("fname,hours\nAda,8\n", &skip(), None);
        assert!(missing.is_err());
        if let Err(detail) = missing {
            assert!(detail.contains("lname"));
        }

        let bad = parse_timesheet_csv(
            "fname,lname,hours,jobcode_1\nAda,Park,eight,Athena\n",
            &skip(),
            None,
        );
        assert!(bad.is_err());
        if let Err(detail) = bad {
            assert!(detail.contains("row 2"));
        }
    }

    #[test]
    fn json_documents_may_be_flat_or_period_keyed() {
        let january = Period::parse("Jan-26");
        assert!(january.is_ok());
        if let Ok(period) = january {
            let flat = parse_hours_json(r#"{ "Ada Park": { "TO1 Dev": 120 } }"#, &period);
            assert_eq!(flat.map(|table| table.total()).ok(), Some(120.0));

            let keyed = parse_hours_json(
                r#"{
                    "Dec-25": { "Ada Park": { "TO1 Dev": 96 } },
                    "January 2026": { "Ada Park": { "TO1 Dev": 120, "TO1 Ops": 4 } }
                }"#,
                &period,
            );
            assert_eq!(keyed.map(|table| table.total()).ok(), Some(124.0));
        }
    }
}
