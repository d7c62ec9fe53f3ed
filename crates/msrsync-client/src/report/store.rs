use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use tracing::{debug, warn};

use crate::period::{Cadence, Period, calendar};
use crate::report::model::ReportInstance;
use crate::state::{completed_dir, map_io_error, templates_dir, write_atomic};
use crate::{ClientError, ClientResult};

const DOCUMENT_EXTENSION: &str = "json";
const EDITOR_LOCK_PREFIX: &str = "~$";

pub fn template_path(home: &Path, family: &str) -> PathBuf {
    templates_dir(home).join(format!("{family}.{DOCUMENT_EXTENSION}"))
}

/// Where the instance for `period` lives:
/// `completed/<YYYY>/<MM-Mon>/<FAMILY>_<Mon-YY>.json` for months and
/// `completed/<YYYY>/Q<q>/<FAMILY>_<start>_to_<end>.json` for weeks.
pub fn instance_path(home: &Path, family: &str, period: &Period) -> PathBuf {
    let root = completed_dir(home);
    match period {
        Period::Month { year, month } => root
            .join(format!("{year:04}"))
            .join(format!("{month:02}-{}", calendar::short_month_name(*month)))
            .join(format!("{family}_{}.{DOCUMENT_EXTENSION}", period.label())),
        Period::Week { monday } => root
            .join(format!("{:04}", monday.year()))
            .join(format!("Q{}", calendar::quarter_of(monday.month())))
            .join(format!(
                "{family}_{}_to_{}.{DOCUMENT_EXTENSION}",
                monday.format("%Y-%m-%d"),
                period.end_date().format("%Y-%m-%d")
            )),
    }
}

/// Rebuilds the family's instance chain from the completed-reports tree.
pub fn scan_chain(home: &Path, family: &str, cadence: Cadence) -> ClientResult<BTreeMap<Period, PathBuf>> {
    let mut files = Vec::new();
    collect_documents(&completed_dir(home), &mut files)?;
    files.sort();

    let mut chain: BTreeMap<Period, PathBuf> = BTreeMap::new();
    for path in files {
        let Some(period) = period_from_file_name(&path, family, cadence) else {
            continue;
        };
        if period.cadence() != cadence {
            return Err(ClientError::report_corrupt(
                &path,
                &format!(
                    "{} instance found in a {} family",
                    period.cadence().as_str(),
                    cadence.as_str()
                ),
            ));
        }

        let canonical = instance_path(home, family, &period);
        if let Some(existing) = chain.get(&period) {
            warn!(
                family,
                period = %period,
                kept = %existing.display(),
                ignored = %path.display(),
                "two report instances claim the same period"
            );
            if path != canonical {
                continue;
            }
        }
        chain.insert(period, path);
    }

    debug!(family, instances = chain.len(), "scanned report chain");
    Ok(chain)
}

fn collect_documents(directory: &Path, files: &mut Vec<PathBuf>) -> ClientResult<()> {
    if !directory.exists() {
        return Ok(());
    }
    let entries = fs::read_dir(directory).map_err(|error| map_io_error(directory, &error))?;
    for entry in entries {
        let entry = entry.map_err(|error| map_io_error(directory, &error))?;
        let path = entry.path();
        if path.is_dir() {
            collect_documents(&path, files)?;
        } else if is_report_document(&path) {
            files.push(path);
        }
    }
    Ok(())
}

fn is_report_document(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|value| value.to_str()) else {
        return false;
    };
    !name.starts_with(EDITOR_LOCK_PREFIX)
        && !name.starts_with('.')
        && path
            .extension()
            .is_some_and(|extension| extension == DOCUMENT_EXTENSION)
}

fn period_from_file_name(path: &Path, family: &str, cadence: Cadence) -> Option<Period> {
    let stem = path.file_stem()?.to_str()?;
    let label = stem.strip_prefix(family)?.strip_prefix('_')?;

    if let Some((start, _end)) = label.split_once("_to_") {
        let monday = NaiveDate::parse_from_str(start, "%Y-%m-%d").ok()?;
        return Some(Period::week_containing(monday));
    }

    match Period::parse_for(label, cadence) {
        Ok(period) => Some(period),
        Err(_) => {
            debug!(file = %path.display(), "skipping file without a period label");
            None
        }
    }
}

pub fn load_instance(path: &Path) -> ClientResult<ReportInstance> {
    let body = fs::read_to_string(path).map_err(|error| map_io_error(path, &error))?;
    serde_json::from_str::<ReportInstance>(&body)
        .map_err(|error| ClientError::report_corrupt(path, &error.to_string()))
}

pub fn save_instance(path: &Path, instance: &ReportInstance) -> ClientResult<()> {
    let body = serde_json::to_vec_pretty(instance)
        .map_err(|error| ClientError::internal_serialization(&error.to_string()))?;
    write_atomic(path, &body)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::tempdir;

    use crate::period::{Cadence, Period};

    use super::{instance_path, scan_chain};

    #[test]
    fn instance_paths_follow_period_folders() {
        let home = Path::new("/msrs");
        let month = Period::parse("Jan-26");
        let week = Period::parse("2026-03-30");
        assert!(month.is_ok() && week.is_ok());
        if let (Ok(month), Ok(week)) = (month, week) {
            assert_eq!(
                instance_path(home, "TO1", &month),
                Path::new("/msrs/completed/2026/01-Jan/TO1_Jan-26.json")
            );
            assert_eq!(
                instance_path(home, "WSR", &week),
                Path::new("/msrs/completed/2026/Q1/WSR_2026-03-30_to_2026-04-03.json")
            );
        }
    }

    #[test]
    fn scan_ignores_lock_files_and_other_families() {
        let temp = tempdir();
        assert!(temp.is_ok());
        if let Ok(dir) = temp {
            let folder = dir.path().join("completed").join("2025").join("12-Dec");
            assert!(fs::create_dir_all(&folder).is_ok());
            for name in [
                "TO1_Dec-25.json",
                "~$TO1_Dec-25.json",
                "TO10_Dec-25.json",
                "TO1_notes.json",
                "TO1_Nov-25.xlsx",
            ] {
                assert!(fs::write(folder.join(name), "{}").is_ok());
            }

            let chain = scan_chain(dir.path(), "TO1", Cadence::Monthly);
            assert!(chain.is_ok());
            if let Ok(chain) = chain {
                let keys = chain.keys().map(Period::key).collect::<Vec<String>>();
                assert_eq!(keys, vec!["2025-12".to_string()]);
            }
        }
    }

    #[test]
    fn weekly_file_in_monthly_family_is_corrupt() {
        let temp = tempdir();
        assert!(temp.is_ok());
        if let Ok(dir) = temp {
            let folder = dir.path().join("completed").join("2026").join("Q1");
            assert!(fs::create_dir_all(&folder).is_ok());
            assert!(fs::write(folder.join("TO1_2026-01-12_to_2026-01-16.json"), "{}").is_ok());

            let chain = scan_chain(dir.path(), "TO1", Cadence::Monthly);
            assert_eq!(chain.err().map(|error| error.code), Some("report_corrupt".to_string()));
        }
    }
}
