use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::config::FamilyConfig;
use crate::period::{Cadence, Period};
use crate::setup::{WorkspaceContext, ensure_initialized, ensure_initialized_at};
use crate::sources::hours::{CsvExportSource, HoursSource, JsonHoursSource};
use crate::{ClientError, ClientResult};

pub(crate) fn load_setup(home_override: Option<&Path>) -> ClientResult<WorkspaceContext> {
    if let Some(home) = home_override {
        return ensure_initialized_at(home);
    }
    ensure_initialized()
}

pub(crate) fn timestamp_now() -> String {
    DateTime::<Utc>::from(SystemTime::now()).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses a period argument for a family and rejects labels of the other cadence.
pub(crate) fn parse_family_period(
    input: &str,
    family: &str,
    family_config: &FamilyConfig,
    command: &str,
) -> ClientResult<Period> {
    let period = Period::parse_for(input, family_config.cadence)?;
    if period.cadence() != family_config.cadence {
        return Err(ClientError::invalid_argument_for_command(
            &format!(
                "`{input}` is a {} period but {family} reports are {}.",
                period.cadence().as_str(),
                family_config.cadence.as_str()
            ),
            Some(command),
        ));
    }
    Ok(period)
}

pub(crate) fn parse_month(input: &str, command: &str) -> ClientResult<Period> {
    let period = Period::parse_for(input, Cadence::Monthly)?;
    if period.cadence() != Cadence::Monthly {
        return Err(ClientError::invalid_argument_for_command(
            &format!("`{input}` names a week; expected a month such as `Jan-26`."),
            Some(command),
        ));
    }
    Ok(period)
}

/// Picks the hours adapter from the file extension.
pub(crate) fn hours_source_for(
    path: &Path,
    skip_categories: &[String],
) -> ClientResult<Box<dyn HoursSource>> {
    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("csv") => Ok(Box::new(CsvExportSource::new(path, skip_categories))),
        Some("json") => Ok(Box::new(JsonHoursSource::new(path))),
        _ => Err(ClientError::hours_source_invalid(
            &path.display().to_string(),
            "expected a `.csv` timesheet export or a `.json` hours document",
        )),
    }
}
