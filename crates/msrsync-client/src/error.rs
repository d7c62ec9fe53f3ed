use std::path::Path;

use serde_json::{Value, json};
use thiserror::Error;

pub(crate) const UPDATE_HELP_COMMAND: &str = "msrsync update --help";

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    pub code: String,
    pub message: String,
    pub recovery_steps: Vec<String>,
    pub data: Option<Value>,
}

impl ClientError {
    pub fn new(code: &str, message: &str, recovery_steps: Vec<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            recovery_steps,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Transient collaborator failures are the only errors the retry loop may absorb.
    pub fn is_transient(&self) -> bool {
        self.code == "collaborator_unavailable"
    }

    pub fn invalid_argument(message: &str) -> Self {
        Self::invalid_argument_for_command(message, None)
    }

    pub fn invalid_argument_for_command(message: &str, command: Option<&str>) -> Self {
        let help_hint = match command {
            Some(cmd) => format!("Run `msrsync {cmd} --help` for usage."),
            None => "Run `msrsync --help` for usage.".to_string(),
        };
        let error = Self::new("invalid_argument", message, vec![help_hint]);
        if let Some(cmd) = command {
            return error.with_data(json!({
                "command_hint": cmd,
            }));
        }
        error
    }

    pub fn invalid_argument_with_recovery(message: &str, recovery_steps: Vec<String>) -> Self {
        Self::new("invalid_argument", message, recovery_steps)
    }

    pub fn invalid_period_format(input: &str) -> Self {
        Self::new(
            "invalid_period_format",
            &format!("Cannot parse period `{input}`."),
            vec![
                "Use `Jan-26`, `January 2026`, or `2026-01` for months.".to_string(),
                "Use a date such as `2026-01-12` or `2026-W03` for weeks.".to_string(),
            ],
        )
        .with_data(json!({
            "input": input,
        }))
    }

    pub fn no_template_available(family: &str, period: &str, template_path: &Path) -> Self {
        let location = template_path.display().to_string();
        Self::new(
            "no_template_available",
            &format!(
                "No {family} report exists before {period} and no blank template was found."
            ),
            vec![
                format!("Place a completed {family} report under the completed reports folder."),
                format!("Or drop a blank template at `{location}`."),
            ],
        )
        .with_data(json!({
            "family": family,
            "period": period,
            "template_path": location,
        }))
    }

    pub fn column_not_found(family: &str, section: &str, period: &str) -> Self {
        Self::new(
            "column_not_found",
            &format!("No header column in {family} `{section}` matches {period}."),
            vec![
                "Extend the report header with a column for this period.".to_string(),
                "Run `msrsync period <label>` to check how header labels normalize.".to_string(),
            ],
        )
        .with_data(json!({
            "family": family,
            "section": section,
            "period": period,
        }))
    }

    pub fn ambiguous_column(family: &str, section: &str, period: &str, columns: &[u32]) -> Self {
        Self::new(
            "ambiguous_column",
            &format!(
                "{} header columns in {family} `{section}` match {period}. No values were written.",
                columns.len()
            ),
            vec!["Fix the duplicated or malformed header labels, then rerun.".to_string()],
        )
        .with_data(json!({
            "family": family,
            "section": section,
            "period": period,
            "columns": columns,
        }))
    }

    pub fn unmapped_entity(entity: &str, charge_code: &str, family: Option<&str>) -> Self {
        let scope = match family {
            Some(value) => format!(" for {value}"),
            None => String::new(),
        };
        Self::new(
            "unmapped_entity",
            &format!("`{entity}` / `{charge_code}` has no row mapping{scope}."),
            vec![
                "Add an entry for this entity and charge code to the mappings configuration."
                    .to_string(),
            ],
        )
        .with_data(json!({
            "entity": entity,
            "charge_code": charge_code,
            "family": family,
        }))
    }

    pub fn ambiguous_entity_mapping(
        entity: &str,
        charge_code: &str,
        family: &str,
        rows: &[(String, u32)],
    ) -> Self {
        let targets = rows
            .iter()
            .map(|(section, row)| json!({ "section": section, "row": row }))
            .collect::<Vec<Value>>();
        Self::new(
            "ambiguous_entity_mapping",
            &format!(
                "`{entity}` / `{charge_code}` maps to {} rows in {family}.",
                rows.len()
            ),
            vec!["Keep exactly one mapping entry per entity, charge code, and family.".to_string()],
        )
        .with_data(json!({
            "entity": entity,
            "charge_code": charge_code,
            "family": family,
            "targets": targets,
        }))
    }

    pub fn cell_write_conflict(
        family: &str,
        section: &str,
        row: u32,
        column: u32,
        existing: f64,
        incoming: f64,
    ) -> Self {
        Self::new(
            "cell_write_conflict",
            &format!(
                "{family} `{section}` row {row} column {column} was written twice ({existing} then {incoming})."
            ),
            vec![
                "Check for duplicated mapping rows or give both mappings `combine: sum`."
                    .to_string(),
            ],
        )
        .with_data(json!({
            "family": family,
            "section": section,
            "row": row,
            "column": column,
            "existing": existing,
            "incoming": incoming,
        }))
    }

    pub fn report_locked(family: &str, lock_path: &Path, pid: Option<u32>) -> Self {
        let location = lock_path.display().to_string();
        let holder = pid.map_or_else(String::new, |pid| format!(" (pid {pid})"));
        Self::new(
            "report_locked",
            &format!("Another run{holder} holds the {family} report lock at `{location}`."),
            vec![
                "Wait for the other run to finish.".to_string(),
                format!(
                    "If no run is active, the lock was left by a run that crashed; remove `{location}` and retry."
                ),
            ],
        )
        .with_data(json!({
            "family": family,
            "lock_path": location,
            "pid": pid,
        }))
    }

    pub fn report_archived(family: &str, period: &str, path: &Path) -> Self {
        Self::new(
            "report_archived",
            &format!("The {family} report for {period} is completed and can no longer change."),
            vec!["Update a later period instead.".to_string()],
        )
        .with_data(json!({
            "family": family,
            "period": period,
            "path": path.display().to_string(),
        }))
    }

    pub fn report_not_found(family: &str, period: &str) -> Self {
        Self::new(
            "report_not_found",
            &format!("No {family} report exists for {period}."),
            vec![format!("Run `msrsync reports list {family}` to see stored periods.")],
        )
        .with_data(json!({
            "family": family,
            "period": period,
        }))
    }

    pub fn report_corrupt(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "report_corrupt",
            &format!("Report document at `{location}` is unreadable: {detail}"),
            vec![format!("Restore `{location}` from a backup or remove it.")],
        )
    }

    pub fn unknown_family(family: &str) -> Self {
        Self::new(
            "unknown_family",
            &format!("Report family `{family}` is not configured."),
            vec!["Add the family to the `families` table of the configuration.".to_string()],
        )
        .with_data(json!({
            "family": family,
        }))
    }

    pub fn config_missing(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "config_missing",
            &format!("Configuration file `{location}` does not exist."),
            vec![format!("Create `{location}` with families and mappings.")],
        )
    }

    pub fn config_invalid(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "config_invalid",
            &format!("Configuration at `{location}` is invalid: {detail}"),
            vec![format!("Fix `{location}` and rerun.")],
        )
    }

    pub fn collaborator_unavailable(collaborator: &str, detail: &str) -> Self {
        Self::new(
            "collaborator_unavailable",
            &format!("{collaborator} is temporarily unavailable: {detail}"),
            Vec::new(),
        )
    }

    pub fn collaborator_failed(collaborator: &str, attempts: u32, detail: &str) -> Self {
        Self::new(
            "collaborator_failed",
            &format!("{collaborator} failed after {attempts} attempts: {detail}"),
            vec!["Nothing was written. Retry the run once the service recovers.".to_string()],
        )
        .with_data(json!({
            "collaborator": collaborator,
            "attempts": attempts,
        }))
    }

    pub fn hours_source_invalid(source: &str, detail: &str) -> Self {
        Self::invalid_argument_with_recovery(
            &format!("Hours input `{source}` is invalid: {detail}"),
            vec![
                "Provide a timesheet CSV export or a JSON object of entity -> charge code -> hours."
                    .to_string(),
                format!("Run `{UPDATE_HELP_COMMAND}` for the accepted formats."),
            ],
        )
    }

    pub fn internal_serialization(message: &str) -> Self {
        Self::new("internal_serialization_error", message, Vec::new())
    }

    pub fn workspace_permission_denied(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "workspace_permission_denied",
            &format!("Cannot write to report workspace at `{location}`: {detail}"),
            vec![format!(
                "Grant write access to `{location}` or set `MSRSYNC_HOME` to a writable directory."
            )],
        )
    }

    pub fn workspace_init_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "workspace_init_failed",
            &format!("Report workspace setup failed at `{location}`: {detail}"),
            Vec::new(),
        )
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
