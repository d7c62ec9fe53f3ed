use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use msrsync_client::commands::update::{self, UpdateRunOptions};
use msrsync_client::report::model::{Cell, CellStatus, ReportInstance};
use msrsync_client::{ClientResult, SuccessEnvelope};
use tempfile::{Builder, TempDir};

pub const MSR_SECTION: &str = "Extension Period MSR";
pub const WSR_SECTION: &str = "CLIN Level Detail";

pub const CONFIG: &str = r#"{
    "families": {
        "TO1": {
            "cadence": "monthly",
            "sections": {
                "Extension Period MSR": {
                    "header_row": 3,
                    "status_row": 4,
                    "totals": [{ "row": 8, "from": 5, "to": 7 }]
                }
            }
        },
        "WSR": {
            "cadence": "weekly",
            "sections": {
                "CLIN Level Detail": { "header_row": 3, "status_row": 2 }
            },
            "rollup": { "section": "CLIN Level Detail" }
        }
    },
    "rates": { "Ada Park": 100.0, "Ben Ito": 150.0 },
    "mappings": [
        { "entity": "Ada Park", "charge_code": "TO1 Dev", "family": "TO1", "section": "Extension Period MSR", "row": 5 },
        { "entity": "Ben Ito", "charge_code": "TO1 Dev", "family": "TO1", "section": "Extension Period MSR", "row": 6 },
        { "entity": "Ada Park", "charge_code": "Magni", "family": "WSR", "section": "CLIN Level Detail", "row": 4 },
        { "entity": "Ben Ito", "charge_code": "Magni", "family": "WSR", "section": "CLIN Level Detail", "row": 5 }
    ],
    "retry": { "attempts": 3, "backoff_ms": 0 }
}"#;

pub fn temp_home(prefix: &str) -> std::io::Result<(TempDir, PathBuf)> {
    let dir = Builder::new().prefix(prefix).tempdir()?;
    let home = dir.path().join("MSRs");
    fs::create_dir_all(home.join("config"))?;
    fs::create_dir_all(home.join("templates"))?;
    fs::write(home.join("config").join("msrsync.json"), CONFIG)?;
    Ok((dir, home))
}

pub fn write_file(path: &Path, body: &str) {
    let result = fs::write(path, body);
    assert!(result.is_ok());
}

pub fn write_template(home: &Path, template: &ReportInstance) {
    let body = serde_json::to_string_pretty(template);
    assert!(body.is_ok());
    if let Ok(json) = body {
        write_file(
            &home.join("templates").join(format!("{}.json", template.family)),
            &json,
        );
    }
}

/// Monthly template: Nov-25..Feb-26 in columns 5..8, entity rows 5 and 6,
/// total in row 8. Dec carries historical actual styling; Jan holds estimates.
pub fn monthly_template() -> ReportInstance {
    let mut template = ReportInstance::blank("TO1");
    let section = template.section_mut(MSR_SECTION);
    for (column, label) in [(5, "Nov-25"), (6, "Dec-25"), (7, "January 2026"), (8, "2026-02")] {
        section.set(3, column, Cell::text(label));
    }
    for row in [5, 6] {
        section.set(row, 6, Cell::number(0.0).styled("fill:actual"));
        section.set(
            row,
            7,
            Cell::number(160.0)
                .styled("fill:estimate")
                .with_status(CellStatus::Estimate),
        );
    }
    section.set(4, 6, Cell::text("Estimate").styled("fill:actual"));
    template
}

/// Weekly template: one dated header per January 2026 work week in columns
/// 4..8, with an estimate already sitting in the last week.
pub fn weekly_template() -> ReportInstance {
    let mut template = ReportInstance::blank("WSR");
    let section = template.section_mut(WSR_SECTION);
    let mondays = [
        (2025, 12, 29),
        (2026, 1, 5),
        (2026, 1, 12),
        (2026, 1, 19),
        (2026, 1, 26),
    ];
    for (offset, (year, month, day)) in mondays.into_iter().enumerate() {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            section.set(3, 4 + offset as u32, Cell::date(date));
        }
    }
    section.set(4, 8, Cell::number(40.0).with_status(CellStatus::Estimate));
    template
}

pub fn read_instance(path: &Path) -> Option<ReportInstance> {
    let body = fs::read_to_string(path).ok()?;
    serde_json::from_str::<ReportInstance>(&body).ok()
}

pub fn monthly_instance_path(home: &Path, year: i32, folder: &str, label: &str) -> PathBuf {
    home.join("completed")
        .join(year.to_string())
        .join(folder)
        .join(format!("TO1_{label}.json"))
}

pub fn json_files_under(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return found;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            found.extend(json_files_under(&path));
        } else if path.extension().is_some_and(|extension| extension == "json") {
            found.push(path);
        }
    }
    found.sort();
    found
}

pub fn run_update(
    home: &Path,
    family: &str,
    period: &str,
    hours_path: &Path,
    dry_run: bool,
) -> ClientResult<SuccessEnvelope> {
    update::run_with_options(UpdateRunOptions {
        family: family.to_string(),
        period: Some(period.to_string()),
        hours_path: Some(hours_path.to_path_buf()),
        dry_run,
        home_override: Some(home),
        ..UpdateRunOptions::default()
    })
}

pub fn run_update_range(
    home: &Path,
    family: &str,
    from: &str,
    to: &str,
    hours_path: &Path,
) -> ClientResult<SuccessEnvelope> {
    update::run_with_options(UpdateRunOptions {
        family: family.to_string(),
        from: Some(from.to_string()),
        to: Some(to.to_string()),
        hours_path: Some(hours_path.to_path_buf()),
        home_override: Some(home),
        ..UpdateRunOptions::default()
    })
}
