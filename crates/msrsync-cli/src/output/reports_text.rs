use std::io;

use chrono::{DateTime, Local};
use serde_json::Value;

use super::format::{Align, Column, array, key_value_rows, render_table, text};

pub fn render_report_list(data: &Value) -> io::Result<String> {
    let reports = array(data, "reports");
    let mut lines = vec![format!(
        "{} ({}) has {} stored report(s).",
        text(data, "family"),
        text(data, "cadence"),
        reports.len()
    )];
    let template = text(data, "template_path");
    lines.push(format!(
        "Blank template: {}",
        if template == "-" { "none" } else { template.as_str() }
    ));

    if reports.is_empty() {
        return Ok(lines.join("\n"));
    }

    let columns = [
        Column {
            name: "Period",
            align: Align::Left,
        },
        Column {
            name: "Label",
            align: Align::Left,
        },
        Column {
            name: "Status",
            align: Align::Left,
        },
        Column {
            name: "Updated",
            align: Align::Left,
        },
    ];
    let rows = reports
        .iter()
        .map(|report| {
            vec![
                text(report, "period"),
                text(report, "label"),
                text(report, "status"),
                local_timestamp(report.get("updated_at")),
            ]
        })
        .collect::<Vec<Vec<String>>>();
    lines.push(String::new());
    lines.extend(render_table(&columns, &rows));
    Ok(lines.join("\n"))
}

/// RFC 3339 stamps are shown in local time; anything else is passed through.
fn local_timestamp(value: Option<&Value>) -> String {
    match value.and_then(Value::as_str) {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|stamp| {
                stamp
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            })
            .unwrap_or_else(|_| raw.to_string()),
        None => "-".to_string(),
    }
}

pub fn render_archive(data: &Value) -> io::Result<String> {
    let mut lines = vec![format!(
        "{} {} is now {}.",
        text(data, "family"),
        text(data, "period"),
        text(data, "status")
    )];
    lines.extend(key_value_rows(&[("Report", text(data, "path"))]));
    Ok(lines.join("\n"))
}
