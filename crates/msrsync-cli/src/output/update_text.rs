use std::io;

use serde_json::Value;

use super::format::{Align, Column, array, hours, key_value_rows, render_table, text};

pub fn render_update(data: &Value) -> io::Result<String> {
    let dry_run = data.get("dry_run").and_then(Value::as_bool).unwrap_or(false);
    let periods = array(data, "periods");

    let mut lines = vec![if dry_run {
        format!(
            "Dry run for {}: {} period(s) resolved, nothing written.",
            text(data, "family"),
            periods.len()
        )
    } else {
        format!(
            "Updated {} for {} period(s).",
            text(data, "family"),
            periods.len()
        )
    }];
    lines.push(String::new());
    lines.extend(key_value_rows(&[
        ("Run", text(data, "run_id")),
        ("Cadence", text(data, "cadence")),
        ("Hours from", text(data, "hours_source")),
    ]));

    for period in periods {
        lines.push(String::new());
        lines.extend(render_period(period));
    }

    Ok(lines.join("\n"))
}

pub fn render_update_all(data: &Value) -> io::Result<String> {
    let dry_run = data.get("dry_run").and_then(Value::as_bool).unwrap_or(false);
    let families = array(data, "families");
    let mut lines = vec![format!(
        "{} {}: {} of {} monthly families updated.",
        if dry_run { "Dry run for" } else { "Update for" },
        text(data, "period_label"),
        text(data, "succeeded"),
        families.len()
    )];
    lines.push(String::new());
    lines.extend(key_value_rows(&[("Hours from", text(data, "hours_source"))]));

    let columns = [
        Column {
            name: "Family",
            align: Align::Left,
        },
        Column {
            name: "Result",
            align: Align::Left,
        },
        Column {
            name: "Hours",
            align: Align::Right,
        },
        Column {
            name: "Report or error",
            align: Align::Left,
        },
    ];
    let empty = Value::Null;
    let rows = families
        .iter()
        .map(|family| {
            let ok = family.get("ok").and_then(Value::as_bool).unwrap_or(false);
            if ok {
                let period = array(family.get("update").unwrap_or(&empty), "periods")
                    .first()
                    .cloned()
                    .unwrap_or(Value::Null);
                vec![
                    text(family, "family"),
                    "updated".to_string(),
                    hours(period.get("hours_total")),
                    text(&period, "instance_path"),
                ]
            } else {
                let error = family.get("error").unwrap_or(&empty);
                vec![
                    text(family, "family"),
                    "failed".to_string(),
                    "-".to_string(),
                    format!("{}: {}", text(error, "code"), text(error, "message")),
                ]
            }
        })
        .collect::<Vec<Vec<String>>>();
    lines.push(String::new());
    lines.extend(render_table(&columns, &rows));
    Ok(lines.join("\n"))
}

fn render_period(period: &Value) -> Vec<String> {
    let empty = Value::Null;
    let base = period.get("base").unwrap_or(&empty);
    let base_text = match base.get("kind").and_then(Value::as_str) {
        Some("template") => "blank template".to_string(),
        _ => format!("{} report", text(base, "period")),
    };

    let mut lines = vec![format!(
        "{} ({})",
        text(period, "period_label"),
        text(period, "period")
    )];
    lines.extend(key_value_rows(&[
        ("Based on", base_text),
        ("Hours", hours(period.get("hours_total"))),
        (
            "Entities",
            text(period, "entity_count"),
        ),
        ("Report", text(period, "instance_path")),
    ]));

    let write = period.get("write").unwrap_or(&empty);
    let columns = [
        Column {
            name: "Section",
            align: Align::Left,
        },
        Column {
            name: "Column",
            align: Align::Right,
        },
        Column {
            name: "Cells",
            align: Align::Right,
        },
        Column {
            name: "Hours",
            align: Align::Right,
        },
    ];
    let rows = array(write, "sections")
        .iter()
        .map(|section| {
            vec![
                text(section, "section"),
                text(section, "column"),
                text(section, "cells_written"),
                hours(section.get("hours")),
            ]
        })
        .collect::<Vec<Vec<String>>>();
    if !rows.is_empty() {
        lines.push(String::new());
        lines.extend(render_table(&columns, &rows));
    }
    lines
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{render_update, render_update_all};

    #[test]
    fn renders_each_period_with_its_sections() {
        let data = json!({
            "family": "TO1",
            "cadence": "monthly",
            "dry_run": false,
            "run_id": "run_01",
            "hours_source": "timesheet export",
            "periods": [{
                "period": "2026-01",
                "period_label": "Jan-26",
                "base": { "kind": "prior", "period": "2025-12", "path": "/x" },
                "instance_path": "/msrs/completed/2026/01-Jan/TO1_Jan-26.json",
                "replaced_draft": false,
                "persisted": true,
                "hours_total": 152.5,
                "entity_count": 2,
                "write": {
                    "period": "2026-01",
                    "sections": [{ "section": "MSR", "column": 7, "hours": 152.5, "cells_written": 3 }],
                    "cells": [],
                    "totals": []
                }
            }]
        });

        let rendered = render_update(&data);
        assert!(rendered.is_ok());
        if let Ok(body) = rendered {
            assert!(body.starts_with("Updated TO1 for 1 period(s)."));
            assert!(body.contains("Jan-26 (2026-01)"));
            assert!(body.contains("2025-12 report"));
            assert!(body.contains("152.50"));
        }
    }

    #[test]
    fn all_families_summary_lists_failures_inline() {
        let data = json!({
            "period": "2026-01",
            "period_label": "Jan-26",
            "dry_run": false,
            "hours_source": "timesheet export",
            "succeeded": 1,
            "failed": 1,
            "families": [
                {
                    "family": "TO1",
                    "ok": true,
                    "update": { "periods": [{ "hours_total": 152.5, "instance_path": "/msrs/TO1_Jan-26.json" }] }
                },
                {
                    "family": "TO4",
                    "ok": false,
                    "error": { "code": "no_template_available", "message": "No TO4 template.", "recovery_steps": [] }
                }
            ]
        });

        let rendered = render_update_all(&data);
        assert!(rendered.is_ok());
        if let Ok(body) = rendered {
            assert!(body.starts_with("Update for Jan-26: 1 of 2 monthly families updated."));
            assert!(body.contains("/msrs/TO1_Jan-26.json"));
            assert!(body.contains("no_template_available: No TO4 template."));
        }
    }
}
