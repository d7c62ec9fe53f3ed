use std::io;

use msrsync_client::contracts::types::RunWarning;
use serde_json::Value;

use super::format::{Align, Column, array, hours, key_value_rows, money, render_table, text};

pub fn render_rollup(data: &Value, warnings: &[RunWarning]) -> io::Result<String> {
    let dry_run = data.get("dry_run").and_then(Value::as_bool).unwrap_or(false);
    let mut lines = vec![format!(
        "{} rollup for {}{}",
        text(data, "family"),
        text(data, "month_label"),
        if dry_run { " (dry run, not stored)" } else { "" }
    )];
    lines.push(String::new());
    lines.extend(key_value_rows(&[
        ("Source week", text(data, "source_period")),
        ("Hours", hours(data.get("total_hours"))),
        ("Cost", money(data.get("total_cost"))),
    ]));

    let weeks = array(data, "weeks")
        .iter()
        .map(|week| format!("{} {}", text(week, "week"), text(week, "state")))
        .collect::<Vec<String>>();
    if !weeks.is_empty() {
        lines.push(String::new());
        lines.push("Weeks:".to_string());
        lines.extend(weeks.into_iter().map(|week| format!("  {week}")));
    }

    let columns = [
        Column {
            name: "Entity",
            align: Align::Left,
        },
        Column {
            name: "Hours",
            align: Align::Right,
        },
        Column {
            name: "Rate",
            align: Align::Right,
        },
        Column {
            name: "Cost",
            align: Align::Right,
        },
    ];
    let rows = array(data, "records")
        .iter()
        .map(|record| {
            vec![
                text(record, "entity"),
                hours(record.get("hours")),
                money(record.get("rate")),
                money(record.get("cost")),
            ]
        })
        .collect::<Vec<Vec<String>>>();
    if !rows.is_empty() {
        lines.push(String::new());
        lines.extend(render_table(&columns, &rows));
    }

    if let Some(export) = data.get("export").filter(|value| !value.is_null()) {
        lines.push(String::new());
        lines.push(format!(
            "Exported {} line item(s) to {}",
            text(export, "line_items"),
            text(export, "destination")
        ));
    }

    for warning in warnings {
        lines.push(String::new());
        lines.push(format!("Warning ({}): {}", warning.code, warning.message));
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use msrsync_client::contracts::types::RunWarning;
    use serde_json::json;

    use super::render_rollup;

    #[test]
    fn renders_records_and_incomplete_week_warning() {
        let data = json!({
            "family": "WSR",
            "month": "2026-01",
            "month_label": "Jan-26",
            "dry_run": false,
            "source_period": "2026-W05",
            "source_path": "/x",
            "persisted": true,
            "weeks": [
                { "week": "2026-W04", "column": 7, "state": "actual" },
                { "week": "2026-W05", "column": 8, "state": "estimate" }
            ],
            "records": [{ "entity": "Ada Park", "hours": 95.0, "rate": 100.0, "cost": 9500.0, "month": "2026-01" }],
            "total_hours": 95.0,
            "total_cost": 9500.0
        });
        let warnings = vec![RunWarning::new("incomplete_weeks", "1 of 5 weeks in Jan-26 are not actual yet; totals are partial.")];

        let rendered = render_rollup(&data, &warnings);
        assert!(rendered.is_ok());
        if let Ok(body) = rendered {
            assert!(body.starts_with("WSR rollup for Jan-26"));
            assert!(body.contains("2026-W05 estimate"));
            assert!(body.contains("$9,500.00"));
            assert!(body.contains("Warning (incomplete_weeks)"));
        }
    }
}
