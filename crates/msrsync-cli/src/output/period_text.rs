use std::io;

use serde_json::Value;

use super::format::{array, key_value_rows, text};

pub fn render_period(data: &Value) -> io::Result<String> {
    let join = |key: &str| {
        array(data, key)
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<&str>>()
            .join(", ")
    };

    let mut entries = vec![
        ("Key", text(data, "key")),
        ("Label", text(data, "label")),
        ("Cadence", text(data, "cadence")),
        ("Covers", format!("{} to {}", text(data, "start"), text(data, "end"))),
        ("Accepts", join("variants")),
        ("Previous", text(data, "previous")),
        ("Next", text(data, "next")),
    ];
    let work_weeks = join("work_weeks");
    if !work_weeks.is_empty() {
        entries.push(("Work weeks", work_weeks));
    }

    let mut lines = vec![format!("`{}` normalizes to {}.", text(data, "input"), text(data, "key"))];
    lines.extend(key_value_rows(&entries));
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::render_period;

    #[test]
    fn shows_variants_and_work_weeks() {
        let data = json!({
            "input": "January 2026",
            "key": "2026-01",
            "label": "Jan-26",
            "cadence": "monthly",
            "start": "2026-01-01",
            "end": "2026-01-31",
            "variants": ["2026-01", "Jan-26", "January 2026"],
            "work_weeks": ["2026-W01", "2026-W02"],
            "previous": "2025-12",
            "next": "2026-02"
        });
        let rendered = render_period(&data);
        assert!(rendered.is_ok());
        if let Ok(body) = rendered {
            assert!(body.starts_with("`January 2026` normalizes to 2026-01."));
            assert!(body.contains("2026-01, Jan-26, January 2026"));
            assert!(body.contains("Work weeks"));
        }
    }
}
