use serde_json::Value;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    pub name: &'a str,
    pub align: Align,
}

const INDENT: usize = 2;
const COLUMN_GAP: usize = 2;

pub fn key_value_rows(entries: &[(&str, String)]) -> Vec<String> {
    let label_width = entries
        .iter()
        .map(|(label, _)| label.len())
        .max()
        .unwrap_or(0);
    let padding = " ".repeat(INDENT);

    entries
        .iter()
        .map(|(label, value)| format!("{padding}{label:<label_width$}  {value}"))
        .collect()
}

pub fn render_table(columns: &[Column<'_>], rows: &[Vec<String>]) -> Vec<String> {
    let widths = columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            rows.iter()
                .filter_map(|row| row.get(index))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(column.name.len()))
                .max()
                .unwrap_or(0)
        })
        .collect::<Vec<usize>>();

    let header = columns
        .iter()
        .map(|column| column.name.to_string())
        .collect::<Vec<String>>();
    let mut lines = vec![format_row(columns, &header, &widths)];
    lines.extend(rows.iter().map(|row| format_row(columns, row, &widths)));
    lines
}

fn format_row(columns: &[Column<'_>], cells: &[String], widths: &[usize]) -> String {
    let gap = " ".repeat(COLUMN_GAP);
    let rendered = columns
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(index, (column, width))| {
            let cell = cells.get(index).map(String::as_str).unwrap_or("");
            match column.align {
                Align::Left => format!("{cell:<width$}"),
                Align::Right => format!("{cell:>width$}"),
            }
        })
        .collect::<Vec<String>>()
        .join(&gap);
    format!("{}{}", " ".repeat(INDENT), rendered.trim_end())
}

pub fn text(data: &Value, key: &str) -> String {
    match data.get(key) {
        Some(Value::String(value)) => value.clone(),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

pub fn hours(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_f64)
        .map(|number| format!("{number:.2}"))
        .unwrap_or_else(|| "-".to_string())
}

pub fn money(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_f64)
        .map(|number| format!("${}", group_thousands(number)))
        .unwrap_or_else(|| "-".to_string())
}

fn group_thousands(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::new();
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{cents}")
}

pub fn array<'a>(data: &'a Value, key: &str) -> &'a [Value] {
    data.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
