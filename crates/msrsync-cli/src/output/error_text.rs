use msrsync_client::ClientError;
use serde_json::Value;

const CONTEXT_KEYS: [&str; 7] = [
    "family", "period", "section", "entity", "charge_code", "columns", "completed_periods",
];

pub fn render_error(error: &ClientError) -> String {
    let mut lines = vec![
        "The run stopped and nothing further was written.".to_string(),
        String::new(),
        format!("  Error:    {}", error.code),
        format!("  Details:  {}", error.message),
    ];

    if let Some(Value::Object(data)) = &error.data {
        for key in CONTEXT_KEYS {
            if let Some(value) = data.get(key).filter(|value| !value.is_null()) {
                lines.push(format!("  {:<9} {}", format!("{key}:"), display_value(value)));
            }
        }
    }

    lines.push(String::new());
    lines.push("What to do next:".to_string());
    if error.recovery_steps.is_empty() {
        lines.push("  1. Retry the command.".to_string());
    } else {
        for (index, step) in error.recovery_steps.iter().enumerate() {
            lines.push(format!("  {}. {step}", index + 1));
        }
    }

    lines.join("\n")
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<String>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use msrsync_client::ClientError;

    use super::render_error;

    #[test]
    fn renders_standard_error_layout() {
        let error = ClientError::invalid_argument_with_recovery(
            "bad input",
            vec!["run msrsync --help".to_string()],
        );

        let rendered = render_error(&error);
        assert!(rendered.contains("  Error:    invalid_argument"));
        assert!(rendered.contains("  Details:  bad input"));
        assert!(rendered.contains("What to do next:"));
        assert!(rendered.contains("  1. run msrsync --help"));
    }

    #[test]
    fn includes_identifying_context() {
        let error = ClientError::ambiguous_column("TO1", "MSR", "2026-01", &[7, 9]);
        let rendered = render_error(&error);
        assert!(rendered.contains("family:   TO1"));
        assert!(rendered.contains("columns:  7, 9"));
    }
}
