use std::io;

use msrsync_client::contracts::envelope::failure_from_error;
use msrsync_client::{ClientError, SuccessEnvelope};
use serde::Serialize;

pub fn render_success_json(success: &SuccessEnvelope) -> io::Result<String> {
    serialize_json_pretty(success)
}

pub fn render_error_json(error: &ClientError) -> io::Result<String> {
    serialize_json_pretty(&failure_from_error(error))
}

fn serialize_json_pretty<T: Serialize>(value: &T) -> io::Result<String> {
    serde_json::to_string_pretty(value).map_err(io::Error::other)
}

#[cfg(test)]
mod tests {
    use msrsync_client::ClientError;
    use msrsync_client::contracts::envelope::success;
    use serde_json::{Value, json};

    use super::{render_error_json, render_success_json};

    #[test]
    fn success_json_carries_command_and_data() {
        let envelope = success("period", json!({ "key": "2026-W03" }));
        assert!(envelope.is_ok());
        if let Ok(value) = envelope {
            let rendered = render_success_json(&value)
                .ok()
                .and_then(|body| serde_json::from_str::<Value>(&body).ok());
            assert!(rendered.is_some());
            if let Some(parsed) = rendered {
                assert_eq!(parsed["ok"], true);
                assert_eq!(parsed["command"], "period");
                assert_eq!(parsed["data"]["key"], "2026-W03");
            }
        }
    }

    #[test]
    fn error_json_keeps_code_recovery_and_context() {
        let error = ClientError::unmapped_entity("Dee Ray", "PIVOT Dev", None);
        let rendered = render_error_json(&error)
            .ok()
            .and_then(|body| serde_json::from_str::<Value>(&body).ok());
        assert!(rendered.is_some());
        if let Some(parsed) = rendered {
            assert_eq!(parsed["ok"], false);
            assert_eq!(parsed["error"]["code"], "unmapped_entity");
            assert!(parsed["error"]["recovery_steps"].is_array());
            assert_eq!(parsed["data"]["entity"], "Dee Ray");
        }
    }
}
