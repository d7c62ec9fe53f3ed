use serde::Serialize;
use serde_json::Value;

use crate::API_VERSION;
use crate::contracts::types::RunWarning;
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Serialize)]
pub struct SuccessEnvelope {
    pub ok: bool,
    pub command: String,
    pub version: String,
    pub data: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<RunWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureEnvelope {
    pub ok: bool,
    pub error: ErrorContract,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorContract {
    pub code: String,
    pub message: String,
    pub recovery_steps: Vec<String>,
}

pub fn success<T>(command: &str, data: T) -> ClientResult<SuccessEnvelope>
where
    T: Serialize,
{
    success_with_warnings(command, data, Vec::new())
}

/// A completed command that still wants the caller's attention, such as a
/// rollup over weeks that are not yet actual.
pub fn success_with_warnings<T>(
    command: &str,
    data: T,
    warnings: Vec<RunWarning>,
) -> ClientResult<SuccessEnvelope>
where
    T: Serialize,
{
    let json_data = serde_json::to_value(data)
        .map_err(|err| ClientError::internal_serialization(&err.to_string()))?;
    Ok(SuccessEnvelope {
        ok: true,
        command: command.to_string(),
        version: API_VERSION.to_string(),
        data: json_data,
        warnings,
    })
}

pub fn failure_from_error(error: &ClientError) -> FailureEnvelope {
    FailureEnvelope {
        ok: false,
        error: ErrorContract {
            code: error.code.clone(),
            message: error.message.clone(),
            recovery_steps: error.recovery_steps.clone(),
        },
        data: error.data.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::ClientError;
    use crate::contracts::types::RunWarning;

    use super::{failure_from_error, success, success_with_warnings};

    #[test]
    fn warnings_are_omitted_when_empty() {
        let plain = success("period", json!({ "key": "2026-01" }));
        assert!(plain.is_ok());
        if let Ok(envelope) = plain {
            let value = serde_json::to_value(&envelope).unwrap_or_default();
            assert!(value.get("warnings").is_none());
            assert_eq!(value["data"]["key"], "2026-01");
        }

        let warned = success_with_warnings(
            "rollup",
            json!({}),
            vec![RunWarning::new("incomplete_weeks", "2 weeks are not actual yet")],
        );
        assert!(warned.is_ok());
        if let Ok(envelope) = warned {
            let value = serde_json::to_value(&envelope).unwrap_or_default();
            assert_eq!(value["warnings"][0]["code"], "incomplete_weeks");
        }
    }

    #[test]
    fn failure_keeps_error_context() {
        let error = ClientError::report_locked("TO1", std::path::Path::new("/tmp/TO1.lock"), None);
        let envelope = failure_from_error(&error);
        assert!(!envelope.ok);
        assert_eq!(envelope.error.code, "report_locked");
        assert_eq!(
            envelope.data.as_ref().map(|data| data["family"].clone()),
            Some(json!("TO1"))
        );
    }
}
