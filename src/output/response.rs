//! CLI response formatting and output.
//!
//! Provides JSON envelope, printing, and exit code mapping.

use hostrun::error::Hint;
use hostrun::{Error, ErrorCode, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CliResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CliError>,
}

#[derive(Debug, Serialize)]
pub struct CliError {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<Hint>>,
}

impl<T: Serialize> CliResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize response".to_string()))
        })
    }
}

impl CliResponse<()> {
    pub fn from_error(err: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(CliError {
                code: err.code.as_str().to_string(),
                message: err.message.clone(),
                details: err.details.clone(),
                hints: if err.hints.is_empty() {
                    None
                } else {
                    Some(err.hints.clone())
                },
            }),
        }
    }
}

fn print_response<T: Serialize>(response: &CliResponse<T>) -> Result<()> {
    use std::io::{self, Write};

    let payload = response.to_json()?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", payload) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(Error::internal_io(
            e.to_string(),
            Some("write stdout".to_string()),
        ));
    }
    Ok(())
}

/// Errors after an interactive run still need to reach the operator.
pub fn print_error_text(err: &Error) {
    eprintln!("Error: {}", err.message);
    for hint in &err.hints {
        eprintln!("  hint: {}", hint.message);
    }
}

pub fn map_cmd_result_to_json<T: Serialize>(
    result: Result<(T, i32)>,
) -> (Result<serde_json::Value>, i32) {
    match result {
        Ok((data, exit_code)) => match serde_json::to_value(data) {
            Ok(value) => (Ok(value), exit_code),
            Err(err) => (
                Err(Error::internal_json(
                    err.to_string(),
                    Some("serialize response".to_string()),
                )),
                1,
            ),
        },
        Err(err) => {
            let exit_code = exit_code_for_error(err.code);
            (Err(err), exit_code)
        }
    }
}

pub(crate) fn exit_code_for_error(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::ConfigMissingKey
        | ErrorCode::ConfigInvalidJson
        | ErrorCode::ConfigInvalidValue
        | ErrorCode::ConfigGroupMisaligned
        | ErrorCode::VariableUnresolved
        | ErrorCode::VariableCyclic
        | ErrorCode::StepMissingParameter
        | ErrorCode::StepUnsupportedAction
        | ErrorCode::StepUnsupportedDirection
        | ErrorCode::ValidationMissingArgument
        | ErrorCode::ValidationInvalidArgument => 2,

        ErrorCode::SourceRequestFailed | ErrorCode::SourceInvalidResponse => 4,

        ErrorCode::SessionSpawnFailed | ErrorCode::SessionClosed => 10,

        ErrorCode::InternalIoError
        | ErrorCode::InternalJsonError
        | ErrorCode::InternalUnexpected => 1,
    }
}

pub fn print_json_result(result: Result<serde_json::Value>) -> Result<()> {
    match result {
        Ok(data) => print_response(&CliResponse::success(data)),
        Err(err) => print_response(&CliResponse::<()>::from_error(&err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_omits_data_and_empty_hints() {
        let err = Error::config_missing_key("main", None);
        let json = serde_json::to_value(CliResponse::<()>::from_error(&err)).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "config.missing_key");
        assert!(json.get("data").is_none());
        assert!(json["error"].get("hints").is_none());
    }

    #[test]
    fn exit_codes_follow_error_family() {
        assert_eq!(exit_code_for_error(ErrorCode::VariableCyclic), 2);
        assert_eq!(exit_code_for_error(ErrorCode::SourceRequestFailed), 4);
        assert_eq!(exit_code_for_error(ErrorCode::SessionSpawnFailed), 10);
        assert_eq!(exit_code_for_error(ErrorCode::InternalIoError), 1);
    }

    #[test]
    fn command_errors_map_to_exit_code() {
        let (result, code) =
            map_cmd_result_to_json::<()>(Err(Error::source_request_failed("http://a", "refused")));
        assert!(result.is_err());
        assert_eq!(code, 4);
    }
}
