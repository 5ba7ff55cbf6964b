use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigMissingKey,
    ConfigInvalidJson,
    ConfigInvalidValue,
    ConfigGroupMisaligned,

    VariableUnresolved,
    VariableCyclic,

    StepMissingParameter,
    StepUnsupportedAction,
    StepUnsupportedDirection,

    ValidationMissingArgument,
    ValidationInvalidArgument,

    SourceRequestFailed,
    SourceInvalidResponse,

    SessionSpawnFailed,
    SessionClosed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigMissingKey => "config.missing_key",
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",
            ErrorCode::ConfigGroupMisaligned => "config.group_misaligned",

            ErrorCode::VariableUnresolved => "variable.unresolved",
            ErrorCode::VariableCyclic => "variable.cyclic",

            ErrorCode::StepMissingParameter => "step.missing_parameter",
            ErrorCode::StepUnsupportedAction => "step.unsupported_action",
            ErrorCode::StepUnsupportedDirection => "step.unsupported_direction",

            ErrorCode::ValidationMissingArgument => "validation.missing_argument",
            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::SourceRequestFailed => "source.request_failed",
            ErrorCode::SourceInvalidResponse => "source.invalid_response",

            ErrorCode::SessionSpawnFailed => "session.spawn_failed",
            ErrorCode::SessionClosed => "session.closed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }

    /// Errors raised while building the binding set. These abort the whole run.
    pub fn is_variable_stage(&self) -> bool {
        matches!(
            self,
            ErrorCode::ConfigGroupMisaligned
                | ErrorCode::VariableUnresolved
                | ErrorCode::VariableCyclic
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMissingKeyDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidDocumentDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMisalignedDetails {
    pub group: String,
    pub field: String,
    pub expected: usize,
    pub actual: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDetails {
    pub placeholder: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDetails {
    pub step: String,
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetails {
    pub command: String,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingArgumentDetails {
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    pub fn validation_missing_argument(args: Vec<String>) -> Self {
        Self::new(
            ErrorCode::ValidationMissingArgument,
            "Missing required argument",
            to_details(MissingArgumentDetails { args }),
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
    ) -> Self {
        let problem = problem.into();
        Self::new(
            ErrorCode::ValidationInvalidArgument,
            format!("Invalid argument: {}", problem),
            to_details(InvalidArgumentDetails {
                field: field.into(),
                problem,
            }),
        )
    }

    pub fn config_missing_key(key: impl Into<String>, path: Option<String>) -> Self {
        let key = key.into();
        Self::new(
            ErrorCode::ConfigMissingKey,
            format!("Missing required configuration key '{}'", key),
            to_details(ConfigMissingKeyDetails { key, path }),
        )
    }

    pub fn config_invalid_document(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Unable to parse configuration document",
            to_details(ConfigInvalidDocumentDetails {
                path: path.into(),
                error: error.into(),
            }),
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let problem = problem.into();
        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid configuration value: {}", problem),
            to_details(ConfigInvalidValueDetails {
                key: key.into(),
                value,
                problem,
            }),
        )
    }

    pub fn group_misaligned(
        group: impl Into<String>,
        field: impl Into<String>,
        expected: usize,
        actual: usize,
    ) -> Self {
        let group = group.into();
        let field = field.into();
        Self::new(
            ErrorCode::ConfigGroupMisaligned,
            format!(
                "Variable group '{}' is misaligned: field '{}' has {} values, expected {}",
                group, field, actual, expected
            ),
            to_details(GroupMisalignedDetails {
                group,
                field,
                expected,
                actual,
            }),
        )
        .with_hint("All 'group.field' variables of a group must list the same number of values")
    }

    pub fn variable_unresolved(placeholder: impl Into<String>, value: impl Into<String>) -> Self {
        let placeholder = placeholder.into();
        Self::new(
            ErrorCode::VariableUnresolved,
            format!("Unable to resolve the parameter: {}", placeholder),
            to_details(VariableDetails {
                placeholder,
                value: value.into(),
            }),
        )
    }

    pub fn variable_cyclic(placeholder: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self::new(
            ErrorCode::VariableCyclic,
            format!(
                "Unable to resolve the parameter: {} (potential cyclic dependency)",
                value
            ),
            to_details(VariableDetails {
                placeholder: placeholder.into(),
                value,
            }),
        )
    }

    pub fn step_missing_parameter(step: impl Into<String>, field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(
            ErrorCode::StepMissingParameter,
            format!("Missing configuration: {}", field),
            to_details(StepDetails {
                step: step.into(),
                field,
                value: None,
            }),
        )
    }

    pub fn step_unsupported_action(step: impl Into<String>, action: impl Into<String>) -> Self {
        let action = action.into();
        Self::new(
            ErrorCode::StepUnsupportedAction,
            format!("Unsupported action type: {}", action),
            to_details(StepDetails {
                step: step.into(),
                field: "action".to_string(),
                value: Some(action),
            }),
        )
        .with_hint("Supported actions: local, ssh, scp, ssh-interactive")
    }

    pub fn step_unsupported_direction(
        step: impl Into<String>,
        direction: impl Into<String>,
    ) -> Self {
        let direction = direction.into();
        Self::new(
            ErrorCode::StepUnsupportedDirection,
            format!("Unsupported direction for scp: {}", direction),
            to_details(StepDetails {
                step: step.into(),
                field: "direction".to_string(),
                value: Some(direction),
            }),
        )
        .with_hint("Should be 'get' or 'send'")
    }

    pub fn source_request_failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::SourceRequestFailed,
            "Problem with accessing api",
            to_details(InternalErrorDetails {
                error: error.into(),
                context: Some(url.into()),
            }),
        )
    }

    pub fn source_invalid_response(url: impl Into<String>, problem: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::SourceInvalidResponse,
            "Unexpected api response",
            to_details(InternalErrorDetails {
                error: problem.into(),
                context: Some(url.into()),
            }),
        )
    }

    pub fn session_spawn_failed(command: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::SessionSpawnFailed,
            "Unable to start interactive process",
            to_details(SessionDetails {
                command: command.into(),
                error: error.into(),
            }),
        )
    }

    pub fn session_closed(command: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::SessionClosed,
            "Interactive process input is closed",
            to_details(SessionDetails {
                command: command.into(),
                error: "stdin closed".to_string(),
            }),
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalIoError,
            "IO error",
            to_details(InternalErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalJsonError,
            "JSON error",
            to_details(InternalErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}
