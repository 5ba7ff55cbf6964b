//! Step definitions: action kinds, validated parameters and dependency analysis.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::binding::ParamSet;
use crate::error::{Error, Result};
use crate::template;
use crate::variables::{is_comment, TIMEOUT_SECS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    Local,
    Ssh,
    Scp,
    #[serde(alias = "ssh-int")]
    SshInteractive,
}

/// A mandatory parameter and the parameter it may fall back to.
pub struct Mandatory {
    pub name: &'static str,
    pub fallback: Option<&'static str>,
}

const fn required(name: &'static str) -> Mandatory {
    Mandatory {
        name,
        fallback: None,
    }
}

const SSH_MANDATORY: &[Mandatory] = &[
    required("hostname"),
    required("username"),
    required("password"),
    required("password_prompt"),
    required("shell_prompt"),
    Mandatory {
        name: "sudo_password_prompt",
        fallback: Some("password_prompt"),
    },
];

const SCP_MANDATORY: &[Mandatory] = &[
    required("hostname"),
    required("username"),
    required("password"),
    required("password_prompt"),
    required("progress_prompt"),
    required("source_dir"),
    required("source_files"),
    required("target_dir"),
];

impl ActionKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "local" => Some(ActionKind::Local),
            "ssh" => Some(ActionKind::Ssh),
            "scp" => Some(ActionKind::Scp),
            "ssh-interactive" | "ssh-int" => Some(ActionKind::SshInteractive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Local => "local",
            ActionKind::Ssh => "ssh",
            ActionKind::Scp => "scp",
            ActionKind::SshInteractive => "ssh-interactive",
        }
    }

    pub fn mandatory(&self) -> &'static [Mandatory] {
        match self {
            ActionKind::Local => &[],
            ActionKind::Ssh | ActionKind::SshInteractive => SSH_MANDATORY,
            ActionKind::Scp => SCP_MANDATORY,
        }
    }

    pub fn optional(&self) -> &'static [&'static str] {
        match self {
            ActionKind::Local => &["shell"],
            ActionKind::Ssh | ActionKind::SshInteractive => &[TIMEOUT_SECS],
            ActionKind::Scp => &["direction", TIMEOUT_SECS],
        }
    }

    /// Parameters every connection of this kind depends on.
    pub fn implicit_params(&self) -> &'static [&'static str] {
        match self {
            ActionKind::Local => &[],
            ActionKind::Ssh | ActionKind::Scp | ActionKind::SshInteractive => &[TIMEOUT_SECS],
        }
    }

    pub fn uses_commands(&self) -> bool {
        matches!(self, ActionKind::Local | ActionKind::Ssh)
    }

    fn accepts_field(&self, name: &str) -> bool {
        self.mandatory().iter().any(|m| m.name == name) || self.optional().contains(&name)
    }
}

/// A step field: one template or a list of templates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    One(String),
    Many(Vec<String>),
}

impl ParamValue {
    fn from_json(step: &str, field: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Array(items) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) if is_comment(s) => None,
                    other => Some(field_text(step, field, other)),
                })
                .collect::<Result<Vec<_>>>()
                .map(ParamValue::Many),
            other => field_text(step, field, other).map(ParamValue::One),
        }
    }

    pub fn templates(&self) -> Vec<&str> {
        match self {
            ParamValue::One(s) => vec![s.as_str()],
            ParamValue::Many(items) => items.iter().map(String::as_str).collect(),
        }
    }

    /// Scalar form. Lists join with a space.
    pub fn template(&self) -> String {
        match self {
            ParamValue::One(s) => s.clone(),
            ParamValue::Many(items) => items.join(" "),
        }
    }
}

fn field_text(step: &str, field: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(Error::config_invalid_value(
            format!("{}.{}", step, field),
            Some(value.to_string()),
            "step fields must be strings or lists of strings",
        )),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalParams {
    pub shell: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SshParams {
    pub hostname: String,
    pub username: String,
    pub password: String,
    pub password_prompt: String,
    pub shell_prompt: String,
    pub sudo_password_prompt: String,
    pub timeout_secs: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScpParams {
    pub hostname: String,
    pub username: String,
    pub password: String,
    pub password_prompt: String,
    pub progress_prompt: String,
    pub source_dir: String,
    pub source_files: Vec<String>,
    pub target_dir: String,
    pub direction: Option<String>,
    pub timeout_secs: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Local(LocalParams),
    Ssh(SshParams),
    Scp(ScpParams),
    SshInteractive(SshParams),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Local(_) => ActionKind::Local,
            Action::Ssh(_) => ActionKind::Ssh,
            Action::Scp(_) => ActionKind::Scp,
            Action::SshInteractive(_) => ActionKind::SshInteractive,
        }
    }
}

/// Variable names a step depends on, split by where they are referenced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepParams {
    /// Referenced by the step's own fields; these identify a connection.
    pub action: ParamSet,
    /// Referenced only by commands.
    pub command: ParamSet,
    pub combined: ParamSet,
}

/// A step validated against the run's variable names.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub name: String,
    pub action: Action,
    /// Narrowed fields, with synthesized placeholders filled in.
    pub fields: IndexMap<String, ParamValue>,
    pub commands: Vec<String>,
    pub params: StepParams,
}

impl Step {
    pub fn parse(name: &str, raw: &Value, variable_names: &IndexSet<String>) -> Result<Self> {
        let object = raw.as_object().ok_or_else(|| {
            Error::config_invalid_value(name, None, "step definition must be an object")
        })?;

        let action_name = object.get("action").and_then(Value::as_str).ok_or_else(|| {
            Error::config_missing_key("action", Some(name.to_string()))
                .with_hint(format!("Step \"{}\" does not have an action type", name))
        })?;
        let kind = ActionKind::parse(action_name)
            .ok_or_else(|| Error::step_unsupported_action(name, action_name))?;

        let mut fields: IndexMap<String, ParamValue> = IndexMap::new();
        for (field, value) in object {
            if is_comment(field) || field == "action" || field == "commands" {
                continue;
            }
            if !kind.accepts_field(field) {
                log_status!("step", "{}: ignoring field '{}' for {} action", name, field, kind.as_str());
                continue;
            }
            fields.insert(field.clone(), ParamValue::from_json(name, field, value)?);
        }

        for mandatory in kind.mandatory() {
            if fields.contains_key(mandatory.name) {
                continue;
            }
            let synthesized = if variable_names.contains(mandatory.name) {
                Some(ParamValue::One(format!("{{{}}}", mandatory.name)))
            } else {
                mandatory.fallback.and_then(|fallback| {
                    fields.get(fallback).cloned().or_else(|| {
                        variable_names
                            .contains(fallback)
                            .then(|| ParamValue::One(format!("{{{}}}", fallback)))
                    })
                })
            };
            match synthesized {
                Some(value) => {
                    fields.insert(mandatory.name.to_string(), value);
                }
                None => return Err(Error::step_missing_parameter(name, mandatory.name)),
            }
        }

        let commands = if kind.uses_commands() {
            parse_commands(name, object.get("commands"))?
        } else {
            Vec::new()
        };

        let params = analyze(kind, &fields, &commands);
        if let Some(missing) = params
            .combined
            .iter()
            .find(|param| !variable_names.contains(param.as_str()))
        {
            return Err(Error::step_missing_parameter(name, missing.clone()));
        }

        let action = build_action(kind, &fields);

        Ok(Step {
            name: name.to_string(),
            action,
            fields,
            commands,
            params,
        })
    }

    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }
}

fn parse_commands(step: &str, value: Option<&Value>) -> Result<Vec<String>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let commands = match ParamValue::from_json(step, "commands", value)? {
        ParamValue::One(command) => vec![command],
        ParamValue::Many(commands) => commands,
    };
    Ok(commands.into_iter().filter(|c| !is_comment(c)).collect())
}

fn text(fields: &IndexMap<String, ParamValue>, name: &str) -> String {
    fields.get(name).map(ParamValue::template).unwrap_or_default()
}

fn optional_text(fields: &IndexMap<String, ParamValue>, name: &str) -> Option<String> {
    fields.get(name).map(ParamValue::template)
}

fn build_action(kind: ActionKind, fields: &IndexMap<String, ParamValue>) -> Action {
    let ssh = || SshParams {
        hostname: text(fields, "hostname"),
        username: text(fields, "username"),
        password: text(fields, "password"),
        password_prompt: text(fields, "password_prompt"),
        shell_prompt: text(fields, "shell_prompt"),
        sudo_password_prompt: text(fields, "sudo_password_prompt"),
        timeout_secs: optional_text(fields, TIMEOUT_SECS),
    };

    match kind {
        ActionKind::Local => Action::Local(LocalParams {
            shell: optional_text(fields, "shell"),
        }),
        ActionKind::Ssh => Action::Ssh(ssh()),
        ActionKind::SshInteractive => Action::SshInteractive(ssh()),
        ActionKind::Scp => Action::Scp(ScpParams {
            hostname: text(fields, "hostname"),
            username: text(fields, "username"),
            password: text(fields, "password"),
            password_prompt: text(fields, "password_prompt"),
            progress_prompt: text(fields, "progress_prompt"),
            source_dir: text(fields, "source_dir"),
            source_files: fields
                .get("source_files")
                .map(|value| value.templates().into_iter().map(String::from).collect())
                .unwrap_or_default(),
            target_dir: text(fields, "target_dir"),
            direction: optional_text(fields, "direction"),
            timeout_secs: optional_text(fields, TIMEOUT_SECS),
        }),
    }
}

/// Split referenced variables into action-level and command-level sets.
pub fn analyze(
    kind: ActionKind,
    fields: &IndexMap<String, ParamValue>,
    commands: &[String],
) -> StepParams {
    let mut action = ParamSet::new();
    for value in fields.values() {
        for template_str in value.templates() {
            for reference in template::references(template_str) {
                action.insert(reference.name);
            }
        }
    }
    for implicit in kind.implicit_params() {
        action.insert(implicit.to_string());
    }

    let mut command = ParamSet::new();
    for template_str in commands {
        for reference in template::references(template_str) {
            if !action.contains(&reference.name) {
                command.insert(reference.name);
            }
        }
    }

    let mut combined = action.clone();
    combined.extend(command.iter().cloned());

    StepParams {
        action,
        command,
        combined,
    }
}
