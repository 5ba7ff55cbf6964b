//! Variable loading: raw mapping → aligned axes → resolved binding set.

pub mod expand;
pub mod groups;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use serde_json::Value;

use crate::binding::Binding;
use crate::config::RunConfig;
use crate::error::{Error, Result};
use groups::Axis;

pub const RUN_ID: &str = "run_id";
pub const TIMEOUT_SECS: &str = "timeout_secs";

/// A raw variable value after JSON normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VariableValue {
    Scalar(String),
    List(Vec<String>),
}

impl VariableValue {
    pub fn from_json(name: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| scalar_text(name, item))
                .collect::<Result<Vec<_>>>()
                .map(VariableValue::List),
            other => scalar_text(name, other).map(VariableValue::Scalar),
        }
    }
}

fn scalar_text(name: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => Err(Error::config_invalid_value(
            name,
            Some(value.to_string()),
            "variable values must be scalars or lists of scalars",
        )),
    }
}

/// Names starting with `#` or `-` are commented out.
pub fn is_comment(name: &str) -> bool {
    name.starts_with('#') || name.starts_with('-')
}

/// Everything the executor needs about the run's variables.
#[derive(Debug, Clone, Serialize)]
pub struct VariableSet {
    pub run_id: String,
    /// Every name a binding can carry: plain names and group field names.
    pub names: IndexSet<String>,
    pub bindings: Vec<Binding>,
}

impl VariableSet {
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

pub fn generate_run_id() -> String {
    chrono::Utc::now().format("RID_%Y%m%d_%H%M%S_UTC").to_string()
}

/// Merge constants and variables, inject `run_id`/`timeout_secs`, then
/// align, expand and resolve.
pub fn load(
    config: &RunConfig,
    run_id: Option<&str>,
    default_timeout_secs: u64,
) -> Result<VariableSet> {
    let mut raw: IndexMap<String, VariableValue> = IndexMap::new();
    for (name, value) in config.constants.iter().chain(config.variables.iter()) {
        if is_comment(name) {
            continue;
        }
        raw.insert(name.clone(), VariableValue::from_json(name, value)?);
    }

    let run_id = match (run_id, raw.get(RUN_ID)) {
        (Some(id), _) => id.to_string(),
        (None, Some(VariableValue::Scalar(id))) => id.clone(),
        _ => generate_run_id(),
    };
    raw.insert(RUN_ID.to_string(), VariableValue::Scalar(run_id.clone()));

    let timeout = timeout_from(raw.get(TIMEOUT_SECS), default_timeout_secs);
    raw.insert(
        TIMEOUT_SECS.to_string(),
        VariableValue::Scalar(timeout.to_string()),
    );

    let axes = groups::align(&raw)?;
    let names = axis_names(&axes);
    let bindings = expand::expand(&axes)?;

    log_status!(
        "variables",
        "{} variable(s) expanded into {} binding(s)",
        names.len(),
        bindings.len()
    );

    Ok(VariableSet {
        run_id,
        names,
        bindings,
    })
}

/// Parse a `timeout_secs` value, warning and falling back on bad input.
pub fn timeout_from(value: Option<&VariableValue>, default_secs: u64) -> u64 {
    match value {
        None => default_secs,
        Some(VariableValue::Scalar(s)) => parse_timeout(s, default_secs),
        Some(VariableValue::List(_)) => {
            log_status!(
                "variables",
                "WARNING: 'timeout_secs' should be a number: Using default value of {} secs...",
                default_secs
            );
            default_secs
        }
    }
}

pub fn parse_timeout(value: &str, default_secs: u64) -> u64 {
    match value.trim().parse::<u64>() {
        Ok(secs) => secs,
        Err(_) => {
            log_status!(
                "variables",
                "WARNING: 'timeout_secs' should be a number: Using default value of {} secs...",
                default_secs
            );
            default_secs
        }
    }
}

fn axis_names(axes: &IndexMap<String, Axis>) -> IndexSet<String> {
    let mut names = IndexSet::new();
    for (key, axis) in axes {
        match axis {
            Axis::Group(records) => {
                for record in records {
                    names.extend(record.keys().cloned());
                }
            }
            _ => {
                names.insert(key.clone());
            }
        }
    }
    names
}

/// Raw variables exactly as a config would carry them, for display.
pub fn raw_mapping(config: &RunConfig) -> IndexMap<String, Value> {
    let mut merged = config.constants.clone();
    for (name, value) in &config.variables {
        merged.insert(name.clone(), value.clone());
    }
    merged
        .into_iter()
        .filter(|(name, _)| !is_comment(name))
        .collect()
}
