//! Run configuration documents.
//!
//! A run document has `variables`, `constants`, a `main` step sequence and one
//! top-level object per named step. JSON, YAML and TOML are accepted; the
//! format follows the file extension.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::io::{read_file, write_file_atomic};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, Value>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub constants: IndexMap<String, Value>,

    #[serde(default)]
    pub main: Vec<String>,

    /// Step definitions keyed by step name.
    #[serde(flatten)]
    pub steps: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
    Toml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => DocumentFormat::Yaml,
            Some("toml") => DocumentFormat::Toml,
            _ => DocumentFormat::Json,
        }
    }
}

impl RunConfig {
    pub fn parse(content: &str, format: DocumentFormat, origin: &str) -> Result<Self> {
        let parsed = match format {
            DocumentFormat::Json => {
                serde_json::from_str::<RunConfig>(content).map_err(|e| e.to_string())
            }
            DocumentFormat::Yaml => {
                serde_yml::from_str::<RunConfig>(content).map_err(|e| e.to_string())
            }
            DocumentFormat::Toml => toml::from_str::<RunConfig>(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|e| Error::config_invalid_document(origin, e))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = read_file(path, &format!("read {}", path.display()))
            .map_err(|e| e.with_hint("Unable to load the config file; check the path passed with -f"))?;
        log_status!("config", "Reading config from: {}", path.display());
        Self::parse(
            &content,
            DocumentFormat::from_path(path),
            &path.display().to_string(),
        )
    }

    /// Source variables win over variables already in the document.
    pub fn merge_variables(&mut self, variables: IndexMap<String, Value>) {
        for (name, value) in variables {
            self.variables.insert(name, value);
        }
    }

    pub fn step(&self, name: &str) -> Option<&Value> {
        self.steps.get(name)
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::internal_json(e.to_string(), Some("serialize config".to_string())))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_pretty_json()?;
        write_file_atomic(path, &content, &format!("write {}", path.display()))
    }
}
