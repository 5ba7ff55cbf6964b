use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::io::read_file;
use crate::paths;

/// Root configuration structure for hostrun.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HostrunConfig {
    #[serde(default)]
    pub defaults: Defaults,
}

/// All configurable defaults that can be overridden via hostrun.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Prompt wait used by the interactive session loop.
    #[serde(default = "default_interactive_timeout_secs")]
    pub interactive_timeout_secs: u64,

    #[serde(default = "default_shell")]
    pub shell: String,

    #[serde(default = "default_ssh_options")]
    pub ssh_options: String,

    /// Argv used to give interactive processes a terminal. `{command}` is
    /// replaced by the full command line. Empty runs the command via `sh -c`.
    #[serde(default = "default_pty_wrapper")]
    pub pty_wrapper: Vec<String>,

    /// Prompt patterns injected as constants for `--interactive` runs.
    #[serde(default = "default_prompts")]
    pub prompts: IndexMap<String, String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            interactive_timeout_secs: default_interactive_timeout_secs(),
            shell: default_shell(),
            ssh_options: default_ssh_options(),
            pty_wrapper: default_pty_wrapper(),
            prompts: default_prompts(),
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_timeout_secs() -> u64 {
    60
}

fn default_interactive_timeout_secs() -> u64 {
    2
}

fn default_shell() -> String {
    "sh".to_string()
}

fn default_ssh_options() -> String {
    "-o CheckHostIP=no -o LogLevel=quiet -o UserKnownHostsFile=/dev/null -o StrictHostKeyChecking=no"
        .to_string()
}

fn default_pty_wrapper() -> Vec<String> {
    if cfg!(target_os = "linux") {
        vec![
            "script".to_string(),
            "-qfec".to_string(),
            "{command}".to_string(),
            "/dev/null".to_string(),
        ]
    } else {
        Vec::new()
    }
}

fn default_prompts() -> IndexMap<String, String> {
    let mut prompts = IndexMap::new();
    prompts.insert("password_prompt".to_string(), "(?i)password:".to_string());
    prompts.insert("shell_prompt".to_string(), r"[\$#>] ?$".to_string());
    prompts.insert("progress_prompt".to_string(), r"\d+%".to_string());
    prompts
}

// =============================================================================
// Loading functions
// =============================================================================

/// Load defaults, merging file config with built-in defaults.
/// If hostrun.json is missing or invalid, returns built-in defaults.
pub fn load_defaults() -> Defaults {
    load_config().defaults
}

/// Load the full hostrun.json config, falling back to defaults on any error.
pub fn load_config() -> HostrunConfig {
    match load_config_from_file() {
        Ok(Some(config)) => config,
        Ok(None) => HostrunConfig::default(),
        Err(err) => {
            log_status!("defaults", "Ignoring hostrun.json: {}", err);
            HostrunConfig::default()
        }
    }
}

fn load_config_from_file() -> crate::Result<Option<HostrunConfig>> {
    let path = paths::hostrun_json()?;

    if !path.exists() {
        return Ok(None);
    }

    let content = read_file(&path, &format!("read {}", path.display()))?;

    parse_config(&content, &path.display().to_string()).map(Some)
}

pub fn parse_config(content: &str, origin: &str) -> crate::Result<HostrunConfig> {
    serde_json::from_str(content)
        .map_err(|e| crate::Error::config_invalid_document(origin, e.to_string()))
}

/// Get built-in defaults (ignoring any file config)
pub fn builtin_defaults() -> Defaults {
    Defaults::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_builtin_values() {
        let config = parse_config(r#"{"defaults": {"timeout_secs": 5}}"#, "inline").unwrap();
        assert_eq!(config.defaults.timeout_secs, 5);
        assert_eq!(config.defaults.shell, "sh");
        assert_eq!(config.defaults.interactive_timeout_secs, 2);
        assert!(config.defaults.ssh_options.contains("StrictHostKeyChecking=no"));
    }

    #[test]
    fn builtin_prompts_cover_interactive_parameters() {
        let defaults = builtin_defaults();
        assert!(defaults.prompts.contains_key("password_prompt"));
        assert!(defaults.prompts.contains_key("shell_prompt"));
    }
}
