use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Base hostrun config directory (~/.config/hostrun/ on all platforms)
pub fn hostrun() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected(
                "APPDATA environment variable not set on Windows".to_string(),
            )
        })?;
        Ok(PathBuf::from(appdata).join("hostrun"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected(
                "HOME environment variable not set on Unix-like system".to_string(),
            )
        })?;
        Ok(PathBuf::from(home).join(".config").join("hostrun"))
    }
}

/// Global hostrun.json config file path
pub fn hostrun_json() -> Result<PathBuf> {
    Ok(hostrun()?.join("hostrun.json"))
}

/// Expand `~` and environment variables in a user-supplied path.
pub fn expand_user_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}
