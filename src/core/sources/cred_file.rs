//! `hostname,username,password` credential files.

use std::path::Path;

use super::{is_valid_host, CredentialGroup, SshCredentials, Variables};
use crate::error::Result;
use crate::io::read_file;

pub fn load(path: &Path, fallback: &SshCredentials) -> Result<Variables> {
    let content = read_file(path, &format!("read credential file {}", path.display()))?;
    let group = parse(&content, fallback);
    log_status!(
        "cred",
        "{} host(s) read from {}",
        group.len(),
        path.display()
    );
    Ok(group.into_variables())
}

/// Empty username or password fields fall back to `fallback`. Records that
/// still lack one are skipped with a warning.
pub fn parse(content: &str, fallback: &SshCredentials) -> CredentialGroup {
    let mut group = CredentialGroup::default();

    for line in content.lines() {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.splitn(3, ',').collect();
        let [hostname, username, password] = fields[..] else {
            log_status!("cred", "Skipping. Bad record : {}", line);
            continue;
        };

        let hostname = hostname.trim();
        if !is_valid_host(hostname) {
            log_status!("cred", "Skipping. Invalid hostname : {}", line);
            continue;
        }

        let Some(username) = first_present(username.trim(), fallback.username.as_deref()) else {
            log_status!("cred", "Skipping. No username provided : {}", line);
            continue;
        };
        let Some(password) = first_present(password, fallback.password.as_deref()) else {
            log_status!("cred", "Skipping. No password provided : {}", line);
            continue;
        };

        group.push(hostname.to_string(), username, password);
    }

    group
}

fn first_present(value: &str, fallback: Option<&str>) -> Option<String> {
    if !value.is_empty() {
        return Some(value.to_string());
    }
    fallback.filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CREDENTIALS: &str = "\
# hostname,username,password
node1.example.com,root,s3cret
10.0.0.5,,pw,with,commas

bad-record,only-two
node3,,
not a host,u,p
";

    #[test]
    fn skips_bad_records_and_keeps_order() {
        let group = parse(CREDENTIALS, &SshCredentials::default());
        assert_eq!(group.hostnames, vec!["node1.example.com"]);
        assert_eq!(group.usernames, vec!["root"]);
    }

    #[test]
    fn empty_fields_fall_back_to_shared_credentials() {
        let fallback = SshCredentials::new(Some("admin".into()), Some("shared".into()));
        let group = parse(CREDENTIALS, &fallback);
        assert_eq!(group.hostnames, vec!["node1.example.com", "10.0.0.5", "node3"]);
        assert_eq!(group.usernames, vec!["root", "admin", "admin"]);
        assert_eq!(group.passwords, vec!["s3cret", "pw,with,commas", "shared"]);
    }

    #[test]
    fn load_emits_credentials_group() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "h1,u1,p1").unwrap();
        writeln!(file, "h2,u2,p2").unwrap();

        let variables = load(file.path(), &SshCredentials::default()).unwrap();
        assert_eq!(variables["credentials.hostname"], json!(["h1", "h2"]));
        assert_eq!(variables["credentials.password"], json!(["p1", "p2"]));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load(Path::new("/nonexistent/creds.csv"), &SshCredentials::default()).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InternalIoError);
    }
}
