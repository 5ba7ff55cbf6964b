//! Hosts given directly on the command line.

use super::{is_valid_host, shared_credentials, split_list, SshCredentials, Variables};
use crate::error::{Error, Result};

pub fn load(hosts: &str, credentials: &SshCredentials) -> Result<Variables> {
    let hostnames = split_list(hosts);
    if hostnames.is_empty() {
        return Err(Error::validation_invalid_argument(
            "hosts",
            "at least one hostname is required",
        ));
    }
    if let Some(bad) = hostnames.iter().find(|h| !is_valid_host(h)) {
        return Err(Error::validation_invalid_argument(
            "hosts",
            format!("'{}' is not a valid hostname or IPv4 address", bad),
        ));
    }
    Ok(shared_credentials(hostnames, credentials))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn comma_separated_hosts_share_credentials() {
        let credentials = SshCredentials::new(Some("u".into()), Some("p".into()));
        let variables = load("h1, 10.1.1.1", &credentials).unwrap();
        assert_eq!(variables["credentials.hostname"], json!(["h1", "10.1.1.1"]));
        assert_eq!(variables["credentials.password"], json!(["p", "p"]));
    }

    #[test]
    fn invalid_host_is_rejected() {
        let err = load("h1,bad host", &SshCredentials::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationInvalidArgument);
        assert!(err.message.contains("bad host"));
    }

    #[test]
    fn empty_list_is_rejected() {
        assert!(load(" , ", &SshCredentials::default()).is_err());
    }
}
