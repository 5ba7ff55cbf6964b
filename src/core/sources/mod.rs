//! Variable sources.
//!
//! Each source produces a variable mapping in the dotted-group convention
//! (`credentials.hostname`, `credentials.username`, `credentials.password`)
//! which is merged over the run configuration's own variables.

pub mod ambari;
pub mod cred_file;
pub mod etc_hosts;
pub mod host_list;

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

pub type Variables = IndexMap<String, Value>;

pub const CREDENTIALS_GROUP: &str = "credentials";

static IPV4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)(\.(25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)){3}")
        .unwrap()
});

static HOSTNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(([a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9\-]*[a-zA-Z0-9])\.)*([A-Za-z0-9]|[A-Za-z0-9][A-Za-z0-9\-]*[A-Za-z0-9])$",
    )
    .unwrap()
});

/// SSH credentials given on the command line, shared by every host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SshCredentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl SshCredentials {
    pub fn new(username: Option<String>, password: Option<String>) -> Self {
        Self { username, password }
    }
}

/// Line starts with an IPv4 address.
pub fn starts_with_ipv4(line: &str) -> bool {
    IPV4.is_match(line)
}

pub fn is_valid_host(host: &str) -> bool {
    HOSTNAME.is_match(host) || IPV4.is_match(host)
}

/// Comma separated list with blanks removed.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn field(name: &str) -> String {
    format!("{}.{}", CREDENTIALS_GROUP, name)
}

/// Credential records as aligned `credentials.*` lists.
#[derive(Debug, Clone, Default)]
pub struct CredentialGroup {
    pub hostnames: Vec<String>,
    pub usernames: Vec<String>,
    pub passwords: Vec<String>,
}

impl CredentialGroup {
    pub fn push(&mut self, hostname: String, username: String, password: String) {
        self.hostnames.push(hostname);
        self.usernames.push(username);
        self.passwords.push(password);
    }

    pub fn len(&self) -> usize {
        self.hostnames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hostnames.is_empty()
    }

    pub fn into_variables(self) -> Variables {
        let mut variables = Variables::new();
        variables.insert(field("hostname"), Value::from(self.hostnames));
        variables.insert(field("username"), Value::from(self.usernames));
        variables.insert(field("password"), Value::from(self.passwords));
        variables
    }
}

/// Hosts sharing one set of credentials. Credential fields are emitted
/// only when given, so the config can still supply them.
pub fn shared_credentials(hostnames: Vec<String>, credentials: &SshCredentials) -> Variables {
    let count = hostnames.len();
    let mut variables = Variables::new();
    variables.insert(field("hostname"), Value::from(hostnames));
    if let Some(username) = &credentials.username {
        variables.insert(field("username"), Value::from(vec![username.clone(); count]));
    }
    if let Some(password) = &credentials.password {
        variables.insert(field("password"), Value::from(vec![password.clone(); count]));
    }
    variables
}
