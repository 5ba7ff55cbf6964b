//! Host names from an `/etc/hosts` style file.

use std::path::Path;

use super::{shared_credentials, split_list, starts_with_ipv4, SshCredentials, Variables};
use crate::error::Result;
use crate::io::read_file;

pub const ETC_HOSTS: &str = "/etc/hosts";

/// Hostname prefix filters. When `include` is non-empty, `exclude` is ignored.
#[derive(Debug, Clone, Default)]
pub struct PrefixFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl PrefixFilter {
    pub fn parse(include: Option<&str>, exclude: Option<&str>) -> Self {
        Self {
            include: include.map(split_list).unwrap_or_default(),
            exclude: exclude.map(split_list).unwrap_or_default(),
        }
    }

    pub fn allows(&self, hostname: &str) -> bool {
        if !self.include.is_empty() {
            return self.include.iter().any(|p| hostname.starts_with(p.as_str()));
        }
        !self.exclude.iter().any(|p| hostname.starts_with(p.as_str()))
    }
}

pub fn load(path: &Path, filter: &PrefixFilter, credentials: &SshCredentials) -> Result<Variables> {
    let content = read_file(path, &format!("read hosts file {}", path.display()))?;
    let hosts = hostnames(&content, filter);
    log_status!("etc", "{} host(s) selected from {}", hosts.len(), path.display());
    Ok(shared_credentials(hosts, credentials))
}

/// The second field of every `address name alias...` line.
pub fn hostnames(content: &str, filter: &PrefixFilter) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| starts_with_ipv4(line))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            (fields.len() > 2).then(|| fields[1].to_string())
        })
        .filter(|hostname| filter.allows(hostname))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HOSTS: &str = "\
127.0.0.1   localhost
::1         localhost ip6-localhost
10.0.0.1    master1.lab   master1
10.0.0.2    worker1.lab   worker1
10.0.0.3\tworker2.lab\tworker2
# 10.0.0.4  old.lab old
10.0.0.5    edge1.lab     edge1
";

    #[test]
    fn lines_need_address_name_and_alias() {
        let hosts = hostnames(HOSTS, &PrefixFilter::default());
        assert_eq!(
            hosts,
            vec!["master1.lab", "worker1.lab", "worker2.lab", "edge1.lab"]
        );
    }

    #[test]
    fn include_prefixes_take_precedence() {
        let filter = PrefixFilter::parse(Some("worker, edge"), Some("worker"));
        assert_eq!(
            hostnames(HOSTS, &filter),
            vec!["worker1.lab", "worker2.lab", "edge1.lab"]
        );
    }

    #[test]
    fn exclude_prefixes_drop_hosts() {
        let filter = PrefixFilter::parse(None, Some("master,edge"));
        assert_eq!(hostnames(HOSTS, &filter), vec!["worker1.lab", "worker2.lab"]);
    }

    #[test]
    fn load_attaches_shared_credentials() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", HOSTS).unwrap();
        let credentials = SshCredentials::new(Some("ops".into()), Some("pw".into()));
        let variables = load(file.path(), &PrefixFilter::parse(Some("master"), None), &credentials).unwrap();
        assert_eq!(variables["credentials.hostname"], json!(["master1.lab"]));
        assert_eq!(variables["credentials.username"], json!(["ops"]));
        assert_eq!(variables["credentials.password"], json!(["pw"]));
    }
}
