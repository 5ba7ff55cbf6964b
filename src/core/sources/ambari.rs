//! Hosts and service log directories from the Ambari REST API.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;

use super::{SshCredentials, Variables};
use crate::error::{Error, Result};
use crate::operator::Operator;
use crate::shell::join_path;

pub const DEFAULT_USER: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "admin";
pub const DEFAULT_PORT: &str = "8080";

/// Select every component of the service.
pub const ALL_COMPONENTS: &str = "ALL";

const LOG_DIR_PROPERTIES: &[&str] = &[
    "hdfs_log_dir_prefix",
    "hcat_log_dir",
    "hive_log_dir",
    "mapred_log_dir_prefix",
    "oozie_log_dir",
    "ranger_admin_log_dir",
    "ranger_usersync_log_dir",
    "livy_log_dir",
    "spark_log_dir",
    "livy2_log_dir",
    "yarn_log_dir_prefix",
    "zk_log_dir",
    "infra_solr_client_log_dir",
    "infra_solr_log_dir",
    "metrics_monitor_log_dir",
    "metrics_collector_log_dir",
    "metrics_grafana_log_dir",
    "hbase_log_dir",
    "metadata_log_dir",
    "beacon_log_dir",
    "druid_log_dir",
    "kafka_log_dir",
    "hst_log_dir",
    "activity_log_dir",
    "storm_log_dir",
    "superset_log_dir",
    "zeppelin_log_dir",
];

/// Services whose log-dir property is a prefix shared with other daemons.
fn service_subdir(service: &str) -> Option<&'static str> {
    match service {
        "HDFS" => Some("hdfs"),
        "MAPREDUCE2" => Some("mapred"),
        "YARN" => Some("yarn"),
        _ => None,
    }
}

/// Read access to the API below `/api/v1`.
pub trait AmbariApi {
    fn get(&self, path: &str) -> Result<Value>;
}

pub struct HttpApi {
    client: reqwest::blocking::Client,
    base_url: String,
    username: String,
    password: String,
}

impl HttpApi {
    pub fn new(server: &str, port: Option<&str>, username: &str, password: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("hostrun/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::internal_io(e.to_string(), Some("create HTTP client".to_string())))?;

        Ok(Self {
            client,
            base_url: format!("http://{}:{}/api/v1", server, port.unwrap_or(DEFAULT_PORT)),
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

impl AmbariApi for HttpApi {
    fn get(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        log_status!("ambari", "GET {}", url);

        self.client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header("X-Requested-By", "ambari")
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|e| Error::source_request_failed(&url, e.to_string()))?
            .json::<Value>()
            .map_err(|e| Error::source_invalid_response(&url, e.to_string()))
    }
}

/// What to look up. Missing service or component is chosen by the operator.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub cluster: Option<String>,
    pub service: Option<String>,
    pub component: Option<String>,
}

/// API password: given, prompted, or the default for the default user.
pub fn password_for(
    username: &str,
    password: Option<String>,
    operator: &mut dyn Operator,
) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    if username == DEFAULT_USER {
        let answer = operator.secret(&format!(
            "Ambari password for '{}' [{}]: ",
            username, DEFAULT_PASSWORD
        ))?;
        return Ok(answer
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| DEFAULT_PASSWORD.to_string()));
    }
    operator
        .secret(&format!("Ambari password for '{}': ", username))?
        .filter(|a| !a.is_empty())
        .ok_or_else(|| Error::validation_missing_argument(vec!["ambari-pass".to_string()]))
}

pub fn discover(
    api: &dyn AmbariApi,
    query: &Query,
    credentials: &SshCredentials,
    operator: &mut dyn Operator,
) -> Result<Variables> {
    let cluster = match &query.cluster {
        Some(cluster) => cluster.clone(),
        None => default_cluster(&api.get("/clusters/")?)?,
    };
    let cluster_path = format!("/clusters/{}", cluster);

    let configs = api.get(&format!(
        "{}/configurations/service_config_versions?is_current=true",
        cluster_path
    ))?;
    let service = match &query.service {
        Some(service) => service.clone(),
        None => choose(operator, "a service", services(&configs))?,
    };
    let log_dirs = service_log_dirs(&configs, &service);
    if log_dirs.is_empty() {
        log_status!("ambari", "No known log directory property for {}", service);
    }

    let components_path = format!("{}/services/{}/components", cluster_path, service);
    let available = component_names(&api.get(&components_path)?)?;
    let selected = match query.component.as_deref() {
        Some(ALL_COMPONENTS) => available,
        Some(component) if available.iter().any(|c| c == component) => vec![component.to_string()],
        _ => choose_components(operator, &service, available)?,
    };

    let mut hosts: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for component in &selected {
        let doc = api.get(&format!(
            "{}/{}?fields=host_components/HostRoles/host_name",
            components_path, component
        ))?;
        for host in component_hosts(&doc)? {
            hosts.entry(host).or_default().push(component.clone());
        }
    }

    for (index, (host, components)) in hosts.iter().enumerate() {
        log_status!("ambari", "{}. {} ({})", index + 1, host, components.join(", "));
    }

    let mut variables = Variables::new();
    variables.insert(
        "group1.service".to_string(),
        Value::from(vec![service.clone(); log_dirs.len()]),
    );
    variables.insert("group1.log_dir".to_string(), Value::from(log_dirs));
    variables.insert(
        "hostname".to_string(),
        Value::from(hosts.into_keys().collect::<Vec<_>>()),
    );
    if let Some(username) = &credentials.username {
        variables.insert("username".to_string(), Value::from(username.clone()));
    }
    if let Some(password) = &credentials.password {
        variables.insert("password".to_string(), Value::from(password.clone()));
    }
    Ok(variables)
}

fn choose(operator: &mut dyn Operator, name: &str, mut options: Vec<String>) -> Result<String> {
    options.sort();
    operator
        .select(&format!("Select {}", name), &options)?
        .map(|index| options[index].clone())
        .ok_or_else(|| nothing_selected(name))
}

fn choose_components(
    operator: &mut dyn Operator,
    service: &str,
    mut options: Vec<String>,
) -> Result<Vec<String>> {
    options.sort();
    let mut menu = options.clone();
    menu.push("All of the above".to_string());
    let name = format!("{} component", service);
    match operator.select(&format!("Select {}", name), &menu)? {
        Some(index) if index == options.len() => Ok(options),
        Some(index) => Ok(vec![options[index].clone()]),
        None => Err(nothing_selected(&name)),
    }
}

fn nothing_selected(name: &str) -> Error {
    Error::validation_invalid_argument(name, "nothing selected")
        .with_hint("Re-run and pick one of the listed entries")
}

fn items<'a>(doc: &'a Value, key: &str) -> Result<&'a Vec<Value>> {
    doc.get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| Error::source_invalid_response(key, format!("response has no '{}' list", key)))
}

pub fn default_cluster(doc: &Value) -> Result<String> {
    items(doc, "items")?
        .first()
        .and_then(|item| item.pointer("/Clusters/cluster_name"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::source_invalid_response("/clusters/", "no cluster is defined"))
}

/// Service names in first-seen order.
pub fn services(configs: &Value) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for item in configs.get("items").and_then(Value::as_array).into_iter().flatten() {
        if let Some(name) = item.get("service_name").and_then(Value::as_str) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

pub fn service_log_dirs(configs: &Value, service: &str) -> Vec<String> {
    let mut dirs = Vec::new();
    let items = configs.get("items").and_then(Value::as_array).into_iter().flatten();

    for item in items.filter(|i| i.get("service_name").and_then(Value::as_str) == Some(service)) {
        let configurations = item.get("configurations").and_then(Value::as_array).into_iter().flatten();
        for properties in configurations.filter_map(|c| c.get("properties").and_then(Value::as_object)) {
            for (property, value) in properties {
                let Some(value) = value.as_str() else {
                    continue;
                };
                if LOG_DIR_PROPERTIES.contains(&property.as_str()) {
                    dirs.push(match service_subdir(service) {
                        Some(subdir) => join_path(value, subdir),
                        None => value.to_string(),
                    });
                } else if property.contains("log_dir") {
                    log_status!("ambari", "Potential log dir -> {}.{} : {}", service, property, value);
                }
            }
        }
    }
    dirs
}

pub fn component_names(doc: &Value) -> Result<Vec<String>> {
    Ok(items(doc, "items")?
        .iter()
        .filter_map(|item| item.pointer("/ServiceComponentInfo/component_name"))
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect())
}

pub fn component_hosts(doc: &Value) -> Result<Vec<String>> {
    Ok(items(doc, "host_components")?
        .iter()
        .filter_map(|item| item.pointer("/HostRoles/host_name"))
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect())
}
