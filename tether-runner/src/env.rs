//! Training environment
//!
//! The inputs of one training job on one host, as handed to the launcher by
//! the platform, and their translation into process arguments and
//! environment variables for the training module.

use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tether_core::TopologyError;

/// Framework parameter holding the number of parameter servers
pub const PARAMETER_SERVER_NUM: &str = "sagemaker_parameter_server_num";

/// Everything the launcher knows about the job on this host
#[derive(Debug, Clone)]
pub struct TrainingEnv {
    /// All hosts in the job, master first
    pub hosts: Vec<String>,

    /// Host this launcher runs on
    pub current_host: String,

    /// Directory holding the training module
    pub module_dir: PathBuf,

    /// Entry point: a module name or a `*.py` script
    pub module_name: String,

    /// User hyperparameters, forwarded as command line arguments
    pub hyperparameters: Map<String, JsonValue>,

    /// Framework parameters (parameter server count and friends)
    pub additional_framework_parameters: Map<String, JsonValue>,

    /// Log level forwarded to the training module
    pub log_level: String,
}

impl TrainingEnv {
    /// Number of parameter servers requested for the job
    ///
    /// Accepts an integer or a numeric string. A missing or `null` value
    /// means no parameter servers.
    pub fn parameter_server_count(&self) -> Result<usize, TopologyError> {
        match self.additional_framework_parameters.get(PARAMETER_SERVER_NUM) {
            None | Some(JsonValue::Null) => Ok(0),
            Some(JsonValue::Number(n)) => n
                .as_u64()
                .map(|n| n as usize)
                .ok_or_else(|| TopologyError::InvalidParameterServerCount(n.to_string())),
            Some(JsonValue::String(s)) => s
                .trim()
                .parse::<usize>()
                .map_err(|_| TopologyError::InvalidParameterServerCount(s.clone())),
            Some(other) => Err(TopologyError::InvalidParameterServerCount(
                other.to_string(),
            )),
        }
    }

    /// Hyperparameters as `--key value` pairs, sorted by key
    pub fn to_cmd_args(&self) -> Vec<String> {
        let sorted: BTreeMap<&String, &JsonValue> = self.hyperparameters.iter().collect();

        let mut args = Vec::with_capacity(sorted.len() * 2);
        for (key, value) in sorted {
            args.push(format!("--{}", key));
            args.push(plain_value(value));
        }
        args
    }

    /// Environment variables describing the job to the training module
    ///
    /// Does not include the cluster descriptor; that depends on the process
    /// being launched and is added by the coordinator.
    pub fn to_env_vars(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();

        vars.insert(
            "SM_HOSTS".to_string(),
            JsonValue::from(self.hosts.clone()).to_string(),
        );
        vars.insert("SM_CURRENT_HOST".to_string(), self.current_host.clone());
        vars.insert("SM_NUM_HOSTS".to_string(), self.hosts.len().to_string());
        vars.insert(
            "SM_MODULE_DIR".to_string(),
            self.module_dir.to_string_lossy().to_string(),
        );
        vars.insert("SM_MODULE_NAME".to_string(), self.module_name.clone());
        vars.insert("SM_LOG_LEVEL".to_string(), self.log_level.clone());
        vars.insert(
            "SM_HPS".to_string(),
            JsonValue::Object(self.hyperparameters.clone()).to_string(),
        );
        vars.insert(
            "SM_FRAMEWORK_PARAMS".to_string(),
            JsonValue::Object(self.additional_framework_parameters.clone()).to_string(),
        );

        for (key, value) in &self.hyperparameters {
            vars.insert(
                format!("SM_HP_{}", key.to_uppercase().replace('-', "_")),
                plain_value(value),
            );
        }

        vars
    }
}

/// Parses a JSON object, as received for hyperparameters and framework params
pub fn parse_object(name: &str, raw: &str) -> anyhow::Result<Map<String, JsonValue>> {
    match serde_json::from_str(raw) {
        Ok(JsonValue::Object(map)) => Ok(map),
        Ok(other) => anyhow::bail!("{} must be a JSON object, got: {}", name, other),
        Err(e) => anyhow::bail!("{} is not valid JSON: {}", name, e),
    }
}

/// Parses the host list, given either as a JSON array or comma separated
pub fn parse_hosts(raw: &str) -> anyhow::Result<Vec<String>> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        let hosts: Vec<String> = serde_json::from_str(trimmed)
            .map_err(|e| anyhow::anyhow!("hosts is not a JSON array of strings: {}", e))?;
        return Ok(hosts);
    }

    Ok(trimmed
        .split(',')
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(String::from)
        .collect())
}

/// Strings are passed through unquoted, everything else as JSON
fn plain_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
