//! Cluster descriptor
//!
//! The topology description handed to every training process through the
//! `TF_CONFIG` environment variable.

use serde::{Deserialize, Serialize};

use super::role::RoleAssignment;

/// Environment variable the descriptor is injected under
pub const TF_CONFIG_ENV_VAR: &str = "TF_CONFIG";

/// Port used by master and worker processes, also probed for liveness
pub const CONTROL_PORT: u16 = 2222;

/// Port used by parameter server processes
pub const PS_PORT: u16 = 2223;

/// Value of the `environment` field
pub const ENVIRONMENT: &str = "cloud";

/// Endpoints for every role present in the job
///
/// `ps` and `worker` are omitted from the serialized form when the job has no
/// such group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub master: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ps: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<Vec<String>>,
}

/// Full cluster description for one process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterDescriptor {
    pub cluster: ClusterSpec,
    pub environment: String,
    pub task: RoleAssignment,
}

impl ClusterDescriptor {
    /// Serializes the descriptor into the JSON form expected in `TF_CONFIG`
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Renders hosts as `host:port` endpoints
pub fn endpoints(hosts: &[String], port: u16) -> Vec<String> {
    hosts.iter().map(|host| format!("{}:{}", host, port)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::role::TaskType;

    #[test]
    fn test_endpoints() {
        let hosts = vec!["a".to_string(), "b".to_string()];
        assert_eq!(endpoints(&hosts, PS_PORT), vec!["a:2223", "b:2223"]);
    }

    #[test]
    fn test_optional_groups_are_omitted() {
        let descriptor = ClusterDescriptor {
            cluster: ClusterSpec {
                master: vec!["a:2222".to_string()],
                ps: None,
                worker: None,
            },
            environment: ENVIRONMENT.to_string(),
            task: RoleAssignment::master(),
        };

        assert_eq!(
            descriptor.to_json().unwrap(),
            r#"{"cluster":{"master":["a:2222"]},"environment":"cloud","task":{"type":"master","index":0}}"#
        );
    }

    #[test]
    fn test_parses_back() {
        let json = r#"{"cluster":{"master":["a:2222"],"worker":["b:2222"]},"environment":"cloud","task":{"type":"worker","index":0}}"#;
        let descriptor: ClusterDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.task.task_type, TaskType::Worker);
        assert_eq!(descriptor.cluster.ps, None);
    }
}
