//! Role domain types

use serde::{Deserialize, Serialize};

/// Role a training process plays in the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// First host in the list; coordinates the job
    Master,

    /// Any non-master training host
    Worker,

    /// Holds a shard of model state and serves updates to workers
    Ps,
}

impl TaskType {
    /// Name used for this role in the cluster descriptor
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Master => "master",
            TaskType::Worker => "worker",
            TaskType::Ps => "ps",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The role of one process plus its index within that role's group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub index: usize,
}

impl RoleAssignment {
    pub fn new(task_type: TaskType, index: usize) -> Self {
        Self { task_type, index }
    }

    pub fn master() -> Self {
        Self::new(TaskType::Master, 0)
    }
}
