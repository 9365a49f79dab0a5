//! Error types for topology resolution

use thiserror::Error;

use crate::domain::role::TaskType;

/// Result type alias for topology operations
pub type Result<T> = std::result::Result<T, TopologyError>;

/// Configuration errors detected while resolving a job topology
///
/// None of these are transient: the same inputs always produce the same error,
/// so callers surface them instead of retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// The job was started without any hosts
    #[error("host list is empty")]
    EmptyHostList,

    /// A host name appears more than once
    #[error("host '{0}' appears more than once in the host list")]
    DuplicateHost(String),

    /// A parameter server process was requested on a cluster that has none
    #[error("parameter-server role requested but no parameter-server group is configured")]
    NoParameterServerGroup,

    /// The current host is not part of the group its role is indexed in
    #[error("host '{host}' is not a member of the {group} group")]
    HostNotInGroup {
        /// Host that was looked up
        host: String,
        /// Group the host was expected in
        group: TaskType,
    },

    /// The parameter server count is negative or not a number
    #[error("invalid parameter server count: {0}")]
    InvalidParameterServerCount(String),
}

impl TopologyError {
    /// Create a host-not-in-group error
    pub fn host_not_in_group(host: impl Into<String>, group: TaskType) -> Self {
        Self::HostNotInGroup {
            host: host.into(),
            group,
        }
    }
}
