//! Tether Core
//!
//! Pure topology logic for parameter-server training jobs.
//!
//! This crate contains:
//! - Domain types: host lists, role assignments and the cluster descriptor
//! - Topology resolution: which role a host plays and what it must be told
//! - Launch planning: which local launches a host performs, in order
//!
//! Nothing in here performs I/O. Process launching and liveness probing
//! live in the runner.

pub mod domain;
pub mod error;
pub mod plan;
pub mod topology;

pub use domain::cluster::{
    CONTROL_PORT, ClusterDescriptor, ClusterSpec, ENVIRONMENT, PS_PORT, TF_CONFIG_ENV_VAR,
};
pub use domain::host::HostList;
pub use domain::role::{RoleAssignment, TaskType};
pub use error::{Result, TopologyError};
pub use plan::{DistributionMode, LaunchAction, LaunchPlan, dispatch};
pub use topology::resolve;
