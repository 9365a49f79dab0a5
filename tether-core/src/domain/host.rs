//! Host list domain type

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Result, TopologyError};

/// Ordered list of the hosts taking part in a training job
///
/// Order is significant: the first host is always the master, and the first
/// `n` hosts carry the parameter servers when `n` are requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct HostList(Vec<String>);

impl HostList {
    /// Creates a host list, rejecting empty lists and duplicate names
    pub fn new(hosts: Vec<String>) -> Result<Self> {
        if hosts.is_empty() {
            return Err(TopologyError::EmptyHostList);
        }

        let mut seen = HashSet::with_capacity(hosts.len());
        for host in &hosts {
            if !seen.insert(host.as_str()) {
                return Err(TopologyError::DuplicateHost(host.clone()));
            }
        }

        Ok(Self(hosts))
    }

    /// The master host (always the first entry)
    pub fn master(&self) -> &str {
        &self.0[0]
    }

    /// Every host except the master
    pub fn workers(&self) -> &[String] {
        &self.0[1..]
    }

    /// The hosts that run a parameter server for the given count
    ///
    /// Returns `None` when no parameter server group exists: either the count
    /// is zero or the job runs on a single host. Counts larger than the host
    /// list are clamped to its length.
    pub fn parameter_servers(&self, ps_count: usize) -> Option<&[String]> {
        if self.0.len() > 1 && ps_count > 0 {
            Some(&self.0[..ps_count.min(self.0.len())])
        } else {
            None
        }
    }

    /// Whether the given host is the master
    pub fn is_master(&self, host: &str) -> bool {
        self.master() == host
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl TryFrom<Vec<String>> for HostList {
    type Error = TopologyError;

    fn try_from(hosts: Vec<String>) -> Result<Self> {
        Self::new(hosts)
    }
}

impl From<HostList> for Vec<String> {
    fn from(hosts: HostList) -> Self {
        hosts.0
    }
}
