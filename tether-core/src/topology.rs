//! Topology resolution
//!
//! Maps a host list and a parameter server count to the cluster descriptor a
//! single process on the current host must receive.
//!
//! Layout rules:
//! - the first host is the master, every other host is a worker
//! - the first `ps_count` hosts additionally run a parameter server, but only
//!   when the job spans more than one host
//! - master and worker endpoints use the control port, parameter servers use
//!   their own port

use crate::domain::cluster::{
    CONTROL_PORT, ClusterDescriptor, ClusterSpec, ENVIRONMENT, PS_PORT, endpoints,
};
use crate::domain::host::HostList;
use crate::domain::role::{RoleAssignment, TaskType};
use crate::error::{Result, TopologyError};

/// Resolves the cluster descriptor for one process on `current_host`
///
/// # Arguments
/// * `hosts` - All hosts in the job, master first
/// * `current_host` - Host the process will run on
/// * `ps_count` - Number of hosts that also run a parameter server
/// * `ps_process` - Whether the descriptor is for the parameter server process
///
/// # Errors
/// * `NoParameterServerGroup` if `ps_process` is set but the job has no
///   parameter servers
/// * `HostNotInGroup` if `current_host` is missing from the group its index
///   is computed in
pub fn resolve(
    hosts: &HostList,
    current_host: &str,
    ps_count: usize,
    ps_process: bool,
) -> Result<ClusterDescriptor> {
    let workers = hosts.workers();
    let ps = hosts.parameter_servers(ps_count);

    let cluster = ClusterSpec {
        master: endpoints(&hosts.as_slice()[..1], CONTROL_PORT),
        ps: ps.map(|ps| endpoints(ps, PS_PORT)),
        worker: (!workers.is_empty()).then(|| endpoints(workers, CONTROL_PORT)),
    };

    let task = if ps_process {
        let ps = ps.ok_or(TopologyError::NoParameterServerGroup)?;
        RoleAssignment::new(TaskType::Ps, position(ps, current_host, TaskType::Ps)?)
    } else if hosts.is_master(current_host) {
        RoleAssignment::master()
    } else {
        RoleAssignment::new(
            TaskType::Worker,
            position(workers, current_host, TaskType::Worker)?,
        )
    };

    Ok(ClusterDescriptor {
        cluster,
        environment: ENVIRONMENT.to_string(),
        task,
    })
}

fn position(group: &[String], host: &str, task_type: TaskType) -> Result<usize> {
    group
        .iter()
        .position(|candidate| candidate == host)
        .ok_or_else(|| TopologyError::host_not_in_group(host, task_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts(names: &[&str]) -> HostList {
        HostList::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_single_host_only_has_master() {
        for ps_count in [0, 1, 4] {
            let descriptor = resolve(&hosts(&["solo"]), "solo", ps_count, false).unwrap();
            assert_eq!(descriptor.cluster.master, vec!["solo:2222"]);
            assert_eq!(descriptor.cluster.ps, None);
            assert_eq!(descriptor.cluster.worker, None);
            assert_eq!(descriptor.task, RoleAssignment::master());
        }
    }

    #[test]
    fn test_parameter_server_indices() {
        let list = hosts(&["a", "b", "c"]);

        let a = resolve(&list, "a", 2, true).unwrap();
        assert_eq!(a.task, RoleAssignment::new(TaskType::Ps, 0));

        let b = resolve(&list, "b", 2, true).unwrap();
        assert_eq!(b.task, RoleAssignment::new(TaskType::Ps, 1));

        assert_eq!(
            b.cluster.ps,
            Some(vec!["a:2223".to_string(), "b:2223".to_string()])
        );
        assert_eq!(b.cluster.master, vec!["a:2222"]);
        assert_eq!(
            b.cluster.worker,
            Some(vec!["b:2222".to_string(), "c:2222".to_string()])
        );
        assert_eq!(b.environment, "cloud");
    }

    #[test]
    fn test_worker_index_excludes_master() {
        let descriptor = resolve(&hosts(&["a", "b", "c"]), "c", 0, false).unwrap();
        assert_eq!(descriptor.task, RoleAssignment::new(TaskType::Worker, 1));
        assert_eq!(descriptor.cluster.ps, None);

        let json = descriptor.to_json().unwrap();
        assert!(!json.contains("\"ps\""));
    }

    #[test]
    fn test_master_on_ps_host_keeps_master_role() {
        let descriptor = resolve(&hosts(&["a", "b"]), "a", 1, false).unwrap();
        assert_eq!(descriptor.task, RoleAssignment::master());
        assert_eq!(descriptor.cluster.ps, Some(vec!["a:2223".to_string()]));
    }

    #[test]
    fn test_ps_process_without_group_fails() {
        let err = resolve(&hosts(&["a", "b", "c"]), "a", 0, true).unwrap_err();
        assert_eq!(err, TopologyError::NoParameterServerGroup);

        let err = resolve(&hosts(&["a"]), "a", 2, true).unwrap_err();
        assert_eq!(err, TopologyError::NoParameterServerGroup);
    }

    #[test]
    fn test_host_outside_group_fails() {
        let list = hosts(&["a", "b", "c"]);

        let err = resolve(&list, "c", 2, true).unwrap_err();
        assert_eq!(err, TopologyError::host_not_in_group("c", TaskType::Ps));

        let err = resolve(&list, "zzz", 0, false).unwrap_err();
        assert_eq!(err, TopologyError::host_not_in_group("zzz", TaskType::Worker));
    }

    #[test]
    fn test_ps_count_larger_than_hosts() {
        let descriptor = resolve(&hosts(&["a", "b"]), "b", 10, true).unwrap();
        assert_eq!(descriptor.cluster.ps.unwrap().len(), 2);
        assert_eq!(descriptor.task.index, 1);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let list = hosts(&["a", "b", "c", "d"]);
        let first = resolve(&list, "c", 3, true).unwrap().to_json().unwrap();
        let second = resolve(&list, "c", 3, true).unwrap().to_json().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_full_descriptor_json() {
        let descriptor = resolve(&hosts(&["a", "b", "c"]), "b", 2, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&descriptor.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "cluster": {
                    "master": ["a:2222"],
                    "ps": ["a:2223", "b:2223"],
                    "worker": ["b:2222", "c:2222"]
                },
                "environment": "cloud",
                "task": {"type": "worker", "index": 0}
            })
        );
    }
}
