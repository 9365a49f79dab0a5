//! Launch planning
//!
//! Decides, once at job start, which local launches the current host performs
//! and in which order. The plan is data; the runner executes it.

use serde::{Deserialize, Serialize};

use crate::domain::host::HostList;

/// How the current host takes part in the job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionMode {
    /// Single host, or no parameter servers: one training process
    SingleProcess,

    /// Runs a parameter server next to its training process
    ParameterServerHost,

    /// Runs only a training process in a parameter-server cluster
    WorkerHost,
}

impl std::fmt::Display for DistributionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistributionMode::SingleProcess => write!(f, "single-process"),
            DistributionMode::ParameterServerHost => write!(f, "parameter-server-host"),
            DistributionMode::WorkerHost => write!(f, "worker-host"),
        }
    }
}

/// A single local step of the launch sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LaunchAction {
    /// Install the module and start the parameter server in the background
    RunParameterServer,

    /// Run the training process in the foreground
    ///
    /// `install` is false when an earlier launch on this host has already
    /// prepared the module.
    RunTraining { install: bool },

    /// Block until the master stops answering on its control port
    WaitForMasterExit { master: String },
}

/// Ordered launch sequence for one host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchPlan {
    pub mode: DistributionMode,
    pub actions: Vec<LaunchAction>,
}

impl LaunchPlan {
    /// Number of training process launches (foreground and background)
    pub fn launch_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|action| !matches!(action, LaunchAction::WaitForMasterExit { .. }))
            .count()
    }
}

/// Builds the launch plan for `current_host`
///
/// Membership of `current_host` in the host list is not checked here; topology
/// resolution reports it when the first launch is prepared.
pub fn dispatch(hosts: &HostList, current_host: &str, ps_count: usize) -> LaunchPlan {
    let Some(ps_hosts) = hosts.parameter_servers(ps_count) else {
        return LaunchPlan {
            mode: DistributionMode::SingleProcess,
            actions: vec![LaunchAction::RunTraining { install: true }],
        };
    };

    if ps_hosts.iter().any(|host| host == current_host) {
        // The parameter server launch installs the module for both processes
        LaunchPlan {
            mode: DistributionMode::ParameterServerHost,
            actions: vec![
                LaunchAction::RunParameterServer,
                LaunchAction::RunTraining { install: false },
                LaunchAction::WaitForMasterExit {
                    master: hosts.master().to_string(),
                },
            ],
        }
    } else {
        LaunchPlan {
            mode: DistributionMode::WorkerHost,
            actions: vec![LaunchAction::RunTraining { install: true }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts(names: &[&str]) -> HostList {
        HostList::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_single_host_runs_one_process() {
        let plan = dispatch(&hosts(&["solo"]), "solo", 2);
        assert_eq!(plan.mode, DistributionMode::SingleProcess);
        assert_eq!(plan.actions, vec![LaunchAction::RunTraining { install: true }]);
        assert_eq!(plan.launch_count(), 1);
    }

    #[test]
    fn test_no_parameter_servers_runs_one_process() {
        let plan = dispatch(&hosts(&["a", "b", "c"]), "b", 0);
        assert_eq!(plan.mode, DistributionMode::SingleProcess);
        assert_eq!(plan.launch_count(), 1);
    }

    #[test]
    fn test_parameter_server_host_sequence() {
        let plan = dispatch(&hosts(&["a", "b", "c"]), "b", 2);
        assert_eq!(plan.mode, DistributionMode::ParameterServerHost);
        assert_eq!(
            plan.actions,
            vec![
                LaunchAction::RunParameterServer,
                LaunchAction::RunTraining { install: false },
                LaunchAction::WaitForMasterExit {
                    master: "a".to_string()
                },
            ]
        );
        assert_eq!(plan.launch_count(), 2);
    }

    #[test]
    fn test_master_can_be_parameter_server_host() {
        let plan = dispatch(&hosts(&["a", "b"]), "a", 1);
        assert_eq!(plan.mode, DistributionMode::ParameterServerHost);
    }

    #[test]
    fn test_pure_worker_host_installs() {
        let plan = dispatch(&hosts(&["a", "b", "c"]), "c", 2);
        assert_eq!(plan.mode, DistributionMode::WorkerHost);
        assert_eq!(plan.actions, vec![LaunchAction::RunTraining { install: true }]);
    }
}
