//! Job coordinator
//!
//! Runs the launch plan of the current host:
//! - Resolving a fresh cluster descriptor for every launch
//! - Starting the parameter server in the background and training in the
//!   foreground
//! - Waiting for the master to exit before stopping the parameter server
//!
//! Configuration errors are returned as soon as they are found and never
//! retried.

use std::collections::BTreeMap;
use std::sync::Arc;
use tether_core::{
    DistributionMode, HostList, LaunchAction, LaunchPlan, TF_CONFIG_ENV_VAR, dispatch, resolve,
};
use tracing::{Instrument, info, info_span, warn};

use crate::env::TrainingEnv;
use crate::error::JobError;
use crate::liveness::LivenessPoller;
use crate::runtime::{LaunchSpec, Launched, ProcessHandle, TrainingRuntime};

/// Inputs shared by every launch on this host
struct JobTopology {
    hosts: HostList,
    ps_count: usize,
}

/// Drives the training job on one host
pub struct JobCoordinator {
    runtime: Arc<dyn TrainingRuntime>,
    poller: LivenessPoller,
}

impl JobCoordinator {
    pub fn new(runtime: Arc<dyn TrainingRuntime>, poller: LivenessPoller) -> Self {
        Self { runtime, poller }
    }

    /// Plans and runs the job for `env.current_host`
    pub async fn run(&self, env: &TrainingEnv) -> Result<LaunchPlan, JobError> {
        let topology = JobTopology {
            hosts: HostList::new(env.hosts.clone())?,
            ps_count: env.parameter_server_count()?,
        };

        let plan = dispatch(&topology.hosts, &env.current_host, topology.ps_count);

        let span = info_span!(
            "job",
            current_host = %env.current_host,
            mode = %plan.mode,
        );

        self.execute(env, &topology, &plan).instrument(span).await?;

        Ok(plan)
    }

    async fn execute(
        &self,
        env: &TrainingEnv,
        topology: &JobTopology,
        plan: &LaunchPlan,
    ) -> Result<(), JobError> {
        if plan.mode == DistributionMode::SingleProcess {
            info!("Running training job on {} host(s)", topology.hosts.len());
        } else {
            info!(
                "Running distributed training job with {} parameter servers",
                topology.ps_count
            );
        }

        let mut background: Vec<Box<dyn ProcessHandle>> = Vec::new();

        for action in &plan.actions {
            match action {
                LaunchAction::RunParameterServer => {
                    info!("Launching parameter server process");
                    let spec = self.launch_spec(env, topology, true)?;
                    match self.runtime.run_module(&spec, false).await? {
                        Launched::Background(handle) => background.push(handle),
                        Launched::Completed => {
                            warn!("Parameter server process exited immediately");
                        }
                    }
                }
                LaunchAction::RunTraining { install } => {
                    info!("Launching worker process");
                    let spec = self.launch_spec(env, topology, false)?;
                    if *install {
                        self.runtime.run_module(&spec, true).await?;
                    } else {
                        self.runtime.write_env_vars(&spec.env_vars).await?;
                        self.runtime.run(&spec).await?;
                    }
                }
                LaunchAction::WaitForMasterExit { master } => {
                    let summary = self.poller.wait_for_master_exit(master).await?;
                    info!(
                        "Master {} exited after {} probe(s), {} retries",
                        master,
                        summary.probes,
                        summary.retries()
                    );
                }
            }
        }

        for mut handle in background {
            info!("Stopping parameter server process (pid {:?})", handle.id());
            handle.terminate().await?;
        }

        Ok(())
    }

    /// Builds the launch for one process, cluster descriptor included
    fn launch_spec(
        &self,
        env: &TrainingEnv,
        topology: &JobTopology,
        ps_process: bool,
    ) -> Result<LaunchSpec, JobError> {
        let descriptor = resolve(
            &topology.hosts,
            &env.current_host,
            topology.ps_count,
            ps_process,
        )?;

        let mut env_vars: BTreeMap<String, String> = env.to_env_vars();
        env_vars.insert(TF_CONFIG_ENV_VAR.to_string(), descriptor.to_json()?);

        Ok(LaunchSpec {
            module_dir: env.module_dir.clone(),
            module_name: env.module_name.clone(),
            cmd_args: env.to_cmd_args(),
            env_vars,
        })
    }
}
