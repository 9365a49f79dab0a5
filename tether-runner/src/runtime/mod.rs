//! Training runtime
//!
//! The seam between the launcher and the user's training code. The launcher
//! decides what to start and with which environment; a `TrainingRuntime`
//! knows how to install and start it.
//!
//! All runtimes are trait-based so the coordinator can be tested without
//! spawning processes.

mod process;

pub use process::ProcessRuntime;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while installing or running the training module
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Spawning, waiting on or writing for a process failed
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The install step exited unsuccessfully
    #[error("failed to install module from '{module_dir}' (exit code {code:?})")]
    InstallFailed {
        module_dir: PathBuf,
        code: Option<i32>,
    },

    /// A blocking training run exited unsuccessfully
    #[error("training module '{module}' exited with code {code:?}")]
    ExitStatus { module: String, code: Option<i32> },
}

impl RuntimeError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Everything needed to start one training process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub module_dir: PathBuf,
    pub module_name: String,
    pub cmd_args: Vec<String>,
    pub env_vars: BTreeMap<String, String>,
}

/// Outcome of `run_module`
pub enum Launched {
    /// The process ran in the foreground and exited successfully
    Completed,

    /// The process keeps running in the background
    Background(Box<dyn ProcessHandle>),
}

impl std::fmt::Debug for Launched {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Launched::Completed => write!(f, "Completed"),
            Launched::Background(handle) => write!(f, "Background({:?})", handle.id()),
        }
    }
}

/// Handle on a background training process
#[async_trait]
pub trait ProcessHandle: Send {
    /// OS process id, if still known
    fn id(&self) -> Option<u32>;

    /// Stops the process and waits for it to exit
    ///
    /// Stopping a process that has already exited is not an error.
    async fn terminate(&mut self) -> Result<(), RuntimeError>;
}

/// Installs and runs training modules
#[async_trait]
pub trait TrainingRuntime: Send + Sync {
    /// Installs the module, then runs it
    ///
    /// With `wait` the call blocks until the process exits and fails on a
    /// non-zero exit code. Without `wait` the process is left running and a
    /// handle to it is returned.
    async fn run_module(&self, spec: &LaunchSpec, wait: bool) -> Result<Launched, RuntimeError>;

    /// Persists environment variables for a later run without install
    async fn write_env_vars(&self, env_vars: &BTreeMap<String, String>)
    -> Result<(), RuntimeError>;

    /// Runs an already installed module, blocking until it exits
    async fn run(&self, spec: &LaunchSpec) -> Result<(), RuntimeError>;
}
