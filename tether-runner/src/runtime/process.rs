//! Process-based training runtime
//!
//! Runs the training module with a local Python interpreter:
//! - Installing the module's requirements and package, when it has any
//! - Starting the entry point in the foreground or background
//! - Writing the environment to a shell file for later runs

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::{LaunchSpec, Launched, ProcessHandle, RuntimeError, TrainingRuntime};

/// Runtime that spawns the training module as local processes
pub struct ProcessRuntime {
    python: String,
    env_file: PathBuf,
}

impl ProcessRuntime {
    /// Creates a new process runtime
    ///
    /// # Arguments
    /// * `python` - Interpreter used for installs and runs
    /// * `env_file` - Where `write_env_vars` persists the environment
    pub fn new(python: impl Into<String>, env_file: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
            env_file: env_file.into(),
        }
    }

    /// Installs requirements and the module package, when present
    async fn install(&self, module_dir: &Path) -> Result<(), RuntimeError> {
        let requirements = module_dir.join("requirements.txt");
        if requirements.is_file() {
            info!("Installing requirements from {}", requirements.display());
            self.pip(module_dir, &["install", "-r", "requirements.txt"])
                .await?;
        }

        if module_dir.join("setup.py").is_file() || module_dir.join("pyproject.toml").is_file() {
            info!("Installing module package from {}", module_dir.display());
            self.pip(module_dir, &["install", "."]).await?;
        }

        Ok(())
    }

    async fn pip(&self, module_dir: &Path, args: &[&str]) -> Result<(), RuntimeError> {
        let status = Command::new(&self.python)
            .arg("-m")
            .arg("pip")
            .args(args)
            .current_dir(module_dir)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| RuntimeError::io(format!("failed to run {} -m pip", self.python), e))?;

        if !status.success() {
            return Err(RuntimeError::InstallFailed {
                module_dir: module_dir.to_path_buf(),
                code: status.code(),
            });
        }

        Ok(())
    }

    /// Builds the command starting the entry point
    ///
    /// `*.py` entry points run as scripts, anything else as a module.
    fn command(&self, spec: &LaunchSpec) -> Command {
        let mut command = Command::new(&self.python);

        if spec.module_name.ends_with(".py") {
            command.arg(&spec.module_name);
        } else {
            command.arg("-m").arg(&spec.module_name);
        }

        command
            .args(&spec.cmd_args)
            .envs(&spec.env_vars)
            .current_dir(&spec.module_dir)
            .stdin(Stdio::null());

        command
    }

    fn spawn(&self, spec: &LaunchSpec, kill_on_drop: bool) -> Result<Child, RuntimeError> {
        let mut command = self.command(spec);
        command.kill_on_drop(kill_on_drop);

        debug!(
            "Spawning {} {} {:?}",
            self.python, spec.module_name, spec.cmd_args
        );

        command
            .spawn()
            .map_err(|e| RuntimeError::io(format!("failed to start {}", spec.module_name), e))
    }

    async fn wait(&self, spec: &LaunchSpec, mut child: Child) -> Result<(), RuntimeError> {
        let status = child
            .wait()
            .await
            .map_err(|e| RuntimeError::io(format!("failed to wait for {}", spec.module_name), e))?;

        if !status.success() {
            return Err(RuntimeError::ExitStatus {
                module: spec.module_name.clone(),
                code: status.code(),
            });
        }

        info!("{} exited successfully", spec.module_name);
        Ok(())
    }
}

#[async_trait]
impl TrainingRuntime for ProcessRuntime {
    async fn run_module(&self, spec: &LaunchSpec, wait: bool) -> Result<Launched, RuntimeError> {
        self.install(&spec.module_dir).await?;

        if wait {
            let child = self.spawn(spec, false)?;
            self.wait(spec, child).await?;
            Ok(Launched::Completed)
        } else {
            let child = self.spawn(spec, true)?;
            info!(
                "{} running in background (pid {:?})",
                spec.module_name,
                child.id()
            );
            Ok(Launched::Background(Box::new(ChildHandle { child })))
        }
    }

    async fn write_env_vars(
        &self,
        env_vars: &BTreeMap<String, String>,
    ) -> Result<(), RuntimeError> {
        if let Some(parent) = self.env_file.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                RuntimeError::io(format!("failed to create {}", parent.display()), e)
            })?;
        }

        tokio::fs::write(&self.env_file, render_env_file(env_vars))
            .await
            .map_err(|e| {
                RuntimeError::io(format!("failed to write {}", self.env_file.display()), e)
            })?;

        debug!(
            "Wrote {} environment variables to {}",
            env_vars.len(),
            self.env_file.display()
        );
        Ok(())
    }

    async fn run(&self, spec: &LaunchSpec) -> Result<(), RuntimeError> {
        let child = self.spawn(spec, false)?;
        self.wait(spec, child).await
    }
}

/// Background training process
struct ChildHandle {
    child: Child,
}

#[async_trait]
impl ProcessHandle for ChildHandle {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    async fn terminate(&mut self) -> Result<(), RuntimeError> {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!("Background process already exited with {}", status);
                return Ok(());
            }
            Ok(None) => {}
            Err(e) => warn!("Failed to query background process: {}", e),
        }

        self.child
            .kill()
            .await
            .map_err(|e| RuntimeError::io("failed to stop background process", e))
    }
}

/// Renders variables as `export KEY='value'` lines
fn render_env_file(env_vars: &BTreeMap<String, String>) -> String {
    env_vars
        .iter()
        .map(|(key, value)| format!("export {}='{}'\n", key, value.replace('\'', r"'\''")))
        .collect()
}
