//! Runner configuration
//!
//! Defines the tunable parameters of the launcher: how the master is probed,
//! how often, and how training processes are started.

use std::path::PathBuf;
use std::time::Duration;
use tether_core::CONTROL_PORT;

/// How the master's control port is probed
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProbeKind {
    /// Plain TCP connect
    Tcp,
    /// HTTP GET; any reply counts as reachable
    Http,
}

/// Runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Delay between two liveness probes while the master is up
    pub poll_interval: Duration,

    /// Give up after this many probes; `None` waits for the master forever
    pub max_probes: Option<u32>,

    /// Probe implementation
    pub probe: ProbeKind,

    /// Port probed on the master
    pub control_port: u16,

    /// Connect timeout of a single probe
    pub probe_timeout: Duration,

    /// Interpreter used to install and run the training module
    pub python: String,

    /// File the training environment is written to before a run without install
    pub env_file: PathBuf,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(env_file: PathBuf) -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            max_probes: None,
            probe: ProbeKind::Tcp,
            control_port: CONTROL_PORT,
            probe_timeout: Duration::from_secs(5),
            python: "python3".to_string(),
            env_file,
        }
    }

    /// Bounds the liveness poller
    pub fn with_max_probes(mut self, max_probes: u32) -> Self {
        self.max_probes = Some(max_probes);
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.probe_timeout.is_zero() {
            anyhow::bail!("probe_timeout must be greater than 0");
        }

        if self.max_probes == Some(0) {
            anyhow::bail!("max_probes must be greater than 0 when set");
        }

        if self.control_port == 0 {
            anyhow::bail!("control_port cannot be 0");
        }

        if self.python.trim().is_empty() {
            anyhow::bail!("python interpreter cannot be empty");
        }

        if self.env_file.as_os_str().is_empty() {
            anyhow::bail!("env_file cannot be empty");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join("tether").join("training_env.sh"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.control_port, 2222);
        assert_eq!(config.max_probes, None);
        assert_eq!(config.probe, ProbeKind::Tcp);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.poll_interval = Duration::ZERO;
        assert!(config.validate().is_err());
        config.poll_interval = Duration::from_secs(1);

        config.max_probes = Some(0);
        assert!(config.validate().is_err());
        config.max_probes = Some(3);
        assert!(config.validate().is_ok());

        config.python = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_max_probes() {
        let config = Config::default().with_max_probes(7);
        assert_eq!(config.max_probes, Some(7));
    }
}
