//! Error types for a launcher run

use tether_core::TopologyError;
use thiserror::Error;

use crate::liveness::LivenessError;
use crate::runtime::RuntimeError;

/// Exit code used for configuration errors
pub const CONFIG_EXIT_CODE: u8 = 2;

/// Everything that can end a job on this host unsuccessfully
#[derive(Debug, Error)]
pub enum JobError {
    /// The topology cannot be resolved from the given inputs
    #[error("invalid job configuration: {0}")]
    Config(#[from] TopologyError),

    /// The cluster descriptor could not be serialized
    #[error("failed to serialize cluster descriptor: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The training runtime failed to install or run the module
    #[error("launch failed: {0}")]
    Launch(#[from] RuntimeError),

    /// The master liveness wait ended without the master exiting
    #[error(transparent)]
    Liveness(#[from] LivenessError),
}

impl JobError {
    /// Whether retrying with the same inputs cannot succeed
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Process exit code reported for this error
    ///
    /// A training process that exited unsuccessfully passes its own code
    /// through; configuration errors use `CONFIG_EXIT_CODE`.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => CONFIG_EXIT_CODE,
            Self::Launch(RuntimeError::ExitStatus {
                code: Some(code), ..
            }) => u8::try_from(*code).ok().filter(|code| *code != 0).unwrap_or(1),
            _ => 1,
        }
    }
}
