//! Liveness layer
//!
//! Detects when the master of the job has finished so that parameter server
//! hosts can shut their parameter server down.

pub mod poller;
pub mod probe;

pub use poller::{LivenessError, LivenessPoller};
pub use probe::{HttpProbe, MasterProbe, Reachability, TcpProbe};
