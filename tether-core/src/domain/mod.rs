//! Core domain types
//!
//! The structures shared between topology resolution (pure) and the runner
//! (which serializes them into the training process environment).

pub mod cluster;
pub mod host;
pub mod role;
