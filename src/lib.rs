//! Client core for a remote voting job's HTTP control-plane.
//!
//! Starts a job, polls its status at a fixed cadence, reconciles the server's
//! cumulative log into a bounded view and projects progress for display.

pub mod api;
pub mod error;
pub mod logview;
pub mod model;
pub mod orchestrator;
pub mod progress;

pub use error::ClientError;
