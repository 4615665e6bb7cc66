//! Application-level orchestration.
//!
//! This module owns the job lifecycle: the session state machine, the status
//! polling loop, and the controller task that drives both from UI commands.
//! UI/CLI layers only send [`UiCommand`]s and consume session events.

mod controller;
mod poller;
mod session;

pub use controller::{run_controller, UiCommand};
pub use poller::{PollReport, Poller};
pub use session::{parse_vote_count, Session};
