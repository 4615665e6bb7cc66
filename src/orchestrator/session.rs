//! Session state machine.
//!
//! Owns the log view, the poll handle and the session state. Network calls are
//! issued by the run controller; the session only decides what to send and
//! folds the replies back in, emitting [`SessionEvent`]s as it goes.

use super::poller::{PollReport, Poller};
use crate::error::ClientError;
use crate::logview::{reconcile, LogView};
use crate::model::{
    Affordances, ControlReply, JobForm, JobSnapshot, ProgressUpdate, ReplyStatus, SessionEvent,
    SessionState,
};
use crate::progress::project_update;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

pub struct Session {
    state: SessionState,
    poll_interval: Duration,
    log: LogView,
    poller: Poller,
    event_tx: UnboundedSender<SessionEvent>,
    last_applied_seq: u64,
    last_snapshot: Option<JobSnapshot>,
    poll_failures: u32,
    stop_requested: bool,
}

impl Session {
    pub fn new(
        poll_interval: Duration,
        log: LogView,
        poller: Poller,
        event_tx: UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            state: SessionState::Idle,
            poll_interval,
            log,
            poller,
            event_tx,
            last_applied_seq: 0,
            last_snapshot: None,
            poll_failures: 0,
            stop_requested: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn affordances(&self) -> Affordances {
        self.state.affordances()
    }

    pub fn log(&self) -> &LogView {
        &self.log
    }

    pub fn last_snapshot(&self) -> Option<&JobSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_polling()
    }

    /// Validate a submitted form and move to `Starting`.
    ///
    /// Returns the form pairs to send to `/start_voting`. Nothing is sent when
    /// validation fails.
    pub fn submit(&mut self, form: &JobForm) -> Result<Vec<(String, String)>, ClientError> {
        if !self.affordances().submit_enabled {
            let err = ClientError::InvalidInput("A voting process is already active".into());
            self.append_error(&err);
            return Err(err);
        }
        let num_votes = match parse_vote_count(&form.num_votes) {
            Ok(n) => n,
            Err(err) => {
                self.append_error(&err);
                return Err(err);
            }
        };

        self.set_state(SessionState::Starting);
        self.emit(SessionEvent::Progress(ProgressUpdate::starting()));
        log::info!("requesting start of {num_votes} votes");
        Ok(form.to_pairs(num_votes))
    }

    /// Fold the `/start_voting` outcome in.
    pub fn on_start_reply(
        &mut self,
        result: Result<ControlReply, ClientError>,
    ) -> Result<(), ClientError> {
        if self.state != SessionState::Starting {
            log::debug!("ignoring start reply in state {:?}", self.state);
            return Ok(());
        }

        let reply = match result {
            Ok(reply) => reply,
            Err(err) => {
                log::warn!("start request failed: {err}");
                self.append_error(&err);
                self.set_state(SessionState::Idle);
                return Err(err);
            }
        };

        if reply.status == ReplyStatus::Error {
            let err = ClientError::StartRejected(reply.message_or("start rejected").to_string());
            log::warn!("server rejected start: {err}");
            self.append_error(&err);
            self.set_state(SessionState::Idle);
            return Err(err);
        }

        // New job: the previous log goes before anything of this one lands.
        self.log.clear();
        self.emit(SessionEvent::LogCleared);
        self.last_applied_seq = 0;
        self.last_snapshot = None;
        self.poll_failures = 0;
        self.stop_requested = false;

        self.append_local(format!(
            "Started voting process: {}",
            reply.message_or("accepted")
        ));

        if let Err(err) = self.poller.start(self.poll_interval) {
            self.append_error(&err);
            self.set_state(SessionState::Idle);
            return Err(err);
        }
        self.set_state(SessionState::Running);
        Ok(())
    }

    /// Move to `Stopping` if a stop request should be sent.
    ///
    /// Polling keeps running so the final snapshot is still captured.
    pub fn request_stop(&mut self) -> bool {
        if self.state != SessionState::Running {
            return false;
        }
        self.stop_requested = true;
        self.set_state(SessionState::Stopping);
        true
    }

    /// Fold the `/stop_voting` outcome in.
    pub fn on_stop_reply(&mut self, result: Result<ControlReply, ClientError>) {
        if self.state != SessionState::Stopping {
            log::debug!("ignoring stop reply in state {:?}", self.state);
            return;
        }
        let err = match result {
            Ok(reply) if reply.status == ReplyStatus::Success => {
                self.append_local("Stopping voting process...".to_string());
                self.emit(SessionEvent::Status("Stopping...".into()));
                return;
            }
            Ok(reply) => ClientError::StopRejected(reply.message_or("stop rejected").to_string()),
            Err(err) => err,
        };
        log::warn!("stop request failed: {err}");
        self.append_error(&err);
        self.stop_requested = false;
        self.set_state(SessionState::Running);
    }

    /// Apply one poll report.
    pub fn on_poll(&mut self, report: PollReport) {
        if self.poller.generation() != Some(report.generation) {
            log::debug!(
                "dropping report from stale poll generation {}",
                report.generation
            );
            return;
        }
        if report.seq <= self.last_applied_seq {
            log::debug!(
                "dropping out-of-order report {} (last applied {})",
                report.seq,
                self.last_applied_seq
            );
            return;
        }
        self.last_applied_seq = report.seq;

        match report.outcome {
            Ok(snapshot) => self.apply_snapshot(snapshot),
            Err(ClientError::NoActiveSession(message)) => {
                log::info!("no active session on server: {message}");
                self.poller.stop();
                self.append_error(&ClientError::NoActiveSession(message));
                self.set_state(SessionState::Idle);
                let last = self.last_snapshot.take().map(Box::new);
                self.emit(SessionEvent::Finished(last));
            }
            Err(err) => {
                self.poll_failures += 1;
                log::warn!("status check failed ({} in a row): {err}", self.poll_failures);
                if self.poll_failures == 1 {
                    self.append_error(&err);
                }
            }
        }
    }

    /// Release the poll handle; used when the controller exits.
    pub fn shutdown(&mut self) {
        self.poller.stop();
    }

    fn apply_snapshot(&mut self, snapshot: JobSnapshot) {
        if self.poll_failures > 0 {
            log::info!("status checks recovered after {} failures", self.poll_failures);
            self.poll_failures = 0;
        }
        self.emit(SessionEvent::Progress(project_update(&snapshot)));

        let appended = reconcile(&mut self.log, &snapshot.log_messages);
        if !appended.is_empty() {
            self.emit(SessionEvent::LogAppended(appended));
        }

        if snapshot.is_running {
            self.last_snapshot = Some(snapshot);
            return;
        }

        self.poller.stop();
        let line = if self.stop_requested {
            "Voting process stopped"
        } else {
            "Voting process completed"
        };
        log::info!(
            "{line}: {}/{} votes, {} ok, {} failed",
            snapshot.completed_votes,
            snapshot.total_votes,
            snapshot.success_count,
            snapshot.error_count
        );
        self.append_local(line.to_string());
        self.set_state(SessionState::Terminal);
        self.last_snapshot = Some(snapshot.clone());
        self.emit(SessionEvent::Finished(Some(Box::new(snapshot))));
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            log::debug!("session {:?} -> {:?}", self.state, state);
            self.state = state;
            self.emit(SessionEvent::State(state));
        }
    }

    fn append_error(&mut self, err: &ClientError) {
        self.append_local(format!("Error: {err}"));
    }

    fn append_local(&mut self, line: String) {
        self.log.push_local(line.clone());
        self.emit(SessionEvent::LogAppended(vec![line]));
    }

    fn emit(&self, ev: SessionEvent) {
        let _ = self.event_tx.send(ev);
    }
}

/// Parse the vote count field: a positive integer, surrounding blanks allowed.
pub fn parse_vote_count(raw: &str) -> Result<u64, ClientError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ClientError::InvalidInput(
            "Please enter the number of votes".into(),
        ));
    }
    match trimmed.parse::<u64>() {
        Ok(0) => Err(ClientError::InvalidInput(
            "Please enter a positive number of votes".into(),
        )),
        Ok(n) => Ok(n),
        Err(_) => Err(ClientError::InvalidInput(format!(
            "Please enter a valid number (got {trimmed:?})"
        ))),
    }
}
