//! Run lifecycle controller.
//!
//! Owns the session and is the only place that touches it. UI commands, poll
//! reports and in-flight start/stop calls are multiplexed on one task so every
//! session transition is applied in a single, ordered sequence.

use super::poller::{PollReport, Poller};
use super::session::Session;
use crate::api::ControlPlane;
use crate::error::ClientError;
use crate::logview::LogView;
use crate::model::{ClientConfig, ControlReply, JobForm, SessionEvent};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub enum UiCommand {
    Submit(JobForm),
    Stop,
    Quit,
}

type Call = JoinHandle<Result<ControlReply, ClientError>>;

/// Drive one session until the UI quits or drops its command sender.
pub async fn run_controller(
    cfg: &ClientConfig,
    api: Arc<dyn ControlPlane>,
    event_tx: UnboundedSender<SessionEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let (report_tx, mut report_rx) = mpsc::unbounded_channel::<PollReport>();
    let poller = Poller::new(api.clone(), report_tx);
    let mut session = Session::new(
        cfg.poll_interval,
        LogView::new(cfg.max_log_lines, cfg.dedup),
        poller,
        event_tx,
    );
    let mut start_call: Option<Call> = None;
    let mut stop_call: Option<Call> = None;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Submit(form)) => {
                        // Invalid input is already reported by the session as a log line.
                        if let Ok(pairs) = session.submit(&form) {
                            let api = api.clone();
                            start_call = Some(tokio::spawn(async move { api.start(pairs).await }));
                        }
                    }
                    Some(UiCommand::Stop) => {
                        if session.request_stop() {
                            let api = api.clone();
                            stop_call = Some(tokio::spawn(async move { api.stop().await }));
                        }
                    }
                    Some(UiCommand::Quit) | None => break,
                }
            }
            Some(report) = report_rx.recv() => {
                session.on_poll(report);
            }
            // Do not take the JoinHandle before this branch wins; otherwise it is
            // dropped when another branch is chosen and the reply is lost.
            reply = join_call(&mut start_call) => {
                start_call = None;
                if let Err(e) = session.on_start_reply(reply) {
                    log::debug!("start did not go through: {e}");
                }
            }
            reply = join_call(&mut stop_call) => {
                stop_call = None;
                session.on_stop_reply(reply);
            }
        }
    }

    for call in [start_call.take(), stop_call.take()].into_iter().flatten() {
        call.abort();
    }
    session.shutdown();
    Ok(())
}

async fn join_call(call: &mut Option<Call>) -> Result<ControlReply, ClientError> {
    match call.as_mut() {
        Some(handle) => match handle.await {
            Ok(reply) => reply,
            Err(e) => Err(ClientError::transport("request task", e)),
        },
        None => futures::future::pending().await,
    }
}
