//! Status polling loop.
//!
//! One spawned task per active job issues `check_status` at a fixed cadence and
//! forwards every outcome to the session. Requests are awaited inside the loop,
//! so there is never more than one in flight and reports arrive in issue order.

use crate::api::ControlPlane;
use crate::error::ClientError;
use crate::model::JobSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Outcome of one tick, tagged so stale reports can be discarded.
#[derive(Debug)]
pub struct PollReport {
    /// Which handle produced this report.
    pub generation: u64,
    /// Tick number within that handle, starting at 1.
    pub seq: u64,
    pub outcome: Result<JobSnapshot, ClientError>,
}

/// Handle to the live polling task.
struct PollHandle {
    generation: u64,
    task: JoinHandle<()>,
}

pub struct Poller {
    api: Arc<dyn ControlPlane>,
    report_tx: UnboundedSender<PollReport>,
    handle: Option<PollHandle>,
    generations: u64,
}

impl Poller {
    pub fn new(api: Arc<dyn ControlPlane>, report_tx: UnboundedSender<PollReport>) -> Self {
        Self {
            api,
            report_tx,
            handle: None,
            generations: 0,
        }
    }

    /// Begin polling every `interval`. The first tick fires one interval from now.
    pub fn start(&mut self, interval: Duration) -> Result<u64, ClientError> {
        if self.handle.is_some() {
            return Err(ClientError::AlreadyPolling);
        }
        self.generations += 1;
        let generation = self.generations;
        let interval = interval.max(MIN_INTERVAL);
        let task = tokio::spawn(poll_loop(
            self.api.clone(),
            interval,
            generation,
            self.report_tx.clone(),
        ));
        log::debug!("polling started (generation {generation}, every {interval:?})");
        self.handle = Some(PollHandle { generation, task });
        Ok(generation)
    }

    /// Cancel the live handle, if any.
    pub fn stop(&mut self) {
        if let Some(h) = self.handle.take() {
            // Dropping a JoinHandle does not cancel the task; abort it explicitly.
            h.task.abort();
            log::debug!("polling stopped (generation {})", h.generation);
        }
    }

    pub fn is_polling(&self) -> bool {
        self.handle.is_some()
    }

    /// Generation of the live handle.
    pub fn generation(&self) -> Option<u64> {
        self.handle.as_ref().map(|h| h.generation)
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(
    api: Arc<dyn ControlPlane>,
    interval: Duration,
    generation: u64,
    report_tx: UnboundedSender<PollReport>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    // A slow response delays the next tick instead of queueing a burst.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut seq = 0u64;

    loop {
        ticker.tick().await;
        seq += 1;
        let outcome = api.status().await;
        if let Err(e) = &outcome {
            log::debug!("poll {generation}/{seq} failed: {e}");
        }
        let report = PollReport {
            generation,
            seq,
            outcome,
        };
        if report_tx.send(report).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ControlReply;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::sync::mpsc;

    struct CountingPlane {
        calls: AtomicU64,
        fail_on: u64,
    }

    #[async_trait]
    impl ControlPlane for CountingPlane {
        async fn start(&self, _form: Vec<(String, String)>) -> Result<ControlReply, ClientError> {
            unreachable!("poller never starts jobs")
        }

        async fn stop(&self) -> Result<ControlReply, ClientError> {
            unreachable!("poller never stops jobs")
        }

        async fn status(&self) -> Result<JobSnapshot, ClientError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.fail_on {
                return Err(ClientError::transport("check_status", "connection reset"));
            }
            Ok(JobSnapshot {
                is_running: true,
                current_status: format!("tick {n}"),
                total_votes: 10,
                completed_votes: n,
                success_count: n,
                error_count: 0,
                log_messages: Vec::new(),
                current_batch: None,
                total_batches: None,
            })
        }
    }

    fn plane(fail_on: u64) -> Arc<CountingPlane> {
        Arc::new(CountingPlane {
            calls: AtomicU64::new(0),
            fail_on,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_is_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut poller = Poller::new(plane(0), tx);
        poller.start(Duration::from_millis(1000)).unwrap();
        assert!(matches!(
            poller.start(Duration::from_millis(1000)),
            Err(ClientError::AlreadyPolling)
        ));
        poller.stop();
        assert!(poller.start(Duration::from_millis(1000)).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut poller = Poller::new(plane(0), tx);
        poller.stop();
        poller.stop();
        assert!(!poller.is_polling());
        assert_eq!(poller.generation(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_does_not_end_the_loop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut poller = Poller::new(plane(2), tx);
        let generation = poller.start(Duration::from_millis(1000)).unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        let third = rx.recv().await.unwrap();
        poller.stop();

        assert_eq!(first.generation, generation);
        assert_eq!((first.seq, second.seq, third.seq), (1, 2, 3));
        assert!(first.outcome.is_ok());
        assert!(matches!(second.outcome, Err(ClientError::Transport { .. })));
        assert_eq!(third.outcome.unwrap().completed_votes, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_interval() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut poller = Poller::new(plane(0), tx);
        let started = Instant::now();
        poller.start(Duration::from_millis(1000)).unwrap();
        rx.recv().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn new_handle_gets_new_generation() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut poller = Poller::new(plane(0), tx);
        let a = poller.start(Duration::from_millis(1000)).unwrap();
        poller.stop();
        let b = poller.start(Duration::from_millis(1000)).unwrap();
        assert_ne!(a, b);
        assert_eq!(poller.generation(), Some(b));
    }
}
