use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{error, info};
use uuid::Uuid;

use crate::engine::{DueItemScheduler, SweepReport};
use crate::error::{Result, SchedulerError};

/// What happened to a trigger request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerStatus {
    /// A new sweep was queued behind any running one.
    Queued,
    /// A sweep was already waiting; it will cover this request too.
    Coalesced,
}

/// Outcome of the most recent sweep, as seen by the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SweepRecord {
    /// `"trigger"` or `"interval"`.
    pub cause: &'static str,
    /// Receipt of the trigger request that queued this sweep.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_id: Option<Uuid>,
    pub finished_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SweepReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Cheap, cloneable handle that asks the worker for a sweep without waiting.
#[derive(Clone)]
pub struct SweepTrigger {
    tx: mpsc::Sender<Uuid>,
    last: watch::Receiver<Option<SweepRecord>>,
}

impl SweepTrigger {
    /// Hand a sweep to the worker and return immediately.
    ///
    /// Never blocks: when every queue slot is taken the request is folded
    /// into a sweep that has not started yet, which will read the same (or a
    /// newer) due set. A queued `receipt_id` is logged with the sweep it
    /// starts; a coalesced one is only logged by the caller.
    pub fn request(&self, receipt_id: Uuid) -> Result<TriggerStatus> {
        match self.tx.try_send(receipt_id) {
            Ok(()) => Ok(TriggerStatus::Queued),
            Err(mpsc::error::TrySendError::Full(_)) => Ok(TriggerStatus::Coalesced),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SchedulerError::WorkerStopped),
        }
    }

    /// The most recent finished sweep, if any.
    pub fn last_sweep(&self) -> Option<SweepRecord> {
        self.last.borrow().clone()
    }

    /// Watch for finished sweeps.
    pub fn subscribe(&self) -> watch::Receiver<Option<SweepRecord>> {
        self.last.clone()
    }
}

/// The only task that runs sweeps. Owning the scheduler here is what keeps
/// sweeps from overlapping.
pub struct SweepWorker {
    scheduler: DueItemScheduler,
    rx: mpsc::Receiver<Uuid>,
    poll_interval: Option<Duration>,
    last: watch::Sender<Option<SweepRecord>>,
}

/// Build a worker and its trigger handle.
///
/// `queue_depth` is how many requests may wait behind a running sweep (at
/// least one). With a non-zero `poll_interval` the worker also sweeps on its
/// own; zero means trigger-only.
pub fn sweep_worker(
    scheduler: DueItemScheduler,
    queue_depth: usize,
    poll_interval: Option<Duration>,
) -> (SweepWorker, SweepTrigger) {
    let (tx, rx) = mpsc::channel(queue_depth.max(1));
    let (last_tx, last_rx) = watch::channel(None);
    let worker = SweepWorker {
        scheduler,
        rx,
        poll_interval: poll_interval.filter(|every| !every.is_zero()),
        last: last_tx,
    };
    let trigger = SweepTrigger { tx, last: last_rx };
    (worker, trigger)
}

impl SweepWorker {
    /// Main loop. Runs until `shutdown` broadcasts `true` (after finishing
    /// the sweep in progress) or until every [`SweepTrigger`] is dropped
    /// (after draining the sweeps already queued).
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(poll_interval = ?self.poll_interval, "sweep worker started");

        let mut ticker = self.poll_interval.map(|every| {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("sweep worker shutting down");
                        break;
                    }
                }
                req = self.rx.recv() => match req {
                    Some(receipt_id) => self.sweep("trigger", Some(receipt_id)).await,
                    None => {
                        info!("all trigger handles dropped; sweep worker stopping");
                        break;
                    }
                },
                _ = next_tick(&mut ticker) => self.sweep("interval", None).await,
            }
        }
    }

    async fn sweep(&self, cause: &'static str, receipt_id: Option<Uuid>) {
        let record = match self.scheduler.run_sweep().await {
            Ok(report) => {
                info!(cause, ?receipt_id, sweep_id = %report.sweep_id, "sweep finished");
                SweepRecord {
                    cause,
                    receipt_id,
                    finished_at: Utc::now(),
                    report: Some(report),
                    error: None,
                }
            }
            Err(e) => {
                error!(cause, ?receipt_id, error = %e, "sweep failed");
                SweepRecord {
                    cause,
                    receipt_id,
                    finished_at: Utc::now(),
                    report: None,
                    error: Some(e.to_string()),
                }
            }
        };
        self.last.send_replace(Some(record));
    }
}

/// Resolves on the next tick, or never when no interval is configured.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{due_pin, FlakyStore, ScriptedPublisher};
    use pinpost_store::{PinStore, SqlitePinStore};
    use std::sync::Arc;

    const WAIT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn overlapping_triggers_publish_each_pin_once() {
        let store = Arc::new(SqlitePinStore::open_in_memory().unwrap());
        let id = store.insert(&due_pin("http://x/img.png")).await.unwrap();
        let publisher =
            Arc::new(ScriptedPublisher::succeeding().with_delay(Duration::from_millis(50)));
        let (worker, trigger) =
            sweep_worker(DueItemScheduler::new(store.clone(), publisher.clone()), 1, None);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(worker.run(shutdown_rx));

        assert_eq!(trigger.request(Uuid::new_v4()).unwrap(), TriggerStatus::Queued);
        for _ in 0..5 {
            trigger.request(Uuid::new_v4()).unwrap();
        }
        let updates = trigger.subscribe();
        drop(trigger);
        tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();

        assert_eq!(publisher.calls(), vec![id]);
        assert!(store.get(id).await.unwrap().unwrap().posted);
        let last = updates.borrow().clone().expect("at least one sweep ran");
        assert_eq!(last.cause, "trigger");
        assert!(last.receipt_id.is_some());
    }

    #[tokio::test]
    async fn queue_full_requests_are_coalesced() {
        let store = Arc::new(SqlitePinStore::open_in_memory().unwrap());
        let publisher = Arc::new(ScriptedPublisher::succeeding());
        // Worker not spawned: nothing drains the single slot.
        let (_worker, trigger) = sweep_worker(DueItemScheduler::new(store, publisher), 1, None);

        assert_eq!(trigger.request(Uuid::new_v4()).unwrap(), TriggerStatus::Queued);
        assert_eq!(trigger.request(Uuid::new_v4()).unwrap(), TriggerStatus::Coalesced);
    }

    #[tokio::test]
    async fn request_after_worker_exit_is_an_error() {
        let store = Arc::new(SqlitePinStore::open_in_memory().unwrap());
        let publisher = Arc::new(ScriptedPublisher::succeeding());
        let (worker, trigger) = sweep_worker(DueItemScheduler::new(store, publisher), 1, None);
        drop(worker);

        assert!(matches!(trigger.request(Uuid::new_v4()), Err(SchedulerError::WorkerStopped)));
    }

    #[tokio::test]
    async fn shutdown_signal_stops_worker() {
        let store = Arc::new(SqlitePinStore::open_in_memory().unwrap());
        let publisher = Arc::new(ScriptedPublisher::succeeding());
        let (worker, _trigger) = sweep_worker(DueItemScheduler::new(store, publisher), 1, None);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(worker.run(shutdown_rx));

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn queued_trigger_does_not_outrun_shutdown() {
        let store = Arc::new(SqlitePinStore::open_in_memory().unwrap());
        store.insert(&due_pin("http://x/img.png")).await.unwrap();
        let publisher = Arc::new(ScriptedPublisher::succeeding());
        let (worker, trigger) =
            sweep_worker(DueItemScheduler::new(store, publisher.clone()), 1, None);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        assert_eq!(trigger.request(Uuid::new_v4()).unwrap(), TriggerStatus::Queued);
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(WAIT, worker.run(shutdown_rx)).await.unwrap();

        assert!(publisher.calls().is_empty());
        assert!(trigger.last_sweep().is_none());
    }

    #[tokio::test]
    async fn zero_poll_interval_means_trigger_only() {
        let store = Arc::new(SqlitePinStore::open_in_memory().unwrap());
        let id = store.insert(&due_pin("http://x/img.png")).await.unwrap();
        let publisher = Arc::new(ScriptedPublisher::succeeding());
        let (worker, trigger) = sweep_worker(
            DueItemScheduler::new(store.clone(), publisher),
            1,
            Some(Duration::ZERO),
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(worker.run(shutdown_rx));

        let mut updates = trigger.subscribe();
        trigger.request(Uuid::new_v4()).unwrap();
        tokio::time::timeout(WAIT, updates.wait_for(|r| r.is_some()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(trigger.last_sweep().unwrap().cause, "trigger");
        assert!(store.get(id).await.unwrap().unwrap().posted);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn poll_interval_sweeps_without_a_trigger() {
        let store = Arc::new(SqlitePinStore::open_in_memory().unwrap());
        let id = store.insert(&due_pin("http://x/img.png")).await.unwrap();
        let publisher = Arc::new(ScriptedPublisher::succeeding());
        let (worker, trigger) = sweep_worker(
            DueItemScheduler::new(store.clone(), publisher),
            1,
            Some(Duration::from_millis(20)),
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(worker.run(shutdown_rx));

        let mut updates = trigger.subscribe();
        tokio::time::timeout(WAIT, updates.wait_for(|r| r.is_some()))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(trigger.last_sweep().unwrap().cause, "interval");
        assert!(store.get(id).await.unwrap().unwrap().posted);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn failed_sweep_is_recorded() {
        let store = Arc::new(FlakyStore::new().fail_fetch());
        let publisher = Arc::new(ScriptedPublisher::succeeding());
        let (worker, trigger) = sweep_worker(DueItemScheduler::new(store, publisher), 1, None);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(worker.run(shutdown_rx));

        trigger.request(Uuid::new_v4()).unwrap();
        let updates = trigger.subscribe();
        drop(trigger);
        tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();

        let last = updates.borrow().clone().unwrap();
        assert!(last.report.is_none());
        assert!(last.error.unwrap().contains("Failed to fetch due pins"));
    }
}
