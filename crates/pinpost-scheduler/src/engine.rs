use std::sync::Arc;

use chrono::{DateTime, Utc};
use pinpost_publisher::{PublishOutcome, Publisher};
use pinpost_store::PinStore;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{Result, SchedulerError};

/// Counts from one sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Time-ordered ID for correlating the sweep's log lines.
    pub sweep_id: Uuid,
    /// The `now` the due set was computed against.
    pub as_of: DateTime<Utc>,
    /// Pins handed to the publisher.
    pub attempted: u32,
    /// Publishes the platform accepted.
    pub succeeded: u32,
    /// Publishes that failed; those pins stay due.
    pub failed: u32,
    /// Accepted publishes whose `posted` flag could not be written.
    pub unrecorded: u32,
}

impl SweepReport {
    fn new(as_of: DateTime<Utc>) -> Self {
        Self {
            sweep_id: Uuid::now_v7(),
            as_of,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            unrecorded: 0,
        }
    }
}

/// Runs sweeps: fetch due pins, publish each, persist the outcome.
///
/// Holds no state between sweeps; the store is re-read every time.
#[derive(Clone)]
pub struct DueItemScheduler {
    store: Arc<dyn PinStore>,
    publisher: Arc<dyn Publisher>,
}

impl DueItemScheduler {
    pub fn new(store: Arc<dyn PinStore>, publisher: Arc<dyn Publisher>) -> Self {
        Self { store, publisher }
    }

    /// Sweep against the current wall-clock time.
    pub async fn run_sweep(&self) -> Result<SweepReport> {
        self.run_sweep_at(Utc::now()).await
    }

    /// Sweep against an explicit instant.
    ///
    /// Pins are processed strictly one after another: pin N+1 is not sent
    /// until pin N's outcome has been persisted. A failure on one pin never
    /// stops the others; only a failed fetch aborts the sweep.
    pub async fn run_sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let mut report = SweepReport::new(now);
        let sweep_id = report.sweep_id;

        let due = self.store.fetch_due(now).await.map_err(|e| {
            error!(%sweep_id, error = %e, "sweep aborted: could not fetch due pins");
            SchedulerError::Fetch(e)
        })?;

        if due.is_empty() {
            debug!(%sweep_id, "no pins due");
            return Ok(report);
        }

        info!(%sweep_id, due = due.len(), publisher = self.publisher.name(), "sweep started");

        for pin in due {
            report.attempted += 1;
            match self.publisher.publish(&pin).await {
                PublishOutcome::Published { external_id } => {
                    report.succeeded += 1;
                    match self.store.mark_posted(pin.id).await {
                        Ok(true) => {
                            info!(%sweep_id, pin_id = pin.id, %external_id, "pin posted");
                        }
                        Ok(false) => {
                            warn!(%sweep_id, pin_id = pin.id, %external_id, "pin was already marked posted; it has been published more than once");
                        }
                        Err(e) => {
                            // The platform has the pin but the row still reads
                            // pending, so the next sweep will publish it again.
                            report.unrecorded += 1;
                            error!(%sweep_id, pin_id = pin.id, %external_id, error = %e, "pin published but could not be marked posted");
                        }
                    }
                }
                PublishOutcome::Failed { reason } => {
                    report.failed += 1;
                    warn!(%sweep_id, pin_id = pin.id, %reason, "publish failed; pin stays due");
                }
            }
        }

        info!(
            %sweep_id,
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            unrecorded = report.unrecorded,
            "sweep finished"
        );
        Ok(report)
    }
}
