use thiserror::Error;

/// Errors that end a sweep, or prevent one from starting.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The due set could not be read; nothing was attempted.
    #[error("Failed to fetch due pins: {0}")]
    Fetch(#[from] pinpost_store::StoreError),

    /// The sweep worker has exited and accepts no more triggers.
    #[error("Sweep worker is not running")]
    WorkerStopped,
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
