//! `pinpost-scheduler`: finds due pins and publishes them.
//!
//! # Overview
//!
//! A *sweep* ([`engine::DueItemScheduler::run_sweep`]) reads every pin with
//! `posted = false AND scheduled_at <= now`, publishes each one in turn, and
//! marks it posted on success. A failed publish leaves the pin untouched, so
//! the next sweep simply tries again.
//!
//! Sweeps are started through a [`worker::SweepTrigger`]. The single
//! [`worker::SweepWorker`] behind it runs them one at a time, so two triggers
//! arriving together can never publish the same pin twice.

pub mod engine;
pub mod error;
pub mod worker;

#[cfg(test)]
mod testing;

pub use engine::{DueItemScheduler, SweepReport};
pub use error::{Result, SchedulerError};
pub use worker::{sweep_worker, SweepRecord, SweepTrigger, SweepWorker, TriggerStatus};
