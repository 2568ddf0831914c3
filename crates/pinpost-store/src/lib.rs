//! `pinpost-store`: durable record of scheduled pins, backed by SQLite.
//!
//! The `scheduled_pins` table is the single source of truth for what has and
//! has not been published. There is no in-memory cache: every sweep re-reads
//! the due set, so the database is the only coordination point.
//!
//! A pin moves through exactly two states:
//!
//! | `is_posted` | Meaning                                               |
//! |-------------|-------------------------------------------------------|
//! | `0`         | Pending; due once `scheduled_at <= now`               |
//! | `1`         | Published; never reverts, never re-fetched            |

pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::{Result, StoreError, ValidationError};
pub use store::{PinStore, SqlitePinStore};
pub use types::{NewPin, NewPinRequest, ScheduledPin};
