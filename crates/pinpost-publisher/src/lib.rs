//! `pinpost-publisher`: publishes one pin to the external platform and
//! classifies the result.
//!
//! Publishers never touch the store and never return an error: every
//! transport, API, or parse failure comes back as [`PublishOutcome::Failed`]
//! so the caller can treat it as ordinary data.

pub mod pinterest;
pub mod publisher;

pub use pinterest::PinterestPublisher;
pub use publisher::{PublishError, PublishOutcome, Publisher};
