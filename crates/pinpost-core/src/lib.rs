//! Shared configuration and error types for the pinpost workspace.

pub mod config;
pub mod error;

pub use config::PinpostConfig;
pub use error::{PinpostError, Result};
