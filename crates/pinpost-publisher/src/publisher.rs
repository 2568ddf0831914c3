use async_trait::async_trait;
use pinpost_store::ScheduledPin;

/// Classified result of one publish attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The platform accepted the pin and assigned it an identifier.
    Published { external_id: String },
    /// Anything else: non-2xx status, transport failure, unreadable body.
    Failed { reason: String },
}

impl PublishOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, PublishOutcome::Published { .. })
    }

    pub fn external_id(&self) -> Option<&str> {
        match self {
            PublishOutcome::Published { external_id } => Some(external_id),
            PublishOutcome::Failed { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            PublishOutcome::Published { .. } => None,
            PublishOutcome::Failed { reason } => Some(reason),
        }
    }
}

impl From<PublishError> for PublishOutcome {
    fn from(e: PublishError) -> Self {
        PublishOutcome::Failed {
            reason: e.to_string(),
        }
    }
}

/// Common interface for anything that can publish a scheduled pin.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publisher name for logging.
    fn name(&self) -> &str;

    /// Attempt to publish `pin` once. Must not mutate any store.
    async fn publish(&self, pin: &ScheduledPin) -> PublishOutcome;
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status. `message` is already human-readable.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Parse(String),
}
