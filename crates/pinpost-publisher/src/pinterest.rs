use std::time::Duration;

use async_trait::async_trait;
use pinpost_core::config::PinterestConfig;
use pinpost_store::ScheduledPin;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::publisher::{PublishError, PublishOutcome, Publisher};

/// Pinterest requires a non-empty `note`; a lone space satisfies it.
const EMPTY_NOTE: &str = " ";

/// Publishes pins through the Pinterest v5 REST API (`POST /v5/pins`).
pub struct PinterestPublisher {
    client: reqwest::Client,
    base_url: String,
}

impl PinterestPublisher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(cfg: &PinterestConfig) -> Result<Self, PublishError> {
        Self::new(
            cfg.base_url.clone(),
            Duration::from_secs(cfg.request_timeout_secs),
        )
    }

    async fn try_publish(&self, pin: &ScheduledPin) -> Result<String, PublishError> {
        let url = format!("{}/v5/pins", self.base_url);
        debug!(pin_id = pin.id, board_id = %pin.board_id, "sending pin to Pinterest");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&pin.credential)
            .json(&build_request_body(pin))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            // The status alone is enough when the error body is unreadable.
            let text = resp.text().await.unwrap_or_default();
            let message = extract_error_message(&text)
                .unwrap_or_else(|| format!("API error: {}", status.as_u16()));
            warn!(pin_id = pin.id, status = status.as_u16(), reason = %message, "Pinterest API rejected pin");
            return Err(PublishError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = resp.text().await?;
        let created: CreatedPin =
            serde_json::from_str(&text).map_err(|e| PublishError::Parse(e.to_string()))?;
        Ok(created.id)
    }
}

#[async_trait]
impl Publisher for PinterestPublisher {
    fn name(&self) -> &str {
        "pinterest"
    }

    async fn publish(&self, pin: &ScheduledPin) -> PublishOutcome {
        match self.try_publish(pin).await {
            Ok(external_id) => {
                info!(pin_id = pin.id, %external_id, "pin published to Pinterest");
                PublishOutcome::Published { external_id }
            }
            Err(e) => {
                if !matches!(e, PublishError::Api { .. }) {
                    warn!(pin_id = pin.id, error = %e, "Pinterest publish failed");
                }
                e.into()
            }
        }
    }
}

/// Request body for `POST /v5/pins`.
#[derive(Debug, Serialize)]
struct CreatePinBody<'a> {
    board_id: &'a str,
    media_source: MediaSource<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<&'a str>,
    note: &'a str,
}

#[derive(Debug, Serialize)]
struct MediaSource<'a> {
    source_type: &'static str,
    url: &'a str,
}

fn build_request_body(pin: &ScheduledPin) -> CreatePinBody<'_> {
    CreatePinBody {
        board_id: &pin.board_id,
        media_source: MediaSource {
            source_type: "image_url",
            url: &pin.image_url,
        },
        link: pin.link.as_deref(),
        note: pin
            .description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(EMPTY_NOTE),
    }
}

/// Pull `message` out of an error body, if the body is JSON and carries one.
fn extract_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
}

// Pinterest API response types (private: only used for deserialization)

#[derive(Deserialize)]
struct CreatedPin {
    id: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}
