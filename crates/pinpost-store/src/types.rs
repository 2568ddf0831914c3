use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A persisted pin awaiting (or past) publication.
///
/// `credential` is the Pinterest bearer token for the owning account. It is
/// never serialised and `Debug` prints it redacted.
#[derive(Clone, Serialize)]
pub struct ScheduledPin {
    /// Auto-assigned row ID, monotonically increasing.
    pub id: i64,
    #[serde(skip_serializing)]
    pub credential: String,
    /// Destination board on the external platform.
    pub board_id: String,
    /// Source URL of the image to publish.
    pub image_url: String,
    pub description: Option<String>,
    pub link: Option<String>,
    /// Eligible for publishing once `now >= scheduled_at`.
    pub scheduled_at: DateTime<Utc>,
    /// Flips false → true exactly once, after a successful publish.
    pub posted: bool,
    pub created_at: DateTime<Utc>,
}

impl ScheduledPin {
    /// True when this pin should be picked up by a sweep running at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.posted && self.scheduled_at <= now
    }
}

impl std::fmt::Debug for ScheduledPin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledPin")
            .field("id", &self.id)
            .field("credential", &"<redacted>")
            .field("board_id", &self.board_id)
            .field("image_url", &self.image_url)
            .field("description", &self.description)
            .field("link", &self.link)
            .field("scheduled_at", &self.scheduled_at)
            .field("posted", &self.posted)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Raw intake payload as received over HTTP.
///
/// Every field is optional at this layer so a missing field can be reported
/// by name instead of as a generic JSON error. Unknown fields are rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewPinRequest {
    pub credential: Option<String>,
    pub target_board: Option<String>,
    pub media_url: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    /// RFC 3339 timestamp; any offset is accepted and normalised to UTC.
    pub scheduled_at: Option<String>,
}

impl NewPinRequest {
    /// Check required fields and build a [`NewPin`].
    ///
    /// Blank strings count as absent. Checks run in a fixed order
    /// (credential, targetBoard, mediaUrl, scheduledAt) so the reported field
    /// is deterministic.
    pub fn validate(self) -> Result<NewPin, ValidationError> {
        let credential = required(self.credential, "credential")?;
        let board_id = required(self.target_board, "targetBoard")?;
        let image_url = required(self.media_url, "mediaUrl")?;
        let raw_at = required(self.scheduled_at, "scheduledAt")?;
        let scheduled_at = DateTime::parse_from_rfc3339(raw_at.trim())
            .map_err(|_| ValidationError::InvalidTimestamp(raw_at.clone()))?
            .with_timezone(&Utc);

        Ok(NewPin::new(credential, board_id, image_url, scheduled_at)?
            .with_description(self.description)
            .with_link(self.link))
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField(field)),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// A validated pin ready to be inserted.
///
/// Only constructible through [`NewPin::new`] (or [`NewPinRequest::validate`]),
/// so the store never sees a pin with a blank required field.
#[derive(Clone)]
pub struct NewPin {
    credential: String,
    board_id: String,
    image_url: String,
    description: Option<String>,
    link: Option<String>,
    scheduled_at: DateTime<Utc>,
}

impl NewPin {
    /// `scheduled_at` is truncated to whole milliseconds, the precision the
    /// store keeps, so the stored value equals the accepted one.
    pub fn new(
        credential: impl Into<String>,
        board_id: impl Into<String>,
        image_url: impl Into<String>,
        scheduled_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let credential = required(Some(credential.into()), "credential")?;
        let board_id = required(Some(board_id.into()), "targetBoard")?;
        let image_url = required(Some(image_url.into()), "mediaUrl")?;
        Ok(Self {
            credential,
            board_id,
            image_url,
            description: None,
            link: None,
            scheduled_at: scheduled_at.trunc_subsecs(3),
        })
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = non_blank(description);
        self
    }

    pub fn with_link(mut self, link: Option<String>) -> Self {
        self.link = non_blank(link);
        self
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }
    pub fn board_id(&self) -> &str {
        &self.board_id
    }
    pub fn image_url(&self) -> &str {
        &self.image_url
    }
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }
    pub fn scheduled_at(&self) -> DateTime<Utc> {
        self.scheduled_at
    }
}

impl std::fmt::Debug for NewPin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewPin")
            .field("credential", &"<redacted>")
            .field("board_id", &self.board_id)
            .field("image_url", &self.image_url)
            .field("scheduled_at", &self.scheduled_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn full_request() -> NewPinRequest {
        NewPinRequest {
            credential: Some("pina_secret".to_string()),
            target_board: Some("b1".to_string()),
            media_url: Some("http://x/img.png".to_string()),
            description: Some("autumn leaves".to_string()),
            link: None,
            scheduled_at: Some("2026-10-16T09:30:00+02:00".to_string()),
        }
    }

    #[test]
    fn validate_normalises_timestamp_to_utc() {
        let pin = full_request().validate().expect("valid request");
        assert_eq!(
            pin.scheduled_at(),
            Utc.with_ymd_and_hms(2026, 10, 16, 7, 30, 0).unwrap()
        );
        assert_eq!(pin.description(), Some("autumn leaves"));
        assert_eq!(pin.link(), None);
    }

    #[test]
    fn sub_millisecond_digits_are_dropped() {
        let req = NewPinRequest {
            scheduled_at: Some("2026-10-16T12:00:00.000500Z".to_string()),
            ..full_request()
        };
        let pin = req.validate().unwrap();
        assert_eq!(
            pin.scheduled_at(),
            Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn missing_media_url_is_rejected() {
        let req = NewPinRequest {
            media_url: None,
            ..full_request()
        };
        assert_eq!(
            req.validate().unwrap_err(),
            ValidationError::MissingField("mediaUrl")
        );
    }

    #[test]
    fn blank_fields_count_as_missing() {
        let req = NewPinRequest {
            credential: Some("   ".to_string()),
            ..full_request()
        };
        assert_eq!(
            req.validate().unwrap_err(),
            ValidationError::MissingField("credential")
        );
    }

    #[test]
    fn each_required_field_is_named() {
        let cases: [(fn(&mut NewPinRequest), &str); 4] = [
            (|r| r.credential = None, "credential"),
            (|r| r.target_board = None, "targetBoard"),
            (|r| r.media_url = None, "mediaUrl"),
            (|r| r.scheduled_at = None, "scheduledAt"),
        ];
        for (strip, field) in cases {
            let mut req = full_request();
            strip(&mut req);
            assert_eq!(req.validate().unwrap_err(), ValidationError::MissingField(field));
        }
    }

    #[test]
    fn bad_timestamp_is_rejected() {
        let req = NewPinRequest {
            scheduled_at: Some("tomorrow at noon".to_string()),
            ..full_request()
        };
        assert!(matches!(
            req.validate(),
            Err(ValidationError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn blank_description_becomes_none() {
        let req = NewPinRequest {
            description: Some(String::new()),
            ..full_request()
        };
        assert_eq!(req.validate().unwrap().description(), None);
    }

    #[test]
    fn request_parses_camel_case_and_rejects_unknown_fields() {
        let ok: NewPinRequest = serde_json::from_str(
            r#"{"credential":"t","targetBoard":"b","mediaUrl":"u","scheduledAt":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(ok.target_board.as_deref(), Some("b"));

        let unknown = serde_json::from_str::<NewPinRequest>(r#"{"credential":"t","boardName":"b"}"#);
        assert!(unknown.is_err());
    }

    #[test]
    fn credential_is_never_exposed() {
        let pin = ScheduledPin {
            id: 7,
            credential: "pina_secret".to_string(),
            board_id: "b1".to_string(),
            image_url: "http://x/img.png".to_string(),
            description: None,
            link: None,
            scheduled_at: Utc::now(),
            posted: false,
            created_at: Utc::now(),
        };
        assert!(!format!("{pin:?}").contains("pina_secret"));
        let json = serde_json::to_string(&pin).unwrap();
        assert!(!json.contains("pina_secret"));
        assert!(!json.contains("credential"));

        let new_pin = full_request().validate().unwrap();
        assert!(!format!("{new_pin:?}").contains("pina_secret"));
    }
}
