use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;

use crate::error::Result;

/// Initialise the pin schema in `conn`.
///
/// Creates the `scheduled_pins` table (idempotent) and an index covering the
/// due-set query so each sweep stays a range scan.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS scheduled_pins (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            access_token  TEXT    NOT NULL,
            board_id      TEXT    NOT NULL,
            image_url     TEXT    NOT NULL,
            description   TEXT,
            link          TEXT,
            scheduled_at  TEXT    NOT NULL,   -- fixed-width RFC 3339 UTC
            is_posted     INTEGER NOT NULL DEFAULT 0,
            created_at    TEXT    NOT NULL
                          DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        ) STRICT;

        -- Due-set polling: WHERE is_posted = 0 AND scheduled_at <= ?
        CREATE INDEX IF NOT EXISTS idx_pins_due
            ON scheduled_pins (is_posted, scheduled_at);
        ",
    )?;
    Ok(())
}

/// Render a timestamp the way it is stored: `YYYY-MM-DDTHH:MM:SS.sssZ`.
///
/// Every stored value has the same width and the same `Z` offset, so SQLite's
/// text comparison in the due-set query matches chronological order.
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp back into UTC.
pub fn parse_ts(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}
