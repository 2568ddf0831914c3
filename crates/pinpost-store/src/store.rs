use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{types::Type, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};

use crate::{
    db::{format_ts, init_db, parse_ts},
    error::{Result, StoreError},
    types::{NewPin, ScheduledPin},
};

/// Durable record of scheduled pins.
///
/// Implementations must be the single source of truth: no caching between
/// calls, so that every sweep observes what earlier sweeps persisted.
#[async_trait]
pub trait PinStore: Send + Sync {
    /// Persist a new pin with `posted = false` and `created_at = now`.
    async fn insert(&self, pin: &NewPin) -> Result<i64>;

    /// Read a single pin by ID.
    async fn get(&self, id: i64) -> Result<Option<ScheduledPin>>;

    /// Snapshot of every pin with `posted = false AND scheduled_at <= now`,
    /// oldest `scheduled_at` first.
    async fn fetch_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledPin>>;

    /// Set `posted = true` on one row.
    ///
    /// Returns `true` when this call performed the transition and `false`
    /// when the row was already posted. Unknown IDs are `PinNotFound`.
    async fn mark_posted(&self, id: i64) -> Result<bool>;
}

/// SQLite-backed [`PinStore`].
///
/// Statements run on the blocking pool; the connection is held for the
/// duration of one operation only. No transaction spans a sweep.
#[derive(Clone)]
pub struct SqlitePinStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePinStore {
    /// Wrap an open connection, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;
        Self::new(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            f(&guard)
        })
        .await?
    }
}

const PIN_COLUMNS: &str = "id, access_token, board_id, image_url, description, link,
                           scheduled_at, is_posted, created_at";

#[async_trait]
impl PinStore for SqlitePinStore {
    async fn insert(&self, pin: &NewPin) -> Result<i64> {
        let pin = pin.clone();
        self.with_conn(move |conn| {
            let now = format_ts(Utc::now());
            conn.execute(
                "INSERT INTO scheduled_pins
                 (access_token, board_id, image_url, description, link,
                  scheduled_at, is_posted, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
                rusqlite::params![
                    pin.credential(),
                    pin.board_id(),
                    pin.image_url(),
                    pin.description(),
                    pin.link(),
                    format_ts(pin.scheduled_at()),
                    now,
                ],
            )?;
            let id = conn.last_insert_rowid();
            info!(pin_id = id, board_id = %pin.board_id(), scheduled_at = %pin.scheduled_at(), "pin scheduled");
            Ok(id)
        })
        .await
    }

    async fn get(&self, id: i64) -> Result<Option<ScheduledPin>> {
        self.with_conn(move |conn| {
            let sql = format!("SELECT {PIN_COLUMNS} FROM scheduled_pins WHERE id = ?1");
            Ok(conn.query_row(&sql, [id], row_to_pin).optional()?)
        })
        .await
    }

    async fn fetch_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledPin>> {
        self.with_conn(move |conn| {
            let now_str = format_ts(now);
            let sql = format!(
                "SELECT {PIN_COLUMNS} FROM scheduled_pins
                 WHERE is_posted = 0 AND scheduled_at <= ?1
                 ORDER BY scheduled_at, id"
            );
            let mut stmt = conn.prepare_cached(&sql)?;
            // Collect eagerly: the caller gets a finite snapshot, and rows
            // inserted while the sweep runs wait for the next one.
            let due: Vec<ScheduledPin> = stmt
                .query_map([&now_str], row_to_pin)?
                .filter_map(|r| match r {
                    Ok(pin) => Some(pin),
                    Err(e) => {
                        warn!("skipping unreadable pin row: {e}");
                        None
                    }
                })
                .collect();
            debug!(count = due.len(), now = %now_str, "fetched due pins");
            Ok(due)
        })
        .await
    }

    async fn mark_posted(&self, id: i64) -> Result<bool> {
        self.with_conn(move |conn| {
            let n = conn.execute(
                "UPDATE scheduled_pins SET is_posted = 1 WHERE id = ?1 AND is_posted = 0",
                [id],
            )?;
            if n == 1 {
                return Ok(true);
            }
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM scheduled_pins WHERE id = ?1)",
                [id],
                |row| row.get(0),
            )?;
            if exists {
                Ok(false)
            } else {
                Err(StoreError::PinNotFound { id })
            }
        })
        .await
    }
}

fn row_to_pin(row: &Row<'_>) -> rusqlite::Result<ScheduledPin> {
    Ok(ScheduledPin {
        id: row.get(0)?,
        credential: row.get(1)?,
        board_id: row.get(2)?,
        image_url: row.get(3)?,
        description: row.get(4)?,
        link: row.get(5)?,
        scheduled_at: ts_column(row, 6)?,
        posted: row.get::<_, i64>(7)? != 0,
        created_at: ts_column(row, 8)?,
    })
}

fn ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
