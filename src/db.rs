//! Database module
//!
//! Provides durable, per-user storage for conversation history.

mod schema;

pub use schema::*;

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Chat record not found: {0}")]
    RecordNotFound(String),
    #[error("Stored messages are malformed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Stored timestamp is malformed: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("Database connection lock poisoned")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    /// Last timestamp handed out; stamps are strictly increasing so that
    /// ordering by `updated_at` is total
    clock: Arc<Mutex<DateTime<Utc>>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> DbResult<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            clock: Arc::new(Mutex::new(DateTime::<Utc>::default())),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    fn next_timestamp(&self) -> DbResult<DateTime<Utc>> {
        let mut last = self.clock.lock().map_err(|_| DbError::Poisoned)?;
        let now = truncate_to_micros(Utc::now());
        let stamp = if now > *last {
            now
        } else {
            *last + chrono::Duration::microseconds(1)
        };
        *last = stamp;
        Ok(stamp)
    }

    // ==================== History Operations ====================

    /// Create a new chat record
    pub fn create_record(
        &self,
        id: &str,
        user_id: &str,
        title: &str,
        messages: &[Message],
    ) -> DbResult<HistoryRecord> {
        let now = self.next_timestamp()?;
        let messages_json = serde_json::to_string(messages)?;
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO chat_history (id, user_id, title, messages, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![id, user_id, title, messages_json, format_datetime(now)],
        )?;

        Ok(HistoryRecord {
            id: id.to_string(),
            title: title.to_string(),
            messages: messages.to_vec(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the messages of an existing record and bump `updated_at`
    ///
    /// `title` and `created_at` are never touched.
    pub fn update_record_messages(
        &self,
        user_id: &str,
        id: &str,
        messages: &[Message],
    ) -> DbResult<DateTime<Utc>> {
        let now = self.next_timestamp()?;
        let messages_json = serde_json::to_string(messages)?;
        let conn = self.conn()?;

        let updated = conn.execute(
            "UPDATE chat_history SET messages = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
            params![messages_json, format_datetime(now), id, user_id],
        )?;

        if updated == 0 {
            return Err(DbError::RecordNotFound(id.to_string()));
        }
        Ok(now)
    }

    /// Get a record by ID
    #[allow(dead_code)] // Used in tests
    pub fn get_record(&self, user_id: &str, id: &str) -> DbResult<HistoryRecord> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, messages, created_at, updated_at
             FROM chat_history WHERE id = ?1 AND user_id = ?2",
        )?;

        let row = stmt
            .query_row(params![id, user_id], read_row)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => DbError::RecordNotFound(id.to_string()),
                other => DbError::Sqlite(other),
            })?;
        row.into_record()
    }

    /// List a user's records, most recently updated first
    pub fn list_records(&self, user_id: &str) -> DbResult<Vec<HistoryRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, messages, created_at, updated_at
             FROM chat_history
             WHERE user_id = ?1
             ORDER BY updated_at DESC, id",
        )?;

        let rows = stmt
            .query_map(params![user_id], read_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(RawRecord::into_record).collect()
    }

    /// Delete a record
    pub fn delete_record(&self, user_id: &str, id: &str) -> DbResult<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM chat_history WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;

        if deleted == 0 {
            return Err(DbError::RecordNotFound(id.to_string()));
        }
        Ok(())
    }
}

/// Row as stored, before the messages JSON is decoded
struct RawRecord {
    id: String,
    title: String,
    messages: String,
    created_at: String,
    updated_at: String,
}

impl RawRecord {
    fn into_record(self) -> DbResult<HistoryRecord> {
        Ok(HistoryRecord {
            id: self.id,
            title: self.title,
            messages: serde_json::from_str(&self.messages)?,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        messages: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering
fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> DbResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

fn truncate_to_micros(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(dt.nanosecond() / 1_000 * 1_000)
        .unwrap_or(dt)
}
