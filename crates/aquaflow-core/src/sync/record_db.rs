//! Server-side record database.
//!
//! One row per `(user_key, date)`. Writes are full overwrites of the value
//! columns, so replaying the same upsert leaves the row unchanged.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::types::RemoteRecord;
use crate::error::DatabaseError;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS daily_records (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    user_key            TEXT NOT NULL,
    date                TEXT NOT NULL,
    count               INTEGER NOT NULL DEFAULT 0,
    is_active           INTEGER NOT NULL DEFAULT 0,
    last_reminder_hour  INTEGER,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
)";

const CREATE_UNIQUE_KEY: &str =
    "CREATE UNIQUE INDEX ux_daily_records_user_date ON daily_records(user_key, date)";

/// SQLite store behind `aquaflow serve`.
pub struct RecordDb {
    conn: Connection,
}

impl RecordDb {
    /// Open (or create) the database file. Call `ensure_schema` before use.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Create the table and its `(user_key, date)` uniqueness constraint.
    ///
    /// Safe to call repeatedly; an existing constraint is not an error.
    pub fn ensure_schema(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(CREATE_TABLE)?;
        match self.conn.execute_batch(CREATE_UNIQUE_KEY) {
            Ok(()) => Ok(()),
            Err(err) if is_already_exists(&err) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn fetch(
        &self,
        user_key: &str,
        date: NaiveDate,
    ) -> Result<Option<RemoteRecord>, DatabaseError> {
        let record = self
            .conn
            .query_row(
                "SELECT count, is_active, last_reminder_hour, updated_at
                 FROM daily_records
                 WHERE user_key = ?1 AND date = ?2",
                params![user_key, date_key(date)],
                |row| {
                    let updated_at: String = row.get(3)?;
                    Ok(RemoteRecord {
                        count: row.get(0)?,
                        is_active: row.get(1)?,
                        last_reminder_hour: row.get(2)?,
                        updated_at: parse_timestamp(&updated_at),
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Insert or overwrite, returning the stored row.
    pub fn upsert(
        &self,
        user_key: &str,
        date: NaiveDate,
        record: &RemoteRecord,
    ) -> Result<RemoteRecord, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO daily_records
                (user_key, date, count, is_active, last_reminder_hour, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(user_key, date) DO UPDATE SET
                count = excluded.count,
                is_active = excluded.is_active,
                last_reminder_hour = excluded.last_reminder_hour,
                updated_at = excluded.updated_at",
            params![
                user_key,
                date_key(date),
                record.count,
                record.is_active,
                record.last_reminder_hour,
                now,
            ],
        )?;
        self.fetch(user_key, date)?
            .ok_or_else(|| DatabaseError::QueryFailed("upserted row not found".into()))
    }

    /// Number of rows stored for a user.
    pub fn count_for_user(&self, user_key: &str) -> Result<u64, DatabaseError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM daily_records WHERE user_key = ?1",
            params![user_key],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn is_already_exists(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("already exists"))
}
