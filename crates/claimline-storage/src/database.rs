// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements run on tokio-rusqlite's single background thread, one
//! closure at a time. Do NOT open additional connections for writes: the
//! per-item locking in [`crate::store`] assumes this is the only writer.

use claimline_config::model::StorageConfig;
use claimline_core::ClaimlineError;
use rusqlite::ErrorCode;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// Handle to the claims database. Cheap to clone; clones share the connection.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path` with default settings and run migrations.
    pub async fn open(path: &str) -> Result<Self, ClaimlineError> {
        Self::open_with_config(&StorageConfig::at_path(path)).await
    }

    /// Open the database described by `config` and run migrations.
    pub async fn open_with_config(config: &StorageConfig) -> Result<Self, ClaimlineError> {
        let conn = Connection::open(&config.database_path)
            .await
            .map_err(classify_sqlite)?;
        let db = Self { conn };
        db.prepare(config.wal_mode, config.busy_timeout_ms).await?;
        debug!(path = %config.database_path, "claims database opened");
        Ok(db)
    }

    /// Open a private in-memory database. Used by tests and one-shot tooling.
    pub async fn open_in_memory() -> Result<Self, ClaimlineError> {
        let conn = Connection::open_in_memory().await.map_err(classify_sqlite)?;
        let db = Self { conn };
        db.prepare(false, 0).await?;
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool, busy_timeout_ms: u64) -> Result<(), ClaimlineError> {
        self.conn
            .call(move |conn| -> Result<(), ClaimlineError> {
                if wal_mode {
                    conn.execute_batch("PRAGMA journal_mode = WAL;")
                        .map_err(classify_sqlite)?;
                }
                conn.execute_batch(&format!(
                    "PRAGMA busy_timeout = {busy_timeout_ms};
                     PRAGMA foreign_keys = ON;
                     PRAGMA synchronous = NORMAL;"
                ))
                .map_err(classify_sqlite)?;
                migrations::run_migrations(conn)
            })
            .await
            .map_err(map_call_err)
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), ClaimlineError> {
        self.conn
            .call(|conn| conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);"))
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(map_tr_err)?;
        debug!("claims database closed");
        Ok(())
    }
}

/// Classify a raw SQLite error into the queue's error taxonomy.
///
/// Busy and locked databases are retryable conflicts; everything else is a
/// storage failure. Constraint violations are classified by the caller that
/// knows which constraint it was guarding.
pub fn classify_sqlite(e: rusqlite::Error) -> ClaimlineError {
    match e.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
            ClaimlineError::ConcurrencyConflict(e.to_string())
        }
        _ => ClaimlineError::Storage {
            source: Box::new(e),
        },
    }
}

/// Whether `e` is a UNIQUE violation naming `column`.
pub(crate) fn is_unique_violation(e: &rusqlite::Error, column: &str) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(err, Some(msg)) => {
            err.code == ErrorCode::ConstraintViolation
                && msg.contains("UNIQUE")
                && msg.contains(column)
        }
        _ => false,
    }
}

/// Convert a tokio-rusqlite error carrying a rusqlite error.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> ClaimlineError {
    match e {
        tokio_rusqlite::Error::Error(inner) => classify_sqlite(inner),
        other => ClaimlineError::Storage {
            source: other.to_string().into(),
        },
    }
}

/// Convert a tokio-rusqlite error whose closure already produced a [`ClaimlineError`].
pub(crate) fn map_call_err(e: tokio_rusqlite::Error<ClaimlineError>) -> ClaimlineError {
    match e {
        tokio_rusqlite::Error::Error(inner) => inner,
        other => ClaimlineError::Storage {
            source: other.to_string().into(),
        },
    }
}

/// Adapter for `?` on rusqlite results inside closures returning [`ClaimlineError`].
pub(crate) trait SqlResultExt<T> {
    fn sql(self) -> Result<T, ClaimlineError>;
}

impl<T> SqlResultExt<T> for rusqlite::Result<T> {
    fn sql(self) -> Result<T, ClaimlineError> {
        self.map_err(classify_sqlite)
    }
}
