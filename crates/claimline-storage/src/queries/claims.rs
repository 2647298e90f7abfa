// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Claim write primitives.
//!
//! These run inside the per-item transaction opened by
//! [`ClaimStore::with_item_lock`](crate::store::ClaimStore::with_item_lock).
//! None of them enforces cross-row invariants on its own; the queue engine
//! composes them into operations that do.

use chrono::{DateTime, Utc};
use claimline_core::{Claim, ClaimId, ClaimStatus, ClaimlineError, ItemId, UserId};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::database::{SqlResultExt, classify_sqlite, is_unique_violation};
use crate::models::{
    ACTIVE_STATUSES, CLAIM_COLUMNS, LIVE_STATUSES, format_ts, row_to_claim, timestamp_column,
};

/// Persist a new claim row. Its `seq` follows every existing row.
pub fn insert_claim(conn: &Connection, claim: &Claim) -> Result<(), ClaimlineError> {
    conn.execute(
        "INSERT INTO claims (id, seq, item_id, user_id, status, queue_position,
                             pickup_preference, notes, reason, created_at, updated_at)
         VALUES (?1, (SELECT COALESCE(MAX(seq), 0) + 1 FROM claims),
                 ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            claim.id.as_str(),
            claim.item_id.as_str(),
            claim.user_id.as_str(),
            claim.status.as_str(),
            claim.queue_position,
            claim.pickup_preference,
            claim.notes,
            claim.reason,
            format_ts(&claim.created_at),
            format_ts(&claim.updated_at),
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e, "user_id") {
            ClaimlineError::DuplicateActiveClaim {
                item_id: claim.item_id.clone(),
                user_id: claim.user_id.clone(),
            }
        } else {
            classify_sqlite(e)
        }
    })?;
    debug!(
        claim_id = %claim.id,
        item_id = %claim.item_id,
        position = ?claim.queue_position,
        "claim inserted"
    );
    Ok(())
}

/// Fetch a claim by id.
pub fn get_claim(conn: &Connection, id: &ClaimId) -> Result<Option<Claim>, ClaimlineError> {
    conn.query_row(
        &format!("SELECT {CLAIM_COLUMNS} FROM claims WHERE id = ?1"),
        params![id.as_str()],
        row_to_claim,
    )
    .optional()
    .sql()
}

/// Fetch a claim by id, failing with `ClaimNotFound` when absent.
pub fn require_claim(conn: &Connection, id: &ClaimId) -> Result<Claim, ClaimlineError> {
    get_claim(conn, id)?.ok_or_else(|| ClaimlineError::ClaimNotFound(id.clone()))
}

/// Active-set claims of `item_id`, ordered by position.
pub fn list_active_by_item(
    conn: &Connection,
    item_id: &ItemId,
) -> Result<Vec<Claim>, ClaimlineError> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {CLAIM_COLUMNS} FROM claims
             WHERE item_id = ?1 AND status IN {ACTIVE_STATUSES}
             ORDER BY queue_position ASC"
        ))
        .sql()?;
    let rows = stmt
        .query_map(params![item_id.as_str()], row_to_claim)
        .sql()?;
    rows.collect::<rusqlite::Result<Vec<_>>>().sql()
}

/// Size of the active set of `item_id`.
pub fn count_active_by_item(conn: &Connection, item_id: &ItemId) -> Result<i64, ClaimlineError> {
    conn.query_row(
        &format!("SELECT COUNT(*) FROM claims WHERE item_id = ?1 AND status IN {ACTIVE_STATUSES}"),
        params![item_id.as_str()],
        |row| row.get(0),
    )
    .sql()
}

/// The active claim at position 1, if any.
pub fn head_of_queue(conn: &Connection, item_id: &ItemId) -> Result<Option<Claim>, ClaimlineError> {
    conn.query_row(
        &format!(
            "SELECT {CLAIM_COLUMNS} FROM claims
             WHERE item_id = ?1 AND status IN {ACTIVE_STATUSES}
             ORDER BY queue_position ASC LIMIT 1"
        ),
        params![item_id.as_str()],
        row_to_claim,
    )
    .optional()
    .sql()
}

/// The user's pending, contacted, or selected claim on `item_id`, if any.
pub fn find_user_active_claim(
    conn: &Connection,
    item_id: &ItemId,
    user_id: &UserId,
) -> Result<Option<Claim>, ClaimlineError> {
    conn.query_row(
        &format!(
            "SELECT {CLAIM_COLUMNS} FROM claims
             WHERE item_id = ?1 AND user_id = ?2 AND status IN {LIVE_STATUSES}"
        ),
        params![item_id.as_str(), user_id.as_str()],
        row_to_claim,
    )
    .optional()
    .sql()
}

/// Add `delta` (+1 or -1) to the position of every active claim of `item_id`
/// whose position lies in `from..=to`. Returns the number of rows moved.
///
/// SQLite checks the position index row by row, so the rows pass through
/// negative positions: the first statement writes the negated target, the
/// second flips the sign back.
pub fn shift_positions(
    conn: &Connection,
    item_id: &ItemId,
    from: i64,
    to: i64,
    delta: i64,
    now: &DateTime<Utc>,
) -> Result<usize, ClaimlineError> {
    if delta != 1 && delta != -1 {
        return Err(ClaimlineError::Internal(format!(
            "position shift must be +1 or -1, got {delta}"
        )));
    }
    if from > to {
        return Ok(0);
    }
    let (lo, hi) = (from + delta, to + delta);

    let moved = conn
        .execute(
            &format!(
                "UPDATE claims SET queue_position = -(queue_position + ?4), updated_at = ?5
                 WHERE item_id = ?1 AND status IN {ACTIVE_STATUSES}
                   AND queue_position BETWEEN ?2 AND ?3"
            ),
            params![item_id.as_str(), from, to, delta, format_ts(now)],
        )
        .sql()?;
    conn.execute(
        &format!(
            "UPDATE claims SET queue_position = -queue_position
             WHERE item_id = ?1 AND status IN {ACTIVE_STATUSES}
               AND queue_position BETWEEN ?2 AND ?3"
        ),
        params![item_id.as_str(), -hi, -lo],
    )
    .sql()?;

    debug!(%item_id, from, to, delta, moved, "positions shifted");
    Ok(moved)
}

/// Move a claim into `status`.
///
/// `position` must be `Some` exactly when `status` is active. The entry
/// timestamp for `status` is written only if it was never set, and `reason`
/// only replaces the stored reason when supplied.
pub fn set_status(
    conn: &Connection,
    id: &ClaimId,
    status: ClaimStatus,
    position: Option<i64>,
    reason: Option<&str>,
    now: &DateTime<Utc>,
) -> Result<Claim, ClaimlineError> {
    let stamp = match timestamp_column(status) {
        Some(column) => format!(", {column} = COALESCE({column}, ?5)"),
        None => String::new(),
    };
    let updated = conn
        .execute(
            &format!(
                "UPDATE claims SET status = ?2, queue_position = ?3,
                        reason = COALESCE(?4, reason), updated_at = ?5{stamp}
                 WHERE id = ?1"
            ),
            params![id.as_str(), status.as_str(), position, reason, format_ts(now)],
        )
        .sql()?;
    if updated == 0 {
        return Err(ClaimlineError::ClaimNotFound(id.clone()));
    }
    debug!(claim_id = %id, %status, ?position, "claim status set");
    require_claim(conn, id)
}

/// Overwrite the position of an active claim.
pub fn set_position(
    conn: &Connection,
    id: &ClaimId,
    position: i64,
    now: &DateTime<Utc>,
) -> Result<(), ClaimlineError> {
    let updated = conn
        .execute(
            &format!(
                "UPDATE claims SET queue_position = ?2, updated_at = ?3
                 WHERE id = ?1 AND status IN {ACTIVE_STATUSES}"
            ),
            params![id.as_str(), position, format_ts(now)],
        )
        .sql()?;
    if updated == 0 {
        return Err(ClaimlineError::ClaimNotFound(id.clone()));
    }
    Ok(())
}
