// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between the `claims` table and [`Claim`].
//!
//! Timestamps are stored as fixed-width RFC 3339 text with microsecond
//! precision so that lexical order in SQL equals chronological order.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Row;

pub use claimline_core::types::{Claim, ClaimId, ClaimStatus, ItemId, UserId};

/// Column list matching [`row_to_claim`].
pub(crate) const CLAIM_COLUMNS: &str = "id, item_id, user_id, status, queue_position, \
     pickup_preference, notes, reason, created_at, updated_at, contacted_at, selected_at, \
     completed_at, cancelled_at, skipped_at, expired_at";

/// SQL list of statuses that make up an item's active set.
pub(crate) const ACTIVE_STATUSES: &str = "('pending', 'contacted')";

/// SQL list of statuses that count as a user's live claim.
pub(crate) const LIVE_STATUSES: &str = "('pending', 'contacted', 'selected')";

/// Format a timestamp for storage.
pub fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Parse a stored timestamp.
pub fn parse_ts(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
}

/// Column holding the entry timestamp for `status`, if the status has one.
pub(crate) fn timestamp_column(status: ClaimStatus) -> Option<&'static str> {
    match status {
        ClaimStatus::Pending => None,
        ClaimStatus::Contacted => Some("contacted_at"),
        ClaimStatus::Selected => Some("selected_at"),
        ClaimStatus::Completed => Some("completed_at"),
        ClaimStatus::Cancelled => Some("cancelled_at"),
        ClaimStatus::Skipped => Some("skipped_at"),
        ClaimStatus::Expired => Some("expired_at"),
    }
}

fn ts_at(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn opt_ts_at(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        parse_ts(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

pub(crate) fn status_at(row: &Row, idx: usize) -> rusqlite::Result<ClaimStatus> {
    let raw: String = row.get(idx)?;
    ClaimStatus::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Convert a rusqlite row selected with [`CLAIM_COLUMNS`] into a [`Claim`].
pub(crate) fn row_to_claim(row: &Row) -> rusqlite::Result<Claim> {
    Ok(Claim {
        id: ClaimId(row.get(0)?),
        item_id: ItemId(row.get(1)?),
        user_id: UserId(row.get(2)?),
        status: status_at(row, 3)?,
        queue_position: row.get(4)?,
        pickup_preference: row.get(5)?,
        notes: row.get(6)?,
        reason: row.get(7)?,
        created_at: ts_at(row, 8)?,
        updated_at: ts_at(row, 9)?,
        contacted_at: opt_ts_at(row, 10)?,
        selected_at: opt_ts_at(row, 11)?,
        completed_at: opt_ts_at(row, 12)?,
        cancelled_at: opt_ts_at(row, 13)?,
        skipped_at: opt_ts_at(row, 14)?,
        expired_at: opt_ts_at(row, 15)?,
    })
}
