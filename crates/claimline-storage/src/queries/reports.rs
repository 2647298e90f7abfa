// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-side queries. These take no item lock and observe committed state only.

use chrono::{DateTime, Utc};
use claimline_core::{Claim, ClaimId, ClaimStatus, ClaimlineError, ItemId, UserId};
use rusqlite::params;

use crate::database::{Database, SqlResultExt, map_call_err};
use crate::queries::claims;
use crate::models::{ACTIVE_STATUSES, CLAIM_COLUMNS, format_ts, parse_ts, row_to_claim, status_at};

/// Lifecycle timestamps of one completed claim.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionTiming {
    pub created_at: DateTime<Utc>,
    pub selected_at: Option<DateTime<Utc>>,
    pub completed_at: DateTime<Utc>,
}

/// Consistent view of one item's queue, read in a single call.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSnapshot {
    pub total: i64,
    pub active: i64,
    pub head: Option<Claim>,
    /// The requesting user's live claim, if a user was given.
    pub user_claim: Option<Claim>,
}

pub async fn queue_snapshot(
    db: &Database,
    item_id: &ItemId,
    user_id: Option<&UserId>,
) -> Result<QueueSnapshot, ClaimlineError> {
    let item_id = item_id.clone();
    let user_id = user_id.cloned();
    db.connection()
        .call(move |conn| -> Result<QueueSnapshot, ClaimlineError> {
            // A deferred read transaction pins one snapshot for all four reads.
            let tx = conn.transaction().sql()?;
            let total: i64 = tx
                .query_row(
                    "SELECT COUNT(*) FROM claims WHERE item_id = ?1",
                    params![item_id.as_str()],
                    |row| row.get(0),
                )
                .sql()?;
            let active = claims::count_active_by_item(&tx, &item_id)?;
            let head = claims::head_of_queue(&tx, &item_id)?;
            let user_claim = match &user_id {
                Some(user_id) => claims::find_user_active_claim(&tx, &item_id, user_id)?,
                None => None,
            };
            tx.commit().sql()?;
            Ok(QueueSnapshot {
                total,
                active,
                head,
                user_claim,
            })
        })
        .await
        .map_err(map_call_err)
}

/// Claims of `item_id`: the active set by position, then (optionally) the
/// resolved claims in submission order.
pub async fn list_by_item(
    db: &Database,
    item_id: &ItemId,
    include_terminal: bool,
) -> Result<Vec<Claim>, ClaimlineError> {
    let item_id = item_id.clone();
    db.connection()
        .call(move |conn| -> Result<Vec<Claim>, ClaimlineError> {
            let mut listed = claims::list_active_by_item(conn, &item_id)?;
            if include_terminal {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {CLAIM_COLUMNS} FROM claims
                         WHERE item_id = ?1 AND status NOT IN {ACTIVE_STATUSES}
                         ORDER BY seq ASC"
                    ))
                    .sql()?;
                let rows = stmt
                    .query_map(params![item_id.as_str()], row_to_claim)
                    .sql()?;
                for row in rows {
                    listed.push(row.sql()?);
                }
            }
            Ok(listed)
        })
        .await
        .map_err(map_call_err)
}

/// A user's claims across items, most recently updated first.
pub async fn list_by_user(
    db: &Database,
    user_id: &UserId,
    status: Option<ClaimStatus>,
    limit: i64,
) -> Result<Vec<Claim>, ClaimlineError> {
    let user_id = user_id.clone();
    db.connection()
        .call(move |conn| -> Result<Vec<Claim>, ClaimlineError> {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {CLAIM_COLUMNS} FROM claims
                     WHERE user_id = ?1 AND (?2 IS NULL OR status = ?2)
                     ORDER BY updated_at DESC, seq DESC LIMIT ?3"
                ))
                .sql()?;
            let rows = stmt
                .query_map(
                    params![user_id.as_str(), status.map(|s| s.as_str()), limit],
                    row_to_claim,
                )
                .sql()?;
            rows.collect::<rusqlite::Result<Vec<_>>>().sql()
        })
        .await
        .map_err(map_call_err)
}

/// Number of claims of `item_id` in each status. Statuses with no claims are omitted.
pub async fn status_counts(
    db: &Database,
    item_id: &ItemId,
) -> Result<Vec<(ClaimStatus, i64)>, ClaimlineError> {
    let item_id = item_id.clone();
    db.connection()
        .call(move |conn| -> Result<Vec<(ClaimStatus, i64)>, ClaimlineError> {
            let mut stmt = conn
                .prepare("SELECT status, COUNT(*) FROM claims WHERE item_id = ?1 GROUP BY status")
                .sql()?;
            let rows = stmt
                .query_map(params![item_id.as_str()], |row| {
                    Ok((status_at(row, 0)?, row.get(1)?))
                })
                .sql()?;
            rows.collect::<rusqlite::Result<Vec<_>>>().sql()
        })
        .await
        .map_err(map_call_err)
}

/// Timestamps of every completed claim of `item_id`.
pub async fn completion_timings(
    db: &Database,
    item_id: &ItemId,
) -> Result<Vec<CompletionTiming>, ClaimlineError> {
    let item_id = item_id.clone();
    db.connection()
        .call(move |conn| -> Result<Vec<CompletionTiming>, ClaimlineError> {
            let mut stmt = conn
                .prepare(
                    "SELECT created_at, selected_at, completed_at FROM claims
                     WHERE item_id = ?1 AND status = 'completed' AND completed_at IS NOT NULL",
                )
                .sql()?;
            let rows = stmt
                .query_map(params![item_id.as_str()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })
                .sql()?;
            let mut timings = Vec::new();
            for row in rows {
                let (created, selected, completed) = row.sql()?;
                timings.push(CompletionTiming {
                    created_at: parse_stored(&created)?,
                    selected_at: selected.as_deref().map(parse_stored).transpose()?,
                    completed_at: parse_stored(&completed)?,
                });
            }
            Ok(timings)
        })
        .await
        .map_err(map_call_err)
}

fn parse_stored(raw: &str) -> Result<DateTime<Utc>, ClaimlineError> {
    parse_ts(raw).map_err(|e| ClaimlineError::Storage {
        source: Box::new(e),
    })
}

/// Pending claims at position 1 whose last change is older than `cutoff`.
pub async fn stale_heads(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Claim>, ClaimlineError> {
    db.connection()
        .call(move |conn| -> Result<Vec<Claim>, ClaimlineError> {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {CLAIM_COLUMNS} FROM claims
                     WHERE status = 'pending' AND queue_position = 1 AND updated_at < ?1
                     ORDER BY updated_at ASC"
                ))
                .sql()?;
            let rows = stmt
                .query_map(params![format_ts(&cutoff)], row_to_claim)
                .sql()?;
            rows.collect::<rusqlite::Result<Vec<_>>>().sql()
        })
        .await
        .map_err(map_call_err)
}

/// Pending claims created before `cutoff`, oldest first.
pub async fn expirable_pending(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<Vec<(ClaimId, ItemId)>, ClaimlineError> {
    db.connection()
        .call(move |conn| -> Result<Vec<(ClaimId, ItemId)>, ClaimlineError> {
            let mut stmt = conn
                .prepare(
                    "SELECT id, item_id FROM claims
                     WHERE status = 'pending' AND created_at < ?1
                     ORDER BY seq ASC",
                )
                .sql()?;
            let rows = stmt
                .query_map(params![format_ts(&cutoff)], |row| {
                    Ok((ClaimId(row.get(0)?), ItemId(row.get(1)?)))
                })
                .sql()?;
            rows.collect::<rusqlite::Result<Vec<_>>>().sql()
        })
        .await
        .map_err(map_call_err)
}

/// Items whose active positions are not exactly `1..=N`. Empty on a healthy store.
pub async fn density_violations(db: &Database) -> Result<Vec<ItemId>, ClaimlineError> {
    db.connection()
        .call(|conn| -> Result<Vec<ItemId>, ClaimlineError> {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT item_id FROM claims
                     WHERE status IN {ACTIVE_STATUSES}
                     GROUP BY item_id
                     HAVING MIN(queue_position) <> 1
                         OR MAX(queue_position) <> COUNT(*)
                         OR COUNT(DISTINCT queue_position) <> COUNT(*)
                     ORDER BY item_id"
                ))
                .sql()?;
            let rows = stmt.query_map([], |row| Ok(ItemId(row.get(0)?))).sql()?;
            rows.collect::<rusqlite::Result<Vec<_>>>().sql()
        })
        .await
        .map_err(map_call_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::claims::{insert_claim, set_status};
    use claimline_core::ClaimDetails;

    async fn seeded(users: &[&str]) -> (Database, Vec<Claim>) {
        let db = Database::open_in_memory().await.unwrap();
        let users: Vec<String> = users.iter().map(|u| u.to_string()).collect();
        let claims = db
            .connection()
            .call(move |conn| -> Result<Vec<Claim>, ClaimlineError> {
                let now = Utc::now();
                let mut out = Vec::new();
                for (i, user) in users.iter().enumerate() {
                    let claim = Claim::new_pending(
                        ItemId::from("chair"),
                        UserId::from(user.as_str()),
                        ClaimDetails::default(),
                        i as i64 + 1,
                        now,
                    );
                    insert_claim(conn, &claim)?;
                    out.push(claim);
                }
                Ok(out)
            })
            .await
            .map_err(map_call_err)
            .unwrap();
        (db, claims)
    }

    #[tokio::test]
    async fn list_by_item_appends_history_when_asked() {
        let (db, claims) = seeded(&["a", "b"]).await;
        let id = claims[0].id.clone();
        db.connection()
            .call(move |conn| {
                set_status(conn, &id, ClaimStatus::Selected, None, None, &Utc::now())
            })
            .await
            .map_err(map_call_err)
            .unwrap();

        let item = ItemId::from("chair");
        let active = list_by_item(&db, &item, false).await.unwrap();
        assert_eq!(active.len(), 1);
        let all = list_by_item(&db, &item, true).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].status, ClaimStatus::Selected);
    }

    #[tokio::test]
    async fn counts_and_user_listing() {
        let (db, _) = seeded(&["a", "b", "c"]).await;
        let counts = status_counts(&db, &ItemId::from("chair")).await.unwrap();
        assert_eq!(counts, vec![(ClaimStatus::Pending, 3)]);

        let mine = list_by_user(&db, &UserId::from("b"), None, 10).await.unwrap();
        assert_eq!(mine.len(), 1);
        let none = list_by_user(&db, &UserId::from("b"), Some(ClaimStatus::Completed), 10)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn stale_and_expirable_respect_cutoff() {
        let (db, _) = seeded(&["a", "b"]).await;
        let past = Utc::now() - chrono::Duration::hours(1);
        let future = Utc::now() + chrono::Duration::hours(1);

        assert!(stale_heads(&db, past).await.unwrap().is_empty());
        let stale = stale_heads(&db, future).await.unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].queue_position, Some(1));

        assert!(expirable_pending(&db, past).await.unwrap().is_empty());
        assert_eq!(expirable_pending(&db, future).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn snapshot_reports_head_and_user_claim() {
        let (db, claims) = seeded(&["a", "b", "c"]).await;
        let item = ItemId::from("chair");
        let snap = queue_snapshot(&db, &item, Some(&UserId::from("c")))
            .await
            .unwrap();
        assert_eq!(snap.total, 3);
        assert_eq!(snap.active, 3);
        assert_eq!(snap.head.unwrap().id, claims[0].id);
        assert_eq!(snap.user_claim.unwrap().queue_position, Some(3));

        let anonymous = queue_snapshot(&db, &item, None).await.unwrap();
        assert!(anonymous.user_claim.is_none());
    }

    #[tokio::test]
    async fn healthy_store_has_no_density_violations() {
        let (db, _) = seeded(&["a", "b", "c"]).await;
        assert!(density_violations(&db).await.unwrap().is_empty());
    }
}
