// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The claim store: durable claim records plus the locked transaction scope
//! the queue engine composes its mutations in.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use claimline_core::{Claim, ClaimId, ClaimStatus, ClaimlineError, ItemId, UserId};
use rusqlite::{Connection, TransactionBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::database::{Database, SqlResultExt, map_call_err};
use crate::locks::{ItemGuard, ItemLocks};
use crate::queries::claims;
use crate::queries::reports::{self, CompletionTiming, QueueSnapshot};

/// Result of a committed locked transaction.
#[derive(Debug)]
pub struct Committed<R> {
    pub value: R,
    /// Time spent waiting for the item lock.
    pub lock_wait: Duration,
}

/// Claim persistence with per-item write serialization.
#[derive(Clone)]
pub struct ClaimStore {
    db: Database,
    locks: Arc<ItemLocks>,
    lock_timeout: Duration,
}

/// Write scope for one item, valid for the duration of one transaction.
///
/// Every position-affecting primitive is only reachable through this type,
/// which only exists while the item lock is held.
pub struct ClaimTx<'a> {
    conn: &'a Connection,
    item_id: ItemId,
    now: DateTime<Utc>,
}

impl ClaimTx<'_> {
    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    /// Transaction timestamp. All writes in one transaction share it.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn insert(&self, claim: &Claim) -> Result<(), ClaimlineError> {
        self.ensure_item(&claim.item_id)?;
        claims::insert_claim(self.conn, claim)
    }

    pub fn get_by_id(&self, id: &ClaimId) -> Result<Claim, ClaimlineError> {
        let claim = claims::require_claim(self.conn, id)?;
        self.ensure_item(&claim.item_id)?;
        Ok(claim)
    }

    pub fn list_active(&self) -> Result<Vec<Claim>, ClaimlineError> {
        claims::list_active_by_item(self.conn, &self.item_id)
    }

    pub fn count_active(&self) -> Result<i64, ClaimlineError> {
        claims::count_active_by_item(self.conn, &self.item_id)
    }

    pub fn head(&self) -> Result<Option<Claim>, ClaimlineError> {
        claims::head_of_queue(self.conn, &self.item_id)
    }

    pub fn find_user_active_claim(&self, user_id: &UserId) -> Result<Option<Claim>, ClaimlineError> {
        claims::find_user_active_claim(self.conn, &self.item_id, user_id)
    }

    pub fn shift_positions(&self, from: i64, to: i64, delta: i64) -> Result<usize, ClaimlineError> {
        claims::shift_positions(self.conn, &self.item_id, from, to, delta, &self.now)
    }

    pub fn set_status(
        &self,
        id: &ClaimId,
        status: ClaimStatus,
        position: Option<i64>,
        reason: Option<&str>,
    ) -> Result<Claim, ClaimlineError> {
        claims::set_status(self.conn, id, status, position, reason, &self.now)
    }

    pub fn set_position(&self, id: &ClaimId, position: i64) -> Result<(), ClaimlineError> {
        claims::set_position(self.conn, id, position, &self.now)
    }

    fn ensure_item(&self, item_id: &ItemId) -> Result<(), ClaimlineError> {
        if item_id != &self.item_id {
            return Err(ClaimlineError::Internal(format!(
                "claim for item {item_id} touched under the lock of item {}",
                self.item_id
            )));
        }
        Ok(())
    }
}

impl ClaimStore {
    pub fn new(db: Database, lock_timeout: Duration) -> Self {
        Self {
            db,
            locks: Arc::new(ItemLocks::new()),
            lock_timeout,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Take the lock of `item_id` without opening a transaction.
    ///
    /// Every mutation of that item waits until the guard drops, giving up
    /// after the store's lock timeout.
    pub async fn lock_item(&self, item_id: &ItemId) -> Result<ItemGuard, ClaimlineError> {
        self.locks.acquire(item_id, self.lock_timeout).await
    }

    /// Run `f` in an IMMEDIATE transaction while holding the lock of `item_id`.
    ///
    /// The lock is taken before any state is read and released after commit
    /// or rollback. `cancel` is checked once the lock is held and again just
    /// before commit; a cancelled request rolls back and returns
    /// [`ClaimlineError::Cancelled`]. Any error from `f` rolls back.
    pub async fn with_item_lock<F, R>(
        &self,
        item_id: &ItemId,
        cancel: &CancellationToken,
        f: F,
    ) -> Result<Committed<R>, ClaimlineError>
    where
        F: FnOnce(&ClaimTx<'_>) -> Result<R, ClaimlineError> + Send + 'static,
        R: Send + 'static,
    {
        let guard = self.lock_item(item_id).await?;
        if cancel.is_cancelled() {
            return Err(ClaimlineError::Cancelled);
        }

        let cancel = cancel.clone();
        let scope_item = item_id.clone();
        let value = self
            .db
            .connection()
            .call(move |conn| -> Result<R, ClaimlineError> {
                let tx = conn
                    .transaction_with_behavior(TransactionBehavior::Immediate)
                    .sql()?;
                let scope = ClaimTx {
                    conn: &tx,
                    item_id: scope_item,
                    // Stored timestamps carry microseconds; match them here.
                    now: Utc::now().trunc_subsecs(6),
                };
                let value = f(&scope)?;
                if cancel.is_cancelled() {
                    // Dropping the transaction rolls it back.
                    return Err(ClaimlineError::Cancelled);
                }
                tx.commit().sql()?;
                Ok(value)
            })
            .await
            .map_err(map_call_err)?;

        let lock_wait = guard.waited();
        debug!(item_id = %guard.item_id(), wait_ms = lock_wait.as_millis() as u64, "item transaction committed");
        drop(guard);
        Ok(Committed { value, lock_wait })
    }

    pub async fn get_by_id(&self, id: &ClaimId) -> Result<Claim, ClaimlineError> {
        let id = id.clone();
        self.db
            .connection()
            .call(move |conn| claims::require_claim(conn, &id))
            .await
            .map_err(map_call_err)
    }

    pub async fn list_active_by_item(&self, item_id: &ItemId) -> Result<Vec<Claim>, ClaimlineError> {
        let item_id = item_id.clone();
        self.db
            .connection()
            .call(move |conn| claims::list_active_by_item(conn, &item_id))
            .await
            .map_err(map_call_err)
    }

    pub async fn count_active_by_item(&self, item_id: &ItemId) -> Result<i64, ClaimlineError> {
        let item_id = item_id.clone();
        self.db
            .connection()
            .call(move |conn| claims::count_active_by_item(conn, &item_id))
            .await
            .map_err(map_call_err)
    }

    pub async fn head_of_queue(&self, item_id: &ItemId) -> Result<Option<Claim>, ClaimlineError> {
        let item_id = item_id.clone();
        self.db
            .connection()
            .call(move |conn| claims::head_of_queue(conn, &item_id))
            .await
            .map_err(map_call_err)
    }

    pub async fn find_user_active_claim(
        &self,
        item_id: &ItemId,
        user_id: &UserId,
    ) -> Result<Option<Claim>, ClaimlineError> {
        let (item_id, user_id) = (item_id.clone(), user_id.clone());
        self.db
            .connection()
            .call(move |conn| claims::find_user_active_claim(conn, &item_id, &user_id))
            .await
            .map_err(map_call_err)
    }

    pub async fn queue_snapshot(
        &self,
        item_id: &ItemId,
        user_id: Option<&UserId>,
    ) -> Result<QueueSnapshot, ClaimlineError> {
        reports::queue_snapshot(&self.db, item_id, user_id).await
    }

    pub async fn list_by_item(
        &self,
        item_id: &ItemId,
        include_terminal: bool,
    ) -> Result<Vec<Claim>, ClaimlineError> {
        reports::list_by_item(&self.db, item_id, include_terminal).await
    }

    pub async fn list_by_user(
        &self,
        user_id: &UserId,
        status: Option<ClaimStatus>,
        limit: i64,
    ) -> Result<Vec<Claim>, ClaimlineError> {
        reports::list_by_user(&self.db, user_id, status, limit).await
    }

    pub async fn status_counts(
        &self,
        item_id: &ItemId,
    ) -> Result<Vec<(ClaimStatus, i64)>, ClaimlineError> {
        reports::status_counts(&self.db, item_id).await
    }

    pub async fn completion_timings(
        &self,
        item_id: &ItemId,
    ) -> Result<Vec<CompletionTiming>, ClaimlineError> {
        reports::completion_timings(&self.db, item_id).await
    }

    pub async fn stale_heads(&self, cutoff: DateTime<Utc>) -> Result<Vec<Claim>, ClaimlineError> {
        reports::stale_heads(&self.db, cutoff).await
    }

    pub async fn expirable_pending(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<(ClaimId, ItemId)>, ClaimlineError> {
        reports::expirable_pending(&self.db, cutoff).await
    }

    pub async fn density_violations(&self) -> Result<Vec<ItemId>, ClaimlineError> {
        reports::density_violations(&self.db).await
    }
}
