// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-item mutual exclusion.
//!
//! Every mutation of an item's queue runs while holding that item's lock, so
//! reads of the active set, position arithmetic, and writes form one
//! serialized unit. Different items never contend.

use std::sync::Arc;
use std::time::{Duration, Instant};

use claimline_core::{ClaimlineError, ItemId};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Registry size above which idle entries are pruned on acquire.
const PRUNE_THRESHOLD: usize = 1024;

/// Registry of per-item async mutexes.
#[derive(Default)]
pub struct ItemLocks {
    locks: DashMap<ItemId, Arc<Mutex<()>>>,
}

/// Held lock on one item. Released on drop.
pub struct ItemGuard {
    _guard: OwnedMutexGuard<()>,
    item_id: ItemId,
    waited: Duration,
}

impl ItemGuard {
    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    /// Time spent waiting for the lock.
    pub fn waited(&self) -> Duration {
        self.waited
    }
}

impl ItemLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `item_id`, giving up after `timeout`.
    ///
    /// A timeout is reported as [`ClaimlineError::ConcurrencyConflict`].
    pub async fn acquire(
        &self,
        item_id: &ItemId,
        timeout: Duration,
    ) -> Result<ItemGuard, ClaimlineError> {
        if self.locks.len() > PRUNE_THRESHOLD {
            self.prune();
        }
        let lock = self
            .locks
            .entry(item_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let started = Instant::now();
        let guard = tokio::time::timeout(timeout, lock.lock_owned())
            .await
            .map_err(|_| {
                ClaimlineError::ConcurrencyConflict(format!(
                    "timed out after {}ms waiting for item {item_id}",
                    timeout.as_millis()
                ))
            })?;

        Ok(ItemGuard {
            _guard: guard,
            item_id: item_id.clone(),
            waited: started.elapsed(),
        })
    }

    /// Drop registry entries nobody holds or waits on.
    pub fn prune(&self) {
        let before = self.locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        debug!(before, after = self.locks.len(), "pruned item locks");
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_times_out_while_held() {
        let locks = ItemLocks::new();
        let item = ItemId::from("bike-1");
        let _held = locks.acquire(&item, Duration::from_secs(1)).await.unwrap();

        let err = locks
            .acquire(&item, Duration::from_millis(20))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ClaimlineError::ConcurrencyConflict(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn different_items_do_not_contend() {
        let locks = ItemLocks::new();
        let _a = locks
            .acquire(&ItemId::from("a"), Duration::from_secs(1))
            .await
            .unwrap();
        let b = locks
            .acquire(&ItemId::from("b"), Duration::from_millis(20))
            .await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn lock_is_released_on_drop() {
        let locks = ItemLocks::new();
        let item = ItemId::from("lamp");
        drop(locks.acquire(&item, Duration::from_secs(1)).await.unwrap());
        let again = locks.acquire(&item, Duration::from_millis(20)).await;
        assert_eq!(again.unwrap().item_id(), &item);
    }

    #[tokio::test]
    async fn prune_keeps_held_locks() {
        let locks = ItemLocks::new();
        let _held = locks
            .acquire(&ItemId::from("held"), Duration::from_secs(1))
            .await
            .unwrap();
        drop(
            locks
                .acquire(&ItemId::from("idle"), Duration::from_secs(1))
                .await
                .unwrap(),
        );
        assert_eq!(locks.len(), 2);
        locks.prune();
        assert_eq!(locks.len(), 1);
    }
}
