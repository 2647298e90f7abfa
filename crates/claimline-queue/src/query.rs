// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-side views of the claim queue. Nothing here takes an item lock.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use claimline_core::{
    Claim, ClaimStatus, ClaimlineError, IdentityLookup, ItemId, UserId, UserSummary,
};
use claimline_storage::{ClaimStore, CompletionTiming};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// The claim at the head of an item's queue, with the claimant's summary
/// when the identity service could provide it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadOfQueue {
    pub claim: Claim,
    pub user: Option<UserSummary>,
}

/// One item's queue as seen by one (optional) user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueInfo {
    pub item_id: ItemId,
    /// Claims on the item in any status.
    pub total_claims: i64,
    /// Claims holding a position (`pending` or `contacted`).
    pub active_count: i64,
    /// The requesting user's live claim, which may already be `selected`.
    pub user_claim: Option<Claim>,
    /// Position of `user_claim`, absent once it has left the active set.
    pub user_position: Option<i64>,
    /// Claims ahead of the user, i.e. `position - 1`.
    pub estimated_wait: Option<i64>,
    /// The claim at position 1, if the active set is non-empty.
    pub head: Option<HeadOfQueue>,
}

/// Claim counts per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub contacted: i64,
    pub selected: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub skipped: i64,
    pub expired: i64,
}

impl StatusCounts {
    pub fn get(&self, status: ClaimStatus) -> i64 {
        match status {
            ClaimStatus::Pending => self.pending,
            ClaimStatus::Contacted => self.contacted,
            ClaimStatus::Selected => self.selected,
            ClaimStatus::Completed => self.completed,
            ClaimStatus::Cancelled => self.cancelled,
            ClaimStatus::Skipped => self.skipped,
            ClaimStatus::Expired => self.expired,
        }
    }

    fn slot(&mut self, status: ClaimStatus) -> &mut i64 {
        match status {
            ClaimStatus::Pending => &mut self.pending,
            ClaimStatus::Contacted => &mut self.contacted,
            ClaimStatus::Selected => &mut self.selected,
            ClaimStatus::Completed => &mut self.completed,
            ClaimStatus::Cancelled => &mut self.cancelled,
            ClaimStatus::Skipped => &mut self.skipped,
            ClaimStatus::Expired => &mut self.expired,
        }
    }

    pub fn total(&self) -> i64 {
        ClaimStatus::ALL.iter().map(|s| self.get(*s)).sum()
    }

    pub fn active(&self) -> i64 {
        self.pending + self.contacted
    }
}

/// Per-item aggregates over every claim ever submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStatistics {
    pub item_id: ItemId,
    pub counts: StatusCounts,
    /// Sum of all status counts.
    pub total: i64,
    /// `pending + contacted`.
    pub active: i64,
    /// Mean of `completed_at - created_at` over completed claims.
    pub mean_time_to_completion_secs: Option<f64>,
    /// Mean of `selected_at - created_at` over completed claims: time spent queued.
    pub mean_queue_wait_secs: Option<f64>,
}

/// Read-only queue views for callers and the sweep.
///
/// The identity lookup, when present, decorates the head of the queue with a
/// user summary. Per-user listings are paged with `default_limit` and capped
/// at `max_limit`.
pub struct QueueQueries {
    store: ClaimStore,
    identity: Option<Arc<dyn IdentityLookup>>,
    default_limit: usize,
    max_limit: usize,
}

impl QueueQueries {
    pub fn new(
        store: ClaimStore,
        identity: Option<Arc<dyn IdentityLookup>>,
        default_limit: usize,
        max_limit: usize,
    ) -> Self {
        Self {
            store,
            identity,
            default_limit,
            max_limit: max_limit.max(1),
        }
    }

    /// Queue summary for `item_id`. With `user_id`, also that user's live
    /// claim and how many claims are ahead of it. Identity failures only
    /// drop the head's user summary.
    pub async fn get_queue_info(
        &self,
        item_id: &ItemId,
        user_id: Option<&UserId>,
    ) -> Result<QueueInfo, ClaimlineError> {
        let snapshot = self.store.queue_snapshot(item_id, user_id).await?;

        let user_position = snapshot
            .user_claim
            .as_ref()
            .filter(|c| c.status.is_active())
            .and_then(|c| c.queue_position);

        let head = match snapshot.head {
            Some(claim) => {
                let user = self.lookup(&claim.user_id).await;
                Some(HeadOfQueue { claim, user })
            }
            None => None,
        };

        Ok(QueueInfo {
            item_id: item_id.clone(),
            total_claims: snapshot.total,
            active_count: snapshot.active,
            user_claim: snapshot.user_claim,
            user_position,
            estimated_wait: user_position.map(|p| p - 1),
            head,
        })
    }

    /// Active claims in position order, then resolved claims when
    /// `include_terminal` is set.
    pub async fn get_queue_for_item(
        &self,
        item_id: &ItemId,
        include_terminal: bool,
    ) -> Result<Vec<Claim>, ClaimlineError> {
        self.store.list_by_item(item_id, include_terminal).await
    }

    /// A user's claims across items, most recently updated first.
    /// `limit` is clamped to `1..=max_claims_limit`; `None` uses the default.
    pub async fn get_user_claims(
        &self,
        user_id: &UserId,
        status: Option<ClaimStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<Claim>, ClaimlineError> {
        let limit = self.clamp_limit(limit);
        self.store.list_by_user(user_id, status, limit as i64).await
    }

    pub async fn get_queue_statistics(
        &self,
        item_id: &ItemId,
    ) -> Result<QueueStatistics, ClaimlineError> {
        let mut counts = StatusCounts::default();
        for (status, n) in self.store.status_counts(item_id).await? {
            *counts.slot(status) += n;
        }
        let timings = self.store.completion_timings(item_id).await?;

        Ok(QueueStatistics {
            item_id: item_id.clone(),
            total: counts.total(),
            active: counts.active(),
            counts,
            mean_time_to_completion_secs: mean_secs(timings.iter().map(|t| Some(lifecycle(t)))),
            mean_queue_wait_secs: mean_secs(timings.iter().map(queue_wait)),
        })
    }

    /// Pending head-of-queue claims unchanged for longer than `max_age`.
    pub async fn find_stale_head_claims(
        &self,
        max_age: Duration,
    ) -> Result<Vec<Claim>, ClaimlineError> {
        let max_age = chrono::Duration::from_std(max_age)
            .map_err(|e| ClaimlineError::InvalidInput(format!("stale age out of range: {e}")))?;
        self.store.stale_heads(Utc::now() - max_age).await
    }

    fn clamp_limit(&self, limit: Option<usize>) -> usize {
        limit
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit)
    }

    async fn lookup(&self, user_id: &UserId) -> Option<UserSummary> {
        let identity = self.identity.as_ref()?;
        match identity.get_user_summary(user_id).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(%user_id, error = %e, "identity lookup failed, omitting user summary");
                None
            }
        }
    }
}

fn lifecycle(t: &CompletionTiming) -> f64 {
    (t.completed_at - t.created_at).num_milliseconds() as f64 / 1000.0
}

fn queue_wait(t: &CompletionTiming) -> Option<f64> {
    t.selected_at
        .map(|selected| (selected - t.created_at).num_milliseconds() as f64 / 1000.0)
}

fn mean_secs(samples: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, n) = samples
        .flatten()
        .fold((0.0, 0u32), |(sum, n), s| (sum + s, n + 1));
    (n > 0).then(|| sum / f64::from(n))
}
