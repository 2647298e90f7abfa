// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The queue engine: the only writer of claim status and queue positions.
//!
//! Every mutation runs inside [`ClaimStore::with_item_lock`], so reading the
//! active set, computing positions, and writing them is one serialized,
//! atomic unit per item. Rejections happen inside that unit before anything
//! is written. Events produced by a mutation are published only after it
//! commits.

use std::sync::Arc;
use std::time::Duration;

use claimline_bus::NotificationTrigger;
use claimline_core::{
    Claim, ClaimDetails, ClaimId, ClaimStatus, ClaimlineError, EventKind, ItemCatalog, ItemId,
    QueueEvent, UserId,
};
use claimline_storage::{ClaimStore, ClaimTx};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Applies every queue mutation: submissions, lifecycle transitions,
/// manual reorders, and expiry.
///
/// Holds the claim store, the item catalog consulted on submit, and an
/// optional trigger that receives the events of each committed mutation.
pub struct QueueEngine {
    store: ClaimStore,
    catalog: Arc<dyn ItemCatalog>,
    trigger: Option<NotificationTrigger>,
}

/// Value produced inside a locked transaction plus the events to publish on commit.
type Outcome<R> = (R, Vec<QueueEvent>);

/// Result of one [`QueueEngine::expire_pending`] pass.
#[derive(Debug, Default)]
pub struct ExpiryPass {
    /// Claims moved to `expired` by this pass.
    pub expired: Vec<Claim>,
    /// Candidates left pending because their item could not be updated
    /// (lock timeout or storage failure). The next pass retries them.
    pub failed: usize,
}

impl QueueEngine {
    pub fn new(
        store: ClaimStore,
        catalog: Arc<dyn ItemCatalog>,
        trigger: Option<NotificationTrigger>,
    ) -> Self {
        Self {
            store,
            catalog,
            trigger,
        }
    }

    pub fn store(&self) -> &ClaimStore {
        &self.store
    }

    /// Queue a new claim at the back of `item_id`'s active set.
    pub async fn submit_claim(
        &self,
        item_id: &ItemId,
        user_id: &UserId,
        details: ClaimDetails,
        cancel: &CancellationToken,
    ) -> Result<Claim, ClaimlineError> {
        validate_id("item_id", item_id.as_str())?;
        validate_id("user_id", user_id.as_str())?;
        validate_details(&details)?;
        if !self.catalog.item_exists(item_id).await? {
            return Err(ClaimlineError::ItemNotFound(item_id.clone()));
        }

        let (item, user) = (item_id.clone(), user_id.clone());
        let claim = self
            .mutate(item_id, cancel, move |tx| {
                if tx.find_user_active_claim(&user)?.is_some() {
                    return Err(ClaimlineError::DuplicateActiveClaim {
                        item_id: item,
                        user_id: user,
                    });
                }
                let position = tx.count_active()? + 1;
                let claim = Claim::new_pending(item, user, details, position, tx.now());
                tx.insert(&claim)?;

                let mut events = Vec::new();
                if position == 1 {
                    events.push(QueueEvent::for_claim(&claim, EventKind::NextInQueue, tx.now()));
                }
                Ok((claim, events))
            })
            .await?;

        claimline_prometheus::record_submitted();
        info!(
            claim_id = %claim.id,
            item_id = %claim.item_id,
            user_id = %claim.user_id,
            position = ?claim.queue_position,
            "claim submitted"
        );
        Ok(claim)
    }

    /// Move a claim along its lifecycle.
    ///
    /// Repeating a transition the claim has already made returns the stored
    /// claim unchanged. Leaving the active set closes the vacated position.
    /// `reason` is kept for cancellations, skips, and expiries.
    pub async fn advance_status(
        &self,
        claim_id: &ClaimId,
        target: ClaimStatus,
        reason: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<Claim, ClaimlineError> {
        self.transition(claim_id, target, reason, cancel)
            .await
            .map(|(claim, _)| claim)
    }

    /// Apply a transition and report the status the claim had before it.
    async fn transition(
        &self,
        claim_id: &ClaimId,
        target: ClaimStatus,
        reason: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<(Claim, ClaimStatus), ClaimlineError> {
        let item_id = self.store.get_by_id(claim_id).await?.item_id;
        let id = claim_id.clone();

        let (claim, from) = self
            .mutate(&item_id, cancel, move |tx| {
                let claim = tx.get_by_id(&id)?;
                let from = claim.status;
                if from == target {
                    return Ok(((claim, from), Vec::new()));
                }
                if !from.can_transition_to(target) {
                    return Err(ClaimlineError::InvalidTransition { from, to: target });
                }

                let reason = match target {
                    ClaimStatus::Cancelled | ClaimStatus::Skipped | ClaimStatus::Expired => {
                        reason.as_deref()
                    }
                    _ => None,
                };
                let mut events = Vec::new();

                let updated = if from.is_active() && !target.is_active() {
                    leave_active_set(tx, &claim, target, reason, &mut events)?
                } else {
                    let position = if target.is_active() {
                        claim.queue_position
                    } else {
                        None
                    };
                    tx.set_status(&id, target, position, reason)?
                };

                match target {
                    ClaimStatus::Selected => {
                        events.push(QueueEvent::for_claim(&updated, EventKind::Selected, tx.now()));
                    }
                    status if status.is_terminal() => {
                        events.push(QueueEvent::for_claim(&updated, EventKind::Resolved, tx.now()));
                    }
                    _ => {}
                }
                Ok(((updated, from), events))
            })
            .await?;

        if from == claim.status {
            debug!(claim_id = %claim.id, status = %claim.status, "transition already applied");
        } else {
            claimline_prometheus::record_transition(claim.status);
            info!(
                claim_id = %claim.id,
                item_id = %claim.item_id,
                from = %from,
                to = %claim.status,
                "claim status advanced"
            );
        }
        Ok((claim, from))
    }

    /// Administrative reorder: place an active claim at `new_position`,
    /// shifting the claims in between by one.
    pub async fn move_to_position(
        &self,
        claim_id: &ClaimId,
        new_position: i64,
        cancel: &CancellationToken,
    ) -> Result<Claim, ClaimlineError> {
        let item_id = self.store.get_by_id(claim_id).await?.item_id;
        let id = claim_id.clone();

        let (claim, old_position) = self
            .mutate(&item_id, cancel, move |tx| {
                let claim = tx.get_by_id(&id)?;
                let old = match (claim.status.is_active(), claim.queue_position) {
                    (true, Some(position)) => position,
                    _ => {
                        return Err(ClaimlineError::InvalidPosition {
                            requested: new_position,
                            detail: format!("claim is {}, not queued", claim.status),
                        });
                    }
                };
                let active = tx.count_active()?;
                if new_position < 1 || new_position > active {
                    return Err(ClaimlineError::InvalidPosition {
                        requested: new_position,
                        detail: format!("active set holds positions 1..={active}"),
                    });
                }
                if new_position == old {
                    return Ok(((claim, old), Vec::new()));
                }

                // Park the moved claim outside 1..=N while the others shift.
                tx.set_position(&id, 0)?;
                if new_position < old {
                    tx.shift_positions(new_position, old - 1, 1)?;
                } else {
                    tx.shift_positions(old + 1, new_position, -1)?;
                }
                tx.set_position(&id, new_position)?;

                let mut events = Vec::new();
                if new_position == 1 || old == 1 {
                    if let Some(head) = tx.head()? {
                        events.push(QueueEvent::for_claim(&head, EventKind::NextInQueue, tx.now()));
                    }
                }
                Ok(((tx.get_by_id(&id)?, old), events))
            })
            .await?;

        if claim.queue_position != Some(old_position) {
            claimline_prometheus::record_reorder();
            info!(
                claim_id = %claim.id,
                item_id = %claim.item_id,
                from = old_position,
                to = ?claim.queue_position,
                "claim moved"
            );
        }
        Ok(claim)
    }

    /// The active claim at position 1, if any.
    pub async fn get_next_in_queue(&self, item_id: &ItemId) -> Result<Option<Claim>, ClaimlineError> {
        self.store.head_of_queue(item_id).await
    }

    /// Expire pending claims created more than `max_age` ago.
    ///
    /// Each claim is expired under its own item's lock. A claim whose item
    /// cannot be updated is counted in [`ExpiryPass::failed`] and the pass
    /// moves on to the next candidate. Claims that left `pending` since they
    /// were listed, including ones another pass already expired, are skipped.
    /// Only cancellation ends the pass early.
    pub async fn expire_pending(
        &self,
        max_age: Duration,
        cancel: &CancellationToken,
    ) -> Result<ExpiryPass, ClaimlineError> {
        let max_age = chrono::Duration::from_std(max_age)
            .map_err(|e| ClaimlineError::InvalidInput(format!("expiry age out of range: {e}")))?;
        let cutoff = chrono::Utc::now() - max_age;
        let candidates = self.store.expirable_pending(cutoff).await?;

        let mut pass = ExpiryPass::default();
        for (claim_id, item_id) in candidates {
            let reason = Some(format!(
                "pending for more than {}s",
                max_age.num_seconds()
            ));
            match self
                .transition(&claim_id, ClaimStatus::Expired, reason, cancel)
                .await
            {
                Ok((claim, ClaimStatus::Pending)) => pass.expired.push(claim),
                Ok((_, from)) => {
                    debug!(%claim_id, %item_id, %from, "claim expired elsewhere");
                }
                Err(ClaimlineError::InvalidTransition { from, .. }) => {
                    debug!(%claim_id, %item_id, %from, "claim left pending before expiry");
                }
                Err(ClaimlineError::Cancelled) => return Err(ClaimlineError::Cancelled),
                Err(e) => {
                    warn!(%claim_id, %item_id, error = %e, "failed to expire claim");
                    pass.failed += 1;
                }
            }
        }
        Ok(pass)
    }

    /// Run `f` under the item lock and publish its events after commit.
    async fn mutate<F, R>(
        &self,
        item_id: &ItemId,
        cancel: &CancellationToken,
        f: F,
    ) -> Result<R, ClaimlineError>
    where
        F: FnOnce(&ClaimTx<'_>) -> Result<Outcome<R>, ClaimlineError> + Send + 'static,
        R: Send + 'static,
    {
        let committed = match self.store.with_item_lock(item_id, cancel, f).await {
            Ok(committed) => committed,
            Err(e) => {
                if matches!(e, ClaimlineError::ConcurrencyConflict(_)) {
                    claimline_prometheus::record_conflict();
                }
                return Err(e);
            }
        };
        claimline_prometheus::record_lock_wait(committed.lock_wait);

        let (value, events) = committed.value;
        if let Some(trigger) = &self.trigger {
            trigger.publish_all(events);
        }
        Ok(value)
    }
}

/// Remove `claim` from the active set into `target` and close the gap it leaves.
fn leave_active_set(
    tx: &ClaimTx<'_>,
    claim: &Claim,
    target: ClaimStatus,
    reason: Option<&str>,
    events: &mut Vec<QueueEvent>,
) -> Result<Claim, ClaimlineError> {
    let vacated = claim.queue_position.ok_or_else(|| {
        ClaimlineError::Internal(format!("active claim {} has no position", claim.id))
    })?;
    let active = tx.count_active()?;

    let updated = tx.set_status(&claim.id, target, None, reason)?;
    tx.shift_positions(vacated + 1, active, -1)?;

    if vacated == 1 {
        if let Some(head) = tx.head()? {
            events.push(QueueEvent::for_claim(&head, EventKind::NextInQueue, tx.now()));
        }
    }
    Ok(updated)
}

fn validate_id(field: &str, value: &str) -> Result<(), ClaimlineError> {
    if value.trim().is_empty() {
        return Err(ClaimlineError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}

fn validate_details(details: &ClaimDetails) -> Result<(), ClaimlineError> {
    let fields = [
        ("pickup_preference", &details.pickup_preference),
        ("notes", &details.notes),
    ];
    for (name, value) in fields {
        if let Some(text) = value {
            let chars = text.chars().count();
            if chars > ClaimDetails::MAX_FIELD_CHARS {
                return Err(ClaimlineError::InvalidInput(format!(
                    "{name} is {chars} characters, the limit is {}",
                    ClaimDetails::MAX_FIELD_CHARS
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_details_are_rejected() {
        let details = ClaimDetails {
            pickup_preference: None,
            notes: Some("x".repeat(ClaimDetails::MAX_FIELD_CHARS + 1)),
        };
        let err = validate_details(&details).unwrap_err();
        assert!(matches!(err, ClaimlineError::InvalidInput(msg) if msg.starts_with("notes")));
    }

    #[test]
    fn details_at_the_limit_are_accepted() {
        let details = ClaimDetails {
            pickup_preference: Some("é".repeat(ClaimDetails::MAX_FIELD_CHARS)),
            notes: None,
        };
        assert!(validate_details(&details).is_ok());
    }

    #[test]
    fn blank_ids_are_rejected() {
        assert!(validate_id("item_id", "  ").is_err());
        assert!(validate_id("item_id", "sofa").is_ok());
    }
}
