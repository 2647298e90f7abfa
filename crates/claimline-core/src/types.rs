// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the claim store, queue engine, and gateway.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Opaque, immutable identifier of a claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimId(pub String);

impl ClaimId {
    /// Generate a fresh random claim id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a listed item. Items are owned by the listing service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a user. Users are owned by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! impl_id_conversions {
    ($($ty:ident),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<&str> for $ty {
                fn from(value: &str) -> Self {
                    Self(value.to_string())
                }
            }

            impl From<String> for $ty {
                fn from(value: String) -> Self {
                    Self(value)
                }
            }
        )*
    };
}

impl_id_conversions!(ClaimId, ItemId, UserId);

/// Lifecycle status of a claim.
///
/// `Pending` and `Contacted` form the active set of an item's queue and are
/// the only statuses that carry a queue position. `Selected` has left the
/// queue but is still live; the remaining statuses are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ClaimStatus {
    Pending,
    Contacted,
    Selected,
    Completed,
    Cancelled,
    Skipped,
    Expired,
}

impl ClaimStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [ClaimStatus; 7] = [
        ClaimStatus::Pending,
        ClaimStatus::Contacted,
        ClaimStatus::Selected,
        ClaimStatus::Completed,
        ClaimStatus::Cancelled,
        ClaimStatus::Skipped,
        ClaimStatus::Expired,
    ];

    /// Convert to string for SQLite storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Pending => "pending",
            ClaimStatus::Contacted => "contacted",
            ClaimStatus::Selected => "selected",
            ClaimStatus::Completed => "completed",
            ClaimStatus::Cancelled => "cancelled",
            ClaimStatus::Skipped => "skipped",
            ClaimStatus::Expired => "expired",
        }
    }

    /// Whether the claim is queued and holds a position.
    pub fn is_active(&self) -> bool {
        matches!(self, ClaimStatus::Pending | ClaimStatus::Contacted)
    }

    /// Whether the claim still counts against the one-live-claim-per-user rule.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            ClaimStatus::Pending | ClaimStatus::Contacted | ClaimStatus::Selected
        )
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        !self.is_live()
    }

    /// Legal targets from this status.
    pub fn successors(&self) -> &'static [ClaimStatus] {
        match self {
            ClaimStatus::Pending => &[
                ClaimStatus::Contacted,
                ClaimStatus::Cancelled,
                ClaimStatus::Skipped,
                ClaimStatus::Expired,
            ],
            ClaimStatus::Contacted => &[
                ClaimStatus::Selected,
                ClaimStatus::Cancelled,
                ClaimStatus::Skipped,
            ],
            ClaimStatus::Selected => &[ClaimStatus::Completed, ClaimStatus::Cancelled],
            ClaimStatus::Completed
            | ClaimStatus::Cancelled
            | ClaimStatus::Skipped
            | ClaimStatus::Expired => &[],
        }
    }

    pub fn can_transition_to(&self, target: ClaimStatus) -> bool {
        self.successors().contains(&target)
    }
}

/// Free-text fields supplied with a claim request. Carried opaquely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimDetails {
    #[serde(default)]
    pub pickup_preference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ClaimDetails {
    /// Maximum length, in characters, of each free-text field.
    pub const MAX_FIELD_CHARS: usize = 2000;
}

/// One user's request to receive one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub item_id: ItemId,
    pub user_id: UserId,
    pub status: ClaimStatus,
    /// 1-based rank in the item's active set. `None` outside the active set.
    pub queue_position: Option<i64>,
    pub pickup_preference: Option<String>,
    pub notes: Option<String>,
    /// Reason supplied with a cancel, skip, or expiry.
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub contacted_at: Option<DateTime<Utc>>,
    pub selected_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub skipped_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
}

impl Claim {
    /// Build a new pending claim at the given position.
    pub fn new_pending(
        item_id: ItemId,
        user_id: UserId,
        details: ClaimDetails,
        position: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ClaimId::generate(),
            item_id,
            user_id,
            status: ClaimStatus::Pending,
            queue_position: Some(position),
            pickup_preference: details.pickup_preference,
            notes: details.notes,
            reason: None,
            created_at: now,
            updated_at: now,
            contacted_at: None,
            selected_at: None,
            completed_at: None,
            cancelled_at: None,
            skipped_at: None,
            expired_at: None,
        }
    }

    /// The timestamp recorded on entry into `status`, if any.
    pub fn timestamp_for(&self, status: ClaimStatus) -> Option<DateTime<Utc>> {
        match status {
            ClaimStatus::Pending => Some(self.created_at),
            ClaimStatus::Contacted => self.contacted_at,
            ClaimStatus::Selected => self.selected_at,
            ClaimStatus::Completed => self.completed_at,
            ClaimStatus::Cancelled => self.cancelled_at,
            ClaimStatus::Skipped => self.skipped_at,
            ClaimStatus::Expired => self.expired_at,
        }
    }
}

/// Display information about a user, supplied by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub display_name: String,
    pub contactable: bool,
}

/// Kind of a committed queue transition forwarded to the notification service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    /// The claim is now at the head of its item's queue.
    NextInQueue,
    /// The claim was selected to receive the item.
    Selected,
    /// The claim reached a terminal status.
    Resolved,
    /// The claim has sat at the head of the queue for too long.
    HeadReminder,
}

/// Notification request describing one committed transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEvent {
    pub claim_id: ClaimId,
    pub item_id: ItemId,
    pub user_id: UserId,
    pub kind: EventKind,
    /// Status of the claim when the event was produced.
    pub status: ClaimStatus,
    pub occurred_at: DateTime<Utc>,
}

impl QueueEvent {
    pub fn for_claim(claim: &Claim, kind: EventKind, occurred_at: DateTime<Utc>) -> Self {
        Self {
            claim_id: claim.id.clone(),
            item_id: claim.item_id.clone(),
            user_id: claim.user_id.clone(),
            kind,
            status: claim.status,
            occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn status_string_round_trip() {
        for status in ClaimStatus::ALL {
            assert_eq!(status.to_string(), status.as_str());
            assert_eq!(ClaimStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&ClaimStatus::Contacted).unwrap();
        assert_eq!(json, "\"contacted\"");
    }

    #[test]
    fn active_live_terminal_partition() {
        use ClaimStatus::*;
        assert!(Pending.is_active() && Contacted.is_active());
        assert!(!Selected.is_active() && Selected.is_live());
        for s in [Completed, Cancelled, Skipped, Expired] {
            assert!(s.is_terminal());
            assert!(s.successors().is_empty());
        }
    }

    #[test]
    fn transition_table_matches_lifecycle() {
        use ClaimStatus::*;
        assert!(Pending.can_transition_to(Contacted));
        assert!(Pending.can_transition_to(Expired));
        assert!(!Pending.can_transition_to(Selected));
        assert!(!Pending.can_transition_to(Completed));
        assert!(Contacted.can_transition_to(Selected));
        assert!(!Contacted.can_transition_to(Expired));
        assert!(Selected.can_transition_to(Completed));
        assert!(Selected.can_transition_to(Cancelled));
        assert!(!Selected.can_transition_to(Skipped));
        assert!(!Completed.can_transition_to(Cancelled));
    }

    #[test]
    fn new_pending_claim_has_position_and_no_milestones() {
        let now = Utc::now();
        let claim = Claim::new_pending(
            "item-1".into(),
            "user-1".into(),
            ClaimDetails::default(),
            3,
            now,
        );
        assert_eq!(claim.status, ClaimStatus::Pending);
        assert_eq!(claim.queue_position, Some(3));
        assert_eq!(claim.timestamp_for(ClaimStatus::Pending), Some(now));
        assert!(claim.timestamp_for(ClaimStatus::Completed).is_none());
    }

    #[test]
    fn event_kind_serialization() {
        let json = serde_json::to_string(&EventKind::NextInQueue).unwrap();
        assert_eq!(json, "\"next_in_queue\"");
        assert_eq!(EventKind::HeadReminder.to_string(), "head_reminder");
    }
}
