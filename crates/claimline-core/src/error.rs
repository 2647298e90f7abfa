// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the claimline queue.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::types::{ClaimId, ClaimStatus, ItemId, UserId};

/// The primary error type used across the claim store, queue engine, and gateway.
#[derive(Debug, Error)]
pub enum ClaimlineError {
    /// The referenced claim does not exist.
    #[error("claim not found: {0}")]
    ClaimNotFound(ClaimId),

    /// The item catalog does not know the referenced item.
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    /// The user already holds a pending, contacted, or selected claim on the item.
    #[error("user {user_id} already holds a live claim on item {item_id}")]
    DuplicateActiveClaim { item_id: ItemId, user_id: UserId },

    /// The requested status change is not permitted by the claim lifecycle.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: ClaimStatus, to: ClaimStatus },

    /// A manual reorder targeted a position outside the active set.
    #[error("invalid position {requested}: {detail}")]
    InvalidPosition { requested: i64, detail: String },

    /// Request data failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The per-item lock or the database transaction could not be obtained.
    /// Nothing was written; the request can be retried unchanged.
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// An external collaborator (catalog, identity, notification) failed.
    #[error("external dependency {service} failed: {message}")]
    ExternalDependency { service: String, message: String },

    /// The caller cancelled the request before commit; nothing was written.
    #[error("request cancelled before commit")]
    Cancelled,

    /// Storage backend errors (database connection, query failure, migrations).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors, including invariant breaches.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Stable classification of [`ClaimlineError`] for callers that map errors
/// onto a wire protocol.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    DuplicateActiveClaim,
    InvalidTransition,
    InvalidPosition,
    InvalidInput,
    ConcurrencyConflict,
    ExternalDependencyFailure,
    Cancelled,
    Internal,
}

impl ClaimlineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClaimlineError::ClaimNotFound(_) | ClaimlineError::ItemNotFound(_) => {
                ErrorKind::NotFound
            }
            ClaimlineError::DuplicateActiveClaim { .. } => ErrorKind::DuplicateActiveClaim,
            ClaimlineError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            ClaimlineError::InvalidPosition { .. } => ErrorKind::InvalidPosition,
            ClaimlineError::InvalidInput(_) => ErrorKind::InvalidInput,
            ClaimlineError::ConcurrencyConflict(_) => ErrorKind::ConcurrencyConflict,
            ClaimlineError::ExternalDependency { .. } => ErrorKind::ExternalDependencyFailure,
            ClaimlineError::Cancelled => ErrorKind::Cancelled,
            ClaimlineError::Storage { .. }
            | ClaimlineError::Config(_)
            | ClaimlineError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the caller may safely retry the same request unmodified.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClaimlineError::ConcurrencyConflict(_) | ClaimlineError::Cancelled
        )
    }

    /// Shorthand for an external collaborator failure.
    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        ClaimlineError::ExternalDependency {
            service: service.into(),
            message: message.into(),
        }
    }
}
