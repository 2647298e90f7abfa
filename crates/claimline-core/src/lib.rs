// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the claimline item claim queue.
//!
//! This crate provides the claim data model, the claim lifecycle state
//! machine, the error taxonomy, and the traits implemented by the external
//! collaborators (item catalog, identity lookup, notification delivery).

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ClaimlineError, ErrorKind};
pub use types::{
    Claim, ClaimDetails, ClaimId, ClaimStatus, EventKind, ItemId, QueueEvent, UserId, UserSummary,
};

pub use traits::{IdentityLookup, ItemCatalog, Notifier};
