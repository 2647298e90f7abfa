// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The claimline queue: engine, read-side queries, and the periodic sweep.
//!
//! [`QueueEngine`] is the only component that mutates claims. It keeps every
//! item's active set densely numbered `1..=N`, enforces one live claim per
//! user and item, and applies the claim lifecycle. [`QueueQueries`] reads
//! committed state for reporting.

pub mod engine;
pub mod query;
pub mod sweep;

pub use engine::{ExpiryPass, QueueEngine};
pub use query::{HeadOfQueue, QueueInfo, QueueQueries, QueueStatistics, StatusCounts};
pub use sweep::{QueueSweeper, SweepReport};
