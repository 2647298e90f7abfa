// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite claim store for the claimline queue.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single
//! connection thread via `tokio-rusqlite`, a per-item lock registry, and the
//! transactional primitives the queue engine composes into atomic operations.

pub mod database;
pub mod locks;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod store;

pub use database::Database;
pub use locks::ItemGuard;
pub use queries::reports::{CompletionTiming, QueueSnapshot};
pub use store::{ClaimStore, ClaimTx, Committed};
