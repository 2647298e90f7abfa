// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for claimline integration tests.
//!
//! Provides mock collaborators and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockNotifier`] - Records queue events, optionally failing every delivery
//! - [`MockCatalog`] / [`MockIdentity`] - Item existence and user summaries
//! - [`TestHarness`] - Store, engine, queries, and a live notification trigger

pub mod harness;
pub mod mock_collaborators;
pub mod mock_notifier;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_collaborators::{MockCatalog, MockIdentity};
pub use mock_notifier::MockNotifier;
