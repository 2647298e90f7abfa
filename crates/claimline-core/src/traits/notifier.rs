// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound notification dispatch (email/SMS delivery lives elsewhere).

use async_trait::async_trait;

use crate::error::ClaimlineError;
use crate::types::QueueEvent;

/// Delivers queue events to users.
///
/// Delivery is fire-and-forget from the queue's point of view: a failure is
/// logged by the caller and never affects the committed queue state.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    async fn notify(&self, event: &QueueEvent) -> Result<(), ClaimlineError>;
}
