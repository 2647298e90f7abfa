// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notifier that writes events to the log. Used when no delivery channel is wired up.

use async_trait::async_trait;
use claimline_core::{ClaimlineError, Notifier, QueueEvent};
use tracing::info;

#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, event: &QueueEvent) -> Result<(), ClaimlineError> {
        info!(
            claim_id = %event.claim_id,
            item_id = %event.item_id,
            user_id = %event.user_id,
            kind = %event.kind,
            status = %event.status,
            "queue notification"
        );
        Ok(())
    }
}
