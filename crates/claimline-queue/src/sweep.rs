// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic sweep: expires long-pending claims and reminds stale heads.
//!
//! Expiry goes through [`QueueEngine::expire_pending`], so it takes the same
//! per-item locks as any other transition.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use claimline_bus::NotificationTrigger;
use claimline_core::{ClaimlineError, EventKind, QueueEvent};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::engine::QueueEngine;
use crate::query::QueueQueries;

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Pending claims moved to `expired`.
    pub expired: usize,
    /// Expiry candidates that could not be updated this pass.
    pub failed: usize,
    /// `HeadReminder` events handed to the notification trigger.
    pub reminders: usize,
}

/// Periodic maintenance over every item's queue: time-based expiry of
/// pending claims and reminders for heads that have waited too long.
pub struct QueueSweeper {
    engine: Arc<QueueEngine>,
    queries: Arc<QueueQueries>,
    trigger: Option<NotificationTrigger>,
    interval: Duration,
    stale_head_after: Duration,
    pending_expiry: Option<Duration>,
}

impl QueueSweeper {
    pub fn new(
        engine: Arc<QueueEngine>,
        queries: Arc<QueueQueries>,
        trigger: Option<NotificationTrigger>,
        interval: Duration,
        stale_head_after: Duration,
        pending_expiry: Option<Duration>,
    ) -> Self {
        Self {
            engine,
            queries,
            trigger,
            interval,
            stale_head_after,
            pending_expiry,
        }
    }

    /// One pass: expire, then remind whatever heads remain stale.
    ///
    /// A failed expiry step is logged and the reminder step still runs.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<SweepReport, ClaimlineError> {
        let mut report = SweepReport::default();

        if let Some(max_age) = self.pending_expiry {
            match self.engine.expire_pending(max_age, cancel).await {
                Ok(pass) => {
                    report.expired = pass.expired.len();
                    report.failed = pass.failed;
                }
                Err(ClaimlineError::Cancelled) => return Err(ClaimlineError::Cancelled),
                Err(e) => error!(error = %e, "pending claim expiry failed"),
            }
        }

        let stale = self.queries.find_stale_head_claims(self.stale_head_after).await?;
        let now = Utc::now();
        for claim in &stale {
            let event = QueueEvent::for_claim(claim, EventKind::HeadReminder, now);
            if let Some(trigger) = &self.trigger {
                if trigger.publish(event) {
                    report.reminders += 1;
                }
            }
        }

        info!(
            expired = report.expired,
            failed = report.failed,
            stale_heads = stale.len(),
            reminders = report.reminders,
            "queue sweep finished"
        );
        Ok(report)
    }

    /// Sweep every `interval` until `cancel` fires. A failed pass is logged
    /// and the next tick runs as usual.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "queue sweeper started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once(&cancel).await {
                        if cancel.is_cancelled() {
                            break;
                        }
                        error!(error = %e, "queue sweep failed");
                    }
                }
            }
        }
        info!("queue sweeper stopped");
    }
}
