// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics. Without an installed recorder every call is a no-op.

use std::time::Duration;

use claimline_core::ClaimStatus;
use metrics::{describe_counter, describe_histogram};

pub const CLAIMS_SUBMITTED: &str = "claims_submitted_total";
pub const CLAIMS_TRANSITIONED: &str = "claims_transitioned_total";
pub const CLAIMS_REORDERED: &str = "claims_reordered_total";
pub const QUEUE_CONFLICTS: &str = "queue_conflicts_total";
pub const NOTIFICATIONS_DROPPED: &str = "notifications_dropped_total";
pub const NOTIFICATIONS_FAILED: &str = "notifications_failed_total";
pub const LOCK_WAIT: &str = "queue_lock_wait_seconds";

/// Register all claimline metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(CLAIMS_SUBMITTED, "Claims accepted into an item queue");
    describe_counter!(CLAIMS_TRANSITIONED, "Committed claim status transitions");
    describe_counter!(CLAIMS_REORDERED, "Manual queue reorders");
    describe_counter!(
        QUEUE_CONFLICTS,
        "Mutations rejected because the item lock or transaction was unavailable"
    );
    describe_counter!(
        NOTIFICATIONS_DROPPED,
        "Queue events dropped because the notification buffer was full"
    );
    describe_counter!(NOTIFICATIONS_FAILED, "Queue events the notifier failed to deliver");
    describe_histogram!(LOCK_WAIT, "Time spent waiting for an item lock in seconds");
}

pub fn record_submitted() {
    metrics::counter!(CLAIMS_SUBMITTED).increment(1);
}

pub fn record_transition(to: ClaimStatus) {
    metrics::counter!(CLAIMS_TRANSITIONED, "to" => to.as_str()).increment(1);
}

pub fn record_reorder() {
    metrics::counter!(CLAIMS_REORDERED).increment(1);
}

pub fn record_conflict() {
    metrics::counter!(QUEUE_CONFLICTS).increment(1);
}

pub fn record_notification_dropped() {
    metrics::counter!(NOTIFICATIONS_DROPPED).increment(1);
}

pub fn record_notification_failed(notifier: &str) {
    metrics::counter!(NOTIFICATIONS_FAILED, "notifier" => notifier.to_string()).increment(1);
}

pub fn record_lock_wait(waited: Duration) {
    metrics::histogram!(LOCK_WAIT).record(waited.as_secs_f64());
}
