// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics for the claimline queue.
//!
//! Uses the metrics-rs facade with the Prometheus exporter.
//! Metrics are rendered as Prometheus text format via [`PrometheusAdapter::render`],
//! which the gateway serves on `/metrics`.

pub mod recording;

use claimline_core::ClaimlineError;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub use recording::{
    record_conflict, record_lock_wait, record_notification_dropped, record_notification_failed,
    record_reorder, record_submitted, record_transition, register_metrics,
};

/// Installed Prometheus recorder.
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Install the Prometheus recorder globally and register metric descriptions.
    ///
    /// Only one recorder can be installed per process. Returns an error if a
    /// recorder is already installed.
    pub fn new() -> Result<Self, ClaimlineError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            ClaimlineError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();

        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimline_core::ClaimStatus;
    use std::time::Duration;

    // The global recorder can only be installed once per process, so these
    // tests scope a private recorder to the current thread.
    #[test]
    fn recorded_metrics_render_with_labels() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            record_submitted();
            record_transition(ClaimStatus::Cancelled);
            record_notification_dropped();
            record_lock_wait(Duration::from_millis(3));
        });

        let text = handle.render();
        assert!(text.contains("claims_submitted_total 1"));
        assert!(text.contains("claims_transitioned_total{to=\"cancelled\"} 1"));
        assert!(text.contains("notifications_dropped_total 1"));
        assert!(text.contains("queue_lock_wait_seconds"));
    }

    #[test]
    fn recording_without_recorder_is_a_noop() {
        record_conflict();
        record_reorder();
    }
}
