// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Forwards committed queue events to a [`Notifier`] on a background task.
//!
//! Publishing never waits: events go into a bounded channel and a single
//! worker delivers them in order. A full buffer drops the event with a
//! warning. Delivery failures are logged and never retried.

use std::sync::Arc;

use claimline_core::{Notifier, QueueEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Sending half of the notification pipeline. Cheap to clone.
#[derive(Clone)]
pub struct NotificationTrigger {
    tx: mpsc::Sender<QueueEvent>,
}

impl NotificationTrigger {
    /// Start the delivery worker.
    ///
    /// The worker stops when `cancel` fires, after delivering what is already
    /// buffered, or when every trigger handle has been dropped.
    pub fn spawn(
        notifier: Arc<dyn Notifier>,
        buffer: usize,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let handle = tokio::spawn(run_worker(notifier, rx, cancel));
        (Self { tx }, handle)
    }

    /// Queue `event` for delivery. Returns `false` if it was dropped.
    pub fn publish(&self, event: QueueEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(
                    claim_id = %event.claim_id,
                    kind = %event.kind,
                    "notification buffer full, dropping event"
                );
                claimline_prometheus::record_notification_dropped();
                false
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                warn!(
                    claim_id = %event.claim_id,
                    kind = %event.kind,
                    "notification worker stopped, dropping event"
                );
                claimline_prometheus::record_notification_dropped();
                false
            }
        }
    }

    /// Queue several events in order.
    pub fn publish_all(&self, events: impl IntoIterator<Item = QueueEvent>) {
        for event in events {
            self.publish(event);
        }
    }
}

async fn run_worker(
    notifier: Arc<dyn Notifier>,
    mut rx: mpsc::Receiver<QueueEvent>,
    cancel: CancellationToken,
) {
    info!(notifier = notifier.name(), "notification worker started");
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                rx.close();
                while let Some(event) = rx.recv().await {
                    deliver(notifier.as_ref(), &event).await;
                }
                break;
            }
            next = rx.recv() => match next {
                Some(event) => deliver(notifier.as_ref(), &event).await,
                None => break,
            },
        }
    }
    info!(notifier = notifier.name(), "notification worker stopped");
}

async fn deliver(notifier: &dyn Notifier, event: &QueueEvent) {
    match notifier.notify(event).await {
        Ok(()) => debug!(
            claim_id = %event.claim_id,
            item_id = %event.item_id,
            kind = %event.kind,
            "notification delivered"
        ),
        Err(e) => {
            warn!(
                notifier = notifier.name(),
                claim_id = %event.claim_id,
                item_id = %event.item_id,
                kind = %event.kind,
                error = %e,
                "notification delivery failed"
            );
            claimline_prometheus::record_notification_failed(notifier.name());
        }
    }
}
