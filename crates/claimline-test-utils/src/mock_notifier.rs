// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock notifier for deterministic testing.
//!
//! `MockNotifier` records every event it is asked to deliver and can be
//! switched into a failing mode to exercise best-effort delivery.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use claimline_core::{ClaimlineError, EventKind, Notifier, QueueEvent};
use tokio::sync::{Mutex, Notify};

#[derive(Default)]
pub struct MockNotifier {
    received: Arc<Mutex<Vec<QueueEvent>>>,
    notify: Arc<Notify>,
    failing: AtomicBool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails (events are still recorded).
    pub fn failing() -> Self {
        let mock = Self::default();
        mock.set_failing(true);
        mock
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn events(&self) -> Vec<QueueEvent> {
        self.received.lock().await.clone()
    }

    pub async fn events_of(&self, kind: EventKind) -> Vec<QueueEvent> {
        self.received
            .lock()
            .await
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    pub async fn clear(&self) {
        self.received.lock().await.clear();
    }

    /// Wait until at least `count` events have arrived or `timeout` passes.
    /// Returns everything received so far either way.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<QueueEvent> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            {
                let received = self.received.lock().await;
                if received.len() >= count {
                    return received.clone();
                }
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.events().await;
            }
        }
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    fn name(&self) -> &str {
        "mock-notifier"
    }

    async fn notify(&self, event: &QueueEvent) -> Result<(), ClaimlineError> {
        self.received.lock().await.push(event.clone());
        self.notify.notify_waiters();
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClaimlineError::external("mock-notifier", "delivery refused"));
        }
        Ok(())
    }
}
