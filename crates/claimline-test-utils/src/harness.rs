// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for queue integration testing.
//!
//! `TestHarness` assembles a complete queue stack on a temporary SQLite
//! database: store, engine, query API, a running notification trigger, and
//! mock collaborators.

use std::sync::Arc;
use std::time::Duration;

use claimline_bus::NotificationTrigger;
use claimline_config::model::{ClaimlineConfig, StorageConfig};
use claimline_core::{
    Claim, ClaimDetails, ClaimId, ClaimStatus, ClaimlineError, ItemId, UserId,
};
use claimline_queue::{QueueEngine, QueueQueries};
use claimline_storage::{ClaimStore, Database};
use tokio_util::sync::CancellationToken;

use crate::mock_collaborators::{MockCatalog, MockIdentity};
use crate::mock_notifier::MockNotifier;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    catalog: MockCatalog,
    identity: MockIdentity,
    failing_notifier: bool,
    lock_timeout: Duration,
    notification_buffer: usize,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            catalog: MockCatalog::open(),
            identity: MockIdentity::new(),
            failing_notifier: false,
            lock_timeout: Duration::from_secs(5),
            notification_buffer: 1024,
        }
    }

    /// Restrict the catalog to the given items.
    pub fn with_items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ItemId>,
    {
        self.catalog = MockCatalog::with_items(items);
        self
    }

    pub fn with_identity(mut self, identity: MockIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Make every notification delivery fail.
    pub fn with_failing_notifier(mut self) -> Self {
        self.failing_notifier = true;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_notification_buffer(mut self, buffer: usize) -> Self {
        self.notification_buffer = buffer;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, ClaimlineError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| ClaimlineError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("claims.db");

        let mut config = ClaimlineConfig::default();
        config.storage = StorageConfig::at_path(db_path.to_string_lossy().to_string());
        config.queue.lock_timeout_ms = self.lock_timeout.as_millis() as u64;
        config.queue.notification_buffer = self.notification_buffer;

        let db = Database::open_with_config(&config.storage).await?;
        let store = ClaimStore::new(db, config.queue.lock_timeout());

        let notifier = Arc::new(if self.failing_notifier {
            MockNotifier::failing()
        } else {
            MockNotifier::new()
        });
        let cancel = CancellationToken::new();
        let (trigger, _worker) = NotificationTrigger::spawn(
            notifier.clone(),
            config.queue.notification_buffer,
            cancel.child_token(),
        );

        let catalog = Arc::new(self.catalog);
        let identity = Arc::new(self.identity);
        let engine = Arc::new(QueueEngine::new(
            store.clone(),
            catalog.clone(),
            Some(trigger.clone()),
        ));
        let queries = Arc::new(QueueQueries::new(
            store.clone(),
            Some(identity.clone()),
            config.queue.default_claims_limit,
            config.queue.max_claims_limit,
        ));

        Ok(TestHarness {
            engine,
            queries,
            store,
            trigger,
            notifier,
            catalog,
            identity,
            config,
            cancel,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete queue environment with mock collaborators and temp storage.
pub struct TestHarness {
    pub engine: Arc<QueueEngine>,
    pub queries: Arc<QueueQueries>,
    pub store: ClaimStore,
    pub trigger: NotificationTrigger,
    pub notifier: Arc<MockNotifier>,
    pub catalog: Arc<MockCatalog>,
    pub identity: Arc<MockIdentity>,
    pub config: ClaimlineConfig,
    /// Stops the notification worker on drop of the harness.
    pub cancel: CancellationToken,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Submit a claim with empty details.
    pub async fn submit(&self, item: &str, user: &str) -> Result<Claim, ClaimlineError> {
        self.engine
            .submit_claim(
                &ItemId::from(item),
                &UserId::from(user),
                ClaimDetails::default(),
                &CancellationToken::new(),
            )
            .await
    }

    pub async fn advance(
        &self,
        claim_id: &ClaimId,
        status: ClaimStatus,
    ) -> Result<Claim, ClaimlineError> {
        self.engine
            .advance_status(claim_id, status, None, &CancellationToken::new())
            .await
    }

    pub async fn move_to(&self, claim_id: &ClaimId, position: i64) -> Result<Claim, ClaimlineError> {
        self.engine
            .move_to_position(claim_id, position, &CancellationToken::new())
            .await
    }

    /// Active set of `item` as `(user, position)` pairs in position order.
    pub async fn positions(&self, item: &str) -> Result<Vec<(String, i64)>, ClaimlineError> {
        Ok(self
            .store
            .list_active_by_item(&ItemId::from(item))
            .await?
            .into_iter()
            .filter_map(|c| c.queue_position.map(|p| (c.user_id.0, p)))
            .collect())
    }

    /// Panic unless the active positions of `item` are exactly `1..=N`.
    pub async fn assert_dense(&self, item: &str) {
        let positions: Vec<i64> = self
            .positions(item)
            .await
            .unwrap_or_else(|e| panic!("reading positions of {item}: {e}"))
            .into_iter()
            .map(|(_, p)| p)
            .collect();
        let expected: Vec<i64> = (1..=positions.len() as i64).collect();
        assert_eq!(positions, expected, "active positions of {item} are not dense");
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
