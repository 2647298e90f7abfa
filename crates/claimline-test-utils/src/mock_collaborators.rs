// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock item catalog and identity service.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use claimline_core::{
    ClaimlineError, IdentityLookup, ItemCatalog, ItemId, UserId, UserSummary,
};

/// Catalog that knows a fixed set of items, or every item when open.
#[derive(Default)]
pub struct MockCatalog {
    items: RwLock<HashSet<ItemId>>,
    open: bool,
}

impl MockCatalog {
    /// A catalog that reports every item as existing.
    pub fn open() -> Self {
        Self {
            items: RwLock::new(HashSet::new()),
            open: true,
        }
    }

    pub fn with_items<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ItemId>,
    {
        Self {
            items: RwLock::new(items.into_iter().map(Into::into).collect()),
            open: false,
        }
    }

    pub fn add_item(&self, item_id: impl Into<ItemId>) {
        if let Ok(mut items) = self.items.write() {
            items.insert(item_id.into());
        }
    }
}

#[async_trait]
impl ItemCatalog for MockCatalog {
    async fn item_exists(&self, item_id: &ItemId) -> Result<bool, ClaimlineError> {
        if self.open {
            return Ok(true);
        }
        let items = self
            .items
            .read()
            .map_err(|_| ClaimlineError::external("mock-catalog", "lock poisoned"))?;
        Ok(items.contains(item_id))
    }
}

/// Identity service with canned summaries. Unknown users get a generated one.
#[derive(Default)]
pub struct MockIdentity {
    users: RwLock<HashMap<UserId, UserSummary>>,
    failing: AtomicBool,
}

impl MockIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user_id: impl Into<UserId>, display_name: &str) -> Self {
        if let Ok(mut users) = self.users.write() {
            users.insert(
                user_id.into(),
                UserSummary {
                    display_name: display_name.to_string(),
                    contactable: true,
                },
            );
        }
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityLookup for MockIdentity {
    async fn get_user_summary(&self, user_id: &UserId) -> Result<UserSummary, ClaimlineError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClaimlineError::external("mock-identity", "service unavailable"));
        }
        let users = self
            .users
            .read()
            .map_err(|_| ClaimlineError::external("mock-identity", "lock poisoned"))?;
        Ok(users.get(user_id).cloned().unwrap_or_else(|| UserSummary {
            display_name: format!("user {user_id}"),
            contactable: false,
        }))
    }
}
