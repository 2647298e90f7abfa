// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Item existence checks against the listing service.

use async_trait::async_trait;

use crate::error::ClaimlineError;
use crate::types::ItemId;

/// Answers whether an item is listed and may be claimed.
#[async_trait]
pub trait ItemCatalog: Send + Sync + 'static {
    /// Returns `Ok(false)` for unknown items. Transport failures are reported
    /// as [`ClaimlineError::ExternalDependency`].
    async fn item_exists(&self, item_id: &ItemId) -> Result<bool, ClaimlineError>;
}
