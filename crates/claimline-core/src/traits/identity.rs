// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User identity lookups used to enrich queue responses.

use async_trait::async_trait;

use crate::error::ClaimlineError;
use crate::types::{UserId, UserSummary};

#[async_trait]
pub trait IdentityLookup: Send + Sync + 'static {
    async fn get_user_summary(&self, user_id: &UserId) -> Result<UserSummary, ClaimlineError>;
}
