// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces to the services the claim queue consumes but does not own.
//!
//! All collaborators use `#[async_trait]` for dynamic dispatch and are held
//! as `Arc<dyn Trait>` by the queue engine and query API.

pub mod catalog;
pub mod identity;
pub mod notifier;

pub use catalog::ItemCatalog;
pub use identity::IdentityLookup;
pub use notifier::Notifier;
