// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the claimline queue.
//!
//! Exposes the queue engine and query API as JSON endpoints. Every error kind
//! keeps its own status code so callers can tell invalid requests, missing
//! claims, and retryable conflicts apart.

pub mod error;
pub mod handlers;
pub mod server;

pub use error::{ApiError, ErrorResponse};
pub use server::{GatewayState, HealthState, ServerConfig, router, start_server};
