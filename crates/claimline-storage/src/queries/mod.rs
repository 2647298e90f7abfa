// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the claims table.

pub mod claims;
pub mod reports;
