// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification trigger for the claimline queue.
//!
//! Committed queue mutations hand their events to a [`NotificationTrigger`],
//! which forwards them to the external notification collaborator off the
//! mutation path.

pub mod log_notifier;
pub mod trigger;

pub use log_notifier::LogNotifier;
pub use trigger::NotificationTrigger;
