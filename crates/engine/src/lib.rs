// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! HumanLayer session supervisor: event bus, conversation recording,
//! lifecycle, approvals and the session manager

pub mod approvals;
pub mod bus;
pub mod env;
mod error;
pub mod expiry;
mod injector;
pub mod lifecycle;
mod manager;
mod monitor;
mod processor;
mod registry;
pub mod request;
pub mod snapshot;

#[cfg(test)]
mod test_helpers;

pub use approvals::ApprovalService;
pub use bus::{EventBus, Subscription, SubscriptionId};
pub use error::SessionError;
pub use expiry::PermissionExpiryMonitor;
pub use manager::{ManagerConfig, Providers, SessionManager, SettingsUpdate};
pub use request::{merge_continue, ContinueConfig, SessionConfig};
