// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for the HumanLayer session daemon

mod approvals;
mod codec;
mod conversation;
mod error;
pub mod migration;
mod records;
mod schema;
mod sessions;
mod store;

pub use error::StoreError;
pub use migration::{MigrationError, LATEST_VERSION};
pub use sessions::{SEARCH_DEFAULT_LIMIT, SEARCH_MAX_LIMIT};
pub use store::Store;
