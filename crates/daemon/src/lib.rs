// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HumanLayer daemon library: configuration, logging and lifecycle for
//! the `hld` binary.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod args;
pub mod config;
pub mod env;
pub mod lifecycle;
pub mod logging;

pub use args::{parse_args, Command};
pub use config::{Config, FileConfig, Overrides};
pub use lifecycle::{build_providers, startup, Daemon, DaemonManager, LifecycleError};
