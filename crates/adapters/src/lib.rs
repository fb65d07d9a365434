// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for assistant CLIs: discovery, launch, stream parsing

pub mod claude;
pub mod config;
pub mod discovery;
mod env;
pub mod error;
pub mod opencode;
mod process;
pub mod provider;
pub mod subprocess;
pub mod traced;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use claude::ClaudeProvider;
pub use config::{LaunchConfig, OutputFormat};
pub use discovery::find_binary;
pub use error::ProviderError;
pub use opencode::OpenCodeProvider;
pub use provider::{LaunchedSession, ProcessHandle, Provider, RunOutcome};
pub use traced::TracedProvider;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeProvider, FakeScript, ProviderCall};
