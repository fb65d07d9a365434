// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hand-parsed command line for `hld`

use std::path::PathBuf;

use thiserror::Error;

use crate::config::Overrides;

pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH"));

pub const USAGE: &str = "Usage: hld [--database-path <PATH>] [--help | --version]";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run(Overrides),
    Help,
    Version,
}

#[derive(Debug, Error, PartialEq)]
pub enum ArgsError {
    #[error("unexpected argument '{0}'")]
    Unexpected(String),
    #[error("missing value for '{0}'")]
    MissingValue(&'static str),
}

/// Parse arguments (program name excluded). Info flags win as soon as they
/// are seen.
pub fn parse_args<I>(args: I) -> Result<Command, ArgsError>
where
    I: IntoIterator<Item = String>,
{
    let mut overrides = Overrides::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" | "-v" => return Ok(Command::Version),
            "--help" | "-h" | "help" => return Ok(Command::Help),
            "--database-path" => {
                let value = args
                    .next()
                    .filter(|v| !v.is_empty())
                    .ok_or(ArgsError::MissingValue("--database-path"))?;
                overrides.database_path = Some(PathBuf::from(value));
            }
            other => match other.strip_prefix("--database-path=") {
                Some("") => return Err(ArgsError::MissingValue("--database-path")),
                Some(value) => overrides.database_path = Some(PathBuf::from(value)),
                None => return Err(ArgsError::Unexpected(other.to_string())),
            },
        }
    }
    Ok(Command::Run(overrides))
}

pub fn help_text() -> String {
    format!(
        "hld {VERSION}
HumanLayer daemon - supervises assistant sessions and records their conversations

USAGE:
    hld [OPTIONS]

OPTIONS:
        --database-path <PATH>    Database file (default: <state dir>/daemon.db)
    -h, --help                    Print help information
    -v, --version                 Print version information

ENVIRONMENT:
    HLD_STATE_DIR               State directory (default: ~/.local/state/hld)
    HUMANLAYER_DATABASE_PATH    Database file
    HLD_SHUTDOWN_TIMEOUT_MS     Deadline for stopping sessions on shutdown
    HLD_PERMISSION_CHECK_SECS   Permission expiry sweep interval
    RUST_LOG                    Log filter (default: info)"
    )
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
