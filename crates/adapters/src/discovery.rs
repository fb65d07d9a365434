// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Locating assistant binaries on disk.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Install locations checked after `PATH`, relative to the home directory
const HOME_LOCATIONS: &[&str] = &[
    ".claude/local",
    ".local/bin",
    ".npm-global/bin",
    ".bun/bin",
    ".opencode/bin",
    ".volta/bin",
];

/// Absolute install locations checked last
const SYSTEM_LOCATIONS: &[&str] = &["/usr/local/bin", "/opt/homebrew/bin", "/usr/bin"];

/// Search `PATH` and the well-known install locations for `name`.
pub fn find_binary(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH").unwrap_or_default();
    find_binary_in(name, &path_var, dirs::home_dir().as_deref())
}

/// [`find_binary`] with explicit inputs
pub fn find_binary_in(name: &str, path_var: &OsString, home: Option<&Path>) -> Option<PathBuf> {
    let from_path = std::env::split_paths(path_var);
    let from_home = home
        .into_iter()
        .flat_map(|h| HOME_LOCATIONS.iter().map(move |rel| h.join(rel)));
    let from_system = SYSTEM_LOCATIONS.iter().map(PathBuf::from);

    from_path
        .chain(from_home)
        .chain(from_system)
        .map(|dir| dir.join(name))
        .find(|candidate| !is_excluded(candidate) && is_executable(candidate))
}

/// Paths that look like a binary but are not a usable install
pub fn is_excluded(path: &Path) -> bool {
    if path.components().any(|c| c.as_os_str() == "node_modules") {
        return true;
    }
    path.extension().is_some_and(|ext| ext == "bak")
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
