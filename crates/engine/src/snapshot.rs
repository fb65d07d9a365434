// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File snapshots captured when a `Read` tool call completes.
//!
//! A full read stores the tool output with its line-number gutter removed.
//! A partial read (`limit` or `offset` in the input) reads the file from
//! disk instead, unless it exceeds [`MAX_SNAPSHOT_BYTES`], in which case the
//! partial output is kept.

use serde_json::Value;
use std::path::{Path, PathBuf};

/// Files above this size are not read from disk
pub const MAX_SNAPSHOT_BYTES: u64 = 10 * 1024 * 1024;

/// Tool whose completions trigger a snapshot
pub const READ_TOOL: &str = "Read";

const GUTTER: char = '→';

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("tool input is not valid JSON: {0}")]
    Input(#[from] serde_json::Error),
    #[error("tool input has no file path")]
    NoPath,
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What to store for one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub file_path: String,
    pub content: String,
}

/// Remove everything through the first `→` on each line. Lines without
/// a gutter are kept as they are.
pub fn strip_line_numbers(content: &str) -> String {
    content
        .split('\n')
        .map(|line| match line.split_once(GUTTER) {
            Some((_, rest)) => rest,
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn is_partial_read(input: &Value) -> bool {
    ["limit", "offset"]
        .iter()
        .any(|key| input.get(key).is_some_and(|v| !v.is_null()))
}

/// `file_path`, or OpenCode's `filePath`
pub fn input_file_path(input: &Value) -> Option<&str> {
    input
        .get("file_path")
        .or_else(|| input.get("filePath"))
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
}

fn resolve(working_dir: &Path, file_path: &str) -> PathBuf {
    let path = Path::new(file_path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}

/// Apply the snapshot rule to one completed `Read` call.
pub fn capture(
    tool_input_json: &str,
    result_content: &str,
    working_dir: &Path,
) -> Result<Capture, SnapshotError> {
    let input: Value = serde_json::from_str(tool_input_json)?;
    let file_path = input_file_path(&input).ok_or(SnapshotError::NoPath)?;

    if !is_partial_read(&input) {
        return Ok(Capture {
            file_path: file_path.to_string(),
            content: strip_line_numbers(result_content),
        });
    }

    let path = resolve(working_dir, file_path);
    let io_err = |source| SnapshotError::Io {
        path: path.clone(),
        source,
    };
    let size = std::fs::metadata(&path).map_err(io_err)?.len();
    let content = if size <= MAX_SNAPSHOT_BYTES {
        let bytes = std::fs::read(&path).map_err(io_err)?;
        String::from_utf8_lossy(&bytes).into_owned()
    } else {
        tracing::debug!(path = %path.display(), size, "file too large, keeping partial read");
        strip_line_numbers(result_content)
    };
    Ok(Capture {
        file_path: file_path.to_string(),
        content,
    })
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
