// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Short titles and labels derived from session inputs.

/// Maximum length of a summary, in Unicode scalars
pub const SUMMARY_MAX_CHARS: usize = 50;

const ELLIPSIS: &str = "...";

/// Derive a one-line summary from a query.
///
/// Whitespace runs (and stray control characters) collapse to single
/// spaces. Results longer than [`SUMMARY_MAX_CHARS`] are cut so that the
/// trailing `...` lands exactly on the limit.
pub fn calculate_summary(query: &str) -> String {
    let normalized = query
        .split(|c: char| c.is_whitespace() || c.is_control())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if normalized.chars().count() <= SUMMARY_MAX_CHARS {
        return normalized;
    }
    let keep = SUMMARY_MAX_CHARS - ELLIPSIS.len();
    let mut summary: String = normalized.chars().take(keep).collect();
    summary.push_str(ELLIPSIS);
    summary
}

/// Short model label reported in session rows ("opus", "sonnet").
///
/// Returns `None` for models outside the known families.
pub fn model_label(model: &str) -> Option<&'static str> {
    let lower = model.to_lowercase();
    if lower.contains("opus") {
        Some("opus")
    } else if lower.contains("sonnet") {
        Some("sonnet")
    } else {
        None
    }
}

#[cfg(test)]
#[path = "summary_tests.rs"]
mod tests;
