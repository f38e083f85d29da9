//! Text contracts of the displayplacer tool
//!
//! The tool has no structured output mode, so capture and apply results are
//! recovered from its free text here. Nothing outside this module should look
//! at raw tool output.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::constants::tool;
use crate::error::{LayoutError, LayoutResult};

/// One double-quoted per-display argument (no embedded-quote handling).
/// Empty quotes match too so they cannot pair up with the next argument's opening quote.
static QUOTED_ARG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)""#).expect("quoted argument pattern is valid"));

/// Diagnostic printed for each display referenced by the layout but not connected
static MISSING_SCREEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Unable to find screen\s+([A-Za-z0-9-]+)").expect("missing screen pattern is valid")
});

/// Result of applying a layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Success,
    /// Everything connected was applied; these display ids were skipped.
    /// Sorted ascending, no duplicates.
    PartialSuccess { missing: Vec<String> },
    Failure(String),
}

impl ApplyOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ApplyOutcome::Failure(_))
    }
}

/// Extract the per-display arguments from `displayplacer list` stdout.
///
/// Uses the first line whose trimmed text starts with the command prefix and
/// returns its quoted substrings in order.
pub fn parse_list_output(stdout: &str) -> LayoutResult<Vec<String>> {
    let line = stdout
        .lines()
        .find(|line| line.trim().starts_with(tool::COMMAND_LINE_PREFIX))
        .ok_or(LayoutError::ParseFailed)?;

    let args: Vec<String> = QUOTED_ARG
        .captures_iter(line)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|arg| !arg.is_empty())
        .map(str::to_string)
        .collect();

    if args.is_empty() {
        return Err(LayoutError::ParseFailed);
    }
    Ok(args)
}

/// Distinct missing display ids mentioned in `text`, sorted ascending
pub fn extract_missing_displays(text: &str) -> Vec<String> {
    MISSING_SCREEN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Classify an apply run from its exit code and combined output.
///
/// A missing display is the only nonzero-but-acceptable condition: the tool
/// exits nonzero after applying everything it could.
pub fn classify_apply(exit_code: Option<i32>, combined: &str) -> ApplyOutcome {
    let combined = combined.trim();
    let missing = extract_missing_displays(combined);

    match (exit_code == Some(0), missing.is_empty()) {
        (true, true) => ApplyOutcome::Success,
        (_, false) => ApplyOutcome::PartialSuccess { missing },
        (false, true) if combined.is_empty() => {
            ApplyOutcome::Failure(tool::GENERIC_FAILURE.to_string())
        }
        (false, true) => ApplyOutcome::Failure(combined.to_string()),
    }
}

/// Diagnostic for a failed `list` run: stderr when present, stdout otherwise
pub fn run_failure_diagnostic(stdout: &str, stderr: &str) -> String {
    if stderr.trim().is_empty() {
        stdout.trim().to_string()
    } else {
        stderr.trim().to_string()
    }
}
