//! Spam score header check
//!
//! Mail servers running SpamAssassin stamp every message with an
//! `X-Spam-Status` header whose value starts with `Yes` or `No`. The
//! check reads it from the raw header block, so folded values and
//! headers the parser would otherwise normalize are seen as sent.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

pub const SPAM_STATUS_HEADER: &str = "X-Spam-Status";

/// `Name: value` with folded continuation lines. Values stop at a
/// colon on the first line.
static HEADER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([^\r\n:]+)\s*:\s*([^\r\n:]+(?:\r?\n[ \t][^\r\n]+)*)")
        .expect("header pattern is valid")
});

/// Split a raw header block into `(name, value)` pairs, in order.
#[must_use]
pub fn parse_raw_headers(raw_headers: &str) -> Vec<(&str, &str)> {
    HEADER_LINE
        .captures_iter(raw_headers)
        .filter_map(|caps| Some((caps.get(1)?.as_str(), caps.get(2)?.as_str())))
        .collect()
}

/// Value of the first `X-Spam-Status` header (exact name match).
#[must_use]
pub fn spam_status(raw_headers: &str) -> Option<&str> {
    parse_raw_headers(raw_headers)
        .into_iter()
        .find(|(name, _)| *name == SPAM_STATUS_HEADER)
        .map(|(_, value)| value)
}

/// Fail if `X-Spam-Status` is present and does not start with `No`.
/// A message without the header passes.
///
/// # Errors
///
/// Returns [`Error::Assertion`] carrying the full header value.
pub fn check_spam_status(raw_headers: &str) -> Result<()> {
    match spam_status(raw_headers) {
        Some(value) if !value.starts_with("No") => Err(Error::Assertion(format!(
            "Your mail is liable to end up in spam folder, since {SPAM_STATUS_HEADER} \
             contains the following: {value}"
        ))),
        _ => Ok(()),
    }
}
