//! Channel name matching
//!
//! Decides whether a SetLevel pattern targets a channel. Supported forms:
//! exact name, `*`, `prefix*`, `*suffix` and `*substr*`.

use crate::constants::INTERNAL_CHANNEL;

/// Check if `pattern` targets the channel `name`
///
/// Exact matches ignore case. Wildcard forms compare case-sensitively and
/// never match the internal diagnostics channel.
pub fn matches(name: &str, pattern: &str) -> bool {
    if name.eq_ignore_ascii_case(pattern) {
        return true;
    }

    if name.eq_ignore_ascii_case(INTERNAL_CHANNEL) {
        return false;
    }

    if pattern == "*" {
        return true;
    }

    match (pattern.strip_prefix('*'), pattern.strip_suffix('*')) {
        // `*` at both ends; the lone `*` was handled above
        (Some(_), Some(_)) => name.contains(&pattern[1..pattern.len() - 1]),
        (Some(suffix), None) => name.ends_with(suffix),
        (None, Some(prefix)) => name.starts_with(prefix),
        (None, None) => false,
    }
}
