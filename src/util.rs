//! Internal utilities.

use std::borrow::Cow;
use std::time::Duration;

/// Normalizes a hostname or table key for comparison.
///
/// Trims surrounding whitespace, lowercases ASCII letters and drops a single
/// trailing root dot. Returns the input unchanged when already normalized.
#[must_use]
pub fn normalize_name(name: &str) -> Cow<'_, str> {
    let trimmed = name.trim();
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
    if trimmed.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(trimmed.to_ascii_lowercase())
    } else {
        Cow::Borrowed(trimmed)
    }
}

/// Converts a duration to whole TTL seconds, saturating at `u32::MAX`.
#[must_use]
pub fn ttl_secs(duration: Duration) -> u32 {
    u32::try_from(duration.as_secs()).unwrap_or(u32::MAX)
}
