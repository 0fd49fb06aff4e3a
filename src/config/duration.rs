//! Human-readable durations: `500ms`, `5s`, `1m`, or a bare number of seconds.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Parse a duration string like `"200ms"`, `"5s"`, `"1m"` or `"30"`.
///
/// ```
/// use devloop::config::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("200ms").unwrap(), Duration::from_millis(200));
/// assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
/// ```
pub fn parse_duration(s: &str) -> Result<Duration> {
    let trimmed = s.trim();
    let invalid = || {
        Error::Parse(format!(
            "invalid duration '{}' (expected e.g. 500ms, 5s, 1m)",
            s
        ))
    };

    if trimmed.is_empty() {
        return Err(invalid());
    }

    let (digits, unit_ms) = if let Some(n) = trimmed.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = trimmed.strip_suffix('s') {
        (n, 1_000)
    } else if let Some(n) = trimmed.strip_suffix('m') {
        (n, 60_000)
    } else {
        (trimmed, 1_000)
    };

    let value: u64 = digits.trim().parse().map_err(|_| invalid())?;
    value
        .checked_mul(unit_ms)
        .map(Duration::from_millis)
        .ok_or_else(invalid)
}

/// Serde adapter for optional duration strings in `devloop.yaml`.
pub(crate) fn deserialize_opt<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| parse_duration(&s).map_err(serde::de::Error::custom))
        .transpose()
}
