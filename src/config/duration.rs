//! Duration parsing utilities.
//!
//! Parses human-readable duration strings like "100ms", "2s" or "1m", and
//! provides the serde adapter used by [`SupervisorConfig`](super::SupervisorConfig).

use std::time::Duration;

/// Parse a duration string like "100ms", "2s", "1m".
///
/// Supported formats:
/// - `"Nms"` - N milliseconds (e.g., "100ms")
/// - `"Ns"` - N seconds (e.g., "2s")
/// - `"Nm"` - N minutes (e.g., "1m")
/// - `"N"` - N seconds (no suffix, assumes seconds)
///
/// Returns `None` if the string cannot be parsed.
///
/// # Examples
///
/// ```
/// use gell_supervisor::config::parse_duration_string;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration_string("100ms"), Some(Duration::from_millis(100)));
/// assert_eq!(parse_duration_string("2s"), Some(Duration::from_secs(2)));
/// assert_eq!(parse_duration_string("1m"), Some(Duration::from_secs(60)));
/// ```
pub fn parse_duration_string(s: &str) -> Option<Duration> {
    let s = s.trim();

    if s.is_empty() {
        return None;
    }

    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

/// Render a duration in the shortest form `parse_duration_string` accepts.
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis % 60_000 == 0 && millis > 0 {
        format!("{}m", millis / 60_000)
    } else if millis % 1000 == 0 && millis > 0 {
        format!("{}s", millis / 1000)
    } else {
        format!("{}ms", millis)
    }
}

/// `#[serde(with = "humantime_str")]` adapter: durations as "100ms"-style strings.
pub(crate) mod humantime_str {
    use super::{format_duration, parse_duration_string};
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Seconds(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
            Raw::Text(text) => parse_duration_string(&text).ok_or_else(|| {
                de::Error::custom(format!(
                    "invalid duration '{}' (expected e.g. \"100ms\", \"2s\", \"1m\")",
                    text
                ))
            }),
        }
    }
}
