//! Creation and initialization timestamp parsing.
//!
//! Both kinds are wall-clock values without an offset and are read as UTC.
//! Initialization markers come from the first log line of a pod in one of two
//! shapes:
//!
//! - raw: the line is exactly `YYYY-MM-DDThh:mm:ss`
//! - quoted: the timestamp is double-quoted inside a log prefix, for example
//!   `time="2024-01-01T00:00:10" level=info msg=started` (a trailing `Z` inside
//!   the quotes is accepted)

use std::sync::LazyLock;

use jiff::Timestamp;
use jiff::civil::DateTime;
use jiff::tz::TimeZone;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use regex::Regex;

use crate::trial::error::{Error, Result};

/// Format of `metadata.creationTimestamp`.
pub const CREATION_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Format of a raw initialization marker.
pub const INIT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

static QUOTED_TIMESTAMP_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#""(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2})Z?""#).ok()
});

fn parse_utc(value: &str, format: &str) -> Result<Timestamp> {
    let civil = DateTime::strptime(format, value)
        .map_err(|e| Error::Timestamp(format!("'{value}' does not match {format}: {e}")))?;
    civil
        .to_zoned(TimeZone::UTC)
        .map(|zoned| zoned.timestamp())
        .map_err(|e| Error::Timestamp(format!("'{value}': {e}")))
}

/// Parse a resource creation timestamp (`YYYY-MM-DDThh:mm:ssZ`).
pub fn parse_creation_timestamp(value: &str) -> Result<Timestamp> {
    parse_utc(value.trim(), CREATION_TIMESTAMP_FORMAT)
}

/// Render a timestamp the way the API server reports creation times.
pub fn format_creation_timestamp(timestamp: Timestamp) -> String {
    timestamp.strftime(CREATION_TIMESTAMP_FORMAT).to_string()
}

/// Convert an API server `Time` to a [`Timestamp`] at second resolution.
pub fn timestamp_from_api_time(time: &Time) -> Result<Timestamp> {
    let seconds = time.0.timestamp();
    Timestamp::from_second(seconds)
        .map_err(|e| Error::Timestamp(format!("creation time {seconds}s out of range: {e}")))
}

/// `metadata.creationTimestamp` rendered as the API server reports it.
pub fn creation_timestamp_text(time: &Time) -> Result<String> {
    timestamp_from_api_time(time).map(format_creation_timestamp)
}

/// Parse the initialization marker from a pod's first log line.
pub fn parse_init_timestamp(line: &str) -> Result<Timestamp> {
    let line = line.trim();
    if let Ok(timestamp) = parse_utc(line, INIT_TIMESTAMP_FORMAT) {
        return Ok(timestamp);
    }

    let quoted = QUOTED_TIMESTAMP_RE
        .as_ref()
        .and_then(|re| re.captures(line))
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| {
            Error::Timestamp(format!("no initialization timestamp in log line '{line}'"))
        })?;
    parse_utc(quoted.as_str(), INIT_TIMESTAMP_FORMAT)
}

/// Seconds from `created` to `initialized`; negative if the marker predates creation.
pub fn initialization_secs(created: Timestamp, initialized: Timestamp) -> f64 {
    initialized.duration_since(created).as_secs_f64()
}
