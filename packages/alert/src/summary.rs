//! Turns a batch of violations into one alert message.

use geowatch_zone_models::Violation;

/// Format of the local timestamp in alert messages.
pub const LOCAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors from [`summarize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SummarizeError {
    /// There was nothing to summarize.
    #[error("No violations to summarize")]
    EmptyInput,
}

/// The violation with the latest timestamp. Among ties any one may be
/// returned.
#[must_use]
pub fn latest(violations: &[Violation]) -> Option<&Violation> {
    violations.iter().max_by_key(|v| v.timestamp)
}

/// Renders an alert for the most recent violation in `violations`.
///
/// The timestamp is shown in the violated zone's own timezone, followed by
/// the raw `lat,lon` pair.
///
/// # Errors
///
/// Returns [`SummarizeError::EmptyInput`] if `violations` is empty.
pub fn summarize(violations: &[Violation]) -> Result<String, SummarizeError> {
    let violation = latest(violations).ok_or(SummarizeError::EmptyInput)?;
    let zone = &violation.zone;
    let local = violation
        .timestamp
        .with_timezone(&zone.timezone)
        .format(LOCAL_TIME_FORMAT);
    let label = if zone.description.is_empty() {
        &zone.id
    } else {
        &zone.description
    };

    Ok(format!(
        "At {local} ({}), last seen at {} outside \"{label}\"",
        zone.timezone,
        coordinates(violation.latitude, violation.longitude),
    ))
}

/// Plain `lat,lon` pair. SMS gateways commonly refuse messages containing
/// URLs, so no map link is attached.
fn coordinates(lat: f64, lon: f64) -> String {
    format!("{lat},{lon}")
}
