#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Location reports for the tracked device.
//!
//! Reports are fetched and decrypted by an external tool, which writes them
//! as a JSON array. This crate reads that dump and picks the most recent
//! position as a geofence [`Sample`].

use std::path::Path;

use chrono::{DateTime, Utc};
use geowatch_zone_models::Sample;
use serde::{Deserialize, Serialize};

/// Errors that can occur while reading reports.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One decrypted location report. Unknown fields (key material and the
/// like) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LocationReport {
    /// When the device observed its position.
    pub time: DateTime<Utc>,
    /// Latitude (WGS84).
    pub lat: f64,
    /// Longitude (WGS84).
    pub lon: f64,
    /// When the report was published to the network.
    pub published_at: Option<DateTime<Utc>>,
    /// Free-form description from the network.
    pub description: Option<String>,
    /// Network-reported confidence.
    pub confidence: Option<u8>,
    /// Network-reported status byte.
    pub status: Option<u32>,
}

impl LocationReport {
    /// The report's position and observation time as a [`Sample`].
    #[must_use]
    pub const fn sample(&self) -> Sample {
        Sample::new(self.lat, self.lon, self.time)
    }
}

/// Parses a JSON array of reports.
///
/// # Errors
///
/// Returns [`ReportError::Json`] if the text is not a valid report array.
pub fn parse_reports(json: &str) -> Result<Vec<LocationReport>, ReportError> {
    Ok(serde_json::from_str(json)?)
}

/// Reads a JSON report dump from disk.
///
/// # Errors
///
/// Returns [`ReportError`] if the file cannot be read or parsed.
pub async fn load_reports(path: &Path) -> Result<Vec<LocationReport>, ReportError> {
    let text = tokio::fs::read_to_string(path).await?;
    let reports = parse_reports(&text)?;
    log::info!("Read {} location reports from {}", reports.len(), path.display());
    Ok(reports)
}

/// The most recently observed report, as a sample. `None` if there are no
/// reports.
#[must_use]
pub fn latest_sample(reports: &[LocationReport]) -> Option<Sample> {
    reports
        .iter()
        .max_by_key(|report| report.time)
        .map(LocationReport::sample)
}
