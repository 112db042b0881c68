#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geofence zone store.
//!
//! Fetches the zone table (CSV with an embedded `GeoJSON` geometry column)
//! from a URL or file, parses it with a strict schema into an immutable
//! [`Snapshot`], and keeps the latest good snapshot in a [`ZoneStore`] that
//! can be reloaded at any time without readers ever seeing a partial set.

pub mod fetch;
pub mod retry;
pub mod schema;
pub mod snapshot;
pub mod store;

#[cfg(test)]
mod test_server;

use std::time::Duration;

use chrono::Utc;

pub use snapshot::Snapshot;
pub use store::{ZoneStore, ZoneStoreConfig};

/// Errors that can occur while loading or reading zones.
#[derive(Debug, thiserror::Error)]
pub enum ZoneError {
    /// The source could not be fetched (network, file, timeout).
    #[error("Zone source {url} unavailable: {message}")]
    SourceUnavailable {
        /// Source location that failed.
        url: String,
        /// Description of what went wrong.
        message: String,
    },

    /// A row of the source could not be parsed into a zone.
    #[error("Malformed zone at row {row}, column '{column}': {message}")]
    MalformedZone {
        /// 1-based data row number; `0` refers to the header row.
        row: usize,
        /// Column whose value was rejected.
        column: String,
        /// Description of what went wrong.
        message: String,
    },

    /// No load has ever succeeded.
    #[error("No zone snapshot has been loaded")]
    NotLoaded,
}

/// How a single load reaches its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Upper bound on one fetch attempt. A load may take up to
    /// `max_retries + 1` attempts plus backoff.
    pub timeout: Duration,
    /// Retries for transient HTTP failures. File sources are never retried.
    pub max_retries: u32,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

/// Fetches `source_url` and parses it into a new [`Snapshot`].
///
/// Either every row parses or the whole load fails; no partial snapshot is
/// ever produced. Safe to retry.
///
/// # Errors
///
/// Returns [`ZoneError::SourceUnavailable`] if the source cannot be read and
/// [`ZoneError::MalformedZone`] if any row is invalid.
pub async fn load(source_url: &str, options: &LoadOptions) -> Result<Snapshot, ZoneError> {
    let body = fetch::fetch_source(source_url, options).await?;
    let zones = schema::parse_zones(body.as_bytes())?;

    log::info!("Loaded {} zones from {source_url}", zones.len());

    Ok(Snapshot::new(zones, source_url, Utc::now()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_reads_file_source() {
        let path = std::env::temp_dir().join("geowatch_zone_load_file.csv");
        std::fs::write(
            &path,
            "id,status,schedule_start,schedule_stop,description,geometry,timezone\n\
             home,on,,,Home,\"{\"\"type\"\":\"\"Polygon\"\",\"\"coordinates\"\":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}\",UTC\n",
        )
        .unwrap();

        let snapshot = load(path.to_str().unwrap(), &LoadOptions::default())
            .await
            .unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.zones()[0].id, "home");
        assert_eq!(snapshot.source(), path.to_str().unwrap());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn load_reports_missing_file_as_unavailable() {
        let path = std::env::temp_dir().join("geowatch_zone_load_missing.csv");
        let _ = std::fs::remove_file(&path);

        let err = load(path.to_str().unwrap(), &LoadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ZoneError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn load_rejects_whole_source_on_one_bad_row() {
        let path = std::env::temp_dir().join("geowatch_zone_load_bad_row.csv");
        std::fs::write(
            &path,
            "id,status,schedule_start,schedule_stop,description,geometry,timezone\n\
             home,on,,,Home,\"{\"\"type\"\":\"\"Polygon\"\",\"\"coordinates\"\":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}\",UTC\n\
             school,schedule,25:00,,School,\"{\"\"type\"\":\"\"Polygon\"\",\"\"coordinates\"\":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}\",UTC\n",
        )
        .unwrap();

        let err = load(path.to_str().unwrap(), &LoadOptions::default())
            .await
            .unwrap_err();
        match err {
            ZoneError::MalformedZone { row, column, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, "schedule_start");
            }
            other => panic!("unexpected error: {other}"),
        }

        let _ = std::fs::remove_file(&path);
    }
}
