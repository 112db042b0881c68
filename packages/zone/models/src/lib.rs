#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geofence zone, sample, and violation types.
//!
//! A [`Zone`] is a *safe* area: a tracked device located outside an active
//! zone produces a [`Violation`]. These types carry no behavior beyond their
//! invariants; loading lives in `geowatch_zone` and evaluation in
//! `geowatch_evaluate`.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Activation status of a zone.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ZoneStatus {
    /// Always active.
    On,
    /// Never active.
    Off,
    /// Active inside the zone's local time-of-day window.
    Schedule,
}

/// A geographic safe area with an activation policy.
///
/// Zones are immutable once loaded and only replaced wholesale when the
/// snapshot holding them is reloaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    /// Stable identifier, unique within a snapshot.
    pub id: String,
    /// Activation status.
    pub status: ZoneStatus,
    /// Local time-of-day at which a scheduled zone becomes active.
    pub schedule_start: Option<NaiveTime>,
    /// Local time-of-day at which a scheduled zone stops being active.
    /// May be earlier than `schedule_start` for windows that span midnight.
    pub schedule_stop: Option<NaiveTime>,
    /// Timezone the schedule bounds are expressed in.
    pub timezone: Tz,
    /// Safe area in (longitude, latitude) coordinates.
    pub geometry: MultiPolygon<f64>,
    /// Free-text label carried through to alerts.
    pub description: String,
    /// Source columns outside the zone schema, keyed by header name.
    pub extra: BTreeMap<String, String>,
}

/// One observed device position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Instant the position was recorded.
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    /// Creates a sample from a position and the instant it was recorded.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
        }
    }
}

/// Evidence that a [`Sample`] was outside an active [`Zone`].
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Latitude of the offending sample.
    pub latitude: f64,
    /// Longitude of the offending sample.
    pub longitude: f64,
    /// Instant of the offending sample.
    pub timestamp: DateTime<Utc>,
    /// The zone that was violated.
    pub zone: Arc<Zone>,
}

impl Violation {
    /// Builds a violation of `zone` by `sample`.
    #[must_use]
    pub const fn new(sample: &Sample, zone: Arc<Zone>) -> Self {
        Self {
            latitude: sample.latitude,
            longitude: sample.longitude,
            timestamp: sample.timestamp,
            zone,
        }
    }
}
