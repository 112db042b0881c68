//! Immutable set of zones from one source fetch.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use geowatch_spatial::ZoneIndex;
use geowatch_zone_models::Zone;

/// All zones loaded by one successful fetch, plus a spatial index over
/// their geometries.
///
/// A snapshot never changes after construction; reloading builds a new one.
pub struct Snapshot {
    zones: Vec<Arc<Zone>>,
    index: ZoneIndex,
    source: String,
    loaded_at: DateTime<Utc>,
}

impl Snapshot {
    /// Builds a snapshot and its spatial index.
    #[must_use]
    pub fn new(zones: Vec<Zone>, source: &str, loaded_at: DateTime<Utc>) -> Self {
        let zones: Vec<Arc<Zone>> = zones.into_iter().map(Arc::new).collect();
        let index = ZoneIndex::build(zones.iter().map(|zone| &zone.geometry));

        Self {
            zones,
            index,
            source: source.to_owned(),
            loaded_at,
        }
    }

    /// Builds a snapshot that did not come from a fetch.
    #[must_use]
    pub fn from_zones(zones: Vec<Zone>) -> Self {
        Self::new(zones, "<memory>", Utc::now())
    }

    /// The zones, in source order.
    #[must_use]
    pub fn zones(&self) -> &[Arc<Zone>] {
        &self.zones
    }

    /// Number of zones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Returns `true` if the snapshot holds no zones.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Where the zones were loaded from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// When the zones were loaded.
    #[must_use]
    pub const fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Positions (into [`Self::zones`]) of every zone whose geometry
    /// contains the point, boundary inclusive.
    #[must_use]
    pub fn containing(&self, lng: f64, lat: f64) -> BTreeSet<usize> {
        self.index
            .containing(lng, lat, |position| &self.zones[position].geometry)
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("source", &self.source)
            .field("loaded_at", &self.loaded_at)
            .field("zones", &self.zones.len())
            .finish_non_exhaustive()
    }
}
