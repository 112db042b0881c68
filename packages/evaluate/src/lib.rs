#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geofence violation evaluation.
//!
//! A zone is violated by a sample when the sample lies outside the zone's
//! geometry (its boundary counts as inside) *and* the zone is active at the
//! sample's timestamp according to [`activation::is_active`].
//! Evaluation is a pure function of the snapshot and the sample.

pub mod activation;

use geowatch_zone::Snapshot;
use geowatch_zone_models::{Sample, Violation};

/// Returns every zone in `snapshot` that `sample` violates.
///
/// The result is in snapshot order; use [`sort_by_zone_id`] for a canonical
/// order.
#[must_use]
pub fn evaluate(snapshot: &Snapshot, sample: &Sample) -> Vec<Violation> {
    let contained = snapshot.containing(sample.longitude, sample.latitude);

    let violations: Vec<Violation> = snapshot
        .zones()
        .iter()
        .enumerate()
        .filter(|(position, zone)| {
            !contained.contains(position) && activation::is_active(zone, sample.timestamp)
        })
        .map(|(_, zone)| Violation::new(sample, zone.clone()))
        .collect();

    log::debug!(
        "Sample at {} violates {}/{} zones ({} containing)",
        sample.timestamp,
        violations.len(),
        snapshot.len(),
        contained.len()
    );

    violations
}

/// Sorts violations by zone id.
pub fn sort_by_zone_id(violations: &mut [Violation]) {
    violations.sort_by(|a, b| a.zone.id.cmp(&b.zone.id));
}
