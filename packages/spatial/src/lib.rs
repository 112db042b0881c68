#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index for geofence containment.
//!
//! Builds an R-tree over zone bounding boxes once per snapshot and answers
//! "which zones contain this point" with a cheap envelope query followed by
//! an exact point-in-polygon test. Points on a polygon's boundary count as
//! contained.

use std::collections::BTreeSet;

use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{BoundingRect, Coord, MultiPolygon};
use geojson::GeoJson;
use rstar::{AABB, RTree, RTreeObject};

/// A zone's bounding box stored in the R-tree with its position in the
/// caller's zone list.
struct ZoneEnvelope {
    position: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for ZoneEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree over zone bounding boxes.
///
/// Positions returned by lookups refer to the order of the geometries the
/// index was built from.
pub struct ZoneIndex {
    tree: RTree<ZoneEnvelope>,
}

impl ZoneIndex {
    /// Builds the index from zone geometries in snapshot order.
    ///
    /// Geometries without any polygon have no envelope and are never
    /// reported as containing a point.
    #[must_use]
    pub fn build<'a>(geometries: impl IntoIterator<Item = &'a MultiPolygon<f64>>) -> Self {
        let entries: Vec<ZoneEnvelope> = geometries
            .into_iter()
            .enumerate()
            .filter_map(|(position, geometry)| {
                let Some(envelope) = compute_envelope(geometry) else {
                    log::warn!("Zone at position {position} has an empty geometry");
                    return None;
                };
                Some(ZoneEnvelope { position, envelope })
            })
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed zones.
    #[must_use]
    pub fn size(&self) -> usize {
        self.tree.size()
    }

    /// Returns the positions of every zone whose geometry contains the
    /// point, boundary inclusive.
    ///
    /// `geometry` maps a position back to the geometry the index was built
    /// from.
    #[must_use]
    pub fn containing<'a, F>(&self, lng: f64, lat: f64, geometry: F) -> BTreeSet<usize>
    where
        F: Fn(usize) -> &'a MultiPolygon<f64>,
    {
        let query_env = AABB::from_point([lng, lat]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| contains_point(geometry(entry.position), lng, lat))
            .map(|entry| entry.position)
            .collect()
    }
}

/// Returns `true` if the point lies inside the geometry or on its boundary.
#[must_use]
pub fn contains_point(geometry: &MultiPolygon<f64>, lng: f64, lat: f64) -> bool {
    geometry.coordinate_position(&Coord { x: lng, y: lat }) != CoordPos::Outside
}

/// Why a `GeoJSON` string could not be turned into a [`MultiPolygon`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    /// The text is not valid `GeoJSON`.
    #[error("invalid GeoJSON: {0}")]
    Invalid(String),
    /// The `GeoJSON` is a feature collection or a feature without geometry.
    #[error("GeoJSON has no geometry")]
    MissingGeometry,
    /// The geometry is not a `Polygon` or `MultiPolygon`.
    #[error("expected Polygon or MultiPolygon, found {0}")]
    UnsupportedType(String),
    /// The geometry contains no polygons.
    #[error("geometry contains no polygons")]
    Empty,
}

/// Parses a `GeoJSON` string into a [`MultiPolygon`].
///
/// Accepts a bare `Polygon` / `MultiPolygon` geometry, or a `Feature`
/// wrapping one.
///
/// # Errors
///
/// Returns [`GeometryError`] if the text is not `GeoJSON`, carries no
/// geometry, carries a non-areal geometry, or carries no polygons.
pub fn parse_geojson_to_multipolygon(geojson_str: &str) -> Result<MultiPolygon<f64>, GeometryError> {
    let geojson: GeoJson = geojson_str
        .parse()
        .map_err(|e: geojson::Error| GeometryError::Invalid(e.to_string()))?;

    let geom = match geojson {
        GeoJson::Geometry(geom) => geom,
        GeoJson::Feature(feature) => feature.geometry.ok_or(GeometryError::MissingGeometry)?,
        GeoJson::FeatureCollection(_) => return Err(GeometryError::MissingGeometry),
    };
    let kind = geometry_type_name(&geom.value);

    let geo_geom: geo::Geometry<f64> = geom
        .try_into()
        .map_err(|e: geojson::Error| GeometryError::Invalid(e.to_string()))?;

    let multi_polygon = match geo_geom {
        geo::Geometry::MultiPolygon(mp) => mp,
        geo::Geometry::Polygon(p) => MultiPolygon(vec![p]),
        _ => return Err(GeometryError::UnsupportedType(kind.to_string())),
    };

    if multi_polygon.0.is_empty() {
        return Err(GeometryError::Empty);
    }

    Ok(multi_polygon)
}

const fn geometry_type_name(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect().map(|rect| {
        AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
    })
}
