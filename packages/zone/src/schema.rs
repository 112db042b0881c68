//! Strict zone table schema.
//!
//! Maps the named columns of the zone CSV onto [`Zone`] fields. Missing or
//! duplicated required columns are rejected up front; every cell is
//! validated and the first bad one fails the whole table with its row and
//! column. Columns outside the schema are kept in [`Zone::extra`].

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use chrono_tz::Tz;
use geowatch_spatial::parse_geojson_to_multipolygon;
use geowatch_zone_models::{Zone, ZoneStatus};

use crate::ZoneError;

/// Column holding the zone identifier.
pub const ID: &str = "id";
/// Column holding the activation status.
pub const STATUS: &str = "status";
/// Column holding the local schedule start time.
pub const SCHEDULE_START: &str = "schedule_start";
/// Column holding the local schedule stop time.
pub const SCHEDULE_STOP: &str = "schedule_stop";
/// Column holding the free-text label.
pub const DESCRIPTION: &str = "description";
/// Column holding the `GeoJSON` geometry.
pub const GEOMETRY: &str = "geometry";
/// Column holding the IANA timezone name.
pub const TIMEZONE: &str = "timezone";

/// Every column a zone table must provide.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    ID,
    STATUS,
    SCHEDULE_START,
    SCHEDULE_STOP,
    DESCRIPTION,
    GEOMETRY,
    TIMEZONE,
];

/// Older zone sheets name the geometry column `geojson`.
const GEOMETRY_ALIAS: &str = "geojson";

/// Time-of-day formats accepted for schedule bounds.
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"];

/// Header positions of the schema columns.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnMap {
    required: BTreeMap<&'static str, usize>,
    extra: Vec<(usize, String)>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, ZoneError> {
        let mut required = BTreeMap::new();
        let mut extra = Vec::new();

        for (position, header) in headers.iter().enumerate() {
            let header = header.trim().trim_start_matches('\u{feff}');
            let canonical = if header == GEOMETRY_ALIAS {
                Some(GEOMETRY)
            } else {
                REQUIRED_COLUMNS.iter().copied().find(|c| *c == header)
            };

            match canonical {
                Some(column) => {
                    if required.insert(column, position).is_some() {
                        return Err(header_error(column, "column appears more than once"));
                    }
                }
                None => extra.push((position, header.to_owned())),
            }
        }

        if let Some(missing) = REQUIRED_COLUMNS
            .iter()
            .find(|column| !required.contains_key(*column))
        {
            return Err(header_error(missing, "required column is missing"));
        }

        Ok(Self { required, extra })
    }

    fn cell<'r>(&self, record: &'r csv::StringRecord, column: &'static str) -> &'r str {
        self.required
            .get(column)
            .and_then(|&position| record.get(position))
            .unwrap_or("")
            .trim()
    }
}

/// Parses a complete zone table.
///
/// # Errors
///
/// Returns [`ZoneError::MalformedZone`] for the first header problem or
/// invalid cell encountered.
pub fn parse_zones<R: Read>(reader: R) -> Result<Vec<Zone>, ZoneError> {
    let mut reader = csv::ReaderBuilder::new().flexible(false).from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| header_error("<header>", &e.to_string()))?
        .clone();
    let columns = ColumnMap::from_headers(&headers)?;

    let mut zones = Vec::new();
    let mut seen_ids = BTreeSet::new();

    for (index, result) in reader.records().enumerate() {
        let row = index + 1;
        let record = result.map_err(|e| ZoneError::MalformedZone {
            row,
            column: "<record>".to_owned(),
            message: e.to_string(),
        })?;

        let zone = parse_row(&columns, &record, row)?;
        if !seen_ids.insert(zone.id.clone()) {
            return Err(cell_error(
                row,
                ID,
                &format!("duplicate zone id '{}'", zone.id),
            ));
        }
        zones.push(zone);
    }

    log::debug!("Parsed {} zone rows", zones.len());

    Ok(zones)
}

fn parse_row(columns: &ColumnMap, record: &csv::StringRecord, row: usize) -> Result<Zone, ZoneError> {
    let id = columns.cell(record, ID);
    if id.is_empty() {
        return Err(cell_error(row, ID, "zone id is empty"));
    }

    let status = columns.cell(record, STATUS);
    let status = ZoneStatus::from_str(status)
        .map_err(|_| cell_error(row, STATUS, &format!("unknown status '{status}'")))?;

    let schedule_start = parse_time_of_day(columns.cell(record, SCHEDULE_START))
        .map_err(|message| cell_error(row, SCHEDULE_START, &message))?;
    let schedule_stop = parse_time_of_day(columns.cell(record, SCHEDULE_STOP))
        .map_err(|message| cell_error(row, SCHEDULE_STOP, &message))?;

    let timezone = columns.cell(record, TIMEZONE);
    let timezone = Tz::from_str(timezone)
        .map_err(|_| cell_error(row, TIMEZONE, &format!("unknown timezone '{timezone}'")))?;

    let geometry = parse_geojson_to_multipolygon(columns.cell(record, GEOMETRY))
        .map_err(|e| cell_error(row, GEOMETRY, &e.to_string()))?;

    let extra = columns
        .extra
        .iter()
        .map(|(position, header)| {
            (
                header.clone(),
                record.get(*position).unwrap_or("").to_owned(),
            )
        })
        .collect();

    Ok(Zone {
        id: id.to_owned(),
        status,
        schedule_start,
        schedule_stop,
        timezone,
        geometry,
        description: columns.cell(record, DESCRIPTION).to_owned(),
        extra,
    })
}

/// Parses an optional local time of day. An empty cell is `None`.
///
/// # Errors
///
/// Returns a description of the problem if the value is not a time between
/// `00:00:00` and `23:59:59`.
pub fn parse_time_of_day(value: &str) -> Result<Option<NaiveTime>, String> {
    if value.is_empty() {
        return Ok(None);
    }

    let time = TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(value, format).ok())
        .ok_or_else(|| format!("'{value}' is not a time of day (expected HH:MM:SS)"))?;

    // chrono encodes a leap second as nanosecond >= 1e9.
    if time.nanosecond() >= 1_000_000_000 {
        return Err(format!("'{value}' is outside 00:00:00-23:59:59"));
    }

    Ok(Some(time))
}

fn header_error(column: &str, message: &str) -> ZoneError {
    ZoneError::MalformedZone {
        row: 0,
        column: column.to_owned(),
        message: message.to_owned(),
    }
}

fn cell_error(row: usize, column: &str, message: &str) -> ZoneError {
    ZoneError::MalformedZone {
        row,
        column: column.to_owned(),
        message: message.to_owned(),
    }
}
