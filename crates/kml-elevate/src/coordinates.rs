//! `<coordinates>` text handling
//!
//! KML coordinates are whitespace-separated tuples of `lon,lat[,alt]`.
//! Longitude and latitude are carried through as the original decimal text so
//! they are never reformatted; only the altitude is parsed.

use crate::error::{ElevateError, Result};

/// A single `lon,lat[,alt]` tuple
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateTuple {
    /// Longitude, as written in the source
    pub longitude: String,
    /// Latitude, as written in the source
    pub latitude: String,
    /// Altitude in meters (0 when the source had none)
    pub altitude: f64,
    /// Whether the source tuple carried an altitude field
    pub had_altitude: bool,
}

/// One whitespace-separated item of a coordinates string
#[derive(Debug, Clone, PartialEq)]
pub enum Coordinate {
    /// Two or more comma-separated fields
    Tuple(CoordinateTuple),
    /// A single field; written back untouched
    Verbatim(String),
}

impl Coordinate {
    /// Write as `lon,lat,alt`; fields past the altitude are not kept
    fn write_to(&self, out: &mut String) {
        match self {
            Self::Tuple(t) => {
                out.push_str(&t.longitude);
                out.push(',');
                out.push_str(&t.latitude);
                out.push(',');
                out.push_str(&format_number(t.altitude));
            }
            Self::Verbatim(raw) => out.push_str(raw),
        }
    }
}

/// Parse a coordinates string into ordered tuples
///
/// # Errors
///
/// Returns [`ElevateError::NotANumber`] when a third field is present but is
/// not a finite number.
pub fn parse_coordinates(text: &str) -> Result<Vec<Coordinate>> {
    text.split_whitespace()
        .enumerate()
        .map(|(i, item)| parse_item(item, i + 1))
        .collect()
}

fn parse_item(item: &str, position: usize) -> Result<Coordinate> {
    let mut fields = item.split(',');
    let (Some(longitude), Some(latitude)) = (fields.next(), fields.next()) else {
        return Ok(Coordinate::Verbatim(item.to_string()));
    };

    let (altitude, had_altitude) = match fields.next() {
        Some(raw) => (parse_altitude(raw, position)?, true),
        None => (0.0, false),
    };

    Ok(Coordinate::Tuple(CoordinateTuple {
        longitude: longitude.to_string(),
        latitude: latitude.to_string(),
        altitude,
        had_altitude,
    }))
}

fn parse_altitude(raw: &str, position: usize) -> Result<f64> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ElevateError::NotANumber(format!(
            "altitude {raw:?} in coordinate tuple {position} is not a number"
        ))),
    }
}

/// Shift every altitude in a coordinates string by `delta`
///
/// Tuples with an altitude get `alt + delta`; `lon,lat` tuples gain a third
/// field equal to `delta`. The result has one tuple per line with a leading
/// and trailing newline.
///
/// # Errors
///
/// Returns [`ElevateError::NotANumber`] for a non-numeric altitude or when
/// the shifted value is not finite.
pub fn shift_altitudes(text: &str, delta: f64) -> Result<String> {
    let mut coords = parse_coordinates(text)?;

    for (i, coord) in coords.iter_mut().enumerate() {
        if let Coordinate::Tuple(tuple) = coord {
            let shifted = tuple.altitude + delta;
            if !shifted.is_finite() {
                return Err(ElevateError::NotANumber(format!(
                    "altitude {} + {} in coordinate tuple {} overflows",
                    format_number(tuple.altitude),
                    format_number(delta),
                    i + 1
                )));
            }
            tuple.altitude = shifted;
        }
    }

    Ok(write_coordinates(&coords))
}

/// Serialize tuples one per line, with leading and trailing newline
#[must_use]
pub fn write_coordinates(coords: &[Coordinate]) -> String {
    let mut out = String::from("\n");
    for (i, coord) in coords.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        coord.write_to(&mut out);
    }
    out.push('\n');
    out
}

/// Shortest decimal form of a number: `110`, `12.5`, never `-0`
#[must_use]
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{value}")
}
