//! # kml-elevate
//!
//! Shift the altitude of every `LineString` coordinate in a KML (or KMZ)
//! document by a fixed number of meters.
//!
//! For each `LineString` the transform:
//!
//! - adds the delta to each `lon,lat,alt` tuple, and gives `lon,lat` tuples
//!   an altitude equal to the delta,
//! - sets `altitudeMode` to `absolute`,
//! - optionally writes a line color into the enclosing `Placemark`'s
//!   `Style/LineStyle/color` and forces `extrude` to `0`.
//!
//! Markup the transform does not touch is written back as it was read.
//!
//! ## Quick Start
//!
//! ### Transform KML Text
//!
//! ```
//! use kml_elevate::{transform_str, LineColor, TransformOptions};
//!
//! let kml = r#"<kml xmlns="http://www.opengis.net/kml/2.2">
//!   <Placemark>
//!     <LineString><coordinates>-122.08,37.42,50 -122.09,37.43</coordinates></LineString>
//!   </Placemark>
//! </kml>"#;
//!
//! let color: LineColor = "#FF8800".parse()?;
//! let options = TransformOptions::new(100.0).with_line_color(color);
//! let out = transform_str(kml, &options)?;
//!
//! assert_eq!(out.line_string_count, 1);
//! assert!(out.kml.contains("-122.08,37.42,150"));
//! assert!(out.kml.contains("-122.09,37.43,100"));
//! assert!(out.kml.contains("<color>ff0088ff</color>"));
//! # Ok::<(), kml_elevate::ElevateError>(())
//! ```
//!
//! ### Transform a File
//!
//! ```no_run
//! use kml_elevate::{elevated_file_name, transform_file, TransformOptions};
//!
//! let report = transform_file(
//!     "route.kml",
//!     elevated_file_name("route.kml"),
//!     &TransformOptions::new(-12.5),
//! )?;
//! println!("{} LineString(s) written to {}", report.line_string_count, report.output.display());
//! # Ok::<(), kml_elevate::ElevateError>(())
//! ```
//!
//! ## Options
//!
//! | Field | Type | Description |
//! |-------|------|-------------|
//! | `elevation_delta` | `f64` | Meters added to every altitude |
//! | `line_color` | `Option<LineColor>` | Style color for enclosing placemarks |
//! | `extrude` | `ExtrudeMode` | `FollowLineColor` (default), `Always`, `Never` |
//!
//! ## Formats
//!
//! | Format | Extension | Media type |
//! |--------|-----------|------------|
//! | KML | `.kml` | `application/vnd.google-earth.kml+xml` |
//! | KMZ | `.kmz` | `application/vnd.google-earth.kmz` |
//!
//! ## Error Handling
//!
//! ```no_run
//! use kml_elevate::{transform_file, ElevateError, TransformOptions};
//!
//! match transform_file("in.kml", "out.kml", &TransformOptions::new(10.0)) {
//!     Ok(report) => println!("Processed {} LineString(s)", report.line_string_count),
//!     Err(ElevateError::InvalidFormat(e)) => println!("Not valid KML: {e}"),
//!     Err(ElevateError::NotANumber(e)) => println!("Bad altitude: {e}"),
//!     Err(e) => println!("Error: {e}"),
//! }
//! ```

pub mod color;
pub mod coordinates;
pub mod error;
pub mod file;
pub mod kmz;
pub mod session;
pub mod transform;
pub mod xml;

pub use color::{hex_to_kml_color, LineColor};
pub use coordinates::{shift_altitudes, Coordinate, CoordinateTuple};
pub use error::{ElevateError, Result};
pub use file::{
    elevated_file_name, file_name_with_suffix, media_type_for, transform_bytes, transform_file,
    FileKind, TransformReport, ELEVATED_SUFFIX, KML_MEDIA_TYPE, KMZ_MEDIA_TYPE,
};
pub use kmz::{transform_kmz, TransformedKmz};
pub use session::{Download, ProcessSummary, Session};
pub use transform::{
    transform, transform_str, ExtrudeMode, TransformOptions, Transformed, TransformedKml,
};
pub use xml::{Document, ElementId};
