//! `LineString` elevation transform
//!
//! For every `LineString` in document order:
//!
//! 1. with a line color, set `Placemark/Style/LineStyle/color` on the
//!    enclosing `Placemark` (creating the path as needed),
//! 2. shift each coordinate's altitude by the delta (adding one where absent),
//! 3. optionally force `extrude` to `0`,
//! 4. force `altitudeMode` to `absolute`.
//!
//! The input document is never modified; the transform works on a clone and
//! returns it, so a failure part-way leaves the caller with the original.
//!
//! ## Example
//!
//! ```
//! use kml_elevate::{transform_str, TransformOptions};
//!
//! let kml = "<kml><Placemark><LineString><coordinates>1,2,3 4,5</coordinates></LineString></Placemark></kml>";
//! let out = transform_str(kml, &TransformOptions::new(10.0))?;
//!
//! assert_eq!(out.line_string_count, 1);
//! assert!(out.kml.contains("<altitudeMode>absolute</altitudeMode>"));
//! assert!(out.kml.contains("\n1,2,13\n4,5,10\n"));
//! # Ok::<(), kml_elevate::ElevateError>(())
//! ```

use crate::color::LineColor;
use crate::coordinates::{format_number, shift_altitudes};
use crate::error::{ElevateError, Result};
use crate::xml::{Document, ElementId};
use log::debug;
use serde::{Deserialize, Serialize};

/// How the transform treats `<extrude>` on each `LineString`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtrudeMode {
    /// Force `extrude` to `0` only when a line color is applied
    #[default]
    #[serde(rename = "follow-color")]
    FollowLineColor,
    /// Always force `extrude` to `0`
    #[serde(rename = "always")]
    Always,
    /// Leave `extrude` alone
    #[serde(rename = "never")]
    Never,
}

/// Parameters of a transform run
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOptions {
    /// Meters added to every altitude (may be negative)
    pub elevation_delta: f64,
    /// Line color written into each enclosing `Placemark`'s style
    pub line_color: Option<LineColor>,
    /// `extrude` handling
    pub extrude: ExtrudeMode,
}

impl TransformOptions {
    /// Options that only shift altitudes
    #[inline]
    #[must_use]
    pub const fn new(elevation_delta: f64) -> Self {
        Self {
            elevation_delta,
            line_color: None,
            extrude: ExtrudeMode::FollowLineColor,
        }
    }

    /// Also set the line color
    #[inline]
    #[must_use]
    pub fn with_line_color(mut self, color: LineColor) -> Self {
        self.line_color = Some(color);
        self
    }

    /// Override `extrude` handling
    #[inline]
    #[must_use]
    pub fn with_extrude(mut self, extrude: ExtrudeMode) -> Self {
        self.extrude = extrude;
        self
    }

    /// Whether `extrude` is forced to `0` under these options
    #[must_use]
    pub const fn clears_extrude(&self) -> bool {
        match self.extrude {
            ExtrudeMode::FollowLineColor => self.line_color.is_some(),
            ExtrudeMode::Always => true,
            ExtrudeMode::Never => false,
        }
    }
}

/// A transformed document tree
#[derive(Debug, Clone)]
pub struct Transformed {
    /// The modified copy
    pub document: Document,
    /// Number of `LineString` elements processed
    pub line_string_count: usize,
}

/// A transformed document, serialized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedKml {
    /// KML text
    pub kml: String,
    /// Number of `LineString` elements processed
    pub line_string_count: usize,
}

/// Apply the elevation transform to a copy of `document`
///
/// # Errors
///
/// Returns [`ElevateError::NotANumber`] if the delta is not finite or an
/// altitude is not numeric. `document` is left unchanged either way.
pub fn transform(document: &Document, options: &TransformOptions) -> Result<Transformed> {
    let delta = options.elevation_delta;
    if !delta.is_finite() {
        return Err(ElevateError::NotANumber(format!(
            "elevation delta {delta} is not a finite number"
        )));
    }

    let mut document = document.clone();
    let line_strings = document.elements_named("LineString");
    let clear_extrude = options.clears_extrude();

    for (i, &line_string) in line_strings.iter().enumerate() {
        if let Some(color) = &options.line_color {
            apply_line_color(&mut document, line_string, color);
        }

        if let Some(coordinates) = document.first_descendant(line_string, "coordinates") {
            let text = document.text(coordinates)?;
            let shifted = shift_altitudes(&text, delta).map_err(|e| e.in_line_string(i + 1))?;
            debug!(
                "LineString #{}: shifted {} coordinate(s) by {}",
                i + 1,
                text.split_whitespace().count(),
                format_number(delta)
            );
            document.set_text(coordinates, &shifted);
        } else {
            debug!("LineString #{}: no coordinates", i + 1);
        }

        if clear_extrude {
            set_child_text(&mut document, line_string, "extrude", "0");
        }
        set_child_text(&mut document, line_string, "altitudeMode", "absolute");
    }

    Ok(Transformed {
        document,
        line_string_count: line_strings.len(),
    })
}

/// Parse, transform and serialize KML text
///
/// # Errors
///
/// Returns [`ElevateError::InvalidFormat`] if `kml` is not well-formed XML,
/// otherwise any error from [`transform`].
pub fn transform_str(kml: &str, options: &TransformOptions) -> Result<TransformedKml> {
    let document = Document::parse(kml)?;
    let transformed = transform(&document, options)?;
    Ok(TransformedKml {
        kml: transformed.document.to_xml_string()?,
        line_string_count: transformed.line_string_count,
    })
}

/// Set `Placemark/Style/LineStyle/color` on the `Placemark` enclosing
/// `line_string`; a `LineString` outside any `Placemark` gets no style.
fn apply_line_color(document: &mut Document, line_string: ElementId, color: &LineColor) {
    let Some(placemark) = document.ancestor(line_string, "Placemark") else {
        return;
    };

    let style = document
        .first_descendant(placemark, "Style")
        .unwrap_or_else(|| {
            let style = document.create_element(placemark, "Style");
            document.insert_child(placemark, 0, style);
            style
        });
    let line_style = find_or_append(document, style, "LineStyle");
    let color_element = find_or_append(document, line_style, "color");
    document.set_text(color_element, &color.to_kml());
}

fn find_or_append(document: &mut Document, parent: ElementId, local_name: &str) -> ElementId {
    document
        .first_descendant(parent, local_name)
        .unwrap_or_else(|| {
            let child = document.create_element(parent, local_name);
            document.append_child(parent, child);
            child
        })
}

/// Set the text of `line_string`'s `local_name` element, creating it right
/// before `coordinates` (or at the end) when missing.
fn set_child_text(document: &mut Document, line_string: ElementId, local_name: &str, text: &str) {
    let element = match document.first_descendant(line_string, local_name) {
        Some(existing) => existing,
        None => {
            let created = document.create_element(line_string, local_name);
            let before = document
                .first_descendant(line_string, "coordinates")
                .and_then(|coords| document.child_position(line_string, coords));
            match before {
                Some(index) => document.insert_child(line_string, index, created),
                None => document.append_child(line_string, created),
            }
            created
        }
    };
    document.set_text(element, text);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(kml: &str, options: &TransformOptions) -> TransformedKml {
        transform_str(kml, options).unwrap()
    }

    #[test]
    fn test_counts_every_line_string() {
        let kml = "<kml><Document>\
            <Placemark><LineString><coordinates>1,2</coordinates></LineString></Placemark>\
            <Folder><Placemark><MultiGeometry>\
              <LineString><coordinates>1,2</coordinates></LineString>\
              <LineString/>\
            </MultiGeometry></Placemark></Folder>\
            <LineString><coordinates>3,4</coordinates></LineString>\
            </Document></kml>";
        assert_eq!(run(kml, &TransformOptions::new(1.0)).line_string_count, 4);
    }

    #[test]
    fn test_no_line_strings_leaves_document_unchanged() {
        let kml = "<?xml version=\"1.0\"?>\n<kml><Placemark><Point><coordinates>1,2,3</coordinates></Point></Placemark></kml>\n";
        let out = run(kml, &TransformOptions::new(50.0));
        assert_eq!(out.line_string_count, 0);
        assert_eq!(out.kml, kml);
    }

    #[test]
    fn test_altitude_mode_inserted_before_coordinates() {
        let kml = "<kml><LineString>\n  <coordinates>1,2,3</coordinates>\n</LineString></kml>";
        let out = run(kml, &TransformOptions::new(2.0));
        assert_eq!(
            out.kml,
            "<kml><LineString>\n  <altitudeMode>absolute</altitudeMode><coordinates>\n1,2,5\n</coordinates>\n</LineString></kml>"
        );
    }

    #[test]
    fn test_existing_altitude_mode_is_overwritten() {
        let kml = "<kml><LineString><altitudeMode>clampToGround</altitudeMode><coordinates>1,2</coordinates></LineString></kml>";
        let out = run(kml, &TransformOptions::new(0.5));
        assert_eq!(
            out.kml,
            "<kml><LineString><altitudeMode>absolute</altitudeMode><coordinates>\n1,2,0.5\n</coordinates></LineString></kml>"
        );
    }

    #[test]
    fn test_line_string_without_coordinates_gets_appended_fields() {
        let kml = "<kml><LineString/></kml>";
        let options = TransformOptions::new(1.0).with_extrude(ExtrudeMode::Always);
        let out = run(kml, &options);
        assert_eq!(
            out.kml,
            "<kml><LineString><extrude>0</extrude><altitudeMode>absolute</altitudeMode></LineString></kml>"
        );
        assert_eq!(out.line_string_count, 1);
    }

    #[test]
    fn test_color_variant_styles_placemark_and_clears_extrude() {
        let kml = "<kml><Placemark><name>A</name><LineString><extrude>1</extrude><coordinates>1,2,3</coordinates></LineString></Placemark></kml>";
        let color = "#FF8800".parse().unwrap();
        let out = run(kml, &TransformOptions::new(1.0).with_line_color(color));
        assert_eq!(
            out.kml,
            "<kml><Placemark><Style><LineStyle><color>ff0088ff</color></LineStyle></Style>\
             <name>A</name><LineString><extrude>0</extrude><altitudeMode>absolute</altitudeMode>\
             <coordinates>\n1,2,4\n</coordinates></LineString></Placemark></kml>"
        );
    }

    #[test]
    fn test_created_extrude_goes_before_coordinates() {
        let kml = "<kml><Placemark><LineString>\n<coordinates>1,2</coordinates></LineString></Placemark></kml>";
        let color = "#0000ff".parse().unwrap();
        let out = run(kml, &TransformOptions::new(5.0).with_line_color(color));
        assert_eq!(
            out.kml,
            "<kml><Placemark><Style><LineStyle><color>ffff0000</color></LineStyle></Style>\
             <LineString>\n<extrude>0</extrude><altitudeMode>absolute</altitudeMode>\
             <coordinates>\n1,2,5\n</coordinates></LineString></Placemark></kml>"
        );

        let kml = "<kml><LineString><tessellate>1</tessellate><coordinates>1,2,3</coordinates></LineString></kml>";
        let out = run(kml, &TransformOptions::new(1.0).with_extrude(ExtrudeMode::Always));
        assert_eq!(
            out.kml,
            "<kml><LineString><tessellate>1</tessellate><extrude>0</extrude>\
             <altitudeMode>absolute</altitudeMode><coordinates>\n1,2,4\n</coordinates></LineString></kml>"
        );
    }

    #[test]
    fn test_existing_style_is_reused() {
        let kml = "<kml><Placemark><Style id=\"s\"><IconStyle/><LineStyle><width>3</width><color>ffffffff</color></LineStyle></Style>\
                   <LineString><coordinates>1,2,3</coordinates></LineString></Placemark></kml>";
        let color = "336699".parse().unwrap();
        let out = run(kml, &TransformOptions::new(0.0).with_line_color(color));
        assert!(out.kml.contains(
            "<Style id=\"s\"><IconStyle/><LineStyle><width>3</width><color>ff996633</color></LineStyle></Style>"
        ));
        assert_eq!(out.kml.matches("<Style").count(), 1);
    }

    #[test]
    fn test_style_without_line_style_gets_one_appended() {
        let kml = "<kml><Placemark><Style><PolyStyle/></Style><LineString><coordinates>1,2</coordinates></LineString></Placemark></kml>";
        let color = "#010203".parse().unwrap();
        let out = run(kml, &TransformOptions::new(0.0).with_line_color(color));
        assert!(out
            .kml
            .contains("<Style><PolyStyle/><LineStyle><color>ff030201</color></LineStyle></Style>"));
    }

    #[test]
    fn test_color_without_placemark_is_skipped() {
        let kml = "<kml><LineString><coordinates>1,2</coordinates></LineString></kml>";
        let color = "#FF0000".parse().unwrap();
        let out = run(kml, &TransformOptions::new(0.0).with_line_color(color));
        assert!(!out.kml.contains("Style"));
        assert!(out.kml.contains("<extrude>0</extrude>"));
    }

    #[test]
    fn test_extrude_left_alone_without_color() {
        let kml = "<kml><LineString><extrude>1</extrude><coordinates>1,2</coordinates></LineString></kml>";
        let out = run(kml, &TransformOptions::new(0.0));
        assert!(out.kml.contains("<extrude>1</extrude>"));
    }

    #[test]
    fn test_extrude_never_with_color() {
        let kml = "<kml><Placemark><LineString><coordinates>1,2</coordinates></LineString></Placemark></kml>";
        let options = TransformOptions::new(0.0)
            .with_line_color("#00ff00".parse().unwrap())
            .with_extrude(ExtrudeMode::Never);
        let out = run(kml, &options);
        assert!(!out.kml.contains("extrude"));
        assert!(out.kml.contains("<color>ff00ff00</color>"));
    }

    #[test]
    fn test_clears_extrude_table() {
        let color = LineColor::new(1, 2, 3);
        assert!(!TransformOptions::new(0.0).clears_extrude());
        assert!(TransformOptions::new(0.0).with_line_color(color).clears_extrude());
        assert!(TransformOptions::new(0.0)
            .with_extrude(ExtrudeMode::Always)
            .clears_extrude());
        assert!(!TransformOptions::new(0.0)
            .with_line_color(color)
            .with_extrude(ExtrudeMode::Never)
            .clears_extrude());
    }

    #[test]
    fn test_namespaced_kml() {
        let kml = "<kml:kml xmlns:kml=\"http://www.opengis.net/kml/2.2\"><kml:LineString><kml:coordinates>1,2,3</kml:coordinates></kml:LineString></kml:kml>";
        let out = run(kml, &TransformOptions::new(1.0));
        assert!(out.kml.contains("<kml:altitudeMode>absolute</kml:altitudeMode>"));
        assert!(out.kml.contains("<kml:coordinates>\n1,2,4\n</kml:coordinates>"));
    }

    #[test]
    fn test_untouched_markup_round_trips() {
        let kml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
                   <kml xmlns=\"http://www.opengis.net/kml/2.2\">\n\
                   <!-- keep me -->\n\
                   <Document><name>Ridge &amp; Valley</name>\n\
                   <Placemark id=\"p1\"><LineString><altitudeMode>absolute</altitudeMode><coordinates>\n1,2,3\n</coordinates></LineString></Placemark>\n\
                   </Document>\n</kml>\n";
        let out = run(kml, &TransformOptions::new(0.0));
        assert_eq!(out.kml, kml);
    }

    #[test]
    fn test_non_numeric_altitude_names_line_string() {
        let kml = "<kml><LineString><coordinates>1,2,3</coordinates></LineString>\
                   <LineString><coordinates>1,2,3 4,5,x</coordinates></LineString></kml>";
        let err = transform_str(kml, &TransformOptions::new(1.0)).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, ElevateError::NotANumber(_)));
        assert!(msg.contains("LineString #2"), "{msg}");
        assert!(msg.contains("tuple 2"), "{msg}");
    }

    #[test]
    fn test_non_finite_delta_is_rejected() {
        let document = Document::parse("<kml/>").unwrap();
        for delta in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = transform(&document, &TransformOptions::new(delta)).unwrap_err();
            assert!(matches!(err, ElevateError::NotANumber(_)));
        }
    }

    #[test]
    fn test_failed_transform_leaves_input_untouched() {
        let kml = "<kml><LineString><coordinates>1,2,3</coordinates></LineString>\
                   <LineString><coordinates>1,2,bad</coordinates></LineString></kml>";
        let document = Document::parse(kml).unwrap();
        assert!(transform(&document, &TransformOptions::new(5.0)).is_err());
        assert_eq!(document.to_xml_string().unwrap(), kml);
    }

    #[test]
    fn test_malformed_input_is_invalid_format() {
        let err = transform_str("<kml><LineString", &TransformOptions::new(1.0)).unwrap_err();
        assert!(matches!(err, ElevateError::InvalidFormat(_)));
    }
}
