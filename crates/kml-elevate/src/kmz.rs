//! KMZ (zipped KML) support
//!
//! A KMZ is a ZIP archive whose root KML document (`doc.kml` by convention)
//! sits next to icons, images and models. Only the root KML entry is
//! transformed; every other entry is copied across in its original order.

use crate::error::{ElevateError, Result};
use crate::transform::{transform_str, TransformOptions};
use log::{debug, warn};
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// A transformed KMZ archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedKmz {
    /// The new archive
    pub contents: Vec<u8>,
    /// Path of the KML entry that was transformed
    pub kml_entry: String,
    /// Number of `LineString` elements processed
    pub line_string_count: usize,
}

/// Transform the root KML document inside a KMZ archive
///
/// # Errors
///
/// Returns [`ElevateError::Archive`] if the archive cannot be read or written,
/// [`ElevateError::InvalidFormat`] if it holds no KML entry or the entry is
/// not UTF-8 XML, and any error from the KML transform itself.
pub fn transform_kmz(bytes: &[u8], options: &TransformOptions) -> Result<TransformedKmz> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let kml_index = find_root_kml(&mut archive)?;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut kml_entry = String::new();
    let mut line_string_count = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();

        if entry.is_dir() {
            writer.add_directory(name, SimpleFileOptions::default())?;
            continue;
        }

        let mut contents = Vec::new();
        entry.read_to_end(&mut contents)?;

        let method = match entry.compression() {
            CompressionMethod::Stored => CompressionMethod::Stored,
            _ => CompressionMethod::Deflated,
        };

        if i == kml_index {
            let kml = String::from_utf8(contents).map_err(|e| {
                ElevateError::InvalidFormat(format!("{name} is not valid UTF-8: {e}"))
            })?;
            let transformed = transform_str(&kml, options)?;
            debug!(
                "{name}: {} LineString(s) transformed",
                transformed.line_string_count
            );
            line_string_count = transformed.line_string_count;
            contents = transformed.kml.into_bytes();
            kml_entry.clone_from(&name);
        }

        writer.start_file(name, SimpleFileOptions::default().compression_method(method))?;
        writer.write_all(&contents)?;
    }

    let contents = writer.finish()?.into_inner();
    Ok(TransformedKmz {
        contents,
        kml_entry,
        line_string_count,
    })
}

/// Index of the root KML entry: `doc.kml` if present, else the first `.kml`
fn find_root_kml<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>) -> Result<usize> {
    let mut kml_entries = Vec::new();
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if !entry.is_dir() && is_kml_name(&name) {
            kml_entries.push((i, name));
        }
    }

    if kml_entries.len() > 1 {
        warn!(
            "KMZ holds {} KML entries; only the root document is transformed",
            kml_entries.len()
        );
    }

    kml_entries
        .iter()
        .find(|(_, name)| name.eq_ignore_ascii_case("doc.kml"))
        .or_else(|| kml_entries.first())
        .map(|(i, _)| *i)
        .ok_or_else(|| ElevateError::InvalidFormat("No KML file found in KMZ archive".to_string()))
}

fn is_kml_name(name: &str) -> bool {
    std::path::Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("kml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "<kml><Placemark><LineString><coordinates>1,2,3</coordinates></LineString></Placemark></kml>";

    fn build_kmz(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                writer.start_file(*name, SimpleFileOptions::default()).unwrap();
                writer.write_all(data).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    fn read_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut entry = archive.by_index(i).unwrap();
                let mut data = Vec::new();
                entry.read_to_end(&mut data).unwrap();
                (entry.name().to_string(), data)
            })
            .collect()
    }

    #[test]
    fn test_transforms_doc_kml_and_keeps_resources() {
        let icon: &[u8] = &[0x89, b'P', b'N', b'G', 0, 1, 2];
        let kmz = build_kmz(&[
            ("files/", &b""[..]),
            ("files/icon.png", icon),
            ("doc.kml", DOC.as_bytes()),
        ]);

        let out = transform_kmz(&kmz, &TransformOptions::new(7.0)).unwrap();
        assert_eq!(out.kml_entry, "doc.kml");
        assert_eq!(out.line_string_count, 1);

        let entries = read_entries(&out.contents);
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["files/", "files/icon.png", "doc.kml"]);
        assert_eq!(entries[1].1, icon);

        let kml = String::from_utf8(entries[2].1.clone()).unwrap();
        assert!(kml.contains("\n1,2,10\n"), "{kml}");
        assert!(kml.contains("<altitudeMode>absolute</altitudeMode>"));
    }

    #[test]
    fn test_prefers_doc_kml_over_other_kml() {
        let kmz = build_kmz(&[("overlay.kml", &b"<kml/>"[..]), ("DOC.KML", DOC.as_bytes())]);
        let out = transform_kmz(&kmz, &TransformOptions::new(1.0)).unwrap();
        assert_eq!(out.kml_entry, "DOC.KML");
        assert_eq!(out.line_string_count, 1);

        let entries = read_entries(&out.contents);
        assert_eq!(entries[0].1, b"<kml/>");
    }

    #[test]
    fn test_falls_back_to_first_kml_entry() {
        let kmz = build_kmz(&[("readme.txt", &b"hi"[..]), ("track.kml", DOC.as_bytes())]);
        let out = transform_kmz(&kmz, &TransformOptions::new(1.0)).unwrap();
        assert_eq!(out.kml_entry, "track.kml");
    }

    #[test]
    fn test_archive_without_kml_is_rejected() {
        let kmz = build_kmz(&[("image.jpg", &b"\xff\xd8"[..])]);
        let err = transform_kmz(&kmz, &TransformOptions::new(1.0)).unwrap_err();
        assert!(matches!(err, ElevateError::InvalidFormat(_)));
    }

    #[test]
    fn test_not_a_zip_is_archive_error() {
        let err = transform_kmz(b"<kml/>", &TransformOptions::new(1.0)).unwrap_err();
        assert!(matches!(err, ElevateError::Archive(_)));
    }

    #[test]
    fn test_malformed_inner_kml_is_invalid_format() {
        let kmz = build_kmz(&[("doc.kml", &b"<kml><LineString"[..])]);
        let err = transform_kmz(&kmz, &TransformOptions::new(1.0)).unwrap_err();
        assert!(matches!(err, ElevateError::InvalidFormat(_)));
    }
}
