//! File-level entry points: format detection, output naming, read/write

use crate::error::{ElevateError, Result};
use crate::kmz::transform_kmz;
use crate::transform::{transform_str, TransformOptions};
use std::fs;
use std::path::{Path, PathBuf};

/// Suffix inserted before the extension of output files
pub const ELEVATED_SUFFIX: &str = "_elevated";

/// Media type of KML documents
pub const KML_MEDIA_TYPE: &str = "application/vnd.google-earth.kml+xml";

/// Media type of KMZ archives
pub const KMZ_MEDIA_TYPE: &str = "application/vnd.google-earth.kmz";

/// Input container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Plain KML text
    Kml,
    /// Zipped KML
    Kmz,
}

impl FileKind {
    /// Detect from a file name; anything not ending in `.kmz` is KML
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let is_kmz = Path::new(name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(Self::Kmz.extension()));
        if is_kmz {
            Self::Kmz
        } else {
            Self::Kml
        }
    }

    /// Media type for downloads
    #[inline]
    #[must_use]
    pub const fn media_type(self) -> &'static str {
        match self {
            Self::Kml => KML_MEDIA_TYPE,
            Self::Kmz => KMZ_MEDIA_TYPE,
        }
    }

    /// Lowercase extension without the dot
    #[inline]
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Kml => "kml",
            Self::Kmz => "kmz",
        }
    }
}

/// Media type for a file name
#[must_use]
pub fn media_type_for(name: &str) -> &'static str {
    FileKind::from_name(name).media_type()
}

/// Output file name for an input name: `route.kml` becomes `route_elevated.kml`
#[must_use]
pub fn elevated_file_name(name: &str) -> String {
    file_name_with_suffix(name, ELEVATED_SUFFIX)
}

/// Insert `suffix` before a trailing `.kml`/`.kmz` (either case, case kept)
///
/// Names without one of those extensions get `suffix` plus `.kml` appended.
#[must_use]
pub fn file_name_with_suffix(name: &str, suffix: &str) -> String {
    let split = name.rfind('.').filter(|&dot| {
        let ext = &name[dot + 1..];
        dot > 0
            && [FileKind::Kml, FileKind::Kmz]
                .iter()
                .any(|kind| ext.eq_ignore_ascii_case(kind.extension()))
    });
    match split {
        Some(dot) => format!("{}{suffix}{}", &name[..dot], &name[dot..]),
        None => format!("{name}{suffix}.{}", FileKind::Kml.extension()),
    }
}

/// Transform file contents, choosing KML or KMZ handling by `kind`
///
/// Returns the new contents and the number of `LineString` elements.
///
/// # Errors
///
/// Returns [`ElevateError::InvalidFormat`] for non-UTF-8 KML, and any error
/// from [`transform_str`] or [`transform_kmz`].
pub fn transform_bytes(
    kind: FileKind,
    contents: &[u8],
    options: &TransformOptions,
) -> Result<(Vec<u8>, usize)> {
    match kind {
        FileKind::Kml => {
            let kml = std::str::from_utf8(contents)
                .map_err(|e| ElevateError::InvalidFormat(format!("input is not valid UTF-8: {e}")))?;
            let transformed = transform_str(kml, options)?;
            Ok((transformed.kml.into_bytes(), transformed.line_string_count))
        }
        FileKind::Kmz => {
            let transformed = transform_kmz(contents, options)?;
            Ok((transformed.contents, transformed.line_string_count))
        }
    }
}

/// Outcome of [`transform_file`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformReport {
    /// File that was read
    pub input: PathBuf,
    /// File that was written
    pub output: PathBuf,
    /// Detected input format
    pub kind: FileKind,
    /// Number of `LineString` elements processed
    pub line_string_count: usize,
}

/// Read `input`, transform it, and write the result to `output`
///
/// The whole input is transformed in memory before anything is written, so
/// `output` is left alone on failure.
///
/// # Errors
///
/// Returns [`ElevateError::Io`] if reading or writing fails, and any error
/// from [`transform_bytes`].
pub fn transform_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    options: &TransformOptions,
) -> Result<TransformReport> {
    let input = input.as_ref();
    let output = output.as_ref();
    let kind = FileKind::from_name(&input.to_string_lossy());

    let contents = fs::read(input)?;
    let (transformed, line_string_count) = transform_bytes(kind, &contents, options)?;
    fs::write(output, transformed)?;

    log::info!(
        "{} -> {}: {line_string_count} LineString(s)",
        input.display(),
        output.display()
    );

    Ok(TransformReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        kind,
        line_string_count,
    })
}
