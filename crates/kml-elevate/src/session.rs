//! Caller-owned processing session
//!
//! Holds the "current file" for an interactive front end: load a file,
//! process it with some options, then hand the result out for saving.
//!
//! ```
//! use kml_elevate::{Session, TransformOptions};
//!
//! let mut session = Session::new();
//! session.load(
//!     "route.kml",
//!     b"<kml><LineString><coordinates>1,2</coordinates></LineString></kml>".to_vec(),
//! );
//! let summary = session.process(&TransformOptions::new(25.0))?;
//! assert_eq!(summary.to_string(), "Processed 1 LineString(s). Elevations adjusted by 25 meters.");
//!
//! let download = session.download().unwrap();
//! assert_eq!(download.file_name, "route_elevated.kml");
//! # Ok::<(), kml_elevate::ElevateError>(())
//! ```

use crate::coordinates::format_number;
use crate::error::{ElevateError, Result};
use crate::file::{elevated_file_name, transform_bytes, FileKind};
use crate::transform::TransformOptions;
use std::fmt;

/// A processed file ready to be saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// Suggested file name (`<stem>_elevated.<ext>`)
    pub file_name: String,
    /// Media type of `contents`
    pub media_type: &'static str,
    /// File contents
    pub contents: Vec<u8>,
}

/// Result of [`Session::process`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSummary {
    /// Number of `LineString` elements processed
    pub line_string_count: usize,
    /// Delta that was applied, in meters
    pub elevation_delta: f64,
}

impl fmt::Display for ProcessSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {} LineString(s). Elevations adjusted by {} meters.",
            self.line_string_count,
            format_number(self.elevation_delta)
        )
    }
}

#[derive(Debug, Clone)]
struct LoadedFile {
    name: String,
    contents: Vec<u8>,
}

/// The current input file and the last successful result
#[derive(Debug, Clone, Default)]
pub struct Session {
    input: Option<LoadedFile>,
    output: Option<Download>,
}

impl Session {
    /// An empty session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current file; any previous result is discarded
    pub fn load(&mut self, file_name: impl Into<String>, contents: Vec<u8>) {
        self.input = Some(LoadedFile {
            name: file_name.into(),
            contents,
        });
        self.output = None;
    }

    /// Name of the loaded file, if any
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.input.as_ref().map(|f| f.name.as_str())
    }

    /// Whether a file is loaded
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.input.is_some()
    }

    /// Transform the loaded file
    ///
    /// The previous result is cleared first, so after a failure
    /// [`download`](Self::download) returns `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ElevateError::NoInput`] when nothing is loaded, and any
    /// transform error otherwise.
    pub fn process(&mut self, options: &TransformOptions) -> Result<ProcessSummary> {
        self.output = None;
        let input = self.input.as_ref().ok_or(ElevateError::NoInput)?;

        let kind = FileKind::from_name(&input.name);
        let (contents, line_string_count) = transform_bytes(kind, &input.contents, options)?;

        self.output = Some(Download {
            file_name: elevated_file_name(&input.name),
            media_type: kind.media_type(),
            contents,
        });

        Ok(ProcessSummary {
            line_string_count,
            elevation_delta: options.elevation_delta,
        })
    }

    /// The last successful result
    #[must_use]
    pub const fn download(&self) -> Option<&Download> {
        self.output.as_ref()
    }

    /// Forget the loaded file and any result
    pub fn clear(&mut self) {
        self.input = None;
        self.output = None;
    }
}
