//! Error types for KML elevation transforms

use std::io;
use thiserror::Error;

/// Errors that can occur while transforming a KML or KMZ document
#[derive(Debug, Error)]
pub enum ElevateError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Input is not well-formed XML (or not a usable KMZ)
    #[error("Invalid KML file format: {0}")]
    InvalidFormat(String),

    /// Line color is not a 6-digit hex RGB value
    #[error("Invalid line color: {0}")]
    InvalidColor(String),

    /// An altitude or the elevation delta is not a finite number
    #[error("Not a number: {0}")]
    NotANumber(String),

    /// KMZ archive error
    #[error("KMZ archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Session was asked to process before a file was loaded
    #[error("No KML file loaded")]
    NoInput,
}

impl ElevateError {
    /// Prefix a `NotANumber` message with the 1-based `LineString` it came from.
    ///
    /// Other variants are returned unchanged.
    #[must_use]
    pub fn in_line_string(self, index: usize) -> Self {
        match self {
            Self::NotANumber(msg) => Self::NotANumber(format!("LineString #{index}: {msg}")),
            other => other,
        }
    }
}

impl From<quick_xml::Error> for ElevateError {
    #[inline]
    fn from(err: quick_xml::Error) -> Self {
        Self::InvalidFormat(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for ElevateError {
    #[inline]
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::InvalidFormat(err.to_string())
    }
}

/// Result type for elevation transforms
pub type Result<T> = std::result::Result<T, ElevateError>;
