//! Line color conversion
//!
//! User-facing colors are `#RRGGBB`. KML stores colors as `aabbggrr`, alpha
//! first and the color channels in reverse order.
//!
//! ```
//! use kml_elevate::hex_to_kml_color;
//!
//! assert_eq!(hex_to_kml_color("#FF8800")?, "ff0088ff");
//! # Ok::<(), kml_elevate::ElevateError>(())
//! ```

use crate::error::{ElevateError, Result};
use std::fmt;
use std::str::FromStr;

/// Alpha written into every KML color (fully opaque).
const OPAQUE: u8 = 0xff;

/// An RGB line color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineColor {
    /// Red channel
    pub red: u8,
    /// Green channel
    pub green: u8,
    /// Blue channel
    pub blue: u8,
}

impl LineColor {
    /// Create a color from its channels
    #[inline]
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Render in KML `aabbggrr` form, e.g. `#FF8800` becomes `ff0088ff`
    #[must_use]
    pub fn to_kml(&self) -> String {
        format!(
            "{OPAQUE:02x}{:02x}{:02x}{:02x}",
            self.blue, self.green, self.red
        )
    }
}

impl FromStr for LineColor {
    type Err = ElevateError;

    /// Parse `#RRGGBB` or `RRGGBB`, either case
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);

        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ElevateError::InvalidColor(format!(
                "expected 6 hex digits like #RRGGBB, got {s:?}"
            )));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|e| ElevateError::InvalidColor(format!("{s:?}: {e}")))
        };

        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl fmt::Display for LineColor {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_kml())
    }
}

/// Convert a `#RRGGBB` color to the KML `aabbggrr` form
///
/// # Errors
///
/// Returns [`ElevateError::InvalidColor`] unless the input is exactly six hex
/// digits (after an optional leading `#`).
pub fn hex_to_kml_color(hex: &str) -> Result<String> {
    hex.parse::<LineColor>().map(|color| color.to_kml())
}
