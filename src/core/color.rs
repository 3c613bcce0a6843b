//! Concrete RGBA colors

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// An 8-bit RGBA color as handed to the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

/// Fallback used when the theme has no entry for a series color key
pub const DEFAULT_SERIES_COLOR: Color = Color::rgba(0, 190, 240, 255);

/// Grid color used until the theme provides one
pub const DEFAULT_GRID_COLOR: Color = Color::rgba(0x57, 0x57, 0x57, 255);

impl Color {
    pub const fn rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Color {
            red,
            green,
            blue,
            alpha,
        }
    }

    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self::rgba(red, green, blue, 255)
    }

    /// Same color with its alpha multiplied by `factor` (truncating)
    pub fn scale_alpha(self, factor: f64) -> Self {
        let alpha = (f64::from(self.alpha) * factor).clamp(0.0, 255.0) as u8;
        Color { alpha, ..self }
    }
}

/// Looks up symbolic color keys (`"cpu-color"`, `"grid-color"`, ...)
/// against the current visual theme.
///
/// Only called when a cached color is stale, i.e. after a theme change or
/// a change of a series' color key, never on every repaint.
pub trait ColorResolver {
    fn resolve(&self, key: &str) -> Option<Color>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color '{0}', expected #rrggbb or #rrggbbaa")]
pub struct ParseColorError(pub String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(err)?;
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(err());
        }

        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        let alpha = if hex.len() == 8 { byte(6)? } else { 255 };
        Ok(Color::rgba(byte(0)?, byte(2)?, byte(4)?, alpha))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)?;
        if self.alpha != 255 {
            write!(f, "{:02x}", self.alpha)?;
        }
        Ok(())
    }
}
