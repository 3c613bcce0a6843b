//! Panel color theme
//!
//! Maps symbolic color keys to concrete colors. The built-in palette can be
//! overridden per key from the settings file (`color.<key>=#rrggbb`).

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::core::{Color, ColorResolver, Settings};

lazy_static! {
    /// Built-in palette
    static ref DEFAULT_PALETTE: HashMap<&'static str, Color> = {
        let mut palette = HashMap::new();
        palette.insert("grid-color", Color::rgb(0x57, 0x57, 0x57));
        palette.insert("cpu-color", Color::rgb(0x00, 0xbe, 0xf0));
        palette.insert("mem-used-color", Color::rgb(0x7e, 0xcf, 0x4d));
        palette.insert("swap-used-color", Color::rgb(0x9f, 0x6a, 0xd6));
        palette.insert("swap-used-warn-color", Color::rgb(0xe8, 0xb1, 0x2c));
        palette.insert("swap-used-bad-color", Color::rgb(0xe0, 0x3c, 0x31));
        palette.insert("network-ok-color", Color::rgb(0x3d, 0xa5, 0xd9));
        palette.insert("network-bad-color", Color::rgb(0xe0, 0x3c, 0x31));
        palette.insert("network-in-color", Color::rgb(0x3d, 0xa5, 0xd9));
        palette.insert("network-out-color", Color::rgb(0xf2, 0x8c, 0x28));
        palette
    };
}

/// Color theme: built-in palette plus overrides
#[derive(Debug, Clone, Default)]
pub struct Theme {
    overrides: HashMap<String, Color>,
    /// Resolve only overrides, as a theme without a palette would
    bare: bool,
}

impl Theme {
    pub fn new() -> Self {
        Theme::default()
    }

    /// Theme with no built-in palette; unknown keys fall back to the
    /// renderer's default color
    pub fn bare() -> Self {
        Theme {
            overrides: HashMap::new(),
            bare: true,
        }
    }

    /// Built-in palette plus the `color.*` overrides of the settings
    pub fn from_settings(settings: &Settings) -> Self {
        let mut theme = Theme::new();
        for (key, color) in &settings.colors {
            theme.set(key, *color);
        }
        theme
    }

    pub fn set(&mut self, key: &str, color: Color) {
        self.overrides.insert(key.to_string(), color);
    }

    pub fn unset(&mut self, key: &str) {
        self.overrides.remove(key);
    }
}

impl ColorResolver for Theme {
    fn resolve(&self, key: &str) -> Option<Color> {
        if let Some(color) = self.overrides.get(key) {
            return Some(*color);
        }
        if self.bare {
            return None;
        }
        DEFAULT_PALETTE.get(key).copied()
    }
}
