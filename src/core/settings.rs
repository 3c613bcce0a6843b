//! Settings module
//!
//! This module contains the user-configurable settings: one
//! `IndicatorConfig` per meter plus panel-wide options and theme colors.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use super::color::Color;
use super::rate::DEFAULT_DECAY;

/// Smallest accepted update interval
pub const MIN_UPDATE_INTERVAL_MS: u64 = 10;

/// Default number of major grid lines
pub const DEFAULT_GRID_LINES: usize = 3;

/// Default hover debounce before a popup shows
pub const DEFAULT_HOVER_TIMEOUT_MS: u64 = 300;

/// The four metrics the panel knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MeterKind {
    Cpu,
    Memory,
    Swap,
    Network,
}

impl MeterKind {
    pub fn all() -> &'static [MeterKind] {
        &[
            MeterKind::Cpu,
            MeterKind::Memory,
            MeterKind::Swap,
            MeterKind::Network,
        ]
    }

    /// Name used as key prefix in the settings file
    pub fn name(self) -> &'static str {
        match self {
            MeterKind::Cpu => "cpu",
            MeterKind::Memory => "memory",
            MeterKind::Swap => "swap",
            MeterKind::Network => "network",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "cpu" => Some(MeterKind::Cpu),
            "memory" | "mem" => Some(MeterKind::Memory),
            "swap" => Some(MeterKind::Swap),
            "network" | "net" => Some(MeterKind::Network),
            _ => None,
        }
    }
}

/// Per-indicator configuration
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorConfig {
    pub enabled: bool,
    pub update_interval_ms: u64,
    /// Autoscale the popup graph instead of pinning it to a fixed max
    pub autoscale: bool,
    /// Fixed popup max; `None` lets the meter pick one (e.g. physical RAM)
    pub fixed_max: Option<f64>,
    pub units: String,
    pub show_max: bool,
    /// CPU bar smoothing: the previous value decays by this factor per tick
    pub decay: f64,
    /// Network ceiling decay per tick
    pub decay_factor: f64,
    pub bar_width: f64,
    pub bar_padding: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        IndicatorConfig {
            enabled: true,
            update_interval_ms: 250,
            autoscale: true,
            fixed_max: None,
            units: String::new(),
            show_max: true,
            decay: 0.2,
            decay_factor: DEFAULT_DECAY,
            bar_width: 6.0,
            bar_padding: 1.0,
            offset_x: 2.0,
            offset_y: -1.0,
        }
    }
}

impl IndicatorConfig {
    /// Defaults for a given meter
    pub fn for_meter(kind: MeterKind) -> Self {
        let base = IndicatorConfig::default();
        match kind {
            MeterKind::Cpu => IndicatorConfig {
                update_interval_ms: 250,
                autoscale: false,
                fixed_max: Some(100.0),
                units: "%".to_string(),
                show_max: false,
                ..base
            },
            MeterKind::Memory => IndicatorConfig {
                update_interval_ms: 1000,
                autoscale: false,
                units: "B".to_string(),
                ..base
            },
            MeterKind::Swap => IndicatorConfig {
                update_interval_ms: 2000,
                autoscale: false,
                units: "B".to_string(),
                ..base
            },
            MeterKind::Network => IndicatorConfig {
                update_interval_ms: 250,
                autoscale: true,
                units: "b/s".to_string(),
                ..base
            },
        }
    }

    /// Apply one `key=value` pair (key without the meter prefix)
    fn parse_setting(&mut self, key: &str, value: &str) {
        match key {
            "enabled" => self.enabled = value == "1",
            "update_interval_ms" => {
                if let Ok(v) = value.parse::<u64>() {
                    self.update_interval_ms = v.max(MIN_UPDATE_INTERVAL_MS);
                }
            }
            "autoscale" => self.autoscale = value == "1",
            "fixed_max" => {
                if let Ok(v) = value.parse::<f64>() {
                    if v.is_finite() && v > 0.0 {
                        self.fixed_max = Some(v);
                    }
                }
            }
            "units" => self.units = value.to_string(),
            "show_max" => self.show_max = value == "1",
            "decay" => {
                if let Some(v) = parse_factor(value) {
                    self.decay = v;
                }
            }
            "decay_factor" => {
                if let Some(v) = parse_factor(value) {
                    self.decay_factor = v;
                }
            }
            "bar_width" => {
                if let Ok(v) = value.parse::<f64>() {
                    self.bar_width = v.max(1.0);
                }
            }
            "bar_padding" => {
                if let Ok(v) = value.parse::<f64>() {
                    self.bar_padding = v.max(0.0);
                }
            }
            "offset_x" => {
                if let Ok(v) = value.parse::<f64>() {
                    self.offset_x = v;
                }
            }
            "offset_y" => {
                if let Ok(v) = value.parse::<f64>() {
                    self.offset_y = v;
                }
            }
            _ => {}
        }
    }

    fn write(&self, file: &mut impl Write, prefix: &str) -> std::io::Result<()> {
        writeln!(file, "{}.enabled={}", prefix, if self.enabled { 1 } else { 0 })?;
        writeln!(
            file,
            "{}.update_interval_ms={}",
            prefix, self.update_interval_ms
        )?;
        writeln!(
            file,
            "{}.autoscale={}",
            prefix,
            if self.autoscale { 1 } else { 0 }
        )?;
        if let Some(max) = self.fixed_max {
            writeln!(file, "{}.fixed_max={}", prefix, max)?;
        }
        writeln!(file, "{}.units={}", prefix, self.units)?;
        writeln!(
            file,
            "{}.show_max={}",
            prefix,
            if self.show_max { 1 } else { 0 }
        )?;
        writeln!(file, "{}.decay={}", prefix, self.decay)?;
        writeln!(file, "{}.decay_factor={}", prefix, self.decay_factor)?;
        writeln!(file, "{}.bar_width={}", prefix, self.bar_width)?;
        writeln!(file, "{}.bar_padding={}", prefix, self.bar_padding)?;
        writeln!(file, "{}.offset_x={}", prefix, self.offset_x)?;
        writeln!(file, "{}.offset_y={}", prefix, self.offset_y)?;
        Ok(())
    }
}

/// Parse a decay factor in (0, 1]
fn parse_factor(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| *v > 0.0 && *v <= 1.0)
}

/// Panel settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub filename: Option<PathBuf>,
    pub readonly: bool,

    pub cpu: IndicatorConfig,
    pub memory: IndicatorConfig,
    pub swap: IndicatorConfig,
    pub network: IndicatorConfig,

    /// Host display scale; multiplies bar width and padding
    pub scale_factor: f64,
    pub grid_lines: usize,
    pub hover_timeout_ms: u64,

    /// Theme overrides, keyed by symbolic color name
    pub colors: BTreeMap<String, Color>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Settings {
            filename: Self::default_config_path(),
            readonly: false,
            cpu: IndicatorConfig::for_meter(MeterKind::Cpu),
            memory: IndicatorConfig::for_meter(MeterKind::Memory),
            swap: IndicatorConfig::for_meter(MeterKind::Swap),
            network: IndicatorConfig::for_meter(MeterKind::Network),
            scale_factor: 1.0,
            grid_lines: DEFAULT_GRID_LINES,
            hover_timeout_ms: DEFAULT_HOVER_TIMEOUT_MS,
            colors: BTreeMap::new(),
        }
    }

    /// Get the default config file path
    fn default_config_path() -> Option<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("statsplus").join("statsplusrc"))
        } else {
            dirs::home_dir().map(|home| home.join(".config").join("statsplus").join("statsplusrc"))
        }
    }

    pub fn indicator(&self, kind: MeterKind) -> &IndicatorConfig {
        match kind {
            MeterKind::Cpu => &self.cpu,
            MeterKind::Memory => &self.memory,
            MeterKind::Swap => &self.swap,
            MeterKind::Network => &self.network,
        }
    }

    pub fn indicator_mut(&mut self, kind: MeterKind) -> &mut IndicatorConfig {
        match kind {
            MeterKind::Cpu => &mut self.cpu,
            MeterKind::Memory => &mut self.memory,
            MeterKind::Swap => &mut self.swap,
            MeterKind::Network => &mut self.network,
        }
    }

    /// Load settings from the config file
    pub fn load(&mut self) -> anyhow::Result<()> {
        let path = match &self.filename {
            Some(p) => p.clone(),
            None => return Ok(()),
        };

        if !path.exists() {
            return Ok(());
        }

        let file = fs::File::open(&path)?;
        let reader = BufReader::new(file);

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                self.parse_setting(key.trim(), value.trim());
            }
        }

        Ok(())
    }

    /// Parse a single setting line
    fn parse_setting(&mut self, key: &str, value: &str) {
        match key {
            "scale_factor" => {
                if let Ok(v) = value.parse::<f64>() {
                    if v.is_finite() && v > 0.0 {
                        self.scale_factor = v;
                    }
                }
            }
            "grid_lines" => {
                if let Ok(v) = value.parse::<usize>() {
                    self.grid_lines = v.clamp(1, 16);
                }
            }
            "hover_timeout_ms" => {
                if let Ok(v) = value.parse::<u64>() {
                    self.hover_timeout_ms = v;
                }
            }
            _ => {
                let Some((prefix, rest)) = key.split_once('.') else {
                    return;
                };
                if prefix == "color" {
                    if let Ok(color) = value.parse::<Color>() {
                        self.colors.insert(rest.to_string(), color);
                    }
                } else if let Some(kind) = MeterKind::from_name(prefix) {
                    self.indicator_mut(kind).parse_setting(rest, value);
                }
            }
        }
    }

    /// Write settings to the config file
    pub fn write(&self) -> anyhow::Result<()> {
        if self.readonly {
            return Ok(());
        }

        let path = match &self.filename {
            Some(p) => p.clone(),
            None => return Ok(()),
        };

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(&path)?;

        writeln!(file, "# statsplus-rs configuration file")?;
        writeln!(file, "# Automatically generated by statsplus-rs")?;
        writeln!(file)?;

        writeln!(file, "scale_factor={}", self.scale_factor)?;
        writeln!(file, "grid_lines={}", self.grid_lines)?;
        writeln!(file, "hover_timeout_ms={}", self.hover_timeout_ms)?;

        for kind in MeterKind::all() {
            writeln!(file)?;
            self.indicator(*kind).write(&mut file, kind.name())?;
        }

        if !self.colors.is_empty() {
            writeln!(file)?;
        }
        for (key, color) in &self.colors {
            writeln!(file, "color.{}={}", key, color)?;
        }

        Ok(())
    }
}

// Stub for dirs crate functionality
mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| home_dir().map(|h| h.join(".config")))
    }

    pub fn home_dir() -> Option<PathBuf> {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}
