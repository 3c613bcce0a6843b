//! Swap Meter
//!
//! The compact bar changes color as swap fills up.

use log::warn;

use super::{IndicatorGraphs, MeterStrategy};
use crate::core::{format_metric_pretty, IndicatorConfig, MeterKind, SeriesId};
use crate::platform::{MetricsProvider, ProviderError};

/// Usage above which swap is shown as a warning
pub const SWAP_WARN_RATIO: f64 = 0.25;
/// Usage above which swap is shown as bad
pub const SWAP_BAD_RATIO: f64 = 0.5;

/// Swap pressure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageLevel {
    Normal,
    Warn,
    Bad,
}

impl UsageLevel {
    pub fn classify(ratio: f64) -> Self {
        if ratio > SWAP_BAD_RATIO {
            UsageLevel::Bad
        } else if ratio > SWAP_WARN_RATIO {
            UsageLevel::Warn
        } else {
            UsageLevel::Normal
        }
    }

    pub fn color_key(self) -> &'static str {
        match self {
            UsageLevel::Normal => "swap-used-color",
            UsageLevel::Warn => "swap-used-warn-color",
            UsageLevel::Bad => "swap-used-bad-color",
        }
    }
}

#[derive(Debug)]
pub struct SwapStrategy {
    fixed_max: Option<f64>,
    compact: Option<SeriesId>,
    popup: Option<SeriesId>,
    level: UsageLevel,
}

impl SwapStrategy {
    pub fn new(config: &IndicatorConfig) -> Self {
        SwapStrategy {
            fixed_max: config.fixed_max,
            compact: None,
            popup: None,
            level: UsageLevel::Normal,
        }
    }

    pub fn level(&self) -> UsageLevel {
        self.level
    }
}

impl MeterStrategy for SwapStrategy {
    fn kind(&self) -> MeterKind {
        MeterKind::Swap
    }

    fn init(&mut self, graphs: &mut IndicatorGraphs, provider: &mut dyn MetricsProvider) {
        self.compact = Some(
            graphs
                .compact
                .add_data_set("swap-used", UsageLevel::Normal.color_key()),
        );
        self.popup = Some(graphs.popup.add_data_set("swap-used", "swap-used-color"));

        if self.fixed_max.is_none() {
            match provider.swap() {
                Ok(swap) => graphs.popup.set_fixed_max(swap.total as f64),
                Err(e) => warn!("swap: cannot read initial counters: {}", e),
            }
        }

        graphs
            .readouts
            .declare("Current:", "used", "Total swap usage");
    }

    fn sample_tick(
        &mut self,
        graphs: &mut IndicatorGraphs,
        provider: &mut dyn MetricsProvider,
        _now_ms: u64,
    ) -> Result<(), ProviderError> {
        let swap = provider.swap()?;
        if self.fixed_max.is_none() {
            graphs.popup.set_fixed_max(swap.total as f64);
        }

        let ratio = if swap.total > 0 {
            swap.used as f64 / swap.total as f64
        } else {
            0.0
        };

        if let Some(id) = self.compact {
            graphs.compact.add_data_point(id, ratio);
            self.level = UsageLevel::classify(ratio);
            graphs.compact.set_color_key(id, self.level.color_key());
        }
        if let Some(id) = self.popup {
            graphs.popup.add_data_point(id, swap.used as f64);
        }
        graphs
            .readouts
            .set("used", format_metric_pretty(swap.used as f64, "B"));

        Ok(())
    }

    fn reset(&mut self) {
        self.level = UsageLevel::Normal;
    }
}
