//! Memory Meter

use log::warn;

use super::{IndicatorGraphs, MeterStrategy};
use crate::core::{format_metric_pretty, IndicatorConfig, MeterKind, SeriesId};
use crate::platform::{MemorySnapshot, MetricsProvider, ProviderError};

/// Memory held by applications: user memory minus slab, when reported
pub fn memory_used(mem: &MemorySnapshot) -> u64 {
    let user = mem.user();
    match mem.slab {
        Some(slab) => user.saturating_sub(slab),
        None => user,
    }
}

/// Shows used memory as a fraction of physical RAM; the popup graph is
/// pinned to the RAM size unless a fixed max is configured.
#[derive(Debug)]
pub struct MemoryStrategy {
    fixed_max: Option<f64>,
    compact: Option<SeriesId>,
    popup: Option<SeriesId>,
}

impl MemoryStrategy {
    pub fn new(config: &IndicatorConfig) -> Self {
        MemoryStrategy {
            fixed_max: config.fixed_max,
            compact: None,
            popup: None,
        }
    }
}

impl MeterStrategy for MemoryStrategy {
    fn kind(&self) -> MeterKind {
        MeterKind::Memory
    }

    fn init(&mut self, graphs: &mut IndicatorGraphs, provider: &mut dyn MetricsProvider) {
        self.compact = Some(graphs.compact.add_data_set("mem-used", "mem-used-color"));
        self.popup = Some(graphs.popup.add_data_set("mem-used", "mem-used-color"));

        let initial = provider
            .memory()
            .map_err(|e| warn!("memory: cannot read initial counters: {}", e))
            .ok();

        if self.fixed_max.is_none() {
            if let Some(mem) = &initial {
                graphs.popup.set_fixed_max(mem.total as f64);
            }
        }

        let readouts = &mut graphs.readouts;
        readouts.declare("Current:", "used", "Total memory usage");
        readouts.declare("Current:", "buffer", "Total buffer usage");
        readouts.declare("Current:", "shared", "Total shared usage");
        readouts.declare("Current:", "cached", "Total cache usage");
        // Providers without slab accounting get no slab row
        if initial.as_ref().is_some_and(|m| m.slab.is_some()) {
            readouts.declare("Current:", "slab", "Total slab usage");
        }
        readouts.declare("Current:", "locked", "Total locked usage");
        readouts.declare("Current:", "free", "Total free usage");
        readouts.declare("Current:", "total", "Total RAM present");
    }

    fn sample_tick(
        &mut self,
        graphs: &mut IndicatorGraphs,
        provider: &mut dyn MetricsProvider,
        _now_ms: u64,
    ) -> Result<(), ProviderError> {
        let mem = provider.memory()?;
        let used = memory_used(&mem);

        // Also covers a failed first read in init
        if self.fixed_max.is_none() {
            graphs.popup.set_fixed_max(mem.total as f64);
        }

        let ratio = if mem.total > 0 {
            used as f64 / mem.total as f64
        } else {
            0.0
        };
        if let Some(id) = self.compact {
            graphs.compact.add_data_point(id, ratio);
        }
        if let Some(id) = self.popup {
            graphs.popup.add_data_point(id, used as f64);
        }

        let readouts = &mut graphs.readouts;
        let bytes = |v: u64| format_metric_pretty(v as f64, "B");
        readouts.set("used", bytes(used));
        readouts.set("buffer", bytes(mem.buffers));
        readouts.set("shared", bytes(mem.shared));
        readouts.set("cached", bytes(mem.cached));
        if let Some(slab) = mem.slab {
            readouts.declare_before("locked", "Current:", "slab", "Total slab usage");
            readouts.set("slab", bytes(slab));
        }
        readouts.set("locked", bytes(mem.locked));
        readouts.set("free", bytes(mem.free));
        readouts.set("total", bytes(mem.total));

        Ok(())
    }
}
