//! CPU Meter
//!
//! One compact bar per core showing a decaying busy fraction, and a popup
//! graph of the average usage in percent.

use log::warn;

use super::{IndicatorGraphs, MeterStrategy};
use crate::core::{format_percent, IndicatorConfig, MeterKind, SeriesId};
use crate::platform::{CpuSnapshot, MetricsProvider, ProviderError};

/// Ceiling of a decayed value, so a core never sticks at a full bar
const MAX_DECAYED: f64 = 0.999999999;

/// Busy fraction of a core over one tick: `1 - idle / total`
pub fn cpu_reading(total_delta: u64, idle_delta: u64) -> f64 {
    if total_delta == 0 {
        return 0.0;
    }
    1.0 - idle_delta as f64 / total_delta as f64
}

/// Displayed value of a core: the new reading, or the previous value
/// decayed by `decay` if that is higher
pub fn smooth_reading(previous: f64, reading: f64, decay: f64) -> f64 {
    reading.max((previous * decay).min(MAX_DECAYED))
}

fn counter_delta(now: &[u64], before: &[u64], index: usize) -> u64 {
    let now = now.get(index).copied().unwrap_or(0);
    let before = before.get(index).copied().unwrap_or(0);
    now.saturating_sub(before)
}

#[derive(Debug)]
pub struct CpuStrategy {
    decay: f64,
    previous: CpuSnapshot,
    /// Last displayed value per core
    smoothed: Vec<f64>,
    cores: Vec<SeriesId>,
    usage: Option<SeriesId>,
}

impl CpuStrategy {
    pub fn new(config: &IndicatorConfig) -> Self {
        CpuStrategy {
            decay: config.decay,
            previous: CpuSnapshot::default(),
            smoothed: Vec::new(),
            cores: Vec::new(),
            usage: None,
        }
    }

    pub fn core_count(&self) -> usize {
        self.cores.len()
    }
}

impl MeterStrategy for CpuStrategy {
    fn kind(&self) -> MeterKind {
        MeterKind::Cpu
    }

    fn init(&mut self, graphs: &mut IndicatorGraphs, provider: &mut dyn MetricsProvider) {
        self.previous = match provider.cpu() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("cpu: cannot read initial counters: {}", e);
                CpuSnapshot::default()
            }
        };

        let ncpu = self.previous.cores().max(1);
        for cpu in 0..ncpu {
            self.cores
                .push(graphs.compact.add_data_set(&format!("cpu_{}", cpu), "cpu-color"));
            self.smoothed.push(0.0);
        }

        self.usage = Some(graphs.popup.add_data_set("cpu-usage", "cpu-color"));
        graphs
            .readouts
            .declare("Current:", "usage", "Total CPU usage");
    }

    fn sample_tick(
        &mut self,
        graphs: &mut IndicatorGraphs,
        provider: &mut dyn MetricsProvider,
        _now_ms: u64,
    ) -> Result<(), ProviderError> {
        let snapshot = provider.cpu()?;

        if self.previous.cores() == 0 && snapshot.cores() > 0 {
            // The first read failed in init: register the cores and use
            // this snapshot as the baseline
            for cpu in self.cores.len()..snapshot.cores() {
                self.cores
                    .push(graphs.compact.add_data_set(&format!("cpu_{}", cpu), "cpu-color"));
                self.smoothed.push(0.0);
            }
            self.previous = snapshot;
            return Ok(());
        }

        let mut total_usage = 0.0;
        for (i, series) in self.cores.iter().enumerate() {
            let total = counter_delta(&snapshot.total, &self.previous.total, i);
            let idle = counter_delta(&snapshot.idle, &self.previous.idle, i);

            let reading = cpu_reading(total, idle);
            total_usage += reading;

            let value = smooth_reading(self.smoothed[i], reading, self.decay);
            graphs.compact.add_data_point(*series, value);
            self.smoothed[i] = value;
        }

        let average = total_usage / self.cores.len().max(1) as f64 * 100.0;
        if let Some(usage) = self.usage {
            graphs.popup.add_data_point(usage, average);
        }
        graphs.readouts.set("usage", format_percent(average));

        self.previous = snapshot;
        Ok(())
    }

    fn reset(&mut self) {
        self.previous = CpuSnapshot::default();
        self.smoothed.iter_mut().for_each(|v| *v = 0.0);
    }
}
