//! Network Meter
//!
//! Sums the counters of every activated interface, turns them into bit
//! rates through a `RateEstimator`, and shows each direction normalized
//! against its decaying ceiling. Errors and collisions only recolor the
//! compact bars.

use log::{debug, info, warn};

use super::{IndicatorGraphs, MeterStrategy};
use crate::core::{
    format_bit_rate, Channel, IndicatorConfig, MeterKind, RateEstimator, RateSample, RateUpdate,
    SeriesId,
};
use crate::platform::{MetricsProvider, NetInterface, NetTotals, ProviderError};

#[derive(Debug, Clone, Copy)]
struct DirectionSeries {
    compact: SeriesId,
    popup: SeriesId,
}

#[derive(Debug)]
pub struct NetworkStrategy {
    estimator: RateEstimator,
    inbound: Option<DirectionSeries>,
    outbound: Option<DirectionSeries>,
    /// Names of the interfaces currently summed
    activated: Option<Vec<String>>,
    /// Interface enumeration is currently failing
    unavailable: bool,
}

impl NetworkStrategy {
    pub fn new(config: &IndicatorConfig) -> Self {
        NetworkStrategy {
            estimator: RateEstimator::new(config.decay_factor),
            inbound: None,
            outbound: None,
            activated: None,
            unavailable: false,
        }
    }

    pub fn estimator(&self) -> &RateEstimator {
        &self.estimator
    }

    /// Interface list, or an empty one when enumeration is unavailable
    fn interfaces(
        &mut self,
        provider: &mut dyn MetricsProvider,
    ) -> Result<Vec<NetInterface>, ProviderError> {
        match provider.network_interfaces() {
            Ok(interfaces) => {
                if self.unavailable {
                    info!("network: interface enumeration available again");
                    self.unavailable = false;
                }
                Ok(interfaces)
            }
            Err(ProviderError::Unavailable { what }) => {
                if !self.unavailable {
                    warn!("network: {} unavailable, continuing without interfaces", what);
                    self.unavailable = true;
                }
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Remember the activated set. Returns true when it changed.
    fn note_interfaces(&mut self, interfaces: &[NetInterface]) -> bool {
        let names: Vec<String> = interfaces
            .iter()
            .filter(|i| i.is_activated())
            .map(|i| i.name.clone())
            .collect();
        if self.activated.as_ref() == Some(&names) {
            return false;
        }
        if self.activated.as_ref().map(Vec::len) != Some(names.len()) {
            info!("network: interfaces found: {}", names.len());
        }
        self.activated = Some(names);
        true
    }

    fn publish(&self, graphs: &mut IndicatorGraphs, sample: &RateSample) {
        let directions = [
            (self.inbound, Channel::BytesIn, sample.inbound_health()),
            (self.outbound, Channel::BytesOut, sample.outbound_health()),
        ];
        for (series, channel, health) in directions {
            let Some(series) = series else {
                continue;
            };
            graphs
                .compact
                .add_data_point(series.compact, sample.normalized(channel));
            graphs
                .popup
                .add_data_point(series.popup, sample.rate_of(channel));
            graphs
                .compact
                .set_color_key(series.compact, health.color_key());
        }

        let readouts = &mut graphs.readouts;
        readouts.set("in", format_bit_rate(sample.rate_of(Channel::BytesIn)));
        readouts.set("out", format_bit_rate(sample.rate_of(Channel::BytesOut)));
        readouts.set("max_in", format_bit_rate(sample.ceiling_of(Channel::BytesIn)));
        readouts.set("max_out", format_bit_rate(sample.ceiling_of(Channel::BytesOut)));
    }
}

impl MeterStrategy for NetworkStrategy {
    fn kind(&self) -> MeterKind {
        MeterKind::Network
    }

    fn init(&mut self, graphs: &mut IndicatorGraphs, provider: &mut dyn MetricsProvider) {
        self.inbound = Some(DirectionSeries {
            compact: graphs
                .compact
                .add_data_set("network-in-used", "network-ok-color"),
            popup: graphs
                .popup
                .add_data_set("network-in-used", "network-in-color"),
        });
        self.outbound = Some(DirectionSeries {
            compact: graphs
                .compact
                .add_data_set("network-out-used", "network-ok-color"),
            popup: graphs
                .popup
                .add_data_set("network-out-used", "network-out-color"),
        });

        let readouts = &mut graphs.readouts;
        readouts.declare("Current:", "in", "Inbound");
        readouts.declare("Current:", "out", "Outbound");
        readouts.declare("Maximum (over 2 hours):", "max_in", "Inbound");
        readouts.declare("Maximum (over 2 hours):", "max_out", "Outbound");
        readouts.declare("Link:", "speed", "Link speed");

        match self.interfaces(provider) {
            Ok(interfaces) => {
                self.note_interfaces(&interfaces);
            }
            Err(e) => warn!("network: cannot list interfaces: {}", e),
        }
    }

    fn sample_tick(
        &mut self,
        graphs: &mut IndicatorGraphs,
        provider: &mut dyn MetricsProvider,
        now_ms: u64,
    ) -> Result<(), ProviderError> {
        let interfaces = self.interfaces(provider)?;
        let totals = NetTotals::from_interfaces(&interfaces);
        let changed = self.note_interfaces(&interfaces);

        if totals.link_speed_mbps > 0 {
            graphs
                .readouts
                .set("speed", format!("{} Mb/s", totals.link_speed_mbps));
        }

        let now = now_ms as f64 / 1000.0;
        let counters = totals.counters.channels();
        if changed && self.estimator.has_baseline() {
            // Sums jump when interfaces come or go; start over from here
            debug!("network: interface set changed, rebasing counters");
            self.estimator.rebase(counters, now);
            return Ok(());
        }
        match self.estimator.update(counters, now) {
            RateUpdate::Sample(sample) => self.publish(graphs, &sample),
            RateUpdate::Bootstrap | RateUpdate::Skipped => {}
        }

        Ok(())
    }

    fn reset(&mut self) {
        self.estimator.reset();
        self.activated = None;
        self.unavailable = false;
    }
}
