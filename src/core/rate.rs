//! Rate estimator for cumulative network counters
//!
//! Turns counter snapshots into per-second rates and keeps, per channel, a
//! slowly decaying ceiling (`ceiling = max(rate, ceiling * decay)`) that the
//! rates are normalized against. With the default decay of 0.9999 applied
//! every 250 ms the ceiling roughly means "peak seen in the last ~2 hours".

use log::debug;

/// Number of tracked channels
pub const CHANNELS: usize = 5;

/// Default per-tick decay of the ceiling
pub const DEFAULT_DECAY: f64 = 0.9999;

/// In/out ceiling seeded on the first sample: 56 KiB/s in bits per second
pub const BOOTSTRAP_CEILING: f64 = 56.0 * 1024.0 * 8.0;

/// Ceiling value of a channel that has not been seeded yet
const UNSEEDED: f64 = -1.0;

/// Counter channels, in snapshot order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Channel {
    BytesIn = 0,
    ErrorsIn = 1,
    BytesOut = 2,
    ErrorsOut = 3,
    Collisions = 4,
}

impl Channel {
    pub const ALL: [Channel; CHANNELS] = [
        Channel::BytesIn,
        Channel::ErrorsIn,
        Channel::BytesOut,
        Channel::ErrorsOut,
        Channel::Collisions,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Byte channels are reported in bits per second
    pub fn is_bytes(self) -> bool {
        matches!(self, Channel::BytesIn | Channel::BytesOut)
    }
}

/// Two-state health of a traffic direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkHealth {
    Ok,
    /// Errors or collisions were seen within the ceiling's memory
    Bad,
}

impl LinkHealth {
    /// Theme key used for the compact bar of this direction
    pub fn color_key(self) -> &'static str {
        match self {
            LinkHealth::Ok => "network-ok-color",
            LinkHealth::Bad => "network-bad-color",
        }
    }
}

/// Result of feeding one snapshot to the estimator
#[derive(Debug, Clone, PartialEq)]
pub enum RateUpdate {
    /// First snapshot: counters primed and ceilings seeded, no rate yet
    Bootstrap,
    /// Clock did not advance; nothing changed
    Skipped,
    /// A new rate sample
    Sample(RateSample),
}

/// One computed rate sample
#[derive(Debug, Clone, PartialEq)]
pub struct RateSample {
    /// Per-channel rates (bits/s for byte channels, events/s otherwise)
    pub rate: [f64; CHANNELS],
    /// Per-channel ceilings after this sample
    pub ceiling: [f64; CHANNELS],
}

impl RateSample {
    pub fn rate_of(&self, channel: Channel) -> f64 {
        self.rate[channel.index()]
    }

    pub fn ceiling_of(&self, channel: Channel) -> f64 {
        self.ceiling[channel.index()]
    }

    /// `rate / ceiling`, 0 when the ceiling is not positive
    pub fn normalized(&self, channel: Channel) -> f64 {
        let ceiling = self.ceiling_of(channel);
        if ceiling > 0.0 {
            self.rate_of(channel) / ceiling
        } else {
            0.0
        }
    }

    pub fn inbound_health(&self) -> LinkHealth {
        self.health(Channel::ErrorsIn)
    }

    pub fn outbound_health(&self) -> LinkHealth {
        self.health(Channel::ErrorsOut)
    }

    fn health(&self, errors: Channel) -> LinkHealth {
        if self.ceiling_of(errors) > 0.0 || self.ceiling_of(Channel::Collisions) > 0.0 {
            LinkHealth::Bad
        } else {
            LinkHealth::Ok
        }
    }
}

/// Stateful counter-to-rate converter with decaying ceilings
#[derive(Debug, Clone)]
pub struct RateEstimator {
    last_counters: [f64; CHANNELS],
    last_timestamp: Option<f64>,
    current_rate: [f64; CHANNELS],
    ceiling: [f64; CHANNELS],
    decay: f64,
}

impl Default for RateEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_DECAY)
    }
}

impl RateEstimator {
    pub fn new(decay: f64) -> Self {
        RateEstimator {
            last_counters: [0.0; CHANNELS],
            last_timestamp: None,
            current_rate: [0.0; CHANNELS],
            ceiling: [UNSEEDED; CHANNELS],
            decay,
        }
    }

    pub fn decay(&self) -> f64 {
        self.decay
    }

    pub fn current_rate(&self) -> &[f64; CHANNELS] {
        &self.current_rate
    }

    pub fn ceiling(&self) -> &[f64; CHANNELS] {
        &self.ceiling
    }

    pub fn is_seeded(&self) -> bool {
        self.ceiling.iter().all(|c| *c != UNSEEDED)
    }

    /// Feed a cumulative counter snapshot taken at `now` (seconds on a
    /// monotonic clock).
    pub fn update(&mut self, counters: [f64; CHANNELS], now: f64) -> RateUpdate {
        let Some(last_timestamp) = self.last_timestamp else {
            self.bootstrap(counters, now);
            return RateUpdate::Bootstrap;
        };

        let elapsed = now - last_timestamp;
        if elapsed <= 0.0 {
            debug!("rate estimator: clock did not advance ({elapsed}s), skipping");
            return RateUpdate::Skipped;
        }

        for channel in Channel::ALL {
            let i = channel.index();
            // Counters going backwards (interface gone, wrap) count as idle
            let delta = (counters[i] - self.last_counters[i]).max(0.0);
            let mut rate = delta / elapsed;
            if channel.is_bytes() {
                rate *= 8.0;
            }
            self.current_rate[i] = rate;

            self.ceiling[i] = if self.ceiling[i] == UNSEEDED {
                rate
            } else {
                rate.max(self.ceiling[i] * self.decay)
            };
        }

        self.last_counters = counters;
        self.last_timestamp = Some(now);

        RateUpdate::Sample(RateSample {
            rate: self.current_rate,
            ceiling: self.ceiling,
        })
    }

    fn bootstrap(&mut self, counters: [f64; CHANNELS], now: f64) {
        self.last_counters = counters;
        self.last_timestamp = Some(now);
        self.current_rate = [0.0; CHANNELS];
        for channel in Channel::ALL {
            let i = channel.index();
            self.ceiling[i] = if channel.is_bytes() {
                BOOTSTRAP_CEILING
            } else {
                0.0
            };
        }
    }

    /// Whether a previous snapshot exists to diff against
    pub fn has_baseline(&self) -> bool {
        self.last_timestamp.is_some()
    }

    /// Take `counters` as the new baseline, keeping the ceilings.
    ///
    /// Used when the set of counted interfaces changes: the sums jump by
    /// whole cumulative counters, which are not traffic.
    pub fn rebase(&mut self, counters: [f64; CHANNELS], now: f64) {
        if self.last_timestamp.is_none() {
            self.bootstrap(counters, now);
            return;
        }
        self.last_counters = counters;
        self.last_timestamp = Some(now);
        self.current_rate = [0.0; CHANNELS];
    }

    /// Forget everything, as on indicator teardown
    pub fn reset(&mut self) {
        *self = Self::new(self.decay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(bytes_in: f64, bytes_out: f64) -> [f64; CHANNELS] {
        [bytes_in, 0.0, bytes_out, 0.0, 0.0]
    }

    fn sample(update: RateUpdate) -> RateSample {
        match update {
            RateUpdate::Sample(s) => s,
            other => panic!("expected a sample, got {:?}", other),
        }
    }

    // ==================== Bootstrap Tests ====================

    #[test]
    fn test_new_estimator_is_unseeded() {
        let est = RateEstimator::default();
        assert!(!est.is_seeded());
        assert_eq!(est.ceiling(), &[-1.0; CHANNELS]);
        assert_eq!(est.decay(), DEFAULT_DECAY);
    }

    #[test]
    fn test_bootstrap_forces_default_ceiling() {
        let mut est = RateEstimator::default();
        // Large cumulative counters must not leak into the first ceiling
        let update = est.update([9e12, 50.0, 7e12, 3.0, 1.0], 100.0);
        assert_eq!(update, RateUpdate::Bootstrap);
        assert!(est.is_seeded());
        assert_eq!(est.ceiling()[0], 56.0 * 1024.0 * 8.0);
        assert_eq!(est.ceiling()[2], 56.0 * 1024.0 * 8.0);
        assert_eq!(est.ceiling()[1], 0.0);
        assert_eq!(est.ceiling()[3], 0.0);
        assert_eq!(est.ceiling()[4], 0.0);
    }

    #[test]
    fn test_first_rate_above_bootstrap_seeds_ceiling() {
        let mut est = RateEstimator::default();
        est.update(counters(0.0, 0.0), 10.0);

        let s = sample(est.update(counters(125_000.0, 0.0), 11.0));
        assert_eq!(s.rate_of(Channel::BytesIn), 1_000_000.0);
        assert_eq!(s.ceiling_of(Channel::BytesIn), 1_000_000.0);
        assert_eq!(s.normalized(Channel::BytesIn), 1.0);
        // Outbound idle: ceiling only decays from the bootstrap value
        assert_eq!(s.ceiling_of(Channel::BytesOut), BOOTSTRAP_CEILING * DEFAULT_DECAY);
        assert_eq!(s.normalized(Channel::BytesOut), 0.0);
    }

    // ==================== Rate Tests ====================

    #[test]
    fn test_error_channels_stay_in_counts() {
        let mut est = RateEstimator::default();
        est.update([0.0; CHANNELS], 0.0);
        let s = sample(est.update([1000.0, 4.0, 500.0, 2.0, 1.0], 2.0));
        assert_eq!(s.rate, [4000.0, 2.0, 2000.0, 1.0, 0.5]);
    }

    #[test]
    fn test_non_monotonic_clock_skips_and_keeps_state() {
        let mut est = RateEstimator::default();
        est.update(counters(0.0, 0.0), 5.0);
        let before = est.ceiling().to_owned();

        assert_eq!(est.update(counters(1e6, 1e6), 5.0), RateUpdate::Skipped);
        assert_eq!(est.update(counters(1e6, 1e6), 4.0), RateUpdate::Skipped);
        assert_eq!(est.ceiling(), &before);

        // The next good sample measures from the last accepted snapshot
        let s = sample(est.update(counters(1000.0, 0.0), 6.0));
        assert_eq!(s.rate_of(Channel::BytesIn), 8000.0);
    }

    #[test]
    fn test_counter_reset_clamps_to_zero() {
        let mut est = RateEstimator::default();
        est.update(counters(10_000.0, 10_000.0), 0.0);
        let s = sample(est.update(counters(100.0, 20_000.0), 1.0));
        assert_eq!(s.rate_of(Channel::BytesIn), 0.0);
        assert_eq!(s.rate_of(Channel::BytesOut), 80_000.0);
    }

    // ==================== Ceiling Tests ====================

    #[test]
    fn test_ceiling_never_increases_without_larger_rate() {
        let mut est = RateEstimator::default();
        est.update(counters(0.0, 0.0), 0.0);
        let mut total = 0.0;
        let mut prev = f64::MAX;
        for tick in 1..200 {
            total += 1000.0;
            let s = sample(est.update(counters(total, 0.0), tick as f64 * 0.25));
            let ceiling = s.ceiling_of(Channel::BytesIn);
            assert!(ceiling <= prev || ceiling == s.rate_of(Channel::BytesIn));
            prev = ceiling;
        }
    }

    #[test]
    fn test_ceiling_converges_to_sustained_rate() {
        let mut est = RateEstimator::default();
        est.update(counters(0.0, 0.0), 0.0);

        // One burst of 1e9 bits/s, then a constant 8000 bits/s
        let mut total = 125_000_000.0;
        let mut now = 1.0;
        est.update(counters(total, 0.0), now);
        let mut last = None;
        for _ in 0..120_000 {
            total += 1000.0;
            now += 1.0;
            last = Some(sample(est.update(counters(total, 0.0), now)));
        }
        let last = last.unwrap();
        assert_eq!(last.ceiling_of(Channel::BytesIn), 8000.0);
        assert_eq!(last.normalized(Channel::BytesIn), 1.0);
    }

    // ==================== Rebase Tests ====================

    #[test]
    fn test_rebase_keeps_ceiling_and_skips_jump() {
        let mut est = RateEstimator::default();
        est.update(counters(0.0, 0.0), 0.0);
        est.update(counters(1000.0, 0.0), 1.0);
        let ceiling = est.ceiling()[Channel::BytesIn.index()];

        // An interface holding 50 GB joins the sum
        est.rebase(counters(5e10, 0.0), 2.0);
        assert_eq!(est.ceiling()[Channel::BytesIn.index()], ceiling);
        assert_eq!(est.current_rate(), &[0.0; CHANNELS]);

        let s = sample(est.update(counters(5e10 + 1000.0, 0.0), 3.0));
        assert_eq!(s.rate_of(Channel::BytesIn), 8000.0);
        assert_eq!(s.ceiling_of(Channel::BytesIn), ceiling * DEFAULT_DECAY);
    }

    #[test]
    fn test_rebase_without_baseline_bootstraps() {
        let mut est = RateEstimator::default();
        assert!(!est.has_baseline());
        est.rebase(counters(9e12, 0.0), 5.0);
        assert!(est.has_baseline());
        assert_eq!(est.ceiling()[Channel::BytesIn.index()], BOOTSTRAP_CEILING);
    }

    // ==================== Health Tests ====================

    #[test]
    fn test_health_follows_error_ceilings() {
        let mut est = RateEstimator::default();
        est.update([0.0; CHANNELS], 0.0);

        let s = sample(est.update([100.0, 0.0, 100.0, 0.0, 0.0], 1.0));
        assert_eq!(s.inbound_health(), LinkHealth::Ok);
        assert_eq!(s.outbound_health(), LinkHealth::Ok);

        let s = sample(est.update([200.0, 3.0, 200.0, 0.0, 0.0], 2.0));
        assert_eq!(s.inbound_health(), LinkHealth::Bad);
        assert_eq!(s.outbound_health(), LinkHealth::Ok);

        // Collisions taint both directions
        let s = sample(est.update([300.0, 3.0, 300.0, 0.0, 1.0], 3.0));
        assert_eq!(s.outbound_health(), LinkHealth::Bad);
        assert_eq!(LinkHealth::Bad.color_key(), "network-bad-color");
    }

    #[test]
    fn test_reset_keeps_decay() {
        let mut est = RateEstimator::new(0.5);
        est.update([0.0; CHANNELS], 0.0);
        est.reset();
        assert!(!est.is_seeded());
        assert_eq!(est.decay(), 0.5);
    }
}
