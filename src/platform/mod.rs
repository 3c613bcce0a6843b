//! Platform-specific system information
//!
//! The panel never reads the OS directly: every tick goes through a
//! `MetricsProvider`, which returns plain counter snapshots. On Linux the
//! provider reads procfs and sysfs; tests use the scripted `FakeProvider`.

use thiserror::Error;

use crate::core::CHANNELS;

mod fake;
#[cfg(target_os = "linux")]
mod linux;

pub use fake::*;
#[cfg(target_os = "linux")]
pub use linux::*;

/// Errors raised while acquiring counters
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The backend lacks this capability altogether (e.g. no network
    /// device enumeration on this host)
    #[error("{what} unavailable")]
    Unavailable { what: &'static str },

    #[error("failed to parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(target_os = "linux")]
    #[error(transparent)]
    Proc(#[from] procfs::ProcError),
}

/// Cumulative tick counters of every core
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuSnapshot {
    /// Total ticks per core
    pub total: Vec<u64>,
    /// Idle ticks per core
    pub idle: Vec<u64>,
}

impl CpuSnapshot {
    pub fn cores(&self) -> usize {
        self.total.len().min(self.idle.len())
    }
}

/// Memory counters in bytes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySnapshot {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub buffers: u64,
    pub shared: u64,
    pub cached: u64,
    /// Not every kernel/provider reports slab
    pub slab: Option<u64>,
    pub locked: u64,
}

impl MemorySnapshot {
    /// Memory used by applications: used minus buffers and page cache
    pub fn user(&self) -> u64 {
        self.used
            .saturating_sub(self.buffers)
            .saturating_sub(self.cached)
    }
}

/// Swap counters in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SwapSnapshot {
    pub total: u64,
    pub used: u64,
}

/// Operational state of a network device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceState {
    #[default]
    Unknown,
    Unmanaged,
    Unavailable,
    Disconnected,
    Connecting,
    /// Up and eligible for traffic accounting
    Activated,
}

/// Cumulative traffic counters of one interface
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NetCounters {
    pub bytes_in: u64,
    pub errors_in: u64,
    pub bytes_out: u64,
    pub errors_out: u64,
    pub collisions: u64,
}

impl NetCounters {
    /// Counters in rate-estimator channel order
    pub fn channels(&self) -> [f64; CHANNELS] {
        [
            self.bytes_in as f64,
            self.errors_in as f64,
            self.bytes_out as f64,
            self.errors_out as f64,
            self.collisions as f64,
        ]
    }

    pub fn accumulate(&mut self, other: &NetCounters) {
        self.bytes_in += other.bytes_in;
        self.errors_in += other.errors_in;
        self.bytes_out += other.bytes_out;
        self.errors_out += other.errors_out;
        self.collisions += other.collisions;
    }
}

/// One network interface as seen by the provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetInterface {
    pub name: String,
    pub state: DeviceState,
    /// Link speed in Mb/s, when known
    pub speed_mbps: Option<u64>,
    pub counters: NetCounters,
}

impl NetInterface {
    pub fn is_activated(&self) -> bool {
        self.state == DeviceState::Activated
    }
}

/// Counters summed over the activated interfaces
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetTotals {
    pub counters: NetCounters,
    /// Sum of known link speeds (Mb/s)
    pub link_speed_mbps: u64,
    pub activated: usize,
}

impl NetTotals {
    /// Sum every activated interface; others contribute nothing
    pub fn from_interfaces(interfaces: &[NetInterface]) -> Self {
        let mut totals = NetTotals::default();
        for iface in interfaces.iter().filter(|i| i.is_activated()) {
            totals.counters.accumulate(&iface.counters);
            totals.link_speed_mbps += iface.speed_mbps.unwrap_or(0);
            totals.activated += 1;
        }
        totals
    }
}

/// Source of raw counters, called once per tick
pub trait MetricsProvider {
    fn cpu(&mut self) -> Result<CpuSnapshot, ProviderError>;
    fn memory(&mut self) -> Result<MemorySnapshot, ProviderError>;
    fn swap(&mut self) -> Result<SwapSnapshot, ProviderError>;
    fn network_interfaces(&mut self) -> Result<Vec<NetInterface>, ProviderError>;
}

/// Provider for the current platform
#[cfg(target_os = "linux")]
pub fn default_provider() -> Box<dyn MetricsProvider> {
    Box::new(LinuxProvider::new())
}

/// Provider for the current platform
#[cfg(not(target_os = "linux"))]
pub fn default_provider() -> Box<dyn MetricsProvider> {
    Box::new(FakeProvider::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iface(name: &str, state: DeviceState, bytes_in: u64, speed: Option<u64>) -> NetInterface {
        NetInterface {
            name: name.to_string(),
            state,
            speed_mbps: speed,
            counters: NetCounters {
                bytes_in,
                errors_in: 1,
                bytes_out: bytes_in * 2,
                errors_out: 0,
                collisions: 0,
            },
        }
    }

    #[test]
    fn test_totals_only_count_activated_interfaces() {
        let interfaces = vec![
            iface("eth0", DeviceState::Activated, 100, Some(1000)),
            iface("wlan0", DeviceState::Disconnected, 5000, Some(300)),
            iface("usb0", DeviceState::Activated, 50, None),
            iface("lo", DeviceState::Unmanaged, 9999, None),
        ];
        let totals = NetTotals::from_interfaces(&interfaces);
        assert_eq!(totals.activated, 2);
        assert_eq!(totals.counters.bytes_in, 150);
        assert_eq!(totals.counters.bytes_out, 300);
        assert_eq!(totals.counters.errors_in, 2);
        assert_eq!(totals.link_speed_mbps, 1000);
    }

    #[test]
    fn test_totals_of_no_interfaces() {
        let totals = NetTotals::from_interfaces(&[]);
        assert_eq!(totals, NetTotals::default());
        assert_eq!(totals.counters.channels(), [0.0; CHANNELS]);
    }

    #[test]
    fn test_memory_user_saturates() {
        let mem = MemorySnapshot {
            used: 100,
            buffers: 80,
            cached: 80,
            ..MemorySnapshot::default()
        };
        assert_eq!(mem.user(), 0);
    }

    #[test]
    fn test_cpu_snapshot_cores_uses_shortest_vector() {
        let snap = CpuSnapshot {
            total: vec![1, 2, 3],
            idle: vec![1, 2],
        };
        assert_eq!(snap.cores(), 2);
    }
}
