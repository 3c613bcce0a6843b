//! Linux platform implementation
//!
//! CPU, memory and swap come from /proc through the procfs crate; network
//! counters from /proc/net/dev, with link state and speed from
//! /sys/class/net.

use std::fs;
use std::path::{Path, PathBuf};

use procfs::{CpuTime, Current, CurrentSI, KernelStats, Meminfo};

use super::{
    CpuSnapshot, DeviceState, MemorySnapshot, MetricsProvider, NetCounters, NetInterface,
    ProviderError, SwapSnapshot,
};

const SYS_CLASS_NET: &str = "/sys/class/net";

/// Reads counters from procfs and sysfs
#[derive(Debug)]
pub struct LinuxProvider {
    sys_class_net: PathBuf,
}

impl Default for LinuxProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LinuxProvider {
    pub fn new() -> Self {
        LinuxProvider {
            sys_class_net: PathBuf::from(SYS_CLASS_NET),
        }
    }

    fn interface_state(&self, name: &str) -> DeviceState {
        read_trimmed(&self.sys_class_net.join(name).join("operstate"))
            .map(|s| parse_operstate(&s))
            .unwrap_or(DeviceState::Unknown)
    }

    fn interface_speed(&self, name: &str) -> Option<u64> {
        read_trimmed(&self.sys_class_net.join(name).join("speed")).and_then(|s| parse_speed(&s))
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

/// Map a sysfs operstate onto a device state
pub(crate) fn parse_operstate(state: &str) -> DeviceState {
    match state {
        "up" => DeviceState::Activated,
        "dormant" => DeviceState::Connecting,
        "down" | "lowerlayerdown" => DeviceState::Disconnected,
        "notpresent" => DeviceState::Unavailable,
        // Loopback and virtual devices report "unknown"
        "unknown" => DeviceState::Unmanaged,
        _ => DeviceState::Unknown,
    }
}

/// Parse a sysfs speed (Mb/s); unknown links report -1
pub(crate) fn parse_speed(speed: &str) -> Option<u64> {
    speed.parse::<i64>().ok().filter(|v| *v > 0).map(|v| v as u64)
}

/// Total and idle ticks of one core
fn cpu_ticks(cpu: &CpuTime) -> (u64, u64) {
    let total = cpu.user
        + cpu.nice
        + cpu.system
        + cpu.idle
        + cpu.iowait.unwrap_or(0)
        + cpu.irq.unwrap_or(0)
        + cpu.softirq.unwrap_or(0)
        + cpu.steal.unwrap_or(0);
    (total, cpu.idle)
}

impl MetricsProvider for LinuxProvider {
    fn cpu(&mut self) -> Result<CpuSnapshot, ProviderError> {
        let stats = KernelStats::current()?;
        let (total, idle) = stats.cpu_time.iter().map(cpu_ticks).unzip();
        Ok(CpuSnapshot { total, idle })
    }

    fn memory(&mut self) -> Result<MemorySnapshot, ProviderError> {
        // procfs reports bytes
        let info = Meminfo::current()?;
        Ok(MemorySnapshot {
            total: info.mem_total,
            used: info.mem_total.saturating_sub(info.mem_free),
            free: info.mem_free,
            buffers: info.buffers,
            shared: info.shmem.unwrap_or(0),
            cached: info.cached,
            slab: Some(info.slab),
            locked: info.mlocked.unwrap_or(0),
        })
    }

    fn swap(&mut self) -> Result<SwapSnapshot, ProviderError> {
        let info = Meminfo::current()?;
        Ok(SwapSnapshot {
            total: info.swap_total,
            used: info.swap_total.saturating_sub(info.swap_free),
        })
    }

    fn network_interfaces(&mut self) -> Result<Vec<NetInterface>, ProviderError> {
        let devices = procfs::net::dev_status()?;

        let mut interfaces: Vec<NetInterface> = devices
            .into_iter()
            .map(|(name, status)| NetInterface {
                state: self.interface_state(&name),
                speed_mbps: self.interface_speed(&name),
                counters: NetCounters {
                    bytes_in: status.recv_bytes,
                    errors_in: status.recv_errs,
                    bytes_out: status.sent_bytes,
                    errors_out: status.sent_errs,
                    collisions: status.sent_colls,
                },
                name,
            })
            .collect();
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(interfaces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_operstate() {
        assert_eq!(parse_operstate("up"), DeviceState::Activated);
        assert_eq!(parse_operstate("down"), DeviceState::Disconnected);
        assert_eq!(parse_operstate("unknown"), DeviceState::Unmanaged);
        assert_eq!(parse_operstate("dormant"), DeviceState::Connecting);
        assert_eq!(parse_operstate("weird"), DeviceState::Unknown);
    }

    #[test]
    fn test_parse_speed() {
        assert_eq!(parse_speed("1000"), Some(1000));
        assert_eq!(parse_speed("-1"), None);
        assert_eq!(parse_speed("0"), None);
        assert_eq!(parse_speed(""), None);
    }

    #[test]
    fn test_interface_state_from_sysfs_tree() {
        let dir = tempfile::tempdir().unwrap();
        let eth = dir.path().join("eth0");
        fs::create_dir_all(&eth).unwrap();
        fs::write(eth.join("operstate"), "up\n").unwrap();
        fs::write(eth.join("speed"), "2500\n").unwrap();

        let provider = LinuxProvider {
            sys_class_net: dir.path().to_path_buf(),
        };
        assert_eq!(provider.interface_state("eth0"), DeviceState::Activated);
        assert_eq!(provider.interface_speed("eth0"), Some(2500));
        assert_eq!(provider.interface_state("missing0"), DeviceState::Unknown);
        assert_eq!(provider.interface_speed("missing0"), None);
    }

    #[test]
    fn test_memory_reads_host_meminfo() {
        let mut provider = LinuxProvider::new();
        let mem = provider.memory().unwrap();
        assert!(mem.total > 0);
        assert!(mem.free <= mem.total);
        assert_eq!(mem.used, mem.total - mem.free);
        assert!(mem.slab.is_some());
    }

    #[test]
    fn test_swap_used_within_total() {
        let mut provider = LinuxProvider::new();
        let swap = provider.swap().unwrap();
        assert!(swap.used <= swap.total);
    }
}
