//! Scripted metrics provider
//!
//! Clones share state, so a test can hand one clone to the panel and keep
//! another to move the counters between ticks.

use std::cell::RefCell;
use std::rc::Rc;

use super::{
    CpuSnapshot, MemorySnapshot, MetricsProvider, NetInterface, ProviderError, SwapSnapshot,
};

#[derive(Debug, Default)]
struct FakeState {
    cpu: CpuSnapshot,
    memory: MemorySnapshot,
    swap: SwapSnapshot,
    interfaces: Vec<NetInterface>,
    interfaces_unavailable: bool,
    fail_all: bool,
    calls: usize,
}

/// In-memory provider whose snapshots are set by hand
#[derive(Debug, Clone, Default)]
pub struct FakeProvider {
    state: Rc<RefCell<FakeState>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        FakeProvider::default()
    }

    pub fn set_cpu(&self, total: Vec<u64>, idle: Vec<u64>) {
        self.state.borrow_mut().cpu = CpuSnapshot { total, idle };
    }

    pub fn set_memory(&self, memory: MemorySnapshot) {
        self.state.borrow_mut().memory = memory;
    }

    pub fn set_swap(&self, used: u64, total: u64) {
        self.state.borrow_mut().swap = SwapSnapshot { total, used };
    }

    pub fn set_interfaces(&self, interfaces: Vec<NetInterface>) {
        self.state.borrow_mut().interfaces = interfaces;
    }

    /// Mutate one interface in place (by name)
    pub fn update_interface(&self, name: &str, f: impl FnOnce(&mut NetInterface)) {
        if let Some(iface) = self
            .state
            .borrow_mut()
            .interfaces
            .iter_mut()
            .find(|i| i.name == name)
        {
            f(iface);
        }
    }

    /// Make interface enumeration fail, as without a device manager
    pub fn set_interfaces_unavailable(&self, unavailable: bool) {
        self.state.borrow_mut().interfaces_unavailable = unavailable;
    }

    /// Make every call fail with an IO error
    pub fn set_failing(&self, failing: bool) {
        self.state.borrow_mut().fail_all = failing;
    }

    /// Number of provider calls so far
    pub fn calls(&self) -> usize {
        self.state.borrow().calls
    }

    fn begin_call(&self) -> Result<(), ProviderError> {
        let mut state = self.state.borrow_mut();
        state.calls += 1;
        if state.fail_all {
            return Err(ProviderError::Io(std::io::Error::other("scripted failure")));
        }
        Ok(())
    }
}

impl MetricsProvider for FakeProvider {
    fn cpu(&mut self) -> Result<CpuSnapshot, ProviderError> {
        self.begin_call()?;
        Ok(self.state.borrow().cpu.clone())
    }

    fn memory(&mut self) -> Result<MemorySnapshot, ProviderError> {
        self.begin_call()?;
        Ok(self.state.borrow().memory.clone())
    }

    fn swap(&mut self) -> Result<SwapSnapshot, ProviderError> {
        self.begin_call()?;
        Ok(self.state.borrow().swap)
    }

    fn network_interfaces(&mut self) -> Result<Vec<NetInterface>, ProviderError> {
        self.begin_call()?;
        let state = self.state.borrow();
        if state.interfaces_unavailable {
            return Err(ProviderError::Unavailable {
                what: "network device enumeration",
            });
        }
        Ok(state.interfaces.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::DeviceState;

    #[test]
    fn test_clones_share_state() {
        let fake = FakeProvider::new();
        let mut provider = fake.clone();

        fake.set_swap(600, 1000);
        assert_eq!(
            provider.swap().unwrap(),
            SwapSnapshot {
                total: 1000,
                used: 600
            }
        );
        assert_eq!(fake.calls(), 1);
    }

    #[test]
    fn test_failures_are_scripted() {
        let fake = FakeProvider::new();
        let mut provider = fake.clone();

        fake.set_interfaces_unavailable(true);
        assert!(matches!(
            provider.network_interfaces(),
            Err(ProviderError::Unavailable { .. })
        ));

        fake.set_failing(true);
        assert!(matches!(provider.cpu(), Err(ProviderError::Io(_))));
    }

    #[test]
    fn test_update_interface_by_name() {
        let fake = FakeProvider::new();
        fake.set_interfaces(vec![NetInterface {
            name: "eth0".to_string(),
            ..NetInterface::default()
        }]);
        fake.update_interface("eth0", |i| {
            i.state = DeviceState::Activated;
            i.counters.bytes_in = 42;
        });

        let mut provider = fake.clone();
        let ifaces = provider.network_interfaces().unwrap();
        assert!(ifaces[0].is_activated());
        assert_eq!(ifaces[0].counters.bytes_in, 42);
    }
}
