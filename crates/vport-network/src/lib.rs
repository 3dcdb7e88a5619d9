//! # vport-network
//!
//! Link control and namespace plumbing for vport.
//!
//! This crate finishes what the OVSDB transaction starts: once the
//! switch has created an internal port, [`attach`] moves the kernel
//! device into the target namespace and [`finalize`] gives it its
//! canonical name, addresses, and routes inside that namespace.

#![warn(missing_docs)]

pub mod attach;
pub mod config;
pub mod finalize;
pub mod link;

pub use attach::attach;
pub use config::{NetworkConfig, NetworkState};
pub use finalize::{DEFAULT_DEVICE, finalize};
pub use link::{IpCommand, LinkOps};

#[cfg(test)]
pub(crate) mod testing {
    //! A recording LinkOps fake shared by the attach/finalize tests.

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use vport_common::{VportError, VportResult};

    use crate::link::LinkOps;

    /// Records every link operation in call order. `exists` reports
    /// the device as absent for the first `invisible_polls` calls.
    #[derive(Default)]
    pub struct Recorder {
        calls: Mutex<Vec<String>>,
        invisible_polls: AtomicUsize,
        fail_on: Mutex<Option<String>>,
    }

    impl Recorder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn invisible_for(polls: usize) -> Self {
            let recorder = Self::default();
            recorder.invisible_polls.store(polls, Ordering::SeqCst);
            recorder
        }

        /// Make the named operation fail when reached.
        pub fn fail_on(&self, call_prefix: &str) {
            *self.fail_on.lock().unwrap() = Some(call_prefix.to_string());
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, device: &str, call: String) -> VportResult<()> {
            let failing = self
                .fail_on
                .lock()
                .unwrap()
                .as_ref()
                .is_some_and(|prefix| call.starts_with(prefix.as_str()));
            self.calls.lock().unwrap().push(call.clone());
            if failing {
                return Err(VportError::DeviceOperationFailed {
                    device: device.to_string(),
                    operation: call,
                    message: "injected failure".to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl LinkOps for Recorder {
        async fn exists(&self, _device: &str) -> bool {
            let remaining = self.invisible_polls.load(Ordering::SeqCst);
            if remaining > 0 {
                self.invisible_polls.store(remaining - 1, Ordering::SeqCst);
                return false;
            }
            true
        }

        async fn set_mtu(&self, device: &str, mtu: u32) -> VportResult<()> {
            self.record(device, format!("set_mtu {device} {mtu}"))
        }

        async fn link_up(&self, device: &str) -> VportResult<()> {
            self.record(device, format!("up {device}"))
        }

        async fn link_down(&self, device: &str) -> VportResult<()> {
            self.record(device, format!("down {device}"))
        }

        async fn rename(&self, device: &str, new_name: &str) -> VportResult<()> {
            self.record(device, format!("rename {device} {new_name}"))
        }

        async fn set_mac(&self, device: &str, mac: &str) -> VportResult<()> {
            self.record(device, format!("set_mac {device} {mac}"))
        }

        async fn add_address(&self, device: &str, cidr: &str) -> VportResult<()> {
            self.record(device, format!("add_address {device} {cidr}"))
        }

        async fn set_default_gateway(&self, device: &str, gateway: &str) -> VportResult<()> {
            self.record(device, format!("set_default_gateway {device} {gateway}"))
        }

        async fn move_to_netns_pid(&self, device: &str, pid: u32) -> VportResult<()> {
            self.record(device, format!("move_to_netns {device} {pid}"))
        }
    }
}
