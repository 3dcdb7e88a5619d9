//! Link-control primitives.
//!
//! Thin wrappers over `ip(8)`, one operation per call, each atomic at
//! the single-operation level. The [`LinkOps`] trait is the seam the
//! attachment and finalization sequences are tested through.

use async_trait::async_trait;
use tokio::process::Command;

use vport_common::{VportError, VportResult};

/// Single-operation link control.
#[async_trait]
pub trait LinkOps: Send + Sync {
    /// Whether the kernel currently exposes `device`.
    async fn exists(&self, device: &str) -> bool;

    /// Set the device MTU.
    async fn set_mtu(&self, device: &str, mtu: u32) -> VportResult<()>;

    /// Bring the device administratively up.
    async fn link_up(&self, device: &str) -> VportResult<()>;

    /// Bring the device administratively down.
    async fn link_down(&self, device: &str) -> VportResult<()>;

    /// Rename the device. The device must be down.
    async fn rename(&self, device: &str, new_name: &str) -> VportResult<()>;

    /// Set the device MAC address.
    async fn set_mac(&self, device: &str, mac: &str) -> VportResult<()>;

    /// Add an address in CIDR notation to the device.
    async fn add_address(&self, device: &str, cidr: &str) -> VportResult<()>;

    /// Install `gateway` as the default route out of `device`.
    async fn set_default_gateway(&self, device: &str, gateway: &str) -> VportResult<()>;

    /// Move the device into the network namespace of process `pid`.
    async fn move_to_netns_pid(&self, device: &str, pid: u32) -> VportResult<()>;
}

/// [`LinkOps`] backed by the `ip` command.
#[derive(Debug, Default, Clone, Copy)]
pub struct IpCommand;

impl IpCommand {
    async fn run(&self, device: &str, operation: &str, args: &[&str]) -> VportResult<()> {
        let output = Command::new("ip").args(args).output().await.map_err(|e| {
            VportError::DeviceOperationFailed {
                device: device.to_string(),
                operation: operation.to_string(),
                message: format!("failed to execute ip: {e}"),
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VportError::DeviceOperationFailed {
                device: device.to_string(),
                operation: operation.to_string(),
                message: format!("{} ({})", stderr.trim(), output.status),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl LinkOps for IpCommand {
    async fn exists(&self, device: &str) -> bool {
        Command::new("ip")
            .args(["link", "show", device])
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    async fn set_mtu(&self, device: &str, mtu: u32) -> VportResult<()> {
        tracing::debug!(device, mtu, "Setting MTU");
        let mtu = mtu.to_string();
        self.run(
            device,
            &format!("set mtu {mtu}"),
            &["link", "set", "dev", device, "mtu", &mtu],
        )
        .await
    }

    async fn link_up(&self, device: &str) -> VportResult<()> {
        tracing::debug!(device, "Bringing link up");
        self.run(device, "link up", &["link", "set", device, "up"])
            .await
    }

    async fn link_down(&self, device: &str) -> VportResult<()> {
        tracing::debug!(device, "Bringing link down");
        self.run(device, "link down", &["link", "set", device, "down"])
            .await
    }

    async fn rename(&self, device: &str, new_name: &str) -> VportResult<()> {
        tracing::debug!(device, new_name, "Renaming link");
        self.run(
            device,
            &format!("rename to {new_name}"),
            &["link", "set", device, "name", new_name],
        )
        .await
    }

    async fn set_mac(&self, device: &str, mac: &str) -> VportResult<()> {
        tracing::debug!(device, mac, "Setting MAC address");
        self.run(
            device,
            &format!("set mac {mac}"),
            &["link", "set", device, "address", mac],
        )
        .await
    }

    async fn add_address(&self, device: &str, cidr: &str) -> VportResult<()> {
        tracing::debug!(device, cidr, "Adding address");
        self.run(
            device,
            &format!("add address {cidr}"),
            &["addr", "add", cidr, "dev", device],
        )
        .await
    }

    async fn set_default_gateway(&self, device: &str, gateway: &str) -> VportResult<()> {
        tracing::debug!(device, gateway, "Installing default route");
        let operation = format!("set default gateway {gateway}");
        if gateway.contains(':') {
            self.run(
                device,
                &operation,
                &["-6", "route", "replace", "default", "via", gateway, "dev", device],
            )
            .await
        } else {
            self.run(
                device,
                &operation,
                &["route", "replace", "default", "via", gateway, "dev", device],
            )
            .await
        }
    }

    async fn move_to_netns_pid(&self, device: &str, pid: u32) -> VportResult<()> {
        tracing::debug!(device, pid, "Moving link into namespace");
        let pid = pid.to_string();
        self.run(
            device,
            "move to netns",
            &["link", "set", device, "netns", &pid],
        )
        .await
    }
}
