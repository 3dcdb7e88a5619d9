//! Attachment of a freshly provisioned port to a target namespace.

use std::time::Duration;

use vport_common::{VportError, VportResult};

use crate::config::NetworkState;
use crate::link::LinkOps;

/// How many times to poll for the device before giving up.
const VISIBILITY_ATTEMPTS: usize = 20;
/// Delay between visibility polls.
const VISIBILITY_INTERVAL: Duration = Duration::from_millis(50);

/// Configure the provisioned `port` on the host side and move it into
/// the namespace of process `ns_pid`.
///
/// The switch creates the kernel device asynchronously, so the device
/// is polled into visibility first (bounded, not a fixed sleep). Each
/// subsequent step is fatal on failure; nothing is retried. On success
/// the port name is recorded in `state` for the in-namespace stage.
///
/// # Errors
///
/// Returns [`VportError::DeviceOperationFailed`] if the device never
/// appears or any step fails.
pub async fn attach(
    links: &dyn LinkOps,
    port: &str,
    mtu: u32,
    ns_pid: u32,
    state: &mut NetworkState,
) -> VportResult<()> {
    wait_until_visible(links, port).await?;

    links.set_mtu(port, mtu).await?;
    links.link_up(port).await?;
    links.move_to_netns_pid(port, ns_pid).await?;

    state.ovs_port = Some(port.to_string());
    tracing::info!(port, ns_pid, "Port attached to namespace");
    Ok(())
}

async fn wait_until_visible(links: &dyn LinkOps, port: &str) -> VportResult<()> {
    for attempt in 0..VISIBILITY_ATTEMPTS {
        if links.exists(port).await {
            if attempt > 0 {
                tracing::debug!(port, attempt, "Device became visible");
            }
            return Ok(());
        }
        tokio::time::sleep(VISIBILITY_INTERVAL).await;
    }

    Err(VportError::DeviceOperationFailed {
        device: port.to_string(),
        operation: "wait for device".to_string(),
        message: format!(
            "not visible after {} polls",
            VISIBILITY_ATTEMPTS
        ),
    })
}
