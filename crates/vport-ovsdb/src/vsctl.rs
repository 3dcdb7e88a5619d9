//! Fallback provisioning through `ovs-vsctl`.
//!
//! Used when the database socket is not reachable; same semantics as
//! the transactional path, with the switch's own tooling doing the
//! database work.

use tokio::process::Command;

use vport_common::{VportError, VportResult, generate_device_name};

/// Create an internal port on `bridge` by invoking `ovs-vsctl`.
///
/// # Errors
///
/// Returns [`VportError::DeviceOperationFailed`] if the command cannot
/// be spawned or exits unsuccessfully.
pub async fn create_internal_port(prefix: &str, bridge: &str) -> VportResult<String> {
    let name = generate_device_name(prefix)?;

    let output = Command::new("ovs-vsctl")
        .args([
            "add-port", bridge, &name, "--", "set", "Interface", &name, "type=internal",
        ])
        .output()
        .await
        .map_err(|e| VportError::DeviceOperationFailed {
            device: name.clone(),
            operation: format!("ovs-vsctl add-port {bridge}"),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VportError::DeviceOperationFailed {
            device: name,
            operation: format!("ovs-vsctl add-port {bridge}"),
            message: format!("{} ({})", stderr.trim(), output.status),
        });
    }

    tracing::info!(port = %name, bridge, "Internal port created via ovs-vsctl");
    Ok(name)
}
