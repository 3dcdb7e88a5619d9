//! In-namespace finalization of the moved port.

use vport_common::{VportError, VportResult};

use crate::config::{NetworkConfig, NetworkState};
use crate::link::LinkOps;

/// Canonical device name inside the namespace.
pub const DEFAULT_DEVICE: &str = "eth0";

/// Give the moved port its in-namespace identity.
///
/// Must run inside the target namespace. The recorded port is brought
/// down, renamed to [`DEFAULT_DEVICE`], addressed, and brought back up;
/// MAC and gateway steps run only when configured. Each step is fatal
/// on failure.
///
/// # Errors
///
/// Returns [`VportError::Config`] if the state carries no port name or
/// the config no primary address, and the failing step's
/// [`VportError::DeviceOperationFailed`] otherwise.
pub async fn finalize(
    links: &dyn LinkOps,
    config: &NetworkConfig,
    state: &NetworkState,
) -> VportResult<()> {
    let port = state.ovs_port.as_deref().ok_or_else(|| VportError::Config {
        message: "no provisioned port recorded in network state".to_string(),
    })?;
    let address = config.address.as_deref().ok_or_else(|| VportError::Config {
        message: "address is not specified".to_string(),
    })?;

    links.link_down(port).await?;
    links.rename(port, DEFAULT_DEVICE).await?;

    if let Some(mac) = config.mac_address.as_deref() {
        links.set_mac(DEFAULT_DEVICE, mac).await?;
    }
    links.add_address(DEFAULT_DEVICE, address).await?;
    if let Some(ipv6) = config.ipv6_address.as_deref() {
        links.add_address(DEFAULT_DEVICE, ipv6).await?;
    }
    links.set_mtu(DEFAULT_DEVICE, config.mtu).await?;
    links.link_up(DEFAULT_DEVICE).await?;

    if let Some(gateway) = config.gateway.as_deref() {
        links.set_default_gateway(DEFAULT_DEVICE, gateway).await?;
    }
    if let Some(gateway) = config.ipv6_gateway.as_deref() {
        links.set_default_gateway(DEFAULT_DEVICE, gateway).await?;
    }

    tracing::info!(port, device = DEFAULT_DEVICE, "Namespace network finalized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Recorder;

    fn config() -> NetworkConfig {
        NetworkConfig {
            bridge: "br0".to_string(),
            veth_prefix: "veth".to_string(),
            mtu: 1500,
            mac_address: Some("aa:bb:cc:dd:ee:ff".to_string()),
            address: Some("10.0.0.5/24".to_string()),
            ipv6_address: None,
            gateway: Some("10.0.0.1".to_string()),
            ipv6_gateway: None,
        }
    }

    fn state() -> NetworkState {
        NetworkState {
            ovs_port: Some("veth1a2b3c4".to_string()),
        }
    }

    #[tokio::test]
    async fn full_config_runs_every_step_in_order() {
        let links = Recorder::new();
        finalize(&links, &config(), &state()).await.unwrap();

        assert_eq!(
            links.calls(),
            vec![
                "down veth1a2b3c4",
                "rename veth1a2b3c4 eth0",
                "set_mac eth0 aa:bb:cc:dd:ee:ff",
                "add_address eth0 10.0.0.5/24",
                "set_mtu eth0 1500",
                "up eth0",
                "set_default_gateway eth0 10.0.0.1",
            ]
        );
    }

    #[tokio::test]
    async fn omitted_mac_and_gateway_skip_exactly_those_steps() {
        let links = Recorder::new();
        let mut config = config();
        config.mac_address = None;
        config.gateway = None;

        finalize(&links, &config, &state()).await.unwrap();

        assert_eq!(
            links.calls(),
            vec![
                "down veth1a2b3c4",
                "rename veth1a2b3c4 eth0",
                "add_address eth0 10.0.0.5/24",
                "set_mtu eth0 1500",
                "up eth0",
            ]
        );
    }

    #[tokio::test]
    async fn ipv6_fields_add_address_and_route() {
        let links = Recorder::new();
        let mut config = config();
        config.ipv6_address = Some("fd00::5/64".to_string());
        config.ipv6_gateway = Some("fd00::1".to_string());

        finalize(&links, &config, &state()).await.unwrap();

        let calls = links.calls();
        assert!(calls.contains(&"add_address eth0 fd00::5/64".to_string()));
        assert_eq!(
            calls.last().unwrap(),
            "set_default_gateway eth0 fd00::1"
        );
    }

    #[tokio::test]
    async fn missing_state_is_a_config_error() {
        let links = Recorder::new();
        let err = finalize(&links, &config(), &NetworkState::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VportError::Config { .. }));
        assert!(links.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_address_is_a_config_error() {
        let links = Recorder::new();
        let mut config = config();
        config.address = None;

        let err = finalize(&links, &config, &state()).await.unwrap_err();
        assert!(matches!(err, VportError::Config { .. }));
        assert!(links.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_rename_stops_the_sequence() {
        let links = Recorder::new();
        links.fail_on("rename");

        let err = finalize(&links, &config(), &state()).await.unwrap_err();
        match err {
            VportError::DeviceOperationFailed { device, operation, .. } => {
                assert_eq!(device, "veth1a2b3c4");
                assert!(operation.starts_with("rename"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(links.calls(), vec!["down veth1a2b3c4", "rename veth1a2b3c4 eth0"]);
    }
}
