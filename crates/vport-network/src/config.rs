//! Handoff structures between provisioning stages.

use serde::{Deserialize, Serialize};

/// Caller-supplied network identity for one namespace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// The pre-existing bridge the port is attached to.
    pub bridge: String,
    /// Prefix for the generated port name.
    pub veth_prefix: String,
    /// MTU applied on both sides of the namespace boundary.
    pub mtu: u32,
    /// MAC address for the canonical device, if pinned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    /// Primary address in CIDR notation. Required by finalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// IPv6 address in CIDR notation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_address: Option<String>,
    /// Default gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    /// IPv6 default gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_gateway: Option<String>,
}

/// State produced by attachment and consumed by finalization.
///
/// Persisted between invocations so the in-namespace stage can find
/// the device without re-deriving its generated name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkState {
    /// Name the provisioned port was created under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ovs_port: Option<String>,
}
