//! Network strategies.
//!
//! The OVS strategy uses a bridge and creates an internal port that is
//! placed inside the container's namespace. Creation talks to the
//! switch; initialization runs later, inside the namespace.

use vport_common::{VportError, VportResult};
use vport_network::{IpCommand, LinkOps, NetworkConfig, NetworkState, attach, finalize};
use vport_ovsdb::{Session, provision, vsctl};

/// The OVS network strategy.
pub struct Ovs<L = IpCommand> {
    links: L,
}

impl Ovs<IpCommand> {
    /// Strategy using `ip(8)` for link control.
    #[must_use]
    pub fn new() -> Self {
        Self { links: IpCommand }
    }
}

impl Default for Ovs<IpCommand> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: LinkOps> Ovs<L> {
    /// Strategy with custom link control.
    pub fn with_links(links: L) -> Self {
        Self { links }
    }

    /// Provision an internal port on the configured bridge and attach
    /// it to the namespace of process `ns_pid`, recording the port
    /// name in `state`.
    ///
    /// # Errors
    ///
    /// Fails fast on invalid configuration, a failed transaction, or a
    /// failed attachment step; no partial success is reported.
    pub async fn create(
        &self,
        session: &Session,
        config: &NetworkConfig,
        ns_pid: u32,
        state: &mut NetworkState,
    ) -> VportResult<()> {
        validate(config)?;
        let port =
            provision::create_internal_port(session, &config.veth_prefix, &config.bridge).await?;
        attach(&self.links, &port, config.mtu, ns_pid, state).await
    }

    /// [`Ovs::create`] through the `ovs-vsctl` fallback, for hosts
    /// where the database socket is not reachable.
    ///
    /// # Errors
    ///
    /// Same failure behavior as [`Ovs::create`].
    pub async fn create_with_vsctl(
        &self,
        config: &NetworkConfig,
        ns_pid: u32,
        state: &mut NetworkState,
    ) -> VportResult<()> {
        validate(config)?;
        let port = vsctl::create_internal_port(&config.veth_prefix, &config.bridge).await?;
        attach(&self.links, &port, config.mtu, ns_pid, state).await
    }

    /// Finish configuring the moved port inside the target namespace.
    ///
    /// # Errors
    ///
    /// Fails if the state carries no port name, the config no primary
    /// address, or any device step fails.
    pub async fn initialize(
        &self,
        config: &NetworkConfig,
        state: &NetworkState,
    ) -> VportResult<()> {
        finalize(&self.links, config, state).await
    }
}

fn validate(config: &NetworkConfig) -> VportResult<()> {
    if config.bridge.is_empty() {
        return Err(VportError::Config {
            message: "bridge is not specified".to_string(),
        });
    }
    if config.veth_prefix.is_empty() {
        return Err(VportError::Config {
            message: "veth prefix is not specified".to_string(),
        });
    }
    Ok(())
}
