//! CLI command definitions and handlers.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use vport_network::{NetworkConfig, NetworkState};
use vport_ovsdb::Session;

use crate::strategy::Ovs;

/// vport - OVS port provisioning for network namespaces
#[derive(Parser)]
#[command(name = "vport")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// OVSDB endpoint
    #[arg(
        long,
        global = true,
        env = "VPORT_DB",
        default_value = vport_ovsdb::DEFAULT_ENDPOINT
    )]
    pub db: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Provisioning commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Create an internal port on a bridge and attach it to a namespace
    Provision {
        /// Bridge the port is linked into; must already exist
        #[arg(long)]
        bridge: String,

        /// Prefix for the generated port name
        #[arg(long, default_value = "veth")]
        prefix: String,

        /// MTU for the new port
        #[arg(long, default_value_t = 1500)]
        mtu: u32,

        /// Process whose network namespace receives the port
        #[arg(long)]
        pid: u32,

        /// Where the resulting network state is written
        #[arg(long, default_value = "network-state.json")]
        state_file: PathBuf,

        /// Shell out to ovs-vsctl instead of speaking the database protocol
        #[arg(long)]
        vsctl: bool,
    },

    /// Configure the moved port inside its namespace
    Finalize {
        /// Network state written by a prior provision
        #[arg(long, default_value = "network-state.json")]
        state_file: PathBuf,

        /// Primary address in CIDR notation
        #[arg(long)]
        address: String,

        /// IPv6 address in CIDR notation
        #[arg(long)]
        ipv6_address: Option<String>,

        /// MAC address for the canonical device
        #[arg(long)]
        mac: Option<String>,

        /// Default gateway
        #[arg(long)]
        gateway: Option<String>,

        /// IPv6 default gateway
        #[arg(long)]
        ipv6_gateway: Option<String>,

        /// MTU inside the namespace
        #[arg(long, default_value_t = 1500)]
        mtu: u32,
    },
}

impl Cli {
    /// Run the selected command.
    ///
    /// # Errors
    ///
    /// Propagates provisioning and I/O failures to the binary edge.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Provision {
                bridge,
                prefix,
                mtu,
                pid,
                state_file,
                vsctl,
            } => {
                let config = NetworkConfig {
                    bridge,
                    veth_prefix: prefix,
                    mtu,
                    ..NetworkConfig::default()
                };
                let mut state = NetworkState::default();
                let strategy = Ovs::new();

                if vsctl {
                    strategy.create_with_vsctl(&config, pid, &mut state).await?;
                } else {
                    let session = Session::connect(&self.db).await?;
                    strategy.create(&session, &config, pid, &mut state).await?;
                }

                tokio::fs::write(&state_file, serde_json::to_vec_pretty(&state)?).await?;
                tracing::debug!(state_file = %state_file.display(), "Network state written");
                if let Some(port) = &state.ovs_port {
                    println!("{port}");
                }
                Ok(())
            }

            Commands::Finalize {
                state_file,
                address,
                ipv6_address,
                mac,
                gateway,
                ipv6_gateway,
                mtu,
            } => {
                let raw = tokio::fs::read(&state_file).await?;
                let state: NetworkState = serde_json::from_slice(&raw)?;
                let config = NetworkConfig {
                    mtu,
                    mac_address: mac,
                    address: Some(address),
                    ipv6_address,
                    gateway,
                    ipv6_gateway,
                    ..NetworkConfig::default()
                };

                Ovs::new().initialize(&config, &state).await?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provision_args_parse() {
        let cli = Cli::try_parse_from([
            "vport",
            "provision",
            "--bridge",
            "br0",
            "--prefix",
            "veth",
            "--pid",
            "4242",
        ])
        .unwrap();

        assert_eq!(cli.db, vport_ovsdb::DEFAULT_ENDPOINT);
        match cli.command {
            Commands::Provision {
                bridge,
                prefix,
                mtu,
                pid,
                vsctl,
                ..
            } => {
                assert_eq!(bridge, "br0");
                assert_eq!(prefix, "veth");
                assert_eq!(mtu, 1500);
                assert_eq!(pid, 4242);
                assert!(!vsctl);
            }
            Commands::Finalize { .. } => panic!("expected provision"),
        }
    }

    #[test]
    fn finalize_requires_address() {
        let result = Cli::try_parse_from(["vport", "finalize"]);
        assert!(result.is_err());
    }

    #[test]
    fn state_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network-state.json");

        let state = NetworkState {
            ovs_port: Some("veth1a2b3c4".to_string()),
        };
        std::fs::write(&path, serde_json::to_vec_pretty(&state).unwrap()).unwrap();

        let raw = std::fs::read(&path).unwrap();
        let loaded: NetworkState = serde_json::from_slice(&raw).unwrap();
        assert_eq!(loaded.ovs_port.as_deref(), Some("veth1a2b3c4"));
    }
}
