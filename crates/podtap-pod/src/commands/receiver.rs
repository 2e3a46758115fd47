//! `podtap-pod receiver`: terminate the tunnel on this host.

use std::net::IpAddr;

use clap::Args;
use podtap_common::constants;
use podtap_common::error::Result;
use podtap_common::types::TunnelParams;
use podtap_session::{EgressSelector, ReceiverConfig, RoleConfig};

/// Arguments for the `receiver` role.
#[derive(Args, Debug)]
pub struct ReceiverArgs {
    /// Name of the interface to create.
    #[arg(long)]
    pub ifname: String,

    /// Host interface carrying the tunnel.
    #[arg(long)]
    pub vxlan_egressif: Option<String>,

    /// Local address whose interface carries the tunnel.
    #[arg(long)]
    pub vxlan_egressip: Option<String>,

    /// VXLAN network identifier.
    #[arg(long)]
    pub vxlan_id: u32,

    /// Address of the sender's host.
    #[arg(long)]
    pub vxlan_ip: IpAddr,

    /// VXLAN UDP port.
    #[arg(long, default_value_t = constants::DEFAULT_VXLAN_PORT)]
    pub vxlan_port: u16,
}

impl ReceiverArgs {
    /// Converts the flags into a validated role configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for conflicting or invalid flags.
    pub fn into_config(self) -> Result<RoleConfig> {
        let config = RoleConfig::Receiver(ReceiverConfig {
            interface: self.ifname,
            egress: EgressSelector::from_flags(
                self.vxlan_egressif.as_deref(),
                self.vxlan_egressip.as_deref(),
            )?,
            peer: self.vxlan_ip,
            tunnel: TunnelParams::new(self.vxlan_id, self.vxlan_port)?,
        });
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use crate::commands::{Cli, Command};

    use super::*;

    fn parse(argv: &[&str]) -> ReceiverArgs {
        match Cli::try_parse_from(argv.iter().copied()).unwrap().command {
            Command::Receiver(args) => args,
            Command::Sender(_) => panic!("expected receiver"),
        }
    }

    #[test]
    fn generated_flags_build_a_receiver() {
        let config = parse(&[
            "podtap-pod",
            "--procprefix=/host",
            "receiver",
            "--ifname=mirror",
            "--vxlan-egressip=10.0.0.9",
            "--vxlan-id=100",
            "--vxlan-ip=10.0.0.5",
            "--vxlan-port=8472",
        ])
        .into_config()
        .unwrap();

        assert_eq!(config.role(), "receiver");
        assert_eq!(config.peer(), "10.0.0.5".parse::<IpAddr>().unwrap());
        assert_eq!(config.tunnel(), TunnelParams::new(100, 8472).unwrap());
    }

    #[test]
    fn missing_egress_is_rejected() {
        let args = parse(&[
            "podtap-pod",
            "receiver",
            "--ifname=mirror",
            "--vxlan-id=100",
            "--vxlan-ip=10.0.0.5",
        ]);
        assert!(args.into_config().is_err());
    }
}
