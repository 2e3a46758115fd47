//! `podtap-pod sender`: mirror a container interface into the tunnel.

use std::net::IpAddr;

use clap::Args;
use podtap_common::constants;
use podtap_common::error::Result;
use podtap_common::types::{ContainerRef, MirrorDirection, TunnelParams};
use podtap_session::{EgressSelector, RoleConfig, SenderConfig};

/// Arguments for the `sender` role.
#[derive(Args, Debug)]
pub struct SenderArgs {
    /// Runtime-qualified id of the target container, e.g. docker://abc123.
    #[arg(long)]
    pub containerid: ContainerRef,

    /// Which traffic to mirror: ingress, egress or both.
    #[arg(long, default_value = constants::DEFAULT_MIRROR_TYPE)]
    pub mirrortype: MirrorDirection,

    /// Interface inside the container to mirror.
    #[arg(long)]
    pub mirrorif: String,

    /// Name of the mirror interface to create.
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

    /// Address of the receiver's host.
    #[arg(long)]
    pub vxlan_ip: IpAddr,

    /// VXLAN UDP port.
    #[arg(long, default_value_t = constants::DEFAULT_VXLAN_PORT)]
    pub vxlan_port: u16,
}

impl SenderArgs {
    /// Converts the flags into a validated role configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for conflicting or invalid flags.
    pub fn into_config(self) -> Result<RoleConfig> {
        let config = RoleConfig::Sender(SenderConfig {
            container: self.containerid,
            direction: self.mirrortype,
            mirror_source: self.mirrorif,
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
