//! Role arguments, validated once at process start.

use std::net::IpAddr;

use podtap_common::config::validate_interface_name;
use podtap_common::error::{PodtapError, Result};
use podtap_common::types::{ContainerRef, MirrorDirection, TunnelParams};

/// How the host interface carrying the tunnel is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EgressSelector {
    /// Use this interface directly.
    Interface(String),
    /// Use whichever local interface carries this address.
    Address(IpAddr),
}

impl EgressSelector {
    /// Builds a selector from the `--vxlan-egressif` / `--vxlan-egressip`
    /// pair. Empty strings count as unset.
    ///
    /// # Errors
    ///
    /// Returns a configuration error unless exactly one is set, or if the
    /// address does not parse.
    pub fn from_flags(interface: Option<&str>, address: Option<&str>) -> Result<Self> {
        let interface = interface.filter(|s| !s.is_empty());
        let address = address.filter(|s| !s.is_empty());
        match (interface, address) {
            (Some(name), None) => {
                validate_interface_name(name)?;
                Ok(Self::Interface(name.to_owned()))
            }
            (None, Some(addr)) => addr.parse().map(Self::Address).map_err(|_| {
                PodtapError::config(format!("egress address \"{addr}\" is not a valid address"))
            }),
            (Some(_), Some(_)) => Err(PodtapError::config(
                "egress interface and egress address are mutually exclusive",
            )),
            (None, None) => Err(PodtapError::config(
                "one of egress interface or egress address is required",
            )),
        }
    }
}

/// Arguments of the side that taps the target container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderConfig {
    /// Container whose namespace holds the mirrored interface.
    pub container: ContainerRef,
    /// Which traffic is mirrored.
    pub direction: MirrorDirection,
    /// Interface inside the container being mirrored.
    pub mirror_source: String,
    /// Name of the interface to create in the container namespace.
    pub interface: String,
    /// Tunnel parent interface selection.
    pub egress: EgressSelector,
    /// Address of the receiver's host.
    pub peer: IpAddr,
    /// VXLAN id and port.
    pub tunnel: TunnelParams,
}

impl SenderConfig {
    /// Interfaces whose inbound and outbound traffic is copied.
    #[must_use]
    pub fn mirror_sources(&self) -> (Option<String>, Option<String>) {
        let ingress = self
            .direction
            .includes_ingress()
            .then(|| self.mirror_source.clone());
        let egress = self
            .direction
            .includes_egress()
            .then(|| self.mirror_source.clone());
        (ingress, egress)
    }

    fn validate(&self) -> Result<()> {
        validate_interface_name(&self.interface)?;
        if self.mirror_source.is_empty() {
            return Err(PodtapError::config("mirrored interface must not be empty"));
        }
        validate_interface_name(&self.mirror_source)?;
        if let (None, None) = self.mirror_sources() {
            return Err(PodtapError::config(
                "at least one of ingress or egress mirroring is required",
            ));
        }
        Ok(())
    }
}

/// Arguments of the side that terminates the tunnel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Name of the interface to create in the host namespace.
    pub interface: String,
    /// Tunnel parent interface selection.
    pub egress: EgressSelector,
    /// Address of the sender's host.
    pub peer: IpAddr,
    /// VXLAN id and port.
    pub tunnel: TunnelParams,
}

/// Arguments of one session role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleConfig {
    /// Tap side.
    Sender(SenderConfig),
    /// Receiving side.
    Receiver(ReceiverConfig),
}

impl RoleConfig {
    /// Checks role arguments before anything on the host is touched.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid interface names or a
    /// sender with no mirror direction.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Sender(sender) => sender.validate(),
            Self::Receiver(receiver) => validate_interface_name(&receiver.interface),
        }
    }

    /// `"sender"` or `"receiver"`.
    #[must_use]
    pub const fn role(&self) -> &'static str {
        match self {
            Self::Sender(_) => "sender",
            Self::Receiver(_) => "receiver",
        }
    }

    /// Name of the interface this role creates.
    #[must_use]
    pub fn interface(&self) -> &str {
        match self {
            Self::Sender(s) => &s.interface,
            Self::Receiver(r) => &r.interface,
        }
    }

    /// Tunnel parent selection.
    #[must_use]
    pub const fn egress(&self) -> &EgressSelector {
        match self {
            Self::Sender(s) => &s.egress,
            Self::Receiver(r) => &r.egress,
        }
    }

    /// Address of the other end.
    #[must_use]
    pub const fn peer(&self) -> IpAddr {
        match self {
            Self::Sender(s) => s.peer,
            Self::Receiver(r) => r.peer,
        }
    }

    /// VXLAN id and port.
    #[must_use]
    pub const fn tunnel(&self) -> TunnelParams {
        match self {
            Self::Sender(s) => s.tunnel,
            Self::Receiver(r) => r.tunnel,
        }
    }
}
