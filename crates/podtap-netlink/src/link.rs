//! Value types describing links and tunnels.

use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;

use podtap_common::types::TunnelParams;

/// A network namespace operations are executed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Netns {
    /// The namespace of the calling process.
    Host,
    /// A namespace file such as `/host/proc/1234/ns/net`.
    Path(PathBuf),
}

impl fmt::Display for Netns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => f.write_str("host namespace"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// The interface created for a session and the mirroring attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    /// Namespace the interface lives in.
    pub netns: Netns,
    /// Name of the new interface.
    pub name: String,
    /// Interface whose inbound traffic is copied, if any.
    pub mirror_ingress: Option<String>,
    /// Interface whose outbound traffic is copied, if any.
    pub mirror_egress: Option<String>,
}

impl LinkSpec {
    /// An interface without mirroring, as used by the receiver.
    #[must_use]
    pub fn plain(netns: Netns, name: impl Into<String>) -> Self {
        Self {
            netns,
            name: name.into(),
            mirror_ingress: None,
            mirror_egress: None,
        }
    }
}

/// VXLAN endpoint parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelSpec {
    /// Host interface the encapsulated packets leave through.
    pub parent: String,
    /// Address of the other end.
    pub peer: IpAddr,
    /// Id and UDP port.
    pub params: TunnelParams,
}

/// Interface settings that mirroring setup may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkState {
    /// Maximum transmission unit.
    pub mtu: u32,
    /// Transmit queue length.
    pub tx_queue_len: u32,
}
