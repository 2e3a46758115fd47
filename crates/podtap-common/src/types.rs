//! Domain primitive types used across the podtap workspace.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::{PodtapError, Result};

/// Which traffic copies are captured from the mirrored interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MirrorDirection {
    /// Packets received by the interface.
    Ingress,
    /// Packets sent by the interface.
    Egress,
    /// Both directions.
    Both,
}

impl MirrorDirection {
    /// Returns the flag value understood by the session controller.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ingress => "ingress",
            Self::Egress => "egress",
            Self::Both => "both",
        }
    }

    /// Whether inbound traffic is mirrored.
    #[must_use]
    pub const fn includes_ingress(self) -> bool {
        matches!(self, Self::Ingress | Self::Both)
    }

    /// Whether outbound traffic is mirrored.
    #[must_use]
    pub const fn includes_egress(self) -> bool {
        matches!(self, Self::Egress | Self::Both)
    }
}

impl FromStr for MirrorDirection {
    type Err = PodtapError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ingress" => Ok(Self::Ingress),
            "egress" => Ok(Self::Egress),
            "both" | "all" => Ok(Self::Both),
            other => Err(PodtapError::config(format!(
                "unknown mirror type \"{other}\" (expected ingress, egress or both)"
            ))),
        }
    }
}

impl fmt::Display for MirrorDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Container runtimes whose namespaces podtap knows how to locate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerRuntime {
    /// Docker engine.
    Docker,
    /// CRI-O.
    CriO,
}

impl ContainerRuntime {
    /// Parses the token found before `://` in a container status id.
    ///
    /// # Errors
    ///
    /// Returns [`PodtapError::UnsupportedRuntime`] for unknown tokens.
    pub fn from_token(token: &str) -> Result<Self> {
        match token {
            "docker" => Ok(Self::Docker),
            "cri-o" => Ok(Self::CriO),
            other => Err(PodtapError::UnsupportedRuntime {
                token: other.to_owned(),
            }),
        }
    }

    /// Returns the token as written by the kubelet.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::CriO => "cri-o",
        }
    }

    /// Returns the runtime's control socket on the host.
    #[must_use]
    pub const fn socket_path(self) -> &'static str {
        match self {
            Self::Docker => crate::constants::DOCKER_SOCKET,
            Self::CriO => crate::constants::CRIO_SOCKET,
        }
    }
}

impl fmt::Display for ContainerRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Splits `"<runtime>://<id>"` into its raw runtime token and bare id.
///
/// The token is not checked against the supported set; see
/// [`ContainerRef::parse`] for that.
///
/// # Errors
///
/// Returns a configuration error if the separator is missing or either
/// side is empty.
pub fn split_container_id(qualified: &str) -> Result<(&str, &str)> {
    match qualified.split_once("://") {
        Some((token, id)) if !token.is_empty() && !id.is_empty() => Ok((token, id)),
        _ => Err(PodtapError::config(format!(
            "container id \"{qualified}\" is not of the form <runtime>://<id>"
        ))),
    }
}

/// A runtime-qualified container identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerRef {
    runtime: ContainerRuntime,
    id: String,
}

impl ContainerRef {
    /// Creates a reference from its parts.
    #[must_use]
    pub fn new(runtime: ContainerRuntime, id: impl Into<String>) -> Self {
        Self {
            runtime,
            id: id.into(),
        }
    }

    /// Parses a kubelet container id such as `docker://abc123`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for malformed ids and
    /// [`PodtapError::UnsupportedRuntime`] for unknown runtimes.
    pub fn parse(qualified: &str) -> Result<Self> {
        let (token, id) = split_container_id(qualified)?;
        Ok(Self::new(ContainerRuntime::from_token(token)?, id))
    }

    /// The runtime that owns the container.
    #[must_use]
    pub const fn runtime(&self) -> ContainerRuntime {
        self.runtime
    }

    /// The bare container id, without the runtime prefix.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl FromStr for ContainerRef {
    type Err = PodtapError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.runtime, self.id)
    }
}

/// Where mirrored traffic is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// A cluster node, resolved to its internal IP.
    Node(String),
    /// A literal host address; the receiver is not pinned to a node.
    Ip(IpAddr),
}

impl Destination {
    /// Builds a destination from the two mutually exclusive selectors.
    ///
    /// Empty strings count as unset.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if both or neither selector is set,
    /// or if the address does not parse.
    pub fn from_selectors(node: Option<&str>, ip: Option<&str>) -> Result<Self> {
        let node = node.filter(|n| !n.is_empty());
        let ip = ip.filter(|i| !i.is_empty());
        match (node, ip) {
            (Some(node), None) => Ok(Self::Node(node.to_owned())),
            (None, Some(ip)) => ip.parse().map(Self::Ip).map_err(|_| {
                PodtapError::config(format!("destination IP \"{ip}\" is not a valid address"))
            }),
            (Some(_), Some(_)) => Err(PodtapError::config(
                "destination node and destination IP are mutually exclusive",
            )),
            (None, None) => Err(PodtapError::config(
                "one of destination node or destination IP is required",
            )),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(node) => write!(f, "node {node}"),
            Self::Ip(ip) => write!(f, "address {ip}"),
        }
    }
}

/// VXLAN parameters shared by both ends of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TunnelParams {
    /// VXLAN network identifier.
    pub id: u32,
    /// UDP destination port.
    pub port: u16,
}

impl TunnelParams {
    /// Creates tunnel parameters, checking the id fits in 24 bits.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `id` exceeds the VXLAN range.
    pub fn new(id: u32, port: u16) -> Result<Self> {
        if id > crate::constants::MAX_VXLAN_ID {
            return Err(PodtapError::config(format!(
                "vxlan id {id} exceeds {}",
                crate::constants::MAX_VXLAN_ID
            )));
        }
        Ok(Self { id, port })
    }
}
