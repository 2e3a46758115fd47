//! Sender and receiver role descriptors.
//!
//! A descriptor is everything a manifest needs: where the pod runs, which
//! runtime skeleton it uses, and the controller flags it is started with.
//! Both descriptors of a session come from the same [`PlacementFacts`], so
//! their tunnel parameters always agree and their peers point at each other.

use std::net::IpAddr;

use podtap_common::config::MirrorRequest;
use podtap_common::constants;
use podtap_common::types::{ContainerRef, ContainerRuntime, MirrorDirection, TunnelParams};

use crate::naming::{receiver_pod_name, sender_pod_name};
use crate::resolver::PlacementFacts;

/// Controller flags of the sender role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderArgs {
    /// Container whose namespace is tapped.
    pub container: ContainerRef,
    /// Which traffic is mirrored.
    pub direction: MirrorDirection,
    /// Interface inside the container being mirrored.
    pub mirror_source: String,
    /// Interface created in the container namespace.
    pub interface: String,
    /// Local address selecting the tunnel parent interface.
    pub egress_ip: IpAddr,
    /// Address of the receiver's host.
    pub peer: IpAddr,
    /// VXLAN id and port.
    pub tunnel: TunnelParams,
}

/// Controller flags of the receiver role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverArgs {
    /// Interface created in the host namespace.
    pub interface: String,
    /// Local address selecting the tunnel parent interface.
    pub egress_ip: IpAddr,
    /// Address of the sender's host.
    pub peer: IpAddr,
    /// VXLAN id and port.
    pub tunnel: TunnelParams,
}

/// Role-specific controller flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleArgs {
    /// Tap side.
    Sender(SenderArgs),
    /// Receiving side.
    Receiver(ReceiverArgs),
}

impl RoleArgs {
    /// `"sender"` or `"receiver"`.
    #[must_use]
    pub const fn role(&self) -> &'static str {
        match self {
            Self::Sender(_) => "sender",
            Self::Receiver(_) => "receiver",
        }
    }

    /// Tunnel parameters of either role.
    #[must_use]
    pub const fn tunnel(&self) -> TunnelParams {
        match self {
            Self::Sender(s) => s.tunnel,
            Self::Receiver(r) => r.tunnel,
        }
    }

    /// Tunnel peer of either role.
    #[must_use]
    pub const fn peer(&self) -> IpAddr {
        match self {
            Self::Sender(s) => s.peer,
            Self::Receiver(r) => r.peer,
        }
    }

    /// Renders the controller argument list, `--procprefix` first, then the
    /// subcommand and its flags.
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--procprefix={}", constants::DEFAULT_PROC_PREFIX),
            self.role().to_owned(),
        ];
        match self {
            Self::Sender(s) => {
                args.push(format!("--containerid={}", s.container));
                args.push(format!("--mirrortype={}", s.direction));
                args.push(format!("--mirrorif={}", s.mirror_source));
                args.push(format!("--ifname={}", s.interface));
            }
            Self::Receiver(r) => {
                args.push(format!("--ifname={}", r.interface));
            }
        }
        let (egress_ip, peer, tunnel) = match self {
            Self::Sender(s) => (s.egress_ip, s.peer, s.tunnel),
            Self::Receiver(r) => (r.egress_ip, r.peer, r.tunnel),
        };
        args.push(format!("--vxlan-egressip={egress_ip}"));
        args.push(format!("--vxlan-id={}", tunnel.id));
        args.push(format!("--vxlan-ip={peer}"));
        args.push(format!("--vxlan-port={}", tunnel.port));
        args
    }
}

/// Everything needed to render one role's pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDescriptor {
    /// Derived pod name.
    pub pod_name: String,
    /// Namespace the pod is created in.
    pub namespace: String,
    /// Node the pod is pinned to; `None` lets the scheduler choose.
    pub node_name: Option<String>,
    /// Controller image.
    pub image: String,
    /// Runtime whose socket is mounted.
    pub runtime: ContainerRuntime,
    /// Controller flags.
    pub args: RoleArgs,
}

/// The two descriptors of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescriptors {
    /// Runs next to the target pod.
    pub sender: RoleDescriptor,
    /// Terminates the tunnel at the destination.
    pub receiver: RoleDescriptor,
}

impl SessionDescriptors {
    /// Sender first, then receiver.
    #[must_use]
    pub fn roles(&self) -> [&RoleDescriptor; 2] {
        [&self.sender, &self.receiver]
    }
}

/// Builds both role descriptors of a session.
///
/// The receiver is always produced. For an IP destination it carries no
/// node constraint and is named after the address.
#[must_use]
pub fn generate(request: &MirrorRequest, facts: &PlacementFacts) -> SessionDescriptors {
    let runtime = facts.container.runtime();

    let sender = RoleDescriptor {
        pod_name: sender_pod_name(&request.pod),
        namespace: request.namespace.clone(),
        node_name: Some(facts.pod_node.clone()),
        image: request.image.clone(),
        runtime,
        args: RoleArgs::Sender(SenderArgs {
            container: facts.container.clone(),
            direction: request.direction,
            mirror_source: request.pod_interface.clone(),
            interface: request.mirror_interface.clone(),
            egress_ip: facts.pod_host_ip,
            peer: facts.dest_host_ip,
            tunnel: request.tunnel,
        }),
    };

    let destination_label = facts
        .dest_node
        .clone()
        .unwrap_or_else(|| facts.dest_host_ip.to_string());
    let receiver = RoleDescriptor {
        pod_name: receiver_pod_name(&request.pod, &destination_label),
        namespace: request.namespace.clone(),
        node_name: facts.dest_node.clone(),
        image: request.image.clone(),
        runtime,
        args: RoleArgs::Receiver(ReceiverArgs {
            interface: request.mirror_interface.clone(),
            egress_ip: facts.dest_host_ip,
            peer: facts.pod_host_ip,
            tunnel: request.tunnel,
        }),
    };

    tracing::debug!(
        sender = %sender.pod_name,
        receiver = %receiver.pod_name,
        vxlan_id = request.tunnel.id,
        "generated role descriptors"
    );
    SessionDescriptors { sender, receiver }
}
