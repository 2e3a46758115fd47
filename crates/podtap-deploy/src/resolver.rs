//! Topology resolution: where the target pod runs and where its mirrored
//! traffic goes.

use std::net::IpAddr;

use podtap_common::config::MirrorRequest;
use podtap_common::error::{PodtapError, Result};
use podtap_common::types::{ContainerRef, Destination};

use crate::cluster::{ClusterService, ContainerStatusRecord, PodRecord};

/// Concrete placement of both ends of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementFacts {
    /// Node the target pod runs on.
    pub pod_node: String,
    /// Host IP of that node.
    pub pod_host_ip: IpAddr,
    /// Node the receiver is pinned to; `None` for an IP destination.
    pub dest_node: Option<String>,
    /// Host IP of the receiver.
    pub dest_host_ip: IpAddr,
    /// Container whose namespace is tapped.
    pub container: ContainerRef,
}

/// Resolves `request` against the cluster.
///
/// # Errors
///
/// Returns [`PodtapError::NotFound`] for a missing pod, node or pinned
/// container, [`PodtapError::NoReadyContainer`] if no container is ready
/// or the chosen one has no id yet,
/// [`PodtapError::UnsupportedRuntime`] for an unknown container runtime,
/// [`PodtapError::NoAddress`] when a node or pod has no usable IP, and
/// cluster errors unchanged.
pub async fn resolve<C>(cluster: &C, request: &MirrorRequest) -> Result<PlacementFacts>
where
    C: ClusterService + ?Sized,
{
    request.validate()?;

    let pod = cluster
        .get_pod(&request.namespace, &request.pod)
        .await?
        .ok_or_else(|| PodtapError::NotFound {
            kind: "pod",
            id: request.pod_key(),
        })?;

    let status = select_container(&pod, request)?;
    let container = status
        .container_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| PodtapError::NoReadyContainer {
            pod: request.pod_key(),
        })
        .and_then(ContainerRef::parse)?;
    tracing::info!(pod = %request.pod_key(), container = %status.name, id = %container, "selected container");

    let pod_node = pod
        .node_name
        .clone()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| PodtapError::NoAddress {
            kind: "pod",
            name: request.pod_key(),
        })?;
    let pod_host_ip = parse_address(pod.host_ip.as_deref(), "pod", &request.pod_key())?;

    let (dest_node, dest_host_ip) = match &request.destination {
        Destination::Node(name) => {
            let node = cluster
                .get_node(name)
                .await?
                .ok_or_else(|| PodtapError::NotFound {
                    kind: "node",
                    id: name.clone(),
                })?;
            let ip = parse_address(node.internal_ip(), "node", &node.name)?;
            (Some(node.name), ip)
        }
        Destination::Ip(ip) => (None, *ip),
    };

    let facts = PlacementFacts {
        pod_node,
        pod_host_ip,
        dest_node,
        dest_host_ip,
        container,
    };
    tracing::info!(
        pod_node = %facts.pod_node,
        pod_host_ip = %facts.pod_host_ip,
        dest_node = facts.dest_node.as_deref().unwrap_or("-"),
        dest_host_ip = %facts.dest_host_ip,
        "resolved placement"
    );
    Ok(facts)
}

/// Picks the pinned container by name, whatever its readiness, otherwise
/// the first ready one.
fn select_container<'a>(pod: &'a PodRecord, request: &MirrorRequest) -> Result<&'a ContainerStatusRecord> {
    match request.container.as_deref() {
        Some(pinned) => pod
            .containers
            .iter()
            .find(|c| c.name == pinned)
            .ok_or_else(|| PodtapError::NotFound {
                kind: "container",
                id: format!("{}/{pinned}", request.pod_key()),
            }),
        None => pod
            .containers
            .iter()
            .find(|c| c.ready)
            .ok_or_else(|| PodtapError::NoReadyContainer {
                pod: request.pod_key(),
            }),
    }
}

fn parse_address(raw: Option<&str>, kind: &'static str, name: &str) -> Result<IpAddr> {
    raw.and_then(|ip| ip.parse().ok())
        .ok_or_else(|| PodtapError::NoAddress {
            kind,
            name: name.to_owned(),
        })
}
