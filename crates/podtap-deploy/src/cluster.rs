//! Read access to pod and node records.
//!
//! [`ClusterService`] is the only way the resolver talks to the cluster.
//! Records are reduced to the fields podtap needs so tests can build them
//! without an API server.

use std::path::Path;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::Api;
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use podtap_common::error::{PodtapError, Result};

/// Node address type carrying the cluster-internal IP.
pub const ADDRESS_INTERNAL_IP: &str = "InternalIP";

/// Status of one container of a pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStatusRecord {
    /// Container name from the pod spec.
    pub name: String,
    /// Whether the container passes its readiness checks.
    pub ready: bool,
    /// Runtime-qualified id, e.g. `docker://abc123`.
    pub container_id: Option<String>,
}

/// The parts of a pod the resolver reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodRecord {
    /// Pod namespace.
    pub namespace: String,
    /// Pod name.
    pub name: String,
    /// Node the pod is scheduled on.
    pub node_name: Option<String>,
    /// IP of that node.
    pub host_ip: Option<String>,
    /// Container statuses in spec order.
    pub containers: Vec<ContainerStatusRecord>,
}

/// One address of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAddressRecord {
    /// Address type, e.g. `InternalIP`.
    pub kind: String,
    /// The address.
    pub address: String,
}

/// The parts of a node the resolver reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    /// Node name.
    pub name: String,
    /// Reported addresses.
    pub addresses: Vec<NodeAddressRecord>,
}

impl NodeRecord {
    fn address_of(&self, kind: &str) -> Option<&str> {
        self.addresses
            .iter()
            .find(|a| a.kind == kind)
            .map(|a| a.address.as_str())
    }

    /// The node's internal IP, if reported.
    #[must_use]
    pub fn internal_ip(&self) -> Option<&str> {
        self.address_of(ADDRESS_INTERNAL_IP)
    }
}

/// Cluster read operations used by the resolver.
#[async_trait]
pub trait ClusterService: Send + Sync {
    /// Fetches a pod, `Ok(None)` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`PodtapError::Cluster`] if the request fails.
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<PodRecord>>;

    /// Fetches a node, `Ok(None)` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`PodtapError::Cluster`] if the request fails.
    async fn get_node(&self, name: &str) -> Result<Option<NodeRecord>>;

    /// Lists all nodes.
    ///
    /// # Errors
    ///
    /// Returns [`PodtapError::Cluster`] if the request fails.
    async fn list_nodes(&self) -> Result<Vec<NodeRecord>>;
}

/// [`ClusterService`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeClusterService {
    client: kube::Client,
}

impl KubeClusterService {
    /// Wraps an existing client.
    #[must_use]
    pub const fn new(client: kube::Client) -> Self {
        Self { client }
    }

    /// Connects using `kubeconfig` if given, otherwise the in-cluster
    /// environment or the default kubeconfig.
    ///
    /// # Errors
    ///
    /// Returns [`PodtapError::Cluster`] if no usable configuration is found.
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self> {
        let client = if let Some(path) = kubeconfig {
            tracing::debug!(path = %path.display(), "loading kubeconfig");
            let kubeconfig = Kubeconfig::read_from(path).map_err(cluster_error)?;
            let config =
                kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(cluster_error)?;
            kube::Client::try_from(config).map_err(cluster_error)?
        } else {
            kube::Client::try_default().await.map_err(cluster_error)?
        };
        Ok(Self::new(client))
    }
}

fn cluster_error(e: impl std::fmt::Display) -> PodtapError {
    PodtapError::Cluster {
        message: e.to_string(),
    }
}

#[async_trait]
impl ClusterService for KubeClusterService {
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<PodRecord>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pod = api.get_opt(name).await.map_err(cluster_error)?;
        Ok(pod.map(PodRecord::from))
    }

    async fn get_node(&self, name: &str) -> Result<Option<NodeRecord>> {
        let api: Api<Node> = Api::all(self.client.clone());
        let node = api.get_opt(name).await.map_err(cluster_error)?;
        Ok(node.map(NodeRecord::from))
    }

    async fn list_nodes(&self) -> Result<Vec<NodeRecord>> {
        let api: Api<Node> = Api::all(self.client.clone());
        let nodes = api
            .list(&ListParams::default())
            .await
            .map_err(cluster_error)?;
        Ok(nodes.items.into_iter().map(NodeRecord::from).collect())
    }
}

impl From<Pod> for PodRecord {
    fn from(pod: Pod) -> Self {
        let status = pod.status.unwrap_or_default();
        let containers = status
            .container_statuses
            .unwrap_or_default()
            .into_iter()
            .map(|cs| ContainerStatusRecord {
                name: cs.name,
                ready: cs.ready,
                container_id: cs.container_id,
            })
            .collect();
        Self {
            namespace: pod.metadata.namespace.unwrap_or_default(),
            name: pod.metadata.name.unwrap_or_default(),
            node_name: pod.spec.and_then(|spec| spec.node_name),
            host_ip: status.host_ip,
            containers,
        }
    }
}

impl From<Node> for NodeRecord {
    fn from(node: Node) -> Self {
        let addresses = node
            .status
            .and_then(|status| status.addresses)
            .unwrap_or_default()
            .into_iter()
            .map(|a| NodeAddressRecord {
                kind: a.type_,
                address: a.address,
            })
            .collect();
        Self {
            name: node.metadata.name.unwrap_or_default(),
            addresses,
        }
    }
}
