//! Pod manifests for role descriptors.
//!
//! Each runtime has a fixed [`ManifestSkeleton`]; rendering fills it from a
//! [`RoleDescriptor`] into a structured [`Pod`] and serializes that to YAML.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Container, HostPathVolumeSource, Pod, PodSpec, SecurityContext, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use podtap_common::constants;
use podtap_common::error::{PodtapError, Result};
use podtap_common::types::ContainerRuntime;

use crate::descriptor::{RoleDescriptor, SessionDescriptors};

/// A host path exposed to the controller container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostMount {
    /// Volume name.
    pub volume: &'static str,
    /// Path on the host.
    pub host_path: &'static str,
    /// Path inside the container.
    pub mount_path: &'static str,
}

/// Fixed per-runtime shape of a controller pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestSkeleton {
    /// The runtime's control socket.
    pub socket: HostMount,
    /// The host's procfs.
    pub procfs: HostMount,
    /// Entrypoint of the controller image.
    pub command: &'static str,
    /// Pod restart policy.
    pub restart_policy: &'static str,
}

const PROCFS: HostMount = HostMount {
    volume: "host-proc",
    host_path: "/proc",
    mount_path: "/host/proc",
};

/// Skeleton for pods targeting Docker hosts.
pub const DOCKER_SKELETON: ManifestSkeleton = ManifestSkeleton {
    socket: HostMount {
        volume: "docker-sock",
        host_path: constants::DOCKER_SOCKET,
        mount_path: constants::DOCKER_SOCKET,
    },
    procfs: PROCFS,
    command: constants::POD_BIN_PATH,
    restart_policy: "Never",
};

/// Skeleton for pods targeting CRI-O hosts.
pub const CRIO_SKELETON: ManifestSkeleton = ManifestSkeleton {
    socket: HostMount {
        volume: "crio-sock",
        host_path: constants::CRIO_SOCKET,
        mount_path: constants::CRIO_SOCKET,
    },
    procfs: PROCFS,
    command: constants::POD_BIN_PATH,
    restart_policy: "Never",
};

impl ManifestSkeleton {
    /// Picks the skeleton for `runtime`.
    #[must_use]
    pub const fn for_runtime(runtime: ContainerRuntime) -> &'static Self {
        match runtime {
            ContainerRuntime::Docker => &DOCKER_SKELETON,
            ContainerRuntime::CriO => &CRIO_SKELETON,
        }
    }

    fn mounts(&self) -> [HostMount; 2] {
        [self.socket, self.procfs]
    }
}

/// Builds the pod object for one role.
///
/// # Errors
///
/// Returns [`PodtapError::Render`] if a required descriptor field is empty.
pub fn build_pod(descriptor: &RoleDescriptor) -> Result<Pod> {
    require("pod name", &descriptor.pod_name)?;
    require("namespace", &descriptor.namespace)?;
    require("image", &descriptor.image)?;
    if let Some(node) = &descriptor.node_name {
        require("node name", node)?;
    }

    let skeleton = ManifestSkeleton::for_runtime(descriptor.runtime);
    let labels = BTreeMap::from([
        (constants::LABEL_APP.to_owned(), constants::APP_NAME.to_owned()),
        (
            constants::LABEL_ROLE.to_owned(),
            descriptor.args.role().to_owned(),
        ),
    ]);

    let container = Container {
        name: descriptor.pod_name.clone(),
        image: Some(descriptor.image.clone()),
        command: Some(vec![skeleton.command.to_owned()]),
        args: Some(descriptor.args.to_args()),
        security_context: Some(SecurityContext {
            privileged: Some(true),
            ..SecurityContext::default()
        }),
        volume_mounts: Some(
            skeleton
                .mounts()
                .iter()
                .map(|m| VolumeMount {
                    name: m.volume.to_owned(),
                    mount_path: m.mount_path.to_owned(),
                    ..VolumeMount::default()
                })
                .collect(),
        ),
        ..Container::default()
    };

    let volumes = skeleton
        .mounts()
        .iter()
        .map(|m| Volume {
            name: m.volume.to_owned(),
            host_path: Some(HostPathVolumeSource {
                path: m.host_path.to_owned(),
                type_: None,
            }),
            ..Volume::default()
        })
        .collect();

    Ok(Pod {
        metadata: ObjectMeta {
            name: Some(descriptor.pod_name.clone()),
            namespace: Some(descriptor.namespace.clone()),
            labels: Some(labels),
            ..ObjectMeta::default()
        },
        spec: Some(PodSpec {
            host_network: Some(true),
            node_name: descriptor.node_name.clone(),
            restart_policy: Some(skeleton.restart_policy.to_owned()),
            containers: vec![container],
            volumes: Some(volumes),
            ..PodSpec::default()
        }),
        status: None,
    })
}

/// Renders one role's manifest as YAML.
///
/// # Errors
///
/// Returns [`PodtapError::Render`] if a required field is empty or the pod
/// cannot be serialized.
pub fn render(descriptor: &RoleDescriptor) -> Result<String> {
    let pod = build_pod(descriptor)?;
    serde_yaml::to_string(&pod).map_err(|e| PodtapError::Render {
        message: format!("{}: {e}", descriptor.pod_name),
    })
}

/// Renders both manifests, sender first, as one multi-document stream.
///
/// # Errors
///
/// Returns the first rendering error.
pub fn render_all(descriptors: &SessionDescriptors) -> Result<String> {
    let mut out = String::new();
    for descriptor in descriptors.roles() {
        out.push_str("---\n");
        out.push_str(&render(descriptor)?);
    }
    Ok(out)
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PodtapError::Render {
            message: format!("{field} is empty"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ReceiverArgs, RoleArgs};
    use podtap_common::types::TunnelParams;

    fn receiver(runtime: ContainerRuntime, node: Option<&str>) -> RoleDescriptor {
        RoleDescriptor {
            pod_name: "mirror-web-1-receiver-node-b".into(),
            namespace: "default".into(),
            node_name: node.map(str::to_owned),
            image: constants::DEFAULT_IMAGE.into(),
            runtime,
            args: RoleArgs::Receiver(ReceiverArgs {
                interface: "mirror".into(),
                egress_ip: "10.0.0.9".parse().unwrap(),
                peer: "10.0.0.5".parse().unwrap(),
                tunnel: TunnelParams::new(100, 4789).unwrap(),
            }),
        }
    }

    #[test]
    fn pod_runs_privileged_on_host_network() {
        let pod = build_pod(&receiver(ContainerRuntime::Docker, Some("node-b"))).unwrap();
        let spec = pod.spec.unwrap();
        assert_eq!(spec.host_network, Some(true));
        assert_eq!(spec.restart_policy.as_deref(), Some("Never"));
        assert_eq!(spec.node_name.as_deref(), Some("node-b"));
        assert_eq!(spec.containers.len(), 1);

        let container = &spec.containers[0];
        assert_eq!(container.name, "mirror-web-1-receiver-node-b");
        assert_eq!(
            container.command.as_deref(),
            Some(&["/bin/podtap-pod".to_owned()][..])
        );
        assert_eq!(
            container.security_context.as_ref().and_then(|s| s.privileged),
            Some(true)
        );
    }

    #[test]
    fn skeleton_follows_runtime() {
        for (runtime, volume, path) in [
            (ContainerRuntime::Docker, "docker-sock", "/var/run/docker.sock"),
            (ContainerRuntime::CriO, "crio-sock", "/var/run/crio/crio.sock"),
        ] {
            let pod = build_pod(&receiver(runtime, None)).unwrap();
            let volumes = pod.spec.unwrap().volumes.unwrap();
            let socket = volumes.iter().find(|v| v.name == volume).unwrap();
            assert_eq!(socket.host_path.as_ref().unwrap().path, path);
            assert!(volumes.iter().any(|v| v.name == "host-proc"));
        }
    }

    #[test]
    fn unpinned_receiver_has_no_node_name() {
        let yaml = render(&receiver(ContainerRuntime::Docker, None)).unwrap();
        assert!(!yaml.contains("nodeName"));
        assert!(yaml.contains("hostNetwork: true"));
        assert!(yaml.contains("podtap.io/role: receiver"));
    }

    #[test]
    fn empty_required_field_fails_rendering() {
        let mut descriptor = receiver(ContainerRuntime::Docker, Some("node-b"));
        descriptor.image = String::new();
        assert!(matches!(
            render(&descriptor),
            Err(PodtapError::Render { .. })
        ));

        let mut descriptor = receiver(ContainerRuntime::Docker, Some(""));
        descriptor.image = constants::DEFAULT_IMAGE.into();
        assert!(render(&descriptor).is_err());
    }
}
