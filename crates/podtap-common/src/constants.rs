//! System-wide constants and defaults.

/// Application name used in labels and log output.
pub const APP_NAME: &str = "podtap";

/// Binary name of the session controller baked into generated manifests.
pub const POD_BIN_PATH: &str = "/bin/podtap-pod";

/// Default container image for the session controller pods.
pub const DEFAULT_IMAGE: &str = "docker.io/podtap/podtap:latest";

/// Default namespace of the target pod.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Default interface mirrored inside the target pod.
pub const DEFAULT_POD_INTERFACE: &str = "eth0";

/// Default name of the interface created on both ends of the tunnel.
pub const DEFAULT_MIRROR_INTERFACE: &str = "mirror";

/// Default mirror direction flag value.
pub const DEFAULT_MIRROR_TYPE: &str = "both";

/// IANA-assigned VXLAN UDP port.
pub const DEFAULT_VXLAN_PORT: u16 = 4789;

/// VXLAN network identifiers are 24 bits wide.
pub const MAX_VXLAN_ID: u32 = (1 << 24) - 1;

/// Prefix under which the host's `/proc` is mounted inside controller pods.
pub const DEFAULT_PROC_PREFIX: &str = "/host";

/// Upper bound on generated pod names.
pub const MAX_POD_NAME_LEN: usize = 62;

/// Linux interface names are limited to `IFNAMSIZ - 1` bytes.
pub const MAX_INTERFACE_NAME_LEN: usize = 15;

/// Prefix shared by every generated pod name.
pub const POD_NAME_PREFIX: &str = "mirror";

/// Label key carrying the application name on generated pods.
pub const LABEL_APP: &str = "app.kubernetes.io/name";

/// Label key carrying the session role on generated pods.
pub const LABEL_ROLE: &str = "podtap.io/role";

/// Docker control socket on the host.
pub const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// CRI-O control socket on the host.
pub const CRIO_SOCKET: &str = "/var/run/crio/crio.sock";
