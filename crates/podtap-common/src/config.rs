//! Validated request model for a mirror session.

use crate::constants;
use crate::error::{PodtapError, Result};
use crate::types::{Destination, MirrorDirection, TunnelParams};

/// What the user asked for: which pod to tap and where to send the copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRequest {
    /// Namespace of the target pod.
    pub namespace: String,
    /// Name of the target pod.
    pub pod: String,
    /// Container to tap; the first ready container when unset.
    pub container: Option<String>,
    /// Interface inside the pod whose traffic is mirrored.
    pub pod_interface: String,
    /// Name of the interface created on both ends.
    pub mirror_interface: String,
    /// Which traffic is mirrored.
    pub direction: MirrorDirection,
    /// VXLAN id and port.
    pub tunnel: TunnelParams,
    /// Where the receiver lives.
    pub destination: Destination,
    /// Image of the session controller.
    pub image: String,
}

impl MirrorRequest {
    /// Checks required fields and interface name limits.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        require_non_empty("pod", &self.pod)?;
        require_non_empty("namespace", &self.namespace)?;
        require_non_empty("image", &self.image)?;
        if let Some(container) = &self.container {
            require_non_empty("container", container)?;
        }
        validate_interface_name(&self.pod_interface)?;
        validate_interface_name(&self.mirror_interface)?;
        Ok(())
    }

    /// Returns `namespace/pod`.
    #[must_use]
    pub fn pod_key(&self) -> String {
        format!("{}/{}", self.namespace, self.pod)
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PodtapError::config(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Checks that `name` is usable as a Linux interface name.
///
/// # Errors
///
/// Returns a configuration error if the name is empty, too long, or
/// contains `/` or whitespace.
pub fn validate_interface_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(PodtapError::config("interface name must not be empty"));
    }
    if name.len() > constants::MAX_INTERFACE_NAME_LEN {
        return Err(PodtapError::config(format!(
            "interface name \"{name}\" is longer than {} bytes",
            constants::MAX_INTERFACE_NAME_LEN
        )));
    }
    if name.contains('/') || name.chars().any(char::is_whitespace) {
        return Err(PodtapError::config(format!(
            "interface name \"{name}\" contains invalid characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> MirrorRequest {
        MirrorRequest {
            namespace: constants::DEFAULT_NAMESPACE.into(),
            pod: "web-1".into(),
            container: None,
            pod_interface: constants::DEFAULT_POD_INTERFACE.into(),
            mirror_interface: constants::DEFAULT_MIRROR_INTERFACE.into(),
            direction: MirrorDirection::Both,
            tunnel: TunnelParams::new(100, constants::DEFAULT_VXLAN_PORT).unwrap(),
            destination: Destination::Node("node-b".into()),
            image: constants::DEFAULT_IMAGE.into(),
        }
    }

    #[test]
    fn default_request_is_valid() {
        assert!(request().validate().is_ok());
        assert_eq!(request().pod_key(), "default/web-1");
    }

    #[test]
    fn empty_pod_is_rejected() {
        let mut req = request();
        req.pod = String::new();
        assert!(matches!(req.validate(), Err(PodtapError::Config { .. })));
    }

    #[test]
    fn pinned_empty_container_is_rejected() {
        let mut req = request();
        req.container = Some(String::new());
        assert!(req.validate().is_err());
    }

    #[test]
    fn long_interface_name_is_rejected() {
        let mut req = request();
        req.mirror_interface = "a-very-long-mirror-if".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn interface_name_rules() {
        assert!(validate_interface_name("eth0").is_ok());
        assert!(validate_interface_name("").is_err());
        assert!(validate_interface_name("eth/0").is_err());
        assert!(validate_interface_name("eth 0").is_err());
    }
}
