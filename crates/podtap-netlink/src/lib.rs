//! # podtap-netlink
//!
//! The network-link capability consumed by the session controller.
//!
//! [`NetworkLinkService`] is the narrow seam between session logic and the
//! host: namespace lookup, link existence checks, interface state, and
//! creation/removal of the mirrored VXLAN interface. [`IpRouteLinkService`]
//! is the production implementation driving `ip`, `tc`, and `nsenter`.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod addr;
pub mod iproute;
pub mod link;
pub mod netns;

use std::path::Path;

use podtap_common::error::Result;
use podtap_common::types::ContainerRef;

pub use addr::LocalAddress;
pub use iproute::IpRouteLinkService;
pub use link::{LinkSpec, LinkState, Netns, TunnelSpec};

/// Host networking operations needed to run one side of a mirror session.
///
/// Every call is synchronous and blocking. Implementations hold no session
/// state; the controller owns it.
pub trait NetworkLinkService {
    /// Locates the network namespace of a container.
    ///
    /// `proc_prefix` is prepended to `/proc` when the caller runs in a
    /// different mount namespace than the container.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be queried or the
    /// namespace file does not exist.
    fn resolve_netns(&self, container: &ContainerRef, proc_prefix: &Path) -> Result<Netns>;

    /// Returns whether a link named `name` exists in `netns`.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace cannot be inspected.
    fn link_exists(&self, netns: &Netns, name: &str) -> Result<bool>;

    /// Lists every address configured on a host interface.
    ///
    /// # Errors
    ///
    /// Returns an error if interface enumeration fails.
    fn local_addresses(&self) -> Result<Vec<LocalAddress>>;

    /// Reads the MTU and transmit queue length of a link.
    ///
    /// # Errors
    ///
    /// Returns an error if the link cannot be queried.
    fn link_state(&self, netns: &Netns, name: &str) -> Result<LinkState>;

    /// Sets the MTU of a link.
    ///
    /// # Errors
    ///
    /// Returns an error if the link cannot be modified.
    fn set_mtu(&self, netns: &Netns, name: &str, mtu: u32) -> Result<()>;

    /// Sets the transmit queue length of a link.
    ///
    /// # Errors
    ///
    /// Returns an error if the link cannot be modified.
    fn set_tx_queue_len(&self, netns: &Netns, name: &str, len: u32) -> Result<()>;

    /// Creates the mirror interface in `link.netns`, binds it to the VXLAN
    /// tunnel described by `tunnel`, and attaches the requested mirroring.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. A partially created interface
    /// and any qdiscs installed for it are removed before returning.
    fn make_vxlan(&self, link: &LinkSpec, tunnel: &TunnelSpec) -> Result<()>;

    /// Detaches mirroring and deletes the interface together with its
    /// tunnel binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the interface cannot be deleted.
    fn remove_link(&self, link: &LinkSpec) -> Result<()>;
}
