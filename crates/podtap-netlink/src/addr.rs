//! Local interface address enumeration.

use std::net::IpAddr;

use podtap_common::error::{PodtapError, Result};

/// One address configured on a host interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAddress {
    /// Interface name.
    pub interface: String,
    /// Configured address.
    pub address: IpAddr,
}

impl LocalAddress {
    /// Creates an entry.
    #[must_use]
    pub fn new(interface: impl Into<String>, address: IpAddr) -> Self {
        Self {
            interface: interface.into(),
            address,
        }
    }
}

/// Returns the first interface carrying exactly `address`.
#[must_use]
pub fn find_interface_by_address(addresses: &[LocalAddress], address: IpAddr) -> Option<&str> {
    addresses
        .iter()
        .find(|a| a.address == address)
        .map(|a| a.interface.as_str())
}

/// Enumerates IPv4 and IPv6 addresses of all interfaces via `getifaddrs(3)`.
///
/// # Errors
///
/// Returns an error if `getifaddrs(3)` fails.
pub fn scan_local_addresses() -> Result<Vec<LocalAddress>> {
    let addrs = nix::ifaddrs::getifaddrs()
        .map_err(|e| PodtapError::link(format!("getifaddrs failed: {e}")))?;

    let mut found = Vec::new();
    for ifaddr in addrs {
        let Some(storage) = ifaddr.address else {
            continue;
        };
        let address = if let Some(v4) = storage.as_sockaddr_in() {
            IpAddr::V4(v4.ip())
        } else if let Some(v6) = storage.as_sockaddr_in6() {
            IpAddr::V6(v6.ip())
        } else {
            continue;
        };
        found.push(LocalAddress::new(ifaddr.interface_name, address));
    }
    tracing::debug!(count = found.len(), "scanned local addresses");
    Ok(found)
}
