//! Derived pod names for the two session roles.
//!
//! Names longer than [`MAX_POD_NAME_LEN`] are cut, not hashed, so two
//! sessions whose names share a long prefix can collide.

use podtap_common::constants::{MAX_POD_NAME_LEN, POD_NAME_PREFIX};

/// `mirror-<pod>-sender`, bounded.
#[must_use]
pub fn sender_pod_name(pod: &str) -> String {
    truncate(format!("{POD_NAME_PREFIX}-{pod}-sender"))
}

/// `mirror-<pod>-receiver-<destination>`, bounded.
///
/// Dots in the destination (node names, IPv4 literals) and colons (IPv6
/// literals) become dashes.
#[must_use]
pub fn receiver_pod_name(pod: &str, destination: &str) -> String {
    let destination = destination.replace(['.', ':'], "-");
    truncate(format!("{POD_NAME_PREFIX}-{pod}-receiver-{destination}"))
}

fn truncate(name: String) -> String {
    if name.chars().count() <= MAX_POD_NAME_LEN {
        return name;
    }
    name.chars().take(MAX_POD_NAME_LEN).collect()
}
