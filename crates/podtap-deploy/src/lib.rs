//! # podtap-deploy
//!
//! The control-plane half of podtap.
//!
//! - **Cluster**: the [`cluster::ClusterService`] capability and its
//!   Kubernetes implementation.
//! - **Resolver**: turns a [`MirrorRequest`](podtap_common::config::MirrorRequest)
//!   into [`resolver::PlacementFacts`].
//! - **Descriptor**: builds the sender and receiver role descriptors.
//! - **Naming**: derives bounded pod names for both roles.
//! - **Manifest**: renders descriptors into runtime-specific pod manifests.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod cluster;
pub mod descriptor;
pub mod manifest;
pub mod naming;
pub mod resolver;
