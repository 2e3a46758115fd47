//! # podtap-common
//!
//! Shared types, error definitions, request configuration, and constants
//! used across the entire podtap workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and provides the primitives that the resolver, the
//! manifest generator, and the session controller all agree on.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
