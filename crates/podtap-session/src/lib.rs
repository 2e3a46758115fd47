//! # podtap-session
//!
//! The mirror session controller run by each role's pod.
//!
//! A session moves through [`SessionPhase::Configuring`],
//! [`SessionPhase::Active`], [`SessionPhase::Terminating`], and
//! [`SessionPhase::Exited`]. Setup is strictly sequential; the only
//! concurrency is the termination listener that fires the
//! [`ShutdownSignal`] the main flow blocks on.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod session;
pub mod shutdown;

#[cfg(test)]
mod testing;

pub use config::{EgressSelector, ReceiverConfig, RoleConfig, SenderConfig};
pub use session::{MirrorSession, SessionPhase, SessionState, TeardownReport, TeardownStep, run};
pub use shutdown::{ShutdownSignal, ShutdownTrigger};
