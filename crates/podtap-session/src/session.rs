//! Session lifecycle: configure, activate, wait, terminate.

use std::fmt;
use std::path::Path;

use podtap_common::error::{PodtapError, Result};
use podtap_netlink::addr::find_interface_by_address;
use podtap_netlink::{LinkSpec, LinkState, Netns, NetworkLinkService, TunnelSpec};

use crate::config::{EgressSelector, RoleConfig};
use crate::shutdown::ShutdownSignal;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Arguments validated, host resources resolved, nothing created yet.
    Configuring,
    /// Interface and tunnel exist; waiting for termination.
    Active,
    /// Cleanup in progress.
    Terminating,
    /// Cleanup attempted; the process may exit.
    Exited,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuring => write!(f, "configuring"),
            Self::Active => write!(f, "active"),
            Self::Terminating => write!(f, "terminating"),
            Self::Exited => write!(f, "exited"),
        }
    }
}

/// Settings of the mirrored interface captured before setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedLinkState {
    /// Interface the values belong to.
    pub interface: String,
    /// Values to restore on teardown.
    pub state: LinkState,
}

/// Everything one controller instance owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// The interface this session creates.
    pub link: LinkSpec,
    /// The tunnel bound to it.
    pub tunnel: TunnelSpec,
    /// Interface settings to restore, recorded when egress is mirrored.
    pub saved: Option<SavedLinkState>,
}

/// A single teardown action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    /// Restoring the mirrored interface's MTU.
    RestoreMtu,
    /// Restoring the mirrored interface's transmit queue length.
    RestoreTxQueueLen,
    /// Removing the mirror interface and its tunnel.
    RemoveLink,
}

/// What went wrong during teardown. Empty when every step succeeded.
#[derive(Debug, Default)]
pub struct TeardownReport {
    /// Failed steps in the order they were attempted.
    pub failures: Vec<(TeardownStep, PodtapError)>,
}

impl TeardownReport {
    /// Whether every attempted step succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, step: TeardownStep, result: Result<()>) {
        if let Err(error) = result {
            tracing::error!(?step, %error, "teardown step failed");
            self.failures.push((step, error));
        }
    }
}

/// One side of a mirror session bound to a link service.
#[derive(Debug)]
pub struct MirrorSession<'a, L: NetworkLinkService> {
    links: &'a L,
    role: &'static str,
    phase: SessionPhase,
    state: SessionState,
}

impl<'a, L: NetworkLinkService> MirrorSession<'a, L> {
    /// Validates `config` and resolves everything setup needs: the tunnel
    /// parent interface, the target namespace, and the absence of an
    /// interface with the requested name.
    ///
    /// Nothing on the host is modified.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid arguments,
    /// [`PodtapError::NoMatchingInterface`] if the egress address is not
    /// local, [`PodtapError::InterfaceAlreadyExists`] on a name collision,
    /// or the link service's error if namespace resolution fails.
    pub fn configure(links: &'a L, config: &RoleConfig, proc_prefix: &Path) -> Result<Self> {
        config.validate()?;
        let role = config.role();
        tracing::info!(role, interface = config.interface(), "configuring session");

        let parent = resolve_parent(links, config.egress())?;

        let link = match config {
            RoleConfig::Sender(sender) => {
                let netns = links.resolve_netns(&sender.container, proc_prefix)?;
                let (mirror_ingress, mirror_egress) = sender.mirror_sources();
                LinkSpec {
                    netns,
                    name: sender.interface.clone(),
                    mirror_ingress,
                    mirror_egress,
                }
            }
            RoleConfig::Receiver(receiver) => LinkSpec::plain(Netns::Host, &receiver.interface),
        };

        if links.link_exists(&link.netns, &link.name)? {
            return Err(PodtapError::InterfaceAlreadyExists {
                name: link.name,
                namespace: link.netns.to_string(),
            });
        }

        let tunnel = TunnelSpec {
            parent,
            peer: config.peer(),
            params: config.tunnel(),
        };
        tracing::debug!(?link, ?tunnel, "session configured");

        Ok(Self {
            links,
            role,
            phase: SessionPhase::Configuring,
            state: SessionState {
                link,
                tunnel,
                saved: None,
            },
        })
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The resources this session owns.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Records interface settings if egress is mirrored, then creates the
    /// interface and its tunnel.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not configuring, or if reading
    /// the interface settings or creating the interface fails. The session
    /// stays in [`SessionPhase::Configuring`] in that case.
    pub fn activate(&mut self) -> Result<()> {
        if self.phase != SessionPhase::Configuring {
            return Err(PodtapError::config(format!(
                "cannot activate a session that is {}",
                self.phase
            )));
        }

        if let Some(source) = &self.state.link.mirror_egress {
            let state = self.links.link_state(&self.state.link.netns, source)?;
            tracing::info!(
                interface = %source,
                mtu = state.mtu,
                txqlen = state.tx_queue_len,
                "saved interface state"
            );
            self.state.saved = Some(SavedLinkState {
                interface: source.clone(),
                state,
            });
        }

        self.links.make_vxlan(&self.state.link, &self.state.tunnel)?;
        self.phase = SessionPhase::Active;
        tracing::info!(
            role = self.role,
            interface = %self.state.link.name,
            peer = %self.state.tunnel.peer,
            vxlan_id = self.state.tunnel.params.id,
            "session active"
        );
        Ok(())
    }

    /// Restores saved interface settings, then removes the interface.
    ///
    /// Every step is attempted even if an earlier one fails; failures are
    /// logged and returned in the report. A session that never became
    /// active has nothing to clean up.
    pub fn terminate(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();
        if self.phase != SessionPhase::Active {
            self.phase = SessionPhase::Exited;
            return report;
        }

        self.phase = SessionPhase::Terminating;
        tracing::info!(role = self.role, "tearing down session");

        let netns = &self.state.link.netns;
        if let Some(saved) = &self.state.saved {
            report.record(
                TeardownStep::RestoreMtu,
                self.links.set_mtu(netns, &saved.interface, saved.state.mtu),
            );
            report.record(
                TeardownStep::RestoreTxQueueLen,
                self.links
                    .set_tx_queue_len(netns, &saved.interface, saved.state.tx_queue_len),
            );
        }
        report.record(
            TeardownStep::RemoveLink,
            self.links.remove_link(&self.state.link),
        );

        self.phase = SessionPhase::Exited;
        tracing::info!(
            role = self.role,
            failures = report.failures.len(),
            "session exited"
        );
        report
    }
}

fn resolve_parent<L: NetworkLinkService>(links: &L, egress: &EgressSelector) -> Result<String> {
    match egress {
        EgressSelector::Interface(name) => Ok(name.clone()),
        EgressSelector::Address(address) => {
            let addresses = links.local_addresses()?;
            let name = find_interface_by_address(&addresses, *address)
                .ok_or(PodtapError::NoMatchingInterface { address: *address })?;
            tracing::debug!(%address, interface = name, "resolved tunnel parent");
            Ok(name.to_owned())
        }
    }
}

/// Runs a whole session: setup, an indefinite wait on `shutdown`, and
/// teardown.
///
/// # Errors
///
/// Returns the setup error if the session never became active. Teardown
/// failures are logged here as they occur and collected in the report;
/// callers only summarize it.
pub fn run<L: NetworkLinkService>(
    links: &L,
    config: &RoleConfig,
    proc_prefix: &Path,
    shutdown: ShutdownSignal,
) -> Result<TeardownReport> {
    let mut session = MirrorSession::configure(links, config, proc_prefix)?;
    session.activate()?;
    tracing::info!("waiting for termination signal");
    shutdown.wait();
    Ok(session.terminate())
}
