//! CLI definitions and the shared role runner.

pub mod receiver;
pub mod sender;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use podtap_common::constants;
use podtap_common::error::PodtapError;
use podtap_netlink::IpRouteLinkService;
use podtap_session::{RoleConfig, shutdown};

/// podtap-pod: one side of a VXLAN mirror session.
#[derive(Parser, Debug)]
#[command(name = "podtap-pod", version, about, long_about = None)]
pub struct Cli {
    /// Role to run.
    #[command(subcommand)]
    pub command: Command,

    /// Prefix under which the host's /proc is mounted.
    #[arg(long, global = true, default_value = constants::DEFAULT_PROC_PREFIX)]
    pub procprefix: PathBuf,
}

/// Session roles.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Tap a container's interface and send copies through the tunnel.
    Sender(sender::SenderArgs),
    /// Terminate the tunnel on this host.
    Receiver(receiver::ReceiverArgs),
}

/// Validates the role arguments, then runs the session until terminated.
///
/// # Errors
///
/// Returns an error if the arguments are invalid or the session cannot
/// be set up. Teardown failures are logged and do not fail the process.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = match cli.command {
        Command::Sender(args) => args.into_config()?,
        Command::Receiver(args) => args.into_config()?,
    };
    run_role(&config, &cli.procprefix)
}

fn run_role(config: &RoleConfig, proc_prefix: &Path) -> anyhow::Result<()> {
    let links = IpRouteLinkService::new()?;

    let (mut trigger, signal) = shutdown::channel();
    ctrlc::set_handler(move || trigger.fire())
        .context("failed to install termination handler")?;

    let report = podtap_session::run(&links, config, proc_prefix, signal)?;
    if report.is_clean() {
        tracing::info!(role = config.role(), "session exited cleanly");
    } else {
        tracing::warn!(
            role = config.role(),
            failures = report.failures.len(),
            "session exited with teardown failures"
        );
    }
    Ok(())
}

/// Exit status for a failed run: the category code of the first
/// [`PodtapError`] in the error chain, or 1 when there is none.
#[must_use]
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<PodtapError>())
        .map_or(1, |e| e.category().exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn procprefix_defaults_to_host() {
        let cli = Cli::try_parse_from([
            "podtap-pod",
            "receiver",
            "--ifname=mirror",
            "--vxlan-egressif=ens3",
            "--vxlan-id=100",
            "--vxlan-ip=10.0.0.5",
        ])
        .unwrap();
        assert_eq!(cli.procprefix, PathBuf::from("/host"));
        assert!(matches!(cli.command, Command::Receiver(_)));
    }

    #[test]
    fn procprefix_precedes_role() {
        let cli = Cli::try_parse_from([
            "podtap-pod",
            "--procprefix=/rootfs",
            "receiver",
            "--ifname=mirror",
            "--vxlan-egressip=10.0.0.9",
            "--vxlan-id=100",
            "--vxlan-ip=10.0.0.5",
        ])
        .unwrap();
        assert_eq!(cli.procprefix, PathBuf::from("/rootfs"));
    }

    #[test]
    fn interface_collision_exits_as_conflict() {
        let err = anyhow::Error::from(PodtapError::InterfaceAlreadyExists {
            name: "mirror".into(),
            namespace: "host".into(),
        });
        assert_eq!(exit_code(&err), 4);
    }

    #[test]
    fn conflicting_egress_flags_exit_as_configuration_errors() {
        let cli = Cli::try_parse_from([
            "podtap-pod",
            "receiver",
            "--ifname=mirror",
            "--vxlan-egressif=ens3",
            "--vxlan-egressip=10.0.0.9",
            "--vxlan-id=100",
            "--vxlan-ip=10.0.0.5",
        ])
        .unwrap();
        let err = execute(cli).unwrap_err();
        assert_eq!(exit_code(&err), 2);
    }
}
