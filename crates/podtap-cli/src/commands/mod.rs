//! CLI command definitions and dispatch.

pub mod create;
pub mod nodes;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use podtap_common::error::PodtapError;
use podtap_deploy::cluster::KubeClusterService;

/// podtap: mirror a pod's traffic to another host over VXLAN.
#[derive(Parser, Debug)]
#[command(name = "podtap", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to the kubeconfig; in-cluster or default config when unset.
    #[arg(long, global = true, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the sender and receiver manifests for a mirror session.
    Create(create::CreateArgs),
    /// List nodes with their internal IPs.
    Nodes(nodes::NodesArgs),
}

/// Connects to the cluster and dispatches the parsed command.
///
/// # Errors
///
/// Returns an error if the cluster is unreachable or the command fails.
pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    let kubeconfig = cli.kubeconfig.as_deref();
    match cli.command {
        Command::Create(args) => {
            // Argument errors surface before any cluster connection.
            let request = args.to_request()?;
            let cluster = KubeClusterService::connect(kubeconfig).await?;
            create::execute(&cluster, &request).await
        }
        Command::Nodes(args) => {
            let cluster = KubeClusterService::connect(kubeconfig).await?;
            nodes::execute(&cluster, &args).await
        }
    }
}

/// Exit status for a failed run: the category code of the first
/// [`PodtapError`] in the error chain, or 1 when there is none.
#[must_use]
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<PodtapError>())
        .map_or(1, |e| e.category().exit_code())
}
