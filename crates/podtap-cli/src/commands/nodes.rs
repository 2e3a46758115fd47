//! `podtap nodes`: list candidate destination nodes.

use clap::Args;
use podtap_deploy::cluster::ClusterService;

use crate::output::format_node_table;

/// Arguments for the `nodes` command.
#[derive(Args, Debug)]
pub struct NodesArgs {
    /// Print only node names.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Executes the `nodes` command.
///
/// # Errors
///
/// Returns an error if the nodes cannot be listed.
pub async fn execute<C>(cluster: &C, args: &NodesArgs) -> anyhow::Result<()>
where
    C: ClusterService + ?Sized,
{
    let mut nodes = cluster.list_nodes().await?;
    nodes.sort_by(|a, b| a.name.cmp(&b.name));

    if nodes.is_empty() {
        eprintln!("No nodes found.");
        return Ok(());
    }

    if args.quiet {
        for node in &nodes {
            println!("{}", node.name);
        }
    } else {
        print!("{}", format_node_table(&nodes));
    }
    Ok(())
}
