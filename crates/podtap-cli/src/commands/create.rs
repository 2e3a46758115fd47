//! `podtap create`: resolve a mirror session and print its manifests.

use std::io::Write;

use anyhow::Context;
use clap::Args;
use podtap_common::config::MirrorRequest;
use podtap_common::constants;
use podtap_common::error::Result;
use podtap_common::types::{Destination, MirrorDirection, TunnelParams};
use podtap_deploy::cluster::ClusterService;
use podtap_deploy::{descriptor, manifest, resolver};

/// Arguments for the `create` command.
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Name of the pod to mirror.
    #[arg(long)]
    pub pod: String,

    /// Namespace of the pod.
    #[arg(long, short = 'n', default_value = constants::DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Container to tap; the first ready container when unset.
    #[arg(long)]
    pub container: Option<String>,

    /// Interface inside the pod to mirror.
    #[arg(long, default_value = constants::DEFAULT_POD_INTERFACE)]
    pub pod_ifname: String,

    /// Name of the mirror interface created on both ends.
    #[arg(long, default_value = constants::DEFAULT_MIRROR_INTERFACE)]
    pub ifname: String,

    /// Which traffic to mirror: ingress, egress or both.
    #[arg(long, default_value = constants::DEFAULT_MIRROR_TYPE)]
    pub mirrortype: MirrorDirection,

    /// VXLAN network identifier.
    #[arg(long)]
    pub vxlan_id: u32,

    /// VXLAN UDP port.
    #[arg(long, default_value_t = constants::DEFAULT_VXLAN_PORT)]
    pub vxlan_port: u16,

    /// Node that receives the mirrored traffic.
    #[arg(long)]
    pub dest_node: Option<String>,

    /// Host address that receives the mirrored traffic.
    #[arg(long)]
    pub dest_ip: Option<String>,

    /// Image of the session controller pods.
    #[arg(long, env = "PODTAP_IMAGE", default_value = constants::DEFAULT_IMAGE)]
    pub image: String,
}

impl CreateArgs {
    /// Builds and validates the mirror request.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the destination selectors conflict,
    /// the tunnel id is out of range, or a required field is empty.
    pub fn to_request(&self) -> Result<MirrorRequest> {
        let request = MirrorRequest {
            namespace: self.namespace.clone(),
            pod: self.pod.clone(),
            container: self.container.clone(),
            pod_interface: self.pod_ifname.clone(),
            mirror_interface: self.ifname.clone(),
            direction: self.mirrortype,
            tunnel: TunnelParams::new(self.vxlan_id, self.vxlan_port)?,
            destination: Destination::from_selectors(
                self.dest_node.as_deref(),
                self.dest_ip.as_deref(),
            )?,
            image: self.image.clone(),
        };
        request.validate()?;
        Ok(request)
    }
}

/// Executes the `create` command.
///
/// Nothing is written to stdout unless both manifests render.
///
/// # Errors
///
/// Returns an error if resolution or rendering fails, or stdout is closed.
pub async fn execute<C>(cluster: &C, request: &MirrorRequest) -> anyhow::Result<()>
where
    C: ClusterService + ?Sized,
{
    let yaml = render(cluster, request).await?;
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(yaml.as_bytes())
        .context("failed to write manifests")?;
    stdout.flush().context("failed to write manifests")?;
    Ok(())
}

async fn render<C>(cluster: &C, request: &MirrorRequest) -> Result<String>
where
    C: ClusterService + ?Sized,
{
    tracing::info!(pod = %request.pod_key(), destination = %request.destination, "creating mirror session");
    let facts = resolver::resolve(cluster, request).await?;
    let descriptors = descriptor::generate(request, &facts);
    manifest::render_all(&descriptors)
}
