//! Production [`NetworkLinkService`] built on iproute2 and `nsenter`.
//!
//! Commands targeting a container namespace are wrapped as
//! `nsenter --net=<path> -- <cmd>`.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use podtap_common::error::{PodtapError, Result};
use podtap_common::types::ContainerRef;
use serde::Deserialize;

use crate::NetworkLinkService;
use crate::addr::{self, LocalAddress};
use crate::link::{LinkSpec, LinkState, Netns, TunnelSpec};
use crate::netns;

/// Where a mirred filter hooks into the mirrored interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MirrorHook {
    /// Ingress qdisc `ffff:`, copying inbound traffic.
    Ingress,
    /// Root `prio` qdisc `1:`, copying outbound traffic.
    Egress,
}

impl MirrorHook {
    const fn handle(self) -> &'static str {
        match self {
            Self::Ingress => "ffff:",
            Self::Egress => "1:",
        }
    }

    fn qdisc_add_args(self, source: &str) -> Vec<String> {
        match self {
            Self::Ingress => argv(&["qdisc", "add", "dev", source, "handle", self.handle(), "ingress"]),
            Self::Egress => argv(&["qdisc", "add", "dev", source, "handle", self.handle(), "root", "prio"]),
        }
    }

    fn qdisc_del_args(self, source: &str) -> Vec<String> {
        match self {
            Self::Ingress => argv(&["qdisc", "del", "dev", source, "handle", self.handle(), "ingress"]),
            Self::Egress => argv(&["qdisc", "del", "dev", source, "root"]),
        }
    }

    fn filter_add_args(self, source: &str, target: &str) -> Vec<String> {
        argv(&[
            "filter", "add", "dev", source, "parent", self.handle(), "matchall", "action", "mirred",
            "egress", "mirror", "dev", target,
        ])
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| (*p).to_owned()).collect()
}

fn vxlan_add_args(link: &LinkSpec, tunnel: &TunnelSpec) -> Vec<String> {
    argv(&[
        "link",
        "add",
        &link.name,
        "type",
        "vxlan",
        "id",
        &tunnel.params.id.to_string(),
        "remote",
        &tunnel.peer.to_string(),
        "dev",
        &tunnel.parent,
        "dstport",
        &tunnel.params.port.to_string(),
    ])
}

fn netns_move_args(name: &str, target: &Path) -> Vec<String> {
    argv(&["link", "set", "dev", name, "netns", &target.to_string_lossy()])
}

fn link_del_args(name: &str) -> Vec<String> {
    argv(&["link", "del", "dev", name])
}

/// Mirror hooks requested by `link`, ingress first.
fn requested_hooks(link: &LinkSpec) -> impl Iterator<Item = (MirrorHook, &str)> {
    [
        (MirrorHook::Ingress, link.mirror_ingress.as_deref()),
        (MirrorHook::Egress, link.mirror_egress.as_deref()),
    ]
    .into_iter()
    .filter_map(|(hook, source)| source.map(|s| (hook, s)))
}

/// Drives `ip`, `tc`, and `nsenter` found on `$PATH`.
#[derive(Debug, Clone)]
pub struct IpRouteLinkService {
    ip: PathBuf,
    tc: PathBuf,
    nsenter: PathBuf,
}

impl IpRouteLinkService {
    /// Locates the required tools.
    ///
    /// # Errors
    ///
    /// Returns an error if `ip`, `tc`, or `nsenter` is not installed.
    pub fn new() -> Result<Self> {
        Ok(Self {
            ip: locate("ip")?,
            tc: locate("tc")?,
            nsenter: locate("nsenter")?,
        })
    }

    fn command(&self, netns: &Netns, program: &Path) -> Command {
        match netns {
            Netns::Host => Command::new(program),
            Netns::Path(path) => {
                let mut cmd = Command::new(&self.nsenter);
                let _ = cmd
                    .arg(format!("--net={}", path.display()))
                    .arg("--")
                    .arg(program);
                cmd
            }
        }
    }

    fn output(&self, netns: &Netns, program: &Path, args: &[String]) -> Result<Output> {
        tracing::debug!(%netns, program = %program.display(), ?args, "running");
        self.command(netns, program)
            .args(args)
            .output()
            .map_err(|e| PodtapError::Io {
                path: program.to_path_buf(),
                source: e,
            })
    }

    fn run(&self, netns: &Netns, program: &Path, args: &[String]) -> Result<Output> {
        let output = self.output(netns, program, args)?;
        if !output.status.success() {
            return Err(PodtapError::link(format!(
                "`{} {}` in {netns} failed: {}",
                program.display(),
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output)
    }

    fn ip(&self, netns: &Netns, args: &[String]) -> Result<Output> {
        self.run(netns, &self.ip, args)
    }

    fn tc(&self, netns: &Netns, args: &[String]) -> Result<Output> {
        self.run(netns, &self.tc, args)
    }

    /// Moves the link into place, brings it up, and installs mirroring.
    ///
    /// Every qdisc that was added is pushed onto `installed`, so a failure
    /// part way through can be undone without touching qdiscs podtap did
    /// not create.
    fn configure(&self, link: &LinkSpec, installed: &mut Vec<(MirrorHook, String)>) -> Result<()> {
        if let Netns::Path(path) = &link.netns {
            let _ = self.ip(&Netns::Host, &netns_move_args(&link.name, path))?;
        }
        let _ = self.ip(&link.netns, &argv(&["link", "set", "dev", &link.name, "up"]))?;

        for (hook, source) in requested_hooks(link) {
            let _ = self.tc(&link.netns, &hook.qdisc_add_args(source))?;
            installed.push((hook, source.to_owned()));
            let _ = self.tc(&link.netns, &hook.filter_add_args(source, &link.name))?;
            tracing::debug!(source, target = %link.name, parent = hook.handle(), "mirror filter attached");
        }
        Ok(())
    }

    fn detach(&self, netns: &Netns, hook: MirrorHook, source: &str) {
        if let Err(e) = self.tc(netns, &hook.qdisc_del_args(source)) {
            tracing::warn!(source, ?hook, error = %e, "failed to remove mirror qdisc");
        }
    }

    fn rollback(&self, link: &LinkSpec, installed: &[(MirrorHook, String)]) {
        for (hook, source) in installed.iter().rev() {
            self.detach(&link.netns, *hook, source);
        }
        // The link is in the host namespace if the move failed.
        for netns in [&link.netns, &Netns::Host] {
            if self.ip(netns, &link_del_args(&link.name)).is_ok() {
                return;
            }
        }
        tracing::warn!(name = %link.name, "failed to remove partially created interface");
    }
}

fn locate(tool: &str) -> Result<PathBuf> {
    which::which(tool).map_err(|e| PodtapError::link(format!("{tool} not found: {e}")))
}

#[derive(Debug, Deserialize)]
struct IpLinkJson {
    mtu: u32,
    txqlen: Option<u32>,
}

/// Parses the output of `ip -json link show dev <name>`.
///
/// # Errors
///
/// Returns an error if the document does not describe exactly one link
/// with an MTU and a queue length.
pub fn parse_link_state(json: &str, name: &str) -> Result<LinkState> {
    let links: Vec<IpLinkJson> = serde_json::from_str(json)?;
    let [link] = links.as_slice() else {
        return Err(PodtapError::link(format!(
            "expected one link named {name}, got {}",
            links.len()
        )));
    };
    let tx_queue_len = link
        .txqlen
        .ok_or_else(|| PodtapError::link(format!("{name} reports no transmit queue length")))?;
    Ok(LinkState {
        mtu: link.mtu,
        tx_queue_len,
    })
}

impl NetworkLinkService for IpRouteLinkService {
    fn resolve_netns(&self, container: &ContainerRef, proc_prefix: &Path) -> Result<Netns> {
        netns::resolve(container, proc_prefix)
    }

    fn link_exists(&self, netns: &Netns, name: &str) -> Result<bool> {
        let output = self.output(netns, &self.ip, &argv(&["link", "show", "dev", name]))?;
        if output.status.success() {
            return Ok(true);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("does not exist") {
            return Ok(false);
        }
        Err(PodtapError::link(format!(
            "cannot inspect {name} in {netns}: {}",
            stderr.trim()
        )))
    }

    fn local_addresses(&self) -> Result<Vec<LocalAddress>> {
        addr::scan_local_addresses()
    }

    fn link_state(&self, netns: &Netns, name: &str) -> Result<LinkState> {
        let output = self.ip(netns, &argv(&["-json", "link", "show", "dev", name]))?;
        parse_link_state(&String::from_utf8_lossy(&output.stdout), name)
    }

    fn set_mtu(&self, netns: &Netns, name: &str, mtu: u32) -> Result<()> {
        let _ = self.ip(netns, &argv(&["link", "set", "dev", name, "mtu", &mtu.to_string()]))?;
        Ok(())
    }

    fn set_tx_queue_len(&self, netns: &Netns, name: &str, len: u32) -> Result<()> {
        let _ = self.ip(
            netns,
            &argv(&["link", "set", "dev", name, "txqueuelen", &len.to_string()]),
        )?;
        Ok(())
    }

    fn make_vxlan(&self, link: &LinkSpec, tunnel: &TunnelSpec) -> Result<()> {
        let _ = self.ip(&Netns::Host, &vxlan_add_args(link, tunnel))?;
        tracing::debug!(name = %link.name, id = tunnel.params.id, peer = %tunnel.peer, parent = %tunnel.parent, "vxlan link added");

        let mut installed = Vec::new();
        if let Err(e) = self.configure(link, &mut installed) {
            self.rollback(link, &installed);
            return Err(e);
        }
        tracing::info!(name = %link.name, netns = %link.netns, "mirror interface created");
        Ok(())
    }

    fn remove_link(&self, link: &LinkSpec) -> Result<()> {
        for (hook, source) in requested_hooks(link) {
            self.detach(&link.netns, hook, source);
        }
        let _ = self.ip(&link.netns, &link_del_args(&link.name))?;
        tracing::info!(name = %link.name, netns = %link.netns, "mirror interface removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_state_is_parsed_from_json() {
        let json = r#"[{"ifindex":2,"ifname":"eth0","flags":["UP"],"mtu":1450,"qdisc":"noqueue","operstate":"UP","txqlen":1000}]"#;
        let state = parse_link_state(json, "eth0").unwrap();
        assert_eq!(
            state,
            LinkState {
                mtu: 1450,
                tx_queue_len: 1000
            }
        );
    }

    #[test]
    fn missing_queue_length_is_an_error() {
        let json = r#"[{"ifname":"eth0","mtu":1500}]"#;
        assert!(parse_link_state(json, "eth0").is_err());
    }

    #[test]
    fn empty_listing_is_an_error() {
        assert!(parse_link_state("[]", "eth0").is_err());
    }

    fn sender_link() -> LinkSpec {
        LinkSpec {
            netns: Netns::Path(PathBuf::from("/host/proc/42/ns/net")),
            name: "mirror".into(),
            mirror_ingress: Some("eth0".into()),
            mirror_egress: Some("eth0".into()),
        }
    }

    fn tunnel() -> TunnelSpec {
        TunnelSpec {
            parent: "ens3".into(),
            peer: "10.0.0.9".parse().unwrap(),
            params: podtap_common::types::TunnelParams::new(100, 4789).unwrap(),
        }
    }

    #[test]
    fn vxlan_add_names_parent_peer_and_port() {
        assert_eq!(
            vxlan_add_args(&sender_link(), &tunnel()).join(" "),
            "link add mirror type vxlan id 100 remote 10.0.0.9 dev ens3 dstport 4789"
        );
        assert_eq!(
            netns_move_args("mirror", Path::new("/host/proc/42/ns/net")).join(" "),
            "link set dev mirror netns /host/proc/42/ns/net"
        );
    }

    #[test]
    fn mirror_hooks_use_fixed_handles() {
        assert_eq!(
            MirrorHook::Ingress.qdisc_add_args("eth0").join(" "),
            "qdisc add dev eth0 handle ffff: ingress"
        );
        assert_eq!(
            MirrorHook::Egress.qdisc_add_args("eth0").join(" "),
            "qdisc add dev eth0 handle 1: root prio"
        );
        assert_eq!(
            MirrorHook::Egress.filter_add_args("eth0", "mirror").join(" "),
            "filter add dev eth0 parent 1: matchall action mirred egress mirror dev mirror"
        );
        assert_eq!(
            MirrorHook::Ingress.qdisc_del_args("eth0").join(" "),
            "qdisc del dev eth0 handle ffff: ingress"
        );
        assert_eq!(
            MirrorHook::Egress.qdisc_del_args("eth0").join(" "),
            "qdisc del dev eth0 root"
        );
    }

    #[test]
    fn hooks_follow_requested_directions() {
        let mut link = sender_link();
        link.mirror_ingress = None;
        let hooks: Vec<_> = requested_hooks(&link).collect();
        assert_eq!(hooks, [(MirrorHook::Egress, "eth0")]);
        assert_eq!(requested_hooks(&LinkSpec::plain(Netns::Host, "mirror")).count(), 0);
    }

    /// Stand-in `ip`/`tc`/`nsenter` scripts that append every call to a log.
    mod scripted {
        use std::os::unix::fs::PermissionsExt;
        use std::sync::{Mutex, PoisonError};

        use super::*;

        // Writing an executable while another test thread forks can make
        // exec fail with ETXTBSY.
        static SPAWN_LOCK: Mutex<()> = Mutex::new(());

        pub struct Tools {
            pub dir: tempfile::TempDir,
            pub service: IpRouteLinkService,
        }

        impl Tools {
            pub fn calls(&self) -> Vec<String> {
                std::fs::read_to_string(self.dir.path().join("calls.log"))
                    .unwrap_or_default()
                    .lines()
                    .map(str::to_owned)
                    .collect()
            }
        }

        fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
            let path = dir.join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        /// Runs `f` against tools where any `tc` call containing `fail_on`
        /// exits non-zero.
        pub fn with_tools<T>(fail_on: &str, f: impl FnOnce(&Tools) -> T) -> T {
            let _guard = SPAWN_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
            let dir = tempfile::tempdir().unwrap();
            let log = dir.path().join("calls.log");
            let log = log.display();
            let ip = script(dir.path(), "ip", &format!("echo \"ip $*\" >> {log}\n"));
            let tc = script(
                dir.path(),
                "tc",
                &format!(
                    "echo \"tc $*\" >> {log}\ncase \"$*\" in *\"{fail_on}\"*) echo boom >&2; exit 1;; esac\n"
                ),
            );
            let nsenter = script(dir.path(), "nsenter", "shift; shift; exec \"$@\"\n");
            let tools = Tools {
                service: IpRouteLinkService { ip, tc, nsenter },
                dir,
            };
            f(&tools)
        }
    }

    #[test]
    fn failed_egress_hook_removes_installed_ingress_qdisc() {
        scripted::with_tools("root prio", |tools| {
            let err = tools
                .service
                .make_vxlan(&sender_link(), &tunnel())
                .unwrap_err();
            assert!(matches!(err, PodtapError::Link { .. }));
            assert_eq!(
                tools.calls(),
                [
                    "ip link add mirror type vxlan id 100 remote 10.0.0.9 dev ens3 dstport 4789",
                    "ip link set dev mirror netns /host/proc/42/ns/net",
                    "ip link set dev mirror up",
                    "tc qdisc add dev eth0 handle ffff: ingress",
                    "tc filter add dev eth0 parent ffff: matchall action mirred egress mirror dev mirror",
                    "tc qdisc add dev eth0 handle 1: root prio",
                    "tc qdisc del dev eth0 handle ffff: ingress",
                    "ip link del dev mirror",
                ]
            );
        });
    }

    #[test]
    fn failed_first_qdisc_leaves_existing_qdiscs_alone() {
        scripted::with_tools("add dev eth0 handle ffff:", |tools| {
            assert!(tools.service.make_vxlan(&sender_link(), &tunnel()).is_err());
            let calls = tools.calls();
            assert!(!calls.iter().any(|c| c.starts_with("tc qdisc del")));
            assert_eq!(calls.last().map(String::as_str), Some("ip link del dev mirror"));
        });
    }

    #[test]
    fn remove_link_detaches_both_hooks_then_deletes() {
        scripted::with_tools("never-matches", |tools| {
            tools.service.make_vxlan(&sender_link(), &tunnel()).unwrap();
            tools.service.remove_link(&sender_link()).unwrap();
            let calls = tools.calls();
            assert_eq!(
                &calls[calls.len() - 3..],
                [
                    "tc qdisc del dev eth0 handle ffff: ingress",
                    "tc qdisc del dev eth0 root",
                    "ip link del dev mirror",
                ]
            );
        });
    }

    #[test]
    fn container_commands_are_wrapped_in_nsenter() {
        let svc = IpRouteLinkService {
            ip: PathBuf::from("/sbin/ip"),
            tc: PathBuf::from("/sbin/tc"),
            nsenter: PathBuf::from("/usr/bin/nsenter"),
        };
        let netns = Netns::Path(PathBuf::from("/host/proc/42/ns/net"));
        let cmd = svc.command(&netns, Path::new("/sbin/ip"));
        assert_eq!(cmd.get_program(), "/usr/bin/nsenter");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, ["--net=/host/proc/42/ns/net", "--", "/sbin/ip"]);

        let host = svc.command(&Netns::Host, Path::new("/sbin/ip"));
        assert_eq!(host.get_program(), "/sbin/ip");
        assert_eq!(host.get_args().count(), 0);
    }
}
