//! Container network namespace lookup.
//!
//! The container runtime is asked for the init PID of the container; the
//! namespace is then `<proc_prefix>/proc/<pid>/ns/net`.

use std::path::{Path, PathBuf};

use podtap_common::error::{PodtapError, Result};
use podtap_common::types::{ContainerRef, ContainerRuntime};

use crate::link::Netns;

/// Resolves the network namespace of `container`.
///
/// # Errors
///
/// Returns an error if the runtime lookup fails or the namespace file
/// is missing.
pub fn resolve(container: &ContainerRef, proc_prefix: &Path) -> Result<Netns> {
    let pid = match container.runtime() {
        ContainerRuntime::Docker => docker_pid(container.id())?,
        ContainerRuntime::CriO => crio_pid(container.id())?,
    };
    let netns = namespace_of(proc_prefix, pid)?;
    tracing::info!(container = %container, pid, %netns, "resolved container namespace");
    Ok(netns)
}

/// Returns the namespace of `pid` if its file exists under `proc_prefix`.
///
/// # Errors
///
/// Returns a link error if the namespace file is missing.
pub fn namespace_of(proc_prefix: &Path, pid: u32) -> Result<Netns> {
    let path = netns_path(proc_prefix, pid);
    if !path.exists() {
        return Err(PodtapError::link(format!(
            "no network namespace for pid {pid} at {}",
            path.display()
        )));
    }
    Ok(Netns::Path(path))
}

/// Builds `<prefix>/proc/<pid>/ns/net`.
#[must_use]
pub fn netns_path(proc_prefix: &Path, pid: u32) -> PathBuf {
    proc_prefix
        .join("proc")
        .join(pid.to_string())
        .join("ns")
        .join("net")
}

fn docker_pid(id: &str) -> Result<u32> {
    use bollard::Docker;
    use bollard::container::InspectContainerOptions;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| PodtapError::Io {
            path: "tokio runtime".into(),
            source: e,
        })?;

    let pid = runtime.block_on(async {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| PodtapError::link(format!("cannot connect to docker: {e}")))?;
        let info = docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| PodtapError::link(format!("docker inspect {id} failed: {e}")))?;
        Ok::<_, PodtapError>(info.state.and_then(|s| s.pid))
    })?;

    positive_pid(pid, id)
}

fn crio_pid(id: &str) -> Result<u32> {
    let crictl = which::which("crictl").map_err(|e| PodtapError::link(format!("crictl: {e}")))?;
    let endpoint = format!("unix://{}", ContainerRuntime::CriO.socket_path());
    let output = std::process::Command::new(&crictl)
        .args(["--runtime-endpoint", &endpoint, "inspect", id])
        .output()
        .map_err(|e| PodtapError::Io {
            path: crictl.clone(),
            source: e,
        })?;
    if !output.status.success() {
        return Err(PodtapError::link(format!(
            "crictl inspect {id} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    parse_crictl_pid(&String::from_utf8_lossy(&output.stdout), id)
}

/// Extracts `.info.pid` from `crictl inspect` output.
///
/// # Errors
///
/// Returns an error if the document does not parse or has no PID.
pub fn parse_crictl_pid(json: &str, id: &str) -> Result<u32> {
    let doc: serde_json::Value = serde_json::from_str(json)?;
    positive_pid(doc.pointer("/info/pid").and_then(serde_json::Value::as_i64), id)
}

fn positive_pid(pid: Option<i64>, id: &str) -> Result<u32> {
    pid.and_then(|p| u32::try_from(p).ok())
        .filter(|p| *p > 0)
        .ok_or_else(|| PodtapError::link(format!("container {id} is not running")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn netns_path_honours_prefix() {
        assert_eq!(
            netns_path(Path::new("/host"), 4242),
            PathBuf::from("/host/proc/4242/ns/net")
        );
        assert_eq!(
            netns_path(Path::new("/"), 1),
            PathBuf::from("/proc/1/ns/net")
        );
    }

    #[test]
    fn namespace_must_exist_under_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let ns_dir = dir.path().join("proc/77/ns");
        std::fs::create_dir_all(&ns_dir).unwrap();
        std::fs::write(ns_dir.join("net"), b"").unwrap();

        assert_eq!(
            namespace_of(dir.path(), 77).unwrap(),
            Netns::Path(ns_dir.join("net"))
        );
        assert!(matches!(
            namespace_of(dir.path(), 78),
            Err(PodtapError::Link { .. })
        ));
    }

    #[test]
    fn crictl_pid_is_read_from_info() {
        let doc = r#"{"status": {"id": "xyz"}, "info": {"pid": 31337, "sandboxID": "abc"}}"#;
        assert_eq!(parse_crictl_pid(doc, "xyz").unwrap(), 31337);
    }

    #[test]
    fn stopped_container_has_no_pid() {
        let doc = r#"{"info": {"pid": 0}}"#;
        assert!(parse_crictl_pid(doc, "xyz").is_err());
        assert!(parse_crictl_pid("{}", "xyz").is_err());
    }

    #[test]
    fn garbage_is_a_serialization_error() {
        assert!(matches!(
            parse_crictl_pid("not json", "xyz"),
            Err(PodtapError::Serialization { .. })
        ));
    }
}
