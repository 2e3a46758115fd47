//! Recording [`NetworkLinkService`] double for controller tests.

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use podtap_common::error::{PodtapError, Result};
use podtap_common::types::ContainerRef;
use podtap_netlink::{LinkSpec, LinkState, LocalAddress, Netns, NetworkLinkService, TunnelSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ResolveNetns(String),
    LinkExists(Netns, String),
    LocalAddresses,
    LinkState(Netns, String),
    SetMtu(String, u32),
    SetTxQueueLen(String, u32),
    MakeVxlan(LinkSpec, TunnelSpec),
    RemoveLink(String),
}

#[derive(Debug, Default)]
pub struct FakeLinks {
    pub calls: RefCell<Vec<Call>>,
    pub existing: HashSet<(Netns, String)>,
    pub addresses: Vec<LocalAddress>,
    pub state: Option<LinkState>,
    pub fail_resolve: bool,
    pub fail_set_mtu: bool,
    pub fail_set_txqlen: bool,
    pub fail_make: bool,
    pub fail_remove: bool,
}

pub fn container_netns() -> Netns {
    Netns::Path(PathBuf::from("/host/proc/4242/ns/net"))
}

impl FakeLinks {
    pub fn new() -> Self {
        Self {
            addresses: vec![
                LocalAddress::new("lo", "127.0.0.1".parse().unwrap()),
                LocalAddress::new("ens3", "10.0.0.5".parse().unwrap()),
            ],
            state: Some(LinkState {
                mtu: 1450,
                tx_queue_len: 1000,
            }),
            ..Self::default()
        }
    }

    pub fn with_existing(mut self, netns: Netns, name: &str) -> Self {
        let _ = self.existing.insert((netns, name.to_owned()));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn made_vxlan(&self) -> bool {
        self.calls().iter().any(|c| matches!(c, Call::MakeVxlan(..)))
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

fn injected(what: &str) -> PodtapError {
    PodtapError::link(format!("injected {what} failure"))
}

impl NetworkLinkService for FakeLinks {
    fn resolve_netns(&self, container: &ContainerRef, proc_prefix: &Path) -> Result<Netns> {
        self.record(Call::ResolveNetns(container.to_string()));
        if self.fail_resolve {
            return Err(injected("resolve"));
        }
        assert_eq!(proc_prefix, Path::new("/host"));
        Ok(container_netns())
    }

    fn link_exists(&self, netns: &Netns, name: &str) -> Result<bool> {
        self.record(Call::LinkExists(netns.clone(), name.to_owned()));
        Ok(self.existing.contains(&(netns.clone(), name.to_owned())))
    }

    fn local_addresses(&self) -> Result<Vec<LocalAddress>> {
        self.record(Call::LocalAddresses);
        Ok(self.addresses.clone())
    }

    fn link_state(&self, netns: &Netns, name: &str) -> Result<LinkState> {
        self.record(Call::LinkState(netns.clone(), name.to_owned()));
        self.state.ok_or_else(|| injected("link state"))
    }

    fn set_mtu(&self, _netns: &Netns, name: &str, mtu: u32) -> Result<()> {
        self.record(Call::SetMtu(name.to_owned(), mtu));
        if self.fail_set_mtu {
            return Err(injected("set mtu"));
        }
        Ok(())
    }

    fn set_tx_queue_len(&self, _netns: &Netns, name: &str, len: u32) -> Result<()> {
        self.record(Call::SetTxQueueLen(name.to_owned(), len));
        if self.fail_set_txqlen {
            return Err(injected("set txqueuelen"));
        }
        Ok(())
    }

    fn make_vxlan(&self, link: &LinkSpec, tunnel: &TunnelSpec) -> Result<()> {
        self.record(Call::MakeVxlan(link.clone(), tunnel.clone()));
        if self.fail_make {
            return Err(injected("make vxlan"));
        }
        Ok(())
    }

    fn remove_link(&self, link: &LinkSpec) -> Result<()> {
        self.record(Call::RemoveLink(link.name.clone()));
        if self.fail_remove {
            return Err(injected("remove"));
        }
        Ok(())
    }
}
