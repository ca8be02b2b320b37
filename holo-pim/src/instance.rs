//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! The PIM Node (§2 Component J) and its single-threaded cooperative
//! event loop (§5).
//!
//! This does not implement a northbound `ProtocolInstance`: this
//! daemon's configuration and lifecycle are standalone rather than
//! hosted under a YANG-driven multi-protocol supervisor.

use std::marker::PhantomData;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use holo_utils::socket::{AsyncFd, Socket};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::bsr::{self, BsrGroupPrefix, BsrRp, BsrZone, CandBsrState, ScopeZoneId};
use crate::collections::{MreId, Mres, NbrId, Neighbors, VifId, Vifs};
use crate::config::InstanceCfg;
use crate::debug::Debug;
use crate::error::{Error, Result};
use crate::iface::Vif;
use crate::kernel;
use crate::mfc::{self, MfcEntry, MfcKey, MonitorDirection, ProjectionInputs};
use crate::mre::{AssertMetric, AssertState, DownstreamState, Mre, MifSet, MreKey, RegisterState};
use crate::mrib::MribTable;
use crate::neighbor::{DrCandidate, HelloOptions, PimNbr, dr_election, pim_nbr_me_addr};
use crate::packet::assert::Assert;
use crate::packet::bootstrap::Bootstrap;
use crate::packet::cand_rp_adv::CandRpAdv;
use crate::packet::join_prune::{GroupEntry, JoinPrune};
use crate::packet::register::{Register, RegisterStop};
use crate::packet::{EncodedGroup, EncodedSource, EncodedUnicast, GroupFlags, Message, SourceFlags};
use crate::rp::{LearnedMethod, RpEntry, RpTable};
use crate::scope::{ScopeZone, ScopeZoneTable};
use crate::tasks::{Task, TaskQueue};
use crate::version::Version;

/// One vif's raw socket plus the bits of runtime state the event loop
/// multiplexes over that don't belong in [`Vif`] itself (timers are
/// owned here so they can be polled by `tokio::select!`). The socket is
/// shared with a spawned reader task, so it's wrapped in an `Arc`.
pub struct VifRuntime {
    pub socket: Arc<AsyncFd<Socket>>,
    pub ifindex: u32,
    pub hello_deadline: Instant,
    pub triggered_hello_deadline: Option<Instant>,
    reader: JoinHandle<()>,
}

/// Inbound event fed to the core from the outside world: a decoded
/// packet, a southbound membership change, or a kernel upcall.
pub enum Event {
    Packet { vif: VifId, src: IpAddr, message: Message },
    Membership { vif: VifId, source: Option<IpAddr>, group: IpAddr, present: bool },
    MfcUpcall(crate::kernel::Upcall),
}

/// Top-level PIM-SM protocol engine for one address family (§2, §5).
pub struct PimNode<V: Version> {
    pub config: InstanceCfg,
    pub vifs: Vifs,
    pub vif_runtime: std::collections::BTreeMap<VifId, VifRuntime>,
    pub neighbors: Neighbors,
    pub mres: Mres,
    pub mfcs: std::collections::HashMap<crate::mfc::MfcKey, MfcEntry>,
    pub rp_table: RpTable,
    pub scope_zones: ScopeZoneTable,
    pub bsr_zones: Vec<BsrZone>,
    pub mrib: MribTable,
    pub tasks: TaskQueue,
    pub event_tx: mpsc::UnboundedSender<Event>,
    pub event_rx: mpsc::UnboundedReceiver<Event>,
    out_tx: mpsc::UnboundedSender<(VifId, IpAddr, Message)>,
    pub out_rx: mpsc::UnboundedReceiver<(VifId, IpAddr, Message)>,
    _marker: PhantomData<V>,
}

impl<V: Version> PimNode<V> {
    pub fn new(config: InstanceCfg) -> PimNode<V> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        PimNode {
            config,
            vifs: Vifs::default(),
            vif_runtime: Default::default(),
            neighbors: Neighbors::default(),
            mres: Mres::default(),
            mfcs: Default::default(),
            rp_table: RpTable::default(),
            scope_zones: ScopeZoneTable::default(),
            bsr_zones: Vec::new(),
            mrib: MribTable::default(),
            tasks: TaskQueue::default(),
            event_tx,
            event_rx,
            out_tx,
            out_rx,
            _marker: PhantomData,
        }
    }

    /// Seeds scope zones, static RPs, and candidate-BSR/candidate-RP
    /// state from `self.config` (§6.4). Called once after `new()`, once
    /// vifs have been started (so scope-zone vif names resolve).
    pub fn apply_config(&mut self) {
        for zone_cfg in self.config.scope_zones.clone() {
            let mut scoped = MifSet::new();
            for name in &zone_cfg.vifs {
                if let Some((_, vif)) = self.vifs.get_by_name(name) {
                    scoped.set(vif.vif_index);
                }
            }
            self.scope_zones.insert(ScopeZone {
                prefix: zone_cfg.scope_zone_prefix,
                scoped_vifs: scoped,
            });
        }

        for rp_cfg in self.config.static_rps.clone() {
            self.add_rp(RpEntry {
                rp_addr: rp_cfg.rp_addr,
                group_prefix: rp_cfg.group_prefix,
                priority: rp_cfg.priority,
                hash_mask_len: rp_cfg.hash_mask_len,
                learned_method: LearnedMethod::Static,
                is_updated: false,
            });
        }

        for zone_cfg in self.config.bsr_zones.clone() {
            let zone_id = zone_cfg
                .scope_zone_prefix
                .map(|prefix| ScopeZoneId { prefix, is_scope_zone: true })
                .unwrap_or_else(Self::non_scoped_zone_id);
            let zone = self.zone_mut(zone_id);
            if let Some(cand_bsr) = zone_cfg.cand_bsr {
                zone.cand_bsr_addr = Some(cand_bsr.addr);
                zone.cand_bsr_priority = cand_bsr.priority;
                zone.hash_mask_len = cand_bsr.hash_mask_len;
                zone.state = CandBsrState::CandidateBsr;
            }
            for cand_rp in zone_cfg.cand_rps {
                zone.group_prefixes.push(BsrGroupPrefix {
                    group_prefix: cand_rp.group_prefix,
                    expected_rp_count: 1,
                    rps: vec![BsrRp {
                        addr: cand_rp.addr,
                        priority: cand_rp.priority,
                        holdtime: cand_rp.holdtime,
                        expiry_deadline: None,
                    }],
                });
            }
        }
    }

    /// Brings up a configured vif: allocates the next vif-index,
    /// registers it with the kernel, joins All-PIM-Routers, spawns the
    /// per-vif reader task, and latches `should_send_pim_hello` so
    /// Hello goes out before anything else (§5's ordering guarantee).
    pub fn start_vif(&mut self, name: &str, ifindex: u32) -> Result<VifId> {
        let cfg = self
            .config
            .vifs
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Resource(format!("no configuration for vif {name}")))?;

        let vif_index = self.vifs.max_mif_index().map(|v| v + 1).unwrap_or(0);
        if vif_index as usize >= crate::mre::MAX_VIFS {
            return Err(Error::Resource("vif-index space exhausted".to_owned()));
        }

        let mut vif = Vif::new(name.to_owned(), vif_index, cfg);
        vif.flags |= crate::iface::VifFlags::UP;
        let id = self.vifs.insert(vif);

        let socket = Arc::new(crate::network::socket(V::AF, ifindex)?);
        let reader = {
            let socket = Arc::clone(&socket);
            let event_tx = self.event_tx.clone();
            let af = V::AF;
            tokio::spawn(async move {
                loop {
                    match crate::network::recv(&socket).await {
                        Ok((src, raw)) => {
                            let stripped = crate::network::strip_ip_header(af, raw);
                            match Message::decode(&stripped, None) {
                                Ok(message) => {
                                    if event_tx
                                        .send(Event::Packet { vif: id, src, message })
                                        .is_err()
                                    {
                                        break;
                                    }
                                }
                                Err(error) => {
                                    tracing::trace!(%src, %error, "failed to decode PIM message");
                                }
                            }
                        }
                        Err(error) => {
                            tracing::trace!(%error, "PIM socket read error");
                        }
                    }
                }
            })
        };

        self.vif_runtime.insert(
            id,
            VifRuntime {
                socket,
                ifindex,
                hello_deadline: Instant::now(),
                triggered_hello_deadline: Some(Instant::now()),
                reader,
            },
        );

        self.tasks.push(Task::StartVif(id));
        Debug::VifStart(name).log();
        Ok(id)
    }

    /// Graceful vif teardown (§5): Hello holdtime=0 is sent by the
    /// caller before this runs; this only tears down local state once
    /// every dependent MRE has drained.
    pub fn stop_vif(&mut self, id: VifId) {
        if let Some(vif) = self.vifs.get(id) {
            Debug::VifStop(&vif.name).log();
        }
        self.tasks.push(Task::StopVif(id));
        if let Some(rt) = self.vif_runtime.remove(&id) {
            rt.reader.abort();
        }
        self.vifs.delete(id);
    }

    /// Re-elects the DR on `vif` from its current neighbor set plus the
    /// local router itself (§4.3), and enqueues `i_am_dr` if our own
    /// role flipped.
    pub fn reelect_dr(&mut self, vif_id: VifId) {
        let Some(vif) = self.vifs.get(vif_id) else {
            return;
        };
        let was_dr = vif.i_am_dr();

        let mut candidates = Vec::with_capacity(vif.neighbors.len() + 1);
        for nbr_id in &vif.neighbors {
            if let Some(nbr) = self.neighbors.get(*nbr_id) {
                candidates.push(DrCandidate {
                    addr: nbr.addr,
                    priority: nbr.dr_priority(),
                });
            }
        }
        if let Some(me) = vif.primary_addr {
            candidates.push(DrCandidate {
                addr: me,
                priority: Some(vif.config.dr_priority),
            });
        }

        let winner = dr_election(&candidates);
        let name = vif.name.clone();
        if let Some(vif) = self.vifs.get_mut(vif_id) {
            vif.dr_addr = winner;
        }

        let is_dr_now = self.vifs.get(vif_id).map(|v| v.i_am_dr()).unwrap_or(false);
        if was_dr != is_dr_now {
            if let Some(addr) = winner {
                Debug::DrChanged(&name, addr).log();
            }
            self.tasks.push(Task::IAmDr(vif_id));
        }
    }

    /// Admits or refreshes a neighbor on `vif_id` from a Hello message
    /// (§4.3). A GenID change signals the neighbor restarted and
    /// enqueues `pim_nbr_gen_id_changed` so upstream FSMs resend Joins.
    pub fn nbr_hello(
        &mut self,
        vif_id: VifId,
        addr: IpAddr,
        proto_version: u8,
        options: HelloOptions,
    ) {
        let existing = self.neighbors.get_by_addr(vif_id, addr);
        let (nbr_id, gen_id_changed) = match existing {
            Some(id) => {
                let changed = self
                    .neighbors
                    .get(id)
                    .and_then(|n| n.options.gen_id)
                    .zip(options.gen_id)
                    .map(|(old, new)| old != new)
                    .unwrap_or(false);
                if let Some(nbr) = self.neighbors.get_mut(id) {
                    nbr.options = options;
                    nbr.rearm_liveness(options.holdtime.unwrap_or(105));
                }
                (id, changed)
            }
            None => {
                let mut nbr = PimNbr::new(addr, proto_version);
                nbr.options = options;
                nbr.rearm_liveness(options.holdtime.unwrap_or(105));
                let id = self.neighbors.insert(vif_id, nbr);
                if let Some(vif) = self.vifs.get_mut(vif_id) {
                    vif.neighbors.push(id);
                }
                if let Some(vif) = self.vifs.get(vif_id) {
                    Debug::NbrNew(&vif.name, addr).log();
                }
                (id, false)
            }
        };

        if gen_id_changed {
            if let Some(vif) = self.vifs.get(vif_id) {
                Debug::NbrGenIdChanged(&vif.name, addr).log();
            }
            self.tasks.push(Task::PimNbrGenIdChanged(vif_id, addr));
        }
        self.tasks.push(Task::PimNbrChanged(vif_id, addr));
        self.reelect_dr(vif_id);
        let _ = nbr_id;
    }

    /// Sweeps every vif for expired neighbor liveness timers (§4.3,
    /// P6), removing them and re-electing the DR where it changed.
    pub fn expire_neighbors(&mut self, now: Instant) {
        let mut expired: Vec<(VifId, NbrId, IpAddr)> = Vec::new();
        for (vif_id, vif) in self.vifs.iter() {
            for nbr_id in &vif.neighbors {
                if let Some(nbr) = self.neighbors.get(*nbr_id) {
                    if nbr.is_expired(now) {
                        expired.push((vif_id, *nbr_id, nbr.addr));
                    }
                }
            }
        }

        for (vif_id, nbr_id, addr) in expired {
            if let Some(vif) = self.vifs.get_mut(vif_id) {
                vif.neighbors.retain(|id| *id != nbr_id);
                Debug::NbrTimeout(&vif.name, addr).log();
            }
            self.neighbors.delete(vif_id, nbr_id);
            self.reelect_dr(vif_id);
        }
    }

    /// Drains the task queue up to `budget` items per call, so a
    /// large backlog yields back to the I/O demultiplex between chunks
    /// (§5, §9).
    pub fn drain_tasks(&mut self, budget: usize) {
        for _ in 0..budget {
            let Some(task) = self.tasks.pop() else {
                break;
            };
            self.run_task(task);
        }
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::RpChanged(addr) => {
                Debug::RpChanged(addr).log();
                self.recompute_mres_for_rp(addr);
            }
            Task::PimNbrChanged(vif_id, _)
            | Task::PimNbrGenIdChanged(vif_id, _)
            | Task::IAmDr(vif_id)
            | Task::MyIpAddress(vif_id)
            | Task::MyIpSubnetAddress(vif_id) => {
                self.recompute_mres_on_vif(vif_id);
            }
            Task::MribChanged(..) | Task::SptSwitchThresholdChanged => {
                self.recompute_all_mres();
            }
            Task::StartVif(_) | Task::StopVif(_) => {}
            Task::DeletePimMfc(mre_id) => {
                self.maybe_reap(mre_id);
            }
        }
    }

    fn recompute_mres_for_rp(&mut self, addr: IpAddr) {
        let ids: Vec<MreId> = self
            .mres
            .iter()
            .filter(|(_, m)| m.rp_addr == Some(addr) || m.rp_addr.is_none())
            .map(|(id, _)| id)
            .collect();
        for id in ids {
            self.recompute_mre(id);
        }
    }

    fn recompute_mres_on_vif(&mut self, vif_id: VifId) {
        let vif_index = self.vifs.get(vif_id).map(|v| v.vif_index);
        let ids: Vec<MreId> = self
            .mres
            .iter()
            .filter(|(_, m)| {
                vif_index.map(|idx| m.iface.contains_key(&idx)).unwrap_or(false)
                    || m.rpf_interface_rp == Some(vif_id)
                    || m.rpf_interface_s == Some(vif_id)
            })
            .map(|(id, _)| id)
            .collect();
        for id in ids {
            self.recompute_mre(id);
        }
    }

    fn recompute_all_mres(&mut self) {
        let ids: Vec<MreId> = self.mres.iter().map(|(id, _)| id).collect();
        for id in ids {
            self.recompute_mre(id);
        }
    }

    /// Resolves the MRIB's best route toward `addr` into the RPF
    /// neighbor/vif pair the upstream FSMs key off of (§4.4).
    fn resolve_rpf(&self, addr: IpAddr) -> (Option<NbrId>, Option<VifId>) {
        match self.mrib.lookup(addr) {
            Some((nexthop, vif_id)) => {
                let nbr_id = self.neighbors.get_by_addr(vif_id, nexthop);
                (nbr_id, Some(vif_id))
            }
            None => (None, None),
        }
    }

    fn is_local_addr(&self, addr: IpAddr) -> bool {
        self.vifs.iter().any(|(_, v)| v.owns_addr(addr))
    }

    pub fn mrib_add_route(&mut self, prefix: ipnetwork::IpNetwork, nexthop: IpAddr, vif: VifId) {
        self.mrib.add_route(prefix, nexthop, vif);
        self.tasks.push(Task::MribChanged(prefix.ip(), prefix.prefix()));
    }

    pub fn mrib_delete_route(&mut self, prefix: ipnetwork::IpNetwork) {
        self.mrib.delete_route(&prefix);
        self.tasks.push(Task::MribChanged(prefix.ip(), prefix.prefix()));
    }

    /// Recomputes RP binding, RPF neighbors, upstream join/prune state,
    /// and (for `(S,G)`) the MFC projection for one MRE, then reaps it
    /// if it became deletable (§4.4). The single recompute path every
    /// trigger funnels through, so a join/prune, assert, register, or
    /// membership change commits before the next message is processed
    /// (§5's ordering guarantee).
    fn recompute_mre(&mut self, id: MreId) {
        let Some(key) = self.mres.key_for(id) else {
            return;
        };
        let group = key.group();
        let source = key.source();

        let rp_addr = self.rp_table.rp_find(group).map(|e| e.rp_addr);
        let (rpf_nbr_rp, rpf_iface_rp) =
            rp_addr.map(|addr| self.resolve_rpf(addr)).unwrap_or((None, None));
        let (rpf_nbr_s, rpf_iface_s) =
            source.map(|addr| self.resolve_rpf(addr)).unwrap_or((None, None));
        let directly_connected =
            rpf_iface_s.is_none() && source.map(|s| self.is_local_addr(s)).unwrap_or(false);

        let Some(mre) = self.mres.get_mut(id) else {
            return;
        };
        mre.rp_addr = rp_addr;
        mre.rpf_nbr_rp = rpf_nbr_rp;
        mre.rpf_interface_rp = rpf_iface_rp;
        mre.rpf_nbr_s = rpf_nbr_s;
        mre.rpf_interface_s = rpf_iface_s;

        let olist_nonempty = mre.immediate_olist().any();
        let spt_bit = mre.spt_bit;
        let could_register = mre.could_register;
        let old_join_desired = mre.join_desired;

        let new_join_desired = match key {
            MreKey::Rp => false,
            MreKey::Wc(_) => olist_nonempty,
            MreKey::Sg(..) => olist_nonempty || (directly_connected && could_register),
            MreKey::SgRpt(..) => false,
        };
        mre.join_desired = new_join_desired;

        if old_join_desired != new_join_desired {
            let (upstream_nbr, upstream_vif) = if spt_bit {
                (rpf_nbr_s, rpf_iface_s)
            } else {
                (rpf_nbr_rp, rpf_iface_rp)
            };
            if let (Some(nbr_id), Some(vif_id)) = (upstream_nbr, upstream_vif) {
                if let Some(nbr_addr) = self.neighbors.get(nbr_id).map(|n| n.addr) {
                    self.send_upstream_join_prune(vif_id, nbr_addr, key, rp_addr, new_join_desired);
                }
            }
            if let Some(mre) = self.mres.get_mut(id) {
                mre.upstream_join_deadline = if new_join_desired {
                    Some(
                        Instant::now()
                            + Duration::from_secs(crate::config::defaults::JOIN_PRUNE_HOLDTIME as u64),
                    )
                } else {
                    None
                };
            }
        }

        if let MreKey::Sg(src, grp) = key {
            self.project_mfc(id, src, grp);
        }

        self.maybe_reap(id);
    }

    fn send_upstream_join_prune(
        &mut self,
        vif_id: VifId,
        nbr_addr: IpAddr,
        key: MreKey,
        rp_addr: Option<IpAddr>,
        is_join: bool,
    ) {
        let holdtime = crate::config::defaults::JOIN_PRUNE_HOLDTIME;
        let (group, src_entry) = match key {
            MreKey::Wc(g) => {
                let addr = rp_addr.unwrap_or(g);
                (
                    g,
                    EncodedSource {
                        addr,
                        mask_len: full_mask(addr),
                        flags: SourceFlags::W | SourceFlags::R,
                    },
                )
            }
            MreKey::Sg(s, g) => (
                g,
                EncodedSource {
                    addr: s,
                    mask_len: full_mask(s),
                    flags: SourceFlags::S,
                },
            ),
            MreKey::SgRpt(s, g) => (
                g,
                EncodedSource {
                    addr: s,
                    mask_len: full_mask(s),
                    flags: SourceFlags::R,
                },
            ),
            MreKey::Rp => return,
        };

        let entry = GroupEntry {
            group: EncodedGroup {
                addr: group,
                mask_len: full_mask(group),
                flags: GroupFlags::empty(),
            },
            joined: if is_join { vec![src_entry] } else { vec![] },
            pruned: if is_join { vec![] } else { vec![src_entry] },
        };
        let jp = JoinPrune {
            upstream_neighbor: EncodedUnicast { addr: nbr_addr },
            holdtime,
            groups: vec![entry],
        };
        self.queue_send(vif_id, nbr_addr, Message::JoinPrune(jp));
    }

    fn inherited_olist_sg_rpt(&self, group: IpAddr) -> MifSet {
        self.mres
            .get_by_key(&MreKey::Wc(group))
            .and_then(|id| self.mres.get(id))
            .map(|m| m.immediate_olist())
            .unwrap_or_default()
    }

    /// Projects one `(S,G)` MRE into the kernel MFC (§4.9): resolves
    /// the iif/olist tuple via [`mfc::project`], writes it through
    /// [`kernel::add_mfc`] when it actually changed, and arms the idle
    /// (and, if configured, SPT-switch) dataflow monitors plus the
    /// keepalive timer on first installation.
    fn project_mfc(&mut self, id: MreId, source: IpAddr, group: IpAddr) {
        let Some(mre) = self.mres.get(id) else {
            return;
        };
        let rpf_s = mre.rpf_interface_s;
        let rpf_rp = mre.rpf_interface_rp;
        let rp_addr = mre.rp_addr;
        let is_kat_rp_keepalive = mre.is_kat_set_to_rp_keepalive_period;
        let is_directly_connected = rpf_s.is_none() && self.is_local_addr(source);
        let inherited_olist_sg = mre.immediate_olist();
        let inherited_olist_sg_rpt = self.inherited_olist_sg_rpt(group);

        let idx_s = rpf_s
            .and_then(|v| self.vifs.get(v))
            .map(|v| v.vif_index)
            .unwrap_or(mfc::VIF_INDEX_INVALID);
        let idx_rp = rpf_rp
            .and_then(|v| self.vifs.get(v))
            .map(|v| v.vif_index)
            .unwrap_or(mfc::VIF_INDEX_INVALID);

        let inputs = ProjectionInputs {
            rpf_interface_s: rpf_s,
            rpf_interface_rp: rpf_rp,
            is_source_directly_connected: is_directly_connected,
            is_switch_to_spt_desired: self.config.switch_to_spt.enabled,
            inherited_olist_sg,
            inherited_olist_sg_rpt,
        };
        let index_of = move |vid: VifId| {
            if Some(vid) == rpf_s {
                idx_s
            } else if Some(vid) == rpf_rp {
                idx_rp
            } else {
                mfc::VIF_INDEX_INVALID
            }
        };

        let Some(mre) = self.mres.get(id) else {
            return;
        };
        let (iif, olist, disable_wrongvif) = mfc::project(mre, &inputs, index_of);

        let key = MfcKey { source, group };
        let was_installed = self.mfcs.contains_key(&key);
        let entry = self.mfcs.entry(key).or_insert_with(|| MfcEntry::new(key));
        entry.iif_vif_index = iif;
        entry.olist = olist;
        entry.olist_disable_wrongvif = disable_wrongvif;
        entry.rp_addr = rp_addr;

        if entry.needs_kernel_write() {
            let _ = kernel::add_mfc(key, iif, olist, disable_wrongvif, rp_addr);
            entry.mark_installed();
        }

        if !was_installed {
            let _ = kernel::add_dataflow_monitor(key, mfc::idle_monitor(is_kat_rp_keepalive));
            if self.config.switch_to_spt.enabled {
                let monitor = mfc::spt_switch_monitor(
                    self.config.switch_to_spt.bytes,
                    Duration::from_secs(self.config.switch_to_spt.interval_sec as u64),
                );
                let _ = kernel::add_dataflow_monitor(key, monitor);
            }
            if let Some(mre) = self.mres.get_mut(id) {
                mre.keepalive_deadline = Some(
                    Instant::now()
                        + Duration::from_secs(crate::config::defaults::KEEPALIVE_PERIOD as u64),
                );
            }
        }
    }

    fn maybe_reap(&mut self, id: MreId) {
        let Some(mre) = self.mres.get(id) else {
            return;
        };
        if !mre.is_deletable() {
            return;
        }
        if let Some(key) = self.mres.key_for(id) {
            if let MreKey::Sg(source, group) = key {
                let mfc_key = MfcKey { source, group };
                if self.mfcs.remove(&mfc_key).is_some() {
                    let _ = kernel::delete_mfc(mfc_key);
                    let _ = kernel::delete_all_dataflow_monitor(mfc_key);
                }
            }
            self.mres.delete(&key);
        }
    }

    fn find_or_create_mre(&mut self, key: MreKey) -> MreId {
        match self.mres.get_by_key(&key) {
            Some(id) => id,
            None => self.mres.insert(key, Mre::default()),
        }
    }

    /// A local receiver appeared/disappeared on `vif_id` (§6.3, §8
    /// scenario 1): updates `local_receiver_include` then cascades
    /// straight into `recompute_mre` so olist/upstream-join/MFC all
    /// follow in the same commit.
    pub fn add_membership(&mut self, vif_id: VifId, source: Option<IpAddr>, group: IpAddr) {
        let vif_index = self.vifs.get(vif_id).map(|v| v.vif_index).unwrap_or(0);
        crate::southbound::add_membership(&mut self.mres, vif_index, source, group);
        let key = match source {
            Some(s) => MreKey::Sg(s, group),
            None => MreKey::Wc(group),
        };
        if let Some(id) = self.mres.get_by_key(&key) {
            self.recompute_mre(id);
        }
    }

    pub fn delete_membership(&mut self, vif_id: VifId, source: Option<IpAddr>, group: IpAddr) {
        let vif_index = self.vifs.get(vif_id).map(|v| v.vif_index).unwrap_or(0);
        crate::southbound::delete_membership(&mut self.mres, vif_index, source, group);
        let key = match source {
            Some(s) => MreKey::Sg(s, group),
            None => MreKey::Wc(group),
        };
        if let Some(id) = self.mres.get_by_key(&key) {
            self.recompute_mre(id);
        }
    }

    pub fn add_rp(&mut self, entry: RpEntry) {
        self.rp_table.add_rp(entry);
        self.commit_rp_changes();
    }

    pub fn delete_rp(&mut self, rp_addr: IpAddr, group_prefix: &ipnetwork::IpNetwork) {
        self.rp_table.delete_rp(rp_addr, group_prefix);
        self.commit_rp_changes();
    }

    fn commit_rp_changes(&mut self) {
        for addr in self.rp_table.take_updated() {
            self.tasks.push(Task::RpChanged(addr));
        }
    }

    /// Processes one decoded inbound message (§4, §5): all side
    /// effects (state, timers, MFC writes, outbound messages) commit
    /// before the next message is read, since the loop is
    /// single-threaded and cooperative.
    pub fn handle_message(&mut self, vif_id: VifId, src: IpAddr, message: Message) {
        match message {
            Message::Hello(options) => {
                let proto_version = self
                    .vifs
                    .get(vif_id)
                    .map(|v| v.config.proto_version)
                    .unwrap_or(2);
                self.nbr_hello(vif_id, src, proto_version, options);
            }
            Message::JoinPrune(jp) => self.apply_join_prune(vif_id, src, jp),
            Message::Assert(assert) => self.handle_assert(vif_id, assert),
            Message::Bootstrap(bsm) => self.handle_bootstrap(vif_id, bsm),
            Message::Register(reg) => self.handle_register(vif_id, src, reg),
            Message::RegisterStop(rs) => self.handle_register_stop(rs),
            Message::CandRpAdv(adv) => self.handle_cand_rp_adv(adv),
        }
    }

    // ---- Downstream Join/Prune FSM (§4.5) ----

    fn apply_join_prune(&mut self, vif_id: VifId, src: IpAddr, jp: JoinPrune) {
        let me = self.vifs.get(vif_id).and_then(|v| v.primary_addr);
        if me != Some(jp.upstream_neighbor.addr) {
            return;
        }
        let _ = src;
        for group_entry in jp.groups {
            for joined in &group_entry.joined {
                let key = join_prune_key(group_entry.group.addr, joined);
                let id = self.find_or_create_mre(key);
                self.downstream_transition(id, vif_id, true, jp.holdtime);
            }
            for pruned in &group_entry.pruned {
                let key = join_prune_key(group_entry.group.addr, pruned);
                let id = self.find_or_create_mre(key);
                self.downstream_transition(id, vif_id, false, jp.holdtime);
            }
        }
    }

    fn downstream_transition(&mut self, id: MreId, vif_id: VifId, is_join: bool, holdtime: u16) {
        let vif_index = self.vifs.get(vif_id).map(|v| v.vif_index).unwrap_or(0);
        let now = Instant::now();
        if let Some(mre) = self.mres.get_mut(id) {
            let iface = mre.iface_entry(vif_index);
            if is_join {
                iface.downstream = DownstreamState::Join;
                iface.expiry_deadline = Some(now + Duration::from_secs(holdtime.max(1) as u64));
                iface.prune_pending_deadline = None;
            } else {
                iface.downstream = DownstreamState::PrunePending;
                iface.prune_pending_deadline = Some(
                    now + Duration::from_millis(
                        crate::config::defaults::JOIN_PRUNE_OVERRIDE_INTERVAL_MS as u64,
                    ),
                );
            }
        }
        self.recompute_mre(id);
    }

    /// Sweeps every MRE's per-vif downstream timers (§4.5): a
    /// prune-pending deadline elapsing without an overriding Join
    /// commits the prune; a Join's expiry deadline elapsing without a
    /// refresh times it out the same way a neighbor would.
    pub fn expire_downstream_timers(&mut self, now: Instant) {
        let mut to_recompute = Vec::new();
        for (id, mre) in self.mres.iter_mut() {
            let mut changed = false;
            for state in mre.iface.values_mut() {
                if matches!(state.prune_pending_deadline, Some(d) if d <= now) {
                    state.downstream = DownstreamState::NoInfo;
                    state.prune_pending_deadline = None;
                    state.expiry_deadline = None;
                    changed = true;
                } else if state.downstream == DownstreamState::Join
                    && matches!(state.expiry_deadline, Some(d) if d <= now)
                {
                    state.downstream = DownstreamState::NoInfo;
                    state.expiry_deadline = None;
                    changed = true;
                }
            }
            if changed {
                to_recompute.push(id);
            }
        }
        for id in to_recompute {
            self.recompute_mre(id);
        }
    }

    // ---- Assert FSM (§4.7) ----

    fn local_assert_metric(&self, id: MreId, vif_id: VifId) -> AssertMetric {
        let spt_bit = self.mres.get(id).map(|m| m.spt_bit).unwrap_or(false);
        let addr = self
            .vifs
            .get(vif_id)
            .and_then(|v| v.primary_addr)
            .unwrap_or_else(Self::me_addr);
        AssertMetric {
            preference: if spt_bit { 0 } else { u32::MAX / 2 },
            metric: 0,
            addr,
        }
    }

    fn handle_assert(&mut self, vif_id: VifId, assert: Assert) {
        let group = assert.group.addr;
        let source = assert.source.addr;
        let key = if assert.rpt_bit {
            MreKey::Wc(group)
        } else {
            MreKey::Sg(source, group)
        };
        let id = self.find_or_create_mre(key);
        let vif_index = self.vifs.get(vif_id).map(|v| v.vif_index).unwrap_or(0);
        let local_metric = self.local_assert_metric(id, vif_id);
        let peer_metric = assert.metric;

        let already_winner = self
            .mres
            .get(id)
            .and_then(|m| m.iface.get(&vif_index))
            .map(|s| s.assert == AssertState::IAmWinner)
            .unwrap_or(false);
        let peer_wins = peer_metric.is_better_than(&local_metric);

        if peer_wins {
            if let Some(mre) = self.mres.get_mut(id) {
                let iface = mre.iface_entry(vif_index);
                iface.assert = AssertState::IAmLoser;
                iface.assert_winner = Some(peer_metric);
                iface.assert_deadline = Some(
                    Instant::now() + Duration::from_secs(crate::config::defaults::ASSERT_TIME as u64),
                );
            }
            if let Some(vif) = self.vifs.get(vif_id) {
                Debug::AssertLoser(&vif.name, peer_metric.addr).log();
            }
        } else if !already_winner {
            self.become_assert_winner(id, vif_id, group, source, assert.rpt_bit);
        }
    }

    fn become_assert_winner(
        &mut self,
        id: MreId,
        vif_id: VifId,
        group: IpAddr,
        source: IpAddr,
        rpt_bit: bool,
    ) {
        let vif_index = self.vifs.get(vif_id).map(|v| v.vif_index).unwrap_or(0);
        let metric = self.local_assert_metric(id, vif_id);
        if let Some(mre) = self.mres.get_mut(id) {
            let iface = mre.iface_entry(vif_index);
            iface.assert = AssertState::IAmWinner;
            iface.assert_winner = Some(metric);
            iface.assert_deadline = Some(
                Instant::now() + Duration::from_secs(crate::config::defaults::ASSERT_TIME as u64),
            );
        }
        if let Some(vif) = self.vifs.get(vif_id) {
            Debug::AssertWinner(&vif.name, metric.addr).log();
        }
        let assert_msg = Assert {
            group: EncodedGroup {
                addr: group,
                mask_len: full_mask(group),
                flags: GroupFlags::empty(),
            },
            source: EncodedUnicast { addr: source },
            rpt_bit,
            metric,
        };
        let dst = self.all_routers_addr();
        self.queue_send(vif_id, dst, Message::Assert(assert_msg));
    }

    fn handle_wrong_vif(&mut self, vif_id: VifId, source: IpAddr, group: IpAddr) {
        let key = MreKey::Sg(source, group);
        let Some(id) = self.mres.get_by_key(&key) else {
            return;
        };
        let vif_index = self.vifs.get(vif_id).map(|v| v.vif_index).unwrap_or(0);
        let Some(mre) = self.mres.get(id) else {
            return;
        };
        let in_olist = mre.immediate_olist().test(vif_index);
        let already_winner = mre
            .iface
            .get(&vif_index)
            .map(|s| s.assert == AssertState::IAmWinner)
            .unwrap_or(false);
        if in_olist && !already_winner {
            self.become_assert_winner(id, vif_id, group, source, false);
        }
    }

    fn handle_dataflow(&mut self, source: IpAddr, group: IpAddr, direction: MonitorDirection) {
        let key = MreKey::Sg(source, group);
        let Some(id) = self.mres.get_by_key(&key) else {
            return;
        };
        match direction {
            MonitorDirection::AtMost => {
                if let Some(mre) = self.mres.get_mut(id) {
                    mre.keepalive_deadline = Some(
                        Instant::now()
                            + Duration::from_secs(crate::config::defaults::KEEPALIVE_PERIOD as u64),
                    );
                }
            }
            MonitorDirection::AtLeast => {
                if let Some(mre) = self.mres.get_mut(id) {
                    mre.spt_bit = true;
                }
                self.recompute_mre(id);
            }
        }
    }

    pub fn handle_upcall(&mut self, upcall: kernel::Upcall) {
        Debug::KernelUpcall(upcall_kind(&upcall)).log();
        match upcall {
            kernel::Upcall::NoCache { source, group, .. } => {
                let id = self.find_or_create_mre(MreKey::Sg(source, group));
                self.recompute_mre(id);
            }
            kernel::Upcall::WrongVif { vif, source, group } => {
                if let Some((vif_id, _)) = self.vifs.get_by_mif_index(vif) {
                    self.handle_wrong_vif(vif_id, source, group);
                }
            }
            kernel::Upcall::WholePkt { source, group, packet, .. } => {
                self.handle_register_trigger(source, group, packet);
            }
            kernel::Upcall::Dataflow { source, group, direction } => {
                self.handle_dataflow(source, group, direction);
            }
        }
    }

    // ---- Register / Register-Stop FSM (§4.10) ----

    fn register_vif_index(&self) -> Option<VifId> {
        self.vifs.iter().find(|(_, v)| v.is_pim_register()).map(|(id, _)| id)
    }

    fn i_am_rp(&self, group: IpAddr) -> bool {
        match self.rp_table.rp_find(group) {
            Some(entry) => self.is_local_addr(entry.rp_addr),
            None => false,
        }
    }

    /// Source-DR side: a directly-connected source's first packet
    /// reached the kernel with no `(S,G)` forwarding entry yet.
    /// Encapsulates it toward the RP unless the SPT is already up or
    /// the upstream register state is already pruned.
    fn handle_register_trigger(&mut self, source: IpAddr, group: IpAddr, packet: Bytes) {
        let id = self.find_or_create_mre(MreKey::Sg(source, group));
        let (spt_bit, register_state) = self
            .mres
            .get(id)
            .map(|m| (m.spt_bit, m.register_state))
            .unwrap_or_default();
        if spt_bit || register_state == RegisterState::Prune {
            return;
        }
        let Some(rp_addr) = self.rp_table.rp_find(group).map(|e| e.rp_addr) else {
            return;
        };
        let (_, rpf_vif) = self.resolve_rpf(rp_addr);
        let Some(vif_id) = rpf_vif else {
            return;
        };

        let reg = Register { border: false, null: false, inner_packet: packet };
        self.queue_send(vif_id, rp_addr, Message::Register(reg));
        if let Some(mre) = self.mres.get_mut(id) {
            if mre.register_state == RegisterState::NoInfo {
                mre.register_state = RegisterState::Join;
            }
        }
    }

    /// RP side: validates the embedded `(S,G)`, replies Register-Stop
    /// if we aren't RP for `G` or the olist is empty, otherwise installs
    /// the `(S,G)` MFC entry with the Register vif as iif and arms the
    /// RP-side keepalive.
    fn handle_register(&mut self, vif_id: VifId, src: IpAddr, reg: Register) {
        let Some((source, group)) = parse_inner_sg(&reg.inner_packet) else {
            return;
        };

        if reg.null || !self.i_am_rp(group) {
            self.send_register_stop(vif_id, src, source, group);
            return;
        }

        let id = self.find_or_create_mre(MreKey::Sg(source, group));
        self.recompute_mre(id);

        let olist_nonempty = self
            .mres
            .get(id)
            .map(|m| m.immediate_olist().any())
            .unwrap_or(false);
        if !olist_nonempty {
            self.send_register_stop(vif_id, src, source, group);
            return;
        }

        if let Some(mre) = self.mres.get_mut(id) {
            mre.is_kat_set_to_rp_keepalive_period = true;
            mre.keepalive_deadline = Some(
                Instant::now()
                    + Duration::from_secs(crate::config::defaults::RP_KEEPALIVE_PERIOD as u64),
            );
        }
        if let Some(reg_vif) = self.register_vif_index() {
            if let Some(mre) = self.mres.get_mut(id) {
                mre.rpf_interface_s = Some(reg_vif);
            }
            self.project_mfc(id, source, group);
        }
    }

    fn send_register_stop(&mut self, vif_id: VifId, dst: IpAddr, source: IpAddr, group: IpAddr) {
        let stop = RegisterStop {
            group: EncodedGroup {
                addr: group,
                mask_len: full_mask(group),
                flags: GroupFlags::empty(),
            },
            source: EncodedUnicast { addr: source },
        };
        self.queue_send(vif_id, dst, Message::RegisterStop(stop));
    }

    fn handle_register_stop(&mut self, rs: RegisterStop) {
        let key = MreKey::Sg(rs.source.addr, rs.group.addr);
        if let Some(id) = self.mres.get_by_key(&key) {
            if let Some(mre) = self.mres.get_mut(id) {
                mre.register_state = RegisterState::Prune;
            }
        }
    }

    // ---- Bootstrap / candidate-BSR state machine (§4.8) ----

    fn non_scoped_zone_id() -> ScopeZoneId {
        let prefix = match V::AF {
            holo_utils::ip::AddressFamily::Ipv4 => "224.0.0.0/4".parse().unwrap(),
            holo_utils::ip::AddressFamily::Ipv6 => "ff00::/8".parse().unwrap(),
        };
        ScopeZoneId { prefix, is_scope_zone: false }
    }

    fn zone_mut(&mut self, zone_id: ScopeZoneId) -> &mut BsrZone {
        if let Some(pos) = self.bsr_zones.iter().position(|z| z.zone_id == zone_id) {
            &mut self.bsr_zones[pos]
        } else {
            self.bsr_zones.push(BsrZone::new(zone_id));
            self.bsr_zones.last_mut().unwrap()
        }
    }

    fn handle_bootstrap(&mut self, vif_id: VifId, bsm: Bootstrap) {
        let vif_index = self.vifs.get(vif_id).map(|v| v.vif_index).unwrap_or(0);
        if self.scope_zones.is_scoped(bsm.bsr_addr.addr, vif_index) {
            return;
        }
        if !bsr::is_consistent(bsm.bsr_addr.addr, &bsm.group_prefixes) {
            return;
        }

        let zone_id = Self::non_scoped_zone_id();
        let preferred = {
            let zone = self.zone_mut(zone_id);
            match zone.elected_bsr_addr {
                Some(incumbent) if incumbent != bsm.bsr_addr.addr => bsr::is_preferred(
                    bsm.bsr_addr.addr,
                    bsm.bsr_priority,
                    incumbent,
                    zone.elected_bsr_priority,
                ),
                _ => true,
            }
        };
        if !preferred {
            return;
        }

        let mut expired = Vec::new();
        {
            let zone = self.zone_mut(zone_id);
            zone.elected_bsr_addr = Some(bsm.bsr_addr.addr);
            zone.elected_bsr_priority = bsm.bsr_priority;
            zone.hash_mask_len = bsm.hash_mask_len;
            bsr::merge_fragment(zone, bsm.fragment_tag, bsm.group_prefixes.clone(), &mut expired);
            zone.bs_deadline = Some(
                Instant::now()
                    + Duration::from_secs(crate::config::defaults::BSR_BOOTSTRAP_TIMEOUT as u64),
            );
        }

        Debug::BsrElected(bsm.bsr_addr.addr).log();
        self.refresh_rp_table_from_zone(zone_id);
        self.advance_cand_bsr_state(zone_id, bsm.bsr_addr.addr, bsm.bsr_priority);
        self.forward_bootstrap(vif_id, bsm);
    }

    fn advance_cand_bsr_state(&mut self, zone_id: ScopeZoneId, bsr_addr: IpAddr, bsr_priority: u8) {
        let zone = self.zone_mut(zone_id);
        if !zone.is_candidate_bsr() {
            return;
        }
        if zone.cand_bsr_addr == Some(bsr_addr) {
            zone.state = CandBsrState::ElectedBsr;
            return;
        }
        match zone.state {
            CandBsrState::ElectedBsr | CandBsrState::CandidateBsr => {
                let delay = bsr::rand_override(
                    zone.cand_bsr_priority,
                    zone.cand_bsr_addr.unwrap(),
                    bsr_priority,
                    bsr_addr,
                );
                zone.state = CandBsrState::PendingBsr;
                zone.bs_deadline = Some(Instant::now() + delay);
            }
            _ => zone.state = CandBsrState::CandidateBsr,
        }
    }

    fn forward_bootstrap(&mut self, recv_vif: VifId, bsm: Bootstrap) {
        let vif_ids: Vec<VifId> = self
            .vifs
            .iter()
            .filter(|(id, v)| *id != recv_vif && v.is_up())
            .map(|(id, _)| id)
            .collect();
        let dst = self.all_routers_addr();
        for vif_id in vif_ids {
            let vif_index = self.vifs.get(vif_id).map(|v| v.vif_index).unwrap_or(0);
            if self.scope_zones.is_scoped(bsm.bsr_addr.addr, vif_index) {
                continue;
            }
            self.queue_send(vif_id, dst, Message::Bootstrap(bsm.clone()));
        }
    }

    fn refresh_rp_table_from_zone(&mut self, zone_id: ScopeZoneId) {
        let Some(zone) = self.bsr_zones.iter().find(|z| z.zone_id == zone_id) else {
            return;
        };
        let new_entries: Vec<RpEntry> = zone
            .group_prefixes
            .iter()
            .flat_map(|gp| {
                gp.rps.iter().map(move |rp| RpEntry {
                    rp_addr: rp.addr,
                    group_prefix: gp.group_prefix,
                    priority: rp.priority,
                    hash_mask_len: zone.hash_mask_len,
                    learned_method: LearnedMethod::Bootstrap,
                    is_updated: false,
                })
            })
            .collect();

        let old_addrs: Vec<IpAddr> = self
            .rp_table
            .entries
            .iter()
            .filter(|e| e.learned_method == LearnedMethod::Bootstrap)
            .map(|e| e.rp_addr)
            .collect();

        self.rp_table.entries.retain(|e| e.learned_method != LearnedMethod::Bootstrap);
        for entry in new_entries {
            self.rp_table.add_rp(entry);
        }
        for addr in old_addrs {
            for entry in self.rp_table.entries.iter_mut().filter(|e| e.rp_addr == addr) {
                entry.is_updated = true;
            }
            if !self.rp_table.entries.iter().any(|e| e.rp_addr == addr) {
                self.tasks.push(Task::RpChanged(addr));
            }
        }
        self.commit_rp_changes();
    }

    pub fn poll_bsr_timers(&mut self, now: Instant) {
        let zone_ids: Vec<ScopeZoneId> = self.bsr_zones.iter().map(|z| z.zone_id).collect();
        for zone_id in zone_ids {
            self.poll_bsr_zone(zone_id, now);
        }
    }

    fn poll_bsr_zone(&mut self, zone_id: ScopeZoneId, now: Instant) {
        let (state, expired) = {
            let Some(zone) = self.bsr_zones.iter().find(|z| z.zone_id == zone_id) else {
                return;
            };
            (zone.state, matches!(zone.bs_deadline, Some(d) if d <= now))
        };
        if !expired {
            return;
        }
        match state {
            CandBsrState::PendingBsr | CandBsrState::CandidateBsr | CandBsrState::ElectedBsr => {
                self.originate_bootstrap(zone_id);
            }
            _ => {}
        }
    }

    fn originate_bootstrap(&mut self, zone_id: ScopeZoneId) {
        let bsm = {
            let zone = self.zone_mut(zone_id);
            let Some(addr) = zone.cand_bsr_addr else {
                return;
            };
            zone.state = CandBsrState::ElectedBsr;
            zone.elected_bsr_addr = Some(addr);
            zone.elected_bsr_priority = zone.cand_bsr_priority;
            zone.fragment_tag = zone.fragment_tag.wrapping_add(1);
            zone.bs_deadline = Some(
                Instant::now()
                    + Duration::from_secs(crate::config::defaults::BSR_BOOTSTRAP_PERIOD as u64),
            );
            Bootstrap {
                fragment_tag: zone.fragment_tag,
                hash_mask_len: zone.hash_mask_len,
                bsr_priority: zone.cand_bsr_priority,
                bsr_addr: EncodedUnicast { addr },
                group_prefixes: zone.group_prefixes.clone(),
            }
        };
        Debug::BsrElected(bsm.bsr_addr.addr).log();
        let vif_ids: Vec<VifId> =
            self.vifs.iter().filter(|(_, v)| v.is_up()).map(|(id, _)| id).collect();
        let dst = self.all_routers_addr();
        for vif_id in vif_ids {
            self.queue_send(vif_id, dst, Message::Bootstrap(bsm.clone()));
        }
    }

    fn handle_cand_rp_adv(&mut self, adv: CandRpAdv) {
        let zone_id = Self::non_scoped_zone_id();
        let is_elected_bsr = self
            .bsr_zones
            .iter()
            .find(|z| z.zone_id == zone_id)
            .map(|z| z.state == CandBsrState::ElectedBsr)
            .unwrap_or(false);
        if !is_elected_bsr {
            return;
        }

        let prefixes: Vec<ipnetwork::IpNetwork> = if adv.covers_all_groups() {
            vec![zone_id.prefix]
        } else {
            adv.group_prefixes
                .iter()
                .filter_map(|g| ipnetwork::IpNetwork::new(g.addr, g.mask_len).ok())
                .collect()
        };

        let zone = self.zone_mut(zone_id);
        for prefix in prefixes {
            let rp = BsrRp {
                addr: adv.rp_addr.addr,
                priority: adv.priority,
                holdtime: adv.holdtime,
                expiry_deadline: Some(Instant::now() + Duration::from_secs(adv.holdtime as u64)),
            };
            match zone.group_prefixes.iter_mut().find(|gp| gp.group_prefix == prefix) {
                Some(gp) => {
                    gp.rps.retain(|r| r.addr != adv.rp_addr.addr);
                    gp.rps.push(rp);
                }
                None => zone.group_prefixes.push(BsrGroupPrefix {
                    group_prefix: prefix,
                    expected_rp_count: 1,
                    rps: vec![rp],
                }),
            }
        }
        self.refresh_rp_table_from_zone(zone_id);
    }

    /// Sweeps every zone's Cand-RP holdtimes, dropping expired entries
    /// and re-deriving the RP table (§4.8, P7).
    pub fn expire_cand_rps(&mut self, now: Instant) {
        for zone in &mut self.bsr_zones {
            for gp in &mut zone.group_prefixes {
                gp.rps.retain(|rp| !matches!(rp.expiry_deadline, Some(d) if d <= now));
            }
        }
        let zone_ids: Vec<ScopeZoneId> = self.bsr_zones.iter().map(|z| z.zone_id).collect();
        for zone_id in zone_ids {
            self.refresh_rp_table_from_zone(zone_id);
        }
    }

    // ---- Outbound transmission (§5, §6.1) ----

    fn all_routers_addr(&self) -> IpAddr {
        match V::AF {
            holo_utils::ip::AddressFamily::Ipv4 => crate::network::all_pim_routers_v4(),
            holo_utils::ip::AddressFamily::Ipv6 => crate::network::all_pim_routers_v6(),
        }
    }

    fn queue_send(&mut self, vif_id: VifId, dst: IpAddr, message: Message) {
        let _ = self.out_tx.send((vif_id, dst, message));
    }

    fn build_hello(&self, vif_id: VifId) -> Option<Message> {
        let vif = self.vifs.get(vif_id)?;
        let options = HelloOptions {
            holdtime: Some(vif.config.hello_holdtime),
            lan_prune_delay_ms: Some(vif.config.propagation_delay_ms),
            override_interval_ms: Some(vif.config.override_interval_ms),
            is_tracking_support_enabled: !vif.config.is_tracking_support_disabled,
            dr_priority: Some(vif.config.dr_priority),
            gen_id: Some(vif.gen_id),
        };
        Some(Message::Hello(options))
    }

    /// Sends a Hello on every vif whose periodic timer elapsed or whose
    /// triggered/startup send is still pending (§4.3). Hello always
    /// goes out ahead of any other queued message on a freshly-started
    /// vif, per §5's ordering guarantee.
    pub fn poll_hello_timers(&mut self, now: Instant) {
        let vif_ids: Vec<VifId> = self.vif_runtime.keys().copied().collect();
        let dst = self.all_routers_addr();
        for vif_id in vif_ids {
            let timer_due = self
                .vif_runtime
                .get(&vif_id)
                .map(|rt| {
                    rt.hello_deadline <= now
                        || rt.triggered_hello_deadline.map(|d| d <= now).unwrap_or(false)
                })
                .unwrap_or(false);
            let latch_due = self.vifs.get(vif_id).map(|v| v.should_send_pim_hello).unwrap_or(false);
            if !timer_due && !latch_due {
                continue;
            }

            let Some(message) = self.build_hello(vif_id) else {
                continue;
            };
            self.queue_send(vif_id, dst, message);
            if let Some(vif) = self.vifs.get_mut(vif_id) {
                vif.should_send_pim_hello = false;
            }
            let period = self.hello_interval(vif_id);
            if let Some(rt) = self.vif_runtime.get_mut(&vif_id) {
                rt.hello_deadline = now + period;
                rt.triggered_hello_deadline = None;
            }
        }
    }

    /// Encodes and sends one queued outbound message; drained from
    /// `out_rx` by the caller's event loop.
    pub async fn transmit(&self, vif_id: VifId, dst: IpAddr, message: Message) -> Result<()> {
        let Some(rt) = self.vif_runtime.get(&vif_id) else {
            return Ok(());
        };
        let buf = message.encode().freeze();
        crate::network::send(&rt.socket, rt.ifindex, dst, &buf).await?;
        Ok(())
    }

    pub fn hello_interval(&self, vif_id: VifId) -> Duration {
        self.vifs
            .get(vif_id)
            .map(|v| Duration::from_secs(v.config.hello_period as u64))
            .unwrap_or(Duration::from_secs(crate::config::defaults::HELLO_PERIOD as u64))
    }

    pub fn me_addr() -> IpAddr {
        pim_nbr_me_addr()
    }
}

fn join_prune_key(group: IpAddr, src: &EncodedSource) -> MreKey {
    if src.flags.contains(SourceFlags::W) {
        MreKey::Wc(group)
    } else if src.flags.contains(SourceFlags::R) {
        MreKey::SgRpt(src.addr, group)
    } else {
        MreKey::Sg(src.addr, group)
    }
}

fn full_mask(addr: IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

/// Reads the embedded `(source, destination)` pair straight out of the
/// inner IP header, a simplification standing in for full IP-layer
/// decapsulation (out of scope here; see DESIGN.md).
fn parse_inner_sg(data: &[u8]) -> Option<(IpAddr, IpAddr)> {
    if data.is_empty() {
        return None;
    }
    match data[0] >> 4 {
        4 if data.len() >= 20 => Some((
            IpAddr::V4(Ipv4Addr::new(data[12], data[13], data[14], data[15])),
            IpAddr::V4(Ipv4Addr::new(data[16], data[17], data[18], data[19])),
        )),
        6 if data.len() >= 40 => {
            let mut src = [0u8; 16];
            src.copy_from_slice(&data[8..24]);
            let mut dst = [0u8; 16];
            dst.copy_from_slice(&data[24..40]);
            Some((IpAddr::V6(Ipv6Addr::from(src)), IpAddr::V6(Ipv6Addr::from(dst))))
        }
        _ => None,
    }
}

fn upcall_kind(upcall: &kernel::Upcall) -> &'static str {
    match upcall {
        kernel::Upcall::NoCache { .. } => "nocache",
        kernel::Upcall::WrongVif { .. } => "wrongvif",
        kernel::Upcall::WholePkt { .. } => "wholepkt",
        kernel::Upcall::Dataflow { .. } => "dataflow",
    }
}
