//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! IGMP/MLD collaborator interface (§6.3): local group membership
//! feeds directly into the `local_receiver_include` bit of the
//! relevant MREs, without going through the task queue, since it has
//! no other component's state to reconcile against.

use std::net::IpAddr;

use crate::collections::Mres;
use crate::mre::{Mre, MreFindFlags, MreKey};

/// A local receiver for `(source, group)` appeared on `vif_index`
/// (§6.3). `source = None` denotes a `(*,G)` membership report. Returns
/// whether an MRE had to be created to record it.
pub fn add_membership(
    mres: &mut Mres,
    vif_index: u16,
    source: Option<IpAddr>,
    group: IpAddr,
) -> bool {
    let key = match source {
        Some(s) => MreKey::Sg(s, group),
        None => MreKey::Wc(group),
    };

    let created = mres.get_by_key(&key).is_none();
    let id = match mres.get_by_key(&key) {
        Some(id) => id,
        None => mres.insert(key, Mre::default()),
    };
    if let Some(mre) = mres.get_mut(id) {
        mre.iface_entry(vif_index).local_receiver_include = true;
    }
    created
}

/// Clears the local-receiver bit and lets MRE reaping pick the entry up
/// on its next `is_deletable` check if nothing else still needs it.
pub fn delete_membership(mres: &mut Mres, vif_index: u16, source: Option<IpAddr>, group: IpAddr) {
    let key = match source {
        Some(s) => MreKey::Sg(s, group),
        None => MreKey::Wc(group),
    };
    if let Some(id) = mres.get_by_key(&key) {
        if let Some(mre) = mres.get_mut(id) {
            if let Some(iface) = mre.iface.get_mut(&vif_index) {
                iface.local_receiver_include = false;
            }
        }
    }
}

/// Default [`MreFindFlags`] used by membership-driven lookups: both
/// `(*,G)` and `(S,G)` entries are acceptable, created on demand.
pub fn membership_find_flags() -> MreFindFlags {
    MreFindFlags {
        rp: false,
        wc: true,
        sg: true,
        sg_rpt: false,
        create: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_membership_creates_entry_and_sets_bit() {
        let mut mres = Mres::default();
        let group = "239.1.1.1".parse().unwrap();
        let created = add_membership(&mut mres, 2, None, group);
        assert!(created);

        let id = mres.get_by_key(&MreKey::Wc(group)).unwrap();
        let mre = mres.get(id).unwrap();
        assert!(mre.iface.get(&2).unwrap().local_receiver_include);
    }

    #[test]
    fn delete_membership_clears_bit_without_removing_entry() {
        let mut mres = Mres::default();
        let group = "239.1.1.1".parse().unwrap();
        add_membership(&mut mres, 2, None, group);
        delete_membership(&mut mres, 2, None, group);

        let id = mres.get_by_key(&MreKey::Wc(group)).unwrap();
        let mre = mres.get(id).unwrap();
        assert!(!mre.iface.get(&2).unwrap().local_receiver_include);
    }
}
