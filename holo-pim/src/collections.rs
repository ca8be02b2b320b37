//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Arena-backed storage for the PIM engine's entity graph.
//!
//! `PimMre <-> PimNbr <-> Vif <-> RpEntry` form cycles of back-references
//! in the protocol's natural data model (§9). Rather than raw pointers,
//! every entity lives in a generation-checked arena and is referenced by
//! a small `Copy` id; a lookup through a stale id (after deletion) simply
//! returns `None` instead of dereferencing freed memory.

use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::net::IpAddr;

use generational_arena::Arena as GenArena;

use crate::iface::Vif;
use crate::mre::{Mre, MreKey};
use crate::neighbor::PimNbr;

/// A typed wrapper around [`generational_arena::Index`] so ids for
/// different entity types can't be confused with one another.
#[derive(derive_new::new)]
pub struct Entity<T> {
    index: generational_arena::Index,
    _marker: PhantomData<T>,
}

impl<T> std::fmt::Debug for Entity<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.index)
    }
}

impl<T> Clone for Entity<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Entity<T> {}
impl<T> PartialEq for Entity<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}
impl<T> Eq for Entity<T> {}
impl<T> std::hash::Hash for Entity<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state)
    }
}
impl<T> PartialOrd for Entity<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T> Ord for Entity<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let (a0, a1) = self.index.into_raw_parts();
        let (b0, b1) = other.index.into_raw_parts();
        (a0, a1).cmp(&(b0, b1))
    }
}

pub type VifId = Entity<Vif>;
pub type NbrId = Entity<PimNbr>;
pub type MreId = Entity<Mre>;

/// Generic arena newtype providing typed get/get_mut/insert/remove.
pub struct Arena<T> {
    arena: GenArena<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Arena {
            arena: GenArena::new(),
        }
    }
}

impl<T> Arena<T> {
    pub fn insert(&mut self, value: T) -> Entity<T> {
        let index = self.arena.insert(value);
        Entity::new(index, PhantomData)
    }

    pub fn remove(&mut self, id: Entity<T>) -> Option<T> {
        self.arena.remove(id.index)
    }

    pub fn get(&self, id: Entity<T>) -> Option<&T> {
        self.arena.get(id.index)
    }

    pub fn get_mut(&mut self, id: Entity<T>) -> Option<&mut T> {
        self.arena.get_mut(id.index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity<T>, &T)> {
        self.arena
            .iter()
            .map(|(index, value)| (Entity::new(index, PhantomData), value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity<T>, &mut T)> {
        self.arena
            .iter_mut()
            .map(|(index, value)| (Entity::new(index, PhantomData), value))
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }
}

/// Vif collection, indexed by id (arena) and by name (secondary index).
#[derive(Default)]
pub struct Vifs {
    arena: Arena<Vif>,
    name_index: HashMap<String, VifId>,
    // vif-index -> VifId, used by MifSet bit positions.
    vif_index: BTreeMap<u16, VifId>,
}

impl Vifs {
    pub fn insert(&mut self, vif: Vif) -> VifId {
        let name = vif.name.clone();
        let mif_index = vif.vif_index;
        let id = self.arena.insert(vif);
        self.name_index.insert(name, id);
        self.vif_index.insert(mif_index, id);
        id
    }

    pub fn delete(&mut self, id: VifId) {
        if let Some(vif) = self.arena.remove(id) {
            self.name_index.remove(&vif.name);
            self.vif_index.remove(&vif.vif_index);
        }
    }

    pub fn get(&self, id: VifId) -> Option<&Vif> {
        self.arena.get(id)
    }

    pub fn get_mut(&mut self, id: VifId) -> Option<&mut Vif> {
        self.arena.get_mut(id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<(VifId, &Vif)> {
        self.name_index
            .get(name)
            .and_then(|id| self.arena.get(*id).map(|vif| (*id, vif)))
    }

    pub fn get_by_mif_index(&self, mif_index: u16) -> Option<(VifId, &Vif)> {
        self.vif_index
            .get(&mif_index)
            .and_then(|id| self.arena.get(*id).map(|vif| (*id, vif)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (VifId, &Vif)> {
        self.arena.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (VifId, &mut Vif)> {
        self.arena.iter_mut()
    }

    pub fn max_mif_index(&self) -> Option<u16> {
        self.vif_index.keys().next_back().copied()
    }
}

/// Neighbor collection, indexed by id and by `(vif, address)`.
#[derive(Default)]
pub struct Neighbors {
    arena: Arena<PimNbr>,
    by_addr: HashMap<(VifId, IpAddr), NbrId>,
}

impl Neighbors {
    pub fn insert(&mut self, vif_id: VifId, nbr: PimNbr) -> NbrId {
        let addr = nbr.addr;
        let id = self.arena.insert(nbr);
        self.by_addr.insert((vif_id, addr), id);
        id
    }

    pub fn delete(&mut self, vif_id: VifId, id: NbrId) {
        if let Some(nbr) = self.arena.remove(id) {
            self.by_addr.remove(&(vif_id, nbr.addr));
        }
    }

    pub fn get(&self, id: NbrId) -> Option<&PimNbr> {
        self.arena.get(id)
    }

    pub fn get_mut(&mut self, id: NbrId) -> Option<&mut PimNbr> {
        self.arena.get_mut(id)
    }

    pub fn get_by_addr(&self, vif_id: VifId, addr: IpAddr) -> Option<NbrId> {
        self.by_addr.get(&(vif_id, addr)).copied()
    }

    pub fn iter_on_vif<'a>(
        &'a self,
        vif_id: VifId,
    ) -> impl Iterator<Item = (NbrId, &'a PimNbr)> + 'a {
        self.by_addr.iter().filter_map(move |((vid, _), id)| {
            (*vid == vif_id).then(|| (*id, self.arena.get(*id).unwrap()))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (NbrId, &PimNbr)> {
        self.arena.iter()
    }
}

/// MRE store, indexed by id and by `(type, source, group)` key (§3.4,
/// §4.4). A secondary BTreeMap keyed purely by group supports the
/// longest-match lookups used by `pim_mre_find`.
#[derive(Default)]
pub struct Mres {
    arena: Arena<Mre>,
    by_key: HashMap<MreKey, MreId>,
}

impl Mres {
    pub fn insert(&mut self, key: MreKey, mre: Mre) -> MreId {
        let id = self.arena.insert(mre);
        self.by_key.insert(key, id);
        id
    }

    pub fn delete(&mut self, key: &MreKey) -> Option<Mre> {
        let id = self.by_key.remove(key)?;
        self.arena.remove(id)
    }

    pub fn get(&self, id: MreId) -> Option<&Mre> {
        self.arena.get(id)
    }

    pub fn get_mut(&mut self, id: MreId) -> Option<&mut Mre> {
        self.arena.get_mut(id)
    }

    pub fn get_by_key(&self, key: &MreKey) -> Option<MreId> {
        self.by_key.get(key).copied()
    }

    pub fn key_for(&self, id: MreId) -> Option<MreKey> {
        self.by_key
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(k, _)| *k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MreId, &Mre)> {
        self.arena.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (MreId, &mut Mre)> {
        self.arena.iter_mut()
    }

    /// All entries for a given group, of any type, for `pim_mre_find`'s
    /// flag-gated type selection.
    pub fn iter_group<'a>(
        &'a self,
        group: IpAddr,
    ) -> impl Iterator<Item = (MreId, &'a Mre)> + 'a {
        self.by_key.iter().filter_map(move |(key, id)| {
            (key.group() == group).then(|| (*id, self.arena.get(*id).unwrap()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VifCfg;

    #[test]
    fn mres_key_for_reverse_looks_up_the_insertion_key() {
        let mut mres = Mres::default();
        let key = MreKey::Wc("239.1.1.1".parse().unwrap());
        let id = mres.insert(key, Mre::default());
        assert_eq!(mres.key_for(id), Some(key));
    }

    #[test]
    fn mres_delete_removes_both_indexes() {
        let mut mres = Mres::default();
        let key = MreKey::Sg("10.0.0.1".parse().unwrap(), "239.1.1.1".parse().unwrap());
        let id = mres.insert(key, Mre::default());
        assert!(mres.delete(&key).is_some());
        assert!(mres.get(id).is_none());
        assert!(mres.get_by_key(&key).is_none());
    }

    #[test]
    fn vifs_lookup_by_name_and_mif_index_agree() {
        let mut vifs = Vifs::default();
        let vif = Vif::new("eth0".to_owned(), 3, VifCfg::default());
        let id = vifs.insert(vif);
        let (by_name_id, _) = vifs.get_by_name("eth0").unwrap();
        let (by_index_id, _) = vifs.get_by_mif_index(3).unwrap();
        assert_eq!(id, by_name_id);
        assert_eq!(id, by_index_id);
        assert_eq!(vifs.max_mif_index(), Some(3));

        vifs.delete(id);
        assert!(vifs.get_by_name("eth0").is_none());
        assert!(vifs.get_by_mif_index(3).is_none());
    }
}
