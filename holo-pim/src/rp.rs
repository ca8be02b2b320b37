//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! RP table: group-to-RP resolution (§3.6, §4.1).

use std::net::IpAddr;

/// How an RP entry was learned (§3.6).
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum LearnedMethod {
    Bootstrap,
    Static,
    AutoRp,
}

#[derive(Clone, Debug)]
pub struct RpEntry {
    pub rp_addr: IpAddr,
    pub group_prefix: ipnetwork::IpNetwork,
    pub priority: u8,
    pub hash_mask_len: u8,
    pub learned_method: LearnedMethod,
    pub is_updated: bool,
}

/// RP table: the live list plus a "processing" list holding entries
/// pending removal while dependent MREs are still being re-homed
/// (§3.6, §4.1).
#[derive(Default)]
pub struct RpTable {
    pub entries: Vec<RpEntry>,
    pub processing: Vec<RpEntry>,
}

impl RpTable {
    /// `rp_find(group)`: longest prefix, then priority, then hash,
    /// then address (§4.1, P5).
    pub fn rp_find(&self, group: IpAddr) -> Option<&RpEntry> {
        let mut candidates: Vec<&RpEntry> = self
            .entries
            .iter()
            .filter(|e| prefix_contains(&e.group_prefix, group))
            .collect();

        if candidates.is_empty() {
            return None;
        }

        // 1. Longest prefix.
        let max_len = candidates
            .iter()
            .map(|e| e.group_prefix.prefix())
            .max()
            .unwrap();
        candidates.retain(|e| e.group_prefix.prefix() == max_len);
        if candidates.len() == 1 {
            return Some(candidates[0]);
        }

        // 2. Smallest priority, only meaningful across entries learned
        // by the same method; if methods differ, priority comparison is
        // skipped in favor of the hash tiebreak (§4.1 step 2).
        let same_method = candidates
            .windows(2)
            .all(|w| w[0].learned_method == w[1].learned_method);
        if same_method {
            let min_prio = candidates.iter().map(|e| e.priority).min().unwrap();
            candidates.retain(|e| e.priority == min_prio);
            if candidates.len() == 1 {
                return Some(candidates[0]);
            }
        }

        // 3. Largest PIM hash value.
        let max_hash = candidates
            .iter()
            .map(|e| pim_hash(group, e.hash_mask_len, e.rp_addr))
            .max()
            .unwrap();
        candidates.retain(|e| pim_hash(group, e.hash_mask_len, e.rp_addr) == max_hash);
        if candidates.len() == 1 {
            return Some(candidates[0]);
        }

        // 4. Largest RP address. Equal-address duplicates here would
        // mean two identical candidates (open question, §9): log and
        // return the first, since real duplicates should be
        // impossible.
        let max_addr = candidates.iter().map(|e| e.rp_addr).max().unwrap();
        let winner = candidates.iter().find(|e| e.rp_addr == max_addr).copied();
        if candidates.iter().filter(|e| e.rp_addr == max_addr).count() > 1 {
            tracing::debug!(%group, addr = %max_addr, "duplicate candidate BSR address observed");
        }
        winner
    }

    /// `add_rp`: insert and mark overlapping entries `is_updated` so the
    /// commit hook can enqueue `rp_changed` tasks (§4.1). The new entry
    /// itself is also marked, since a previously RP-less group prefix
    /// has no overlapping entry to flag it through.
    pub fn add_rp(&mut self, mut entry: RpEntry) {
        for existing in &mut self.entries {
            if entry.group_prefix.is_ipv4() == existing.group_prefix.is_ipv4()
                && prefixes_overlap(&entry.group_prefix, &existing.group_prefix)
            {
                existing.is_updated = true;
            }
        }
        entry.is_updated = true;
        self.entries.push(entry);
    }

    /// `delete_rp`: remove the matching entry; entries with live
    /// children should be migrated to `processing` by the caller before
    /// this is invoked (the table itself holds no MRE/MFC back-refs).
    pub fn delete_rp(&mut self, rp_addr: IpAddr, group_prefix: &ipnetwork::IpNetwork) {
        if let Some(pos) = self
            .entries
            .iter()
            .position(|e| e.rp_addr == rp_addr && &e.group_prefix == group_prefix)
        {
            let removed = self.entries.remove(pos);
            for existing in &mut self.entries {
                if prefixes_overlap(&removed.group_prefix, &existing.group_prefix) {
                    existing.is_updated = true;
                }
            }
        }
    }

    /// Drains and returns all entries currently marked `is_updated`,
    /// clearing the flag, so the task engine can enqueue exactly one
    /// `rp_changed` per affected address.
    pub fn take_updated(&mut self) -> Vec<IpAddr> {
        let mut addrs = Vec::new();
        for entry in &mut self.entries {
            if entry.is_updated {
                entry.is_updated = false;
                addrs.push(entry.rp_addr);
            }
        }
        addrs.sort();
        addrs.dedup();
        addrs
    }
}

fn prefix_contains(prefix: &ipnetwork::IpNetwork, addr: IpAddr) -> bool {
    prefix.contains(addr)
}

fn prefixes_overlap(a: &ipnetwork::IpNetwork, b: &ipnetwork::IpNetwork) -> bool {
    a.contains(b.ip()) || b.contains(a.ip())
}

/// PIM hash function `H(G, M, C)` (§4.1):
/// `(A * ((A * (G & M) + B) XOR C) + B) mod 2^31`, with
/// `A = 1103515245`, `B = 12345`. For v6, the masked address is folded
/// to 32 bits by XORing successive big-endian 32-bit lanes (open
/// question, §9/§13.2).
pub fn pim_hash(group: IpAddr, hash_mask_len: u8, rp_addr: IpAddr) -> u32 {
    const A: u64 = 1103515245;
    const B: u64 = 12345;
    const M: u64 = 1 << 31;

    let g = mask_and_fold(group, hash_mask_len);
    let c = fold32(rp_addr);

    let inner = ((A.wrapping_mul(g as u64) + B) as u32) ^ c;
    (A.wrapping_mul(inner as u64).wrapping_add(B) % M) as u32
}

fn addr_bytes(addr: IpAddr) -> Vec<u8> {
    match addr {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    }
}

/// Masks `addr` to `mask_len` bits (network byte order) and folds wider-
/// than-32-bit addresses down to 32 bits by XORing 32-bit big-endian
/// lanes.
fn mask_and_fold(addr: IpAddr, mask_len: u8) -> u32 {
    let mut bytes = addr_bytes(addr);
    apply_mask(&mut bytes, mask_len);
    fold_bytes(&bytes)
}

fn fold32(addr: IpAddr) -> u32 {
    fold_bytes(&addr_bytes(addr))
}

fn apply_mask(bytes: &mut [u8], mask_len: u8) {
    let full_bytes = (mask_len / 8) as usize;
    let rem_bits = mask_len % 8;
    for (i, byte) in bytes.iter_mut().enumerate() {
        if i < full_bytes {
            continue;
        } else if i == full_bytes && rem_bits > 0 {
            let keep_mask = !(0xffu8 >> rem_bits);
            *byte &= keep_mask;
        } else {
            *byte = 0;
        }
    }
}

fn fold_bytes(bytes: &[u8]) -> u32 {
    let mut acc = 0u32;
    for chunk in bytes.chunks(4) {
        let mut lane = [0u8; 4];
        lane[..chunk.len()].copy_from_slice(chunk);
        acc ^= u32::from_be_bytes(lane);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(
        rp: &str,
        prefix: &str,
        priority: u8,
        hash_mask_len: u8,
        method: LearnedMethod,
    ) -> RpEntry {
        RpEntry {
            rp_addr: rp.parse().unwrap(),
            group_prefix: prefix.parse().unwrap(),
            priority,
            hash_mask_len,
            learned_method: method,
            is_updated: false,
        }
    }

    #[test]
    fn longest_prefix_wins() {
        let mut table = RpTable::default();
        table.add_rp(entry(
            "10.0.0.1",
            "239.0.0.0/8",
            5,
            30,
            LearnedMethod::Static,
        ));
        table.add_rp(entry(
            "10.0.0.2",
            "239.1.0.0/16",
            5,
            30,
            LearnedMethod::Static,
        ));
        let found = table.rp_find("239.1.1.1".parse().unwrap()).unwrap();
        assert_eq!(found.rp_addr, "10.0.0.2".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn lowest_priority_wins_same_prefix() {
        let mut table = RpTable::default();
        table.add_rp(entry(
            "10.0.0.1",
            "239.1.1.0/24",
            10,
            30,
            LearnedMethod::Static,
        ));
        table.add_rp(entry(
            "10.0.0.2",
            "239.1.1.0/24",
            1,
            30,
            LearnedMethod::Static,
        ));
        let found = table.rp_find("239.1.1.1".parse().unwrap()).unwrap();
        assert_eq!(found.rp_addr, "10.0.0.2".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn rp_find_is_deterministic() {
        let mut table = RpTable::default();
        table.add_rp(entry(
            "10.0.0.1",
            "239.1.1.0/24",
            5,
            30,
            LearnedMethod::Static,
        ));
        table.add_rp(entry(
            "10.0.0.2",
            "239.1.1.0/24",
            5,
            30,
            LearnedMethod::Static,
        ));
        let g = "239.1.1.1".parse().unwrap();
        let first = table.rp_find(g).map(|e| e.rp_addr);
        let second = table.rp_find(g).map(|e| e.rp_addr);
        assert_eq!(first, second);
    }

    #[test]
    fn add_then_delete_is_empty() {
        let mut table = RpTable::default();
        let e = entry("10.0.0.1", "239.0.0.0/8", 5, 30, LearnedMethod::Static);
        table.add_rp(e.clone());
        table.delete_rp(e.rp_addr, &e.group_prefix);
        assert!(table.entries.is_empty());
    }
}
