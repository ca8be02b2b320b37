//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! MRT task queue (§4.4).
//!
//! Recomputing olists, RPF neighbors and register state inline at every
//! trigger would mean re-entering an MRE scan from inside another scan
//! of the same collection. Instead, triggers enqueue a typed [`Task`]
//! and a single driver drains the queue in FIFO order, one task at a
//! time, splicing the live MRE list onto a "processing" shadow list for
//! tasks whose scan would otherwise race a concurrent insert or delete.

use std::collections::VecDeque;
use std::net::IpAddr;

use crate::collections::{MreId, VifId};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Task {
    RpChanged(IpAddr),
    PimNbrChanged(VifId, IpAddr),
    PimNbrGenIdChanged(VifId, IpAddr),
    IAmDr(VifId),
    MribChanged(IpAddr, u8),
    MyIpAddress(VifId),
    MyIpSubnetAddress(VifId),
    StartVif(VifId),
    StopVif(VifId),
    DeletePimMfc(MreId),
    SptSwitchThresholdChanged,
}

/// FIFO task queue plus the "processing" shadow list used while a scan
/// triggered by the task currently being drained is in flight. Only one
/// task is ever mid-scan at a time since the driver is single-threaded,
/// so a single `Vec` (rather than a stack of them) suffices.
#[derive(Default)]
pub struct TaskQueue {
    pending: VecDeque<Task>,
    processing: Vec<MreId>,
}

impl TaskQueue {
    pub fn push(&mut self, task: Task) {
        // Collapse adjacent duplicates: a burst of identical triggers
        // (e.g. several J/P messages changing the same RP in one
        // read-loop iteration) should enqueue the recompute once.
        if self.pending.back() != Some(&task) {
            self.pending.push_back(task);
        }
    }

    pub fn pop(&mut self) -> Option<Task> {
        self.pending.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Moves `mres` onto the processing list so a handler can iterate it
    /// without observing insertions/removals made by work the handler
    /// itself triggers (e.g. MRE deletion cascades).
    pub fn begin_scan(&mut self, mres: Vec<MreId>) {
        self.processing = mres;
    }

    /// Drains and returns the next chunk of the processing list, up to
    /// `budget` entries, so a handler can yield back to the event loop
    /// between chunks instead of holding up timers and socket reads
    /// during a scan over a large MRE set.
    pub fn next_chunk(&mut self, budget: usize) -> Vec<MreId> {
        let take = budget.min(self.processing.len());
        self.processing.drain(..take).collect()
    }

    pub fn scan_in_progress(&self) -> bool {
        !self.processing.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_adjacent_tasks_collapse() {
        let mut q = TaskQueue::default();
        q.push(Task::SptSwitchThresholdChanged);
        q.push(Task::SptSwitchThresholdChanged);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn non_adjacent_duplicates_both_enqueue() {
        let mut q = TaskQueue::default();
        q.push(Task::SptSwitchThresholdChanged);
        q.push(Task::RpChanged("10.0.0.1".parse().unwrap()));
        q.push(Task::SptSwitchThresholdChanged);
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn chunked_scan_drains_fully() {
        let mut q = TaskQueue::default();
        let mres: Vec<MreId> = Vec::new();
        q.begin_scan(mres);
        assert!(!q.scan_in_progress());
    }
}
