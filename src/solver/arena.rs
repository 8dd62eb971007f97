//! Record arena: block-grown table, free list, hash index, adjacency cache.
//!
//! Records live in one growable table and are recycled through a free list
//! threaded through their `prev`/`next` fields, so repeated searches do no
//! per-record allocation after warm-up. The hash index maps a state to its
//! record; bucket collisions are disambiguated by a per-bucket binary tree
//! ordered on the state, bounding a lookup by tree depth rather than chain
//! length. The bucket array is sized once at construction and never
//! rehashed.
//!
//! The adjacency cache is a single append-only buffer of `(node, cost)`
//! pairs with fixed capacity. A neighbor list either fits in the remaining
//! space and is appended whole, or the push is rejected and that node falls
//! back to client queries on every expansion.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use super::node::{NodeIdx, NodeRecord, ADJACENT_UNKNOWN, NOT_CACHED, SENTINEL};
use crate::graph::{Cost, StateKey};

/// One adjacency-cache element: a resolved neighbor record plus the exact
/// edge cost leading to it.
#[derive(Clone, Copy, Debug)]
pub(crate) struct EdgeRef {
    pub node: NodeIdx,
    pub cost: Cost,
}

#[inline(always)]
fn state_hash<S: Hash>(state: &S) -> u64 {
    let mut h = FxHasher::default();
    state.hash(&mut h);
    h.finish()
}

pub(crate) struct NodeArena<S> {
    pub(crate) records: Vec<NodeRecord<S>>,
    /// Per-bucket tree roots. Fixed size, power of two.
    buckets: Vec<NodeIdx>,
    bucket_mask: usize,
    /// Head of the doubly-linked free list (`NodeIdx::NONE` when empty).
    free_head: NodeIdx,
    /// Records per growth block.
    block_size: usize,
    /// Adjacency cache buffer. Never grows past `adj_cache_cap`.
    adj_cache: Vec<EdgeRef>,
    adj_cache_cap: usize,
}

impl<S: StateKey> NodeArena<S> {
    pub fn new(block_size: usize, typical_adjacent: usize) -> Self {
        assert!(block_size > 0, "block_size must be positive");
        assert!(typical_adjacent > 0, "typical_adjacent must be positive");
        let n_buckets = block_size.next_power_of_two().max(16);
        let adj_cache_cap = block_size * typical_adjacent;
        Self {
            records: Vec::new(),
            buckets: vec![NodeIdx::NONE; n_buckets],
            bucket_mask: n_buckets - 1,
            free_head: NodeIdx::NONE,
            block_size,
            adj_cache: Vec::with_capacity(adj_cache_cap),
            adj_cache_cap,
        }
    }

    #[inline(always)]
    pub fn rec(&self, idx: NodeIdx) -> &NodeRecord<S> {
        &self.records[idx.index()]
    }

    #[inline(always)]
    pub fn rec_mut(&mut self, idx: NodeIdx) -> &mut NodeRecord<S> {
        &mut self.records[idx.index()]
    }

    #[inline(always)]
    pub fn state(&self, idx: NodeIdx) -> S {
        self.records[idx.index()].state
    }

    /// Mark a popped record closed. Open and closed are mutually exclusive;
    /// violating either is an internal defect.
    #[inline]
    pub fn mark_closed(&mut self, idx: NodeIdx) {
        let rec = self.rec_mut(idx);
        assert!(!rec.in_closed, "record closed twice");
        assert!(!rec.in_open, "record closed while still open");
        rec.in_closed = true;
    }

    // ── Allocation ──────────────────────────────────────────────────────

    /// Extend the table by one block and thread the new records onto the
    /// free list. The table grows in block units only, and never shrinks
    /// during a search.
    fn new_block(&mut self, filler: S) {
        let base = self.records.len();
        self.records.reserve(self.block_size);
        for i in 0..self.block_size {
            let idx = NodeIdx((base + i) as u32);
            let mut rec = NodeRecord::cold(filler);
            rec.next = self.free_head;
            if self.free_head != NodeIdx::NONE {
                self.records[self.free_head.index()].prev = idx;
            }
            self.records.push(rec);
            self.free_head = idx;
        }
    }

    /// Ensure the sentinel record and first block exist. The sentinel's
    /// state is an arbitrary filler (a generic key has no null value); it
    /// is never hashed or compared.
    #[inline]
    fn ensure_warm(&mut self, filler: S) {
        if self.records.is_empty() {
            let mut sentinel = NodeRecord::cold(filler);
            sentinel.total_cost = Cost::INFINITY;
            sentinel.prev = SENTINEL;
            sentinel.next = SENTINEL;
            self.records.push(sentinel);
            self.new_block(filler);
        }
    }

    /// Pop a cold record off the free list, growing by one block if the
    /// list is exhausted.
    fn alloc(&mut self, filler: S) -> NodeIdx {
        if self.free_head == NodeIdx::NONE {
            self.new_block(filler);
        }
        let idx = self.free_head;
        let next = self.rec(idx).next;
        self.free_head = next;
        if next != NodeIdx::NONE {
            self.rec_mut(next).prev = NodeIdx::NONE;
        }
        // Fully cold: the record may carry free-list links or stale memo
        // fields from a previous life.
        *self.rec_mut(idx) = NodeRecord::cold(filler);
        idx
    }

    // ── Hash index ──────────────────────────────────────────────────────

    #[inline(always)]
    fn bucket_of(&self, state: &S) -> usize {
        state_hash(state) as usize & self.bucket_mask
    }

    fn tree_insert(&mut self, bucket: usize, node: NodeIdx) {
        let mut at = self.buckets[bucket];
        if at == NodeIdx::NONE {
            self.buckets[bucket] = node;
            return;
        }
        let state = self.state(node);
        loop {
            let dir = usize::from(state >= self.state(at));
            let next = self.rec(at).child[dir];
            if next == NodeIdx::NONE {
                self.rec_mut(at).child[dir] = node;
                return;
            }
            at = next;
        }
    }

    /// The unique record for `state` in the given generation. An existing
    /// record from a stale generation is reinitialized in place with the
    /// supplied costs and parent; a generation-current record is returned
    /// as-is and the parameters are ignored.
    pub fn fetch_or_create(
        &mut self,
        generation: u32,
        state: S,
        cost_from_start: Cost,
        est_to_goal: Cost,
        parent: NodeIdx,
    ) -> NodeIdx {
        self.ensure_warm(state);
        let bucket = self.bucket_of(&state);
        let mut at = self.buckets[bucket];
        while at != NodeIdx::NONE {
            let rec = self.rec(at);
            if rec.state == state {
                if rec.generation != generation {
                    self.rec_mut(at)
                        .init(generation, state, cost_from_start, est_to_goal, parent);
                }
                return at;
            }
            at = rec.child[usize::from(state >= rec.state)];
        }
        let node = self.alloc(state);
        self.rec_mut(node)
            .init(generation, state, cost_from_start, est_to_goal, parent);
        self.tree_insert(bucket, node);
        node
    }

    /// The existing record for `state`, whatever its generation. The state
    /// must have been seen by some prior `fetch_or_create`.
    pub fn fetch(&self, state: S) -> NodeIdx {
        let bucket = self.bucket_of(&state);
        let mut at = self.buckets[bucket];
        while at != NodeIdx::NONE {
            let rec = self.rec(at);
            if rec.state == state {
                return at;
            }
            at = rec.child[usize::from(state >= rec.state)];
        }
        panic!("fetch of a never-seen state");
    }

    // ── Adjacency cache ─────────────────────────────────────────────────

    /// Append a neighbor list whole. Returns the list's offset, or `None`
    /// if it does not fit the remaining capacity (nothing is written).
    pub fn push_cache(&mut self, edges: &[EdgeRef]) -> Option<u32> {
        if self.adj_cache.len() + edges.len() > self.adj_cache_cap {
            return None;
        }
        let start = self.adj_cache.len() as u32;
        self.adj_cache.extend_from_slice(edges);
        Some(start)
    }

    /// Copy a previously pushed neighbor list into `out`.
    pub fn get_cache(&self, start: u32, len: u32, out: &mut Vec<EdgeRef>) {
        debug_assert!(start != NOT_CACHED && len != ADJACENT_UNKNOWN);
        let start = start as usize;
        let end = start + len as usize;
        debug_assert!(end <= self.adj_cache.len());
        out.clear();
        out.extend_from_slice(&self.adj_cache[start..end]);
    }

    // ── Snapshots / reset ───────────────────────────────────────────────

    /// Collect every state with a record valid in `generation`. Cold and
    /// freed records sit at generation 0, which is never a live search
    /// generation, so they filter out here.
    pub fn all_states(&self, generation: u32, out: &mut Vec<S>) {
        debug_assert!(generation != 0);
        out.clear();
        for rec in self.records.iter().skip(1) {
            if rec.generation == generation {
                out.push(rec.state);
            }
        }
    }

    /// Drop everything back to the warm-up footprint: all blocks but the
    /// first are released, the survivors are relinked as free, and the
    /// hash index and adjacency cache are wiped. Record contents are left
    /// stale; `alloc` clears on reuse.
    pub fn clear(&mut self) {
        if self.records.is_empty() {
            return;
        }
        self.records.truncate(1 + self.block_size);
        self.records.shrink_to(1 + self.block_size);
        let sentinel = &mut self.records[0];
        sentinel.prev = SENTINEL;
        sentinel.next = SENTINEL;

        self.free_head = NodeIdx::NONE;
        for i in 1..self.records.len() {
            let idx = NodeIdx(i as u32);
            let head = self.free_head;
            let rec = &mut self.records[i];
            rec.generation = 0;
            rec.prev = NodeIdx::NONE;
            rec.next = head;
            self.free_head = idx;
            if head != NodeIdx::NONE {
                self.records[head.index()].prev = idx;
            }
        }
        self.buckets.fill(NodeIdx::NONE);
        self.adj_cache.clear();
    }
}
