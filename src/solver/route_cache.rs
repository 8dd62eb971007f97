//! Route cache: memoized (start, end) → next-hop table.
//!
//! A fixed-capacity, tombstone-free, linear-probing table keyed on the
//! (start, end) state pair. Entries are only ever inserted: on a key
//! collision the existing entry wins, and nothing is updated in place.
//! First-write-wins is a documented invariant, not an accident: a cached
//! route is never silently corrected, only discarded wholesale by `reset`.
//! A batch guard refuses insertions that would push the table past 3/4
//! fill, so probing always terminates on an empty slot.
//!
//! A stored cost of `Cost::INFINITY` (with no hop) is the proof that no
//! route exists from that start to that end.

use std::hash::{Hash, Hasher};
use std::mem;

use rustc_hash::FxHasher;

use crate::graph::{Cost, StateKey};

/// Maximum fill: 3/4 of capacity.
const FILL_NUM: usize = 3;
const FILL_DEN: usize = 4;

struct Item<S> {
    start: S,
    end: S,
    /// Next state on the route from `start` to `end`; `None` for a
    /// proven-unreachable entry (cost is then infinite).
    next: Option<S>,
    cost: Cost,
}

/// Answer to a cache probe.
pub(crate) enum Lookup<S> {
    /// Nothing known for this pair.
    Miss,
    /// Proven: no route exists.
    NoRoute,
    /// Replayed hop chain, start and end inclusive.
    Path(Vec<S>),
}

pub(crate) struct RouteCache<S> {
    slots: Vec<Option<Item<S>>>,
    mask: usize,
    len: usize,
    pub hit: u64,
    pub miss: u64,
}

#[inline(always)]
fn pair_hash<S: Hash>(start: &S, end: &S) -> u64 {
    let mut h = FxHasher::default();
    start.hash(&mut h);
    end.hash(&mut h);
    h.finish()
}

impl<S: StateKey> RouteCache<S> {
    pub fn new(capacity: usize) -> Self {
        let n_slots = capacity.next_power_of_two().max(16);
        let mut slots = Vec::with_capacity(n_slots);
        slots.resize_with(n_slots, || None);
        Self {
            slots,
            mask: n_slots - 1,
            len: 0,
            hit: 0,
            miss: 0,
        }
    }

    fn find(&self, start: S, end: S) -> Option<&Item<S>> {
        let mut pos = pair_hash(&start, &end) as usize & self.mask;
        loop {
            match &self.slots[pos] {
                None => return None,
                Some(item) if item.start == start && item.end == end => return Some(item),
                Some(_) => pos = (pos + 1) & self.mask,
            }
        }
    }

    /// Insert unless the key already exists (first-write-wins).
    fn insert(&mut self, item: Item<S>) {
        let mut pos = pair_hash(&item.start, &item.end) as usize & self.mask;
        loop {
            match &self.slots[pos] {
                None => {
                    self.slots[pos] = Some(item);
                    self.len += 1;
                    return;
                }
                Some(existing) if existing.start == item.start && existing.end == item.end => {
                    // Existing entry wins. Both sides must agree on
                    // reachability; a mismatch means the graph changed
                    // under the cache.
                    debug_assert_eq!(existing.next.is_some(), item.next.is_some());
                    return;
                }
                Some(_) => pos = (pos + 1) & self.mask,
            }
        }
    }

    #[inline]
    fn batch_fits(&self, n: usize) -> bool {
        (self.len + n) * FILL_DEN <= self.slots.len() * FILL_NUM
    }

    /// Probe for (start, end), bumping exactly one of hit/miss. A positive
    /// hit replays the stored hop chain into a full path.
    pub fn lookup(&mut self, start: S, end: S) -> Lookup<S> {
        let Some(item) = self.find(start, end) else {
            self.miss += 1;
            return Lookup::Miss;
        };
        if item.cost == Cost::INFINITY {
            self.hit += 1;
            return Lookup::NoRoute;
        }

        let mut path = vec![start];
        let mut at = start;
        loop {
            let item = self
                .find(at, end)
                .expect("route cache hop chain broken (graph changed without reset?)");
            assert!(
                item.cost < Cost::INFINITY,
                "route cache hop chain hit a no-route entry"
            );
            let next = item.next.expect("finite-cost cache entry without a hop");
            path.push(next);
            if next == end {
                break;
            }
            at = next;
        }
        self.hit += 1;
        Lookup::Path(path)
    }

    /// Record one entry per consecutive edge of a solved path, keyed
    /// against the path's final state. Silently refuses the whole batch if
    /// it would exceed the fill guard.
    pub fn add_path(&mut self, path: &[S], costs: &[Cost]) {
        debug_assert!(path.len() >= 2);
        debug_assert_eq!(costs.len(), path.len() - 1);
        if !self.batch_fits(path.len() - 1) {
            return;
        }
        let end = path[path.len() - 1];
        for i in 0..path.len() - 1 {
            self.insert(Item {
                start: path[i],
                end,
                next: Some(path[i + 1]),
                cost: costs[i],
            });
        }
    }

    /// Record proof that `end` is unreachable from each of `starts`, under
    /// the same fill guard.
    pub fn add_no_route(&mut self, end: S, starts: &[S]) {
        if !self.batch_fits(starts.len()) {
            return;
        }
        for &start in starts {
            self.insert(Item {
                start,
                end,
                next: None,
                cost: Cost::INFINITY,
            });
        }
    }

    /// Drop all entries and counters.
    pub fn reset(&mut self) {
        if self.len > 0 {
            for slot in &mut self.slots {
                *slot = None;
            }
            self.len = 0;
        }
        self.hit = 0;
        self.miss = 0;
    }

    pub fn allocated_bytes(&self) -> usize {
        self.slots.len() * mem::size_of::<Option<Item<S>>>()
    }

    pub fn used_bytes(&self) -> usize {
        self.len * mem::size_of::<Option<Item<S>>>()
    }
}
