//! Search orchestrator and public solver API.
//!
//! A solve call runs: route-cache probe → generation advance → A* expansion
//! loop → path reconstruction and cache feeding. All search memory (record
//! arena, adjacency cache, route cache) belongs to the solver instance and
//! is reused across calls; a search allocates nothing once the arena is
//! warm.
//!
//! Known limitation, kept deliberately: a closed record that is later
//! relaxed to a lower cost keeps the better cost and parent but is not
//! reopened. With a consistent heuristic this case cannot occur; with an
//! admissible-but-inconsistent one the returned path can be suboptimal.

use std::mem;

use super::arena::{EdgeRef, NodeArena};
use super::node::{NodeIdx, NOT_CACHED};
use super::open_list;
use super::route_cache::{Lookup, RouteCache};
use crate::graph::{Cost, Edge, Graph};

/// Construction-time tuning. Defaults suit a mid-sized map with a handful
/// of neighbors per state.
#[derive(Clone, Debug)]
pub struct SolverConfig {
    /// Records per arena growth block.
    pub block_size: usize,
    /// Expected branching factor; sizes the adjacency cache at
    /// `block_size * typical_adjacent` entries.
    pub typical_adjacent: usize,
    /// Enable the (start, end) route cache.
    pub route_cache: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            block_size: 1024,
            typical_adjacent: 8,
            route_cache: true,
        }
    }
}

impl SolverConfig {
    pub fn block_size(mut self, n: usize) -> Self {
        self.block_size = n;
        self
    }

    pub fn typical_adjacent(mut self, n: usize) -> Self {
        self.typical_adjacent = n;
        self
    }

    pub fn route_cache(mut self, enabled: bool) -> Self {
        self.route_cache = enabled;
        self
    }
}

/// Route-cache usage snapshot. All zeros when the cache is disabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct CacheStats {
    pub bytes_allocated: usize,
    pub bytes_used: usize,
    pub memory_fraction: f32,
    pub hit: u64,
    pub miss: u64,
    pub hit_fraction: f32,
}

/// Best-path solver over a client graph. One instance serves one search at
/// a time (`&mut self` throughout); independent instances may share a
/// read-only graph.
pub struct Solver<G: Graph> {
    graph: G,
    arena: NodeArena<G::State>,
    route_cache: Option<RouteCache<G::State>>,
    /// Current search epoch. 0 means "no search has run".
    generation: u32,
    // Scratch buffers, reused across calls.
    edge_scratch: Vec<Edge<G::State>>,
    neighbor_scratch: Vec<EdgeRef>,
    cost_scratch: Vec<Cost>,
    budget_scratch: Vec<NodeIdx>,
}

/// Route-cache slots per arena record.
const ROUTE_CACHE_ITEMS_PER_RECORD: usize = 4;

impl<G: Graph> Solver<G> {
    pub fn new(graph: G) -> Self {
        Self::with_config(graph, SolverConfig::default())
    }

    pub fn with_config(graph: G, config: SolverConfig) -> Self {
        let arena = NodeArena::new(config.block_size, config.typical_adjacent);
        let route_cache = config
            .route_cache
            .then(|| RouteCache::new(config.block_size * ROUTE_CACHE_ITEMS_PER_RECORD));
        Self {
            graph,
            arena,
            route_cache,
            generation: 0,
            edge_scratch: Vec::new(),
            neighbor_scratch: Vec::new(),
            cost_scratch: Vec::new(),
            budget_scratch: Vec::new(),
        }
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// Drop all cached work: records, adjacency cache, route cache, and
    /// generation counting. The next solve re-queries the client for
    /// everything it visits.
    pub fn reset(&mut self) {
        self.arena.clear();
        if let Some(cache) = &mut self.route_cache {
            cache.reset();
        }
        self.generation = 0;
    }

    /// Every state with a record in the arena for the most recent search.
    /// Diagnostic/visualization aid.
    pub fn states_in_arena(&self) -> Vec<G::State> {
        let mut out = Vec::new();
        if self.generation != 0 {
            self.arena.all_states(self.generation, &mut out);
        }
        out
    }

    /// Route-cache memory and hit/miss snapshot.
    pub fn cache_stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        if let Some(cache) = &self.route_cache {
            stats.bytes_allocated = cache.allocated_bytes();
            stats.bytes_used = cache.used_bytes();
            if stats.bytes_allocated > 0 {
                stats.memory_fraction = stats.bytes_used as f32 / stats.bytes_allocated as f32;
            }
            stats.hit = cache.hit;
            stats.miss = cache.miss;
            let probes = cache.hit + cache.miss;
            if probes > 0 {
                stats.hit_fraction = cache.hit as f32 / probes as f32;
            }
        }
        stats
    }

    #[inline]
    fn advance_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            // Stamp wraparound: drop every record so nothing stale can
            // alias the restarted count.
            self.arena.clear();
            self.generation = 1;
        }
    }

    /// Minimum-cost path from `start` to `end`, inclusive of both, or an
    /// empty vector if no path exists (or `start == end`).
    pub fn solve(&mut self, start: G::State, end: G::State) -> Vec<G::State> {
        if let Some(cache) = &mut self.route_cache {
            match cache.lookup(start, end) {
                Lookup::Path(path) => return path,
                Lookup::NoRoute => return Vec::new(),
                Lookup::Miss => {}
            }
        }
        if start == end {
            return Vec::new();
        }

        self.advance_generation();
        let est = self.graph.estimate(start, end);
        let root = self
            .arena
            .fetch_or_create(self.generation, start, 0.0, est, NodeIdx::NONE);
        open_list::init(&mut self.arena);
        open_list::push(&mut self.arena, root);

        let mut neighbors = mem::take(&mut self.neighbor_scratch);
        while !open_list::is_empty(&self.arena) {
            let node = open_list::pop(&mut self.arena);

            if self.arena.state(node) == end {
                self.neighbor_scratch = neighbors;
                let path = self.reconstruct(node);
                self.record_path(&path);
                return path;
            }

            self.arena.mark_closed(node);
            self.neighbors_of(node, &mut neighbors);

            for i in 0..neighbors.len() {
                let EdgeRef { node: child, cost: edge_cost } = neighbors[i];
                if edge_cost == Cost::INFINITY {
                    continue;
                }
                let new_cost = self.arena.rec(node).cost_from_start + edge_cost;
                let (in_open, in_closed) = {
                    let rec = self.arena.rec(child);
                    (rec.in_open, rec.in_closed)
                };
                debug_assert!(!(in_open && in_closed));

                if in_open || in_closed {
                    if new_cost < self.arena.rec(child).cost_from_start {
                        let est = self.graph.estimate(self.arena.state(child), end);
                        let rec = self.arena.rec_mut(child);
                        rec.parent = node;
                        rec.cost_from_start = new_cost;
                        rec.est_to_goal = est;
                        rec.recompute_total();
                        if in_open {
                            open_list::update(&mut self.arena, child);
                        }
                        // Closed records take the better cost but are not
                        // reopened; see module docs.
                    }
                } else {
                    let est = self.graph.estimate(self.arena.state(child), end);
                    let rec = self.arena.rec_mut(child);
                    rec.parent = node;
                    rec.cost_from_start = new_cost;
                    rec.est_to_goal = est;
                    rec.recompute_total();
                    open_list::push(&mut self.arena, child);
                }
            }
        }
        self.neighbor_scratch = neighbors;

        if let Some(cache) = &mut self.route_cache {
            cache.add_no_route(end, &[start]);
        }
        Vec::new()
    }

    /// Every state whose minimum cost from `start` is at most `max_cost`,
    /// annotated with that cost. The start itself is included at cost 0.
    /// Runs without heuristic guidance and terminates when the open list
    /// drains, not on reaching any particular state.
    pub fn solve_within_budget(&mut self, start: G::State, max_cost: Cost) -> Vec<Edge<G::State>> {
        self.advance_generation();
        let root = self
            .arena
            .fetch_or_create(self.generation, start, 0.0, 0.0, NodeIdx::NONE);
        open_list::init(&mut self.arena);
        open_list::push(&mut self.arena, root);

        let mut popped = mem::take(&mut self.budget_scratch);
        popped.clear();
        let mut neighbors = mem::take(&mut self.neighbor_scratch);

        while !open_list::is_empty(&self.arena) {
            let node = open_list::pop(&mut self.arena);
            self.arena.mark_closed(node);
            popped.push(node);

            if self.arena.rec(node).total_cost > max_cost {
                // Over budget: keep it closed but do not expand through it.
                continue;
            }

            self.neighbors_of(node, &mut neighbors);
            for i in 0..neighbors.len() {
                let EdgeRef { node: child, cost: edge_cost } = neighbors[i];
                if edge_cost == Cost::INFINITY {
                    continue;
                }
                debug_assert!(self.arena.rec(node).cost_from_start < Cost::INFINITY);
                let new_cost = self.arena.rec(node).cost_from_start + edge_cost;
                let (in_open, in_closed) = {
                    let rec = self.arena.rec(child);
                    (rec.in_open, rec.in_closed)
                };
                // Strict dominance: an existing cost at or below the
                // candidate ends the relaxation.
                if (in_open || in_closed) && self.arena.rec(child).cost_from_start <= new_cost {
                    continue;
                }
                assert!(child != root, "start state re-relaxed (negative edge cost?)");

                let rec = self.arena.rec_mut(child);
                rec.parent = node;
                rec.cost_from_start = new_cost;
                rec.est_to_goal = 0.0;
                rec.total_cost = new_cost;
                if in_open {
                    open_list::update(&mut self.arena, child);
                } else if !in_closed {
                    open_list::push(&mut self.arena, child);
                }
            }
        }
        self.neighbor_scratch = neighbors;

        let mut out = Vec::with_capacity(popped.len());
        for &idx in &popped {
            let rec = self.arena.rec(idx);
            if rec.total_cost <= max_cost {
                out.push(Edge {
                    state: rec.state,
                    cost: rec.total_cost,
                });
            }
        }
        self.budget_scratch = popped;
        out
    }

    /// Neighbor edges of `node`, served from the adjacency cache when
    /// possible. On a first expansion the client is queried, the edges are
    /// resolved to records, and the list is offered to the cache; if it
    /// does not fit, this node re-queries the client on every expansion.
    fn neighbors_of(&mut self, node: NodeIdx, out: &mut Vec<EdgeRef>) {
        let (num_adjacent, cache_start) = {
            let rec = self.arena.rec(node);
            (rec.num_adjacent, rec.cache_start)
        };

        if num_adjacent == 0 {
            // Memoized "no neighbors" answer.
            out.clear();
            return;
        }

        if cache_start == NOT_CACHED {
            let state = self.arena.state(node);
            let mut edges = mem::take(&mut self.edge_scratch);
            edges.clear();
            self.graph.expand(state, &mut edges);

            out.clear();
            self.arena.rec_mut(node).num_adjacent = edges.len() as u32;
            for edge in &edges {
                let child = self.arena.fetch_or_create(
                    self.generation,
                    edge.state,
                    Cost::INFINITY,
                    Cost::INFINITY,
                    NodeIdx::NONE,
                );
                out.push(EdgeRef {
                    node: child,
                    cost: edge.cost,
                });
            }
            self.edge_scratch = edges;

            if !out.is_empty() {
                if let Some(start) = self.arena.push_cache(out) {
                    self.arena.rec_mut(node).cache_start = start;
                }
            }
        } else {
            self.arena.get_cache(cache_start, num_adjacent, out);
            // Cached entries may reference records from an earlier search;
            // revalidate them for this generation.
            for i in 0..out.len() {
                let child = out[i].node;
                if self.arena.rec(child).generation != self.generation {
                    let state = self.arena.state(child);
                    self.arena.rec_mut(child).init(
                        self.generation,
                        state,
                        Cost::INFINITY,
                        Cost::INFINITY,
                        NodeIdx::NONE,
                    );
                }
            }
        }
    }

    /// Walk parent links from the goal record and reverse.
    fn reconstruct(&self, goal: NodeIdx) -> Vec<G::State> {
        let mut path = Vec::new();
        let mut it = goal;
        while it != NodeIdx::NONE {
            path.push(self.arena.state(it));
            it = self.arena.rec(it).parent;
        }
        path.reverse();
        path
    }

    /// Feed a freshly solved path to the route cache: one entry per edge,
    /// with exact costs looked up in the already-expanded neighbor sets.
    fn record_path(&mut self, path: &[G::State]) {
        if self.route_cache.is_none() {
            return;
        }
        debug_assert!(path.len() >= 2);

        let mut costs = mem::take(&mut self.cost_scratch);
        costs.clear();
        let mut neighbors = mem::take(&mut self.neighbor_scratch);

        let mut from = self.arena.fetch(path[0]);
        for &state in &path[1..] {
            let to = self.arena.fetch(state);
            self.neighbors_of(from, &mut neighbors);
            let edge = neighbors
                .iter()
                .find(|e| e.node == to)
                .expect("solved path contains an edge the graph does not report");
            costs.push(edge.cost);
            from = to;
        }
        self.neighbor_scratch = neighbors;

        if let Some(cache) = &mut self.route_cache {
            cache.add_path(path, &costs);
        }
        self.cost_scratch = costs;
    }
}
