use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use pathloom::{Cost, Edge, Graph, Solver, SolverConfig};
use rand::Rng;
use rand::SeedableRng;

/// Adjacency-list graph over `u32` states. Edges sit behind a `RefCell` so
/// tests can mutate the graph through the solver's shared reference, and
/// client callbacks are counted.
struct ListGraph {
    edges: RefCell<Vec<Vec<Edge<u32>>>>,
    expand_calls: Cell<u64>,
}

impl ListGraph {
    fn new(n: usize) -> Self {
        Self {
            edges: RefCell::new(vec![Vec::new(); n]),
            expand_calls: Cell::new(0),
        }
    }

    fn link(&self, from: u32, to: u32, cost: Cost) {
        self.edges.borrow_mut()[from as usize].push(Edge { state: to, cost });
    }

    fn set_cost(&self, from: u32, to: u32, cost: Cost) {
        let mut edges = self.edges.borrow_mut();
        let edge = edges[from as usize]
            .iter_mut()
            .find(|e| e.state == to)
            .expect("edge to update");
        edge.cost = cost;
    }
}

impl Graph for ListGraph {
    type State = u32;

    fn estimate(&self, _from: u32, _to: u32) -> Cost {
        0.0
    }

    fn expand(&self, state: u32, out: &mut Vec<Edge<u32>>) {
        self.expand_calls.set(self.expand_calls.get() + 1);
        out.extend_from_slice(&self.edges.borrow()[state as usize]);
    }
}

/// Three states where the two-hop route beats the direct edge:
/// 0→1 (1), 1→2 (1), 0→2 (4).
fn diamond() -> ListGraph {
    let g = ListGraph::new(3);
    g.link(0, 1, 1.0);
    g.link(1, 2, 1.0);
    g.link(0, 2, 4.0);
    g
}

/// Four-connected unit-cost grid with random walls.
struct GridMap {
    width: i32,
    height: i32,
    walls: Vec<bool>,
}

impl GridMap {
    fn generate(width: i32, height: i32, density: f64, seed: u64) -> Self {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let walls = (0..width as usize * height as usize)
            .map(|_| rng.gen_bool(density))
            .collect();
        Self { width, height, walls }
    }

    #[inline]
    fn coords(&self, state: u32) -> (i32, i32) {
        let state = state as i32;
        (state % self.width, state / self.width)
    }

    #[inline]
    fn open(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height && !self.walls[(y * self.width + x) as usize]
    }

    fn random_open_cell(&self, rng: &mut impl Rng) -> u32 {
        loop {
            let x = rng.gen_range(0..self.width);
            let y = rng.gen_range(0..self.height);
            if self.open(x, y) {
                return (y * self.width + x) as u32;
            }
        }
    }
}

impl Graph for GridMap {
    type State = u32;

    fn estimate(&self, from: u32, to: u32) -> Cost {
        let (fx, fy) = self.coords(from);
        let (tx, ty) = self.coords(to);
        ((fx - tx).abs() + (fy - ty).abs()) as Cost
    }

    fn expand(&self, state: u32, out: &mut Vec<Edge<u32>>) {
        let (x, y) = self.coords(state);
        for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            let (nx, ny) = (x + dx, y + dy);
            if self.open(nx, ny) {
                out.push(Edge { state: (ny * self.width + nx) as u32, cost: 1.0 });
            }
        }
    }
}

/// Reference minimum hop counts from `start` (unit edge costs, so BFS
/// distances are minimum costs).
fn naive_distances(map: &GridMap, start: u32) -> Vec<Option<u32>> {
    let mut dist = vec![None; (map.width * map.height) as usize];
    dist[start as usize] = Some(0);
    let mut queue = VecDeque::from([start]);
    while let Some(cell) = queue.pop_front() {
        let d = dist[cell as usize].unwrap();
        let (x, y) = map.coords(cell);
        for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            let (nx, ny) = (x + dx, y + dy);
            if map.open(nx, ny) {
                let n = (ny * map.width + nx) as usize;
                if dist[n].is_none() {
                    dist[n] = Some(d + 1);
                    queue.push_back(n as u32);
                }
            }
        }
    }
    dist
}

fn assert_valid_grid_path(map: &GridMap, path: &[u32], start: u32, end: u32) {
    assert_eq!(path[0], start);
    assert_eq!(*path.last().unwrap(), end);
    for pair in path.windows(2) {
        let (ax, ay) = map.coords(pair[0]);
        let (bx, by) = map.coords(pair[1]);
        assert!(map.open(ax, ay) && map.open(bx, by));
        assert_eq!((ax - bx).abs() + (ay - by).abs(), 1, "non-adjacent hop");
    }
}

#[test]
fn prefers_cheaper_two_hop_route_over_direct_edge() {
    let mut solver = Solver::new(diamond());
    assert_eq!(solver.solve(0, 2), vec![0, 1, 2]);
}

#[test]
fn solve_to_self_is_empty_not_an_error() {
    let mut solver = Solver::new(diamond());
    assert!(solver.solve(0, 0).is_empty());
    // Also with the cache disabled.
    let mut solver = Solver::with_config(diamond(), SolverConfig::default().route_cache(false));
    assert!(solver.solve(1, 1).is_empty());
}

#[test]
fn repeat_solve_replays_the_identical_path() {
    let mut solver = Solver::new(diamond());
    let first = solver.solve(0, 2);
    let second = solver.solve(0, 2);
    assert_eq!(first, second);

    let stats = solver.cache_stats();
    assert_eq!((stats.hit, stats.miss), (1, 1));
    assert_eq!(stats.hit_fraction, 0.5);
}

#[test]
fn intermediate_states_replay_to_the_same_goal() {
    let mut solver = Solver::new(diamond());
    let _ = solver.solve(0, 2);
    // (1, 2) was cached as part of the solved path.
    assert_eq!(solver.solve(1, 2), vec![1, 2]);
    let stats = solver.cache_stats();
    assert_eq!((stats.hit, stats.miss), (1, 1));
}

#[test]
fn unreachable_goal_is_proven_once_then_replayed() {
    let g = ListGraph::new(2); // no edges at all
    let mut solver = Solver::new(g);

    assert!(solver.solve(0, 1).is_empty());
    let calls_after_search = solver.graph().expand_calls.get();
    assert!(calls_after_search > 0, "first call must run a full search");
    let stats = solver.cache_stats();
    assert_eq!((stats.hit, stats.miss), (0, 1));

    assert!(solver.solve(0, 1).is_empty());
    // No-route replay: no further client callbacks, hit incremented.
    assert_eq!(solver.graph().expand_calls.get(), calls_after_search);
    let stats = solver.cache_stats();
    assert_eq!((stats.hit, stats.miss), (1, 1));
}

#[test]
fn reset_provably_clears_all_caches() {
    let mut solver = Solver::new(diamond());
    let _ = solver.solve(0, 2);
    // Nodes 0 and 1 are expanded; 2 is popped as the goal.
    assert_eq!(solver.graph().expand_calls.get(), 2);

    let _ = solver.solve(0, 2);
    assert_eq!(solver.graph().expand_calls.get(), 2, "replay must not expand");

    solver.reset();
    let stats = solver.cache_stats();
    assert_eq!((stats.hit, stats.miss), (0, 0));
    assert_eq!(stats.bytes_used, 0);

    assert_eq!(solver.solve(0, 2), vec![0, 1, 2]);
    // Every visited state was re-expanded through the client.
    assert_eq!(solver.graph().expand_calls.get(), 4);
}

#[test]
fn hit_plus_miss_equals_solve_calls() {
    let mut solver = Solver::new(diamond());
    let _ = solver.solve(0, 2); // miss
    let _ = solver.solve(0, 2); // hit
    let _ = solver.solve(0, 0); // miss, then degenerate empty
    let _ = solver.solve(2, 0); // miss, search fails, no-route recorded
    let _ = solver.solve(2, 0); // no-route hit

    let stats = solver.cache_stats();
    assert_eq!(stats.hit + stats.miss, 5);
    assert_eq!((stats.hit, stats.miss), (2, 3));
}

#[test]
fn cached_routes_go_stale_by_design_until_reset() {
    let mut solver = Solver::new(diamond());
    assert_eq!(solver.solve(0, 2), vec![0, 1, 2]);

    // The direct edge becomes the cheapest. The cache must keep replaying
    // the first-written route: entries are never silently corrected.
    solver.graph().set_cost(0, 2, 0.1);
    assert_eq!(solver.solve(0, 2), vec![0, 1, 2]);

    // Only a reset picks up the changed graph.
    solver.reset();
    assert_eq!(solver.solve(0, 2), vec![0, 2]);
}

#[test]
fn budget_sweep_returns_exactly_the_affordable_states() {
    let mut solver = Solver::new(diamond());
    let mut within = solver.solve_within_budget(0, 1.0);
    within.sort_by_key(|e| e.state);

    assert_eq!(within.len(), 2);
    assert_eq!((within[0].state, within[0].cost), (0, 0.0));
    assert_eq!((within[1].state, within[1].cost), (1, 1.0));
}

#[test]
fn budget_sweep_reports_minimum_costs() {
    // 0→2 direct (4) loses to 0→1→2 (2); the sweep must report 2.
    let mut solver = Solver::new(diamond());
    let mut within = solver.solve_within_budget(0, 10.0);
    within.sort_by_key(|e| e.state);
    assert_eq!(within.len(), 3);
    assert_eq!((within[2].state, within[2].cost), (2, 2.0));
}

#[test]
fn matches_naive_search_on_random_grids() {
    for seed in [7u64, 99, 12345] {
        let map = GridMap::generate(32, 32, 0.3, seed);
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed ^ 0xDEAD_BEEF);
        let queries: Vec<(u32, u32)> = (0..15)
            .map(|_| (map.random_open_cell(&mut rng), map.random_open_cell(&mut rng)))
            .collect();

        let mut solver = Solver::with_config(
            map,
            SolverConfig::default().block_size(2048).typical_adjacent(4),
        );

        for &(a, b) in &queries {
            let dist = naive_distances(solver.graph(), a)[b as usize];
            let path = solver.solve(a, b);
            match dist {
                None => assert!(path.is_empty(), "solver found a path BFS says cannot exist"),
                Some(0) => assert!(path.is_empty(), "degenerate query must be empty"),
                Some(d) => {
                    assert_valid_grid_path(solver.graph(), &path, a, b);
                    assert_eq!(path.len() as u32 - 1, d, "path is not minimum-cost");
                }
            }
        }
    }
}

#[test]
fn replay_matches_fresh_search_on_random_grids() {
    let map = GridMap::generate(24, 24, 0.25, 4242);
    let mut rng = rand::rngs::StdRng::seed_from_u64(99);
    let queries: Vec<(u32, u32)> = (0..10)
        .map(|_| (map.random_open_cell(&mut rng), map.random_open_cell(&mut rng)))
        .collect();

    let mut solver = Solver::new(map);
    let first: Vec<Vec<u32>> = queries.iter().map(|&(a, b)| solver.solve(a, b)).collect();
    for (i, &(a, b)) in queries.iter().enumerate() {
        assert_eq!(solver.solve(a, b), first[i]);
    }
}

#[test]
fn budget_sweep_matches_naive_distances_on_a_grid() {
    let map = GridMap::generate(24, 24, 0.25, 31337);
    let mut rng = rand::rngs::StdRng::seed_from_u64(1);
    let start = map.random_open_cell(&mut rng);
    let budget = 6.0;

    let dists = naive_distances(&map, start);
    let mut expected: Vec<(u32, u32)> = dists
        .iter()
        .enumerate()
        .filter_map(|(cell, &d)| d.filter(|&d| d as f32 <= budget).map(|d| (cell as u32, d)))
        .collect();
    expected.sort_unstable();

    let mut solver = Solver::new(map);
    let mut within: Vec<(u32, u32)> = solver
        .solve_within_budget(start, budget)
        .into_iter()
        .map(|e| (e.state, e.cost as u32))
        .collect();
    within.sort_unstable();

    assert_eq!(within, expected);
}

#[test]
fn cache_stats_report_memory_and_ratio() {
    let mut solver = Solver::new(diamond());
    let _ = solver.solve(0, 2);

    let stats = solver.cache_stats();
    assert!(stats.bytes_allocated > 0);
    assert!(stats.bytes_used > 0);
    assert!(stats.bytes_used <= stats.bytes_allocated);
    assert!(stats.memory_fraction > 0.0 && stats.memory_fraction <= 1.0);
    assert_eq!(stats.hit_fraction, 0.0);
}

#[test]
fn counters_are_monotonic_across_mixed_outcomes() {
    let mut solver = Solver::new(diamond());
    let mut last = (0, 0);
    let probes = [(0, 2), (0, 2), (2, 1), (1, 2), (0, 0), (2, 1)];
    for &(a, b) in &probes {
        let _ = solver.solve(a, b);
        let stats = solver.cache_stats();
        assert!(stats.hit >= last.0 && stats.miss >= last.1);
        last = (stats.hit, stats.miss);
    }
    let stats = solver.cache_stats();
    assert_eq!(stats.hit + stats.miss, probes.len() as u64);
}
