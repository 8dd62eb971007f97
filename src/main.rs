#[cfg(feature = "mimalloc-global")]
#[global_allocator]
static GLOBAL_ALLOCATOR: mimalloc::MiMalloc = mimalloc::MiMalloc;

use rand::Rng;
use rand::SeedableRng;
use std::time::Instant;

use pathloom::{Cost, Edge, Graph, Solver, SolverConfig};

const DEFAULT_SIZE: i32 = 512;
const DEFAULT_DENSITY: f64 = 0.3;
const DEFAULT_QUERIES: usize = 2000;
const DEFAULT_SEED: u64 = 0x5EED_1234_ABCD_EF01;

struct MainArgs {
    size: i32,
    density: f64,
    queries: usize,
    seed: u64,
    no_cache: bool,
}

fn parse_args() -> MainArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = MainArgs {
        size: DEFAULT_SIZE,
        density: DEFAULT_DENSITY,
        queries: DEFAULT_QUERIES,
        seed: DEFAULT_SEED,
        no_cache: false,
    };
    let next_arg = |i: usize, flag: &str| -> &str {
        args.get(i)
            .map(String::as_str)
            .unwrap_or_else(|| panic!("{flag} requires a value"))
    };
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--size" => {
                i += 1;
                parsed.size = next_arg(i, "--size")
                    .parse()
                    .expect("--size requires a positive integer");
            }
            "--density" => {
                i += 1;
                parsed.density = next_arg(i, "--density")
                    .parse()
                    .expect("--density requires a float in [0, 1)");
            }
            "--queries" => {
                i += 1;
                parsed.queries = next_arg(i, "--queries")
                    .parse()
                    .expect("--queries requires a positive integer");
            }
            "--seed" => {
                i += 1;
                parsed.seed = next_arg(i, "--seed")
                    .parse()
                    .expect("--seed requires a u64");
            }
            "--no-cache" => {
                parsed.no_cache = true;
            }
            other => panic!("unknown arg: {other}"),
        }
        i += 1;
    }
    parsed
}

/// Four-connected unit-cost grid with random walls. States are packed cell
/// indices; the heuristic is Manhattan distance (admissible and consistent
/// for this topology).
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
    fn cell(&self, x: i32, y: i32) -> u32 {
        (y * self.width + x) as u32
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
                out.push(Edge { state: self.cell(nx, ny), cost: 1.0 });
            }
        }
    }
}

fn random_open_cell(map: &GridMap, rng: &mut impl Rng) -> u32 {
    loop {
        let x = rng.gen_range(0..map.width);
        let y = rng.gen_range(0..map.height);
        if map.open(x, y) {
            return map.cell(x, y);
        }
    }
}

fn main() {
    let args = parse_args();
    let map = GridMap::generate(args.size, args.size, args.density, args.seed);

    let config = SolverConfig::default()
        .block_size(4096)
        .typical_adjacent(4)
        .route_cache(!args.no_cache);
    let mut solver = Solver::with_config(map, config);

    let mut rng = rand::rngs::StdRng::seed_from_u64(args.seed ^ 0x9E37_79B9_7F4A_7C15);
    let queries: Vec<(u32, u32)> = (0..args.queries)
        .map(|_| {
            let a = random_open_cell(solver.graph(), &mut rng);
            let b = random_open_cell(solver.graph(), &mut rng);
            (a, b)
        })
        .collect();

    // Cold pass: every query is a full search (or a replay of an earlier
    // query's cached edges).
    let cold_start = Instant::now();
    let mut solved = 0usize;
    let mut total_hops = 0usize;
    let mut first_paths: Vec<Vec<u32>> = Vec::with_capacity(queries.len());
    for &(a, b) in &queries {
        let path = solver.solve(a, b);
        if !path.is_empty() {
            solved += 1;
            total_hops += path.len() - 1;
        }
        first_paths.push(path);
    }
    let cold = cold_start.elapsed();

    // Warm pass: identical queries; with the route cache on, these replay.
    let warm_start = Instant::now();
    for (i, &(a, b)) in queries.iter().enumerate() {
        let path = solver.solve(a, b);
        assert_eq!(path, first_paths[i], "replay diverged from the fresh search");
    }
    let warm = warm_start.elapsed();

    let stats = solver.cache_stats();
    println!(
        "grid {}x{} density {:.2} seed {:#x}",
        args.size, args.size, args.density, args.seed
    );
    println!(
        "cold: {} queries in {:.3}s ({:.0}/s), {} solved, {} total hops",
        queries.len(),
        cold.as_secs_f64(),
        queries.len() as f64 / cold.as_secs_f64(),
        solved,
        total_hops
    );
    println!(
        "warm: {} queries in {:.3}s ({:.0}/s)",
        queries.len(),
        warm.as_secs_f64(),
        queries.len() as f64 / warm.as_secs_f64()
    );
    println!(
        "route cache: {} hits, {} misses ({:.1}% hit), {}/{} bytes used",
        stats.hit,
        stats.miss,
        stats.hit_fraction * 100.0,
        stats.bytes_used,
        stats.bytes_allocated
    );
}
