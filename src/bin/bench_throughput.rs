//! Multi-instance throughput benchmark.
//!
//! The solver is single-threaded by contract, but instances are
//! independent: each worker owns a solver over a shared read-only map.
//! This measures aggregate solves/sec as instances are added.

#[cfg(feature = "mimalloc-global")]
#[global_allocator]
static GLOBAL_ALLOCATOR: mimalloc::MiMalloc = mimalloc::MiMalloc;

use rand::Rng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::env;
use std::time::Instant;

use pathloom::{Cost, Edge, Graph, Solver, SolverConfig};

#[derive(Clone, Debug)]
struct BenchConfig {
    size: i32,
    density: f64,
    queries: usize,
    threads: usize,
    seed: u64,
    json: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            size: 256,
            density: 0.3,
            queries: 4000,
            threads: 0, // 0 = rayon default
            seed: 0x5EED_1234_ABCD_EF01,
            json: false,
        }
    }
}

fn parse_args() -> BenchConfig {
    let mut cfg = BenchConfig::default();
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--size" => {
                if let Some(v) = args.next() {
                    cfg.size = v.parse().expect("--size expects i32");
                }
            }
            "--density" => {
                if let Some(v) = args.next() {
                    cfg.density = v.parse().expect("--density expects f64");
                }
            }
            "--queries" => {
                if let Some(v) = args.next() {
                    cfg.queries = v.parse().expect("--queries expects usize");
                }
            }
            "--threads" => {
                if let Some(v) = args.next() {
                    cfg.threads = v.parse().expect("--threads expects usize");
                }
            }
            "--seed" => {
                if let Some(v) = args.next() {
                    cfg.seed = v.parse().expect("--seed expects u64");
                }
            }
            "--json" => {
                cfg.json = true;
            }
            other => panic!("unknown arg: {other}"),
        }
    }
    cfg
}

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

fn main() {
    let cfg = parse_args();
    if cfg.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cfg.threads)
            .build_global()
            .expect("rayon pool already initialized");
    }

    let map = GridMap::generate(cfg.size, cfg.size, cfg.density, cfg.seed);
    let mut rng = rand::rngs::StdRng::seed_from_u64(cfg.seed ^ 0x9E37_79B9_7F4A_7C15);
    let mut pick = |rng: &mut rand::rngs::StdRng| loop {
        let x = rng.gen_range(0..map.width);
        let y = rng.gen_range(0..map.height);
        if map.open(x, y) {
            return (y * map.width + x) as u32;
        }
    };
    let queries: Vec<(u32, u32)> = (0..cfg.queries)
        .map(|_| {
            let a = pick(&mut rng);
            let b = pick(&mut rng);
            (a, b)
        })
        .collect();

    let chunk = (queries.len() / rayon::current_num_threads().max(1)).max(1);
    let start = Instant::now();
    let solved: usize = queries
        .par_chunks(chunk)
        .map(|chunk| {
            // One solver instance per chunk; the map is shared read-only.
            let config = SolverConfig::default()
                .block_size(4096)
                .typical_adjacent(4);
            let mut solver = Solver::with_config(&map, config);
            chunk
                .iter()
                .filter(|&&(a, b)| !solver.solve(a, b).is_empty())
                .count()
        })
        .sum();
    let secs = start.elapsed().as_secs_f64();

    if cfg.json {
        println!(
            "{{\"size\":{},\"queries\":{},\"threads\":{},\"solved\":{},\"secs\":{:.6},\"queries_per_s\":{:.1}}}",
            cfg.size,
            cfg.queries,
            rayon::current_num_threads(),
            solved,
            secs,
            cfg.queries as f64 / secs
        );
    } else {
        println!(
            "bench_throughput: {}x{}, {} queries on {} threads",
            cfg.size,
            cfg.size,
            cfg.queries,
            rayon::current_num_threads()
        );
        println!(
            "  {} solved in {:.3}s ({:.0} queries/s)",
            solved,
            secs,
            cfg.queries as f64 / secs
        );
    }
}
