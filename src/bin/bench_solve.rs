#[cfg(feature = "mimalloc-global")]
#[global_allocator]
static GLOBAL_ALLOCATOR: mimalloc::MiMalloc = mimalloc::MiMalloc;

use rand::Rng;
use rand::SeedableRng;
use std::env;
use std::time::Instant;

use pathloom::{Cost, Edge, Graph, Solver, SolverConfig};

#[derive(Clone, Debug)]
struct BenchConfig {
    size: i32,
    density: f64,
    queries: usize,
    warmup: u64,
    iters: u64,
    seed: u64,
    cache: bool,
    json: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            size: 256,
            density: 0.3,
            queries: 500,
            warmup: 2,
            iters: 20,
            seed: 0x5EED_1234_ABCD_EF01,
            cache: true,
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
            "--warmup" => {
                if let Some(v) = args.next() {
                    cfg.warmup = v.parse().expect("--warmup expects u64");
                }
            }
            "--iters" => {
                if let Some(v) = args.next() {
                    cfg.iters = v.parse().expect("--iters expects u64");
                }
            }
            "--seed" => {
                if let Some(v) = args.next() {
                    cfg.seed = if let Some(hex) = v.strip_prefix("0x") {
                        u64::from_str_radix(hex, 16).expect("--seed hex parse failed")
                    } else {
                        v.parse().expect("--seed expects u64")
                    };
                }
            }
            "--no-cache" => {
                cfg.cache = false;
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

fn make_queries(map: &GridMap, count: usize, seed: u64) -> Vec<(u32, u32)> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut pick = |rng: &mut rand::rngs::StdRng| loop {
        let x = rng.gen_range(0..map.width);
        let y = rng.gen_range(0..map.height);
        if map.open(x, y) {
            return (y * map.width + x) as u32;
        }
    };
    (0..count)
        .map(|_| {
            let a = pick(&mut rng);
            let b = pick(&mut rng);
            (a, b)
        })
        .collect()
}

/// One full iteration: reset, then run every query cold.
fn run_iteration(solver: &mut Solver<GridMap>, queries: &[(u32, u32)]) -> (usize, usize) {
    solver.reset();
    let mut solved = 0;
    let mut hops = 0;
    for &(a, b) in queries {
        let path = solver.solve(a, b);
        if !path.is_empty() {
            solved += 1;
            hops += path.len() - 1;
        }
    }
    (solved, hops)
}

fn main() {
    let cfg = parse_args();
    let map = GridMap::generate(cfg.size, cfg.size, cfg.density, cfg.seed);
    let queries = make_queries(&map, cfg.queries, cfg.seed ^ 0x9E37_79B9_7F4A_7C15);

    let config = SolverConfig::default()
        .block_size(4096)
        .typical_adjacent(4)
        .route_cache(cfg.cache);
    let mut solver = Solver::with_config(map, config);

    for _ in 0..cfg.warmup {
        run_iteration(&mut solver, &queries);
    }

    let mut best = f64::INFINITY;
    let mut total = 0.0;
    let mut solved = 0;
    let mut hops = 0;
    for _ in 0..cfg.iters {
        let start = Instant::now();
        let (s, h) = run_iteration(&mut solver, &queries);
        let secs = start.elapsed().as_secs_f64();
        best = best.min(secs);
        total += secs;
        solved = s;
        hops = h;
    }
    let avg = total / cfg.iters as f64;

    if cfg.json {
        println!(
            "{{\"size\":{},\"density\":{},\"queries\":{},\"iters\":{},\"solved\":{},\"hops\":{},\"best_s\":{:.6},\"avg_s\":{:.6},\"queries_per_s\":{:.1}}}",
            cfg.size,
            cfg.density,
            cfg.queries,
            cfg.iters,
            solved,
            hops,
            best,
            avg,
            cfg.queries as f64 / avg
        );
    } else {
        println!(
            "bench_solve: {}x{} density {:.2}, {} queries, {} iters",
            cfg.size, cfg.size, cfg.density, cfg.queries, cfg.iters
        );
        println!("  solved {solved}, {hops} total hops");
        println!(
            "  best {:.3}s, avg {:.3}s ({:.0} queries/s)",
            best,
            avg,
            cfg.queries as f64 / avg
        );
    }
}
