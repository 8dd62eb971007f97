//! Best-path solver over opaque, client-defined graphs.

pub mod graph;
pub mod solver;

pub use graph::{Cost, Edge, Graph, StateKey};
pub use solver::{CacheStats, Solver, SolverConfig};
