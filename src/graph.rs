//! The client-side contract: opaque state handles, edge costs, and the
//! two-operation graph interface the solver calls back into.
//!
//! The solver never interprets a state. It compares states for equality,
//! orders them for hash-bucket disambiguation, and hashes them for
//! indexing, nothing else. Any `Copy + Eq + Ord + Hash` type works:
//! cell indices, packed coordinates, interned ids.

use std::hash::Hash;

/// Edge and path costs. `Cost::INFINITY` marks an untraversable edge and
/// doubles as the "no route" sentinel in the route cache.
pub type Cost = f32;

/// Bound alias for state handles. Blanket-implemented; clients never
/// implement it by hand.
pub trait StateKey: Copy + Eq + Ord + Hash {}

impl<T: Copy + Eq + Ord + Hash> StateKey for T {}

/// A neighbor handed back by [`Graph::expand`], and the per-state result
/// element of [`crate::Solver::solve_within_budget`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge<S> {
    pub state: S,
    /// Exact traversal cost, in `[0, +inf)`. `Cost::INFINITY` means the
    /// edge exists topologically but cannot be taken.
    pub cost: Cost,
}

/// The graph being searched, defined entirely by the client.
///
/// Both operations must be pure for the duration of one search: the solver
/// may call them zero, one, or many times per state and assumes identical
/// answers each time. Neighbor lists are memoized, so a graph change is
/// only picked up after [`crate::Solver::reset`].
pub trait Graph {
    type State: StateKey;

    /// Lower bound on the true cost between two states. Must never
    /// overestimate (admissible); consistency is additionally required for
    /// the cost-optimality guarantee to hold unconditionally.
    fn estimate(&self, from: Self::State, to: Self::State) -> Cost;

    /// Append every neighbor of `state` to `out`. `out` arrives cleared.
    /// Untraversable edges may be reported with `Cost::INFINITY`; the
    /// solver filters them before relaxation.
    fn expand(&self, state: Self::State, out: &mut Vec<Edge<Self::State>>);
}

/// A shared reference to a graph is itself a graph, so several solver
/// instances can search one read-only graph, e.g. one instance per worker
/// thread. The instances stay fully independent.
impl<G: Graph> Graph for &G {
    type State = G::State;

    #[inline]
    fn estimate(&self, from: Self::State, to: Self::State) -> Cost {
        (**self).estimate(from, to)
    }

    #[inline]
    fn expand(&self, state: Self::State, out: &mut Vec<Edge<Self::State>>) {
        (**self).expand(state, out)
    }
}
