/// Failures surfaced by the structures in this crate.
///
/// Lookups that find nothing (a missing node, an unreachable target) are not
/// errors: they produce empty results. Only violated preconditions end up here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Topological sort reached a node that was still on the DFS stack.
    #[error("graph is not a directed acyclic graph ({sorted} of {total} nodes sorted before a cycle was found)")]
    NotAcyclic { sorted: usize, total: usize },

    /// A draw was attempted before any positive weight was added.
    #[error("distribution is empty")]
    EmptyDistribution,

    /// The summed weight of a distribution no longer fits in a `u64`.
    #[error("distribution weight overflow: {total} + {weight} exceeds u64")]
    WeightOverflow { total: u64, weight: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;
