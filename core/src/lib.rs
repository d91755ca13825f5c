//! procgraph-core: in-memory graph, procedures and weighted data structures
//! for procedural generation.
//!
//! A pure Rust library with three building blocks:
//!
//! - [`Graph`]: an arena-backed directed graph keyed by node value, with
//!   optional edge weights and undirected (paired) edges.
//! - Procedures ([`Bfs`], [`Dijkstra`], [`TopologicalSort`]): algorithm
//!   objects bound to a graph once and executed any number of times against
//!   its current state.
//! - [`WeightedDistribution`] and [`FacetedBundle`]: weighted random choice
//!   and tag-intersection lookup over keyed elements.

mod distribution;
mod error;
mod facet;
mod graph;
mod procedure;
mod topological;
mod traversal;

pub use distribution::{RngSource, UniformSource, WeightedDistribution};
pub use error::{Error, Result};
pub use facet::{Entry, EntryMut, FacetedBundle};
pub use graph::{Graph, NodeIndex, NodeRef, Nodes};
pub use procedure::{share, BinaryProcedure, GraphRef, Procedure, SharedGraph};
pub use topological::TopologicalSort;
pub use traversal::{Bfs, Dijkstra};
