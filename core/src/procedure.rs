//! Reusable algorithm objects bound to a graph.
//!
//! A procedure is built once around a graph handle and executed on demand.
//! Each `execute` reads the graph as it is *at that moment*: working state
//! (frontier, visited set, predecessors) lives in locals of the call and is
//! dropped before it returns, so one procedure value can be executed any
//! number of times.

use std::cell::RefCell;
use std::rc::Rc;

use crate::graph::Graph;

/// A procedure that takes no arguments.
pub trait Procedure {
    type Output;

    /// Run against the current state of the bound data structure.
    fn execute(&self) -> Self::Output;
}

/// A procedure that takes two arguments, e.g. `(start, end)`.
pub trait BinaryProcedure<A, B> {
    type Output;

    fn execute(&self, a: A, b: B) -> Self::Output;
}

/// Graph shared between its owner and any number of bound procedures.
///
/// Lets the owner keep mutating the graph between executions. Not `Send`:
/// graphs and procedures are single-threaded.
pub type SharedGraph<T, E = ()> = Rc<RefCell<Graph<T, E>>>;

/// Handle through which a procedure reaches its graph.
pub trait GraphRef<T, E> {
    /// Lend the current graph to `f`.
    ///
    /// For a [`SharedGraph`] this takes a `RefCell` borrow for the duration of
    /// `f` and panics if the graph is mutably borrowed at the time.
    fn with_graph<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&Graph<T, E>) -> R;
}

impl<T, E> GraphRef<T, E> for &Graph<T, E> {
    fn with_graph<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&Graph<T, E>) -> R,
    {
        f(self)
    }
}

impl<T, E> GraphRef<T, E> for Rc<RefCell<Graph<T, E>>> {
    fn with_graph<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&Graph<T, E>) -> R,
    {
        f(&self.borrow())
    }
}

/// Wrap a graph for shared use by procedures.
pub fn share<T, E>(graph: Graph<T, E>) -> SharedGraph<T, E> {
    Rc::new(RefCell::new(graph))
}
