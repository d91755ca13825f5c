use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::iter::Enumerate;
use std::slice;

use crate::error::Result;
use crate::procedure::Procedure;
use crate::topological::TopologicalSort;

/// Arena slot of a node.
///
/// Stable for the lifetime of the node. Once the node is removed the slot is
/// recycled by the next node the graph creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub(crate) usize);

impl NodeIndex {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A vertex: its value plus both directions of adjacency.
///
/// `outgoing` carries the edge weight; `incoming` mirrors it so that a node
/// can be unlinked from everything pointing at it without a full scan.
#[derive(Debug, Clone)]
struct Node<T, E> {
    value: T,
    outgoing: HashMap<NodeIndex, E>,
    incoming: HashSet<NodeIndex>,
}

impl<T, E> Node<T, E> {
    fn new(value: T) -> Self {
        Self {
            value,
            outgoing: HashMap::new(),
            incoming: HashSet::new(),
        }
    }
}

/// In-memory value graph: node arena + value index.
///
/// Every value maps to exactly one node. Edges are stored on both ends:
/// `a.outgoing` contains `b` iff `b.incoming` contains `a`. Undirected edges
/// are simply a pair of directed edges. `E` is the edge weight; unweighted
/// graphs use the default `()`.
#[derive(Debug, Clone)]
pub struct Graph<T, E = ()> {
    slots: Vec<Option<Node<T, E>>>,
    free: Vec<NodeIndex>,
    index: HashMap<T, NodeIndex>,
}

impl<T, E> Graph<T, E>
where
    T: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Pre-allocate for a known node count.
    pub fn with_capacity(node_count: usize) -> Self {
        Self {
            slots: Vec::with_capacity(node_count),
            free: Vec::new(),
            index: HashMap::with_capacity(node_count),
        }
    }

    /// Whether a node exists for `value`.
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(value)
    }

    /// Look up the node for `value` without creating it.
    pub fn get<Q>(&self, value: &Q) -> Option<NodeRef<'_, T, E>>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.node_index(value).and_then(|idx| self.node_ref(idx))
    }

    /// Arena slot currently holding `value`.
    pub fn node_index<Q>(&self, value: &Q) -> Option<NodeIndex>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get(value).copied()
    }

    /// Ensure `value` and every outbound value have nodes, then connect
    /// `value → outbound` for each. Existing edges keep their weight.
    pub fn add<I>(&mut self, value: T, outbounds: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        E: Default,
    {
        let from = self.ensure(value);
        for outbound in outbounds {
            let to = self.ensure(outbound);
            self.link(from, to, |outgoing| {
                outgoing.entry(to).or_default();
            });
        }
        self
    }

    /// Add a single weighted edge `value → outbound`, replacing the weight of
    /// an existing edge.
    pub fn add_edge(&mut self, value: T, outbound: T, weight: E) -> &mut Self {
        let from = self.ensure(value);
        let to = self.ensure(outbound);
        self.link(from, to, |outgoing| {
            outgoing.insert(to, weight);
        });
        self
    }

    /// Like [`Graph::add`], but each edge is installed in both directions.
    pub fn add_undirected<I>(&mut self, value: T, connected: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        E: Default,
    {
        let a = self.ensure(value);
        for other in connected {
            let b = self.ensure(other);
            self.link(a, b, |outgoing| {
                outgoing.entry(b).or_default();
            });
            self.link(b, a, |outgoing| {
                outgoing.entry(a).or_default();
            });
        }
        self
    }

    /// Weighted undirected edge: `a → b` and `b → a`, both carrying `weight`.
    pub fn add_undirected_edge(&mut self, a: T, b: T, weight: E) -> &mut Self
    where
        E: Clone,
    {
        let ia = self.ensure(a);
        let ib = self.ensure(b);
        let reverse = weight.clone();
        self.link(ia, ib, |outgoing| {
            outgoing.insert(ib, weight);
        });
        self.link(ib, ia, |outgoing| {
            outgoing.insert(ia, reverse);
        });
        self
    }

    /// Delete the nodes for `values`, severing every edge touching them first.
    ///
    /// Values without a node are ignored. Returns the number of nodes removed.
    pub fn remove<I, Q>(&mut self, values: I) -> usize
    where
        I: IntoIterator<Item = Q>,
        Q: Borrow<T>,
    {
        let mut removed = 0;
        for value in values {
            let value: &T = value.borrow();
            let Some(idx) = self.index.remove(value) else {
                continue;
            };
            let Some(node) = self.slots.get_mut(idx.0).and_then(Option::take) else {
                continue;
            };
            for target in node.outgoing.keys() {
                if let Some(other) = self.slot_mut(*target) {
                    other.incoming.remove(&idx);
                }
            }
            for source in &node.incoming {
                if let Some(other) = self.slot_mut(*source) {
                    other.outgoing.remove(&idx);
                }
            }
            self.free.push(idx);
            removed += 1;
        }
        if removed > 0 {
            tracing::trace!(removed, remaining = self.len(), "removed graph nodes");
        }
        removed
    }

    /// Remove the edges `value → outbound`. Nodes are kept even when left
    /// disconnected; missing values are ignored.
    pub fn sever<I, Q>(&mut self, value: &T, outbounds: I) -> &mut Self
    where
        I: IntoIterator<Item = Q>,
        Q: Borrow<T>,
    {
        let Some(from) = self.node_index(value) else {
            return self;
        };
        for outbound in outbounds {
            let outbound: &T = outbound.borrow();
            if let Some(to) = self.node_index(outbound) {
                self.unlink(from, to);
            }
        }
        self
    }

    /// Remove the edges between `value` and each connected value, in both
    /// directions.
    pub fn sever_undirected<I, Q>(&mut self, value: &T, connected: I) -> &mut Self
    where
        I: IntoIterator<Item = Q>,
        Q: Borrow<T>,
    {
        let Some(a) = self.node_index(value) else {
            return self;
        };
        for other in connected {
            let other: &T = other.borrow();
            if let Some(b) = self.node_index(other) {
                self.unlink(a, b);
                self.unlink(b, a);
            }
        }
        self
    }

    /// Topologically sorted values of this graph.
    ///
    /// Shorthand for running a [`TopologicalSort`] bound to `self`.
    pub fn sort_topological(&self) -> Result<Vec<T>> {
        TopologicalSort::new(self).execute()
    }

    /// All nodes, in arena order.
    pub fn nodes(&self) -> Nodes<'_, T, E> {
        Nodes {
            graph: self,
            slots: self.slots.iter().enumerate(),
        }
    }

    /// Values of all nodes, in arena order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().flatten().map(|node| &node.value)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of directed edges. An undirected edge counts twice.
    pub fn edge_count(&self) -> usize {
        self.slots.iter().flatten().map(|node| node.outgoing.len()).sum()
    }

    /// Approximate memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        use std::mem::size_of;

        let slots_mem = self.slots.capacity() * size_of::<Option<Node<T, E>>>();
        let out_edges = self.edge_count() * (size_of::<NodeIndex>() + size_of::<E>() + 8);
        let in_edges = self.edge_count() * (size_of::<NodeIndex>() + 8);
        let index_mem = self.index.len() * (size_of::<T>() + size_of::<NodeIndex>() + 8);

        slots_mem + out_edges + in_edges + index_mem
    }

    // --- internal access for procedures ---

    pub(crate) fn value_at(&self, idx: NodeIndex) -> Option<&T> {
        self.slot(idx).map(|node| &node.value)
    }

    pub(crate) fn outgoing_at(&self, idx: NodeIndex) -> impl Iterator<Item = (NodeIndex, &E)> {
        self.slot(idx)
            .into_iter()
            .flat_map(|node| node.outgoing.iter().map(|(&to, weight)| (to, weight)))
    }

    pub(crate) fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| NodeIndex(i))
    }

    fn node_ref(&self, idx: NodeIndex) -> Option<NodeRef<'_, T, E>> {
        self.slot(idx).map(|node| NodeRef {
            graph: self,
            idx,
            node,
        })
    }

    fn slot_mut(&mut self, idx: NodeIndex) -> Option<&mut Node<T, E>> {
        self.slots.get_mut(idx.0).and_then(Option::as_mut)
    }

    fn ensure(&mut self, value: T) -> NodeIndex {
        if let Some(&idx) = self.index.get(&value) {
            return idx;
        }
        let node = Some(Node::new(value.clone()));
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx.0] = node;
                idx
            }
            None => {
                self.slots.push(node);
                NodeIndex(self.slots.len() - 1)
            }
        };
        self.index.insert(value, idx);
        idx
    }

    /// Apply `write` to `from`'s outgoing map and record the back-reference on `to`.
    fn link<F>(&mut self, from: NodeIndex, to: NodeIndex, write: F)
    where
        F: FnOnce(&mut HashMap<NodeIndex, E>),
    {
        if let Some(node) = self.slot_mut(from) {
            write(&mut node.outgoing);
        }
        if let Some(node) = self.slot_mut(to) {
            node.incoming.insert(from);
        }
    }

    fn unlink(&mut self, from: NodeIndex, to: NodeIndex) {
        if let Some(node) = self.slot_mut(from) {
            node.outgoing.remove(&to);
        }
        if let Some(node) = self.slot_mut(to) {
            node.incoming.remove(&from);
        }
    }
}

// Slot access shared with `NodeRef`, which carries no bounds on `T`.
impl<T, E> Graph<T, E> {
    fn slot(&self, idx: NodeIndex) -> Option<&Node<T, E>> {
        self.slots.get(idx.0).and_then(Option::as_ref)
    }
}

impl<T, E> Default for Graph<T, E>
where
    T: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<'g, T, E> IntoIterator for &'g Graph<T, E>
where
    T: Eq + Hash + Clone,
{
    type Item = NodeRef<'g, T, E>;
    type IntoIter = Nodes<'g, T, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes()
    }
}

/// Iterator over the nodes of a [`Graph`].
pub struct Nodes<'g, T, E> {
    graph: &'g Graph<T, E>,
    slots: Enumerate<slice::Iter<'g, Option<Node<T, E>>>>,
}

impl<'g, T, E> Iterator for Nodes<'g, T, E> {
    type Item = NodeRef<'g, T, E>;

    fn next(&mut self) -> Option<Self::Item> {
        let graph = self.graph;
        self.slots.find_map(|(i, slot)| {
            slot.as_ref().map(|node| NodeRef {
                graph,
                idx: NodeIndex(i),
                node,
            })
        })
    }
}

/// Read-only view of a single node.
pub struct NodeRef<'g, T, E> {
    graph: &'g Graph<T, E>,
    idx: NodeIndex,
    node: &'g Node<T, E>,
}

impl<'g, T, E> NodeRef<'g, T, E> {
    pub fn value(&self) -> &'g T {
        &self.node.value
    }

    pub fn index(&self) -> NodeIndex {
        self.idx
    }

    pub fn out_degree(&self) -> usize {
        self.node.outgoing.len()
    }

    pub fn in_degree(&self) -> usize {
        self.node.incoming.len()
    }

    /// Whether at least one edge leaves or enters this node.
    pub fn is_connected(&self) -> bool {
        self.out_degree() > 0 || self.in_degree() > 0
    }

    /// Values this node has an edge to.
    pub fn outbounds(&self) -> impl Iterator<Item = &'g T> + 'g {
        let graph = self.graph;
        self.node
            .outgoing
            .keys()
            .filter_map(move |&idx| graph.slot(idx).map(|node| &node.value))
    }

    /// Values with an edge to this node.
    pub fn inbounds(&self) -> impl Iterator<Item = &'g T> + 'g {
        let graph = self.graph;
        self.node
            .incoming
            .iter()
            .filter_map(move |&idx| graph.slot(idx).map(|node| &node.value))
    }

    /// Outbound values paired with the weight of the edge leading to them.
    pub fn outbound_relations(&self) -> impl Iterator<Item = (&'g T, &'g E)> + 'g {
        let graph = self.graph;
        self.node
            .outgoing
            .iter()
            .filter_map(move |(&idx, weight)| graph.slot(idx).map(|node| (&node.value, weight)))
    }

    /// Weight of the edge from this node to `target`, if there is one.
    pub fn edge<Q>(&self, target: &Q) -> Option<&'g E>
    where
        T: Eq + Hash + Clone + Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let to = self.graph.node_index(target)?;
        self.node.outgoing.get(&to)
    }
}

impl<T: std::fmt::Debug, E> std::fmt::Debug for NodeRef<'_, T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("value", &self.node.value)
            .field("out_degree", &self.node.outgoing.len())
            .field("in_degree", &self.node.incoming.len())
            .finish()
    }
}
