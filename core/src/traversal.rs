use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::hash::Hash;
use std::marker::PhantomData;
use std::ops::Add;

use crate::graph::{Graph, NodeIndex};
use crate::procedure::{BinaryProcedure, GraphRef};

/// Unweighted shortest path using breadth-first search.
///
/// `execute(start, end)` returns the values on a minimum-hop path from
/// `start` to `end`, both included, following outbound edges only. Empty if
/// either value is missing or `end` is unreachable.
///
/// When several paths share the minimum length, which one is returned
/// depends on adjacency iteration order and is unspecified.
///
/// Runtime O(V + E), space O(V).
pub struct Bfs<G, T, E = ()> {
    graph: G,
    _types: PhantomData<fn() -> (T, E)>,
}

impl<G, T, E> Bfs<G, T, E>
where
    G: GraphRef<T, E>,
{
    pub fn new(graph: G) -> Self {
        Self {
            graph,
            _types: PhantomData,
        }
    }
}

impl<'a, G, T, E> BinaryProcedure<&'a T, &'a T> for Bfs<G, T, E>
where
    G: GraphRef<T, E>,
    T: Eq + Hash + Clone + 'a,
{
    type Output = Vec<T>;

    fn execute(&self, start: &'a T, end: &'a T) -> Vec<T> {
        self.graph.with_graph(|graph| {
            let (Some(from), Some(to)) = (graph.node_index(start), graph.node_index(end)) else {
                return Vec::new();
            };

            // node → predecessor on the BFS tree. Start is its own predecessor.
            let mut previous: HashMap<NodeIndex, NodeIndex> = HashMap::new();
            let mut queue: VecDeque<NodeIndex> = VecDeque::new();

            previous.insert(from, from);
            queue.push_back(from);

            'search: while let Some(current) = queue.pop_front() {
                if current == to {
                    break;
                }
                for (next, _) in graph.outgoing_at(current) {
                    if previous.contains_key(&next) {
                        continue;
                    }
                    previous.insert(next, current);
                    if next == to {
                        break 'search;
                    }
                    queue.push_back(next);
                }
            }

            let path = backtrack(graph, &previous, from, to);
            tracing::trace!(
                visited = previous.len(),
                path_len = path.len(),
                "bfs shortest path"
            );
            path
        })
    }
}

/// Adds two edge weights with `+`.
fn add_weights<E>(a: &E, b: &E) -> E
where
    E: Clone + Add<Output = E>,
{
    a.clone() + b.clone()
}

/// Weighted shortest path using Dijkstra's algorithm.
///
/// Path costs are accumulated with the adder given at construction
/// ([`Dijkstra::new`] uses `+`). An edge leaving `start` costs its weight
/// alone. Weights must be non-negative under `E`'s ordering; this is not
/// checked and negative weights give unspecified paths.
///
/// Result semantics match [`Bfs`]. Runtime O(E log V), space O(V).
pub struct Dijkstra<G, T, E, F = fn(&E, &E) -> E> {
    graph: G,
    adder: F,
    _types: PhantomData<fn() -> (T, E)>,
}

impl<G, T, E> Dijkstra<G, T, E>
where
    G: GraphRef<T, E>,
    E: Clone + Add<Output = E>,
{
    pub fn new(graph: G) -> Self {
        Self {
            graph,
            adder: add_weights::<E>,
            _types: PhantomData,
        }
    }
}

impl<G, T, E, F> Dijkstra<G, T, E, F>
where
    G: GraphRef<T, E>,
    F: Fn(&E, &E) -> E,
{
    /// Dijkstra with a caller-supplied way of combining two weights.
    pub fn with_adder(graph: G, adder: F) -> Self {
        Self {
            graph,
            adder,
            _types: PhantomData,
        }
    }
}

impl<'a, G, T, E, F> BinaryProcedure<&'a T, &'a T> for Dijkstra<G, T, E, F>
where
    G: GraphRef<T, E>,
    T: Eq + Hash + Clone + 'a,
    E: Clone + PartialOrd,
    F: Fn(&E, &E) -> E,
{
    type Output = Vec<T>;

    fn execute(&self, start: &'a T, end: &'a T) -> Vec<T> {
        self.graph.with_graph(|graph| {
            let (Some(from), Some(to)) = (graph.node_index(start), graph.node_index(end)) else {
                return Vec::new();
            };

            let mut cost: HashMap<NodeIndex, E> = HashMap::new();
            let mut previous: HashMap<NodeIndex, NodeIndex> = HashMap::new();
            let mut queue: BinaryHeap<Candidate<E>> = BinaryHeap::new();
            let mut settled = 0usize;

            previous.insert(from, from);
            queue.push(Candidate {
                cost: None,
                node: from,
            });

            while let Some(Candidate { cost: queued, node }) = queue.pop() {
                if node == to {
                    break;
                }
                let current = cost.get(&node).cloned();
                // Superseded by a cheaper entry pushed later
                if let (Some(queued), Some(current)) = (&queued, &current) {
                    if queued > current {
                        continue;
                    }
                }
                settled += 1;

                for (next, weight) in graph.outgoing_at(node) {
                    if next == from {
                        continue;
                    }
                    let candidate = match &current {
                        Some(current) => (self.adder)(current, weight),
                        None => weight.clone(),
                    };
                    let improves = match cost.get(&next) {
                        Some(old) => candidate < *old,
                        None => true,
                    };
                    if improves {
                        cost.insert(next, candidate.clone());
                        previous.insert(next, node);
                        queue.push(Candidate {
                            cost: Some(candidate),
                            node: next,
                        });
                    }
                }
            }

            let path = backtrack(graph, &previous, from, to);
            tracing::trace!(settled, path_len = path.len(), "dijkstra shortest path");
            path
        })
    }
}

/// Priority-queue entry. Ordered so that `BinaryHeap` pops the lowest cost
/// first; an unknown cost (`None`) sorts after every known one.
struct Candidate<E> {
    cost: Option<E>,
    node: NodeIndex,
}

impl<E: PartialOrd> Ord for Candidate<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.cost, &other.cost) {
            (Some(a), Some(b)) => b.partial_cmp(a).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        }
    }
}

impl<E: PartialOrd> PartialOrd for Candidate<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E: PartialOrd> PartialEq for Candidate<E> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<E: PartialOrd> Eq for Candidate<E> {}

/// Walk predecessor links from `to` back to `from` and return the values in
/// `from → to` order. Empty if `to` was never reached.
fn backtrack<T, E>(
    graph: &Graph<T, E>,
    previous: &HashMap<NodeIndex, NodeIndex>,
    from: NodeIndex,
    to: NodeIndex,
) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let mut path = Vec::new();
    let mut current = to;

    loop {
        let Some(&parent) = previous.get(&current) else {
            return Vec::new();
        };
        if let Some(value) = graph.value_at(current) {
            path.push(value.clone());
        }
        if current == from {
            break;
        }
        current = parent;
    }

    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procedure::{share, Procedure};
    use crate::topological::TopologicalSort;

    fn make_chain(n: u64) -> Graph<u64> {
        let mut g = Graph::new();
        for i in 0..n - 1 {
            g.add(i, [i + 1]);
        }
        g
    }

    fn make_star(center: u64, leaves: u64) -> Graph<u64> {
        let mut g = Graph::new();
        g.add(center, 1..=leaves);
        g
    }

    fn make_cycle(n: u64) -> Graph<u64> {
        let mut g = Graph::new();
        for i in 0..n {
            g.add(i, [(i + 1) % n]);
        }
        g
    }

    fn weighted(edges: &[(&'static str, &'static str, u32)]) -> Graph<&'static str, u32> {
        let mut g = Graph::new();
        for &(from, to, w) in edges {
            g.add_edge(from, to, w);
        }
        g
    }

    // --- BFS tests ---

    #[test]
    fn test_bfs_chain() {
        let g = make_chain(6);
        let path = Bfs::new(&g).execute(&0, &5);
        assert_eq!(path, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_bfs_follows_direction() {
        let g = make_chain(4);
        assert!(Bfs::new(&g).execute(&3, &0).is_empty());
    }

    #[test]
    fn test_bfs_star() {
        let g = make_star(0, 100);
        let bfs = Bfs::new(&g);
        for leaf in 1..=100 {
            assert_eq!(bfs.execute(&0, &leaf), vec![0, leaf]);
        }
        assert!(bfs.execute(&1, &2).is_empty());
    }

    #[test]
    fn test_bfs_cycle_no_infinite_loop() {
        let g = make_cycle(5);
        assert_eq!(Bfs::new(&g).execute(&3, &1), vec![3, 4, 0, 1]);
    }

    #[test]
    fn test_bfs_shortcut_preferred() {
        let mut g = make_chain(6);
        g.add(1, [4]);
        assert_eq!(Bfs::new(&g).execute(&0, &5), vec![0, 1, 4, 5]);
    }

    #[test]
    fn test_bfs_self() {
        let g = make_cycle(3);
        assert_eq!(Bfs::new(&g).execute(&1, &1), vec![1]);
    }

    #[test]
    fn test_bfs_self_loop() {
        let mut g: Graph<u64> = Graph::new();
        g.add(0, [0, 1]);
        assert_eq!(Bfs::new(&g).execute(&0, &1), vec![0, 1]);
    }

    #[test]
    fn test_bfs_no_path() {
        let mut g: Graph<u64> = Graph::new();
        g.add(0, []).add(1, []);
        assert!(Bfs::new(&g).execute(&0, &1).is_empty());
    }

    #[test]
    fn test_bfs_start_not_in_graph() {
        let g = make_chain(3);
        assert!(Bfs::new(&g).execute(&999, &0).is_empty());
    }

    #[test]
    fn test_bfs_target_not_in_graph() {
        let g = make_chain(3);
        assert!(Bfs::new(&g).execute(&0, &999).is_empty());
    }

    #[test]
    fn test_bfs_undirected() {
        let mut g: Graph<&str> = Graph::new();
        g.add_undirected("a", ["b"]).add_undirected("b", ["c"]);
        assert_eq!(Bfs::new(&g).execute(&"c", &"a"), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_bfs_sees_graph_mutations() {
        let shared = share(make_chain(3));
        let bfs = Bfs::new(shared.clone());

        assert_eq!(bfs.execute(&0, &2), vec![0, 1, 2]);

        shared.borrow_mut().add(0, [2]);
        assert_eq!(bfs.execute(&0, &2), vec![0, 2]);

        shared.borrow_mut().remove([2u64]);
        assert!(bfs.execute(&0, &2).is_empty());
    }

    #[test]
    fn test_procedures_after_slot_recycling() {
        let shared = share(make_chain(4));
        let bfs = Bfs::new(shared.clone());
        let sort = TopologicalSort::new(shared.clone());

        shared.borrow_mut().remove([1u64]);
        shared.borrow_mut().add(0, [10]).add(10, [2]);

        assert_eq!(bfs.execute(&0, &3), vec![0, 10, 2, 3]);
        assert_eq!(sort.execute(), Ok(vec![0, 10, 2, 3]));
    }

    #[test]
    fn test_bfs_on_weighted_graph_ignores_weights() {
        let g = weighted(&[("a", "b", 1), ("b", "c", 1), ("a", "c", 50)]);
        assert_eq!(Bfs::new(&g).execute(&"a", &"c"), vec!["a", "c"]);
    }

    // --- Dijkstra tests ---

    #[test]
    fn test_dijkstra_prefers_cheaper_longer_path() {
        let g = weighted(&[("A", "B", 1), ("B", "C", 1), ("A", "C", 5)]);
        assert_eq!(Dijkstra::new(&g).execute(&"A", &"C"), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_dijkstra_relaxes_after_first_discovery() {
        let g = weighted(&[
            ("a", "b", 10),
            ("a", "c", 1),
            ("c", "d", 1),
            ("d", "b", 1),
            ("b", "e", 1),
        ]);
        assert_eq!(
            Dijkstra::new(&g).execute(&"a", &"e"),
            vec!["a", "c", "d", "b", "e"]
        );
    }

    #[test]
    fn test_dijkstra_cycle_back_to_start() {
        let g = weighted(&[("a", "b", 1), ("b", "a", 1), ("b", "c", 2)]);
        let dijkstra = Dijkstra::new(&g);
        assert_eq!(dijkstra.execute(&"a", &"c"), vec!["a", "b", "c"]);
        assert_eq!(dijkstra.execute(&"a", &"a"), vec!["a"]);
    }

    #[test]
    fn test_dijkstra_zero_weight_cycle_through_start() {
        let g = weighted(&[("a", "b", 0), ("b", "a", 0), ("b", "c", 3), ("a", "c", 5)]);
        let dijkstra = Dijkstra::new(&g);
        assert_eq!(dijkstra.execute(&"a", &"c"), vec!["a", "b", "c"]);
        assert_eq!(dijkstra.execute(&"b", &"c"), vec!["b", "c"]);
    }

    #[test]
    fn test_dijkstra_zero_weights() {
        let g = weighted(&[("a", "b", 0), ("b", "c", 0), ("a", "c", 1)]);
        assert_eq!(Dijkstra::new(&g).execute(&"a", &"c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_dijkstra_float_weights() {
        let mut g: Graph<u8, f64> = Graph::new();
        g.add_edge(0, 1, 0.5).add_edge(1, 2, 0.25).add_edge(0, 2, 0.8);
        assert_eq!(Dijkstra::new(&g).execute(&0, &2), vec![0, 1, 2]);
    }

    #[test]
    fn test_dijkstra_custom_adder() {
        // Bottleneck cost: a path costs as much as its heaviest edge
        let g = weighted(&[("a", "b", 3), ("b", "d", 3), ("a", "c", 1), ("c", "d", 4)]);
        let bottleneck = Dijkstra::with_adder(&g, |a: &u32, b: &u32| *a.max(b));
        assert_eq!(bottleneck.execute(&"a", &"d"), vec!["a", "b", "d"]);

        let sum = Dijkstra::new(&g);
        let path = sum.execute(&"a", &"d");
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn test_dijkstra_unreachable() {
        let g = weighted(&[("a", "b", 1), ("c", "d", 1)]);
        assert!(Dijkstra::new(&g).execute(&"a", &"d").is_empty());
    }

    #[test]
    fn test_dijkstra_missing_nodes() {
        let g = weighted(&[("a", "b", 1)]);
        let dijkstra = Dijkstra::new(&g);
        assert!(dijkstra.execute(&"zzz", &"b").is_empty());
        assert!(dijkstra.execute(&"a", &"zzz").is_empty());
    }

    #[test]
    fn test_dijkstra_equal_weights_match_bfs_length() {
        let mut g: Graph<u64, u32> = Graph::new();
        for i in 0..20u64 {
            g.add_edge(i, i + 1, 1);
            if i % 3 == 0 {
                g.add_edge(i, i + 3, 1);
            }
        }
        let bfs = Bfs::new(&g);
        let dijkstra = Dijkstra::new(&g);
        for target in 1..=20 {
            assert_eq!(
                bfs.execute(&0, &target).len(),
                dijkstra.execute(&0, &target).len(),
                "path length mismatch for target {}",
                target
            );
        }
    }

    #[test]
    fn test_dijkstra_sees_graph_mutations() {
        let shared = share(weighted(&[("a", "b", 1), ("b", "c", 1), ("a", "c", 5)]));
        let dijkstra = Dijkstra::new(shared.clone());
        assert_eq!(dijkstra.execute(&"a", &"c"), vec!["a", "b", "c"]);

        shared.borrow_mut().add_edge("a", "c", 1);
        assert_eq!(dijkstra.execute(&"a", &"c"), vec!["a", "c"]);
    }

    #[test]
    fn test_candidate_ordering() {
        let mut heap = BinaryHeap::new();
        heap.push(Candidate { cost: Some(5u32), node: NodeIndex(0) });
        heap.push(Candidate { cost: None, node: NodeIndex(1) });
        heap.push(Candidate { cost: Some(1u32), node: NodeIndex(2) });

        assert_eq!(heap.pop().map(|c| c.node), Some(NodeIndex(2)));
        assert_eq!(heap.pop().map(|c| c.node), Some(NodeIndex(0)));
        assert_eq!(heap.pop().map(|c| c.node), Some(NodeIndex(1)));
    }
}
