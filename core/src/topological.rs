use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::graph::NodeIndex;
use crate::procedure::{GraphRef, Procedure};

/// DFS visit state. Nodes absent from the mark map are still unseen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// On the current DFS stack. Reaching it again means a back edge.
    InProgress,
    /// Whole subtree emitted.
    Done,
}

/// Topological sort by depth-first search.
///
/// `execute()` orders every node of the graph so that for each edge
/// `u → v`, `u` comes before `v` (reverse DFS postorder). Fails with
/// [`Error::NotAcyclic`] if the graph has a cycle, self-loops included.
///
/// The DFS keeps an explicit stack, so long chains do not grow the call
/// stack. Runtime O(V + E), space O(V).
pub struct TopologicalSort<G, T, E = ()> {
    graph: G,
    _types: PhantomData<fn() -> (T, E)>,
}

impl<G, T, E> TopologicalSort<G, T, E>
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

impl<G, T, E> Procedure for TopologicalSort<G, T, E>
where
    G: GraphRef<T, E>,
    T: Eq + Hash + Clone,
{
    type Output = Result<Vec<T>>;

    fn execute(&self) -> Result<Vec<T>> {
        self.graph.with_graph(|graph| {
            let total = graph.len();
            let children = |idx: NodeIndex| graph.outgoing_at(idx).map(|(to, _)| to);

            let mut marks: HashMap<NodeIndex, Mark> = HashMap::with_capacity(total);
            // Postorder; reversed once every node is emitted
            let mut sorted: Vec<T> = Vec::with_capacity(total);
            let mut stack = Vec::new();

            for root in graph.node_indices() {
                if marks.contains_key(&root) {
                    continue;
                }
                marks.insert(root, Mark::InProgress);
                stack.push((root, children(root)));

                loop {
                    let Some((node, pending)) = stack.last_mut() else {
                        break;
                    };
                    let node = *node;

                    match pending.next() {
                        Some(next) => match marks.get(&next) {
                            Some(Mark::Done) => {}
                            Some(Mark::InProgress) => {
                                tracing::debug!(
                                    sorted = sorted.len(),
                                    total,
                                    "cycle found during topological sort"
                                );
                                return Err(Error::NotAcyclic {
                                    sorted: sorted.len(),
                                    total,
                                });
                            }
                            None => {
                                marks.insert(next, Mark::InProgress);
                                stack.push((next, children(next)));
                            }
                        },
                        None => {
                            stack.pop();
                            marks.insert(node, Mark::Done);
                            if let Some(value) = graph.value_at(node) {
                                sorted.push(value.clone());
                            }
                        }
                    }
                }
            }

            sorted.reverse();
            tracing::trace!(total, "topological sort");
            Ok(sorted)
        })
    }
}
