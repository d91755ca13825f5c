use std::collections::{HashMap, HashSet, VecDeque};

use procgraph_core::{BinaryProcedure, Bfs, Dijkstra, FacetedBundle, Graph, Procedure, TopologicalSort};
use proptest::prelude::*;

const NODES: u8 = 12;

fn edges() -> impl Strategy<Value = Vec<(u8, u8)>> {
    proptest::collection::vec((0..NODES, 0..NODES), 0..40)
}

fn weighted_edges() -> impl Strategy<Value = Vec<(u8, u8, u32)>> {
    proptest::collection::vec((0..NODES, 0..NODES, 1u32..20), 0..40)
}

fn build(edges: &[(u8, u8)]) -> Graph<u8> {
    let mut g = Graph::new();
    for n in 0..NODES {
        g.add(n, []);
    }
    for &(a, b) in edges {
        g.add(a, [b]);
    }
    g
}

/// Hop distance by plain BFS over the graph's own adjacency.
fn hop_distance(g: &Graph<u8>, start: u8, end: u8) -> Option<usize> {
    let mut dist = HashMap::from([(start, 0usize)]);
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        let d = dist[&current];
        for &next in g.get(&current).unwrap().outbounds() {
            if !dist.contains_key(&next) {
                dist.insert(next, d + 1);
                queue.push_back(next);
            }
        }
    }
    dist.get(&end).copied()
}

/// Cheapest cost by Bellman-Ford relaxation.
fn cheapest(g: &Graph<u8, u32>, start: u8, end: u8) -> Option<u32> {
    let mut dist = HashMap::from([(start, 0u32)]);
    for _ in 0..g.len() {
        for node in g {
            let Some(&d) = dist.get(node.value()) else {
                continue;
            };
            for (&next, &w) in node.outbound_relations() {
                let candidate = d + w;
                if dist.get(&next).map_or(true, |&old| candidate < old) {
                    dist.insert(next, candidate);
                }
            }
        }
    }
    dist.get(&end).copied()
}

fn assert_path_follows_edges<E>(g: &Graph<u8, E>, path: &[u8]) {
    for pair in path.windows(2) {
        let node = g.get(&pair[0]).unwrap();
        assert!(node.edge(&pair[1]).is_some(), "no edge {} -> {}", pair[0], pair[1]);
    }
}

proptest! {
    #[test]
    fn test_bfs_path_is_shortest(edges in edges(), start in 0..NODES, end in 0..NODES) {
        let g = build(&edges);
        let path = Bfs::new(&g).execute(&start, &end);

        match hop_distance(&g, start, end) {
            None => prop_assert!(path.is_empty()),
            Some(hops) => {
                prop_assert_eq!(path.len(), hops + 1);
                prop_assert_eq!(path.first(), Some(&start));
                prop_assert_eq!(path.last(), Some(&end));
                assert_path_follows_edges(&g, &path);
            }
        }
    }

    #[test]
    fn test_dijkstra_unit_weights_match_bfs(edges in edges(), start in 0..NODES, end in 0..NODES) {
        let unweighted = build(&edges);
        let mut weighted: Graph<u8, u32> = Graph::new();
        for n in 0..NODES {
            weighted.add(n, []);
        }
        for &(a, b) in &edges {
            weighted.add_edge(a, b, 1);
        }

        let bfs = Bfs::new(&unweighted).execute(&start, &end);
        let dijkstra = Dijkstra::new(&weighted).execute(&start, &end);
        prop_assert_eq!(bfs.len(), dijkstra.len());
    }

    #[test]
    fn test_dijkstra_path_is_cheapest(edges in weighted_edges(), start in 0..NODES, end in 0..NODES) {
        let mut g: Graph<u8, u32> = Graph::new();
        for n in 0..NODES {
            g.add(n, []);
        }
        for &(a, b, w) in &edges {
            g.add_edge(a, b, w);
        }

        let path = Dijkstra::new(&g).execute(&start, &end);
        match cheapest(&g, start, end) {
            None => prop_assert!(path.is_empty()),
            Some(best) => {
                assert_path_follows_edges(&g, &path);
                let cost: u32 = path
                    .windows(2)
                    .map(|pair| *g.get(&pair[0]).unwrap().edge(&pair[1]).unwrap())
                    .sum();
                prop_assert_eq!(cost, best);
            }
        }
    }

    #[test]
    fn test_topological_order_on_dags(edges in edges()) {
        // Only low → high edges, so the graph is acyclic
        let dag: Vec<(u8, u8)> = edges.into_iter().filter(|(a, b)| a < b).collect();
        let g = build(&dag);
        let order = TopologicalSort::new(&g).execute().unwrap();

        prop_assert_eq!(order.len(), g.len());
        let position: HashMap<u8, usize> = order.iter().enumerate().map(|(i, &v)| (v, i)).collect();
        for (a, b) in dag {
            prop_assert!(position[&a] < position[&b]);
        }
    }

    #[test]
    fn test_back_edge_breaks_topological_sort(len in 2u8..NODES) {
        let mut g: Graph<u8> = Graph::new();
        for i in 0..len - 1 {
            g.add(i, [i + 1]);
        }
        g.add(len - 1, [0]);
        prop_assert!(TopologicalSort::new(&g).execute().is_err());
    }

    #[test]
    fn test_remove_leaves_no_dangling_edges(edges in edges(), removed in proptest::collection::vec(0..NODES, 0..6)) {
        let mut g = build(&edges);
        let gone: HashSet<u8> = removed.iter().copied().collect();
        prop_assert_eq!(g.remove(removed.iter()), gone.len());

        prop_assert_eq!(g.len(), NODES as usize - gone.len());
        let mut edge_total = 0;
        for node in &g {
            prop_assert!(!gone.contains(node.value()));
            for next in node.outbounds() {
                prop_assert!(!gone.contains(next));
                prop_assert!(g.get(next).unwrap().inbounds().any(|v| v == node.value()));
            }
            edge_total += node.out_degree();
        }
        prop_assert_eq!(g.edge_count(), edge_total);
    }

    #[test]
    fn test_sever_undirected_is_symmetric(edges in edges()) {
        let mut g: Graph<u8> = Graph::new();
        for &(a, b) in &edges {
            g.add_undirected(a, [b]);
        }
        for &(a, b) in &edges {
            let forward = g.get(&a).unwrap().edge(&b).is_some();
            let backward = g.get(&b).unwrap().edge(&a).is_some();
            prop_assert_eq!(forward, backward);
        }
        for &(a, b) in &edges {
            g.sever_undirected(&a, [b]);
        }
        prop_assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn test_facet_queries_match_model(
        puts in proptest::collection::vec((0u8..20, proptest::collection::vec(0u8..4, 0..4)), 0..40),
        removed in proptest::collection::vec(0u8..20, 0..10),
        query in proptest::collection::vec(0u8..4, 0..3),
    ) {
        let mut bundle: FacetedBundle<u8, u8, u8> = FacetedBundle::new();
        let mut model: HashMap<u8, HashSet<u8>> = HashMap::new();

        for (key, facets) in puts {
            bundle.put(key, key).add_facets(facets.iter().copied());
            model.insert(key, facets.into_iter().collect());
        }
        for key in removed {
            prop_assert_eq!(bundle.remove(&key), model.remove(&key).map(|_| key));
        }

        let mut found: Vec<u8> = bundle.with_facets(query.iter()).into_iter().copied().collect();
        found.sort_unstable();
        let mut expected: Vec<u8> = model
            .iter()
            .filter(|(_, facets)| query.iter().all(|f| facets.contains(f)))
            .map(|(&key, _)| key)
            .collect();
        expected.sort_unstable();

        prop_assert_eq!(found, expected);
        prop_assert_eq!(bundle.len(), model.len());
    }
}
