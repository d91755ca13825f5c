mod config;

use std::collections::VecDeque;
use std::process::ExitCode;
use std::time::Instant;

use procgraph_core::{
    share, BinaryProcedure, Bfs, Dijkstra, FacetedBundle, Graph, Procedure, RngSource,
    SharedGraph, TopologicalSort, WeightedDistribution,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

use config::{Mode, Settings, Topology, ALL_SETTINGS};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("procgraph-bench: {}", e);
            return ExitCode::from(2);
        }
    };

    if settings.mode == Mode::Help {
        print_help();
        return ExitCode::SUCCESS;
    }

    if !settings.json {
        println!("procgraph-bench");
        println!("===============");
        println!("{}", settings);
        println!();
    }
    tracing::info!(mode = ?settings.mode, %settings, "starting benchmark");

    let weights = match edge_weights() {
        Ok(weights) => weights,
        Err(e) => {
            eprintln!("procgraph-bench: bad edge weight table: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut reports = Vec::new();
    match settings.mode {
        Mode::All => {
            for topology in Topology::ALL {
                reports.push(run_graph_benchmark(topology, &settings, &weights));
            }
            reports.push(run_bundle_benchmark(&settings, &weights));
        }
        Mode::Graph(topology) => reports.push(run_graph_benchmark(topology, &settings, &weights)),
        Mode::Facets => reports.push(run_bundle_benchmark(&settings, &weights)),
        Mode::Help => {}
    }

    if settings.json {
        let report = json!({
            "node_count": settings.node_count,
            "seed": settings.seed,
            "queries": settings.queries,
            "runs": reports,
        });
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("procgraph-bench: cannot serialize report: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}

fn print_help() {
    println!("Usage: procgraph-bench [mode] [node_count] [--json]");
    println!();
    println!("Modes:");
    println!("  all         Run every generator, then the facet bundle (default)");
    println!("  lsystem     Fractal branching tree (deep paths, acyclic)");
    println!("  scalefree   Preferential attachment via edge sampling (hub-and-spoke)");
    println!("  smallworld  Watts-Strogatz ring lattice + shortcuts");
    println!("  random      Erdos-Renyi uniform random edges");
    println!("  barbell     Two dense cliques connected by a thin bridge");
    println!("  dla         Diffusion-limited aggregation (organic branching)");
    println!("  facets      Faceted bundle queries and weighted draws");
    println!();
    println!("Settings (environment, overridden by arguments):");
    for setting in ALL_SETTINGS {
        println!(
            "  {:<28} {} (default {}, range {}..={})",
            setting.env, setting.description, setting.default, setting.min, setting.max
        );
    }
    println!();
    println!("Log output goes to stderr and is filtered by RUST_LOG.");
}

fn millis(t: Instant) -> f64 {
    t.elapsed().as_secs_f64() * 1000.0
}

fn run_graph_benchmark(
    topology: Topology,
    settings: &Settings,
    weights: &WeightedDistribution<u32>,
) -> Value {
    let quiet = settings.json;
    let name = topology.label();

    let t = Instant::now();
    let graph = generate(topology, settings.node_count, settings.seed, weights);
    let gen_ms = millis(t);
    let nodes = graph.len();
    let edges = graph.edge_count();
    let memory = graph.memory_usage();
    tracing::info!(topology = name, nodes, edges, gen_ms, "generated graph");
    if !quiet {
        println!("--- {} ---", name);
        println!(
            "Generated in {:.2}s: {} nodes, {} edges, ~{:.0}MB",
            gen_ms / 1000.0,
            nodes,
            edges,
            memory as f64 / 1_048_576.0
        );
    }

    let far = graph.values().copied().max().unwrap_or(0);
    let shared = share(graph);
    let bfs = Bfs::new(shared.clone());
    let dijkstra = Dijkstra::new(shared.clone());
    let topological = TopologicalSort::new(shared.clone());

    // Same random pairs for both procedures
    let mut rng = StdRng::seed_from_u64(settings.seed ^ 0x9e37_79b9);
    let pairs: Vec<(u64, u64)> = (0..settings.queries)
        .map(|_| (rng.gen_range(0..=far), rng.gen_range(0..=far)))
        .collect();

    let bfs_stats = time_queries(&pairs, |a, b| bfs.execute(a, b).len());
    let dijkstra_stats = time_queries(&pairs, |a, b| dijkstra.execute(a, b).len());

    let t = Instant::now();
    let far_path = bfs.execute(&0, &far);
    let far_ms = millis(t);

    let t = Instant::now();
    let sorted = topological.execute();
    let topo_ms = millis(t);
    let topo_report = match &sorted {
        Ok(order) => json!({ "acyclic": true, "ordered": order.len(), "ms": topo_ms }),
        Err(e) => json!({ "acyclic": false, "error": e.to_string(), "ms": topo_ms }),
    };

    let mutation = remove_and_requery(&shared, &bfs, far, &mut rng);

    if !quiet {
        println!();
        println!("{:>10} {:>10} {:>10} {:>10}", "procedure", "queries", "reached", "avg");
        println!("{:->10} {:->10} {:->10} {:->10}", "", "", "", "");
        for (label, stats) in [("bfs", &bfs_stats), ("dijkstra", &dijkstra_stats)] {
            println!(
                "{:>10} {:>10} {:>10} {:>8.3}ms",
                label, stats.queries, stats.reached, stats.avg_ms
            );
        }
        println!();
        match far_path.len() {
            0 => println!("Shortest path 0 → {}: no path ({:.1}ms)", far, far_ms),
            len => println!(
                "Shortest path 0 → {}: {} hops in {:.1}ms",
                far,
                len - 1,
                far_ms
            ),
        }
        match &sorted {
            Ok(order) => println!("Topological sort: {} nodes in {:.1}ms", order.len(), topo_ms),
            Err(e) => println!("Topological sort: {} ({:.1}ms)", e, topo_ms),
        }
        println!(
            "Removed {} nodes in {:.1}ms; path 0 → {} now {} nodes long",
            mutation.removed, mutation.remove_ms, far, mutation.path_len
        );
        println!();
    }

    json!({
        "topology": name,
        "nodes": nodes,
        "edges": edges,
        "memory_bytes": memory,
        "generate_ms": gen_ms,
        "bfs": bfs_stats.to_json(),
        "dijkstra": dijkstra_stats.to_json(),
        "far_path": { "target": far, "len": far_path.len(), "ms": far_ms },
        "topological": topo_report,
        "remove": {
            "removed": mutation.removed,
            "ms": mutation.remove_ms,
            "far_path_len": mutation.path_len,
        },
    })
}

struct QueryStats {
    queries: usize,
    reached: usize,
    avg_ms: f64,
}

impl QueryStats {
    fn to_json(&self) -> Value {
        json!({ "queries": self.queries, "reached": self.reached, "avg_ms": self.avg_ms })
    }
}

/// Time `query` over `pairs`; it returns the path length found.
fn time_queries<F>(pairs: &[(u64, u64)], query: F) -> QueryStats
where
    F: Fn(&u64, &u64) -> usize,
{
    let t = Instant::now();
    let reached = pairs.iter().filter(|(a, b)| query(a, b) > 0).count();
    QueryStats {
        queries: pairs.len(),
        reached,
        avg_ms: millis(t) / pairs.len().max(1) as f64,
    }
}

struct Mutation {
    removed: usize,
    remove_ms: f64,
    path_len: usize,
}

/// Drop ~1% of the nodes (never node 0 or `far`) and rerun the bound BFS.
fn remove_and_requery(
    shared: &SharedGraph<u64, u32>,
    bfs: &Bfs<SharedGraph<u64, u32>, u64, u32>,
    far: u64,
    rng: &mut StdRng,
) -> Mutation {
    let count = (far / 100).max(1);
    let victims: Vec<u64> = (0..count)
        .map(|_| rng.gen_range(0..=far))
        .filter(|&v| v != 0 && v != far)
        .collect();

    let t = Instant::now();
    let removed = shared.borrow_mut().remove(victims.iter());
    let remove_ms = millis(t);

    Mutation {
        removed,
        remove_ms,
        path_len: bfs.execute(&0, &far).len(),
    }
}

fn run_bundle_benchmark(settings: &Settings, weights: &WeightedDistribution<u32>) -> Value {
    const FACETS: [&str; 8] = [
        "forest", "desert", "water", "ruin", "road", "village", "cave", "peak",
    ];
    let quiet = settings.json;
    let n = settings.node_count;
    let mut rng = StdRng::seed_from_u64(settings.seed);

    let t = Instant::now();
    let mut bundle: FacetedBundle<u64, &'static str, u64> = FacetedBundle::new();
    for key in 0..n {
        bundle
            .put(key, key)
            .add_facets(FACETS.iter().copied().filter(|_| rng.gen_bool(0.3)));
    }
    let build_ms = millis(t);
    tracing::info!(elements = bundle.len(), build_ms, "built faceted bundle");

    let query_facets = |bundle: &FacetedBundle<u64, &'static str, u64>| -> Vec<Value> {
        (1..=3)
            .map(|k| {
                let t = Instant::now();
                let found = bundle.with_facets(&FACETS[..k]).len();
                json!({ "facets": &FACETS[..k], "found": found, "ms": millis(t) })
            })
            .collect()
    };
    let before = query_facets(&bundle);

    let t = Instant::now();
    let mut removed = 0usize;
    for key in (0..n).step_by(10) {
        if bundle.remove(&key).is_some() {
            removed += 1;
        }
    }
    let remove_ms = millis(t);
    let after = query_facets(&bundle);

    let mut source = RngSource(StdRng::seed_from_u64(settings.seed));
    let draws = settings.queries * 1_000;
    let t = Instant::now();
    let mut histogram = [0u64; EDGE_WEIGHTS.len()];
    for _ in 0..draws {
        if let Ok(weight) = weights.get_with(&mut source) {
            if let Some(slot) = EDGE_WEIGHTS.iter().position(|(w, _)| w == weight) {
                histogram[slot] += 1;
            }
        }
    }
    let draw_ms = millis(t);

    if !quiet {
        println!("--- Faceted bundle ---");
        println!("Built {} elements in {:.1}ms", n, build_ms);
        println!("{:>32} {:>10} {:>10}", "facets", "before", "after");
        for (b, a) in before.iter().zip(&after) {
            println!(
                "{:>32} {:>10} {:>10}",
                b["facets"].to_string(),
                b["found"],
                a["found"]
            );
        }
        println!("Removed {} elements in {:.1}ms", removed, remove_ms);
        println!();
        println!("--- Weighted distribution ---");
        println!("{} draws in {:.1}ms", draws, draw_ms);
        for ((weight, odds), count) in EDGE_WEIGHTS.iter().zip(histogram) {
            println!(
                "  weight {:>3} (odds {:>2}/{}): {:>6.2}%",
                weight,
                odds,
                weights.total_weight(),
                count as f64 * 100.0 / draws as f64
            );
        }
        println!();
    }

    json!({
        "bundle": {
            "elements": n,
            "build_ms": build_ms,
            "queries": before,
            "removed": removed,
            "remove_ms": remove_ms,
            "queries_after_remove": after,
        },
        "distribution": {
            "draws": draws,
            "ms": draw_ms,
            "histogram": EDGE_WEIGHTS
                .iter()
                .zip(histogram)
                .map(|((weight, _), count)| json!({ "weight": weight, "count": count }))
                .collect::<Vec<_>>(),
        },
    })
}

// ---------------------------------------------------------------------------
// Generators: O(n) or O(n + edges), single-threaded, deterministic per seed
// ---------------------------------------------------------------------------

/// Edge weights and how often each is drawn.
const EDGE_WEIGHTS: [(u32, u64); 4] = [(1, 8), (2, 4), (5, 2), (10, 1)];

fn edge_weights() -> procgraph_core::Result<WeightedDistribution<u32>> {
    let mut weights = WeightedDistribution::new();
    for (weight, odds) in EDGE_WEIGHTS {
        weights.add(weight, odds)?;
    }
    Ok(weights)
}

/// Random stream shared by a generator's topology and edge weights.
struct Dice {
    source: RngSource<StdRng>,
    weights: WeightedDistribution<u32>,
}

impl Dice {
    fn new(seed: u64, weights: &WeightedDistribution<u32>) -> Self {
        Self {
            source: RngSource(StdRng::seed_from_u64(seed)),
            weights: weights.clone(),
        }
    }

    fn below(&mut self, max: u64) -> u64 {
        self.source.0.gen_range(0..max)
    }

    fn chance(&mut self, p: f64) -> bool {
        self.source.0.gen_bool(p)
    }

    fn weight(&mut self) -> u32 {
        self.weights.get_with(&mut self.source).copied().unwrap_or(1)
    }
}

fn generate(
    topology: Topology,
    node_count: u64,
    seed: u64,
    weights: &WeightedDistribution<u32>,
) -> Graph<u64, u32> {
    match topology {
        Topology::LSystem => gen_lsystem(node_count, seed, weights),
        Topology::ScaleFree => gen_scale_free(node_count, seed.wrapping_add(1), weights),
        Topology::SmallWorld => gen_small_world(node_count, seed.wrapping_add(2), weights),
        Topology::Random => gen_random(node_count, seed.wrapping_add(3), weights),
        Topology::Barbell => gen_barbell(node_count, seed.wrapping_add(4), weights),
        Topology::Dla => gen_dla(node_count, seed.wrapping_add(5), weights),
    }
}

/// L-system fractal tree: each node spawns three children, edges point
/// parent → child. Deep paths with exponential width; always acyclic.
fn gen_lsystem(
    node_count: u64,
    seed: u64,
    weights: &WeightedDistribution<u32>,
) -> Graph<u64, u32> {
    let mut graph = Graph::with_capacity(node_count as usize);
    let mut dice = Dice::new(seed, weights);

    let branching = 3u64;
    graph.add(0, []);

    let mut next_id: u64 = 1;
    let mut frontier: Vec<u64> = vec![0];

    while next_id < node_count && !frontier.is_empty() {
        let mut next_frontier = Vec::with_capacity(frontier.len() * branching as usize);
        for &parent in &frontier {
            for _ in 0..branching {
                if next_id >= node_count {
                    break;
                }
                let child = next_id;
                next_id += 1;
                graph.add_edge(parent, child, dice.weight());
                next_frontier.push(child);
            }
        }
        frontier = next_frontier;
    }

    graph
}

/// Scale-free via edge-list sampling (O(edges), not O(n²)).
///
/// Preferential attachment: pick a random endpoint of an existing edge, so
/// well-connected nodes are picked more often. New nodes only point at older
/// ones, so the result is acyclic.
fn gen_scale_free(
    node_count: u64,
    seed: u64,
    weights: &WeightedDistribution<u32>,
) -> Graph<u64, u32> {
    let edges_per_node = 10u64;
    let mut graph = Graph::with_capacity(node_count as usize);
    let mut dice = Dice::new(seed, weights);

    let mut endpoints: Vec<u64> = Vec::with_capacity((node_count * edges_per_node * 2) as usize);

    // Seed: small clique, low → high
    let clique = 5u64;
    for i in 0..clique {
        graph.add(i, []);
    }
    for i in 0..clique {
        for j in (i + 1)..clique {
            graph.add_edge(j, i, dice.weight());
            endpoints.push(i);
            endpoints.push(j);
        }
    }

    for new_node in clique..node_count {
        graph.add(new_node, []);
        for _ in 0..edges_per_node.min(new_node) {
            let target = endpoints[dice.below(endpoints.len() as u64) as usize];
            if target != new_node {
                graph.add_edge(new_node, target, dice.weight());
                endpoints.push(new_node);
                endpoints.push(target);
            }
        }
    }

    graph
}

/// Small-world (Watts-Strogatz): ring lattice with each node linked to its
/// K forward neighbors, each edge rewired to a random target with
/// probability p. High clustering, short paths.
fn gen_small_world(
    node_count: u64,
    seed: u64,
    weights: &WeightedDistribution<u32>,
) -> Graph<u64, u32> {
    let k = 10u64.min(node_count - 1);
    let p = 0.05f64;
    let mut graph = Graph::with_capacity(node_count as usize);
    let mut dice = Dice::new(seed, weights);

    for i in 0..node_count {
        graph.add(i, []);
    }

    for i in 0..node_count {
        for j in 1..=k {
            let neighbor = (i + j) % node_count;
            let target = if dice.chance(p) {
                match dice.below(node_count) {
                    rewired if rewired != i => rewired,
                    _ => neighbor,
                }
            } else {
                neighbor
            };
            graph.add_edge(i, target, dice.weight());
        }
    }

    graph
}

/// Erdos-Renyi: ~10 uniform random edges per node. No structure.
fn gen_random(
    node_count: u64,
    seed: u64,
    weights: &WeightedDistribution<u32>,
) -> Graph<u64, u32> {
    let target_edges = node_count * 10;
    let mut graph = Graph::with_capacity(node_count as usize);
    let mut dice = Dice::new(seed, weights);

    for i in 0..node_count {
        graph.add(i, []);
    }

    for _ in 0..target_edges {
        let from = dice.below(node_count);
        let to = dice.below(node_count);
        if from != to {
            graph.add_edge(from, to, dice.weight());
        }
    }

    graph
}

/// Barbell: two dense clusters joined by a chain of bridge nodes.
///
/// Worst case for "find path through bottleneck": every path from one
/// cluster to the other crosses the whole bridge.
fn gen_barbell(
    node_count: u64,
    seed: u64,
    weights: &WeightedDistribution<u32>,
) -> Graph<u64, u32> {
    let bridge_len = 10u64;
    let clique_size = (node_count - bridge_len) / 2;
    let mut graph = Graph::with_capacity(node_count as usize);
    let mut dice = Dice::new(seed, weights);

    let cluster = |graph: &mut Graph<u64, u32>, start: u64, dice: &mut Dice| {
        for i in 0..clique_size {
            graph.add(start + i, []);
        }
        for i in 0..clique_size {
            for _ in 0..20u64.min(clique_size - 1) {
                let target = dice.below(clique_size);
                if target != i {
                    graph.add_edge(start + i, start + target, dice.weight());
                }
            }
        }
    };

    // Cluster A, then the bridge from A's last node, then cluster B
    cluster(&mut graph, 0, &mut dice);
    let bridge_start = clique_size;
    for i in 0..bridge_len {
        let id = bridge_start + i;
        graph.add_edge(id - 1, id, dice.weight());
    }
    let b_start = bridge_start + bridge_len;
    cluster(&mut graph, b_start, &mut dice);
    graph.add_edge(b_start - 1, b_start, dice.weight());

    graph
}

/// DLA (diffusion-limited aggregation), simplified: each new node attaches
/// to a recent "surface" node, with an occasional second link to any older
/// node. Organic, tree-like, winding paths; edges point new → old.
fn gen_dla(
    node_count: u64,
    seed: u64,
    weights: &WeightedDistribution<u32>,
) -> Graph<u64, u32> {
    let mut graph = Graph::with_capacity(node_count as usize);
    let mut dice = Dice::new(seed, weights);

    graph.add(0, []);

    let surface_max = 10_000usize;
    let mut surface: VecDeque<u64> = VecDeque::with_capacity(surface_max + 1);
    surface.push_back(0);

    for new_node in 1..node_count {
        let attach_to = surface[dice.below(surface.len() as u64) as usize];
        graph.add_edge(new_node, attach_to, dice.weight());

        // 10% chance of a shortcut
        if dice.below(10) == 0 && new_node > 1 {
            let other = dice.below(new_node);
            if other != attach_to {
                graph.add_edge(new_node, other, dice.weight());
            }
        }

        surface.push_back(new_node);
        if surface.len() > surface_max {
            surface.pop_front();
        }
    }

    graph
}
