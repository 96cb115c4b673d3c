use std::collections::{BTreeSet, VecDeque};

use brb_rs::{
    graph::{verify_disjoint, Graph, Path},
    routing::{
        build_broadcast_plan, build_lookup_table, disjoint_paths, filter_subpaths,
        local_connectivity, RoutingError,
    },
    types::NodeId,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

mod common;

use crate::common::graphs::n;

/// An undirected graph on `size` nodes where every pair is linked with probability `density`, with
/// random non-negative weights.
fn random_graph(rng: &mut StdRng, size: u64, density: f64) -> Graph {
    let mut graph = Graph::new();
    for node in 0..size {
        graph.ensure_node(n(node));
    }
    for a in 0..size {
        for b in a + 1..size {
            if rng.gen_bool(density) {
                let weight = rng.gen_range(0, 10) as f64;
                graph.add_undirected_edge(n(a), n(b), weight);
            }
        }
    }
    graph
}

/// Whether `target` can be reached from `source` without crossing any node of `removed`.
fn reachable(graph: &Graph, source: NodeId, target: NodeId, removed: &BTreeSet<NodeId>) -> bool {
    let mut seen = BTreeSet::from([source]);
    let mut queue = VecDeque::from([source]);
    while let Some(node) = queue.pop_front() {
        if node == target {
            return true;
        }
        for neighbor in graph.neighbors(node) {
            if !removed.contains(&neighbor) && seen.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }
    false
}

/// Number of vertex-disjoint paths from `source` to `target`, by trying every vertex cut.
fn brute_force_connectivity(graph: &Graph, source: NodeId, target: NodeId) -> usize {
    let mut graph = graph.clone();
    let direct = graph.remove_edge(source, target).is_some();
    graph.remove_edge(target, source);

    let inner: Vec<NodeId> = graph
        .node_ids()
        .filter(|id| *id != source && *id != target)
        .collect();
    let smallest_cut = (0u32..1 << inner.len())
        .filter_map(|mask| {
            let removed: BTreeSet<NodeId> = inner
                .iter()
                .enumerate()
                .filter(|(bit, _)| mask & (1 << bit) != 0)
                .map(|(_, id)| *id)
                .collect();
            (!reachable(&graph, source, target, &removed)).then_some(removed.len())
        })
        .min()
        .unwrap_or(inner.len());
    smallest_cut + usize::from(direct)
}

#[test]
fn disjoint_paths_match_the_brute_force_connectivity_test() {
    let mut rng = StdRng::seed_from_u64(2023);

    for _ in 0..60 {
        let size = rng.gen_range(4, 9);
        let graph = random_graph(&mut rng, size, 0.5);
        let source = n(rng.gen_range(0, size));
        let target = n((source.int() + rng.gen_range(1, size)) % size);

        let connectivity = brute_force_connectivity(&graph, source, target);
        assert_eq!(local_connectivity(&graph, source, target), Ok(connectivity));

        for k in 1..=connectivity {
            let paths = disjoint_paths(&graph, source, target, k).unwrap();
            assert_eq!(paths.len(), k);
            assert!(verify_disjoint(&paths));
            assert!(paths.iter().all(|path| path.is_valid(&graph)
                && path.start() == Some(source)
                && path.end() == Some(target)));
        }
        assert_eq!(
            disjoint_paths(&graph, source, target, connectivity + 1),
            Err(RoutingError::NoPath {
                from: source,
                to: target,
                found: connectivity,
                requested: connectivity + 1
            })
        );
    }
}

#[test]
fn disjoint_paths_are_deterministic_test() {
    let mut rng = StdRng::seed_from_u64(7);
    let graph = random_graph(&mut rng, 9, 0.6);
    let connectivity = local_connectivity(&graph, n(0), n(8)).unwrap();

    let first = disjoint_paths(&graph, n(0), n(8), connectivity).unwrap();
    let second = disjoint_paths(&graph.clone(), n(0), n(8), connectivity).unwrap();
    assert_eq!(first, second);
}

#[test]
fn filtering_subpaths_is_idempotent_test() {
    let mut rng = StdRng::seed_from_u64(11);

    for _ in 0..20 {
        // A ring guarantees two disjoint routes between every pair.
        let size = rng.gen_range(5, 10);
        let mut graph = random_graph(&mut rng, size, 0.3);
        for node in 0..size {
            graph.add_undirected_edge(n(node), n((node + 1) % size), 1.0);
        }
        let table = build_lookup_table(&graph, n(0), 2, 0.0).unwrap();
        let paths: Vec<Path> = table.iter().map(|(_, _, route)| route.path.clone()).collect();

        let filtered = filter_subpaths(&paths);
        assert_eq!(filter_subpaths(&filtered), filtered);
        for path in &filtered {
            assert!(paths.contains(path));
            assert!(!filtered.iter().any(|other| path.is_strict_prefix_of(other)));
        }
        // Every dropped path is covered by a kept one.
        for path in &paths {
            assert!(filtered
                .iter()
                .any(|kept| kept == path || path.is_strict_prefix_of(kept)));
        }

        // A filtered plan still reaches every destination through the same first hops.
        let plan = build_broadcast_plan(&table, true, true);
        let unfiltered = build_broadcast_plan(&table, true, false);
        assert_eq!(
            plan.next_hops().into_iter().collect::<BTreeSet<_>>(),
            unfiltered.next_hops().into_iter().collect::<BTreeSet<_>>()
        );
        assert_eq!(plan.route_count(), filtered.len());
    }
}
