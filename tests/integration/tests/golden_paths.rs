//! All-pairs routing over the fourteen-node reference topology.

use routefab_core::{NodeKind, NodeName};
use routefab_routing::{path_cost, Algorithm, ShortestPathEngine, TopologyGraph};

fn name(i: u32) -> NodeName {
    NodeName::new(format!("n{}", i)).unwrap()
}

/// The fourteen-node reference network. Edge weights are 1/bandwidth, so
/// high-bandwidth links are preferred.
fn reference_topology() -> TopologyGraph {
    let mut graph = TopologyGraph::new();
    for id in 1..=14 {
        graph.add_node(id, name(id), NodeKind::Router).unwrap();
    }
    let links = [
        (1, 2, 2100.0),
        (1, 8, 4800.0),
        (1, 3, 3000.0),
        (2, 4, 1500.0),
        (2, 3, 1200.0),
        (3, 6, 3600.0),
        (4, 5, 1200.0),
        (4, 11, 3900.0),
        (5, 7, 1200.0),
        (5, 6, 2400.0),
        (6, 10, 2100.0),
        (6, 14, 3600.0),
        (7, 10, 2700.0),
        (7, 8, 1500.0),
        (8, 9, 1500.0),
        (9, 10, 1500.0),
        (9, 12, 600.0),
        (9, 13, 600.0),
        (11, 12, 1200.0),
        (11, 13, 1500.0),
        (12, 14, 600.0),
        (13, 14, 300.0),
    ];
    for (source, destination, bandwidth) in links {
        graph.add_link(source, destination, bandwidth).unwrap();
    }
    graph
}

#[test]
fn test_dijkstra_finds_the_known_best_path_across_the_network() {
    let graph = reference_topology();
    let engine = ShortestPathEngine::new(Algorithm::Dijkstra);
    let row = engine.single_source(&graph, &name(1)).unwrap();

    let path = row[&name(14)].path().unwrap();
    assert_eq!(path, &[name(1), name(3), name(6), name(14)]);

    let expected = 1.0 / 3000.0 + 1.0 / 3600.0 + 1.0 / 3600.0;
    let cost = path_cost(&graph, path).unwrap();
    assert!((cost - expected).abs() < 1e-12);
}

#[test]
fn test_every_pair_is_reachable_in_the_reference_network() {
    let graph = reference_topology();
    let table = ShortestPathEngine::new(Algorithm::Dijkstra)
        .all_pairs(&graph)
        .unwrap();

    assert_eq!(table.len(), 14);
    for source in graph.node_names() {
        for destination in graph.node_names() {
            assert!(
                table.lookup(&source, &destination).unwrap().is_reachable(),
                "{} -> {} should be reachable",
                source,
                destination
            );
        }
    }
    assert!(table.check_invariants());
}

#[test]
fn test_bellman_ford_matches_dijkstra_on_every_pair() {
    let graph = reference_topology();
    let dijkstra = ShortestPathEngine::new(Algorithm::Dijkstra)
        .all_pairs(&graph)
        .unwrap();
    let bellman_ford = ShortestPathEngine::new(Algorithm::BellmanFord)
        .all_pairs(&graph)
        .unwrap();

    for source in graph.node_names() {
        for destination in graph.node_names() {
            let a = dijkstra.lookup(&source, &destination).unwrap();
            let b = bellman_ford.lookup(&source, &destination).unwrap();
            assert_eq!(a.is_reachable(), b.is_reachable());
            if let (Some(pa), Some(pb)) = (a.path(), b.path()) {
                let ca = path_cost(&graph, pa).unwrap();
                let cb = path_cost(&graph, pb).unwrap();
                assert!(
                    (ca - cb).abs() < 1e-12,
                    "cost mismatch {} -> {}: {} vs {}",
                    source,
                    destination,
                    ca,
                    cb
                );
            }
        }
    }
}

#[test]
fn test_path_costs_are_symmetric_on_the_undirected_network() {
    let graph = reference_topology();
    let table = ShortestPathEngine::new(Algorithm::Dijkstra)
        .all_pairs(&graph)
        .unwrap();

    for source in graph.node_names() {
        for destination in graph.node_names() {
            let forward = table.lookup(&source, &destination).unwrap().path().unwrap();
            let reverse = table.lookup(&destination, &source).unwrap().path().unwrap();
            let cf = path_cost(&graph, forward).unwrap();
            let cr = path_cost(&graph, reverse).unwrap();
            assert!((cf - cr).abs() < 1e-12);
        }
    }
}

#[test]
fn test_removing_a_transit_node_reroutes_without_stale_paths() {
    let mut graph = reference_topology();
    let engine = ShortestPathEngine::new(Algorithm::Dijkstra);

    let before = engine.all_pairs(&graph).unwrap();
    assert!(before.traverses(&name(3)));

    graph.remove_node(&name(3)).unwrap();
    let after = engine.all_pairs(&graph).unwrap();

    assert!(!after.traverses(&name(3)));
    assert_eq!(after.len(), 13);
    // n1 still reaches n14, just not through n3 any more.
    let detour = after.lookup(&name(1), &name(14)).unwrap();
    assert!(detour.is_reachable());
    assert!(!detour.path().unwrap().contains(&name(3)));
}
