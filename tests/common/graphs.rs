//! Small topologies with known connectivity.

use brb_rs::{graph::Graph, types::NodeId};

pub(crate) fn n(int: u64) -> NodeId {
    NodeId::new(int)
}

/// Every pair of the `size` nodes linked. Connectivity `size - 1`.
pub(crate) fn complete(size: u64) -> Graph {
    let mut graph = Graph::new();
    for a in 0..size {
        for b in a + 1..size {
            graph.add_undirected_edge(n(a), n(b), 1.0);
        }
    }
    graph
}

/// Hub 0 linked to every node of the ring 1..=`rim`. Connectivity 3.
pub(crate) fn wheel(rim: u64) -> Graph {
    let mut graph = Graph::new();
    for node in 1..=rim {
        graph.add_undirected_edge(n(0), n(node), 1.0);
        graph.add_undirected_edge(n(node), n(node % rim + 1), 1.0);
    }
    graph
}

/// Nodes 0..`size` on a ring, each also linked to the nodes `2..=reach` steps away. Connectivity
/// `2 * reach`.
pub(crate) fn circulant(size: u64, reach: u64) -> Graph {
    let mut graph = Graph::new();
    for node in 0..size {
        for step in 1..=reach {
            graph.add_undirected_edge(n(node), n((node + step) % size), 1.0);
        }
    }
    graph
}

/// a=0, b=1, c=2, d=3 with links a-b, a-c, b-d and c-d. Connectivity 2.
pub(crate) fn square() -> Graph {
    let mut graph = Graph::new();
    graph.add_undirected_edge(n(0), n(1), 1.0);
    graph.add_undirected_edge(n(0), n(2), 1.0);
    graph.add_undirected_edge(n(1), n(3), 1.0);
    graph.add_undirected_edge(n(2), n(3), 1.0);
    graph
}
