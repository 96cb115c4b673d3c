/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Turning routing tables into per-next-hop forwarding obligations.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::graph::Path;
use crate::types::NodeId;

use super::lookup_table::{Route, RoutingTable};
use super::RoutingError;

/// Remove every path that is a strict prefix of another path in `paths`, as well as repeated copies of
/// the same route. The first copy of a route is the one kept, and the relative order of kept paths is
/// preserved.
///
/// A relay on a longer path already receives the message along the prefix that ends at it, so
/// forwarding along the prefix separately would be redundant.
pub fn filter_subpaths(paths: &[Path]) -> Vec<Path> {
    maximal_indices(paths.len(), |index| &paths[index])
        .into_iter()
        .map(|index| paths[index].clone())
        .collect()
}

/// [`filter_subpaths`] over routes. A kept route inherits the priority of every route it covers.
fn filter_subroutes(routes: &[Route]) -> Vec<Route> {
    let kept = maximal_indices(routes.len(), |index| &routes[index].path);
    kept.iter()
        .map(|&index| {
            let mut route = routes[index].clone();
            route.priority |= routes.iter().any(|other| {
                other.priority
                    && (other.path.is_strict_prefix_of(&route.path)
                        || other.path.same_route(&route.path))
            });
            route
        })
        .collect()
}

fn maximal_indices<'a>(len: usize, path_of: impl Fn(usize) -> &'a Path) -> Vec<usize> {
    (0..len)
        .filter(|&index| {
            let path = path_of(index);
            let covered = (0..len).any(|other| {
                let other_path = path_of(other);
                path.is_strict_prefix_of(other_path)
                    || (other < index && path.same_route(other_path))
            });
            !covered
        })
        .collect()
}

/// The routes that must be forwarded through one neighbor.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanEntry {
    pub next_hop: NodeId,
    /// Priority routes come first.
    pub routes: Vec<Route>,
}

/// Forwarding obligations of a source, grouped by next hop. Each entry corresponds to one outgoing
/// message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BroadcastPlan {
    entries: Vec<PlanEntry>,
}

impl BroadcastPlan {
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Distinct next hops, in plan order.
    pub fn next_hops(&self) -> Vec<NodeId> {
        let mut seen = BTreeSet::new();
        self.entries
            .iter()
            .filter(|entry| seen.insert(entry.next_hop))
            .map(|entry| entry.next_hop)
            .collect()
    }

    /// Number of messages the source sends when executing this plan.
    pub fn message_count(&self) -> usize {
        self.entries.len()
    }

    pub fn route_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.routes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Group the routes of `table` by first hop.
///
/// If `filter_subpaths` is set, redundant sub-routes are removed first (see [`filter_subpaths`]). If
/// `combine_next_hops` is set, all routes sharing a first hop are merged into a single entry, so the
/// source sends one message per neighbor instead of one per route.
pub fn build_broadcast_plan(
    table: &RoutingTable,
    combine_next_hops: bool,
    filter_subpaths: bool,
) -> BroadcastPlan {
    plan_routes(
        table.iter().map(|(_, _, route)| route.clone()).collect(),
        combine_next_hops,
        filter_subpaths,
    )
}

/// Like [`build_broadcast_plan`], but only for the routes towards `destinations`.
pub fn build_partial_broadcast_plan(
    table: &RoutingTable,
    destinations: &BTreeSet<NodeId>,
    combine_next_hops: bool,
    filter_subpaths: bool,
) -> BroadcastPlan {
    plan_routes(
        table
            .iter()
            .filter(|(destination, _, _)| destinations.contains(destination))
            .map(|(_, _, route)| route.clone())
            .collect(),
        combine_next_hops,
        filter_subpaths,
    )
}

fn plan_routes(routes: Vec<Route>, combine_next_hops: bool, filter: bool) -> BroadcastPlan {
    let routes = if filter {
        filter_subroutes(&routes)
    } else {
        routes
    };

    let mut entries: Vec<PlanEntry> = Vec::new();
    for route in routes {
        let Some(next_hop) = route.path.first_hop() else {
            continue;
        };
        let existing = if combine_next_hops {
            entries.iter_mut().find(|entry| entry.next_hop == next_hop)
        } else {
            None
        };
        match existing {
            Some(entry) => entry.routes.push(route),
            None => entries.push(PlanEntry {
                next_hop,
                routes: vec![route],
            }),
        }
    }

    for entry in &mut entries {
        // Stable, so non-priority routes keep their relative order.
        entry.routes.sort_by_key(|route| !route.priority);
    }

    BroadcastPlan { entries }
}

/// Mark priority routes so that no two origins' routes can wait on each other in a cycle.
///
/// Two routes conflict when one crosses an edge `u -> v` and the other crosses `v -> u`: both
/// directions are in flight at once, so the relays at `u` and `v` may each wait on the other. For every
/// conflicting pair in which neither route is priority yet, the route of the smaller origin id is
/// marked priority. Pairs are visited in a fixed order (ascending origin, then destination, then route
/// index), so the outcome is deterministic.
///
/// Routes of the same origin are forwarded inside the same broadcast and are not paired with each other.
///
/// Returns the number of routes that were marked.
///
/// # Errors
///
/// [`RoutingError::SelfConflict`] if a single route crosses some edge in both directions. Routes
/// produced by [`disjoint_paths`](super::disjoint_paths) are simple, so this is an invariant violation.
pub fn resolve_forwarding_priority(
    tables: &mut BTreeMap<NodeId, RoutingTable>,
) -> Result<usize, RoutingError> {
    // (origin, destination, index) of every route, in visiting order.
    let mut handles = Vec::new();
    // Directed edge -> handles of the routes crossing it.
    let mut crossing: HashMap<(NodeId, NodeId), Vec<usize>> = HashMap::new();

    for (origin, table) in tables.iter() {
        for (destination, index, route) in table.iter() {
            let handle = handles.len();
            handles.push((*origin, destination, index, route.priority));
            for edge in route.path.edges() {
                if route
                    .path
                    .edges()
                    .iter()
                    .any(|other| other.is_reverse_of(edge))
                {
                    return Err(RoutingError::SelfConflict { origin: *origin });
                }
                crossing.entry((edge.from, edge.to)).or_default().push(handle);
            }
        }
    }

    let mut priority: Vec<bool> = handles.iter().map(|handle| handle.3).collect();
    let mut marked = 0;

    for a in 0..handles.len() {
        let (origin_a, destination_a, index_a, _) = handles[a];
        let route_a = &tables[&origin_a]
            .routes(destination_a)
            .map(|routes| routes[index_a].path.clone())
            .unwrap_or_default();

        for edge in route_a.edges() {
            let Some(reverse) = crossing.get(&(edge.to, edge.from)) else {
                continue;
            };
            for &b in reverse {
                if b <= a || priority[a] || priority[b] {
                    continue;
                }
                let origin_b = handles[b].0;
                if origin_a == origin_b {
                    continue;
                }
                let winner = if origin_a < origin_b { a } else { b };
                priority[winner] = true;
                marked += 1;
            }
        }
    }

    for (handle, (origin, destination, index, was_priority)) in handles.into_iter().enumerate() {
        if priority[handle] && !was_priority {
            if let Some(table) = tables.get_mut(&origin) {
                table.mark_priority(destination, index);
            }
        }
    }

    Ok(marked)
}
