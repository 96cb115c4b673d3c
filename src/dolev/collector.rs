/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Bookkeeping of the paths a broadcast reached a node through.

use std::collections::BTreeSet;

use crate::types::NodeId;

/// The paths one broadcast instance reached this node through, each reduced to its set of intermediate
/// nodes.
///
/// Only minimal sets are kept: a path whose intermediates include those of a recorded path can never
/// help find more disjoint paths, so it is not recorded, and recording a path removes the recorded
/// paths that include it. An empty set stands for a message received straight from the origin.
#[derive(Clone, Debug, Default)]
pub(crate) struct PathCollector {
    paths: Vec<BTreeSet<NodeId>>,
}

impl PathCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record a path by its intermediate nodes. Returns whether the path was kept.
    pub(crate) fn record(&mut self, intermediates: impl IntoIterator<Item = NodeId>) -> bool {
        let path: BTreeSet<NodeId> = intermediates.into_iter().collect();
        if self.paths.iter().any(|kept| kept.is_subset(&path)) {
            return false;
        }
        self.paths.retain(|kept| !path.is_subset(kept));
        self.paths.push(path);
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.paths.len()
    }

    pub(crate) fn has_direct(&self) -> bool {
        self.paths.iter().any(BTreeSet::is_empty)
    }

    /// Whether the recorded paths include `needed` paths with pairwise disjoint intermediates, or a
    /// direct one.
    pub(crate) fn has_disjoint(&self, needed: usize) -> bool {
        if needed == 0 || self.has_direct() {
            return true;
        }
        if self.paths.len() < needed {
            return false;
        }
        // Short paths block fewer others, so try them first.
        let mut paths: Vec<&BTreeSet<NodeId>> = self.paths.iter().collect();
        paths.sort_by_key(|path| path.len());
        find_disjoint(&paths, 0, needed, &mut BTreeSet::new())
    }
}

// Backtracking search for `needed` paths among `paths[start..]` that avoid `used` and each other.
fn find_disjoint(
    paths: &[&BTreeSet<NodeId>],
    start: usize,
    needed: usize,
    used: &mut BTreeSet<NodeId>,
) -> bool {
    if needed == 0 {
        return true;
    }
    for index in start..paths.len() {
        if paths.len() - index < needed {
            break;
        }
        let path = paths[index];
        if !path.is_disjoint(used) {
            continue;
        }
        used.extend(path.iter().copied());
        if find_disjoint(paths, index + 1, needed - 1, used) {
            return true;
        }
        for node in path {
            used.remove(node);
        }
    }
    false
}
