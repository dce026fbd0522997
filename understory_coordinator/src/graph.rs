// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Directed dependency graph with a deterministic depth-first topological sort.

use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::error::CoordinatorError;

type EdgeList<K> = SmallVec<[K; 4]>;

#[derive(Clone, Debug)]
struct Entry<K> {
    /// Nodes this node depends on.
    outgoing: EdgeList<K>,
    /// Nodes that depend on this node.
    incoming: EdgeList<K>,
}

impl<K> Default for Entry<K> {
    fn default() -> Self {
        Self {
            outgoing: SmallVec::new(),
            incoming: SmallVec::new(),
        }
    }
}

/// A directed graph of "depends on" relations between keys.
///
/// An edge `from → to` means `from` depends on `to`, so `to` must be processed first.
/// Iteration and sorting follow insertion order, which makes [`topological_order`]
/// deterministic.
///
/// ```rust
/// use understory_coordinator::DependencyGraph;
///
/// let mut graph = DependencyGraph::new();
/// graph.add_node("list");
/// graph.add_node("header");
/// graph.add_edge("list", "header");
/// assert_eq!(graph.topological_order().unwrap(), ["header", "list"]);
/// assert_eq!(graph.incoming_edges(&"header"), ["list"]);
/// ```
///
/// [`topological_order`]: DependencyGraph::topological_order
#[derive(Clone, Debug)]
pub struct DependencyGraph<K> {
    nodes: HashMap<K, Entry<K>>,
    order: Vec<K>,
}

impl<K> Default for DependencyGraph<K> {
    fn default() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

impl<K: Copy + Eq + Hash> DependencyGraph<K> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Adding an existing node is a no-op.
    pub fn add_node(&mut self, node: K) {
        if !self.nodes.contains_key(&node) {
            self.nodes.insert(node, Entry::default());
            self.order.push(node);
        }
    }

    /// Whether `node` is in the graph.
    pub fn contains(&self, node: &K) -> bool {
        self.nodes.contains_key(node)
    }

    /// Record that `from` depends on `to`. Both nodes are added if missing; duplicate edges
    /// are ignored.
    pub fn add_edge(&mut self, from: K, to: K) {
        self.add_node(from);
        self.add_node(to);
        if let Some(entry) = self.nodes.get_mut(&from) {
            if entry.outgoing.contains(&to) {
                return;
            }
            entry.outgoing.push(to);
        }
        if let Some(entry) = self.nodes.get_mut(&to) {
            entry.incoming.push(from);
        }
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&mut self, node: &K) {
        let Some(entry) = self.nodes.remove(node) else {
            return;
        };
        self.order.retain(|k| k != node);
        for dep in &entry.outgoing {
            if let Some(e) = self.nodes.get_mut(dep) {
                e.incoming.retain(|k| k != node);
            }
        }
        for dependent in &entry.incoming {
            if let Some(e) = self.nodes.get_mut(dependent) {
                e.outgoing.retain(|k| k != node);
            }
        }
    }

    /// Nodes that depend on `node` (edges pointing at it).
    pub fn incoming_edges(&self, node: &K) -> &[K] {
        self.nodes.get(node).map_or(&[][..], |e| e.incoming.as_slice())
    }

    /// Nodes that `node` depends on.
    pub fn outgoing_edges(&self, node: &K) -> &[K] {
        self.nodes.get(node).map_or(&[][..], |e| e.outgoing.as_slice())
    }

    /// Whether `node` depends on anything.
    pub fn has_outgoing_edges(&self, node: &K) -> bool {
        self.nodes.get(node).is_some_and(|e| !e.outgoing.is_empty())
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Remove all nodes and edges.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.order.clear();
    }

    /// Every node, ordered so that each one comes after all nodes it depends on.
    ///
    /// Returns [`CoordinatorError::DependencyCycle`] if the graph is not acyclic.
    pub fn topological_order(&self) -> Result<Vec<K>, CoordinatorError> {
        let mut marks: HashMap<K, Mark> = HashMap::with_capacity(self.order.len());
        let mut out = Vec::with_capacity(self.order.len());
        for &node in &self.order {
            self.visit(node, &mut marks, &mut out)?;
        }
        Ok(out)
    }

    fn visit(
        &self,
        node: K,
        marks: &mut HashMap<K, Mark>,
        out: &mut Vec<K>,
    ) -> Result<(), CoordinatorError> {
        match marks.get(&node) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => return Err(CoordinatorError::DependencyCycle),
            None => {}
        }
        marks.insert(node, Mark::Visiting);
        for &dep in self.outgoing_edges(&node) {
            self.visit(dep, marks, out)?;
        }
        marks.insert(node, Mark::Done);
        out.push(node);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use proptest::prelude::*;

    #[test]
    fn independent_nodes_keep_insertion_order() {
        let mut g = DependencyGraph::new();
        for k in [3_u32, 1, 2] {
            g.add_node(k);
        }
        assert_eq!(g.topological_order().unwrap(), vec![3, 1, 2]);
    }

    #[test]
    fn dependencies_come_first() {
        let mut g = DependencyGraph::new();
        g.add_node('a');
        g.add_node('b');
        g.add_node('c');
        g.add_edge('a', 'c');
        g.add_edge('b', 'a');
        assert_eq!(g.topological_order().unwrap(), vec!['c', 'a', 'b']);
        assert_eq!(g.outgoing_edges(&'b'), &['a']);
        assert_eq!(g.incoming_edges(&'c'), &['a']);
        assert!(g.has_outgoing_edges(&'a'));
        assert!(!g.has_outgoing_edges(&'c'));
    }

    #[test]
    fn cycle_is_an_error() {
        let mut g = DependencyGraph::new();
        g.add_edge(1_u8, 2);
        g.add_edge(2, 3);
        g.add_edge(3, 1);
        assert_eq!(g.topological_order(), Err(CoordinatorError::DependencyCycle));
    }

    #[test]
    fn self_edge_is_a_cycle() {
        let mut g = DependencyGraph::new();
        g.add_edge(7_u8, 7);
        assert_eq!(g.topological_order(), Err(CoordinatorError::DependencyCycle));
    }

    #[test]
    fn remove_node_drops_its_edges() {
        let mut g = DependencyGraph::new();
        g.add_edge(1_u8, 2);
        g.add_edge(3, 2);
        g.remove_node(&2);
        assert!(!g.contains(&2));
        assert!(!g.has_outgoing_edges(&1));
        assert!(!g.has_outgoing_edges(&3));
        assert_eq!(g.topological_order().unwrap(), vec![1, 3]);
    }

    #[test]
    fn duplicate_edges_are_ignored() {
        let mut g = DependencyGraph::new();
        g.add_edge(1_u8, 2);
        g.add_edge(1, 2);
        assert_eq!(g.outgoing_edges(&1).len(), 1);
        assert_eq!(g.incoming_edges(&2).len(), 1);
    }

    proptest! {
        #[test]
        fn order_respects_every_edge(
            n in 1_usize..24,
            raw in proptest::collection::vec((0_usize..24, 0_usize..24), 0..64),
        ) {
            let mut g = DependencyGraph::new();
            for k in 0..n {
                g.add_node(k);
            }
            // Only edges from a higher key to a lower one, so the graph stays acyclic.
            let edges: Vec<(usize, usize)> = raw
                .into_iter()
                .map(|(a, b)| (a % n, b % n))
                .filter(|(a, b)| a > b)
                .collect();
            for &(a, b) in &edges {
                g.add_edge(a, b);
            }
            let order = g.topological_order().unwrap();
            prop_assert_eq!(order.len(), n);
            let pos = |k: usize| order.iter().position(|&x| x == k).unwrap();
            for &(a, b) in &edges {
                prop_assert!(pos(b) < pos(a));
            }
        }

        #[test]
        fn closing_a_chain_always_errors(n in 2_usize..16) {
            let mut g = DependencyGraph::new();
            for k in 1..n {
                g.add_edge(k, k - 1);
            }
            g.add_edge(0, n - 1);
            prop_assert_eq!(g.topological_order(), Err(CoordinatorError::DependencyCycle));
        }
    }
}
