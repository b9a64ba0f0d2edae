// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::priority::PriorityClass;
use crate::Node;
use std::collections::btree_map::{BTreeMap, Entry};
use std::collections::HashMap;

/// Dense identifier of an edge in a [Graph], used to address per-edge
/// [attribute stores](crate::storage).
pub type EdgeId = u32;

/// Represents a connection between two nodes, traversable in the
/// forward (`base_node` → `adj_node`) and/or backward direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeState {
    pub id: EdgeId,

    /// Id of the edge in the base [Graph] this edge was derived from.
    /// Equal to `id` for base edges; virtual edges created by a
    /// [QueryGraph](crate::query_graph::QueryGraph) point to the edge they split.
    /// Attribute stores must always be queried with this id.
    pub original_edge: EdgeId,

    pub base_node: i64,
    pub adj_node: i64,

    /// Length of the edge, in meters.
    pub distance: f64,

    /// Speed (in km/h) when traversing from `base_node` to `adj_node`.
    /// Zero if the edge can't be traversed in that direction.
    pub speed_forward: f64,

    /// Speed (in km/h) when traversing from `adj_node` to `base_node`.
    /// Zero if the edge can't be traversed in that direction.
    pub speed_backward: f64,

    pub priority: PriorityClass,

    /// Id of the OSM way this edge was created from.
    pub way_id: i64,
}

impl EdgeState {
    /// Returns the speed applicable when traversing the edge forward (`reverse == false`)
    /// or backward (`reverse == true`).
    #[inline]
    pub fn speed(&self, reverse: bool) -> f64 {
        if reverse {
            self.speed_backward
        } else {
            self.speed_forward
        }
    }

    /// Returns the node at the other end of the edge, as seen from `node_id`.
    #[inline]
    pub fn other_node(&self, node_id: i64) -> i64 {
        if node_id == self.base_node {
            self.adj_node
        } else {
            self.base_node
        }
    }
}

/// Represents an OpenStreetMap network as a set of [Nodes](Node)
/// and densely-numbered [edges](EdgeState) between them.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Graph {
    nodes: BTreeMap<i64, (Node, Vec<EdgeId>)>,
    edges: Vec<EdgeState>,
    way_names: HashMap<i64, String>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the number of edges in the graph. Edge ids are `0..edge_count()`.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns an iterator over all [Nodes](Node) in the graph.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().map(|(node, _)| node)
    }

    /// Retrieves a [Node] with the provided id.
    pub fn get_node(&self, id: i64) -> Option<Node> {
        self.nodes.get(&id).map(|&(node, _)| node)
    }

    /// Creates or updates a [Node] with `node.id`.
    ///
    /// Incident edges are preserved. Updating a [Node] position after edges
    /// were created invalidates their lengths, and is therefore disallowed.
    pub fn set_node(&mut self, node: Node) {
        match self.nodes.entry(node.id) {
            Entry::Vacant(e) => {
                e.insert((node, Vec::default()));
            }
            Entry::Occupied(mut e) => {
                debug_assert!(e.get().1.is_empty());
                e.get_mut().0 = node;
            }
        }
    }

    /// Deletes a [Node] with a given `id`. Only nodes without any edges may be deleted,
    /// as edge ids must stay dense.
    pub fn delete_node(&mut self, id: i64) {
        if let Entry::Occupied(e) = self.nodes.entry(id) {
            assert!(e.get().1.is_empty(), "node {id} still has edges");
            e.remove();
        }
    }

    /// Returns an id greater than any node id in the graph.
    pub fn next_free_node_id(&self) -> i64 {
        self.nodes
            .last_key_value()
            .map(|(&id, _)| id.max(0) + 1)
            .unwrap_or(1)
    }

    /// Returns all edges, in order of their ids.
    pub fn edges(&self) -> impl Iterator<Item = &EdgeState> {
        self.edges.iter()
    }

    /// Retrieves the edge with the provided id.
    pub fn get_edge(&self, id: EdgeId) -> Option<&EdgeState> {
        self.edges.get(id as usize)
    }

    /// Returns all edges incident to a node, together with a flag indicating
    /// whether leaving `node_id` over that edge traverses it in reverse.
    pub fn adjacent_edges(&self, node_id: i64) -> impl Iterator<Item = (&EdgeState, bool)> {
        self.nodes
            .get(&node_id)
            .map(|(_, e)| e.as_slice())
            .unwrap_or_default()
            .iter()
            .map(move |&id| {
                let edge = &self.edges[id as usize];
                (edge, edge.base_node != node_id)
            })
    }

    /// Creates a new edge between two existing nodes and returns its id.
    ///
    /// `distance` is in meters, speeds are in km/h; a zero speed marks the edge
    /// as not traversable in the corresponding direction.
    ///
    /// # Panics
    ///
    /// Panics if either node is missing, or if the graph already has [u32::MAX] edges.
    pub fn add_edge(
        &mut self,
        base_node: i64,
        adj_node: i64,
        distance: f64,
        speed_forward: f64,
        speed_backward: f64,
        priority: PriorityClass,
        way_id: i64,
    ) -> EdgeId {
        assert!(self.nodes.contains_key(&base_node), "unknown node {base_node}");
        assert!(self.nodes.contains_key(&adj_node), "unknown node {adj_node}");

        let id = EdgeId::try_from(self.edges.len()).expect("edge id space exhausted");
        self.edges.push(EdgeState {
            id,
            original_edge: id,
            base_node,
            adj_node,
            distance,
            speed_forward,
            speed_backward,
            priority,
            way_id,
        });

        if let Some((_, edges)) = self.nodes.get_mut(&base_node) {
            edges.push(id);
        }
        if adj_node != base_node {
            if let Some((_, edges)) = self.nodes.get_mut(&adj_node) {
                edges.push(id);
            }
        }

        id
    }

    /// Remembers the name of an OSM way.
    pub fn set_way_name(&mut self, way_id: i64, name: String) {
        self.way_names.insert(way_id, name);
    }

    /// Returns the name of the OSM way an edge was created from, if known.
    pub fn edge_name(&self, edge: &EdgeState) -> Option<&str> {
        self.way_names.get(&edge.way_id).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i64, lat: f64, lon: f64) -> Node {
        Node { id, lat, lon }
    }

    #[test]
    fn edges_are_dense_and_adjacent() {
        let mut g = Graph::new();
        g.set_node(node(1, 0.0, 0.0));
        g.set_node(node(2, 0.0, 0.001));
        g.set_node(node(3, 0.001, 0.001));

        let a = g.add_edge(1, 2, 111.0, 50.0, 50.0, PriorityClass::Unchanged, 10);
        let b = g.add_edge(2, 3, 111.0, 50.0, 0.0, PriorityClass::Unchanged, 11);

        assert_eq!((a, b), (0, 1));
        assert_eq!(g.edge_count(), 2);

        let from_2: Vec<_> = g.adjacent_edges(2).map(|(e, rev)| (e.id, rev)).collect();
        assert_eq!(from_2, vec![(0, true), (1, false)]);

        let edge = g.get_edge(1).unwrap();
        assert_eq!(edge.speed(false), 50.0);
        assert_eq!(edge.speed(true), 0.0);
        assert_eq!(edge.other_node(2), 3);
        assert_eq!(edge.original_edge, 1);
    }

    #[test]
    fn next_free_node_id() {
        let mut g = Graph::new();
        assert_eq!(g.next_free_node_id(), 1);

        g.set_node(node(-5, 0.0, 0.0));
        assert_eq!(g.next_free_node_id(), 1);

        g.set_node(node(41, 0.0, 0.0));
        assert_eq!(g.next_free_node_id(), 42);
    }

    #[test]
    fn way_names() {
        let mut g = Graph::new();
        g.set_node(node(1, 0.0, 0.0));
        g.set_node(node(2, 0.0, 0.001));
        let id = g.add_edge(1, 2, 111.0, 50.0, 50.0, PriorityClass::Unchanged, 7);
        g.set_way_name(7, "Marszałkowska".to_string());

        let edge = *g.get_edge(id).unwrap();
        assert_eq!(g.edge_name(&edge), Some("Marszałkowska"));
    }

    #[test]
    fn delete_unconnected_node() {
        let mut g = Graph::new();
        g.set_node(node(1, 0.0, 0.0));
        g.delete_node(1);
        assert!(g.is_empty());
    }
}
