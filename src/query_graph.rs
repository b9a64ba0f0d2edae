// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Query-local view of a [Graph] with additional virtual nodes at snapped positions.

use std::collections::{BTreeMap, HashMap};

use crate::index::{Snap, SnapPosition};
use crate::{EdgeId, EdgeState, Graph, Node};

/// A read-only [Graph] augmented with virtual nodes and edges.
///
/// Every [Snap] in the interior of an edge becomes a virtual node, and the snapped
/// edge is replaced by a chain of virtual edges running through all virtual nodes
/// created on it. Virtual edges keep the attributes of the edge they split, and refer
/// to it through [EdgeState::original_edge].
#[derive(Debug, Clone)]
pub struct QueryGraph<'g> {
    graph: &'g Graph,
    virtual_nodes: BTreeMap<i64, (Node, Vec<EdgeId>)>,
    virtual_edges: Vec<EdgeState>,

    /// Split base edge → (first, last) virtual edge of its chain
    split_edges: HashMap<EdgeId, (EdgeId, EdgeId)>,
}

impl<'g> QueryGraph<'g> {
    /// Creates a view over `graph` without any virtual nodes.
    pub fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            virtual_nodes: BTreeMap::default(),
            virtual_edges: Vec::default(),
            split_edges: HashMap::default(),
        }
    }

    /// Creates a view over `graph` with virtual nodes for all interior `snaps`,
    /// and updates [Snap::closest_node] of those snaps to their virtual nodes.
    ///
    /// Snaps on the same edge at the same fraction share a virtual node.
    pub fn lookup(graph: &'g Graph, snaps: &mut [Snap]) -> Self {
        let mut qg = Self::new(graph);

        let mut by_edge: BTreeMap<EdgeId, Vec<usize>> = BTreeMap::default();
        for (i, snap) in snaps.iter().enumerate() {
            if let SnapPosition::Edge { .. } = snap.position {
                by_edge.entry(snap.closest_edge.id).or_default().push(i);
            }
        }

        let mut next_node_id = graph.next_free_node_id();
        for (edge_id, mut indices) in by_edge {
            indices.sort_by(|&a, &b| fraction(&snaps[a]).total_cmp(&fraction(&snaps[b])));

            let base = snaps[indices[0]].closest_edge;
            let mut chain: Vec<(i64, f64)> = vec![(base.base_node, 0.0)];

            for i in indices {
                let f = fraction(&snaps[i]);
                let shared = chain
                    .last()
                    .filter(|&&(id, last_f)| id != base.base_node && last_f == f)
                    .map(|&(id, _)| id);

                let node_id = shared.unwrap_or_else(|| {
                    let id = next_node_id;
                    next_node_id += 1;
                    qg.virtual_nodes.insert(
                        id,
                        (
                            Node {
                                id,
                                lat: snaps[i].snapped_lat,
                                lon: snaps[i].snapped_lon,
                            },
                            Vec::default(),
                        ),
                    );
                    chain.push((id, f));
                    id
                });

                snaps[i].closest_node = node_id;
            }

            chain.push((base.adj_node, 1.0));
            qg.add_chain(edge_id, &base, &chain);
        }

        log::debug!(
            "query graph: {} virtual nodes, {} virtual edges",
            qg.virtual_nodes.len(),
            qg.virtual_edges.len()
        );
        qg
    }

    fn add_chain(&mut self, edge_id: EdgeId, base: &EdgeState, chain: &[(i64, f64)]) {
        let first_id = self.next_edge_id();

        for pair in chain.windows(2) {
            let (from, from_f) = pair[0];
            let (to, to_f) = pair[1];
            let id = self.next_edge_id();

            self.virtual_edges.push(EdgeState {
                id,
                original_edge: base.original_edge,
                base_node: from,
                adj_node: to,
                distance: base.distance * (to_f - from_f),
                ..*base
            });

            if let Some((_, edges)) = self.virtual_nodes.get_mut(&from) {
                edges.push(id);
            }
            if let Some((_, edges)) = self.virtual_nodes.get_mut(&to) {
                edges.push(id);
            }
        }

        self.split_edges
            .insert(edge_id, (first_id, self.next_edge_id() - 1));
    }

    fn next_edge_id(&self) -> EdgeId {
        (self.graph.edge_count() + self.virtual_edges.len()) as EdgeId
    }

    /// Returns the underlying graph.
    pub fn base_graph(&self) -> &'g Graph {
        self.graph
    }

    pub fn is_virtual_node(&self, id: i64) -> bool {
        self.virtual_nodes.contains_key(&id)
    }

    pub fn is_virtual_edge(&self, id: EdgeId) -> bool {
        id as usize >= self.graph.edge_count()
    }

    pub fn virtual_node_count(&self) -> usize {
        self.virtual_nodes.len()
    }

    /// Returns the number of base and virtual edges. Split base edges are still counted.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count() + self.virtual_edges.len()
    }

    pub fn get_node(&self, id: i64) -> Option<Node> {
        self.virtual_nodes
            .get(&id)
            .map(|&(node, _)| node)
            .or_else(|| self.graph.get_node(id))
    }

    pub fn get_edge(&self, id: EdgeId) -> Option<&EdgeState> {
        match (id as usize).checked_sub(self.graph.edge_count()) {
            Some(virtual_idx) => self.virtual_edges.get(virtual_idx),
            None => self.graph.get_edge(id),
        }
    }

    /// Returns all edges incident to a node (as in [Graph::adjacent_edges]),
    /// with split base edges replaced by the virtual edges touching the node.
    pub fn adjacent_edges(&self, node_id: i64) -> Vec<(&EdgeState, bool)> {
        if let Some((_, edges)) = self.virtual_nodes.get(&node_id) {
            return edges
                .iter()
                .map(|&id| {
                    let edge = &self.virtual_edges[id as usize - self.graph.edge_count()];
                    (edge, edge.base_node != node_id)
                })
                .collect();
        }

        let mut result = Vec::default();
        for (edge, reverse) in self.graph.adjacent_edges(node_id) {
            match self.split_edges.get(&edge.id) {
                None => result.push((edge, reverse)),
                Some(&(first, last)) => {
                    if edge.base_node == node_id {
                        result.extend(self.get_edge(first).map(|e| (e, false)));
                    }
                    if edge.adj_node == node_id {
                        result.extend(self.get_edge(last).map(|e| (e, true)));
                    }
                }
            }
        }
        result
    }
}

fn fraction(snap: &Snap) -> f64 {
    match snap.position {
        SnapPosition::Edge { fraction } => fraction,
        SnapPosition::Tower => 0.0,
    }
}
