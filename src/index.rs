// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Snapping arbitrary coordinates onto the edges of a [Graph].

use crate::{earth_distance_m, project_onto_segment, EdgeState, Graph, KDTree, Node};

/// Decides which edges can be snapped onto.
pub trait EdgeFilter {
    fn accept(&self, edge: &EdgeState) -> bool;
}

impl<F: Fn(&EdgeState) -> bool> EdgeFilter for F {
    fn accept(&self, edge: &EdgeState) -> bool {
        self(edge)
    }
}

/// [EdgeFilter] accepting every edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllEdges;

impl EdgeFilter for AllEdges {
    fn accept(&self, _: &EdgeState) -> bool {
        true
    }
}

/// [EdgeFilter] accepting edges traversable in at least one direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraversableEdges;

impl EdgeFilter for TraversableEdges {
    fn accept(&self, edge: &EdgeState) -> bool {
        edge.speed_forward > 0.0 || edge.speed_backward > 0.0
    }
}

/// Where on an edge a [Snap] lies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SnapPosition {
    /// Exactly on [Snap::closest_node].
    Tower,

    /// In the interior of [Snap::closest_edge], at the given fraction of its length
    /// measured from its `base_node`.
    Edge { fraction: f64 },
}

/// Result of snapping a coordinate onto a graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snap {
    pub query_lat: f64,
    pub query_lon: f64,
    pub snapped_lat: f64,
    pub snapped_lon: f64,

    /// Distance between the query and snapped positions, in meters.
    pub query_distance: f64,

    /// Node nearest to the snapped position. After a
    /// [QueryGraph](crate::query_graph::QueryGraph) lookup, interior snaps
    /// point to the virtual node created for them.
    pub closest_node: i64,

    pub closest_edge: EdgeState,
    pub position: SnapPosition,
}

/// Spatial index resolving coordinates to [Snaps](Snap).
pub trait LocationIndex {
    /// Finds the closest accepted point of the graph, or `None` if there are no accepted edges.
    fn find_closest(&self, lat: f64, lon: f64) -> Option<Snap>;
}

/// [LocationIndex] backed by a [KDTree] of all nodes with at least one accepted edge.
///
/// A query is first resolved to the nearest such node. Any accepted edge passing closer
/// than the best projection found so far must have an end node within that distance
/// plus the length of the longest accepted edge, so all edges incident to such nodes
/// are projected onto, and the closest projection wins.
#[derive(Debug)]
pub struct KdLocationIndex<'g, F: EdgeFilter> {
    graph: &'g Graph,
    tree: Option<KDTree>,
    filter: F,

    /// Straight-line length of the longest accepted edge, in meters
    max_edge_length: f64,
}

impl<'g, F: EdgeFilter> KdLocationIndex<'g, F> {
    pub fn new(graph: &'g Graph, filter: F) -> Self {
        let tree = KDTree::from_iter(
            graph
                .iter()
                .filter(|n| graph.adjacent_edges(n.id).any(|(e, _)| filter.accept(e)))
                .copied(),
        );

        let max_edge_length = graph
            .edges()
            .filter(|e| filter.accept(e))
            .filter_map(|e| {
                let a = graph.get_node(e.base_node)?;
                let b = graph.get_node(e.adj_node)?;
                Some(earth_distance_m(a.lat, a.lon, b.lat, b.lon))
            })
            .fold(0.0, f64::max);

        Self {
            graph,
            tree,
            filter,
            max_edge_length,
        }
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// Projects the query onto a single edge, if it is accepted and both of its nodes exist.
    fn project(&self, edge: &EdgeState, lat: f64, lon: f64) -> Option<Snap> {
        if !self.filter.accept(edge) {
            return None;
        }

        let a = self.graph.get_node(edge.base_node)?;
        let b = self.graph.get_node(edge.adj_node)?;

        let (fraction, snapped_lat, snapped_lon) =
            project_onto_segment(lat, lon, a.lat, a.lon, b.lat, b.lon);
        let query_distance = earth_distance_m(lat, lon, snapped_lat, snapped_lon);

        let (closest_node, position) = if fraction <= 0.0 {
            (a.id, SnapPosition::Tower)
        } else if fraction >= 1.0 {
            (b.id, SnapPosition::Tower)
        } else if fraction < 0.5 {
            (a.id, SnapPosition::Edge { fraction })
        } else {
            (b.id, SnapPosition::Edge { fraction })
        };

        Some(Snap {
            query_lat: lat,
            query_lon: lon,
            snapped_lat,
            snapped_lon,
            query_distance,
            closest_node,
            closest_edge: *edge,
            position,
        })
    }

    /// Returns the closest snap onto any accepted edge incident to the given nodes.
    /// Ties resolve to the edge with the lowest id.
    fn closest_snap(&self, nodes: &[Node], lat: f64, lon: f64) -> Option<Snap> {
        let mut edges: Vec<&EdgeState> = nodes
            .iter()
            .flat_map(|n| self.graph.adjacent_edges(n.id).map(|(e, _)| e))
            .collect();
        edges.sort_by_key(|e| e.id);
        edges.dedup_by_key(|e| e.id);

        edges
            .into_iter()
            .filter_map(|e| self.project(e, lat, lon))
            .fold(None, |best: Option<Snap>, s| match best {
                Some(b) if b.query_distance <= s.query_distance => Some(b),
                _ => Some(s),
            })
    }
}

impl<F: EdgeFilter> LocationIndex for KdLocationIndex<'_, F> {
    fn find_closest(&self, lat: f64, lon: f64) -> Option<Snap> {
        let tree = self.tree.as_ref()?;
        let (nearest, nearest_distance) = tree.find_nearest_node_with_distance(lat, lon);

        let bound = self
            .closest_snap(&[nearest], lat, lon)
            .map_or(nearest_distance, |s| s.query_distance);

        // Small slack for the flat projection math
        let radius = (bound + self.max_edge_length) * 1.01 + 1.0;
        let candidates = tree.find_nodes_within(lat, lon, radius);
        self.closest_snap(&candidates, lat, lon)
    }
}
