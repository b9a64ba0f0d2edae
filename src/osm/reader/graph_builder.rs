// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashSet;

use crate::builders::GraphStorageBuilder;
use crate::priority::PriorityClass;
use crate::{earth_distance_m, Graph, Node};

use super::model::{Feature, Way};
use super::Options;

/// Helper object used for storing state related to converting [OSM features](Feature)
/// into a [Graph], while notifying [GraphStorageBuilders](GraphStorageBuilder)
/// about every created edge.
pub(super) struct GraphBuilder<'a, 'b> {
    g: &'a mut Graph,
    options: &'a Options<'a>,
    builders: &'a mut [&'b mut dyn GraphStorageBuilder],
    unused_nodes: HashSet<i64>,
    ignore_bbox: bool,
    ways: usize,
    skipped_ways: usize,
}

impl<'a, 'b> GraphBuilder<'a, 'b> {
    pub(super) fn new(
        g: &'a mut Graph,
        options: &'a Options<'a>,
        builders: &'a mut [&'b mut dyn GraphStorageBuilder],
    ) -> Self {
        let ignore_bbox =
            options.bbox.iter().all(|&x| x == 0.0) || options.bbox.iter().any(|x| !x.is_finite());
        if ignore_bbox && options.bbox.iter().any(|x| !x.is_finite()) {
            log::warn!("ignoring non-finite bounding box {:?}", options.bbox);
        }

        Self {
            g,
            options,
            builders,
            unused_nodes: HashSet::default(),
            ignore_bbox,
            ways: 0,
            skipped_ways: 0,
        }
    }

    /// Add all features from the provided iterator, stopping at the first error.
    pub(super) fn add_features<E, F: Iterator<Item = Result<Feature, E>>>(
        &mut self,
        features: F,
    ) -> Result<(), E> {
        for f in features {
            match f? {
                Feature::Node(n) => self.add_node(n),
                Feature::Way(w) => self.add_way(w),
            }
        }
        self.cleanup();
        Ok(())
    }

    fn cleanup(&mut self) {
        for &id in &self.unused_nodes {
            self.g.delete_node(id);
        }

        log::info!(
            "graph built with profile {}: {} nodes, {} edges from {} ways ({} ways skipped)",
            self.options.profile.name,
            self.g.len(),
            self.g.edge_count(),
            self.ways,
            self.skipped_ways,
        );
    }

    fn add_node(&mut self, n: Node) {
        if self.is_in_bbox(n.lat, n.lon) && self.g.get_node(n.id).is_none() {
            self.g.set_node(n);
            self.unused_nodes.insert(n.id);
        }
    }

    fn is_in_bbox(&self, lat: f64, lon: f64) -> bool {
        if self.ignore_bbox {
            return true;
        }
        let [min_lon, min_lat, max_lon, max_lat] = self.options.bbox;
        lat >= min_lat && lat <= max_lat && lon >= min_lon && lon <= max_lon
    }

    fn add_way(&mut self, w: Way) {
        let speed = self.options.profile.way_speed(&w.tags);
        if speed <= 0.0 {
            return;
        }

        let nodes = self.get_way_nodes(&w);
        if nodes.len() < 2 {
            log::warn!("way {} has less than 2 known nodes, skipping", w.id);
            self.skipped_ways += 1;
            return;
        }

        let (forward, backward) = self.options.profile.way_direction(&w.tags);
        let speed_forward = if forward { speed } else { 0.0 };
        let speed_backward = if backward { speed } else { 0.0 };
        let priority = self.options.profile.way_priority(&w.tags);

        if let Some(name) = w.tag("name") {
            self.g.set_way_name(w.id, name.to_string());
        }

        for b in self.builders.iter_mut() {
            b.process_way(&w);
        }

        self.create_edges(&w, &nodes, speed_forward, speed_backward, priority);
        for n in &nodes {
            self.unused_nodes.remove(&n.id);
        }
        self.ways += 1;
    }

    fn get_way_nodes(&self, w: &Way) -> Vec<Node> {
        let nodes: Vec<Node> = w
            .nodes
            .iter()
            .filter_map(|&id| self.g.get_node(id))
            .collect();

        if nodes.len() != w.nodes.len() {
            log::warn!(
                "way {} references {} unknown nodes",
                w.id,
                w.nodes.len() - nodes.len()
            );
        }
        nodes
    }

    fn create_edges(
        &mut self,
        w: &Way,
        nodes: &[Node],
        speed_forward: f64,
        speed_backward: f64,
        priority: PriorityClass,
    ) {
        for pair in nodes.windows(2) {
            let (left, right) = (pair[0], pair[1]);
            if left.id == right.id {
                continue;
            }

            let distance = earth_distance_m(left.lat, left.lon, right.lat, right.lon);
            let id = self.g.add_edge(
                left.id,
                right.id,
                distance,
                speed_forward,
                speed_backward,
                priority,
                w.id,
            );

            for b in self.builders.iter_mut() {
                b.process_edge(w, id);
            }
        }
    }
}
