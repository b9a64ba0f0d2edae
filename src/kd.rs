// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{earth_distance_m, Node};

/// KDTree implements the [k-d tree data structure](https://en.wikipedia.org/wiki/K-d_tree),
/// used to speed up nearest-neighbor search when snapping many coordinates onto a [Graph](crate::Graph).
///
/// This implementation assumes euclidean geometry, even though distances are
/// reported with [earth_distance_m]. This results in undefined behavior when points
/// are close to the ante meridian (180°/-180° longitude) or poles (90°/-90° latitude),
/// or when the data spans multiple continents.
#[derive(Debug, Clone)]
pub struct KDTree {
    pivot: Node,
    left: Option<Box<KDTree>>,
    right: Option<Box<KDTree>>,
}

impl KDTree {
    /// Finds the closest [Node] to the given position.
    pub fn find_nearest_node(&self, lat: f64, lon: f64) -> Node {
        self.find_nearest_node_with_distance(lat, lon).0
    }

    /// Finds the closest [Node] to the given position, together with
    /// the distance to it in meters.
    pub fn find_nearest_node_with_distance(&self, lat: f64, lon: f64) -> (Node, f64) {
        self.find_nearest_node_impl(lat, lon, false)
    }

    fn find_nearest_node_impl(&self, lat: f64, lon: f64, lon_divides: bool) -> (Node, f64) {
        let mut best = self.pivot;
        let mut best_dist = earth_distance_m(lat, lon, best.lat, best.lon);

        let first_left = if lon_divides {
            lon < best.lon
        } else {
            lat < best.lat
        };
        let (first, second) = if first_left {
            (&self.left, &self.right)
        } else {
            (&self.right, &self.left)
        };

        if let Some(ref branch) = first {
            let (alt, alt_dist) = branch.find_nearest_node_impl(lat, lon, !lon_divides);
            if alt_dist < best_dist {
                best = alt;
                best_dist = alt_dist;
            }
        }

        if let Some(ref branch) = second {
            // A closer node is possible in the second branch if and only if
            // the splitting axis is closer than the current best candidate.
            let (axis_lat, axis_lon) = if lon_divides {
                (lat, self.pivot.lon)
            } else {
                (self.pivot.lat, lon)
            };
            let dist_to_axis = earth_distance_m(lat, lon, axis_lat, axis_lon);

            if dist_to_axis < best_dist {
                let (alt, alt_dist) = branch.find_nearest_node_impl(lat, lon, !lon_divides);
                if alt_dist < best_dist {
                    best = alt;
                    best_dist = alt_dist;
                }
            }
        }

        (best, best_dist)
    }

    /// Returns all [Nodes](Node) not farther than `radius` meters from the given position,
    /// in no particular order.
    pub fn find_nodes_within(&self, lat: f64, lon: f64, radius: f64) -> Vec<Node> {
        let mut found = Vec::default();
        self.find_nodes_within_impl(lat, lon, radius, false, &mut found);
        found
    }

    fn find_nodes_within_impl(
        &self,
        lat: f64,
        lon: f64,
        radius: f64,
        lon_divides: bool,
        found: &mut Vec<Node>,
    ) {
        if earth_distance_m(lat, lon, self.pivot.lat, self.pivot.lon) <= radius {
            found.push(self.pivot);
        }

        let (first_left, axis_lat, axis_lon) = if lon_divides {
            (lon < self.pivot.lon, lat, self.pivot.lon)
        } else {
            (lat < self.pivot.lat, self.pivot.lat, lon)
        };
        let (first, second) = if first_left {
            (&self.left, &self.right)
        } else {
            (&self.right, &self.left)
        };

        if let Some(ref branch) = first {
            branch.find_nodes_within_impl(lat, lon, radius, !lon_divides, found);
        }

        if let Some(ref branch) = second {
            if earth_distance_m(lat, lon, axis_lat, axis_lon) <= radius {
                branch.find_nodes_within_impl(lat, lon, radius, !lon_divides, found);
            }
        }
    }

    /// Builds a k-d tree from an iterable of [Nodes](Node).
    pub fn from_iter<I: IntoIterator<Item = Node>>(nodes: I) -> Option<Self> {
        let mut nodes = nodes.into_iter().collect::<Vec<_>>();
        Self::build(nodes.as_mut_slice())
    }

    /// Builds a k-d tree from a mutable slice of [Nodes](Node). Nodes will be reordered
    /// in the slice to facilitate building the tree.
    pub fn build(nodes: &mut [Node]) -> Option<Self> {
        Self::build_impl(nodes, false)
    }

    fn build_impl(nodes: &mut [Node], lon_divides: bool) -> Option<Self> {
        match nodes.len() {
            0 => None,
            1 => Some(Self {
                pivot: nodes[0],
                left: None,
                right: None,
            }),
            _ => {
                if lon_divides {
                    nodes.sort_by(|a, b| a.lon.total_cmp(&b.lon));
                } else {
                    nodes.sort_by(|a, b| a.lat.total_cmp(&b.lat));
                }
                let median = nodes.len() / 2;
                let pivot = nodes[median];
                let (left, right_and_pivot) = nodes.split_at_mut(median);
                let right = &mut right_and_pivot[1..];
                Some(Self {
                    pivot,
                    left: Self::build_impl(left, !lon_divides).map(Box::new),
                    right: Self::build_impl(right, !lon_divides).map(Box::new),
                })
            }
        }
    }
}
