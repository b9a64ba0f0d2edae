// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::Weighting;
use crate::{EdgeId, EdgeState};

/// Shortest-distance weighting: the cost of an edge is its length in meters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistanceWeighting;

impl Weighting for DistanceWeighting {
    fn weight(&self, edge: &EdgeState, reverse: bool, _: Option<EdgeId>) -> f64 {
        if edge.speed(reverse) == 0.0 {
            f64::INFINITY
        } else {
            edge.distance
        }
    }

    fn name(&self) -> &str {
        "distance"
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::edge;
    use super::*;

    #[test]
    fn distance() {
        let e = edge(0, 250.0, 50.0, 0.0);
        assert_eq!(DistanceWeighting.weight(&e, false, None), 250.0);
        assert_eq!(DistanceWeighting.weight(&e, true, None), f64::INFINITY);
    }
}
