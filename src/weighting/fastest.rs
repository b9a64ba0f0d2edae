// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::{travel_time, Weighting};
use crate::{EdgeId, EdgeState};

/// Fastest-route weighting: the cost of an edge is its [travel time](travel_time) in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FastestWeighting;

impl Weighting for FastestWeighting {
    fn weight(&self, edge: &EdgeState, reverse: bool, _: Option<EdgeId>) -> f64 {
        let speed = edge.speed(reverse);
        if speed == 0.0 {
            f64::INFINITY
        } else {
            travel_time(edge.distance, speed)
        }
    }

    fn name(&self) -> &str {
        "fastest"
    }
}
