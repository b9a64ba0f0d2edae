// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::{FastestWeighting, Weighting};
use crate::priority::PriorityClass;
use crate::{EdgeId, EdgeState};

/// Divides the [travel time](FastestWeighting) of an edge by `0.5 + code / 15`,
/// where `code` is the [numeric code](PriorityClass::code) of the edge's priority.
/// [PriorityClass::Best] edges get their time reduced by 1.5x, while
/// [PriorityClass::ReachDest] edges get it nearly doubled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityWeighting;

impl Weighting for PriorityWeighting {
    fn weight(&self, edge: &EdgeState, reverse: bool, prev_or_next_edge: Option<EdgeId>) -> f64 {
        let time = FastestWeighting.weight(edge, reverse, prev_or_next_edge);
        time / (0.5 + edge.priority.factor())
    }

    fn name(&self) -> &str {
        "priority"
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::edge;
    use super::*;

    #[test]
    fn better_priorities_are_cheaper() {
        let mut e = edge(0, 1000.0, 50.0, 50.0);
        e.priority = PriorityClass::Best;
        assert_eq!(PriorityWeighting.weight(&e, false, None), 48.0);

        let weights: Vec<f64> = PriorityClass::ALL
            .iter()
            .map(|&p| {
                e.priority = p;
                PriorityWeighting.weight(&e, false, None)
            })
            .collect();
        assert!(weights.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn impassable_stays_impassable() {
        let e = edge(0, 1000.0, 0.0, 50.0);
        assert_eq!(PriorityWeighting.weight(&e, false, None), f64::INFINITY);
    }
}
