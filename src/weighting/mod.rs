// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Edge cost functions consumed by path search.
//!
//! Every [Weighting] maps an edge, traversed in a given direction, onto a
//! non-negative cost. [f64::INFINITY] marks edges which can't be traversed.
//! Weightings only borrow read-only [attribute stores](crate::storage), and
//! can be shared between threads.

use crate::{EdgeId, EdgeState};

mod distance;
mod fastest;
mod green;
mod priority;
mod traffic;

pub use distance::DistanceWeighting;
pub use fastest::FastestWeighting;
pub use green::GreenWeighting;
pub use priority::PriorityWeighting;
pub use traffic::{
    AvoidEdgeInfo, TrafficAvoidWeighting, TrafficError, TrafficEventInfo, TrafficEventTable,
    TrafficMode,
};

/// Error conditions when constructing a [Weighting].
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum WeightingError {
    #[error("intensity must be in [0, 1], got {0}")]
    InvalidIntensity(f64),

    #[error("number of levels must be positive")]
    InvalidLevels,
}

/// Cost function of traversing an edge.
pub trait Weighting: Send + Sync {
    /// Returns the cost of traversing `edge`, backwards if `reverse` is set.
    ///
    /// `prev_or_next_edge` is the edge preceding (or, in backward searches, following)
    /// `edge` on the route, if any.
    fn weight(&self, edge: &EdgeState, reverse: bool, prev_or_next_edge: Option<EdgeId>) -> f64;

    /// Identifier of the weighting.
    fn name(&self) -> &str;
}

/// Returns the time (in seconds) needed to travel `distance` meters at `speed` km/h.
#[inline]
pub fn travel_time(distance: f64, speed: f64) -> f64 {
    distance * 3600.0 / (1000.0 * speed)
}
