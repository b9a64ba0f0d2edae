// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::{FastestWeighting, Weighting, WeightingError};
use crate::storage::GreenIndexStorage;
use crate::{EdgeId, EdgeState};

/// Scales the [travel time](FastestWeighting) of an edge by a factor
/// depending on the green index level of the edge.
///
/// For `L` levels and an intensity `i`, the factor of level `l` is
/// `1 - (1 - (l + 1) * 2 / L) * i`. Edges without a level, levels outside of `0..L`
/// and graphs without a green index store use a factor of 1.
#[derive(Debug, Clone)]
pub struct GreenWeighting<'a> {
    storage: Option<&'a GreenIndexStorage>,
    factors: Vec<f64>,
}

impl<'a> GreenWeighting<'a> {
    pub fn new(
        storage: Option<&'a GreenIndexStorage>,
        levels: u8,
        intensity: f64,
    ) -> Result<Self, WeightingError> {
        if !(0.0..=1.0).contains(&intensity) {
            return Err(WeightingError::InvalidIntensity(intensity));
        }
        if levels == 0 {
            return Err(WeightingError::InvalidLevels);
        }

        let total = levels as f64;
        let factors = (0..levels)
            .map(|level| 1.0 - (1.0 - (level as f64 + 1.0) * 2.0 / total) * intensity)
            .collect();

        Ok(Self { storage, factors })
    }

    /// Returns the multiplier applied to the travel time of edges with the given level.
    pub fn factor(&self, level: Option<u8>) -> f64 {
        level
            .and_then(|l| self.factors.get(l as usize))
            .copied()
            .unwrap_or(1.0)
    }
}

impl Weighting for GreenWeighting<'_> {
    fn weight(&self, edge: &EdgeState, reverse: bool, prev_or_next_edge: Option<EdgeId>) -> f64 {
        let time = FastestWeighting.weight(edge, reverse, prev_or_next_edge);
        match self.storage {
            Some(s) => time * self.factor(s.get(edge.original_edge)),
            None => time,
        }
    }

    fn name(&self) -> &str {
        "green"
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::edge;
    use super::*;

    #[test]
    fn zero_intensity_is_neutral() {
        let w = GreenWeighting::new(None, 64, 0.0).unwrap();
        for level in 0..64 {
            assert_eq!(w.factor(Some(level)), 1.0);
        }
    }

    #[test]
    fn factor_is_monotonic() {
        let w = GreenWeighting::new(None, 64, 0.7).unwrap();
        for level in 1..64 {
            assert!(w.factor(Some(level)) >= w.factor(Some(level - 1)));
        }
        assert!(w.factor(Some(0)) > 0.0);
    }

    #[test]
    fn known_factors() {
        let w = GreenWeighting::new(None, 4, 1.0).unwrap();
        assert_eq!(w.factor(Some(0)), 0.5);
        assert_eq!(w.factor(Some(1)), 1.0);
        assert_eq!(w.factor(Some(3)), 2.0);
        assert_eq!(w.factor(Some(4)), 1.0);
        assert_eq!(w.factor(None), 1.0);
    }

    #[test]
    fn invalid_intensity() {
        assert!(matches!(
            GreenWeighting::new(None, 64, 1.5),
            Err(WeightingError::InvalidIntensity(_))
        ));
        assert!(GreenWeighting::new(None, 64, f64::NAN).is_err());
        assert!(matches!(
            GreenWeighting::new(None, 0, 0.5),
            Err(WeightingError::InvalidLevels)
        ));
    }

    #[test]
    fn uses_original_edge() {
        let mut store = GreenIndexStorage::new();
        store.set(7, Some(0));
        let w = GreenWeighting::new(Some(&store), 4, 1.0).unwrap();

        let mut e = edge(42, 1000.0, 50.0, 50.0);
        assert_eq!(w.weight(&e, false, None), 72.0);

        e.original_edge = 7;
        assert_eq!(w.weight(&e, false, None), 36.0);
    }

    #[test]
    fn absent_store_degrades_to_fastest() {
        let w = GreenWeighting::new(None, 64, 1.0).unwrap();
        assert_eq!(w.weight(&edge(0, 1000.0, 50.0, 0.0), false, None), 72.0);
        assert_eq!(w.weight(&edge(0, 1000.0, 50.0, 0.0), true, None), f64::INFINITY);
    }
}
