// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Discrete desirability classes of edges, and their resolution
//! from conflicting tag-derived candidates.

/// Ordered desirability rank of an edge for a specific routing profile.
///
/// The numeric [code](PriorityClass::code) of each class fits in 4 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum PriorityClass {
    ReachDest,
    AvoidAtAllCosts,
    AvoidIfPossible,
    #[default]
    Unchanged,
    Prefer,
    VeryNice,
    Best,
}

impl PriorityClass {
    /// All classes, from the worst to the best.
    pub const ALL: [Self; 7] = [
        Self::ReachDest,
        Self::AvoidAtAllCosts,
        Self::AvoidIfPossible,
        Self::Unchanged,
        Self::Prefer,
        Self::VeryNice,
        Self::Best,
    ];

    /// Returns the numeric code of this class, in `1..=15`.
    pub fn code(self) -> u8 {
        match self {
            Self::ReachDest => 1,
            Self::AvoidAtAllCosts => 2,
            Self::AvoidIfPossible => 5,
            Self::Unchanged => 7,
            Self::Prefer => 10,
            Self::VeryNice => 12,
            Self::Best => 15,
        }
    }

    /// Returns the code of this class normalized to `(0, 1]`, with [PriorityClass::Best] being 1.
    pub fn factor(self) -> f64 {
        self.code() as f64 / Self::Best.code() as f64
    }

    /// Converts a [`class:bicycle`](https://wiki.openstreetmap.org/wiki/Key:class:bicycle) value.
    /// Unknown values map to [PriorityClass::Unchanged].
    pub fn from_class_value(value: &str) -> Self {
        match value.trim() {
            "3" => Self::Best,
            "2" => Self::VeryNice,
            "1" => Self::Prefer,
            "0" => Self::Unchanged,
            "-1" => Self::AvoidIfPossible,
            "-2" => Self::ReachDest,
            "-3" => Self::AvoidAtAllCosts,
            _ => Self::Unchanged,
        }
    }
}

/// A priority proposed by a single tag rule, together with
/// the confidence `weight` the rule has in its proposal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityCandidate {
    pub weight: f64,
    pub class: PriorityClass,
}

impl PriorityCandidate {
    pub fn new(weight: f64, class: PriorityClass) -> Self {
        Self { weight, class }
    }
}

/// Resolves a sequence of candidates into a single [PriorityClass].
///
/// The candidate with the highest weight wins; among candidates with equal weights
/// the last one wins. Candidates with a NaN weight are ignored. Without any candidates,
/// [PriorityClass::Unchanged] is returned.
pub fn classify(candidates: &[PriorityCandidate]) -> PriorityClass {
    candidates
        .iter()
        .filter(|c| !c.weight.is_nan())
        .fold(None, |best: Option<&PriorityCandidate>, c| match best {
            Some(b) if b.weight > c.weight => Some(b),
            _ => Some(c),
        })
        .map(|c| c.class)
        .unwrap_or_default()
}
