// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::ops::{BitOr, BitOrAssign};

use super::{FixedRecordStore, RecordSchema};

/// Set of vehicle kinds for which a way is tolled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TollwayType(pub i32);

impl TollwayType {
    pub const NONE: Self = Self(0);

    /// Toll applies to all vehicles.
    pub const GENERAL: Self = Self(1);

    /// Toll applies to heavy goods vehicles.
    pub const HGV: Self = Self(2);

    /// Toll applies to light commercial vehicles (EU category N1).
    pub const N1: Self = Self(4);

    /// Toll applies to medium goods vehicles (EU category N2).
    pub const N2: Self = Self(8);

    /// Toll applies to heavy goods vehicles (EU category N3).
    pub const N3: Self = Self(16);

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Checks whether any of the kinds in `other` is tolled.
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for TollwayType {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for TollwayType {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Toll flags of an edge, as a 4-byte big-endian integer per edge.
///
/// Stored values are non-negative [TollwayType] bitmasks; `-1` marks edges without a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tollways;

impl RecordSchema for Tollways {
    type Value = Option<i32>;

    const NAME: &'static str = "ext_tollways";
    const RECORD_SIZE: usize = 4;
    const DEFAULT: Option<i32> = None;

    #[inline]
    fn encode(value: Option<i32>, out: &mut [u8]) {
        out.copy_from_slice(&value.unwrap_or(-1).to_be_bytes());
    }

    #[inline]
    fn decode(record: &[u8]) -> Option<i32> {
        let v = i32::from_be_bytes([record[0], record[1], record[2], record[3]]);
        if v < 0 {
            None
        } else {
            Some(v)
        }
    }
}

pub type TollwaysStorage = FixedRecordStore<Tollways>;

impl TollwaysStorage {
    /// Returns the [TollwayType] of an edge; edges without a value are not tolled.
    pub fn tollway_type(&self, edge: crate::EdgeId) -> TollwayType {
        self.get(edge).map(TollwayType).unwrap_or_default()
    }
}
