// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::{FixedRecordStore, RecordSchema};

/// Encoded difficulty classes of a trail.
///
/// Every field is 0 when unclassified. `hiking` holds the SAC grade directly,
/// the MTB fields hold the tagged scale + 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TrailDifficultyValues {
    /// [sac_scale](https://wiki.openstreetmap.org/wiki/Key:sac_scale), 1 (hiking) to 6.
    pub hiking: u8,

    /// [mtb:scale](https://wiki.openstreetmap.org/wiki/Key:mtb:scale), at most 15.
    pub mtb: u8,

    /// `mtb:scale:uphill`, at most 15.
    pub mtb_uphill: u8,
}

impl TrailDifficultyValues {
    /// Returns the SAC hiking scale (1 = hiking, 6 = difficult alpine hiking), if classified.
    pub fn hiking_scale(&self) -> Option<u8> {
        (self.hiking > 0).then_some(self.hiking)
    }

    /// Returns the MTB scale (or the MTB uphill scale) as tagged, if classified.
    pub fn mtb_scale(&self, uphill: bool) -> Option<u8> {
        let encoded = if uphill { self.mtb_uphill } else { self.mtb };
        encoded.checked_sub(1)
    }
}

/// Trail difficulty of an edge, two bytes per edge.
///
/// Byte 0 holds the hiking scale; byte 1 holds the MTB scale
/// in its high nibble and the MTB uphill scale in its low nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailDifficulty;

impl RecordSchema for TrailDifficulty {
    type Value = TrailDifficultyValues;

    const NAME: &'static str = "ext_traildifficulty";
    const RECORD_SIZE: usize = 2;
    const DEFAULT: TrailDifficultyValues = TrailDifficultyValues {
        hiking: 0,
        mtb: 0,
        mtb_uphill: 0,
    };

    #[inline]
    fn encode(value: TrailDifficultyValues, out: &mut [u8]) {
        debug_assert!(value.mtb <= 0x0F && value.mtb_uphill <= 0x0F);
        out[0] = value.hiking;
        out[1] = (value.mtb << 4) | (value.mtb_uphill & 0x0F);
    }

    #[inline]
    fn decode(record: &[u8]) -> TrailDifficultyValues {
        TrailDifficultyValues {
            hiking: record[0],
            mtb: record[1] >> 4,
            mtb_uphill: record[1] & 0x0F,
        }
    }
}

pub type TrailDifficultyStorage = FixedRecordStore<TrailDifficulty>;
