// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::{FixedRecordStore, RecordSchema};

/// Green (vegetation) index level of an edge, one byte per edge.
///
/// Levels are in `0..=254`; `0xFF` marks edges without a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GreenIndex;

impl RecordSchema for GreenIndex {
    type Value = Option<u8>;

    const NAME: &'static str = "ext_greenindex";
    const RECORD_SIZE: usize = 1;
    const DEFAULT: Option<u8> = None;

    #[inline]
    fn encode(value: Option<u8>, out: &mut [u8]) {
        out[0] = value.unwrap_or(u8::MAX);
    }

    #[inline]
    fn decode(record: &[u8]) -> Option<u8> {
        match record[0] {
            u8::MAX => None,
            level => Some(level),
        }
    }
}

pub type GreenIndexStorage = FixedRecordStore<GreenIndex>;
