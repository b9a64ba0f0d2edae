// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fmt::Debug;
use std::marker::PhantomData;

use super::{DataAccess, Directory, GraphExtension, StorageError};
use crate::{EdgeId, Graph};

/// Largest supported [RecordSchema::RECORD_SIZE].
const MAX_RECORD_SIZE: usize = 16;

/// Describes how values of a single per-edge attribute are packed into fixed-size records.
pub trait RecordSchema {
    type Value: Copy + Debug + PartialEq;

    /// Name of stores using this schema, used as the file name in a [Directory].
    const NAME: &'static str;

    /// Width of every record, in bytes. Must not exceed 16.
    const RECORD_SIZE: usize;

    /// Value returned for edges which were never set.
    const DEFAULT: Self::Value;

    /// Packs a value into `out`, which is exactly [RecordSchema::RECORD_SIZE] bytes long.
    fn encode(value: Self::Value, out: &mut [u8]);

    /// Unpacks a value from `record`, which is exactly [RecordSchema::RECORD_SIZE] bytes long.
    fn decode(record: &[u8]) -> Self::Value;
}

/// Per-edge attribute store with one [RecordSchema::RECORD_SIZE]-byte record per edge id.
///
/// A fresh store lives in memory; [GraphExtension::init] binds it to a [Directory]
/// so that it can be flushed and loaded.
#[derive(Debug, Clone)]
pub struct FixedRecordStore<S: RecordSchema> {
    data: DataAccess,
    initialized: bool,
    entries: u64,
    written: Vec<u64>,
    _schema: PhantomData<S>,
}

impl<S: RecordSchema> Default for FixedRecordStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: RecordSchema> FixedRecordStore<S> {
    pub fn new() -> Self {
        debug_assert!(S::RECORD_SIZE > 0 && S::RECORD_SIZE <= MAX_RECORD_SIZE);
        Self {
            data: Self::data_access(&Directory::InMemory),
            initialized: false,
            entries: 0,
            written: Vec::default(),
            _schema: PhantomData,
        }
    }

    fn data_access(dir: &Directory) -> DataAccess {
        let mut default = [0; MAX_RECORD_SIZE];
        S::encode(S::DEFAULT, &mut default[..S::RECORD_SIZE]);

        let mut data = dir.find(S::NAME);
        data.set_fill_pattern(&default[..S::RECORD_SIZE]);
        data
    }

    /// Stores the value for an edge, growing the store if necessary.
    /// Previous values are overwritten.
    pub fn set(&mut self, edge: EdgeId, value: S::Value) {
        let mut record = [0; MAX_RECORD_SIZE];
        S::encode(value, &mut record[..S::RECORD_SIZE]);
        self.data
            .set_bytes(edge as usize * S::RECORD_SIZE, &record[..S::RECORD_SIZE]);

        if self.mark_written(edge) {
            self.entries += 1;
        }
    }

    /// Retrieves the value of an edge, or [RecordSchema::DEFAULT] if it was never set.
    #[inline]
    pub fn get(&self, edge: EdgeId) -> S::Value {
        self.data
            .bytes(edge as usize * S::RECORD_SIZE, S::RECORD_SIZE)
            .map(S::decode)
            .unwrap_or(S::DEFAULT)
    }

    /// Returns the number of edges which had a value explicitly set.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn record_size(&self) -> usize {
        S::RECORD_SIZE
    }

    /// Returns `true` if `edge` was not yet written to by this instance.
    fn mark_written(&mut self, edge: EdgeId) -> bool {
        let word = edge as usize / 64;
        let bit = 1_u64 << (edge % 64);
        if word >= self.written.len() {
            self.written.resize(word + 1, 0);
        }

        let fresh = self.written[word] & bit == 0;
        self.written[word] |= bit;
        fresh
    }

    fn ensure_initialized(&self) -> Result<(), StorageError> {
        if self.initialized {
            Ok(())
        } else {
            Err(StorageError::NotInitialized(S::NAME.to_string()))
        }
    }
}

impl<S: RecordSchema> GraphExtension for FixedRecordStore<S> {
    fn name(&self) -> &str {
        S::NAME
    }

    fn init(&mut self, graph: &Graph, dir: &Directory) -> Result<(), StorageError> {
        if self.initialized || self.entries > 0 {
            return Err(StorageError::DoubleInit(S::NAME.to_string()));
        }

        self.data = Self::data_access(dir);
        self.initialized = true;
        log::debug!(
            "{}: initialized for a graph with {} edges",
            S::NAME,
            graph.edge_count()
        );
        Ok(())
    }

    fn create(&mut self, initial_edges: usize) -> Result<(), StorageError> {
        self.ensure_initialized()?;
        self.data.create(initial_edges * S::RECORD_SIZE);
        self.entries = 0;
        self.written.clear();
        Ok(())
    }

    fn load_existing(&mut self) -> Result<(), StorageError> {
        self.ensure_initialized()?;
        self.data.load_existing()?;

        let found = self.data.header(0);
        if found != S::RECORD_SIZE as i32 {
            return Err(StorageError::RecordSizeMismatch {
                name: S::NAME.to_string(),
                expected: S::RECORD_SIZE as u32,
                found,
            });
        }

        self.entries = self.data.header(1).max(0) as u64;
        self.written.clear();
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        self.ensure_initialized()?;

        let entries = i32::try_from(self.entries).unwrap_or_else(|_| {
            log::warn!("{}: entry count {} saturated in header", S::NAME, self.entries);
            i32::MAX
        });
        self.data.set_header(0, S::RECORD_SIZE as i32);
        self.data.set_header(1, entries);
        self.data.flush()
    }

    fn copy_to(&self, other: &mut Self) -> Result<(), StorageError> {
        self.data.copy_to(&mut other.data);
        other.entries = self.entries;
        other.written.clone_from(&self.written);
        Ok(())
    }

    fn close(&mut self) {
        self.data.close();
    }

    fn capacity(&self) -> usize {
        self.data.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::super::{
        GreenIndex, GreenIndexStorage, TollwayType, TollwaysStorage, TrailDifficultyStorage,
        TrailDifficultyValues,
    };
    use super::*;

    #[test]
    fn unset_edges_return_default() {
        let mut s = GreenIndexStorage::new();
        assert_eq!(s.get(0), None);
        assert_eq!(s.get(1_000_000), None);

        s.set(3, Some(12));
        assert_eq!(s.get(3), Some(12));
        assert_eq!(s.get(2), None);
        assert_eq!(s.get(4), None);
    }

    #[test]
    fn entries_count_distinct_edges() {
        let mut s = TollwaysStorage::new();
        s.set(5, Some(1));
        s.set(5, Some(3));
        s.set(70, Some(0));
        assert_eq!(s.entries(), 2);
        assert_eq!(s.get(5), Some(3));
    }

    #[test]
    fn double_init() {
        let g = Graph::default();
        let dir = Directory::in_memory();

        let mut s = GreenIndexStorage::new();
        assert!(s.init(&g, &dir).is_ok());
        assert!(matches!(s.init(&g, &dir), Err(StorageError::DoubleInit(_))));

        let mut written = GreenIndexStorage::new();
        written.set(0, Some(1));
        assert!(matches!(
            written.init(&g, &dir),
            Err(StorageError::DoubleInit(_))
        ));
    }

    #[test]
    fn lifecycle_requires_init() {
        let mut s = GreenIndexStorage::new();
        assert!(matches!(s.create(10), Err(StorageError::NotInitialized(_))));
        assert!(matches!(s.flush(), Err(StorageError::NotInitialized(_))));
    }

    #[test]
    fn flush_and_load_existing() -> Result<(), StorageError> {
        let tmp = tempfile::tempdir()?;
        let dir = Directory::on_disk(tmp.path());
        let g = Graph::default();

        let mut s = GreenIndexStorage::new();
        s.init(&g, &dir)?;
        s.create(100)?;
        s.set(0, Some(0));
        s.set(99, Some(63));
        s.set(150, Some(7));
        s.flush()?;

        let mut loaded = GreenIndexStorage::new();
        loaded.init(&g, &dir)?;
        loaded.load_existing()?;
        assert_eq!(loaded.entries(), 3);
        assert_eq!(loaded.get(0), Some(0));
        assert_eq!(loaded.get(99), Some(63));
        assert_eq!(loaded.get(150), Some(7));
        assert_eq!(loaded.get(1), None);
        Ok(())
    }

    #[test]
    fn wide_records_do_not_alias() -> Result<(), StorageError> {
        let tmp = tempfile::tempdir()?;
        let dir = Directory::on_disk(tmp.path());
        let g = Graph::default();

        let tolls = [
            (TollwayType::GENERAL | TollwayType::N3).0,
            0x0102_0304,
            i32::MAX,
            0,
        ];
        let trails = [
            TrailDifficultyValues { hiking: 6, mtb: 15, mtb_uphill: 0 },
            TrailDifficultyValues { hiking: 0, mtb: 0, mtb_uphill: 15 },
            TrailDifficultyValues { hiking: 255, mtb: 7, mtb_uphill: 6 },
            TrailDifficultyValues { hiking: 1, mtb: 1, mtb_uphill: 1 },
        ];

        let mut t = TollwaysStorage::new();
        let mut d = TrailDifficultyStorage::new();
        t.init(&g, &dir)?;
        d.init(&g, &dir)?;
        t.create(2)?;
        d.create(2)?;
        for (i, (&toll, &trail)) in tolls.iter().zip(&trails).enumerate() {
            t.set(10 + i as EdgeId, Some(toll));
            d.set(10 + i as EdgeId, trail);
        }
        t.flush()?;
        d.flush()?;

        let mut t2 = TollwaysStorage::new();
        let mut d2 = TrailDifficultyStorage::new();
        t2.init(&g, &dir)?;
        d2.init(&g, &dir)?;
        t2.load_existing()?;
        d2.load_existing()?;

        for (s, name) in [(&t, "written"), (&t2, "loaded")] {
            let got: Vec<Option<i32>> = (9..15).map(|e| s.get(e)).collect();
            let mut expected = vec![None];
            expected.extend(tolls.iter().map(|&v| Some(v)));
            expected.push(None);
            assert_eq!(got, expected, "{name} tollways");
            assert_eq!(s.entries(), 4);
        }

        for (s, name) in [(&d, "written"), (&d2, "loaded")] {
            let got: Vec<TrailDifficultyValues> = (9..15).map(|e| s.get(e)).collect();
            let mut expected = vec![TrailDifficultyValues::default()];
            expected.extend_from_slice(&trails);
            expected.push(TrailDifficultyValues::default());
            assert_eq!(got, expected, "{name} trail difficulty");
            assert_eq!(s.entries(), 4);
        }
        Ok(())
    }

    #[test]
    fn load_rejects_record_size_mismatch() -> Result<(), StorageError> {
        let tmp = tempfile::tempdir()?;
        let dir = Directory::on_disk(tmp.path());

        let mut da = dir.find(GreenIndex::NAME);
        da.create(8);
        da.set_header(0, 4);
        da.flush()?;

        let mut s = GreenIndexStorage::new();
        s.init(&Graph::default(), &dir)?;
        let err = s.load_existing().unwrap_err();
        assert!(err.is_corruption());
        assert!(matches!(
            err,
            StorageError::RecordSizeMismatch {
                expected: 1,
                found: 4,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn copies_are_independent() -> Result<(), StorageError> {
        let mut s = GreenIndexStorage::new();
        s.set(1, Some(10));

        let mut copy = GreenIndexStorage::new();
        s.copy_to(&mut copy)?;
        let cloned = s.clone();

        s.set(1, Some(20));
        s.set(2, Some(30));

        assert_eq!(copy.get(1), Some(10));
        assert_eq!(copy.get(2), None);
        assert_eq!(copy.entries(), 1);
        assert_eq!(cloned.get(1), Some(10));
        assert_eq!(cloned.entries(), 1);
        assert_eq!(s.entries(), 2);
        Ok(())
    }
}
