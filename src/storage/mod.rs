// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Compact, persistent per-edge attribute stores.
//!
//! Every store keeps one fixed-size record per [edge id](crate::EdgeId) in a growable
//! [DataAccess] buffer. The layout of a record is described by a [RecordSchema];
//! [GreenIndex], [Tollways] and [TrailDifficulty] are the provided ones.
//!
//! Persisted stores start with a header: slot 0 holds the record size in bytes,
//! slot 1 the number of edges which had a value explicitly set.

use std::io;

use crate::Graph;

mod data_access;
mod graph_storage;
mod green_index;
mod record;
mod tollways;
mod trail_difficulty;

pub use data_access::{DataAccess, Directory, DEFAULT_SEGMENT_SIZE, HEADER_SLOTS};
pub use graph_storage::GraphStorage;
pub use green_index::{GreenIndex, GreenIndexStorage};
pub use record::{FixedRecordStore, RecordSchema};
pub use tollways::{TollwayType, Tollways, TollwaysStorage};
pub use trail_difficulty::{TrailDifficulty, TrailDifficultyStorage, TrailDifficultyValues};

/// Error conditions of attribute stores.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// [GraphExtension::init] was called more than once, or after values were written.
    #[error("{0}: already initialized")]
    DoubleInit(String),

    /// A lifecycle operation requiring [GraphExtension::init] was called before it.
    #[error("{0}: not initialized")]
    NotInitialized(String),

    /// The persisted data is missing, truncated or otherwise unreadable.
    #[error("{name}: corrupt store: {reason}")]
    CorruptStore { name: String, reason: &'static str },

    /// The persisted record size is different from the record size of the store.
    #[error("{name}: corrupt store: record size is {found}, expected {expected}")]
    RecordSizeMismatch {
        name: String,
        expected: u32,
        found: i32,
    },

    /// Attempt to load a store from an in-memory [Directory].
    #[error("{0}: in-memory storage can't be loaded")]
    NotPersistent(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Returns `true` if the error indicates damaged or incompatible persisted data.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::CorruptStore { .. } | Self::RecordSizeMismatch { .. }
        )
    }
}

/// Lifecycle contract of per-edge data attached to a [Graph].
///
/// The expected call order is [init](GraphExtension::init), then either
/// [create](GraphExtension::create) (when building) or
/// [load_existing](GraphExtension::load_existing) (when querying),
/// followed by any number of [flush](GraphExtension::flush) calls and a final
/// [close](GraphExtension::close).
pub trait GraphExtension {
    /// Name of the extension, also used as the name of its file in a [Directory].
    fn name(&self) -> &str;

    /// Binds the extension to a graph and a storage directory. May only be called once.
    fn init(&mut self, graph: &Graph, dir: &Directory) -> Result<(), StorageError>;

    /// Allocates empty storage for `initial_edges` edges.
    fn create(&mut self, initial_edges: usize) -> Result<(), StorageError>;

    /// Reads previously flushed data from the storage directory.
    fn load_existing(&mut self) -> Result<(), StorageError>;

    /// Persists the extension into the storage directory.
    fn flush(&mut self) -> Result<(), StorageError>;

    /// Overwrites `other` with a copy of this extension's data.
    fn copy_to(&self, other: &mut Self) -> Result<(), StorageError>
    where
        Self: Sized;

    /// Releases all held resources.
    fn close(&mut self);

    /// Returns the number of allocated bytes.
    fn capacity(&self) -> usize;
}
