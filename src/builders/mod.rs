// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Preprocessing components populating [attribute stores](crate::storage)
//! while a [Graph] is being built from OSM data.
//!
//! Builders are handed to [crate::osm::add_features_from_file] (and friends),
//! which calls [GraphStorageBuilder::process_way] once for every imported way,
//! and [GraphStorageBuilder::process_edge] once for every edge derived from it.

use std::io;

use crate::osm::Way;
use crate::storage::{Directory, StorageError};
use crate::{EdgeId, Graph};

mod green_index;
mod tollways;
mod trail_difficulty;

pub use green_index::{GreenIndexBuilder, GreenIndexOptions};
pub use tollways::TollwaysBuilder;
pub use trail_difficulty::TrailDifficultyBuilder;

/// Error conditions which abort preprocessing.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The external input of a builder could not be read.
    #[error("failed to read builder input: {0}")]
    Io(#[from] io::Error),

    /// The external input of a builder has no usable rows.
    #[error("no valid rows in builder input")]
    EmptyDataset,

    /// The requested number of levels can't be stored.
    #[error("invalid number of levels: {0} (expected 1..=254)")]
    InvalidLevels(u8),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A preprocessing component writing per-edge values into an attribute store.
pub trait GraphStorageBuilder {
    /// Name of the builder, used in logs.
    fn name(&self) -> &str;

    /// Binds the builder's store to the graph being built and to a storage directory.
    /// Fails if called more than once.
    fn init(&mut self, graph: &Graph, dir: &Directory) -> Result<(), BuildError>;

    /// Called once for every imported OSM way, before [GraphStorageBuilder::process_edge]
    /// is called for any of its edges.
    fn process_way(&mut self, _way: &Way) {}

    /// Called once for every edge derived from `way`.
    fn process_edge(&mut self, way: &Way, edge: EdgeId);
}

/// Returns `true` for the usual OSM spellings of a positive tag value.
pub(crate) fn is_yes(value: &str) -> bool {
    matches!(value, "yes" | "true" | "1")
}
