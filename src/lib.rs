// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Per-edge attributes and edge weighting for routing over
//! [OpenStreetMap](https://www.openstreetmap.org/) data.
//!
//! A [Graph] built from OSM data can be augmented with compact, persistent
//! per-edge attribute stores (see [storage]), which are populated during
//! graph construction by [builders]. At query time, [weighting] functions
//! combine the base cost of an edge with those attributes, tag-derived
//! [priority] classes and traffic event overrides. The [matrix] module
//! resolves batches of coordinates onto the graph, snapping every distinct
//! coordinate exactly once.
//!
//! # Example
//!
//! ```no_run
//! use routeattr::builders::{GraphStorageBuilder, GreenIndexBuilder, GreenIndexOptions};
//! use routeattr::storage::{Directory, GraphExtension};
//! use routeattr::weighting::{GreenWeighting, Weighting};
//!
//! let dir = Directory::on_disk("path/to/storage");
//! let mut g = routeattr::Graph::default();
//! let mut green = GreenIndexBuilder::from_file("path/to/green.csv", GreenIndexOptions::default())
//!     .expect("failed to read green index scores");
//! green.init(&g, &dir).expect("failed to initialize green index storage");
//!
//! let osm_options = routeattr::osm::Options {
//!     profile: &routeattr::osm::FOOT_PROFILE,
//!     file_format: routeattr::osm::FileFormat::Unknown,
//!     bbox: [0.0; 4],
//! };
//! routeattr::osm::add_features_from_file(
//!     &mut g,
//!     &osm_options,
//!     &mut [&mut green],
//!     "path/to/monaco.osm",
//! ).expect("failed to load monaco.osm");
//!
//! let mut storage = green.into_storage();
//! storage.flush().expect("failed to persist green index");
//!
//! let weighting = GreenWeighting::new(Some(&storage), 64, 0.5).expect("invalid intensity");
//! for edge in g.edges() {
//!     println!("{}: {}", edge.id, weighting.weight(edge, false, None));
//! }
//! ```

pub mod builders;
pub mod categories;
mod distance;
mod graph;
pub mod index;
mod kd;
pub mod matrix;
pub mod osm;
pub mod priority;
pub mod query_graph;
pub mod storage;
pub mod weighting;

pub use distance::{earth_distance, earth_distance_m, project_onto_segment};
pub use graph::{EdgeId, EdgeState, Graph};
pub use kd::KDTree;

/// Represents a point of the [Graph].
///
/// Nodes are identified by their OpenStreetMap id. Virtual nodes,
/// created by a [QueryGraph](query_graph::QueryGraph) at snapped positions,
/// get ids above the largest id in the underlying graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
}
