// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Batch resolution of many-to-many query locations.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::index::{LocationIndex, Snap};
use crate::query_graph::QueryGraph;
use crate::Graph;

/// Node id of locations which could not be resolved.
pub const UNRESOLVED_NODE: i64 = -1;

/// A WGS84 position. Equality and hashing are bitwise (with `-0.0 == 0.0`),
/// so that coordinates can key resolution caches.
#[derive(Debug, Clone, Copy)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    fn key(&self) -> (u64, u64) {
        // +0.0 turns -0.0 into 0.0
        ((self.lat + 0.0).to_bits(), (self.lon + 0.0).to_bits())
    }
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Coordinate {}

impl Hash for Coordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// A query coordinate resolved onto the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    /// Snapped position.
    pub coordinate: Coordinate,

    /// Name of the snapped way, if requested and known.
    pub name: Option<String>,

    /// Distance between the query and snapped positions, in meters.
    pub snapped_distance: f64,
}

/// Resolution results of a list of coordinates, in input order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatrixLocations {
    /// Node ids in the [QueryGraph], or [UNRESOLVED_NODE].
    pub node_ids: Vec<i64>,
    pub locations: Vec<Option<ResolvedLocation>>,
    pub has_names: bool,
}

impl MatrixLocations {
    fn with_capacity(capacity: usize, has_names: bool) -> Self {
        Self {
            node_ids: Vec::with_capacity(capacity),
            locations: Vec::with_capacity(capacity),
            has_names,
        }
    }

    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    /// Returns `(input index, node id, location)` of all resolved coordinates.
    pub fn resolved(&self) -> impl Iterator<Item = (usize, i64, &ResolvedLocation)> {
        self.node_ids
            .iter()
            .zip(&self.locations)
            .enumerate()
            .filter_map(|(i, (&node, loc))| loc.as_ref().map(|l| (i, node, l)))
    }
}

/// Everything needed for a many-to-many search.
#[derive(Debug)]
pub struct MatrixSearchContext<'g> {
    pub graph: QueryGraph<'g>,
    pub sources: MatrixLocations,
    pub destinations: MatrixLocations,
}

/// Error conditions of [MatrixSearchContextBuilder::create].
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum MatrixError {
    #[error("maximum search radius must be positive, got {0}")]
    InvalidRadius(f64),

    #[error("no resolution cached for {0:?}")]
    MissingLocation(Coordinate),
}

#[derive(Debug, Clone)]
struct LocationEntry {
    node_id: i64,
    location: Option<ResolvedLocation>,

    /// Index into the snaps handed over to [QueryGraph::lookup]
    snap: Option<usize>,
}

/// Resolves sources and destinations of many-to-many queries,
/// snapping every distinct coordinate exactly once.
///
/// One builder should serve one request at a time. The coordinate cache
/// is cleared at the start of every [MatrixSearchContextBuilder::create] call.
#[derive(Debug)]
pub struct MatrixSearchContextBuilder<'a, I: LocationIndex> {
    index: &'a I,
    resolve_names: bool,
    cache: HashMap<Coordinate, LocationEntry>,
}

impl<'a, I: LocationIndex> MatrixSearchContextBuilder<'a, I> {
    pub fn new(index: &'a I, resolve_names: bool) -> Self {
        Self {
            index,
            resolve_names,
            cache: HashMap::default(),
        }
    }

    /// Resolves all coordinates closer than `max_search_radius` meters to the graph.
    /// Farther coordinates are reported as [UNRESOLVED_NODE].
    pub fn create<'g>(
        &mut self,
        graph: &'g Graph,
        sources: &[Coordinate],
        destinations: &[Coordinate],
        max_search_radius: f64,
    ) -> Result<MatrixSearchContext<'g>, MatrixError> {
        if max_search_radius.is_nan() || max_search_radius <= 0.0 {
            return Err(MatrixError::InvalidRadius(max_search_radius));
        }

        self.cache.clear();
        let mut snaps = Vec::with_capacity(sources.len() + destinations.len());
        self.resolve(graph, sources, &mut snaps, max_search_radius);
        self.resolve(graph, destinations, &mut snaps, max_search_radius);

        let query_graph = QueryGraph::lookup(graph, &mut snaps);

        Ok(MatrixSearchContext {
            graph: query_graph,
            sources: self.create_locations(sources, &snaps)?,
            destinations: self.create_locations(destinations, &snaps)?,
        })
    }

    fn resolve(
        &mut self,
        graph: &Graph,
        coords: &[Coordinate],
        snaps: &mut Vec<Snap>,
        max_search_radius: f64,
    ) {
        for &c in coords {
            if self.cache.contains_key(&c) {
                continue;
            }

            let entry = match self.index.find_closest(c.lat, c.lon) {
                Some(snap) if snap.query_distance < max_search_radius => {
                    let name = if self.resolve_names {
                        graph.edge_name(&snap.closest_edge).map(str::to_string)
                    } else {
                        None
                    };

                    snaps.push(snap);
                    LocationEntry {
                        node_id: snap.closest_node,
                        location: Some(ResolvedLocation {
                            coordinate: Coordinate::new(snap.snapped_lat, snap.snapped_lon),
                            name,
                            snapped_distance: snap.query_distance,
                        }),
                        snap: Some(snaps.len() - 1),
                    }
                }

                _ => {
                    log::debug!("no graph point within {max_search_radius} m of {c:?}");
                    LocationEntry {
                        node_id: UNRESOLVED_NODE,
                        location: None,
                        snap: None,
                    }
                }
            };

            self.cache.insert(c, entry);
        }
    }

    fn create_locations(
        &self,
        coords: &[Coordinate],
        snaps: &[Snap],
    ) -> Result<MatrixLocations, MatrixError> {
        let mut ml = MatrixLocations::with_capacity(coords.len(), self.resolve_names);

        for c in coords {
            let entry = self.cache.get(c).ok_or(MatrixError::MissingLocation(*c))?;

            // Nodes of interior snaps are only known after the query graph lookup
            let node_id = match entry.snap {
                Some(i) => snaps[i].closest_node,
                None => entry.node_id,
            };

            ml.node_ids.push(node_id);
            ml.locations.push(entry.location.clone());
        }

        Ok(ml)
    }
}
