// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

use super::{BuildError, GraphStorageBuilder};
use crate::osm::Way;
use crate::storage::{Directory, GraphExtension, GreenIndexStorage};
use crate::{EdgeId, Graph};

/// Configuration of a [GreenIndexBuilder].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GreenIndexOptions {
    /// Number of discrete levels the range of scores is divided into, in `1..=254`.
    pub levels: u8,
}

impl Default for GreenIndexOptions {
    fn default() -> Self {
        Self { levels: 64 }
    }
}

/// Maps external per-way green scores onto discrete levels,
/// and writes the level of every edge into a [GreenIndexStorage].
///
/// Scores are read from a delimited text file, with a header line and
/// `way_id<sep>score` rows. The separator is `;` if the header contains one,
/// `,` otherwise.
#[derive(Debug)]
pub struct GreenIndexBuilder {
    scores: HashMap<i64, f64>,
    slots: Vec<(f64, f64)>,
    levels: u8,
    storage: GreenIndexStorage,
}

impl GreenIndexBuilder {
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        options: GreenIndexOptions,
    ) -> Result<Self, BuildError> {
        let f = File::open(path)?;
        Self::from_reader(io::BufReader::new(f), options)
    }

    pub fn from_reader<R: BufRead>(
        reader: R,
        options: GreenIndexOptions,
    ) -> Result<Self, BuildError> {
        if options.levels == 0 || options.levels == u8::MAX {
            return Err(BuildError::InvalidLevels(options.levels));
        }

        let scores = read_scores(reader)?;
        if scores.is_empty() {
            return Err(BuildError::EmptyDataset);
        }

        let (min, max) = scores
            .values()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &s| {
                (lo.min(s), hi.max(s))
            });
        log::info!(
            "read {} green index scores (min {min}, max {max})",
            scores.len()
        );

        Ok(Self {
            scores,
            slots: prepare_slots(min, max, options.levels),
            levels: options.levels,
            storage: GreenIndexStorage::new(),
        })
    }

    pub fn levels(&self) -> u8 {
        self.levels
    }

    /// Level assigned to ways without a known score.
    pub fn default_level(&self) -> u8 {
        self.levels / 2
    }

    /// Returns the level of a way.
    pub fn level_of(&self, way_id: i64) -> u8 {
        self.scores
            .get(&way_id)
            .and_then(|&score| {
                self.slots
                    .iter()
                    .position(|&(left, right)| left <= score && score <= right)
            })
            .map(|level| level as u8)
            .unwrap_or_else(|| self.default_level())
    }

    pub fn storage(&self) -> &GreenIndexStorage {
        &self.storage
    }

    pub fn into_storage(self) -> GreenIndexStorage {
        self.storage
    }
}

impl GraphStorageBuilder for GreenIndexBuilder {
    fn name(&self) -> &str {
        "GreenIndex"
    }

    fn init(&mut self, graph: &Graph, dir: &Directory) -> Result<(), BuildError> {
        self.storage.init(graph, dir)?;
        self.storage.create(graph.edge_count())?;
        Ok(())
    }

    fn process_edge(&mut self, way: &Way, edge: EdgeId) {
        let level = self.level_of(way.id);
        self.storage.set(edge, Some(level));
    }
}

fn read_scores<R: BufRead>(reader: R) -> Result<HashMap<i64, f64>, BuildError> {
    let mut lines = reader.lines();

    let header = match lines.next() {
        Some(header) => header?,
        None => return Ok(HashMap::default()),
    };
    let separator = if header.contains(';') { ';' } else { ',' };

    let mut scores = HashMap::default();
    for (i, line) in lines.enumerate() {
        let line = line?;
        // +2, as the header was skipped and line numbers start at 1
        match parse_row(&line, separator) {
            Some((id, score)) => {
                scores.insert(id, score);
            }
            None => log::warn!("green index input line {}: skipping {:?}", i + 2, line),
        }
    }
    Ok(scores)
}

fn parse_row(line: &str, separator: char) -> Option<(i64, f64)> {
    let (id, score) = line.split_once(separator)?;
    let (id, score) = (id.trim(), score.trim());
    if id.is_empty() || score.is_empty() {
        return None;
    }

    let score: f64 = score.parse().ok()?;
    if !score.is_finite() {
        return None;
    }
    Some((id.parse().ok()?, score))
}

/// Divides `[min, max]` into `levels` equal-width, closed intervals.
/// The right bound of the last interval is exactly `max`.
fn prepare_slots(min: f64, max: f64, levels: u8) -> Vec<(f64, f64)> {
    let step = (max - min) / levels as f64;
    (0..levels)
        .map(|i| {
            let left = min + i as f64 * step;
            let right = if i + 1 == levels {
                max
            } else {
                min + (i + 1) as f64 * step
            };
            (left, right)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn builder(csv: &str, levels: u8) -> GreenIndexBuilder {
        GreenIndexBuilder::from_reader(csv.as_bytes(), GreenIndexOptions { levels }).unwrap()
    }

    fn way(id: i64) -> Way {
        Way {
            id,
            nodes: vec![],
            tags: HashMap::default(),
        }
    }

    #[test]
    fn levels_from_scores() {
        let b = builder("id,score\n1,0.0\n2,1.0\n3,0.5\n", 4);
        assert_eq!(b.level_of(1), 0);
        assert_eq!(b.level_of(2), 3);
        // Boundary ties resolve to the lower level
        assert_eq!(b.level_of(3), 1);
        assert_eq!(b.level_of(4), 2);
    }

    #[test]
    fn semicolon_separator() {
        let b = builder("osm_id;ungreen_factor\n10; 2\n11 ;4\n", 2);
        assert_eq!(b.level_of(10), 0);
        assert_eq!(b.level_of(11), 1);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let b = builder(
            "id,score\n\n1,1.0\nno separator\n,5.0\n2,\nabc,3.0\n3,xyz\n4,2.0\n",
            64,
        );
        assert_eq!(b.scores.len(), 2);
        assert_eq!(b.level_of(1), 0);
        assert_eq!(b.level_of(4), 63);
        assert_eq!(b.level_of(3), 32);
    }

    #[test]
    fn identical_scores() {
        let b = builder("id,score\n1,7.0\n2,7.0\n", 64);
        assert_eq!(b.level_of(1), 0);
        assert_eq!(b.level_of(2), 0);
    }

    #[test]
    fn empty_dataset() {
        let r = GreenIndexBuilder::from_reader(&b"id,score\n"[..], GreenIndexOptions::default());
        assert!(matches!(r, Err(BuildError::EmptyDataset)));

        let r = GreenIndexBuilder::from_reader(&b""[..], GreenIndexOptions::default());
        assert!(matches!(r, Err(BuildError::EmptyDataset)));
    }

    #[test]
    fn invalid_levels() {
        let r = GreenIndexBuilder::from_reader(&b"id,score\n1,1\n"[..], GreenIndexOptions { levels: 0 });
        assert!(matches!(r, Err(BuildError::InvalidLevels(0))));
    }

    #[test]
    fn missing_file() {
        let r = GreenIndexBuilder::from_file("/nonexistent/green.csv", GreenIndexOptions::default());
        assert!(matches!(r, Err(BuildError::Io(_))));
    }

    #[test]
    fn writes_levels_by_edge_id() {
        let mut b = builder("id,score\n100,0\n200,10\n", 10);
        b.init(&Graph::default(), &Directory::in_memory()).unwrap();

        b.process_way(&way(100));
        b.process_edge(&way(100), 0);
        b.process_edge(&way(100), 1);
        b.process_way(&way(200));
        b.process_edge(&way(200), 2);
        b.process_way(&way(300));
        b.process_edge(&way(300), 3);

        let s = b.into_storage();
        assert_eq!(s.get(0), Some(0));
        assert_eq!(s.get(1), Some(0));
        assert_eq!(s.get(2), Some(9));
        assert_eq!(s.get(3), Some(5));
        assert_eq!(s.get(4), None);
        assert_eq!(s.entries(), 4);
    }

    #[test]
    fn double_init() {
        let mut b = builder("id,score\n1,1\n", 10);
        let g = Graph::default();
        let dir = Directory::in_memory();
        assert!(b.init(&g, &dir).is_ok());
        assert!(matches!(b.init(&g, &dir), Err(BuildError::Storage(_))));
    }
}
