// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::{BuildError, GraphStorageBuilder};
use crate::osm::Way;
use crate::storage::{Directory, GraphExtension, TrailDifficultyStorage, TrailDifficultyValues};
use crate::{EdgeId, Graph};

/// Writes hiking and mountain biking difficulty classes of every edge into
/// a [TrailDifficultyStorage], based on `sac_scale`, `mtb:scale` and
/// `mtb:scale:uphill` tags.
#[derive(Debug, Default)]
pub struct TrailDifficultyBuilder {
    current: TrailDifficultyValues,
    storage: TrailDifficultyStorage,
}

impl TrailDifficultyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn storage(&self) -> &TrailDifficultyStorage {
        &self.storage
    }

    pub fn into_storage(self) -> TrailDifficultyStorage {
        self.storage
    }

    /// Derives encoded difficulty classes of a way from its tags.
    pub fn difficulty(way: &Way) -> TrailDifficultyValues {
        let tag = |k: &str| way.tag(k);
        TrailDifficultyValues {
            hiking: tag("sac_scale").map(sac_scale).unwrap_or(0),
            mtb: tag("mtb:scale").map(|v| mtb_scale(v, 6)).unwrap_or(0),
            mtb_uphill: tag("mtb:scale:uphill")
                .map(|v| mtb_scale(v, 5))
                .unwrap_or(0),
        }
    }
}

impl GraphStorageBuilder for TrailDifficultyBuilder {
    fn name(&self) -> &str {
        "TrailDifficulty"
    }

    fn init(&mut self, graph: &Graph, dir: &Directory) -> Result<(), BuildError> {
        self.storage.init(graph, dir)?;
        self.storage.create(graph.edge_count())?;
        Ok(())
    }

    fn process_way(&mut self, way: &Way) {
        self.current = Self::difficulty(way);
    }

    fn process_edge(&mut self, _way: &Way, edge: EdgeId) {
        self.storage.set(edge, self.current);
    }
}

fn sac_scale(value: &str) -> u8 {
    match value {
        "hiking" => 1,
        "mountain_hiking" => 2,
        "demanding_mountain_hiking" => 3,
        "alpine_hiking" => 4,
        "demanding_alpine_hiking" => 5,
        "difficult_alpine_hiking" => 6,
        _ => 0,
    }
}

/// Parses values like `2`, `3+` or `1-` into `scale + 1`, if the scale doesn't exceed `max`.
fn mtb_scale(value: &str, max: u8) -> u8 {
    let digits = value.trim().trim_end_matches(['+', '-']);
    match digits.parse::<u8>() {
        Ok(scale) if scale <= max => scale + 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn way(tags: &[(&str, &str)]) -> Way {
        Way {
            id: 1,
            nodes: vec![],
            tags: tags
                .iter()
                .map(|&(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn difficulty_from_tags() {
        let d = TrailDifficultyBuilder::difficulty(&way(&[
            ("sac_scale", "alpine_hiking"),
            ("mtb:scale", "3+"),
            ("mtb:scale:uphill", "0"),
        ]));
        assert_eq!(
            d,
            TrailDifficultyValues {
                hiking: 4,
                mtb: 4,
                mtb_uphill: 1,
            }
        );
        assert_eq!(d.mtb_scale(false), Some(3));
    }

    #[test]
    fn unknown_values_are_unclassified() {
        let d = TrailDifficultyBuilder::difficulty(&way(&[
            ("sac_scale", "yes"),
            ("mtb:scale", "9"),
            ("mtb:scale:uphill", "6"),
        ]));
        assert_eq!(d, TrailDifficultyValues::default());
    }

    #[test]
    fn writes_edges() {
        let mut b = TrailDifficultyBuilder::new();
        b.init(&Graph::default(), &Directory::in_memory()).unwrap();
        let w = way(&[("sac_scale", "hiking")]);
        b.process_way(&w);
        b.process_edge(&w, 7);
        assert_eq!(b.storage().get(7).hiking_scale(), Some(1));
        assert_eq!(b.storage().get(6).hiking_scale(), None);
    }
}
