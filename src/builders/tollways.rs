// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::{is_yes, BuildError, GraphStorageBuilder};
use crate::osm::Way;
use crate::storage::{Directory, GraphExtension, TollwayType, TollwaysStorage};
use crate::{EdgeId, Graph};

/// Tags checked for toll information, with the vehicle kinds they apply to.
const TOLL_TAGS: &[(&str, TollwayType)] = &[
    ("toll", TollwayType::GENERAL),
    ("toll:hgv", TollwayType::HGV),
    ("toll:N1", TollwayType::N1),
    ("toll:N2", TollwayType::N2),
    ("toll:N3", TollwayType::N3),
];

/// Writes the [TollwayType] of every edge into a [TollwaysStorage],
/// based on the [toll](https://wiki.openstreetmap.org/wiki/Key:toll) tags of its way.
#[derive(Debug, Default)]
pub struct TollwaysBuilder {
    current: TollwayType,
    storage: TollwaysStorage,
}

impl TollwaysBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn storage(&self) -> &TollwaysStorage {
        &self.storage
    }

    pub fn into_storage(self) -> TollwaysStorage {
        self.storage
    }

    /// Derives the [TollwayType] of a way from its tags.
    pub fn tollway_type(way: &Way) -> TollwayType {
        TOLL_TAGS
            .iter()
            .filter(|(key, _)| way.tags.get(*key).is_some_and(|v| is_yes(v)))
            .fold(TollwayType::NONE, |acc, &(_, t)| acc | t)
    }
}

impl GraphStorageBuilder for TollwaysBuilder {
    fn name(&self) -> &str {
        "Tollways"
    }

    fn init(&mut self, graph: &Graph, dir: &Directory) -> Result<(), BuildError> {
        self.storage.init(graph, dir)?;
        self.storage.create(graph.edge_count())?;
        Ok(())
    }

    fn process_way(&mut self, way: &Way) {
        self.current = Self::tollway_type(way);
    }

    fn process_edge(&mut self, _way: &Way, edge: EdgeId) {
        self.storage.set(edge, Some(self.current.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    macro_rules! way {
        ($id:expr, {$( $k:literal : $v:literal ),*}) => {
            Way {
                id: $id,
                nodes: vec![],
                tags: HashMap::from_iter([ $( ($k.to_string(), $v.to_string()) ),* ]),
            }
        };
    }

    #[test]
    fn tollway_types() {
        assert_eq!(
            TollwaysBuilder::tollway_type(&way!(1, {"highway": "motorway"})),
            TollwayType::NONE,
        );
        assert_eq!(
            TollwaysBuilder::tollway_type(&way!(1, {"toll": "yes"})),
            TollwayType::GENERAL,
        );
        assert_eq!(
            TollwaysBuilder::tollway_type(&way!(1, {"toll": "no", "toll:hgv": "yes", "toll:N3": "yes"})),
            TollwayType::HGV | TollwayType::N3,
        );
    }

    #[test]
    fn writes_every_edge_of_a_way() {
        let mut b = TollwaysBuilder::new();
        b.init(&Graph::default(), &Directory::in_memory()).unwrap();

        let tolled = way!(1, {"toll": "yes"});
        b.process_way(&tolled);
        b.process_edge(&tolled, 0);
        b.process_edge(&tolled, 1);

        let free = way!(2, {});
        b.process_way(&free);
        b.process_edge(&free, 2);

        let s = b.into_storage();
        assert_eq!(s.tollway_type(0), TollwayType::GENERAL);
        assert_eq!(s.tollway_type(1), TollwayType::GENERAL);
        assert_eq!(s.get(2), Some(0));
        assert_eq!(s.get(3), None);
    }
}
