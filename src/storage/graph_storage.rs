// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::{
    Directory, GraphExtension, GreenIndexStorage, StorageError, TollwaysStorage,
    TrailDifficultyStorage,
};
use crate::Graph;

/// A [Graph] together with its optional attribute stores, all bound to a single [Directory].
#[derive(Debug)]
pub struct GraphStorage {
    graph: Graph,
    dir: Directory,
    green_index: Option<GreenIndexStorage>,
    tollways: Option<TollwaysStorage>,
    trail_difficulty: Option<TrailDifficultyStorage>,
}

impl GraphStorage {
    pub fn new(graph: Graph, dir: Directory) -> Self {
        Self {
            graph,
            dir,
            green_index: None,
            tollways: None,
            trail_difficulty: None,
        }
    }

    pub fn with_green_index(mut self, store: GreenIndexStorage) -> Self {
        self.green_index = Some(store);
        self
    }

    pub fn with_tollways(mut self, store: TollwaysStorage) -> Self {
        self.tollways = Some(store);
        self
    }

    pub fn with_trail_difficulty(mut self, store: TrailDifficultyStorage) -> Self {
        self.trail_difficulty = Some(store);
        self
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn directory(&self) -> &Directory {
        &self.dir
    }

    pub fn green_index(&self) -> Option<&GreenIndexStorage> {
        self.green_index.as_ref()
    }

    pub fn tollways(&self) -> Option<&TollwaysStorage> {
        self.tollways.as_ref()
    }

    pub fn trail_difficulty(&self) -> Option<&TrailDifficultyStorage> {
        self.trail_difficulty.as_ref()
    }

    /// Returns all attached extensions.
    pub fn extensions(&self) -> impl Iterator<Item = &dyn GraphExtension> {
        let green = self.green_index.as_ref().map(|e| e as &dyn GraphExtension);
        let tollways = self.tollways.as_ref().map(|e| e as &dyn GraphExtension);
        let trail = self.trail_difficulty.as_ref().map(|e| e as &dyn GraphExtension);
        green.into_iter().chain(tollways).chain(trail)
    }

    /// Binds all extensions which were not bound yet to this storage's graph and directory,
    /// and allocates space for all edges of the graph in them. Extensions which were
    /// already bound (e.g. by a builder) keep their data.
    pub fn create(&mut self) -> Result<(), StorageError> {
        let edges = self.graph.edge_count();
        self.for_each_extension(|ext, graph, dir| {
            if init_once(ext, graph, dir)? {
                ext.create(edges)?;
            }
            Ok(())
        })
    }

    /// Binds all extensions to this storage's graph and directory,
    /// and reads their previously flushed data.
    pub fn load_existing(&mut self) -> Result<(), StorageError> {
        self.for_each_extension(|ext, graph, dir| {
            init_once(ext, graph, dir)?;
            ext.load_existing()?;
            log::info!("loaded {} ({} bytes)", ext.name(), ext.capacity());
            Ok(())
        })
    }

    pub fn flush(&mut self) -> Result<(), StorageError> {
        self.for_each_extension(|ext, _, _| ext.flush())
    }

    pub fn close(&mut self) {
        // Closing can't fail
        let _ = self.for_each_extension(|ext, _, _| {
            ext.close();
            Ok(())
        });
    }

    fn for_each_extension<F>(&mut self, mut f: F) -> Result<(), StorageError>
    where
        F: FnMut(&mut dyn GraphExtension, &Graph, &Directory) -> Result<(), StorageError>,
    {
        let green = self
            .green_index
            .as_mut()
            .map(|e| e as &mut dyn GraphExtension);
        let tollways = self.tollways.as_mut().map(|e| e as &mut dyn GraphExtension);
        let trail = self
            .trail_difficulty
            .as_mut()
            .map(|e| e as &mut dyn GraphExtension);

        for ext in green.into_iter().chain(tollways).chain(trail) {
            f(ext, &self.graph, &self.dir)?;
        }
        Ok(())
    }
}

/// Calls [GraphExtension::init], tolerating extensions which were already bound
/// by a builder. Returns `true` if the extension was freshly bound.
fn init_once(
    ext: &mut dyn GraphExtension,
    graph: &Graph,
    dir: &Directory,
) -> Result<bool, StorageError> {
    match ext.init(graph, dir) {
        Ok(()) => Ok(true),
        Err(StorageError::DoubleInit(name)) => {
            log::debug!("{name}: already initialized");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::priority::PriorityClass;
    use crate::Node;

    fn graph() -> Graph {
        let mut g = Graph::new();
        g.set_node(Node { id: 1, lat: 0.0, lon: 0.0 });
        g.set_node(Node { id: 2, lat: 0.0, lon: 0.001 });
        g.add_edge(1, 2, 111.0, 30.0, 30.0, PriorityClass::Unchanged, 1);
        g
    }

    #[test]
    fn create_flush_and_load() -> Result<(), StorageError> {
        let tmp = tempfile::tempdir()?;
        let dir = Directory::on_disk(tmp.path());

        let mut storage = GraphStorage::new(graph(), dir.clone())
            .with_green_index(GreenIndexStorage::new())
            .with_tollways(TollwaysStorage::new());
        storage.create()?;
        storage.flush()?;

        let names: Vec<_> = storage.extensions().map(|e| e.name().to_string()).collect();
        assert_eq!(names, vec!["ext_greenindex", "ext_tollways"]);

        let mut loaded = GraphStorage::new(graph(), dir).with_tollways(TollwaysStorage::new());
        loaded.load_existing()?;
        assert_eq!(loaded.tollways().map(|t| t.entries()), Some(0));
        assert!(loaded.green_index().is_none());
        Ok(())
    }

    #[test]
    fn create_keeps_data_of_bound_stores() -> Result<(), StorageError> {
        let tmp = tempfile::tempdir()?;
        let dir = Directory::on_disk(tmp.path());
        let g = graph();

        let mut green = GreenIndexStorage::new();
        green.init(&g, &dir)?;
        green.create(0)?;
        green.set(0, Some(9));

        let mut storage = GraphStorage::new(g, dir)
            .with_green_index(green)
            .with_tollways(TollwaysStorage::new());
        storage.create()?;

        let green = storage.green_index().unwrap();
        assert_eq!(green.get(0), Some(9));
        assert_eq!(green.entries(), 1);

        let tollways = storage.tollways().unwrap();
        assert_eq!(tollways.entries(), 0);
        assert!(tollways.capacity() >= 4);
        Ok(())
    }

    #[test]
    fn load_fails_without_flushed_data() -> Result<(), StorageError> {
        let tmp = tempfile::tempdir()?;
        let mut storage = GraphStorage::new(graph(), Directory::on_disk(tmp.path()))
            .with_trail_difficulty(TrailDifficultyStorage::new());
        let err = storage.load_existing().unwrap_err();
        assert!(err.is_corruption());
        Ok(())
    }
}
