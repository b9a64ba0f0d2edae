// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Building a [Graph](crate::Graph) from [OpenStreetMap](https://www.openstreetmap.org/) data.

mod priority_rules;
mod profile;
mod reader;

pub use priority_rules::PriorityRules;
pub use profile::{
    Profile, WaySpeed, BICYCLE_PROFILE, CAR_PROFILE, FOOT_PROFILE, SAFETY_BICYCLE_PROFILE,
};
pub use reader::{
    add_features_from_buffer, add_features_from_file, add_features_from_io, Error, FileFormat,
    Options, Way,
};

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::builders::{
        GraphStorageBuilder, GreenIndexBuilder, GreenIndexOptions, TollwaysBuilder,
        TrailDifficultyBuilder,
    };
    use crate::priority::PriorityClass;
    use crate::storage::{Directory, TollwayType};
    use crate::{earth_distance_m, EdgeState, Graph};

    const DATA: &[u8] = include_bytes!("reader/test_fixtures/simple.osm");

    fn options(profile: &'static Profile<'static>) -> Options<'static> {
        Options {
            profile,
            file_format: FileFormat::Unknown,
            bbox: [0.0; 4],
        }
    }

    fn build(profile: &'static Profile<'static>, data: &[u8]) -> Graph {
        let mut g = Graph::default();
        add_features_from_buffer(&mut g, &options(profile), &mut [], data).unwrap();
        g
    }

    fn edge_summary(g: &Graph) -> Vec<(i64, i64, f64, f64, i64)> {
        g.edges()
            .map(|e| {
                (
                    e.base_node,
                    e.adj_node,
                    e.speed_forward,
                    e.speed_backward,
                    e.way_id,
                )
            })
            .collect()
    }

    fn check_car_graph(g: &Graph) {
        //  1 ── 2 ── 3
        //       │    ↓
        //       5    4
        let node_ids: Vec<i64> = g.iter().map(|n| n.id).collect();
        assert_eq!(node_ids, vec![1, 2, 3, 4, 5]);

        assert_eq!(
            edge_summary(g),
            vec![
                (1, 2, 30.0, 30.0, 100),
                (2, 3, 30.0, 30.0, 100),
                (3, 4, 65.0, 0.0, 101),
                (2, 5, 15.0, 15.0, 102),
            ]
        );

        let first: EdgeState = *g.get_edge(0).unwrap();
        assert!((first.distance - earth_distance_m(52.23, 21.0, 52.23, 21.002)).abs() < 1e-9);
        assert_eq!(first.priority, PriorityClass::Unchanged);
        assert_eq!(g.edge_name(&first), Some("Main Street"));
        assert_eq!(g.edge_name(g.get_edge(2).unwrap()), None);
    }

    #[test]
    fn build_car_graph() {
        check_car_graph(&build(&CAR_PROFILE, DATA));
    }

    #[test]
    fn build_car_graph_from_io() {
        let mut g = Graph::default();
        let opts = Options {
            file_format: FileFormat::Xml,
            ..options(&CAR_PROFILE)
        };
        add_features_from_io(&mut g, &opts, &mut [], DATA).unwrap();
        check_car_graph(&g);
    }

    #[test]
    fn build_gz_graph() {
        let mut e = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        e.write_all(DATA).unwrap();
        let compressed = e.finish().unwrap();

        check_car_graph(&build(&CAR_PROFILE, &compressed));
    }

    #[test]
    fn build_bz2_graph() {
        let mut e = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        e.write_all(DATA).unwrap();
        let compressed = e.finish().unwrap();

        let mut g = Graph::default();
        let opts = Options {
            file_format: FileFormat::XmlBz2,
            ..options(&CAR_PROFILE)
        };
        add_features_from_buffer(&mut g, &opts, &mut [], &compressed).unwrap();
        check_car_graph(&g);
    }

    #[test]
    fn build_bicycle_graph() {
        let g = build(&BICYCLE_PROFILE, DATA);

        // Node 7 is not used by any way; node 9 is referenced, but missing
        let node_ids: Vec<i64> = g.iter().map(|n| n.id).collect();
        assert_eq!(node_ids, vec![1, 2, 3, 4, 5, 6, 8]);

        assert_eq!(
            edge_summary(&g),
            vec![
                (1, 2, 18.0, 18.0, 100),
                (2, 3, 18.0, 18.0, 100),
                (3, 4, 18.0, 0.0, 101),
                (2, 5, 12.0, 12.0, 102),
                (5, 6, 6.0, 6.0, 103),
                (4, 8, 18.0, 18.0, 105),
            ]
        );

        let priorities: Vec<PriorityClass> = g.edges().map(|e| e.priority).collect();
        assert_eq!(
            priorities,
            vec![
                PriorityClass::Prefer,
                PriorityClass::Prefer,
                PriorityClass::ReachDest,
                PriorityClass::Unchanged,
                PriorityClass::AvoidIfPossible,
                PriorityClass::Best,
            ]
        );
    }

    #[test]
    fn build_with_bbox() {
        let mut g = Graph::default();
        let opts = Options {
            bbox: [21.001, 52.0, 22.0, 53.0],
            ..options(&CAR_PROFILE)
        };
        add_features_from_buffer(&mut g, &opts, &mut [], DATA).unwrap();

        assert_eq!(g.len(), 4);
        assert_eq!(
            edge_summary(&g),
            vec![
                (2, 3, 30.0, 30.0, 100),
                (3, 4, 65.0, 0.0, 101),
                (2, 5, 15.0, 15.0, 102),
            ]
        );
    }

    #[test]
    fn builders_receive_every_edge() {
        let dir = Directory::in_memory();
        let mut g = Graph::default();

        let mut green = GreenIndexBuilder::from_reader(
            "id;score\n100;10\n101;90\n".as_bytes(),
            GreenIndexOptions::default(),
        )
        .unwrap();
        let mut tollways = TollwaysBuilder::new();
        let mut trails = TrailDifficultyBuilder::new();
        green.init(&g, &dir).unwrap();
        tollways.init(&g, &dir).unwrap();
        trails.init(&g, &dir).unwrap();

        add_features_from_buffer(
            &mut g,
            &options(&FOOT_PROFILE),
            &mut [&mut green, &mut tollways, &mut trails],
            DATA,
        )
        .unwrap();

        // Foot ignores the generic oneway tag on way 101
        assert_eq!(g.edge_count(), 5);
        assert_eq!(g.get_edge(2).map(|e| e.speed_backward), Some(5.0));

        let levels: Vec<Option<u8>> = (0..5).map(|e| green.storage().get(e)).collect();
        assert_eq!(levels, vec![Some(0), Some(0), Some(63), Some(32), Some(32)]);

        let tolls = tollways.storage();
        assert_eq!(tolls.tollway_type(2), TollwayType::GENERAL | TollwayType::HGV);
        assert!(tolls.tollway_type(0).is_empty());

        let track = trails.storage().get(3);
        assert_eq!(track.hiking_scale(), Some(2));
        assert_eq!(track.mtb_scale(false), Some(2));
        assert_eq!(trails.storage().get(4).hiking_scale(), None);
    }

    #[test]
    fn pbf_is_not_supported() {
        let mut data = vec![0, 0, 0, 13, 0x0A, 0x09];
        data.extend_from_slice(b"OSMHeader");
        assert_eq!(FileFormat::detect(&data), FileFormat::Pbf);

        let mut g = Graph::default();
        let err = add_features_from_buffer(&mut g, &options(&CAR_PROFILE), &mut [], &data)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(FileFormat::Pbf)));
    }

    #[test]
    fn malformed_xml() {
        let mut g = Graph::default();
        let data = br#"<osm><node id="1" lat="1" lon="1"></way></osm>"#;
        let err = add_features_from_buffer(&mut g, &options(&CAR_PROFILE), &mut [], data)
            .unwrap_err();
        assert!(matches!(err, Error::Xml(_)));
    }

    #[test]
    fn missing_file() {
        let mut g = Graph::default();
        let err = add_features_from_file(
            &mut g,
            &options(&CAR_PROFILE),
            &mut [],
            "this/file/does/not/exist.osm",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
