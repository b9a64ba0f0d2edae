// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::error::Error;
use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use routeattr::builders::{
    GraphStorageBuilder, GreenIndexBuilder, GreenIndexOptions, TollwaysBuilder,
    TrailDifficultyBuilder,
};
use routeattr::index::{KdLocationIndex, TraversableEdges};
use routeattr::matrix::{Coordinate, MatrixLocations, MatrixSearchContextBuilder};
use routeattr::storage::{Directory, GraphExtension, GraphStorage, GreenIndexStorage};
use routeattr::weighting::{
    AvoidEdgeInfo, DistanceWeighting, FastestWeighting, GreenWeighting, PriorityWeighting,
    TrafficAvoidWeighting, TrafficEventTable, Weighting,
};

#[derive(Debug, thiserror::Error)]
#[error("{0}: {1}")]
struct GraphLoadError(PathBuf, #[source] routeattr::osm::Error);

#[derive(Debug, thiserror::Error)]
#[error("line {0}: expected edge_id,code[,code...]")]
struct InvalidOverride(usize);

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Log verbosity
    #[arg(long, global = true, default_value = "info")]
    log_level: log::LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Builds attribute stores for all edges of an OSM file
    Build {
        /// The path to the OSM file
        osm_file: PathBuf,

        /// Directory to write the attribute stores into
        storage_dir: PathBuf,

        #[arg(long, value_enum, default_value_t = ProfileName::Foot)]
        profile: ProfileName,

        /// CSV file with `way_id,score` rows, building the green index store
        #[arg(long)]
        green: Option<PathBuf>,

        /// Number of green index levels
        #[arg(long, default_value_t = GreenIndexOptions::default().levels)]
        green_levels: u8,

        /// Build the tollways store
        #[arg(long)]
        tollways: bool,

        /// Build the trail difficulty store
        #[arg(long)]
        trail_difficulty: bool,
    },

    /// Prints the header of a persisted attribute store
    Inspect {
        storage_dir: PathBuf,

        /// Name of the store, e.g. ext_greenindex
        name: String,
    },

    /// Prints the weight of every edge in both directions
    Weights {
        osm_file: PathBuf,

        #[arg(long, value_enum, default_value_t = ProfileName::Foot)]
        profile: ProfileName,

        #[arg(long, value_enum, default_value_t = WeightingName::Fastest)]
        weighting: WeightingName,

        /// Directory with the green index store, required by the green weighting
        #[arg(long)]
        storage_dir: Option<PathBuf>,

        #[arg(long, default_value_t = GreenIndexOptions::default().levels)]
        green_levels: u8,

        /// Influence of the green index, from 0 to 1
        #[arg(long, default_value_t = 1.0)]
        intensity: f64,

        /// Traffic event table (`code,delay_minutes,speed_factor[,mode]` rows)
        #[arg(long, requires = "traffic_overrides")]
        traffic_table: Option<PathBuf>,

        /// Affected edges (`edge_id,code[,code...]` rows)
        #[arg(long, requires = "traffic_table")]
        traffic_overrides: Option<PathBuf>,
    },

    /// Resolves source and destination coordinates onto the graph
    Snap {
        osm_file: PathBuf,

        #[arg(long, value_enum, default_value_t = ProfileName::Foot)]
        profile: ProfileName,

        /// Source coordinates as `lat,lon`
        #[arg(long, value_parser = parse_coordinate, num_args = 1..)]
        sources: Vec<Coordinate>,

        /// Destination coordinates as `lat,lon`
        #[arg(long, value_parser = parse_coordinate, num_args = 1..)]
        destinations: Vec<Coordinate>,

        /// Maximum snapping distance, in meters
        #[arg(long, default_value_t = 350.0)]
        radius: f64,

        /// Resolve names of snapped ways
        #[arg(long)]
        names: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProfileName {
    Car,
    Bicycle,
    SafetyBicycle,
    Foot,
}

impl ProfileName {
    fn profile(self) -> &'static routeattr::osm::Profile<'static> {
        match self {
            Self::Car => &routeattr::osm::CAR_PROFILE,
            Self::Bicycle => &routeattr::osm::BICYCLE_PROFILE,
            Self::SafetyBicycle => &routeattr::osm::SAFETY_BICYCLE_PROFILE,
            Self::Foot => &routeattr::osm::FOOT_PROFILE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum WeightingName {
    Distance,
    Fastest,
    Green,
    Priority,
    Traffic,
}

fn parse_coordinate(s: &str) -> Result<Coordinate, String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected lat,lon, got {s:?}"))?;
    let lat = lat.trim().parse().map_err(|e| format!("invalid latitude: {e}"))?;
    let lon = lon.trim().parse().map_err(|e| format!("invalid longitude: {e}"))?;
    Ok(Coordinate::new(lat, lon))
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    colog::default_builder().filter_level(cli.log_level).init();

    match cli.command {
        Command::Build {
            osm_file,
            storage_dir,
            profile,
            green,
            green_levels,
            tollways,
            trail_difficulty,
        } => {
            fs::create_dir_all(&storage_dir)?;
            let dir = Directory::on_disk(storage_dir);
            let mut g = routeattr::Graph::default();

            let mut green = match green {
                Some(path) => Some(GreenIndexBuilder::from_file(
                    path,
                    GreenIndexOptions {
                        levels: green_levels,
                    },
                )?),
                None => None,
            };
            let mut tollways = tollways.then(TollwaysBuilder::new);
            let mut trails = trail_difficulty.then(TrailDifficultyBuilder::new);

            let mut builders: Vec<&mut dyn GraphStorageBuilder> = Vec::default();
            if let Some(b) = green.as_mut() {
                builders.push(b);
            }
            if let Some(b) = tollways.as_mut() {
                builders.push(b);
            }
            if let Some(b) = trails.as_mut() {
                builders.push(b);
            }
            for b in builders.iter_mut() {
                b.init(&g, &dir)?;
            }

            load_graph(&mut g, &osm_file, profile, &mut builders)?;
            drop(builders);

            let mut storage = GraphStorage::new(g, dir);
            if let Some(b) = green {
                storage = storage.with_green_index(b.into_storage());
            }
            if let Some(b) = tollways {
                storage = storage.with_tollways(b.into_storage());
            }
            if let Some(b) = trails {
                storage = storage.with_trail_difficulty(b.into_storage());
            }
            storage.flush()?;
            for ext in storage.extensions() {
                log::info!("written {} ({} bytes)", ext.name(), ext.capacity());
            }
            storage.close();
        }

        Command::Inspect { storage_dir, name } => {
            let mut data = Directory::on_disk(storage_dir).find(&name);
            data.load_existing()?;
            println!("name:        {}", data.name());
            println!("record size: {}", data.header(0));
            println!("entries:     {}", data.header(1));
            println!("capacity:    {} bytes", data.capacity());
        }

        Command::Weights {
            osm_file,
            profile,
            weighting,
            storage_dir,
            green_levels,
            intensity,
            traffic_table,
            traffic_overrides,
        } => {
            let mut g = routeattr::Graph::default();
            load_graph(&mut g, &osm_file, profile, &mut [])?;

            let mut green_storage = None;
            if weighting == WeightingName::Green {
                let dir = storage_dir.ok_or("the green weighting requires --storage-dir")?;
                let mut s = GreenIndexStorage::new();
                s.init(&g, &Directory::on_disk(dir))?;
                s.load_existing()?;
                green_storage = Some(s);
            }

            let w: Box<dyn Weighting + '_> = match weighting {
                WeightingName::Distance => Box::new(DistanceWeighting),
                WeightingName::Fastest => Box::new(FastestWeighting),
                WeightingName::Priority => Box::new(PriorityWeighting),
                WeightingName::Green => Box::new(GreenWeighting::new(
                    green_storage.as_ref(),
                    green_levels,
                    intensity,
                )?),
                WeightingName::Traffic => {
                    let table = match traffic_table {
                        Some(path) => TrafficEventTable::from_reader(open(path)?)?,
                        None => TrafficEventTable::new(),
                    };
                    let overrides = match traffic_overrides {
                        Some(path) => read_overrides(open(path)?)?,
                        None => Vec::default(),
                    };
                    let is_car = matches!(profile, ProfileName::Car);
                    Box::new(TrafficAvoidWeighting::new(&table, overrides, is_car)?)
                }
            };

            println!("edge,way_id,forward,backward");
            for edge in g.edges() {
                println!(
                    "{},{},{},{}",
                    edge.id,
                    edge.way_id,
                    w.weight(edge, false, None),
                    w.weight(edge, true, None)
                );
            }
            log::info!("printed {} weights of {} edges", w.name(), g.edge_count());
        }

        Command::Snap {
            osm_file,
            profile,
            sources,
            destinations,
            radius,
            names,
        } => {
            let mut g = routeattr::Graph::default();
            load_graph(&mut g, &osm_file, profile, &mut [])?;

            let index = KdLocationIndex::new(&g, TraversableEdges);
            let mut resolver = MatrixSearchContextBuilder::new(&index, names);
            let ctx = resolver.create(&g, &sources, &destinations, radius)?;

            log::info!(
                "query graph has {} virtual nodes",
                ctx.graph.virtual_node_count()
            );
            print_locations("sources", &ctx.sources);
            print_locations("destinations", &ctx.destinations);
        }
    }

    Ok(())
}

fn print_locations(title: &str, locations: &MatrixLocations) {
    println!("{title}:");
    for (i, node_id) in locations.node_ids.iter().enumerate() {
        match &locations.locations[i] {
            Some(l) => println!(
                "  {i}: node {node_id} at {:.7},{:.7} ({:.1} m){}",
                l.coordinate.lat,
                l.coordinate.lon,
                l.snapped_distance,
                l.name
                    .as_deref()
                    .map(|n| format!(" {n:?}"))
                    .unwrap_or_default(),
            ),
            None => println!("  {i}: unresolved"),
        }
    }
}

fn open<P: AsRef<Path>>(path: P) -> io::Result<io::BufReader<fs::File>> {
    fs::File::open(path).map(io::BufReader::new)
}

fn read_overrides<R: BufRead>(reader: R) -> Result<Vec<AvoidEdgeInfo>, Box<dyn Error>> {
    let mut overrides = Vec::default();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split(',').map(str::trim);
        let edge = fields
            .next()
            .and_then(|f| f.parse().ok())
            .ok_or(InvalidOverride(i + 1))?;
        let codes = fields
            .map(|f| f.parse())
            .collect::<Result<Vec<u16>, _>>()
            .map_err(|_| InvalidOverride(i + 1))?;
        overrides.push(AvoidEdgeInfo { edge, codes });
    }
    Ok(overrides)
}

fn load_graph(
    g: &mut routeattr::Graph,
    path: &Path,
    profile: ProfileName,
    builders: &mut [&mut dyn GraphStorageBuilder],
) -> Result<(), GraphLoadError> {
    let options = routeattr::osm::Options {
        profile: profile.profile(),
        file_format: routeattr::osm::FileFormat::Unknown,
        bbox: [0.0; 4],
    };
    routeattr::osm::add_features_from_file(g, &options, builders, path)
        .map_err(|e| GraphLoadError(path.to_path_buf(), e))
}
