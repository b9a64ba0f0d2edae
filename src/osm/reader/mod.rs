// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

use graph_builder::GraphBuilder;

use crate::builders::GraphStorageBuilder;
use crate::osm::Profile;
use crate::Graph;

mod graph_builder;
mod model;
mod xml;

pub use model::Way;

/// Format of the input OSM file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Unknown format - guess the format based on the content
    Unknown,

    /// Force uncompressed [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    Xml,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [gzip](https://en.wikipedia.org/wiki/Gzip) compression
    XmlGz,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [bzip2](https://en.wikipedia.org/wiki/Bzip2) compression
    XmlBz2,

    /// [OSM PBF](https://wiki.openstreetmap.org/wiki/PBF_Format), which is recognized,
    /// but not supported.
    Pbf,
}

impl FileFormat {
    /// Guesses the format from the first bytes of a file.
    /// Anything which is not compressed nor PBF is assumed to be XML.
    pub fn detect(prefix: &[u8]) -> Self {
        if prefix.starts_with(&[0x1F, 0x8B]) {
            Self::XmlGz
        } else if prefix.starts_with(b"BZh") {
            Self::XmlBz2
        } else if prefix.get(6..15) == Some(b"OSMHeader".as_slice()) {
            Self::Pbf
        } else {
            Self::Xml
        }
    }
}

/// Error conditions when reading OSM data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("invalid OSM XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("unsupported OSM file format: {0:?}")]
    UnsupportedFormat(FileFormat),
}

/// Additional controls for interpreting OSM data as a routing [Graph].
#[derive(Debug)]
pub struct Options<'a> {
    /// How OSM features should be interpreted and converted into a [Graph].
    pub profile: &'a Profile<'a>,

    /// Format of the input data.
    pub file_format: FileFormat,

    /// Filter features by a specific bounding box. In order: left (min lon), bottom (min lat),
    /// right (max lon), top (max lat). Ignored if all values are set to zero, or at least one
    /// of them is not finite.
    pub bbox: [f64; 4],
}

/// Parse OSM features from a reader into a [Graph] as per the provided [Options],
/// calling every builder for each imported way and created edge.
///
/// The provided stream will be automatically wrapped in a buffered reader.
pub fn add_features_from_io<R: io::Read>(
    g: &mut Graph,
    options: &Options<'_>,
    builders: &mut [&mut dyn GraphStorageBuilder],
    reader: R,
) -> Result<(), Error> {
    let mut b = io::BufReader::new(reader);
    let format = match options.file_format {
        FileFormat::Unknown => {
            let detected = FileFormat::detect(b.fill_buf()?);
            log::debug!("detected OSM file format: {:?}", detected);
            detected
        }
        f => f,
    };

    let mut builder = GraphBuilder::new(g, options, builders);
    match format {
        FileFormat::Xml | FileFormat::Unknown => builder.add_features(xml::Reader::from_io(b))?,

        FileFormat::XmlGz => {
            let d = io::BufReader::new(flate2::read::MultiGzDecoder::new(b));
            builder.add_features(xml::Reader::from_io(d))?
        }

        FileFormat::XmlBz2 => {
            let d = io::BufReader::new(bzip2::read::MultiBzDecoder::new(b));
            builder.add_features(xml::Reader::from_io(d))?
        }

        FileFormat::Pbf => return Err(Error::UnsupportedFormat(FileFormat::Pbf)),
    }
    Ok(())
}

/// Parse OSM features from a file at the provided path into a [Graph] as per the provided [Options].
pub fn add_features_from_file<P: AsRef<Path>>(
    g: &mut Graph,
    options: &Options<'_>,
    builders: &mut [&mut dyn GraphStorageBuilder],
    path: P,
) -> Result<(), Error> {
    let f = File::open(path)?;
    add_features_from_io(g, options, builders, f)
}

/// Parse OSM features from a static buffer into a [Graph] as per the provided [Options].
pub fn add_features_from_buffer(
    g: &mut Graph,
    options: &Options<'_>,
    builders: &mut [&mut dyn GraphStorageBuilder],
    data: &[u8],
) -> Result<(), Error> {
    let format = match options.file_format {
        FileFormat::Unknown => FileFormat::detect(data),
        f => f,
    };

    if format == FileFormat::Xml {
        // Fast path is available for in-memory XML data
        let r = xml::Reader::from_buffer(data);
        GraphBuilder::new(g, options, builders).add_features(r)?;
        Ok(())
    } else {
        add_features_from_io(g, options, builders, data)
    }
}
