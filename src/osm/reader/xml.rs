// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::io;

use quick_xml::events::{BytesStart, Event};

use super::model::{Feature, Way};
use crate::Node;

/// Parser is a trait for objects which can parse XML.
///
/// This trait only exists to fix the mismatch of
/// [quick_xml::Reader::read_event] when working on buffered data
/// and [quick_xml::Reader::read_event_into] when working on IO.
pub(super) trait Parser {
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<Event<'a>>;
}

/// IoParser implements [Parser] over an [std::io::BufRead].
pub(super) struct IoParser<R: io::BufRead>(quick_xml::Reader<R>, Vec<u8>);

impl<R: io::BufRead> Parser for IoParser<R> {
    #[inline]
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<Event<'a>> {
        self.1.clear();
        self.0.read_event_into(&mut self.1)
    }
}

/// BufParser implements [Parser] over a slice of bytes (`&[u8]`).
pub(super) struct BufParser<'a>(quick_xml::Reader<&'a [u8]>);

impl Parser for BufParser<'_> {
    #[inline]
    fn read_event<'b>(&'b mut self) -> quick_xml::Result<Event<'b>> {
        self.0.read_event()
    }
}

/// Reader streams OSM [Features](Feature) from an XML document.
///
/// Relations and their members are skipped.
pub(super) struct Reader<P: Parser> {
    parser: P,
    eof: bool,
    skipped_relations: usize,
}

impl<P: Parser> Reader<P> {
    fn new(parser: P) -> Self {
        Self {
            parser,
            eof: false,
            skipped_relations: 0,
        }
    }
}

impl<'a> Reader<BufParser<'a>> {
    pub(super) fn from_buffer(data: &'a [u8]) -> Self {
        Self::new(BufParser(quick_xml::Reader::from_reader(data)))
    }
}

impl<R: io::BufRead> Reader<IoParser<R>> {
    pub(super) fn from_io(reader: R) -> Self {
        Self::new(IoParser(quick_xml::Reader::from_reader(reader), Vec::default()))
    }
}

impl<P: Parser> Iterator for Reader<P> {
    type Item = Result<Feature, quick_xml::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut f: Option<Feature> = None;

        while !self.eof {
            let event = match self.parser.read_event() {
                Ok(e) => e,
                Err(e) => return Some(Err(e)),
            };

            match event {
                Event::Empty(start) => match start.local_name().as_ref() {
                    b"node" => {
                        if let Some(n) = parse_node(&start) {
                            return Some(Ok(Feature::Node(n)));
                        }
                    }
                    b"tag" => {
                        if let (Some(Feature::Way(w)), Some((k, v))) = (&mut f, parse_tag(&start))
                        {
                            w.tags.insert(k, v);
                        }
                    }
                    b"nd" => {
                        if let (Some(Feature::Way(w)), Some(ref_)) = (&mut f, parse_nd(&start)) {
                            w.nodes.push(ref_);
                        }
                    }
                    b"relation" => self.skipped_relations += 1,
                    _ => {}
                },

                Event::Start(start) => match start.local_name().as_ref() {
                    b"node" => f = parse_node(&start).map(Feature::Node),
                    b"way" => f = parse_way(&start).map(Feature::Way),
                    b"relation" => self.skipped_relations += 1,
                    _ => {}
                },

                Event::End(end) => {
                    if let b"node" | b"way" = end.local_name().as_ref() {
                        if let Some(f) = f.take() {
                            return Some(Ok(f));
                        }
                    }
                }

                Event::Eof => {
                    self.eof = true;
                    if self.skipped_relations > 0 {
                        log::debug!("skipped {} relations", self.skipped_relations);
                    }
                }

                _ => {}
            }
        }

        f.map(Ok)
    }
}

fn attribute<T: std::str::FromStr>(start: &BytesStart<'_>, key: &[u8]) -> Option<T> {
    start
        .attributes()
        .filter_map(Result::ok)
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok()?.parse().ok())
}

fn parse_node(start: &BytesStart<'_>) -> Option<Node> {
    let id: i64 = attribute(start, b"id").unwrap_or(0);
    let lat: f64 = attribute(start, b"lat").unwrap_or(f64::NAN);
    let lon: f64 = attribute(start, b"lon").unwrap_or(f64::NAN);

    if id != 0 && lat.is_finite() && lon.is_finite() {
        Some(Node { id, lat, lon })
    } else {
        log::warn!("skipping node with invalid id or position (id={id})");
        None
    }
}

fn parse_way(start: &BytesStart<'_>) -> Option<Way> {
    match attribute(start, b"id") {
        Some(id) if id != 0 => Some(Way {
            id,
            nodes: Vec::default(),
            tags: HashMap::default(),
        }),
        _ => {
            log::warn!("skipping way without a valid id");
            None
        }
    }
}

fn parse_tag(start: &BytesStart<'_>) -> Option<(String, String)> {
    let k: String = attribute(start, b"k")?;
    let v: String = attribute(start, b"v").unwrap_or_default();
    Some((k, v))
}

fn parse_nd(start: &BytesStart<'_>) -> Option<i64> {
    attribute(start, b"ref").filter(|&r: &i64| r != 0)
}
