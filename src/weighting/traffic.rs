// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::io::BufRead;

use super::{travel_time, Weighting};
use crate::{EdgeId, EdgeState};

/// Vehicles affected by a traffic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrafficMode {
    #[default]
    All,
    HeavyVehicle,
}

/// Effect of a single traffic event code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficEventInfo {
    /// Whether the event delays traversal by [TrafficEventInfo::delay_minutes].
    pub is_delay: bool,
    pub delay_minutes: f64,

    /// Values above 1 are an absolute speed cap in km/h;
    /// values up to 1 multiply the normal speed.
    pub speed_factor: f64,

    pub mode: TrafficMode,
}

/// Error conditions of traffic overrides.
#[derive(Debug, thiserror::Error)]
pub enum TrafficError {
    #[error("edge {edge}: unknown traffic event code {code}")]
    UnknownEventCode { edge: EdgeId, code: u16 },

    #[error("edge {edge}: traffic events {codes:?} have no applicable adjustment")]
    NoApplicableAdjustment { edge: EdgeId, codes: Vec<u16> },

    #[error("edge {0}: more than one traffic override")]
    DuplicateOverride(EdgeId),

    #[error("traffic event table line {line}: {reason}")]
    InvalidTable { line: usize, reason: &'static str },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Lookup table of traffic event codes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrafficEventTable {
    events: HashMap<u16, TrafficEventInfo>,
}

impl TrafficEventTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I: IntoIterator<Item = (u16, TrafficEventInfo)>>(entries: I) -> Self {
        Self {
            events: entries.into_iter().collect(),
        }
    }

    /// Parses a table of comma-separated `code,delay_minutes,speed_factor[,mode]` lines.
    ///
    /// An empty `delay_minutes` field marks events without a delay; `mode` is either
    /// `all` (the default) or `hgv`. Blank lines and lines starting with `#` are ignored.
    /// Any malformed line fails the whole table.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, TrafficError> {
        let mut events = HashMap::default();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (code, info) =
                parse_table_line(line).map_err(|reason| TrafficError::InvalidTable {
                    line: i + 1,
                    reason,
                })?;
            if events.insert(code, info).is_some() {
                return Err(TrafficError::InvalidTable {
                    line: i + 1,
                    reason: "duplicate event code",
                });
            }
        }

        Ok(Self { events })
    }

    pub fn insert(&mut self, code: u16, info: TrafficEventInfo) {
        self.events.insert(code, info);
    }

    pub fn get(&self, code: u16) -> Option<&TrafficEventInfo> {
        self.events.get(&code)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

fn parse_table_line(line: &str) -> Result<(u16, TrafficEventInfo), &'static str> {
    let mut fields = line.split(',').map(str::trim);

    let code = fields
        .next()
        .and_then(|f| f.parse().ok())
        .ok_or("invalid event code")?;

    let delay = fields.next().ok_or("missing delay")?;
    let (is_delay, delay_minutes) = if delay.is_empty() {
        (false, 0.0)
    } else {
        (true, delay.parse().map_err(|_| "invalid delay")?)
    };

    let speed_factor: f64 = fields
        .next()
        .ok_or("missing speed factor")?
        .parse()
        .map_err(|_| "invalid speed factor")?;
    if !speed_factor.is_finite() || speed_factor <= 0.0 {
        return Err("speed factor must be positive");
    }

    let mode = match fields.next() {
        None | Some("") | Some("all") => TrafficMode::All,
        Some("hgv") => TrafficMode::HeavyVehicle,
        Some(_) => return Err("invalid mode"),
    };

    if fields.next().is_some() {
        return Err("too many fields");
    }

    Ok((
        code,
        TrafficEventInfo {
            is_delay,
            delay_minutes,
            speed_factor,
            mode,
        },
    ))
}

/// Traffic events reported on a single edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvoidEdgeInfo {
    pub edge: EdgeId,
    pub codes: Vec<u16>,
}

/// Combined effect of all applicable events on an edge.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Adjustment {
    max_delay: Option<f64>,
    min_speed_cap: Option<f64>,
    min_speed_factor: f64,
}

impl Adjustment {
    fn from_events<'a, I: IntoIterator<Item = &'a TrafficEventInfo>>(events: I) -> Self {
        let mut adj = Self {
            max_delay: None,
            min_speed_cap: None,
            min_speed_factor: 1.0,
        };

        for e in events {
            if e.is_delay && e.delay_minutes > 0.0 {
                adj.max_delay = Some(adj.max_delay.map_or(e.delay_minutes, |d| d.max(e.delay_minutes)));
            }

            if e.speed_factor > 1.0 {
                adj.min_speed_cap = Some(adj.min_speed_cap.map_or(e.speed_factor, |s| s.min(e.speed_factor)));
            } else {
                adj.min_speed_factor = adj.min_speed_factor.min(e.speed_factor);
            }
        }

        adj
    }

    fn is_actionable(&self) -> bool {
        self.max_delay.is_some() || self.min_speed_cap.is_some() || self.min_speed_factor < 1.0
    }

    /// Applies the adjustment, with precedence delay > speed cap > speed factor.
    fn weight(&self, distance: f64, speed: f64) -> Option<f64> {
        if let Some(delay) = self.max_delay {
            return Some(delay * 60.0 + travel_time(distance, speed));
        }

        if let Some(cap) = self.min_speed_cap.filter(|&cap| cap < speed) {
            return Some(travel_time(distance, cap));
        }

        if self.min_speed_factor < 1.0 {
            return Some(travel_time(distance, self.min_speed_factor * speed));
        }

        None
    }
}

/// Travel-time weighting taking traffic events on specific edges into account.
///
/// Edges without events (and edges whose events can't lower the speed in the traversed
/// direction) cost their plain travel time. Otherwise, exactly one adjustment is applied,
/// in order of precedence:
/// 1. the longest delay is added to the travel time,
/// 2. the lowest speed cap below the normal speed replaces the normal speed,
/// 3. the lowest speed factor below 1 multiplies the normal speed.
#[derive(Debug, Clone)]
pub struct TrafficAvoidWeighting {
    adjustments: HashMap<EdgeId, Adjustment>,
}

impl TrafficAvoidWeighting {
    /// Resolves the event codes of every override against the `table`.
    ///
    /// Heavy-vehicle events are ignored when `is_car` is set. Overrides with unknown
    /// codes, with applicable events of no effect, or repeated for the same edge are rejected.
    pub fn new<I: IntoIterator<Item = AvoidEdgeInfo>>(
        table: &TrafficEventTable,
        overrides: I,
        is_car: bool,
    ) -> Result<Self, TrafficError> {
        let mut adjustments = HashMap::default();
        let mut seen = std::collections::HashSet::new();

        for o in overrides {
            if !seen.insert(o.edge) {
                return Err(TrafficError::DuplicateOverride(o.edge));
            }

            let mut events = Vec::with_capacity(o.codes.len());
            for &code in &o.codes {
                let info = table.get(code).ok_or(TrafficError::UnknownEventCode {
                    edge: o.edge,
                    code,
                })?;
                if !(is_car && info.mode == TrafficMode::HeavyVehicle) {
                    events.push(info);
                }
            }

            if events.is_empty() {
                log::debug!("edge {}: no traffic events apply to this vehicle", o.edge);
                continue;
            }

            let adj = Adjustment::from_events(events);
            if !adj.is_actionable() {
                return Err(TrafficError::NoApplicableAdjustment {
                    edge: o.edge,
                    codes: o.codes,
                });
            }
            adjustments.insert(o.edge, adj);
        }

        log::debug!("{} edges with traffic adjustments", adjustments.len());
        Ok(Self { adjustments })
    }
}

impl Weighting for TrafficAvoidWeighting {
    fn weight(&self, edge: &EdgeState, reverse: bool, _: Option<EdgeId>) -> f64 {
        let speed = edge.speed(reverse);
        if speed == 0.0 {
            return f64::INFINITY;
        }

        self.adjustments
            .get(&edge.original_edge)
            .and_then(|adj| adj.weight(edge.distance, speed))
            .unwrap_or_else(|| travel_time(edge.distance, speed))
    }

    fn name(&self) -> &str {
        "traffic_avoiding"
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::edge;
    use super::*;

    const DELAY: u16 = 1;
    const CAP_30: u16 = 2;
    const CAP_20: u16 = 3;
    const HALF: u16 = 4;
    const QUARTER: u16 = 5;
    const HGV_DELAY: u16 = 6;
    const NOTHING: u16 = 7;
    const LONG_DELAY: u16 = 8;

    fn event(is_delay: bool, delay_minutes: f64, speed_factor: f64, mode: TrafficMode) -> TrafficEventInfo {
        TrafficEventInfo {
            is_delay,
            delay_minutes,
            speed_factor,
            mode,
        }
    }

    fn table() -> TrafficEventTable {
        TrafficEventTable::from_entries([
            (DELAY, event(true, 5.0, 1.0, TrafficMode::All)),
            (CAP_30, event(false, 0.0, 30.0, TrafficMode::All)),
            (CAP_20, event(false, 0.0, 20.0, TrafficMode::All)),
            (HALF, event(false, 0.0, 0.5, TrafficMode::All)),
            (QUARTER, event(false, 0.0, 0.25, TrafficMode::All)),
            (HGV_DELAY, event(true, 10.0, 1.0, TrafficMode::HeavyVehicle)),
            (NOTHING, event(false, 0.0, 1.0, TrafficMode::All)),
            (LONG_DELAY, event(true, 15.0, 1.0, TrafficMode::All)),
        ])
    }

    fn weighting(overrides: &[(EdgeId, &[u16])], is_car: bool) -> Result<TrafficAvoidWeighting, TrafficError> {
        TrafficAvoidWeighting::new(
            &table(),
            overrides.iter().map(|&(edge, codes)| AvoidEdgeInfo {
                edge,
                codes: codes.to_vec(),
            }),
            is_car,
        )
    }

    #[test]
    fn delay() {
        let w = weighting(&[(0, &[DELAY])], false).unwrap();
        let e = edge(0, 1000.0, 50.0, 50.0);
        assert_eq!(w.weight(&e, false, None), 5.0 * 60.0 + 1000.0 * 3600.0 / (1000.0 * 50.0));
    }

    #[test]
    fn precedence() {
        let w = weighting(
            &[
                (0, &[HALF, CAP_30, DELAY, LONG_DELAY]),
                (1, &[HALF, CAP_30, CAP_20]),
                (2, &[HALF, QUARTER]),
            ],
            false,
        )
        .unwrap();

        assert_eq!(w.weight(&edge(0, 1000.0, 50.0, 50.0), false, None), 15.0 * 60.0 + 72.0);
        assert_eq!(w.weight(&edge(1, 1000.0, 50.0, 50.0), false, None), 180.0);
        assert_eq!(w.weight(&edge(2, 1000.0, 50.0, 50.0), false, None), 288.0);
    }

    #[test]
    fn cap_above_normal_speed_falls_back() {
        let w = weighting(&[(0, &[CAP_30, HALF]), (1, &[CAP_30])], false).unwrap();
        assert_eq!(w.weight(&edge(0, 1000.0, 20.0, 20.0), false, None), 360.0);
        assert_eq!(w.weight(&edge(1, 1000.0, 20.0, 20.0), false, None), 180.0);
    }

    #[test]
    fn impassable_before_overrides() {
        let w = weighting(&[(0, &[DELAY])], false).unwrap();
        assert_eq!(w.weight(&edge(0, 1000.0, 50.0, 0.0), true, None), f64::INFINITY);
    }

    #[test]
    fn no_override() {
        let w = weighting(&[(0, &[DELAY])], false).unwrap();
        assert_eq!(w.weight(&edge(1, 1000.0, 50.0, 50.0), false, None), 72.0);
    }

    #[test]
    fn virtual_edges_use_original_edge() {
        let w = weighting(&[(3, &[DELAY])], false).unwrap();
        let mut e = edge(10, 1000.0, 50.0, 50.0);
        e.original_edge = 3;
        assert_eq!(w.weight(&e, false, None), 372.0);
    }

    #[test]
    fn heavy_vehicle_events_ignored_for_cars() {
        let car = weighting(&[(0, &[HGV_DELAY, HALF])], true).unwrap();
        assert_eq!(car.weight(&edge(0, 1000.0, 50.0, 50.0), false, None), 144.0);

        let car = weighting(&[(0, &[HGV_DELAY])], true).unwrap();
        assert_eq!(car.weight(&edge(0, 1000.0, 50.0, 50.0), false, None), 72.0);

        let truck = weighting(&[(0, &[HGV_DELAY, HALF])], false).unwrap();
        assert_eq!(truck.weight(&edge(0, 1000.0, 50.0, 50.0), false, None), 672.0);
    }

    #[test]
    fn invalid_overrides() {
        assert!(matches!(
            weighting(&[(0, &[NOTHING])], false),
            Err(TrafficError::NoApplicableAdjustment { edge: 0, .. })
        ));
        assert!(matches!(
            weighting(&[(0, &[99])], false),
            Err(TrafficError::UnknownEventCode { edge: 0, code: 99 })
        ));
        assert!(matches!(
            weighting(&[(0, &[DELAY]), (0, &[HALF])], false),
            Err(TrafficError::DuplicateOverride(0))
        ));
    }

    #[test]
    fn table_from_reader() {
        let data = "# code,delay,speed_factor,mode\n101,5,1\n\n102,,0.5\n103,,30,hgv\n";
        let t = TrafficEventTable::from_reader(data.as_bytes()).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.get(101), Some(&event(true, 5.0, 1.0, TrafficMode::All)));
        assert_eq!(t.get(102), Some(&event(false, 0.0, 0.5, TrafficMode::All)));
        assert_eq!(
            t.get(103),
            Some(&event(false, 0.0, 30.0, TrafficMode::HeavyVehicle))
        );
    }

    #[test]
    fn malformed_table() {
        for data in ["x,1,1", "1,1", "1,a,1", "1,,0", "1,,1,bus", "1,,1,all,extra", "1,,1\n1,,1"] {
            assert!(
                matches!(
                    TrafficEventTable::from_reader(data.as_bytes()),
                    Err(TrafficError::InvalidTable { .. })
                ),
                "{data:?} should be rejected"
            );
        }
    }
}
