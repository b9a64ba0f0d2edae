// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use crate::priority::{classify, PriorityCandidate, PriorityClass};

/// Tag rules turning an OSM way into weighted [PriorityCandidates](PriorityCandidate)
/// for a specific flavour of cycling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityRules {
    /// Cycling with a strong preference for low-traffic streets and cycleways.
    SafetyBike,

    /// Long-distance cycle touring, tolerating paths and good tracks.
    CycleTourBike,
}

const INTENDED_VALUES: [&str; 4] = ["yes", "designated", "official", "permissive"];

impl PriorityRules {
    /// Speed limit (km/h) from which a road is avoided at all costs.
    pub fn avoid_speed_limit(self) -> f64 {
        match self {
            Self::SafetyBike => 71.0,
            Self::CycleTourBike => 61.0,
        }
    }

    fn prefer_highway(self, highway: &str) -> bool {
        match self {
            Self::SafetyBike => matches!(
                highway,
                "service" | "road" | "tertiary" | "tertiary_link" | "residential" | "unclassified"
            ),
            Self::CycleTourBike => matches!(
                highway,
                "path" | "service" | "residential" | "unclassified" | "tertiary" | "tertiary_link"
            ),
        }
    }

    fn pushing_section(self, highway: &str) -> bool {
        match highway {
            "footway" | "pedestrian" | "steps" => true,
            "path" => self == Self::SafetyBike,
            _ => false,
        }
    }

    /// Evaluates all rules against the tags of a way, returning the proposed classes
    /// in evaluation order.
    pub fn collect(self, tags: &HashMap<String, String>) -> Vec<PriorityCandidate> {
        match self {
            Self::SafetyBike => self.collect_safety(tags),
            Self::CycleTourBike => self.collect_cycle_tour(tags),
        }
    }

    /// Evaluates all rules and resolves them with [classify].
    pub fn classify(self, tags: &HashMap<String, String>) -> PriorityClass {
        classify(&self.collect(tags))
    }

    fn collect_safety(self, tags: &HashMap<String, String>) -> Vec<PriorityCandidate> {
        use PriorityClass::*;

        let mut c = Vec::default();
        let mut push = |weight, class| c.push(PriorityCandidate::new(weight, class));

        let highway = tag(tags, "highway");
        let max_speed = max_speed(tags);
        let limit = self.avoid_speed_limit();
        let tunnel = INTENDED_VALUES.contains(&tag(tags, "tunnel"));

        if tag(tags, "bicycle") == "designated" {
            push(100.0, Prefer);
        }
        if highway == "cycleway" {
            push(100.0, VeryNice);
        }

        if has_cycle_lane(tags) {
            if max_speed <= 30.0 {
                push(40.0, Prefer);
            } else if max_speed > 50.0 && max_speed < limit {
                push(50.0, AvoidIfPossible);
            } else if max_speed >= limit {
                push(50.0, ReachDest);
            }
        }

        if self.prefer_highway(highway) {
            if tag(tags, "cycleway") != "opposite"
                || tag(tags, "hgv") == "no"
                || max_speed <= 30.0
            {
                if max_speed >= limit {
                    push(55.0, AvoidAtAllCosts);
                } else {
                    push(40.0, Prefer);
                }
            } else {
                push(40.0, Unchanged);
            }

            if tunnel {
                push(40.0, Unchanged);
            }
        }

        if self.pushing_section(highway) || tag(tags, "service") == "parking_aisle" {
            push(30.0, AvoidIfPossible);
        }

        if avoid_highway(highway) || max_speed > 50.0 {
            push(30.0, ReachDest);
            if tunnel {
                push(30.0, AvoidAtAllCosts);
            }
        }

        if tag(tags, "railway") == "tram" {
            push(30.0, AvoidAtAllCosts);
        }

        c
    }

    fn collect_cycle_tour(self, tags: &HashMap<String, String>) -> Vec<PriorityCandidate> {
        use PriorityClass::*;

        let mut c = Vec::default();
        let mut push = |weight, class| c.push(PriorityCandidate::new(weight, class));

        let highway = tag(tags, "highway");
        let max_speed = max_speed(tags);
        let limit = self.avoid_speed_limit();
        let tunnel = INTENDED_VALUES.contains(&tag(tags, "tunnel"));

        if tag(tags, "bicycle") == "designated" {
            push(100.0, VeryNice);
        }
        if highway == "cycleway" {
            push(100.0, Best);
        }

        if has_cycle_lane(tags) {
            if max_speed <= 50.0 {
                push(90.0, VeryNice);
            } else if max_speed < limit {
                push(50.0, AvoidIfPossible);
            } else {
                push(50.0, ReachDest);
            }
        }

        if self.prefer_highway(highway) || (max_speed > 0.0 && max_speed <= 30.0) {
            if max_speed >= limit {
                push(55.0, AvoidAtAllCosts);
            } else if max_speed >= 50.0 {
                push(40.0, AvoidIfPossible);
            } else if highway == "path" {
                push(40.0, AvoidIfPossible);
            } else {
                push(40.0, Prefer);
            }

            if tunnel {
                push(40.0, AvoidIfPossible);
            }
        } else if highway == "track" {
            match tags.get("tracktype").map(String::as_str) {
                None | Some("grade1") | Some("grade2") => push(40.0, Unchanged),
                Some("grade3") => push(40.0, AvoidIfPossible),
                Some(_) => push(40.0, ReachDest),
            }
        }

        if self.pushing_section(highway)
            || tag(tags, "bicycle") == "use_sidepath"
            || tag(tags, "service") == "parking_aisle"
        {
            push(50.0, AvoidIfPossible);
        }

        if avoid_highway(highway) || (max_speed >= limit && highway != "track") {
            push(50.0, ReachDest);
            if tunnel {
                push(50.0, AvoidAtAllCosts);
            }
        }

        if tag(tags, "railway") == "tram" {
            push(50.0, AvoidAtAllCosts);
        }

        // Manual classification overrides everything computed above
        if let Some(class) = tags
            .get("class:bicycle:touring")
            .or_else(|| tags.get("class:bicycle"))
        {
            push(100.0, PriorityClass::from_class_value(class));
        }

        c
    }
}

fn tag<'t>(tags: &'t HashMap<String, String>, key: &str) -> &'t str {
    tags.get(key).map(String::as_str).unwrap_or("")
}

fn avoid_highway(highway: &str) -> bool {
    matches!(
        highway,
        "motorway"
            | "motorway_link"
            | "trunk"
            | "trunk_link"
            | "primary"
            | "primary_link"
            | "secondary"
            | "secondary_link"
    )
}

/// Checks for `cycleway=track|lane`, also on either side of the road.
fn has_cycle_lane(tags: &HashMap<String, String>) -> bool {
    ["cycleway", "cycleway:both", "cycleway:right", "cycleway:left"]
        .iter()
        .map(|&k| tag(tags, k))
        .find(|v| !v.is_empty())
        .is_some_and(|v| v == "track" || v == "lane")
}

/// Returns the largest of `maxspeed`, `maxspeed:forward` and `maxspeed:backward` in km/h,
/// or -1 if none of them is a valid speed.
pub(super) fn max_speed(tags: &HashMap<String, String>) -> f64 {
    ["maxspeed", "maxspeed:forward", "maxspeed:backward"]
        .iter()
        .filter_map(|&k| tags.get(k))
        .filter_map(|v| parse_speed(v))
        .fold(-1.0, f64::max)
}

fn parse_speed(value: &str) -> Option<f64> {
    let value = value.trim();
    if let Some(mph) = value.strip_suffix("mph") {
        return mph.trim().parse::<f64>().ok().map(|s| s * 1.609344);
    }
    match value {
        "walk" => Some(5.0),
        "none" => Some(140.0),
        _ => value
            .strip_suffix("km/h")
            .unwrap_or(value)
            .trim()
            .parse()
            .ok()
            .filter(|&s: &f64| s.is_finite() && s > 0.0),
    }
}
