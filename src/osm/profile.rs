// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use super::priority_rules::{max_speed, PriorityRules};
use crate::priority::PriorityClass;

/// Describes how to convert OSM ways into edges of a [Graph](crate::Graph).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profile<'a> {
    /// Human readable name of the routing profile,
    /// customary the most specific [access tag](https://wiki.openstreetmap.org/wiki/Key:access).
    ///
    /// This value is not used for actual OSM data interpretation,
    /// except when set to "foot", in which case `oneway` tags are ignored.
    /// Only `oneway:foot` tags are considered, except on:
    /// `highway=footway|path|steps|platform`, `public_transport=platform`
    /// and `railway=platform`.
    pub name: &'a str,

    /// Travel speeds of OSM ways with specific tags.
    ///
    /// A way is matched against all [WaySpeeds](WaySpeed) in order, and the first exact key
    /// and value match determines the speed of all edges created from that way.
    /// Ways without a match are not routable.
    pub speeds: &'a [WaySpeed<'a>],

    /// Array of OSM [access tags](https://wiki.openstreetmap.org/wiki/Key:access#Land-based_transportation)
    /// (in order from least to most specific) to consider when checking for road prohibitions.
    ///
    /// This array is also used to follow mode-specific one-way tags
    /// (see [Profile::is_allowed] and [Profile::way_direction]).
    pub access: &'a [&'a str],

    /// Force no routing over [motorroad=yes](https://wiki.openstreetmap.org/wiki/Key:motorroad) ways.
    pub disallow_motorroad: bool,

    /// Cap way speeds at the `maxspeed` tag.
    pub respect_maxspeed: bool,

    /// Tag rules used to classify the [PriorityClass] of every edge.
    /// Without rules, all edges are [PriorityClass::Unchanged].
    pub priority: Option<PriorityRules>,
}

/// Travel speed on OSM ways with a specific key and value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaySpeed<'a> {
    /// Key of an OSM way for which this speed applies, e.g. "highway" or "railway".
    pub key: &'a str,

    /// Value under [WaySpeed::key], e.g. "motorway" or "residential".
    pub value: &'a str,

    /// Speed in km/h. Must be finite and positive.
    pub speed: f64,
}

impl<'a> Profile<'a> {
    /// Returns the travel speed on a way with given tags in km/h,
    /// or zero if the way is not routable (no matching [WaySpeed],
    /// or disallowed as determined by [Profile::is_allowed]).
    pub fn way_speed(&self, tags: &HashMap<String, String>) -> f64 {
        let Some(speed) = self
            .speeds
            .iter()
            .find(|s| tags.get(s.key).map(String::as_str) == Some(s.value))
            .map(|s| s.speed)
        else {
            return 0.0;
        };

        if !speed.is_normal() || speed < 0.0 || !self.is_allowed(tags) {
            return 0.0;
        }

        let limit = max_speed(tags);
        if self.respect_maxspeed && limit > 0.0 {
            speed.min(limit)
        } else {
            speed
        }
    }

    /// Classifies a way with the profile's [PriorityRules].
    pub fn way_priority(&self, tags: &HashMap<String, String>) -> PriorityClass {
        self.priority
            .map(|rules| rules.classify(tags))
            .unwrap_or_default()
    }

    /// Checks if the way is routable, by considering motor roads ([Profile::disallow_motorroad])
    /// and access tags ([Profile::access]).
    pub fn is_allowed(&self, tags: &HashMap<String, String>) -> bool {
        if self.disallow_motorroad && tags.get("motorroad").map(String::as_str) == Some("yes") {
            return false;
        }

        !matches!(
            self.access
                .iter()
                .rev()
                .find_map(|&mode| tags.get(mode).map(String::as_str)),
            Some("no") | Some("private")
        )
    }

    /// Checks if a way is traversable forward (first return value) and
    /// backwards (second return value) by investigating mode-specific and generic one-way tags.
    ///
    /// Some ways (highway=motorway, highway=motorway_link, junction=roundabout and
    /// junction=circular) default to being one-way, except if overridden by specific tags.
    pub fn way_direction(&self, tags: &HashMap<String, String>) -> (bool, bool) {
        let implied_oneway = !self.apply_foot_exceptions()
            && (matches!(
                tags.get("highway").map(String::as_str),
                Some("motorway") | Some("motorway_link")
            ) || matches!(
                tags.get("junction").map(String::as_str),
                Some("roundabout") | Some("circular")
            ));

        match self.get_active_oneway_value(tags) {
            "yes" | "true" | "1" => (true, false),
            "-1" | "reverse" => (false, true),
            "no" => (true, true),
            _ => (true, !implied_oneway),
        }
    }

    /// Returns the value of the most specific "oneway:MODE" tag (based on [Profile::access]),
    /// falling back to simply "oneway", and returning an empty string if no relevant tag was found.
    fn get_active_oneway_value<'t>(&self, tags: &'t HashMap<String, String>) -> &'t str {
        if self.apply_foot_exceptions() {
            tags.get("oneway:foot")
                .or_else(|| {
                    Self::generic_oneway_applies_on_foot(tags)
                        .then(|| tags.get("oneway"))
                        .flatten()
                })
                .map_or("", String::as_str)
        } else {
            self.access
                .iter()
                .rev()
                .filter(|&&mode| mode != "access")
                .find_map(|&mode| tags.get(&format!("oneway:{}", mode)))
                .or_else(|| tags.get("oneway"))
                .map_or("", String::as_str)
        }
    }

    fn generic_oneway_applies_on_foot(tags: &HashMap<String, String>) -> bool {
        matches!(
            tags.get("highway").map(String::as_str),
            Some("footway") | Some("path") | Some("steps") | Some("platform")
        ) || tags.get("public_transport").map(String::as_str) == Some("platform")
            || tags.get("railway").map(String::as_str) == Some("platform")
    }

    fn apply_foot_exceptions(&self) -> bool {
        self.name == "foot"
    }
}

macro_rules! highway_speeds {
    ($( $value:literal : $speed:literal ),+ $(,)?) => {
        &[ $( WaySpeed { key: "highway", value: $value, speed: $speed } ),+ ]
    };
}

/// Routing [Profile] for cars, with typical speeds of road classes
/// and with appropriate [access tags](https://wiki.openstreetmap.org/wiki/Key:access).
pub const CAR_PROFILE: Profile = Profile {
    name: "motorcar",
    speeds: highway_speeds! {
        "motorway": 100.0,
        "motorway_link": 70.0,
        "trunk": 70.0,
        "trunk_link": 65.0,
        "primary": 65.0,
        "primary_link": 60.0,
        "secondary": 60.0,
        "secondary_link": 50.0,
        "tertiary": 50.0,
        "tertiary_link": 40.0,
        "unclassified": 30.0,
        "residential": 30.0,
        "living_street": 5.0,
        "service": 20.0,
        "road": 20.0,
        "track": 15.0,
    },
    access: &["access", "vehicle", "motor_vehicle", "motorcar"],
    disallow_motorroad: false,
    respect_maxspeed: true,
    priority: None,
};

/// Routing [Profile] for cycle touring, classifying edges with [PriorityRules::CycleTourBike].
pub const BICYCLE_PROFILE: Profile = Profile {
    name: "bicycle",
    speeds: highway_speeds! {
        "cycleway": 18.0,
        "trunk": 18.0,
        "trunk_link": 18.0,
        "primary": 18.0,
        "primary_link": 18.0,
        "secondary": 18.0,
        "secondary_link": 18.0,
        "tertiary": 18.0,
        "tertiary_link": 18.0,
        "unclassified": 16.0,
        "residential": 18.0,
        "living_street": 6.0,
        "service": 14.0,
        "road": 12.0,
        "track": 12.0,
        "path": 10.0,
        "bridleway": 8.0,
        "footway": 6.0,
        "pedestrian": 6.0,
        "steps": 2.0,
    },
    access: &["access", "vehicle", "bicycle"],
    disallow_motorroad: true,
    respect_maxspeed: true,
    priority: Some(PriorityRules::CycleTourBike),
};

/// Routing [Profile] for cautious cyclists, classifying edges with [PriorityRules::SafetyBike].
pub const SAFETY_BICYCLE_PROFILE: Profile = Profile {
    name: "bicycle",
    speeds: highway_speeds! {
        "cycleway": 18.0,
        "trunk": 14.0,
        "trunk_link": 14.0,
        "primary": 14.0,
        "primary_link": 14.0,
        "secondary": 14.0,
        "secondary_link": 14.0,
        "tertiary": 14.0,
        "tertiary_link": 14.0,
        "unclassified": 14.0,
        "residential": 18.0,
        "living_street": 6.0,
        "service": 14.0,
        "road": 12.0,
        "track": 12.0,
        "path": 4.0,
        "bridleway": 4.0,
        "footway": 4.0,
        "pedestrian": 4.0,
        "steps": 2.0,
    },
    access: &["access", "vehicle", "bicycle"],
    disallow_motorroad: true,
    respect_maxspeed: true,
    priority: Some(PriorityRules::SafetyBike),
};

/// Routing [Profile] for walking, with appropriate
/// [access tags](https://wiki.openstreetmap.org/wiki/Key:access).
pub const FOOT_PROFILE: Profile = Profile {
    name: "foot",
    speeds: &[
        WaySpeed { key: "highway", value: "trunk", speed: 5.0 },
        WaySpeed { key: "highway", value: "trunk_link", speed: 5.0 },
        WaySpeed { key: "highway", value: "primary", speed: 5.0 },
        WaySpeed { key: "highway", value: "primary_link", speed: 5.0 },
        WaySpeed { key: "highway", value: "secondary", speed: 5.0 },
        WaySpeed { key: "highway", value: "secondary_link", speed: 5.0 },
        WaySpeed { key: "highway", value: "tertiary", speed: 5.0 },
        WaySpeed { key: "highway", value: "tertiary_link", speed: 5.0 },
        WaySpeed { key: "highway", value: "unclassified", speed: 5.0 },
        WaySpeed { key: "highway", value: "residential", speed: 5.0 },
        WaySpeed { key: "highway", value: "living_street", speed: 5.0 },
        WaySpeed { key: "highway", value: "service", speed: 5.0 },
        WaySpeed { key: "highway", value: "track", speed: 5.0 },
        WaySpeed { key: "highway", value: "bridleway", speed: 4.0 },
        WaySpeed { key: "highway", value: "footway", speed: 5.0 },
        WaySpeed { key: "highway", value: "path", speed: 5.0 },
        WaySpeed { key: "highway", value: "pedestrian", speed: 5.0 },
        WaySpeed { key: "highway", value: "steps", speed: 3.0 },
        WaySpeed { key: "highway", value: "platform", speed: 5.0 },
        WaySpeed { key: "railway", value: "platform", speed: 5.0 },
        WaySpeed { key: "public_transport", value: "platform", speed: 5.0 },
    ],
    access: &["access", "foot"],
    disallow_motorroad: true,
    respect_maxspeed: false,
    priority: None,
};
