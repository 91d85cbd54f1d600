// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Position extraction from free text
//!
//! The UI encodes a map search as `lat:<deg>,lon:<deg>,r:<meters>` inside the
//! `info` text, possibly next to other terms:
//!
//! ```text
//! to:prova@gmail.com,lat:30,lon:30,r:100
//! ```
//!
//! Only a complete and valid triple is a position. Anything less is left to
//! the keyword extractor.

use crate::predicate::{FilterBuilder, Proximity};
use evidex_core::GeoPoint;
use tracing::debug;

/// Geo marker keys recognized inside free text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GeoMarker {
    Lat,
    Lon,
    Radius,
}

/// Split a line into `key:value` sized segments
pub(crate) fn segments(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|segment| !segment.is_empty())
}

/// Recognize a `lat:`, `lon:` or `r:` segment
fn geo_marker(segment: &str) -> Option<(GeoMarker, &str)> {
    let (key, value) = segment.split_once(':')?;
    let marker = match key.trim().to_ascii_lowercase().as_str() {
        "lat" => GeoMarker::Lat,
        "lon" => GeoMarker::Lon,
        "r" => GeoMarker::Radius,
        _ => return None,
    };
    Some((marker, value.trim()))
}

fn coordinate(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Locate the geo triple of one line. Besides the constraint, returns the
/// indices (into [`segments`]) of the three segments that formed it.
///
/// The first occurrence of each marker counts; an unparsable or out-of-range
/// value there means no position. Later repeats are not part of the triple.
pub(crate) fn locate_position(line: &str) -> Option<(Proximity, [usize; 3])> {
    let (mut lat, mut lon, mut radius) = (None, None, None);

    for (index, segment) in segments(line).enumerate() {
        let Some((marker, value)) = geo_marker(segment) else {
            continue;
        };
        let slot = match marker {
            GeoMarker::Lat => &mut lat,
            GeoMarker::Lon => &mut lon,
            GeoMarker::Radius => &mut radius,
        };
        if slot.is_none() {
            *slot = Some((coordinate(value)?, index));
        }
    }

    let ((lat, lat_at), (lon, lon_at), (radius_m, radius_at)) = (lat?, lon?, radius?);
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) || radius_m <= 0.0 {
        return None;
    }

    let proximity = Proximity {
        center: GeoPoint::new(lat, lon),
        radius_m,
    };
    Some((proximity, [lat_at, lon_at, radius_at]))
}

/// Parse the geo triple of one line
pub fn parse_position(line: &str) -> Option<Proximity> {
    locate_position(line).map(|(proximity, _)| proximity)
}

/// Add a proximity constraint for the first line carrying a valid triple.
/// Returns whether one was added.
pub fn filter_for_position(lines: &[String], builder: &mut FilterBuilder) -> bool {
    match lines.iter().find_map(|line| parse_position(line)) {
        Some(proximity) => {
            debug!(
                lat = proximity.center.lat,
                lon = proximity.center.lon,
                radius_m = proximity.radius_m,
                "position filter"
            );
            builder.set_proximity(proximity);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triple_with_other_terms() {
        let proximity = parse_position("to:prova@gmail.com,lat:30,lon:30,r:100").unwrap();
        assert_eq!(proximity.center, GeoPoint::new(30.0, 30.0));
        assert_eq!(proximity.radius_m, 100.0);
    }

    #[test]
    fn test_order_and_spacing_do_not_matter() {
        let proximity = parse_position("r:2500 LON:-0.1276 lat:51.5072").unwrap();
        assert_eq!(proximity.center, GeoPoint::new(51.5072, -0.1276));
        assert_eq!(proximity.radius_m, 2500.0);
    }

    #[test]
    fn test_partial_or_invalid_triples() {
        assert!(parse_position("lat:30,lon:30").is_none());
        assert!(parse_position("lat:abc,lon:30,r:100").is_none());
        assert!(parse_position("lat:91,lon:30,r:100").is_none());
        assert!(parse_position("lat:30,lon:30,r:0").is_none());
        assert!(parse_position("lat:30,lon:30,r:inf").is_none());
        assert!(parse_position("flat:30,lon:30,r:100").is_none());
    }

    #[test]
    fn test_triple_segments_are_located() {
        let (proximity, used) = locate_position("zzz lat:30,lon:30,r:100,lat:abc").unwrap();
        assert_eq!(proximity.center, GeoPoint::new(30.0, 30.0));
        assert_eq!(used, [1, 2, 3]);
    }

    #[test]
    fn test_first_valid_line_wins() {
        let lines = vec![
            "john".to_string(),
            "lat:1,lon:2,r:3".to_string(),
            "lat:4,lon:5,r:6".to_string(),
        ];
        let mut builder = FilterBuilder::new();
        assert!(filter_for_position(&lines, &mut builder));
        assert_eq!(builder.proximity().unwrap().center, GeoPoint::new(1.0, 2.0));
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn test_no_triple_adds_nothing() {
        let mut builder = FilterBuilder::new();
        assert!(!filter_for_position(&["lat:1,lon:2".to_string()], &mut builder));
        assert!(builder.is_empty());
    }
}
