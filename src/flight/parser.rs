/*
 *  flight/parser.rs
 *
 *  RadarPi - nearest aircraft on e-ink
 *	(c) 2025-26 RadarPi contributors
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */
use chrono::Local;
use log::{debug, warn};
use serde_json::Value;

use super::SearchArea;
use super::models::{Aircraft, FlightData};

/// Keys the upstream uses for the aircraft list, in priority order.
const AIRCRAFT_LIST_KEYS: [&str; 2] = ["aircraft", "ac"];

/// The aircraft list of a response, if it has a recognizable shape.
///
/// The first key present wins, a present key whose value is not an array is
/// "no data" even if a later key would match.
pub fn extract_aircraft_list(response: &Value) -> Option<&Vec<Value>> {
    let fields = response.as_object()?;
    AIRCRAFT_LIST_KEYS
        .iter()
        .find_map(|key| fields.get(*key))?
        .as_array()
}

/// Turn a raw response into a [`FlightData`].
///
/// `None` means "no aircraft": an absent or unrecognized response, an empty
/// list, or a list where no element could be normalized. Only the first
/// `max_aircraft` elements are parsed but `total_count` reports the full list.
pub fn aggregate(
    response: Option<&Value>,
    search: SearchArea,
    max_aircraft: usize,
) -> Option<FlightData> {
    let aircraft_list = extract_aircraft_list(response?)?;
    if aircraft_list.is_empty() {
        return None;
    }

    let aircraft = aircraft_list
        .iter()
        .take(max_aircraft)
        .enumerate()
        .fold(Vec::new(), |mut parsed, (idx, raw)| {
            match Aircraft::from_api_data(raw) {
                Ok(a) => parsed.push(a),
                Err(e) => warn!("Failed to parse aircraft #{idx}: {e}"),
            }
            parsed
        });

    if aircraft.is_empty() {
        return None;
    }
    debug!("parsed {} of {} aircraft", aircraft.len(), aircraft_list.len());

    Some(FlightData::new(aircraft, Local::now(), aircraft_list.len(), search))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const AREA: SearchArea = SearchArea { latitude: 38.9, longitude: -77.1, radius: 10 };

    fn sample(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!({"flight": format!("FL{i}"), "gs": i as f64 * 10.0})).collect()
    }

    #[test]
    fn test_absent_shapes() {
        assert!(aggregate(None, AREA, 10).is_none());
        assert!(aggregate(Some(&json!({})), AREA, 10).is_none());
        assert!(aggregate(Some(&json!({"aircraft": []})), AREA, 10).is_none());
        assert!(aggregate(Some(&json!({"ac": []})), AREA, 10).is_none());
        assert!(aggregate(Some(&json!({"aircraft": "none"})), AREA, 10).is_none());
        assert!(aggregate(Some(&json!([{"flight": "X"}])), AREA, 10).is_none());
        assert!(aggregate(Some(&json!({"msg": "No error", "now": 1})), AREA, 10).is_none());
    }

    #[test]
    fn test_key_name_independence() {
        let list = sample(2);
        let a = aggregate(Some(&json!({"aircraft": list.clone()})), AREA, 10).unwrap();
        let b = aggregate(Some(&json!({"ac": list})), AREA, 10).unwrap();
        assert_eq!(a.aircraft(), b.aircraft());
    }

    #[test]
    fn test_aircraft_key_has_priority() {
        let resp = json!({"ac": [{"flight": "AC_KEY"}], "aircraft": [{"flight": "AIRCRAFT_KEY"}]});
        let fd = aggregate(Some(&resp), AREA, 10).unwrap();
        assert_eq!(fd.primary_aircraft().unwrap().flight_number, "AIRCRAFT_KEY");

        // present but malformed first key does not fall through
        let resp = json!({"aircraft": null, "ac": [{"flight": "AC_KEY"}]});
        assert!(aggregate(Some(&resp), AREA, 10).is_none());
    }

    #[test]
    fn test_truncation_keeps_raw_total() {
        let fd = aggregate(Some(&json!({"ac": sample(15)})), AREA, 10).unwrap();
        assert_eq!(fd.aircraft().len(), 10);
        assert_eq!(fd.total_count(), 15);
        assert_eq!(fd.primary_aircraft().unwrap().flight_number, "FL0");
        assert_eq!(fd.aircraft()[9].flight_number, "FL9");
    }

    #[test]
    fn test_bad_elements_are_skipped() {
        let resp = json!({"aircraft": [
            {"flight": "BAD1", "gs": "n/a"},
            "garbage",
            {"flight": "GOOD", "gs": 120.0}
        ]});
        let fd = aggregate(Some(&resp), AREA, 10).unwrap();
        assert_eq!(fd.aircraft().len(), 1);
        assert_eq!(fd.primary_aircraft().unwrap().flight_number, "GOOD");
        assert_eq!(fd.total_count(), 3);
    }

    #[test]
    fn test_all_elements_bad() {
        let resp = json!({"aircraft": [{"gs": "x"}, 42]});
        assert!(aggregate(Some(&resp), AREA, 10).is_none());
    }

    #[test]
    fn test_search_parameters_recorded() {
        let fd = aggregate(Some(&json!({"aircraft": sample(1)})), AREA, 10).unwrap();
        assert_eq!(fd.search_latitude(), 38.9);
        assert_eq!(fd.search_longitude(), -77.1);
        assert_eq!(fd.search_radius(), 10);
    }
}
