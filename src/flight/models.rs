/*
 *  flight/models.rs
 *
 *  RadarPi - nearest aircraft on e-ink
 *	(c) 2025-26 RadarPi contributors
 *
 *  Canonical aircraft and poll result records
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
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use super::SearchArea;

pub const UNKNOWN: &str = "Unknown";
pub const UNKNOWN_FLIGHT: &str = "UNKNOWN";
pub const NO_DATA_FLIGHT: &str = "NO DATA";

/// Why a single upstream aircraft record could not be normalized.
#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("aircraft record is not a JSON object: {0}")]
    NotAnObject(String),
    #[error("field '{field}' has unexpected type: {value}")]
    UnexpectedType { field: &'static str, value: String },
    #[error("field '{field}' is not numeric: {value:?}")]
    NotNumeric { field: &'static str, value: String },
}

/// One observed aircraft.
///
/// Passthrough fields keep the upstream JSON value untouched, the API mixes
/// numbers and strings (`alt_baro` is `"ground"` for taxiing aircraft).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aircraft {
    pub flight_number: String,
    pub model: String,
    pub registration: String,
    /// knots
    pub ground_speed: f64,
    pub altitude: Option<Value>,
    pub hex_code: Option<Value>,
    pub latitude: Option<Value>,
    pub longitude: Option<Value>,
    pub heading: Option<Value>,
    pub vertical_rate: Option<Value>,
    pub squawk: Option<Value>,
}

impl Aircraft {
    /// Normalize one element of the upstream aircraft list.
    pub fn from_api_data(data: &Value) -> Result<Self, NormalizeError> {
        let fields = data
            .as_object()
            .ok_or_else(|| NormalizeError::NotAnObject(data.to_string()))?;

        Ok(Aircraft {
            flight_number: flight_number(field(fields, "flight"), field(fields, "hex"))?,
            model: text_or_unknown(field(fields, "t")),
            registration: text_or_unknown(field(fields, "r")),
            ground_speed: ground_speed(field(fields, "gs"))?,
            altitude: field(fields, "alt_baro").cloned(),
            hex_code: field(fields, "hex").cloned(),
            latitude: field(fields, "lat").cloned(),
            longitude: field(fields, "lon").cloned(),
            heading: field(fields, "track").cloned(),
            vertical_rate: field(fields, "baro_rate").cloned(),
            squawk: field(fields, "squawk").cloned(),
        })
    }
}

/// Present and not null.
fn field<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    fields.get(key).filter(|v| !v.is_null())
}

/// Callsign, else "AC" + last four hex chars, else "UNKNOWN".
fn flight_number(flight: Option<&Value>, hex: Option<&Value>) -> Result<String, NormalizeError> {
    let callsign = match flight {
        None => "",
        Some(Value::String(s)) => s.trim(),
        Some(other) => {
            return Err(NormalizeError::UnexpectedType { field: "flight", value: other.to_string() });
        }
    };
    if !callsign.is_empty() {
        return Ok(callsign.to_string());
    }

    let hex = match hex {
        None => "",
        Some(Value::String(h)) => h.trim(),
        Some(other) => {
            return Err(NormalizeError::UnexpectedType { field: "hex", value: other.to_string() });
        }
    };
    if hex.is_empty() {
        return Ok(UNKNOWN_FLIGHT.to_string());
    }

    let skip = hex.chars().count().saturating_sub(4);
    let tail: String = hex.chars().skip(skip).collect();
    Ok(format!("AC{tail}"))
}

fn text_or_unknown(value: Option<&Value>) -> String {
    match value {
        None => UNKNOWN.to_string(),
        Some(v) => value_text(v),
    }
}

fn ground_speed(gs: Option<&Value>) -> Result<f64, NormalizeError> {
    match gs {
        None => Ok(0.0),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| NormalizeError::NotNumeric { field: "gs", value: n.to_string() }),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| NormalizeError::NotNumeric { field: "gs", value: s.clone() }),
        Some(other) => Err(NormalizeError::UnexpectedType { field: "gs", value: other.to_string() }),
    }
}

/// Strings without quotes, everything else as JSON text.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for Aircraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let altitude = self.altitude.as_ref().map(value_text);
        write!(
            f,
            "Callsign: {}, Altitude: {} ft, Speed: {:?} knots, Model: {}, Registration: {}",
            self.flight_number,
            altitude.as_deref().unwrap_or(UNKNOWN),
            self.ground_speed,
            self.model,
            self.registration
        )
    }
}

/// One poll result. Built once by the aggregator, never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightData {
    aircraft: Vec<Aircraft>,
    timestamp: DateTime<Local>,
    total_count: usize,
    search: SearchArea,
}

impl FlightData {
    pub fn new(
        aircraft: Vec<Aircraft>,
        timestamp: DateTime<Local>,
        total_count: usize,
        search: SearchArea,
    ) -> Self {
        FlightData { aircraft, timestamp, total_count, search }
    }

    pub fn aircraft(&self) -> &[Aircraft] {
        &self.aircraft
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    /// Length of the raw upstream list, may exceed `aircraft().len()`.
    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn search_latitude(&self) -> f64 {
        self.search.latitude
    }

    pub fn search_longitude(&self) -> f64 {
        self.search.longitude
    }

    pub fn search_radius(&self) -> u32 {
        self.search.radius
    }

    pub fn search_area(&self) -> &SearchArea {
        &self.search
    }

    /// The aircraft shown on the display.
    pub fn primary_aircraft(&self) -> Option<&Aircraft> {
        self.aircraft.first()
    }

    pub fn summary(&self) -> DisplaySummary {
        match self.primary_aircraft() {
            Some(primary) => DisplaySummary {
                error: None,
                flight_number: primary.flight_number.clone(),
                model: primary.model.clone(),
                registration: primary.registration.clone(),
                ground_speed: primary.ground_speed,
                altitude: primary
                    .altitude
                    .clone()
                    .unwrap_or_else(|| Value::String(UNKNOWN.to_string())),
                last_updated: self.timestamp,
                total_aircraft: self.total_count,
            },
            None => DisplaySummary {
                error: Some("No aircraft data available".to_string()),
                flight_number: NO_DATA_FLIGHT.to_string(),
                model: UNKNOWN.to_string(),
                registration: UNKNOWN.to_string(),
                ground_speed: 0.0,
                altitude: Value::String(UNKNOWN.to_string()),
                last_updated: self.timestamp,
                total_aircraft: 0,
            },
        }
    }
}

/// Primary aircraft in the shape consumed by display front ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub flight_number: String,
    pub model: String,
    pub registration: String,
    pub ground_speed: f64,
    pub altitude: Value,
    pub last_updated: DateTime<Local>,
    pub total_aircraft: usize,
}

impl fmt::Display for FlightData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Nearby Aircraft:")?;
        writeln!(f, "{}", "-".repeat(50))?;
        if self.aircraft.is_empty() {
            return writeln!(f, "No aircraft found in the specified area.");
        }
        for aircraft in &self.aircraft {
            writeln!(f, "{aircraft}")?;
        }
        writeln!(f)?;
        writeln!(f, "Total aircraft nearby: {}", self.total_count)?;
        writeln!(f, "Search area: {}", self.search)?;
        write!(f, "Last updated: {}", self.timestamp.format("%Y-%m-%d %H:%M:%S"))
    }
}
