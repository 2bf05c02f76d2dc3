/*
 *  display/template.rs
 *
 *  RadarPi - nearest aircraft on e-ink
 *	(c) 2025-26 RadarPi contributors
 *
 *  Display field resolution and placeholder substitution
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
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::error::RenderError;
use crate::config::EngineKind;
use crate::flight::models::{Aircraft, FlightData, NO_DATA_FLIGHT, UNKNOWN};

pub const NOT_AVAILABLE: &str = "N/A";

pub const DEFAULT_SVG_TEMPLATE: &str = include_str!("../../templates/flight_display.svg");
pub const DEFAULT_HTML_TEMPLATE: &str = include_str!("../../templates/flight_display.html");

/// The five strings that end up on the display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFields {
    pub flight_number: String,
    pub model: String,
    pub registration: String,
    pub ground_speed: String,
    pub altitude: String,
}

impl DisplayFields {
    /// Total over missing data: no result and no primary aircraft both yield the sentinel screen.
    pub fn resolve(flight_data: Option<&FlightData>) -> Self {
        match flight_data.and_then(FlightData::primary_aircraft) {
            Some(aircraft) => DisplayFields::from(aircraft),
            None => DisplayFields::no_data(),
        }
    }

    pub fn no_data() -> Self {
        DisplayFields {
            flight_number: NO_DATA_FLIGHT.to_string(),
            model: UNKNOWN.to_string(),
            registration: UNKNOWN.to_string(),
            ground_speed: NOT_AVAILABLE.to_string(),
            altitude: NOT_AVAILABLE.to_string(),
        }
    }

    fn lookup(&self, placeholder: &str) -> Option<&str> {
        match placeholder {
            "flight_number" => Some(&self.flight_number),
            "model" => Some(&self.model),
            "registration" => Some(&self.registration),
            "ground_speed" => Some(&self.ground_speed),
            "altitude" => Some(&self.altitude),
            _ => None,
        }
    }
}

impl From<&Aircraft> for DisplayFields {
    fn from(aircraft: &Aircraft) -> Self {
        DisplayFields {
            flight_number: non_empty_or(&aircraft.flight_number, NOT_AVAILABLE),
            model: non_empty_or(&aircraft.model, UNKNOWN),
            registration: non_empty_or(&aircraft.registration, UNKNOWN),
            ground_speed: format_ground_speed(Some(aircraft.ground_speed)),
            altitude: format_altitude(aircraft.altitude.as_ref()),
        }
    }
}

fn non_empty_or(s: &str, fallback: &str) -> String {
    if s.is_empty() { fallback } else { s }.to_string()
}

/// Knots with one decimal, `N/A` when unknown.
pub fn format_ground_speed(ground_speed: Option<f64>) -> String {
    match ground_speed {
        Some(gs) if gs.is_finite() => format!("{gs:.1}"),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Whole feet. Accepts numbers and strings such as `"35000ft"`, everything else is `N/A`.
pub fn format_altitude(altitude: Option<&Value>) -> String {
    let feet = match altitude {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.strip_suffix("ft").unwrap_or(s).trim().parse::<f64>().ok()
        }
        _ => None,
    };
    match feet {
        Some(ft) if ft.is_finite() => format!("{}", ft.trunc() as i64),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Substitute every placeholder in one pass over the template.
///
/// Values are escaped, templates are XML or HTML. Substituted text is never
/// scanned again, and unknown `{{...}}` tokens are copied through unchanged.
pub fn populate(template: &str, fields: &DisplayFields) -> String {
    let mut page = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        page.push_str(&rest[..start]);
        let token = &rest[start..];
        match token[2..].find("}}") {
            Some(end) => {
                let name = &token[2..2 + end];
                match fields.lookup(name) {
                    Some(value) => page.push_str(&escape_markup(value)),
                    None => page.push_str(&token[..end + 4]),
                }
                rest = &token[end + 4..];
            }
            None => {
                page.push_str(token);
                rest = "";
            }
        }
    }
    page.push_str(rest);
    page
}

fn escape_markup(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Where the template text comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSource {
    Builtin(EngineKind),
    File(PathBuf),
}

impl TemplateSource {
    pub fn new(path: Option<&Path>, engine: EngineKind) -> Self {
        match path {
            Some(p) => TemplateSource::File(p.to_path_buf()),
            None => TemplateSource::Builtin(engine),
        }
    }

    pub async fn load(&self) -> Result<String, RenderError> {
        match self {
            TemplateSource::Builtin(EngineKind::Svg) => Ok(DEFAULT_SVG_TEMPLATE.to_string()),
            TemplateSource::Builtin(EngineKind::Browser) => Ok(DEFAULT_HTML_TEMPLATE.to_string()),
            TemplateSource::File(path) => match tokio::fs::read_to_string(path).await {
                Ok(text) => Ok(text),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(RenderError::TemplateMissing(path.clone()))
                }
                Err(e) => Err(RenderError::Io(e)),
            },
        }
    }

    /// File suffix for the intermediate page handed to an external engine.
    pub fn suffix(&self) -> String {
        match self {
            TemplateSource::Builtin(EngineKind::Svg) => ".svg".to_string(),
            TemplateSource::Builtin(EngineKind::Browser) => ".html".to_string(),
            TemplateSource::File(path) => path
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_else(|| ".html".to_string()),
        }
    }
}
