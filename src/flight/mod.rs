/*
 *  flight/mod.rs
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

//! Flight data: fetching the upstream ADS-B feed, normalizing aircraft
//! records and aggregating them into one [`FlightData`] per poll.

pub mod fetcher;
pub mod models;
pub mod parser;

pub use fetcher::{FetchError, FlightDataFetcher, FlightSource};
pub use models::{Aircraft, DisplaySummary, FlightData, NormalizeError};
pub use parser::{aggregate, extract_aircraft_list};

use serde::Serialize;
use std::fmt;

/// Query parameters of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchArea {
    pub latitude: f64,
    pub longitude: f64,
    /// nautical miles
    pub radius: u32,
}

impl fmt::Display for SearchArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {} (radius: {} nm)", self.latitude, self.longitude, self.radius)
    }
}
