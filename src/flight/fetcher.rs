/*
 *  flight/fetcher.rs
 *
 *  RadarPi - nearest aircraft on e-ink
 *	(c) 2025-26 RadarPi contributors
 *
 *  ADS-B "closest aircraft" client
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
use flate2::read::GzDecoder;
use log::{debug, info};
use reqwest::{Client, StatusCode, header};
use serde_json::Value;
use std::future::Future;
use std::io::Read;
use std::time::Duration;
use thiserror::Error;

use super::SearchArea;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Transport failures. Each one ends the cycle, there is no retry.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timeout after {} seconds", .0.as_secs_f32())]
    Timeout(Duration),
    #[error("connection error - check your internet connection: {0}")]
    Connection(#[source] reqwest::Error),
    #[error("HTTP error: {0}")]
    Status(StatusCode),
    #[error("request error: {0}")]
    Request(#[source] reqwest::Error),
    #[error("invalid JSON response: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Anything that can answer a nearest-aircraft query with raw JSON.
pub trait FlightSource {
    fn closest(&self, area: &SearchArea) -> impl Future<Output = Result<Value, FetchError>> + Send;
}

#[derive(Debug, Clone)]
pub struct FlightDataFetcher {
    base_url: String,
    timeout: Duration,
    client: Client,
}

impl FlightDataFetcher {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        const VERSION: &'static str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

        let mut headers = header::HeaderMap::new();
        headers.insert("User-Agent", header::HeaderValue::from_static(VERSION));
        headers.insert("Accept", header::HeaderValue::from_static("application/json"));
        headers.insert("Accept-Encoding", header::HeaderValue::from_static("gzip"));
        headers.insert("Connection", header::HeaderValue::from_static("close"));

        let client = Client::builder()
            .connect_timeout(timeout)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(FetchError::Request)?;

        Ok(FlightDataFetcher {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }

    pub fn closest_url(&self, area: &SearchArea) -> String {
        format!("{}/closest/{}/{}/{}", self.base_url, area.latitude, area.longitude, area.radius)
    }

    /// One GET, one bounded timeout, no retry.
    pub async fn get_closest_flights(&self, area: &SearchArea) -> Result<Value, FetchError> {
        let url = self.closest_url(area);
        info!("Searching for aircraft near {area}");
        debug!("GET {url}");

        let response = self.client.get(&url).send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let raw = response.bytes().await.map_err(|e| self.classify(e))?;
        parse_body(&raw)
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if err.is_connect() {
            FetchError::Connection(err)
        } else {
            FetchError::Request(err)
        }
    }
}

impl FlightSource for FlightDataFetcher {
    async fn closest(&self, area: &SearchArea) -> Result<Value, FetchError> {
        self.get_closest_flights(area).await
    }
}

/// Gzip bodies are decoded, anything else is taken as is.
fn decode_body(raw: &[u8]) -> Vec<u8> {
    if raw.starts_with(&GZIP_MAGIC) {
        let mut decoder = GzDecoder::new(raw);
        let mut decoded = Vec::new();
        if decoder.read_to_end(&mut decoded).is_ok() {
            return decoded;
        }
    }
    raw.to_vec()
}

/// Invalid UTF-8 is a JSON error, never silently replaced.
fn parse_body(raw: &[u8]) -> Result<Value, FetchError> {
    Ok(serde_json::from_slice(&decode_body(raw))?)
}
