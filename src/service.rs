/*
 *  service.rs
 *
 *  RadarPi - nearest aircraft on e-ink
 *	(c) 2025-26 RadarPi contributors
 *
 *  One fetch, aggregate, render cycle
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
use log::{error, info, warn};
use std::future::Future;
use std::path::PathBuf;

use crate::config::Settings;
use crate::display::{RenderError, Renderer};
use crate::flight::{FetchError, FlightData, FlightDataFetcher, FlightSource, SearchArea, aggregate};

/// How a cycle ended. Only `Rendered` counts as success.
#[derive(Debug)]
pub enum CycleOutcome {
    Rendered { path: PathBuf, bytes: usize },
    NoAircraft,
    FetchFailed(FetchError),
    RenderFailed(RenderError),
    Interrupted,
}

impl CycleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CycleOutcome::Rendered { .. })
    }
}

pub struct RadarService<S: FlightSource> {
    settings: Settings,
    source: S,
    renderer: Renderer,
}

impl RadarService<FlightDataFetcher> {
    pub fn from_settings(settings: Settings) -> Result<Self, FetchError> {
        let fetcher = FlightDataFetcher::new(&settings.api_base_url, settings.api_timeout())?;
        let renderer = Renderer::from_settings(&settings);
        Ok(RadarService::new(settings, fetcher, renderer))
    }
}

impl<S: FlightSource> RadarService<S> {
    pub fn new(settings: Settings, source: S, renderer: Renderer) -> Self {
        RadarService { settings, source, renderer }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// FETCH + AGGREGATE. `Ok(None)` when nothing is in range.
    pub async fn get_flight_data(&self, area: &SearchArea) -> Result<Option<FlightData>, FetchError> {
        let response = self.source.closest(area).await?;
        let flight_data = aggregate(Some(&response), *area, self.settings.max_aircraft_display);

        match flight_data.as_ref() {
            Some(fd) => {
                info!("Found {} aircraft", fd.aircraft().len());
                if let Some(primary) = fd.primary_aircraft() {
                    info!("Primary: {} ({}), {} knots", primary.flight_number, primary.model, primary.ground_speed);
                }
            }
            None => info!("No aircraft found in the specified area"),
        }
        Ok(flight_data)
    }

    /// FETCH, AGGREGATE, RENDER. No retries, the output is only touched on success.
    pub async fn run_full_cycle(&self, area: &SearchArea) -> CycleOutcome {
        let flight_data = match self.get_flight_data(area).await {
            Ok(Some(fd)) => fd,
            Ok(None) => {
                warn!("No flight data available for display generation");
                return CycleOutcome::NoAircraft;
            }
            Err(e) => {
                error!("Error fetching flight data: {e}");
                return CycleOutcome::FetchFailed(e);
            }
        };

        info!("Generating flight display image");
        match self.renderer.render(Some(&flight_data)).await {
            Ok(png) => CycleOutcome::Rendered {
                path: self.renderer.output_path().to_path_buf(),
                bytes: png.len(),
            },
            Err(e) => {
                error!("Failed to generate flight display: {e}");
                CycleOutcome::RenderFailed(e)
            }
        }
    }

    /// Run one cycle unless `shutdown` resolves first.
    ///
    /// The in-flight cycle is dropped on shutdown, which removes its temporary
    /// files and kills any rendering engine still running.
    pub async fn run_until<F>(&self, area: &SearchArea, shutdown: F) -> CycleOutcome
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = shutdown => {
                warn!("Process interrupted, cycle abandoned");
                CycleOutcome::Interrupted
            }
            outcome = self.run_full_cycle(area) => outcome,
        }
    }
}
