/*
 *  main.rs
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

use std::process::ExitCode;
use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};

// always unix
use tokio::signal::unix::{signal, SignalKind};

use radarpi::config::{self, Cli};
use radarpi::flight::SearchArea;
use radarpi::{CycleOutcome, RadarService};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

const EXIT_INTERRUPTED: u8 = 130;

/// Asynchronously waits for a SIGINT, SIGTERM, or SIGHUP signal.
async fn signal_handler() -> Result<(), std::io::Error> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

/// Resolves on the first shutdown signal, never if handlers cannot be installed.
async fn shutdown_signal() {
    if let Err(e) = signal_handler().await {
        warn!("Signal handlers unavailable: {e}");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            // logger may not be up yet
            eprintln!("Error: {e:#}");
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let loaded = config::load(&cli).context("failed to load settings")?;
    let settings = loaded.settings.clone();

    let level = if cli.debug { "debug" } else { settings.log_level.as_deref().unwrap_or("info") };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    info!("{} - nearest aircraft on e-ink", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    if !cli.quiet {
        if let Some(warning) = loaded.config_warning() {
            warn!("{warning}");
        }
    }
    if let Some(source) = loaded.source.as_ref() {
        info!("Config loaded from {}", source.display());
    }

    if cli.dump_config {
        print!("{}", serde_yaml::to_string(&settings)?);
        return Ok(ExitCode::SUCCESS);
    }

    let area = settings.search_area();
    let service = RadarService::from_settings(settings).context("failed to set up the flight data client")?;

    if cli.data_only {
        return data_only(&service, &area, cli.json).await;
    }

    #[cfg(feature = "gpio")]
    if let Some(pin) = cli.button {
        return button_loop(&service, &area, pin).await;
    }

    info!("Starting RadarPi flight display");
    info!("Output file: {}", service.settings().output_image_file.display());
    let outcome = service.run_until(&area, shutdown_signal()).await;
    Ok(report(&outcome))
}

async fn data_only<S>(service: &RadarService<S>, area: &SearchArea, json: bool) -> anyhow::Result<ExitCode>
where
    S: radarpi::flight::FlightSource,
{
    let flight_data = tokio::select! {
        biased;
        _ = shutdown_signal() => return Ok(ExitCode::from(EXIT_INTERRUPTED)),
        res = service.get_flight_data(area) => res,
    };

    match flight_data {
        Ok(Some(fd)) if json => {
            println!("{}", serde_json::to_string_pretty(&fd.summary())?);
            Ok(ExitCode::SUCCESS)
        }
        Ok(Some(fd)) => {
            print!("{fd}");
            Ok(ExitCode::SUCCESS)
        }
        Ok(None) => {
            println!("No flight data available.");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            error!("Error fetching flight data: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(feature = "gpio")]
async fn button_loop<S>(service: &RadarService<S>, area: &SearchArea, pin: u8) -> anyhow::Result<ExitCode>
where
    S: radarpi::flight::FlightSource,
{
    let mut presses = radarpi::gpio::watch_button(pin).with_context(|| format!("failed to watch GPIO{pin}"))?;
    let mut shutdown = Box::pin(shutdown_signal());

    loop {
        tokio::select! {
            _ = shutdown.as_mut() => return Ok(ExitCode::from(EXIT_INTERRUPTED)),
            press = presses.recv() => {
                if press.is_none() {
                    warn!("Button watcher stopped");
                    return Ok(ExitCode::FAILURE);
                }
                info!("Button pressed");
                let outcome = service.run_until(area, shutdown.as_mut()).await;
                if matches!(outcome, CycleOutcome::Interrupted) {
                    return Ok(report(&outcome));
                }
                report(&outcome);
            }
        }
    }
}

fn report(outcome: &CycleOutcome) -> ExitCode {
    match outcome {
        CycleOutcome::Rendered { path, bytes } => {
            info!("Flight display generated successfully: {} ({} bytes)", path.display(), bytes);
            ExitCode::SUCCESS
        }
        CycleOutcome::Interrupted => {
            info!("Goodbye!");
            ExitCode::from(EXIT_INTERRUPTED)
        }
        CycleOutcome::NoAircraft | CycleOutcome::FetchFailed(_) | CycleOutcome::RenderFailed(_) => {
            error!("Failed to generate flight display");
            ExitCode::FAILURE
        }
    }
}
