/*
 *  config.rs
 *
 *  RadarPi - nearest aircraft on e-ink
 *	(c) 2025-26 RadarPi contributors
 *
 *  Layered settings: built-in defaults < YAML file < environment < CLI
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
use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use thiserror::Error;

use crate::flight::SearchArea;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid value for {var}: {value:?}")]
    Environment { var: &'static str, value: String },
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Rasterization engine used to turn the populated template into a PNG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// in-process SVG rendering
    #[default]
    Svg,
    /// external headless browser screenshot
    Browser,
}

/// Effective, fully resolved settings. Read-only once `load` returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub latitude: f64,
    pub longitude: f64,
    /// nautical miles
    pub radius: u32,
    pub api_base_url: String,
    pub api_timeout_secs: u64,
    pub display_width: u32,
    pub display_height: u32,
    pub max_aircraft_display: usize,
    pub output_image_file: PathBuf,
    pub render: RenderSettings,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    pub engine: EngineKind,
    pub timeout_secs: u64,
    /// user supplied template, the compiled-in one is used when unset
    pub template: Option<PathBuf>,
    /// extra fonts for the svg engine
    pub font_dir: Option<PathBuf>,
    pub browser_cmd: String,
    /// `{url}`, `{input}`, `{output}`, `{width}` and `{height}` are expanded per run
    pub browser_args: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            // Washington DC area
            latitude: 38.89580240857114,
            longitude: -77.09308316546287,
            radius: 10,
            api_base_url: "https://api.adsb.lol/v2".to_string(),
            api_timeout_secs: 10,
            display_width: 800,
            display_height: 480,
            max_aircraft_display: 10,
            output_image_file: PathBuf::from("curr_flight.png"),
            render: RenderSettings::default(),
            log_level: None,
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            engine: EngineKind::Svg,
            timeout_secs: 140,
            template: None,
            font_dir: None,
            browser_cmd: "chromium".to_string(),
            browser_args: [
                "--headless",
                "--disable-gpu",
                "--hide-scrollbars",
                "--force-device-scale-factor=1",
                "--window-size={width},{height}",
                "--screenshot={output}",
                "{url}",
            ]
            .iter()
            .map(|a| a.to_string())
            .collect(),
        }
    }
}

impl Settings {
    pub fn search_area(&self) -> SearchArea {
        SearchArea {
            latitude: self.latitude,
            longitude: self.longitude,
            radius: self.radius,
        }
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render.timeout_secs)
    }
}

/// On-disk configuration. All fields are Options so we can layer them over the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    pub log_level: Option<String>,
    pub location: Option<LocationConfig>,
    pub api: Option<ApiConfig>,
    pub display: Option<DisplayConfig>,
    pub render: Option<RenderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocationConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub max_aircraft: Option<usize>,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RenderConfig {
    pub engine: Option<EngineKind>,
    pub timeout_secs: Option<u64>,
    pub template: Option<PathBuf>,
    pub font_dir: Option<PathBuf>,
    pub browser_cmd: Option<String>,
    pub browser_args: Option<Vec<String>>,
}

/// CLI overrides, highest precedence.
#[derive(Debug, Parser, Clone, Default)]
#[command(
    name = "radarpi",
    version,
    about = "Generate nearest-aircraft display images for e-ink panels",
    after_help = "Examples:\
        \n  radarpi                                  # default coordinates\
        \n  radarpi --lat 40.7128 --lon -74.0060     # New York City\
        \n  radarpi --radius 20                      # 20 nautical mile radius\
        \n  radarpi --output flight.png              # custom output file\
        \n  radarpi --data-only --json               # print data, no image"
)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(short = 'c', long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Latitude for search center
    #[arg(long = "lat", visible_alias = "latitude", allow_negative_numbers = true)]
    pub latitude: Option<f64>,
    /// Longitude for search center
    #[arg(long = "lon", visible_alias = "longitude", allow_negative_numbers = true)]
    pub longitude: Option<f64>,
    /// Search radius in nautical miles
    #[arg(long)]
    pub radius: Option<u32>,
    /// Output image filename
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,
    /// Only fetch and display data, do not generate image
    #[arg(long, action = ArgAction::SetTrue)]
    pub data_only: bool,
    /// Print the display summary as JSON (with --data-only)
    #[arg(long, action = ArgAction::SetTrue, requires = "data_only")]
    pub json: bool,
    /// Suppress configuration warnings
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub quiet: bool,
    /// Enable debug log level
    #[arg(short = 'v', long, alias = "verbose", action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub log_level: Option<String>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
    /// BCM pin of a push button; one render cycle per press
    #[cfg(feature = "gpio")]
    #[arg(long)]
    pub button: Option<u8>,
}

/// Settings plus where they came from.
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: Settings,
    pub source: Option<PathBuf>,
}

impl LoadedSettings {
    /// Warning shown when running on built-in coordinates.
    pub fn config_warning(&self) -> Option<String> {
        match self.source {
            Some(_) => None,
            None => Some("No config file found. Using default coordinates (Washington DC area).".to_string()),
        }
    }
}

/// Public entry point: read YAML, apply environment and CLI, validate.
pub fn load(cli: &Cli) -> Result<LoadedSettings, ConfigError> {
    load_with_env(cli, |var| std::env::var(var).ok())
}

/// `load` with the environment supplied by `lookup`.
pub fn load_with_env<L>(cli: &Cli, lookup: L) -> Result<LoadedSettings, ConfigError>
where
    L: Fn(&str) -> Option<String>,
{
    // 1) defaults (from `Default` impl)
    let mut settings = Settings::default();

    // 2) YAML file (explicit path or search)
    let source = match cli.config.as_ref() {
        Some(p) if p.exists() => Some(p.clone()),
        Some(p) => {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
        None => find_config_file(),
    };
    if let Some(p) = source.as_ref() {
        merge(&mut settings, read_yaml(p)?);
    }

    // 3) environment
    apply_env_overrides(&mut settings, lookup)?;

    // 4) CLI overrides (highest precedence)
    apply_cli_overrides(&mut settings, cli);

    validate(&settings)?;

    Ok(LoadedSettings { settings, source })
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/radarpi/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/radarpi/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/radarpi.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["radarpi.yaml", "config.yaml", "config/radarpi.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<FileConfig, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(s: &str) -> Result<FileConfig, ConfigError> {
    let cfg: FileConfig = serde_yaml::from_str(s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
pub fn merge(dst: &mut Settings, src: FileConfig) {
    if src.log_level.is_some() { dst.log_level = src.log_level; }
    if let Some(loc) = src.location {
        if let Some(v) = loc.latitude  { dst.latitude = v; }
        if let Some(v) = loc.longitude { dst.longitude = v; }
        if let Some(v) = loc.radius    { dst.radius = v; }
    }
    if let Some(api) = src.api {
        if let Some(v) = api.base_url     { dst.api_base_url = v; }
        if let Some(v) = api.timeout_secs { dst.api_timeout_secs = v; }
    }
    if let Some(display) = src.display {
        if let Some(v) = display.width        { dst.display_width = v; }
        if let Some(v) = display.height       { dst.display_height = v; }
        if let Some(v) = display.max_aircraft { dst.max_aircraft_display = v; }
        if let Some(v) = display.output       { dst.output_image_file = v; }
    }
    if let Some(render) = src.render {
        merge_render(&mut dst.render, render);
    }
}

fn merge_render(dst: &mut RenderSettings, src: RenderConfig) {
    if let Some(v) = src.engine       { dst.engine = v; }
    if let Some(v) = src.timeout_secs { dst.timeout_secs = v; }
    if src.template.is_some()         { dst.template = src.template; }
    if src.font_dir.is_some()         { dst.font_dir = src.font_dir; }
    if let Some(v) = src.browser_cmd  { dst.browser_cmd = v; }
    if let Some(v) = src.browser_args { dst.browser_args = v; }
}

/// Apply `RADAR_*` variables. `lookup` is `std::env::var` outside of tests.
pub fn apply_env_overrides<L>(dst: &mut Settings, lookup: L) -> Result<(), ConfigError>
where
    L: Fn(&str) -> Option<String>,
{
    if let Some(v) = env_value(&lookup, "RADAR_LATITUDE")?       { dst.latitude = v; }
    if let Some(v) = env_value(&lookup, "RADAR_LONGITUDE")?      { dst.longitude = v; }
    if let Some(v) = env_value(&lookup, "RADAR_RADIUS")?         { dst.radius = v; }
    if let Some(v) = env_value(&lookup, "RADAR_OUTPUT")?         { dst.output_image_file = v; }
    if let Some(v) = env_value(&lookup, "RADAR_API_URL")?        { dst.api_base_url = v; }
    if let Some(v) = env_value(&lookup, "RADAR_API_TIMEOUT")?    { dst.api_timeout_secs = v; }
    if let Some(v) = env_value(&lookup, "RADAR_RENDER_TIMEOUT")? { dst.render.timeout_secs = v; }
    if let Some(v) = env_value(&lookup, "RADAR_MAX_AIRCRAFT")?   { dst.max_aircraft_display = v; }
    Ok(())
}

fn env_value<T, L>(lookup: &L, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    L: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Environment { var, value: raw }),
        _ => Ok(None),
    }
}

pub fn apply_cli_overrides(cfg: &mut Settings, cli: &Cli) {
    if let Some(v) = cli.latitude  { cfg.latitude = v; }
    if let Some(v) = cli.longitude { cfg.longitude = v; }
    if let Some(v) = cli.radius    { cfg.radius = v; }
    if let Some(v) = cli.output.as_ref() { cfg.output_image_file = v.clone(); }
    if cli.log_level.is_some() { cfg.log_level = cli.log_level.clone(); }
}

/// Put any invariants here (required fields, ranges, etc.)
pub fn validate(cfg: &Settings) -> Result<(), ConfigError> {
    if !(-90.0..=90.0).contains(&cfg.latitude) {
        return Err(ConfigError::Validation(format!("latitude {} out of range", cfg.latitude)));
    }
    if !(-180.0..=180.0).contains(&cfg.longitude) {
        return Err(ConfigError::Validation(format!("longitude {} out of range", cfg.longitude)));
    }
    if cfg.radius == 0 {
        return Err(ConfigError::Validation("radius must be > 0".into()));
    }
    if cfg.display_width == 0 || cfg.display_height == 0 {
        return Err(ConfigError::Validation("display width/height must be > 0".into()));
    }
    if cfg.max_aircraft_display == 0 {
        return Err(ConfigError::Validation("max_aircraft must be > 0".into()));
    }
    if cfg.api_timeout_secs == 0 || cfg.render.timeout_secs == 0 {
        return Err(ConfigError::Validation("timeouts must be > 0".into()));
    }
    if cfg.output_image_file.as_os_str().is_empty() {
        return Err(ConfigError::Validation("output file must not be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let s = Settings::default();
        assert!(validate(&s).is_ok());
        assert_eq!((s.display_width, s.display_height), (800, 480));
        assert_eq!(s.max_aircraft_display, 10);
        assert_eq!(s.render.engine, EngineKind::Svg);
    }

    #[test]
    fn test_yaml_merge() {
        let yaml = r#"
location:
  latitude: 51.47
  longitude: -0.4543
display:
  output: /tmp/flight.png
render:
  engine: browser
  browser_cmd: chromium-browser
"#;
        let mut s = Settings::default();
        merge(&mut s, parse_yaml(yaml).unwrap());
        assert_eq!(s.latitude, 51.47);
        assert_eq!(s.longitude, -0.4543);
        // untouched by the file
        assert_eq!(s.radius, 10);
        assert_eq!(s.output_image_file, PathBuf::from("/tmp/flight.png"));
        assert_eq!(s.render.engine, EngineKind::Browser);
        assert_eq!(s.render.browser_cmd, "chromium-browser");
        assert_eq!(s.render.browser_args, RenderSettings::default().browser_args);
    }

    #[test]
    fn test_precedence_default_file_env_cli() {
        let mut s = Settings::default();
        merge(&mut s, parse_yaml("location:\n  latitude: 10.0\n  longitude: 20.0\n  radius: 5\n").unwrap());
        apply_env_overrides(&mut s, env(&[("RADAR_LONGITUDE", "30.5"), ("RADAR_RADIUS", "7")])).unwrap();
        let cli = Cli { radius: Some(25), ..Default::default() };
        apply_cli_overrides(&mut s, &cli);

        assert_eq!(s.latitude, 10.0); // file
        assert_eq!(s.longitude, 30.5); // env beats file
        assert_eq!(s.radius, 25); // cli beats env
    }

    #[test]
    fn test_bad_env_value() {
        let mut s = Settings::default();
        let err = apply_env_overrides(&mut s, env(&[("RADAR_RADIUS", "ten")])).unwrap_err();
        assert!(matches!(err, ConfigError::Environment { var: "RADAR_RADIUS", .. }));
    }

    #[test]
    fn test_blank_env_ignored() {
        let mut s = Settings::default();
        apply_env_overrides(&mut s, env(&[("RADAR_LATITUDE", "  ")])).unwrap();
        assert_eq!(s.latitude, Settings::default().latitude);
    }

    #[test]
    fn test_validate_ranges() {
        let s = Settings { latitude: 91.0, ..Default::default() };
        assert!(validate(&s).is_err());
        let s = Settings { display_height: 0, ..Default::default() };
        assert!(validate(&s).is_err());
        let s = Settings { max_aircraft_display: 0, ..Default::default() };
        assert!(validate(&s).is_err());
    }

    #[test]
    fn test_missing_explicit_config() {
        let cli = Cli { config: Some(PathBuf::from("/nonexistent/radarpi.yaml")), ..Default::default() };
        assert!(matches!(load_with_env(&cli, env(&[])), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_explicit_config_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("radarpi.yaml");
        fs::write(&path, "location:\n  radius: 42\n").unwrap();
        let cli = Cli { config: Some(path.clone()), ..Default::default() };
        let loaded = load_with_env(&cli, env(&[])).unwrap();
        assert_eq!(loaded.source, Some(path));
        assert_eq!(loaded.settings.radius, 42);
        assert_eq!(loaded.settings.latitude, Settings::default().latitude);
        assert!(loaded.config_warning().is_none());
    }

    #[test]
    fn test_load_layers_supplied_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("radarpi.yaml");
        fs::write(&path, "location:\n  radius: 42\n  latitude: 12.5\n").unwrap();
        let cli = Cli { config: Some(path), latitude: Some(-33.9), ..Default::default() };

        let loaded = load_with_env(&cli, env(&[("RADAR_RADIUS", "15"), ("RADAR_LATITUDE", "1.0")])).unwrap();
        assert_eq!(loaded.settings.radius, 15); // env beats file
        assert_eq!(loaded.settings.latitude, -33.9); // cli beats env

        let err = load_with_env(&cli, env(&[("RADAR_MAX_AIRCRAFT", "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::Environment { var: "RADAR_MAX_AIRCRAFT", .. }));
    }

    #[test]
    fn test_cli_parse_negative_longitude() {
        let cli = Cli::try_parse_from(["radarpi", "--lat", "40.7128", "--lon", "-74.0060", "--data-only", "--json"]).unwrap();
        assert_eq!(cli.latitude, Some(40.7128));
        assert_eq!(cli.longitude, Some(-74.0060));
        assert!(cli.data_only && cli.json);
    }

    #[test]
    fn test_cli_json_requires_data_only() {
        assert!(Cli::try_parse_from(["radarpi", "--json"]).is_err());
    }
}
