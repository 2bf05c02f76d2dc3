/*
 *  display/error.rs
 *
 *  RadarPi - nearest aircraft on e-ink
 *	(c) 2025-26 RadarPi contributors
 *
 *  Error types for the render pipeline
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::fmt;
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use super::svgimage::SvgImageError;

/// Everything that can stop a render. None of these leave a partial image behind.
#[derive(Debug)]
pub enum RenderError {
    /// Configured template file does not exist
    TemplateMissing(PathBuf),

    /// Temp file, read or publish failure
    Io(std::io::Error),

    /// In-process SVG rasterization failed
    Svg(SvgImageError),

    /// Rasterized image is not the configured display size
    DimensionMismatch { expected: (u32, u32), actual: Option<(u32, u32)> },

    /// Rendering engine process could not be started
    EngineSpawn { program: String, source: std::io::Error },

    /// Rendering engine exited unsuccessfully
    EngineFailed(String),

    /// Rendering engine exceeded its time budget and was terminated
    EngineTimeout(Duration),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::TemplateMissing(path) =>
                write!(f, "Template not found: {}", path.display()),
            RenderError::Io(err) =>
                write!(f, "I/O error: {}", err),
            RenderError::Svg(err) =>
                write!(f, "{}", err),
            RenderError::DimensionMismatch { expected, actual: Some(actual) } =>
                write!(f, "Image is {}x{}, expected {}x{}", actual.0, actual.1, expected.0, expected.1),
            RenderError::DimensionMismatch { expected, actual: None } =>
                write!(f, "Engine output is not a PNG (expected {}x{})", expected.0, expected.1),
            RenderError::EngineSpawn { program, source } =>
                write!(f, "Failed to start {}: {}", program, source),
            RenderError::EngineFailed(status) =>
                write!(f, "Rendering engine failed: {}", status),
            RenderError::EngineTimeout(limit) =>
                write!(f, "Rendering engine did not finish within {} seconds", limit.as_secs()),
        }
    }
}

impl Error for RenderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RenderError::Io(err) => Some(err),
            RenderError::Svg(err) => Some(err),
            RenderError::EngineSpawn { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        RenderError::Io(err)
    }
}

impl From<SvgImageError> for RenderError {
    fn from(err: SvgImageError) -> Self {
        RenderError::Svg(err)
    }
}
