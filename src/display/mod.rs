/*
 *  display/mod.rs
 *
 *  RadarPi - nearest aircraft on e-ink
 *	(c) 2025-26 RadarPi contributors
 *
 *  Display subsystem - template population and rasterization
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

pub mod error;
pub mod template;

// Rasterizers
pub mod svgimage;
pub mod browser;

pub mod renderer;

// Re-exports for convenience
pub use error::RenderError;
pub use template::{DisplayFields, TemplateSource, format_altitude, format_ground_speed, populate};
pub use svgimage::{SvgImageError, SvgRasterizer};
pub use browser::BrowserRasterizer;
pub use renderer::{Rasterizer, Renderer, png_dimensions};
