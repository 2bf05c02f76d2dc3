/*
 *  display/renderer.rs
 *
 *  RadarPi - nearest aircraft on e-ink
 *	(c) 2025-26 RadarPi contributors
 *
 *  Populate, rasterize, verify, publish
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
use log::{debug, info};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::browser::BrowserRasterizer;
use super::error::RenderError;
use super::svgimage::SvgRasterizer;
use super::template::{DisplayFields, TemplateSource, populate};
use crate::config::{EngineKind, Settings};
use crate::flight::FlightData;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// How a populated template becomes pixels.
#[derive(Debug, Clone)]
pub enum Rasterizer {
    Svg(SvgRasterizer),
    Browser(BrowserRasterizer),
}

#[derive(Debug, Clone)]
pub struct Renderer {
    template: TemplateSource,
    rasterizer: Rasterizer,
    width: u32,
    height: u32,
    output: PathBuf,
}

impl Renderer {
    pub fn new(template: TemplateSource, rasterizer: Rasterizer, width: u32, height: u32, output: &Path) -> Self {
        Renderer {
            template,
            rasterizer,
            width,
            height,
            output: output.to_path_buf(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let render = &settings.render;
        let rasterizer = match render.engine {
            EngineKind::Svg => Rasterizer::Svg(SvgRasterizer::new(render.font_dir.as_deref())),
            EngineKind::Browser => Rasterizer::Browser(BrowserRasterizer::new(
                &render.browser_cmd,
                &render.browser_args,
                settings.render_timeout(),
            )),
        };
        Renderer::new(
            TemplateSource::new(render.template.as_deref(), render.engine),
            rasterizer,
            settings.display_width,
            settings.display_height,
            &settings.output_image_file,
        )
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Render and publish. Always produces an image, `None` gives the no-data screen.
    ///
    /// On error the previous output file is left as it was.
    pub async fn render(&self, flight_data: Option<&FlightData>) -> Result<Vec<u8>, RenderError> {
        let template = self.template.load().await?;
        let fields = DisplayFields::resolve(flight_data);
        debug!("display fields {:?}", fields);

        let page = populate(&template, &fields);
        let png = self.rasterize(&page).await?;
        verify_dimensions(&png, self.width, self.height)?;

        publish(&self.output, &png)?;
        info!("Display image saved to {} ({} bytes)", self.output.display(), png.len());
        Ok(png)
    }

    async fn rasterize(&self, page: &str) -> Result<Vec<u8>, RenderError> {
        match &self.rasterizer {
            Rasterizer::Svg(svg) => Ok(svg.rasterize(page, self.width, self.height)?),
            Rasterizer::Browser(browser) => {
                // both removed on drop, including when the cycle is cancelled
                let mut staged = tempfile::Builder::new()
                    .prefix("radarpi-")
                    .suffix(&self.template.suffix())
                    .tempfile()?;
                staged.write_all(page.as_bytes())?;
                staged.flush()?;
                let shot = tempfile::Builder::new().prefix("radarpi-").suffix(".png").tempfile()?;

                browser.rasterize(staged.path(), shot.path(), self.width, self.height).await?;
                Ok(tokio::fs::read(shot.path()).await?)
            }
        }
    }
}

/// Width and height from the PNG header, `None` if this is not a PNG.
pub fn png_dimensions(png: &[u8]) -> Option<(u32, u32)> {
    if png.len() < 24 || !png.starts_with(&PNG_SIGNATURE) || &png[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes(png[16..20].try_into().ok()?);
    let height = u32::from_be_bytes(png[20..24].try_into().ok()?);
    Some((width, height))
}

fn verify_dimensions(png: &[u8], width: u32, height: u32) -> Result<(), RenderError> {
    match png_dimensions(png) {
        Some(actual) if actual == (width, height) => Ok(()),
        actual => Err(RenderError::DimensionMismatch { expected: (width, height), actual }),
    }
}

/// Stage next to the target and rename over it.
fn publish(target: &Path, png: &[u8]) -> Result<(), RenderError> {
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut staged = tempfile::Builder::new()
        .prefix(".radarpi-")
        .suffix(".png")
        .tempfile_in(dir)?;
    staged.write_all(png)?;
    staged.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged.as_file().set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }

    staged.persist(target).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::{SearchArea, aggregate};
    use serde_json::json;
    use std::time::Duration;

    const AREA: SearchArea = SearchArea { latitude: 38.9, longitude: -77.1, radius: 10 };

    fn svg_renderer(dir: &Path, template: TemplateSource) -> Renderer {
        Renderer::new(
            template,
            Rasterizer::Svg(SvgRasterizer::new(None)),
            800,
            480,
            &dir.join("curr_flight.png"),
        )
    }

    /// The engine wrote the page path it was handed into `rec`.
    fn assert_page_removed(rec: &Path, suffix: &str) {
        let recorded = std::fs::read_to_string(rec).unwrap();
        let page = Path::new(recorded.trim());
        assert!(page.to_string_lossy().ends_with(suffix), "page {}", page.display());
        assert!(!page.exists(), "page {} left behind", page.display());
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_render_publishes_exact_size() {
        let dir = tempfile::tempdir().unwrap();
        let r = svg_renderer(dir.path(), TemplateSource::Builtin(EngineKind::Svg));
        let fd = aggregate(Some(&json!({"ac": [{"flight": "UAL123", "gs": 450.5, "alt_baro": 35000}]})), AREA, 10);

        let png = r.render(fd.as_ref()).await.unwrap();
        assert_eq!(png_dimensions(&png), Some((800, 480)));
        assert_eq!(std::fs::read(r.output_path()).unwrap(), png);
        assert_eq!(entries(dir.path()), ["curr_flight.png"]);
    }

    #[tokio::test]
    async fn test_render_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let r = svg_renderer(dir.path(), TemplateSource::Builtin(EngineKind::Svg));
        let fd = aggregate(Some(&json!({"aircraft": [{"flight": "DAL9", "t": "A321", "r": "N301DN"}]})), AREA, 10);

        let first = r.render(fd.as_ref()).await.unwrap();
        let second = r.render(fd.as_ref()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_render_without_data() {
        let dir = tempfile::tempdir().unwrap();
        let r = svg_renderer(dir.path(), TemplateSource::Builtin(EngineKind::Svg));
        let png = r.render(None).await.unwrap();
        assert_eq!(png_dimensions(&png), Some((800, 480)));
    }

    #[tokio::test]
    async fn test_missing_template_keeps_previous_image() {
        let dir = tempfile::tempdir().unwrap();
        let r = svg_renderer(dir.path(), TemplateSource::File(dir.path().join("gone.svg")));
        std::fs::write(r.output_path(), b"previous").unwrap();

        let err = r.render(None).await.unwrap_err();
        assert!(matches!(err, RenderError::TemplateMissing(_)));
        assert_eq!(std::fs::read(r.output_path()).unwrap(), b"previous");
        assert_eq!(entries(dir.path()), ["curr_flight.png"]);
    }

    #[tokio::test]
    async fn test_engine_output_not_png() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let rec = scratch.path().join("page.rec");
        let output = dir.path().join("curr_flight.png");
        std::fs::write(&output, b"previous").unwrap();
        let script = format!("echo \"$0\" > {}; cp \"$0\" \"$1\"", rec.display());
        let browser = BrowserRasterizer::new(
            "sh",
            &["-c".to_string(), script, "{input}".to_string(), "{output}".to_string()],
            Duration::from_secs(5),
        );
        let r = Renderer::new(
            TemplateSource::Builtin(EngineKind::Browser),
            Rasterizer::Browser(browser),
            800,
            480,
            &output,
        );

        let err = r.render(None).await.unwrap_err();
        assert!(matches!(err, RenderError::DimensionMismatch { actual: None, .. }));
        assert_eq!(std::fs::read(&output).unwrap(), b"previous");
        assert_eq!(entries(dir.path()), ["curr_flight.png"]);
        assert_page_removed(&rec, ".html");
    }

    #[tokio::test]
    async fn test_engine_screenshot_published() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = dir.path().join("fixture.png");
        let shot = SvgRasterizer::new(None)
            .rasterize(r#"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="4"><rect width="4" height="4"/></svg>"#, 400, 240)
            .unwrap();
        std::fs::write(&fixture, &shot).unwrap();

        let rec = dir.path().join("page.rec");
        let script = format!("echo \"$1\" > {}; cp {} \"$0\"", rec.display(), fixture.display());
        let browser = BrowserRasterizer::new(
            "sh",
            &["-c".to_string(), script, "{output}".to_string(), "{input}".to_string()],
            Duration::from_secs(5),
        );
        let output = dir.path().join("out.png");
        let r = Renderer::new(
            TemplateSource::Builtin(EngineKind::Browser),
            Rasterizer::Browser(browser),
            400,
            240,
            &output,
        );

        assert_eq!(r.render(None).await.unwrap(), shot);
        assert_eq!(std::fs::read(&output).unwrap(), shot);
        assert_page_removed(&rec, ".html");
    }

    #[test]
    fn test_png_dimensions() {
        assert_eq!(png_dimensions(b"not a png"), None);
        let png = SvgRasterizer::new(None)
            .rasterize(r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect width="5" height="5"/></svg>"#, 12, 34)
            .unwrap();
        assert_eq!(png_dimensions(&png), Some((12, 34)));
        assert!(matches!(
            verify_dimensions(&png, 800, 480),
            Err(RenderError::DimensionMismatch { actual: Some((12, 34)), .. })
        ));
    }
}
