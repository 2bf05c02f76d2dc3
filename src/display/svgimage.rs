//! Module for rendering a populated SVG template to a PNG image.
//!
//! This module uses `usvg` for SVG parsing and `resvg` for rendering.
//! The output is an opaque RGBA pixmap of exactly the requested size,
//! encoded as PNG for the e-ink display pipeline.

use resvg::render;
use tiny_skia::{Color, Pixmap};
use usvg::{Options, Transform, Tree, fontdb};

use log::{debug, info};
use std::error::Error;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Custom error type for SVG rendering operations.
#[derive(Debug)]
pub enum SvgImageError {
    /// Error parsing the SVG data.
    SvgParseError(String),
    /// Error creating a pixmap for rendering.
    PixmapCreationError(String),
    /// Error encoding the rendered pixmap.
    EncodeError(String),
}

impl fmt::Display for SvgImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SvgImageError::SvgParseError(msg) => write!(f, "SVG parse error: {}", msg),
            SvgImageError::PixmapCreationError(msg) => write!(f, "Pixmap creation error: {}", msg),
            SvgImageError::EncodeError(msg) => write!(f, "PNG encode error: {}", msg),
        }
    }
}

impl Error for SvgImageError {}

/// Renders SVG data at a fixed target size.
#[derive(Debug)]
pub struct SvgImageRenderer {
    tree: Tree,
    target_width: u32,
    target_height: u32,
}

impl SvgImageRenderer {
    /// Creates a new `SvgImageRenderer` from SVG string data and target dimensions.
    ///
    /// The SVG will be scaled to fit `target_width` and `target_height`.
    pub fn new(
        svg_data: &str,
        fonts: Arc<fontdb::Database>,
        target_width: u32,
        target_height: u32,
    ) -> Result<Self, SvgImageError> {
        let mut usvg_options = Options::default();
        usvg_options.fontdb = fonts;
        let tree = Tree::from_str(svg_data, &usvg_options)
            .map_err(|e| SvgImageError::SvgParseError(format!("Failed to parse SVG: {:?}", e)))?;
        Ok(SvgImageRenderer {
            tree,
            target_width,
            target_height,
        })
    }

    /// Renders onto a white pixmap of the target size.
    pub fn render_to_pixmap(&self) -> Result<Pixmap, SvgImageError> {
        let mut pixmap = Pixmap::new(self.target_width, self.target_height)
            .ok_or_else(|| SvgImageError::PixmapCreationError("Failed to create pixmap".to_string()))?;
        // e-ink has no transparency
        pixmap.fill(Color::WHITE);

        // For simple scaling from (0,0), a direct scale transform is sufficient.
        // If the SVG has a viewBox with a non-zero origin, usvg has already normalized it.
        let svg_size = self.tree.size();
        let scale_x = self.target_width as f32 / svg_size.width();
        let scale_y = self.target_height as f32 / svg_size.height();
        let transform = Transform::from_scale(scale_x, scale_y);

        render(&self.tree, transform, &mut pixmap.as_mut());
        debug!("SVG rendered to {}x{} pixmap.", self.target_width, self.target_height);
        Ok(pixmap)
    }

    pub fn render_png(&self) -> Result<Vec<u8>, SvgImageError> {
        self.render_to_pixmap()?
            .encode_png()
            .map_err(|e| SvgImageError::EncodeError(e.to_string()))
    }
}

/// In-process rasterizer. The font database is built once and shared by every render.
#[derive(Debug, Clone)]
pub struct SvgRasterizer {
    fonts: Arc<fontdb::Database>,
}

impl SvgRasterizer {
    pub fn new(font_dir: Option<&Path>) -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        if let Some(dir) = font_dir {
            db.load_fonts_dir(dir);
        }
        info!("Loaded {} font faces", db.len());
        SvgRasterizer { fonts: Arc::new(db) }
    }

    pub fn rasterize(&self, svg: &str, width: u32, height: u32) -> Result<Vec<u8>, SvgImageError> {
        SvgImageRenderer::new(svg, Arc::clone(&self.fonts), width, height)?.render_png()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOX: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="50" viewBox="0 0 100 50">
        <rect x="0" y="0" width="50" height="50" fill="black"/>
    </svg>"#;

    #[test]
    fn test_scaled_render() {
        let r = SvgImageRenderer::new(BOX, Arc::new(fontdb::Database::new()), 200, 100).unwrap();
        let pixmap = r.render_to_pixmap().unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (200, 100));
        // left half black, right half white after 2x scale
        let left = pixmap.pixel(10, 50).unwrap();
        let right = pixmap.pixel(190, 50).unwrap();
        assert_eq!((left.red(), left.alpha()), (0, 255));
        assert_eq!((right.red(), right.alpha()), (255, 255));
    }

    #[test]
    fn test_parse_error() {
        let err = SvgImageRenderer::new("<not-svg", Arc::new(fontdb::Database::new()), 10, 10).unwrap_err();
        assert!(matches!(err, SvgImageError::SvgParseError(_)));
    }

    #[test]
    fn test_zero_size_pixmap() {
        let r = SvgImageRenderer::new(BOX, Arc::new(fontdb::Database::new()), 0, 10).unwrap();
        assert!(matches!(r.render_to_pixmap(), Err(SvgImageError::PixmapCreationError(_))));
    }
}
