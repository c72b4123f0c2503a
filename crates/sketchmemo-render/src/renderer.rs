//! Renderer trait abstraction.

use peniko::Color;
use sketchmemo_core::{DEFAULT_TENSION, Drawing};
use thiserror::Error;

/// Largest accepted preview edge, in pixels.
pub const MAX_PREVIEW_SIZE: u32 = 4096;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Invalid preview size {width}x{height} with padding {padding}")]
    InvalidSize { width: u32, height: u32, padding: f64 },
    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Thumbnail settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewOptions {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Empty margin kept around the drawing, in pixels.
    pub padding: f64,
    /// Background color.
    pub background: Color,
    /// Spline tension used when strokes were captured.
    pub tension: f64,
    /// Upper bound on the fit scale, so small sketches are not blown up.
    pub max_scale: f64,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            width: 320,
            height: 160,
            padding: 8.0,
            background: Color::WHITE,
            tension: DEFAULT_TENSION,
            max_scale: 1.0,
        }
    }
}

impl PreviewOptions {
    /// Set the image size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the padding.
    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = padding;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    /// Check the size is within `MAX_PREVIEW_SIZE` and that there is room
    /// left to draw in once padding is removed.
    pub fn validate(&self) -> RenderResult<()> {
        let inner = f64::from(self.width.min(self.height)) - 2.0 * self.padding;
        let in_range = |edge: u32| (1..=MAX_PREVIEW_SIZE).contains(&edge);
        if !in_range(self.width) || !in_range(self.height) || !self.padding.is_finite() || self.padding < 0.0 || inner <= 0.0 {
            return Err(RendererError::InvalidSize {
                width: self.width,
                height: self.height,
                padding: self.padding,
            });
        }
        Ok(())
    }
}

/// Result of rendering - contains the raw RGBA pixel data and dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct PngRenderResult {
    /// RGBA pixel data (4 bytes per pixel).
    pub rgba_data: Vec<u8>,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
}

impl PngRenderResult {
    /// RGBA value at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.rgba_data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Encode as an 8-bit RGBA PNG.
    pub fn encode_png(&self) -> RenderResult<Vec<u8>> {
        let mut png_data = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut png_data, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);

            let mut writer = encoder
                .write_header()
                .map_err(|e| RendererError::Encode(format!("header: {e}")))?;
            writer
                .write_image_data(&self.rgba_data)
                .map_err(|e| RendererError::Encode(format!("image data: {e}")))?;
        }
        Ok(png_data)
    }
}

/// Trait for preview rendering backends.
pub trait PreviewRenderer: Send + Sync {
    /// Rasterize `drawing` into an RGBA buffer.
    fn render(&self, drawing: &Drawing, options: &PreviewOptions) -> RenderResult<PngRenderResult>;

    /// Rasterize and encode as PNG bytes ready for upload.
    fn render_png(&self, drawing: &Drawing, options: &PreviewOptions) -> RenderResult<Vec<u8>> {
        let image = self.render(drawing, options)?;
        let png = image.encode_png()?;
        log::debug!("Rendered {}x{} preview: {} bytes", image.width, image.height, png.len());
        Ok(png)
    }
}
