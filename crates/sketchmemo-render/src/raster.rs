//! CPU rasterizer for drawing previews, backed by tiny-skia.
//!
//! Each stroke is stroked as one path with round caps and joins, so
//! overlapping segments of a stroke never darken each other.

use crate::renderer::{PngRenderResult, PreviewOptions, PreviewRenderer, RenderResult, RendererError};
use kurbo::{Affine, BezPath, PathEl, Point, Rect};
use peniko::Color;
use sketchmemo_core::{Drawing, Stroke};
use tiny_skia::{FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Transform};

/// Strokes thinner than this on screen are widened to stay visible.
const MIN_WIDTH: f64 = 1.0;

/// Software renderer producing RGBA thumbnails.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterRenderer;

impl RasterRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl PreviewRenderer for RasterRenderer {
    fn render(&self, drawing: &Drawing, options: &PreviewOptions) -> RenderResult<PngRenderResult> {
        options.validate()?;
        let mut pixmap = Pixmap::new(options.width, options.height).ok_or(RendererError::InvalidSize {
            width: options.width,
            height: options.height,
            padding: options.padding,
        })?;
        pixmap.fill(skia_color(options.background));

        if let Some(content) = content_bounds(drawing) {
            let (transform, scale) = fit_transform(content, options);
            for stroke in drawing.strokes() {
                draw_stroke(&mut pixmap, stroke, transform, scale, options.tension);
            }
        }
        Ok(finish(pixmap))
    }
}

fn draw_stroke(pixmap: &mut Pixmap, stroke: &Stroke, transform: Affine, scale: f64, tension: f64) {
    let width = (stroke.stroke_width() * scale).max(MIN_WIDTH);
    let mut paint = Paint::default();
    paint.set_color(skia_color(stroke.color().into()));
    paint.anti_alias = true;

    let bounds = stroke.bounds();
    if bounds.width() == 0.0 && bounds.height() == 0.0 {
        // A zero-length path has no outline to stroke; draw the round cap.
        let center = transform * bounds.origin();
        match PathBuilder::from_circle(center.x as f32, center.y as f32, (width / 2.0) as f32) {
            Some(dot) => pixmap.fill_path(&dot, &paint, FillRule::Winding, Transform::identity(), None),
            None => log::debug!("Skipping dot at {:?}", center),
        }
        return;
    }

    let Some(path) = to_skia_path(&(transform * stroke.to_path(tension))) else {
        log::debug!("Skipping stroke with an empty path");
        return;
    };
    let pen = tiny_skia::Stroke {
        width: width as f32,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    };
    pixmap.stroke_path(&path, &paint, &pen, Transform::identity(), None);
}

fn to_skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut builder = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => builder.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => builder.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(p1, p) => builder.quad_to(p1.x as f32, p1.y as f32, p.x as f32, p.y as f32),
            PathEl::CurveTo(p1, p2, p) => builder.cubic_to(
                p1.x as f32,
                p1.y as f32,
                p2.x as f32,
                p2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => builder.close(),
        }
    }
    builder.finish()
}

fn skia_color(color: Color) -> tiny_skia::Color {
    let c = color.to_rgba8();
    tiny_skia::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

/// Read the premultiplied pixmap back as straight RGBA.
fn finish(pixmap: Pixmap) -> PngRenderResult {
    let rgba_data = pixmap
        .pixels()
        .iter()
        .flat_map(|px| {
            let c = px.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();
    PngRenderResult {
        rgba_data,
        width: pixmap.width(),
        height: pixmap.height(),
    }
}

/// Drawing bounds including the stroke widths.
fn content_bounds(drawing: &Drawing) -> Option<Rect> {
    drawing
        .strokes()
        .map(|stroke: &Stroke| stroke.bounds().inflate(stroke.stroke_width() / 2.0, stroke.stroke_width() / 2.0))
        .reduce(|a, b| a.union(b))
}

/// Map `content` into the padded image area, centered, preserving aspect.
fn fit_transform(content: Rect, options: &PreviewOptions) -> (Affine, f64) {
    let avail_w = f64::from(options.width) - 2.0 * options.padding;
    let avail_h = f64::from(options.height) - 2.0 * options.padding;
    let scale = (avail_w / content.width())
        .min(avail_h / content.height())
        .min(options.max_scale);
    let image_center = Point::new(f64::from(options.width) / 2.0, f64::from(options.height) / 2.0);
    let transform = Affine::translate(image_center.to_vec2())
        * Affine::scale(scale)
        * Affine::translate(-content.center().to_vec2());
    (transform, scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RendererError;
    use sketchmemo_core::StrokeColor;

    fn line(points: &[(f64, f64)], color: StrokeColor, width: f64) -> Stroke {
        Stroke::new(points.iter().map(|&(x, y)| Point::new(x, y)).collect(), color, width).unwrap()
    }

    fn non_background(image: &PngRenderResult) -> usize {
        image
            .rgba_data
            .chunks_exact(4)
            .filter(|px| *px != [255, 255, 255, 255])
            .count()
    }

    #[test]
    fn test_empty_drawing_is_blank() {
        let image = RasterRenderer::new()
            .render(&Drawing::new(), &PreviewOptions::default())
            .unwrap();
        assert_eq!((image.width, image.height), (320, 160));
        assert_eq!(image.rgba_data.len(), 320 * 160 * 4);
        assert_eq!(non_background(&image), 0);
    }

    #[test]
    fn test_stroke_draws_in_its_color() {
        let red = StrokeColor::new(255, 0, 0);
        let drawing = Drawing::from_strokes([line(&[(10.0, 10.0), (200.0, 80.0), (390.0, 20.0)], red, 10.0)]);
        let image = RasterRenderer::new()
            .render(&drawing, &PreviewOptions::default())
            .unwrap();

        assert!(non_background(&image) > 100);
        assert!(
            image
                .rgba_data
                .chunks_exact(4)
                .any(|px| px == [255, 0, 0, 255])
        );
        // Padding stays untouched.
        assert_eq!(image.pixel(0, 0), Some([255, 255, 255, 255]));
        assert_eq!(image.pixel(319, 159), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_single_point_stroke_is_a_dot() {
        let drawing = Drawing::from_strokes([line(&[(50.0, 50.0)], StrokeColor::BLACK, 6.0)]);
        let image = RasterRenderer::new()
            .render(&drawing, &PreviewOptions::default())
            .unwrap();
        // Centered and not upscaled past 1:1.
        assert_eq!(image.pixel(160, 80), Some([0, 0, 0, 255]));
        assert!(non_background(&image) < 60);
    }

    #[test]
    fn test_png_header() {
        let drawing = Drawing::from_strokes([line(&[(0.0, 0.0), (40.0, 40.0)], StrokeColor::BLACK, 2.0)]);
        let options = PreviewOptions::default().with_size(64, 32);
        let png = RasterRenderer::new().render_png(&drawing, &options).unwrap();

        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
        assert_eq!(&png[12..16], b"IHDR");
        assert_eq!(u32::from_be_bytes([png[16], png[17], png[18], png[19]]), 64);
        assert_eq!(u32::from_be_bytes([png[20], png[21], png[22], png[23]]), 32);
    }

    #[test]
    fn test_invalid_size() {
        let renderer = RasterRenderer::new();
        for options in [
            PreviewOptions::default().with_size(0, 100),
            PreviewOptions::default().with_size(16, 16).with_padding(8.0),
            PreviewOptions::default().with_padding(-1.0),
        ] {
            assert!(matches!(
                renderer.render(&Drawing::new(), &options),
                Err(RendererError::InvalidSize { .. })
            ));
        }
    }

    #[test]
    fn test_repeated_point_stroke_is_a_dot() {
        let drawing = Drawing::from_strokes([line(&[(5.0, 5.0), (5.0, 5.0), (5.0, 5.0)], StrokeColor::BLACK, 4.0)]);
        let image = RasterRenderer::new()
            .render(&drawing, &PreviewOptions::default())
            .unwrap();
        assert_eq!(image.pixel(160, 80), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_later_strokes_paint_over_earlier() {
        let red = StrokeColor::new(255, 0, 0);
        let blue = StrokeColor::new(0, 0, 255);
        let drawing = Drawing::from_strokes([
            line(&[(0.0, 50.0), (100.0, 50.0)], red, 20.0),
            line(&[(50.0, 0.0), (50.0, 100.0)], blue, 20.0),
        ]);
        let image = RasterRenderer::new()
            .render(&drawing, &PreviewOptions::default())
            .unwrap();
        assert_eq!(image.pixel(160, 80), Some([0, 0, 255, 255]));
    }

    #[test]
    fn test_oversized_preview_rejected() {
        let options = PreviewOptions::default().with_size(u32::MAX, u32::MAX);
        assert!(matches!(
            RasterRenderer::new().render(&Drawing::new(), &options),
            Err(RendererError::InvalidSize { .. })
        ));
    }
}
