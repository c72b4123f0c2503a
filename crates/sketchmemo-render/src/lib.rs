//! SketchMemo Render Library
//!
//! Turns a [`Drawing`](sketchmemo_core::Drawing) into a thumbnail image for
//! memo previews. The default implementation rasterizes on the CPU with
//! tiny-skia.

mod raster;
mod renderer;

pub use raster::RasterRenderer;
pub use renderer::{MAX_PREVIEW_SIZE, PngRenderResult, PreviewOptions, PreviewRenderer, RenderResult, RendererError};
