//! Reference raster collaborators for the renderer
//!
//! - `PixelTarget`: the pixel operations the renderer issues
//! - `Framebuffer`: an RGBA8 implementation of `PixelTarget`
//! - `Texture`: nearest/bilinear sampling with wrap or clamp addressing
//! - `rasterize_triangle`: edge-function fill with depth test, flat or
//!   Gouraud color and perspective-correct texturing

mod framebuffer;
mod triangle;
mod types;

pub use framebuffer::*;
pub use triangle::*;
pub use types::*;

use glam::Vec2;

/// Destination image for the renderer.
///
/// Coordinates are pixel indices with `(0, 0)` at the top-left corner.
/// Every method must tolerate out-of-range coordinates by ignoring them.
pub trait PixelTarget {
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    /// False if the target cannot be drawn to (for example a zero-sized image).
    fn is_valid(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }

    fn pixel(&self, x: usize, y: usize) -> Color;

    fn set_pixel(&mut self, x: usize, y: usize, color: Color);

    /// Alpha-blend `color` over the current pixel.
    fn blend_pixel(&mut self, x: usize, y: usize, color: Color, opacity: f32) {
        if x < self.width() && y < self.height() {
            let dst = self.pixel(x, y);
            self.set_pixel(x, y, color.blend_over(dst, opacity));
        }
    }

    /// Set `len` pixels starting at `(x, y)` going right.
    fn set_hline(&mut self, x: usize, y: usize, len: usize, color: Color) {
        let end = (x + len).min(self.width());
        for xx in x..end {
            self.set_pixel(xx, y, color);
        }
    }

    /// Anti-aliased segment of the given thickness with rounded ends.
    fn draw_line_aa(&mut self, p0: Vec2, p1: Vec2, thickness: f32, color: Color, opacity: f32);

    /// Filled circle centered on `center` (pixel-center coordinates).
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color, opacity: f32);
}
