//! RGBA8 framebuffer for software rendering

use std::path::Path;

use glam::Vec2;

use super::{Color, PixelTarget};
use crate::error::LoadError;

/// Framebuffer for software rendering
#[derive(Debug, Clone)]
pub struct Framebuffer {
    pub pixels: Vec<u8>, // RGBA, 4 bytes per pixel
    pub width: usize,
    pub height: usize,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height * 4],
            width,
            height,
        }
    }

    pub fn clear(&mut self, color: Color) {
        let bytes = color.to_bytes();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
    }

    /// Number of pixels that differ from `background`.
    pub fn count_pixels_not(&self, background: Color) -> usize {
        let bytes = background.to_bytes();
        self.pixels.chunks_exact(4).filter(|px| *px != bytes).count()
    }

    /// Write the framebuffer to a png file.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), LoadError> {
        image::save_buffer(
            path,
            &self.pixels,
            self.width as u32,
            self.height as u32,
            image::ExtendedColorType::Rgba8,
        )?;
        Ok(())
    }

    /// Run `plot(x, y, coverage)` over every pixel within `radius` of the
    /// segment `[p0, p1]`, with a one pixel soft edge.
    fn for_each_near_segment<F: FnMut(&mut Self, usize, usize, f32)>(
        &mut self,
        p0: Vec2,
        p1: Vec2,
        radius: f32,
        mut plot: F,
    ) {
        let reach = radius + 1.0;
        let min = p0.min(p1) - Vec2::splat(reach);
        let max = p0.max(p1) + Vec2::splat(reach);
        let x0 = min.x.floor().max(0.0) as usize;
        let y0 = min.y.floor().max(0.0) as usize;
        let x1 = (max.x.ceil().max(0.0) as usize).min(self.width);
        let y1 = (max.y.ceil().max(0.0) as usize).min(self.height);

        let d = p1 - p0;
        let len_sq = d.length_squared();
        for y in y0..y1 {
            for x in x0..x1 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let t = if len_sq > 0.0 { ((p - p0).dot(d) / len_sq).clamp(0.0, 1.0) } else { 0.0 };
                let dist = p.distance(p0 + d * t);
                let coverage = (radius + 0.5 - dist).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    plot(self, x, y, coverage);
                }
            }
        }
    }
}

impl PixelTarget for Framebuffer {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.pixels.len() >= self.width * self.height * 4
    }

    fn pixel(&self, x: usize, y: usize) -> Color {
        if x < self.width && y < self.height {
            let idx = (y * self.width + x) * 4;
            Color::with_alpha(
                self.pixels[idx],
                self.pixels[idx + 1],
                self.pixels[idx + 2],
                self.pixels[idx + 3],
            )
        } else {
            Color::TRANSPARENT
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        if x < self.width && y < self.height {
            let idx = (y * self.width + x) * 4;
            self.pixels[idx..idx + 4].copy_from_slice(&color.to_bytes());
        }
    }

    fn set_hline(&mut self, x: usize, y: usize, len: usize, color: Color) {
        if y >= self.height || x >= self.width {
            return;
        }
        let end = (x + len).min(self.width);
        let bytes = color.to_bytes();
        let row = y * self.width;
        for px in self.pixels[(row + x) * 4..(row + end) * 4].chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
    }

    fn draw_line_aa(&mut self, p0: Vec2, p1: Vec2, thickness: f32, color: Color, opacity: f32) {
        if thickness <= 0.0 {
            return;
        }
        self.for_each_near_segment(p0, p1, thickness * 0.5, |fb, x, y, coverage| {
            fb.blend_pixel(x, y, color, opacity * coverage);
        });
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color, opacity: f32) {
        if radius < 0.0 {
            return;
        }
        self.for_each_near_segment(center, center, radius, |fb, x, y, coverage| {
            fb.blend_pixel(x, y, color, opacity * coverage);
        });
    }
}
