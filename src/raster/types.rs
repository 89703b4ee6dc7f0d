//! Core types for the rasterizer

use std::path::Path;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::LoadError;

/// RGBA color (0-255 per channel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    pub const GREEN: Color = Color { r: 0, g: 255, b: 0, a: 255 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255, a: 255 };
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from floating point channels in `[0, 1]` (clamped).
    pub fn from_rgb(rgb: Vec3) -> Self {
        let c = rgb.clamp(Vec3::ZERO, Vec3::ONE) * 255.0 + 0.5;
        Self::new(c.x as u8, c.y as u8, c.z as u8)
    }

    /// Channels as floats in `[0, 1]`, alpha dropped.
    pub fn to_rgb(self) -> Vec3 {
        Vec3::new(self.r as f32, self.g as f32, self.b as f32) / 255.0
    }

    /// Mix `self` over `dst` with the given opacity (0 keeps `dst`, 1 replaces it).
    pub fn blend_over(self, dst: Color, opacity: f32) -> Color {
        let t = opacity.clamp(0.0, 1.0) * (self.a as f32 / 255.0);
        let mix = |s: u8, d: u8| (d as f32 + (s as f32 - d as f32) * t + 0.5) as u8;
        Color {
            r: mix(self.r, dst.r),
            g: mix(self.g, dst.g),
            b: mix(self.b, dst.b),
            a: dst.a.max(self.a),
        }
    }

    /// RGBA bytes as stored in a `Framebuffer`
    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Texture addressing outside of `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextureWrap {
    /// Repeat the texture (fastest with power-of-two sizes)
    WrapPow2,
    /// Clamp to the edge texels
    #[default]
    Clamp,
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextureQuality {
    #[default]
    Nearest,
    Bilinear,
}

/// Simple texture (array of colors)
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Color>,
    pub name: String,
}

impl Texture {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::WHITE; width * height],
            name: String::new(),
        }
    }

    /// Load texture from an image file (png, jpeg or bmp)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let img = image::open(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self::from_image(img, name))
    }

    /// Load texture from encoded image bytes
    pub fn from_bytes(bytes: &[u8], name: String) -> Result<Self, LoadError> {
        let img = image::load_from_memory(bytes)?;
        Ok(Self::from_image(img, name))
    }

    fn from_image(img: image::DynamicImage, name: String) -> Self {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let pixels = rgba
            .pixels()
            .map(|p| Color::with_alpha(p[0], p[1], p[2], p[3]))
            .collect();
        Self {
            width: width as usize,
            height: height as usize,
            pixels,
            name,
        }
    }

    /// Create a checkerboard test texture
    pub fn checkerboard(width: usize, height: usize, color1: Color, color2: Color) -> Self {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let checker = ((x / 4) + (y / 4)) % 2 == 0;
                pixels.push(if checker { color1 } else { color2 });
            }
        }
        Self { width, height, pixels, name: "checkerboard".to_string() }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.pixels.len() >= self.width * self.height
    }

    fn texel(&self, x: i32, y: i32, wrap: TextureWrap) -> Vec3 {
        let (w, h) = (self.width as i32, self.height as i32);
        let (tx, ty) = match wrap {
            TextureWrap::WrapPow2 => (x.rem_euclid(w), y.rem_euclid(h)),
            TextureWrap::Clamp => (x.clamp(0, w - 1), y.clamp(0, h - 1)),
        };
        self.pixels[ty as usize * self.width + tx as usize].to_rgb()
    }

    /// Sample at texture coordinates (`(0,0)` is the first stored texel,
    /// `(1,1)` the far corner). Returns rgb in `[0, 1]`.
    pub fn sample(&self, uv: Vec2, quality: TextureQuality, wrap: TextureWrap) -> Vec3 {
        if !self.is_valid() {
            return Vec3::ONE;
        }
        let x = uv.x * self.width as f32;
        let y = uv.y * self.height as f32;
        match quality {
            TextureQuality::Nearest => self.texel(x.floor() as i32, y.floor() as i32, wrap),
            TextureQuality::Bilinear => {
                let (x, y) = (x - 0.5, y - 0.5);
                let (x0, y0) = (x.floor(), y.floor());
                let (fx, fy) = (x - x0, y - y0);
                let (ix, iy) = (x0 as i32, y0 as i32);
                let top = self.texel(ix, iy, wrap).lerp(self.texel(ix + 1, iy, wrap), fx);
                let bottom = self.texel(ix, iy + 1, wrap).lerp(self.texel(ix + 1, iy + 1, wrap), fx);
                top.lerp(bottom, fy)
            }
        }
    }
}
