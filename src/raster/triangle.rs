//! Triangle rasterization
//!
//! Edge functions evaluated at pixel centers with a top-left fill rule, so
//! triangles sharing an edge never write the same pixel twice.

use glam::{Vec2, Vec3};

use super::{Color, PixelTarget, Texture, TextureQuality, TextureWrap};
use crate::renderer::{DepthEncoder, DepthValue};

/// A projected vertex ready for rasterization.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RasterVertex {
    /// Position in image pixels (x right, y down)
    pub pos: Vec2,
    /// `1/w` in perspective mode, `1 - z` in orthographic mode. Larger is nearer.
    pub depth: f32,
    /// Lit color (Gouraud only)
    pub color: Vec3,
    pub uv: Vec2,
}

/// Texture and sampling state for textured triangles
#[derive(Debug, Clone, Copy)]
pub struct Sampler<'t> {
    pub texture: &'t Texture,
    pub quality: TextureQuality,
    pub wrap: TextureWrap,
}

/// Per-triangle uniform block
#[derive(Debug, Clone, Copy)]
pub struct Uniforms<'t> {
    /// `Some` for flat shading, `None` to interpolate vertex colors
    pub flat_color: Option<Vec3>,
    pub depth_test: bool,
    /// Perspective-correct texture coordinates (affine when false)
    pub perspective: bool,
    pub sampler: Option<Sampler<'t>>,
    pub depth: DepthEncoder,
}

#[inline]
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

#[inline]
fn is_top_left(a: Vec2, b: Vec2) -> bool {
    let d = b - a;
    (d.y == 0.0 && d.x > 0.0) || d.y < 0.0
}

#[inline]
fn covered(w: f32, top_left: bool) -> bool {
    w > 0.0 || (w == 0.0 && top_left)
}

/// Fill a triangle into `image`, testing and updating `zbuffer` when
/// depth testing is on. Winding does not matter here: culling happens
/// before a triangle reaches the rasterizer.
pub fn rasterize_triangle<P, Z>(
    image: &mut P,
    mut zbuffer: Option<&mut [Z]>,
    vertices: [RasterVertex; 3],
    uni: &Uniforms<'_>,
) where
    P: PixelTarget + ?Sized,
    Z: DepthValue,
{
    let [a, mut b, mut c] = vertices;
    let mut area = edge(a.pos, b.pos, c.pos);
    if !(area.abs() > f32::EPSILON) {
        return;
    }
    if area < 0.0 {
        std::mem::swap(&mut b, &mut c);
        area = -area;
    }
    let inv_area = 1.0 / area;

    let (width, height) = (image.width(), image.height());
    let min = a.pos.min(b.pos).min(c.pos);
    let max = a.pos.max(b.pos).max(c.pos);
    let x0 = min.x.floor().max(0.0) as usize;
    let y0 = min.y.floor().max(0.0) as usize;
    let x1 = (max.x.ceil().max(0.0) as usize).min(width);
    let y1 = (max.y.ceil().max(0.0) as usize).min(height);

    let tl_a = is_top_left(b.pos, c.pos);
    let tl_b = is_top_left(c.pos, a.pos);
    let tl_c = is_top_left(a.pos, b.pos);

    for y in y0..y1 {
        for x in x0..x1 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let w0 = edge(b.pos, c.pos, p);
            let w1 = edge(c.pos, a.pos, p);
            let w2 = edge(a.pos, b.pos, p);
            if !(covered(w0, tl_a) && covered(w1, tl_b) && covered(w2, tl_c)) {
                continue;
            }
            let (l0, l1, l2) = (w0 * inv_area, w1 * inv_area, w2 * inv_area);

            if uni.depth_test {
                if let Some(zb) = zbuffer.as_deref_mut() {
                    let depth = l0 * a.depth + l1 * b.depth + l2 * c.depth;
                    let z: Z = uni.depth.encode(depth);
                    match zb.get_mut(y * width + x) {
                        Some(stored) if *stored < z => *stored = z,
                        _ => continue,
                    }
                }
            }

            let mut color = match uni.flat_color {
                Some(flat) => flat,
                None => a.color * l0 + b.color * l1 + c.color * l2,
            };

            if let Some(sampler) = &uni.sampler {
                let uv = if uni.perspective {
                    let (q0, q1, q2) = (l0 * a.depth, l1 * b.depth, l2 * c.depth);
                    let q = q0 + q1 + q2;
                    if q > 0.0 {
                        (a.uv * q0 + b.uv * q1 + c.uv * q2) / q
                    } else {
                        a.uv * l0 + b.uv * l1 + c.uv * l2
                    }
                } else {
                    a.uv * l0 + b.uv * l1 + c.uv * l2
                };
                color *= sampler.texture.sample(uv, sampler.quality, sampler.wrap);
            }

            image.set_pixel(x, y, Color::from_rgb(color));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Framebuffer;

    fn vertex(x: f32, y: f32, depth: f32) -> RasterVertex {
        RasterVertex { pos: Vec2::new(x, y), depth, ..Default::default() }
    }

    fn flat(color: Vec3, depth_test: bool) -> Uniforms<'static> {
        Uniforms {
            flat_color: Some(color),
            depth_test,
            perspective: true,
            sampler: None,
            depth: DepthEncoder::LOSSLESS,
        }
    }

    /// Counts writes per pixel
    struct WriteCounter {
        size: usize,
        writes: Vec<u32>,
    }

    impl PixelTarget for WriteCounter {
        fn width(&self) -> usize {
            self.size
        }
        fn height(&self) -> usize {
            self.size
        }
        fn pixel(&self, _x: usize, _y: usize) -> Color {
            Color::BLACK
        }
        fn set_pixel(&mut self, x: usize, y: usize, _color: Color) {
            self.writes[y * self.size + x] += 1;
        }
        fn draw_line_aa(&mut self, _: Vec2, _: Vec2, _: f32, _: Color, _: f32) {}
        fn fill_circle(&mut self, _: Vec2, _: f32, _: Color, _: f32) {}
    }

    #[test]
    fn test_shared_edge_written_once() {
        let mut target = WriteCounter { size: 8, writes: vec![0; 64] };
        let uni = flat(Vec3::ONE, false);
        let (p0, p1, p2, p3) = (vertex(0.0, 0.0, 1.0), vertex(8.0, 0.0, 1.0), vertex(8.0, 8.0, 1.0), vertex(0.0, 8.0, 1.0));
        rasterize_triangle::<_, f32>(&mut target, None, [p0, p1, p2], &uni);
        rasterize_triangle::<_, f32>(&mut target, None, [p0, p2, p3], &uni);
        assert!(target.writes.iter().all(|&n| n == 1));
    }

    #[test]
    fn test_winding_does_not_matter() {
        let uni = flat(Vec3::X, false);
        let tri = [vertex(1.0, 1.0, 1.0), vertex(7.0, 1.0, 1.0), vertex(1.0, 7.0, 1.0)];
        let mut fb_a = Framebuffer::new(8, 8);
        let mut fb_b = Framebuffer::new(8, 8);
        rasterize_triangle::<_, f32>(&mut fb_a, None, tri, &uni);
        rasterize_triangle::<_, f32>(&mut fb_b, None, [tri[0], tri[2], tri[1]], &uni);
        assert_eq!(fb_a.pixels, fb_b.pixels);
        assert!(fb_a.count_pixels_not(Color::TRANSPARENT) > 0);
    }

    #[test]
    fn test_depth_test_keeps_nearer() {
        let mut fb = Framebuffer::new(4, 4);
        let mut zbuf = vec![0.0f32; 16];
        let near = [vertex(0.0, 0.0, 0.8), vertex(4.0, 0.0, 0.8), vertex(0.0, 4.0, 0.8)];
        let far = [vertex(0.0, 0.0, 0.2), vertex(4.0, 0.0, 0.2), vertex(0.0, 4.0, 0.2)];
        rasterize_triangle(&mut fb, Some(&mut zbuf[..]), near, &flat(Vec3::X, true));
        rasterize_triangle(&mut fb, Some(&mut zbuf[..]), far, &flat(Vec3::Y, true));
        assert_eq!(fb.pixel(0, 0), Color::RED);
        assert!((zbuf[0] - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_gouraud_interpolates_colors() {
        let mut fb = Framebuffer::new(16, 16);
        let mut a = vertex(0.0, 0.0, 1.0);
        let mut b = vertex(16.0, 0.0, 1.0);
        let mut c = vertex(0.0, 16.0, 1.0);
        a.color = Vec3::X;
        b.color = Vec3::X;
        c.color = Vec3::Z;
        let uni = Uniforms { flat_color: None, ..flat(Vec3::ZERO, false) };
        rasterize_triangle::<_, f32>(&mut fb, None, [a, b, c], &uni);
        let top = fb.pixel(1, 0);
        let lower = fb.pixel(1, 12);
        assert!(top.r > lower.r);
        assert!(top.b < lower.b);
    }

    #[test]
    fn test_texture_modulates_color() {
        let tex = Texture::checkerboard(8, 8, Color::WHITE, Color::BLACK);
        let mut fb = Framebuffer::new(8, 8);
        let mut tri = [vertex(0.0, 0.0, 1.0), vertex(16.0, 0.0, 1.0), vertex(0.0, 16.0, 1.0)];
        tri[1].uv = Vec2::new(2.0, 0.0);
        tri[2].uv = Vec2::new(0.0, 2.0);
        let uni = Uniforms {
            sampler: Some(Sampler { texture: &tex, quality: TextureQuality::Nearest, wrap: TextureWrap::Clamp }),
            ..flat(Vec3::ONE, false)
        };
        rasterize_triangle::<_, f32>(&mut fb, None, tri, &uni);
        assert_eq!(fb.pixel(0, 0), Color::WHITE);
        assert_eq!(fb.pixel(4, 0), Color::BLACK);
    }
}
