//! Whole-object and per-triangle visibility tests

use glam::{Mat4, Vec3, Vec4};

use crate::mesh::Aabb;

/// Largest supported viewport dimension
pub const MAX_VIEWPORT_DIMENSION: i32 = 4096;

/// Guard band half-extent in normalized device coordinates. Triangles
/// entirely inside it skip clipping; the rasterizer scissors the rest.
pub fn guard_band(lx: i32, ly: i32) -> f32 {
    let m = lx.max(ly).max(1);
    (256 + 3 * ((MAX_VIEWPORT_DIMENSION * 256) / m)) as f32 / 1024.0
}

/// Visibility tests against the image tile inside the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CullAndClipTest {
    // image tile bounds in NDC, widened by one pixel
    min_x: f32,
    max_x: f32,
    min_y: f32,
    max_y: f32,
    guard_band: f32,
    ortho: bool,
}

impl CullAndClipTest {
    /// `viewport` is `(lx, ly)`, `offset` the image position inside it and
    /// `image` the image size, all in pixels.
    pub fn new(viewport: (i32, i32), offset: (i32, i32), image: (usize, usize), ortho: bool) -> Self {
        let (lx, ly) = (viewport.0.max(1) as f32, viewport.1.max(1) as f32);
        let (ox, oy) = (offset.0 as f32, offset.1 as f32);
        let ilx = 2.0 / lx;
        let ily = 2.0 / ly;
        Self {
            min_x: (ox - 1.0) * ilx - 1.0,
            max_x: (ox + image.0 as f32 + 1.0) * ilx - 1.0,
            min_y: (oy - 1.0) * ily - 1.0,
            max_y: (oy + image.1 as f32 + 1.0) * ily - 1.0,
            guard_band: guard_band(viewport.0, viewport.1),
            ortho,
        }
    }

    pub fn guard_band(&self) -> f32 {
        self.guard_band
    }

    /// Project a point through `m` the way the draw path does: perspective
    /// divide unless orthographic.
    #[inline]
    fn project(&self, m: &Mat4, p: Vec3) -> Vec4 {
        let s = *m * p.extend(1.0);
        if self.ortho {
            s
        } else {
            Vec4::new(s.x / s.w, s.y / s.w, s.z / s.w, s.w)
        }
    }

    /// Clear the bit of every half-space `s` is inside of.
    #[inline]
    fn clear_inside(&self, mask: &mut u8, s: Vec4) {
        if s.x >= self.min_x {
            *mask &= !1;
        }
        if s.x <= self.max_x {
            *mask &= !2;
        }
        if s.y >= self.min_y {
            *mask &= !4;
        }
        if s.y <= self.max_y {
            *mask &= !8;
        }
        if s.z >= -1.0 && s.w > 0.0 {
            *mask &= !16;
        }
        if s.z <= 1.0 {
            *mask &= !32;
        }
    }

    /// True if the box, transformed by `m` (projection * model-view), lies
    /// entirely outside one of the six half-spaces. Conservative: it never
    /// discards a visible object. An all-zero box is never discarded.
    pub fn discard_object(&self, bbox: &Aabb, m: &Mat4) -> bool {
        if bbox.is_unset() {
            return false;
        }
        let mut mask = 63u8;
        for corner in bbox.corners() {
            self.clear_inside(&mut mask, self.project(m, corner));
            if mask == 0 {
                return false;
            }
        }
        true
    }

    /// True if some part of the box may fall outside the guard band or the
    /// depth range, in which case each triangle must be tested for clipping.
    pub fn clip_test_needed(&self, bbox: &Aabb, m: &Mat4) -> bool {
        if bbox.is_unset() {
            return true;
        }
        bbox.corners().into_iter().any(|corner| {
            let mut s = self.project(m, corner);
            if !self.ortho && s.w <= 0.0 {
                s.z = -2.0;
            }
            self.outside_guard(s)
        })
    }

    #[inline]
    fn outside_guard(&self, s: Vec4) -> bool {
        let g = self.guard_band;
        s.x <= -g || s.x >= g || s.y <= -g || s.y >= g || s.z <= -1.0 || s.z >= 1.0
    }

    /// Per-triangle test on view-space `view` and divided `ndc` positions
    /// (`ndc.w` holds the clip-space w). True if any vertex is at or behind
    /// the eye, outside the guard band, or outside the depth range.
    pub fn needs_per_triangle_clip(&self, view: &[Vec3; 3], ndc: &[Vec4; 3]) -> bool {
        (0..3).any(|i| {
            (!self.ortho && (view[i].z >= 0.0 || ndc[i].w <= 0.0)) || self.outside_guard(ndc[i])
        })
    }

    /// True if the projected triangle lies entirely outside the image tile
    /// or the depth range.
    pub fn discard_triangle(&self, ndc: &[Vec4; 3]) -> bool {
        let mut mask = 63u8;
        for &s in ndc {
            let s = if self.ortho { Vec4::new(s.x, s.y, s.z, 1.0) } else { s };
            self.clear_inside(&mut mask, s);
            if mask == 0 {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tester() -> CullAndClipTest {
        CullAndClipTest::new((64, 64), (0, 0), (64, 64), false)
    }

    fn camera() -> Mat4 {
        Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 1.0, 100.0)
    }

    #[test]
    fn test_guard_band_shrinks_with_viewport() {
        assert!(guard_band(320, 240) > guard_band(4096, 4096));
        assert!((guard_band(4096, 4096) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_box_in_front_is_kept() {
        let bbox = Aabb::new(Vec3::new(-1.0, -1.0, -6.0), Vec3::new(1.0, 1.0, -4.0));
        assert!(!tester().discard_object(&bbox, &camera()));
    }

    #[test]
    fn test_box_behind_is_discarded() {
        let bbox = Aabb::new(Vec3::new(-1.0, -1.0, 4.0), Vec3::new(1.0, 1.0, 6.0));
        assert!(tester().discard_object(&bbox, &camera()));
    }

    #[test]
    fn test_box_far_left_is_discarded() {
        let bbox = Aabb::new(Vec3::new(-60.0, -1.0, -6.0), Vec3::new(-50.0, 1.0, -4.0));
        assert!(tester().discard_object(&bbox, &camera()));
    }

    #[test]
    fn test_unset_box_is_never_discarded() {
        assert!(!tester().discard_object(&Aabb::default(), &camera()));
    }

    #[test]
    fn test_offset_tile_discards_other_half() {
        // right half of a 128 wide viewport
        let tile = CullAndClipTest::new((128, 64), (64, 0), (64, 64), true);
        let left = Aabb::new(Vec3::new(-0.9, -0.5, -0.5), Vec3::new(-0.2, 0.5, 0.5));
        let right = Aabb::new(Vec3::new(0.2, -0.5, -0.5), Vec3::new(0.9, 0.5, 0.5));
        assert!(tile.discard_object(&left, &Mat4::IDENTITY));
        assert!(!tile.discard_object(&right, &Mat4::IDENTITY));
    }

    #[test]
    fn test_clip_test_needed() {
        let t = tester();
        let inside = Aabb::new(Vec3::new(-1.0, -1.0, -6.0), Vec3::new(1.0, 1.0, -4.0));
        let straddling = Aabb::new(Vec3::new(-1.0, -1.0, -6.0), Vec3::new(1.0, 1.0, 2.0));
        assert!(!t.clip_test_needed(&inside, &camera()));
        assert!(t.clip_test_needed(&straddling, &camera()));
    }

    #[test]
    fn test_triangle_outside_tile() {
        let t = tester();
        let off = [Vec4::new(1.5, 0.0, 0.0, 1.0), Vec4::new(2.0, 0.5, 0.0, 1.0), Vec4::new(1.8, -0.5, 0.0, 1.0)];
        let on = [Vec4::new(0.5, 0.0, 0.0, 1.0), Vec4::new(2.0, 0.5, 0.0, 1.0), Vec4::new(1.8, -0.5, 0.0, 1.0)];
        assert!(t.discard_triangle(&off));
        assert!(!t.discard_triangle(&on));
    }
}
