//! Sutherland-Hodgman clipping in homogeneous clip space
//!
//! A triangle is clipped against the six frustum half-spaces one at a time.
//! Each plane can add at most one vertex to a convex polygon, so the result
//! never exceeds 3 + 6 = 9 vertices and fits in a fixed-capacity buffer.

use glam::{Vec2, Vec3, Vec4};
use heapless::Vec as HVec;

/// Upper bound on the vertex count of a clipped triangle
pub const MAX_CLIP_VERTICES: usize = 9;

/// Vertex attribute bundle carried through clipping
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClipVertex {
    /// Homogeneous clip-space position
    pub pos: Vec4,
    /// View-space normal
    pub normal: Vec3,
    pub uv: Vec2,
    /// Base color for lighting
    pub color: Vec3,
}

impl ClipVertex {
    /// Interpolate every attribute at `t` along `self -> other`.
    #[inline]
    pub fn lerp(&self, other: &ClipVertex, t: f32) -> ClipVertex {
        ClipVertex {
            pos: self.pos.lerp(other.pos, t),
            normal: self.normal.lerp(other.normal, t),
            uv: self.uv.lerp(other.uv, t),
            color: self.color.lerp(other.color, t),
        }
    }
}

pub type ClipPolygon = HVec<ClipVertex, MAX_CLIP_VERTICES>;

/// Frustum half-spaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipPlane {
    Left,
    Right,
    Bottom,
    Top,
    Near,
    Far,
}

impl ClipPlane {
    pub const ALL: [ClipPlane; 6] = [
        ClipPlane::Left,
        ClipPlane::Right,
        ClipPlane::Bottom,
        ClipPlane::Top,
        ClipPlane::Near,
        ClipPlane::Far,
    ];

    /// Signed distance of `p` to the plane, positive inside. `xy_bound` is
    /// the x/y extent in normalized device coordinates (1 for the exact
    /// frustum, larger for a guard band).
    #[inline]
    pub fn distance(self, p: Vec4, xy_bound: f32) -> f32 {
        match self {
            ClipPlane::Left => p.x + xy_bound * p.w,
            ClipPlane::Right => -p.x + xy_bound * p.w,
            ClipPlane::Bottom => p.y + xy_bound * p.w,
            ClipPlane::Top => -p.y + xy_bound * p.w,
            ClipPlane::Near => p.z + p.w,
            ClipPlane::Far => -p.z + p.w,
        }
    }
}

fn clip_into<const N: usize>(
    input: &[ClipVertex],
    plane: ClipPlane,
    xy_bound: f32,
    out: &mut HVec<ClipVertex, N>,
) {
    out.clear();
    let Some(mut prev) = input.last() else {
        return;
    };
    let mut d_prev = plane.distance(prev.pos, xy_bound);
    for cur in input {
        let d_cur = plane.distance(cur.pos, xy_bound);
        let prev_in = d_prev >= 0.0;
        let cur_in = d_cur >= 0.0;
        if prev_in != cur_in {
            let alpha = d_prev / (d_prev - d_cur);
            push(out, prev.lerp(cur, alpha));
        }
        if cur_in {
            push(out, *cur);
        }
        prev = cur;
        d_prev = d_cur;
    }
}

#[inline]
fn push<const N: usize>(out: &mut HVec<ClipVertex, N>, v: ClipVertex) {
    // Convex input gains at most one vertex per plane; capacity covers it.
    let overflow = out.push(v).is_err();
    debug_assert!(!overflow, "clip polygon capacity exceeded");
}

/// Clip a triangle against one half-space. Returns 0 vertices when it is
/// fully outside, the triangle itself when fully inside, else the 3 or 4
/// vertex remainder.
pub fn clip_triangle_against_plane(
    plane: ClipPlane,
    xy_bound: f32,
    v0: &ClipVertex,
    v1: &ClipVertex,
    v2: &ClipVertex,
) -> HVec<ClipVertex, 4> {
    let mut out = HVec::new();
    clip_into(&[*v0, *v1, *v2], plane, xy_bound, &mut out);
    out
}

/// Clip a triangle against all six planes. The result is empty or a convex
/// polygon of 3 to 9 vertices in the input winding.
pub fn clip_to_frustum(triangle: [ClipVertex; 3], xy_bound: f32) -> ClipPolygon {
    let mut poly = ClipPolygon::new();
    let mut scratch = ClipPolygon::new();
    for v in triangle {
        push(&mut poly, v);
    }
    for plane in ClipPlane::ALL {
        clip_into(&poly, plane, xy_bound, &mut scratch);
        std::mem::swap(&mut poly, &mut scratch);
        if poly.len() < 3 {
            poly.clear();
            break;
        }
    }
    poly
}

/// Fan triangulation of a convex polygon: `(0, i, i+1)`.
pub fn fan_triangles(poly: &[ClipVertex]) -> impl Iterator<Item = [ClipVertex; 3]> + '_ {
    (1..poly.len().saturating_sub(1)).map(move |i| [poly[0], poly[i], poly[i + 1]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32, z: f32) -> ClipVertex {
        ClipVertex {
            pos: Vec4::new(x, y, z, 1.0),
            uv: Vec2::new(x, y),
            color: Vec3::new(x, y, z),
            ..Default::default()
        }
    }

    #[test]
    fn test_fully_inside_is_unchanged() {
        let (a, b, c) = (v(0.0, 0.0, 0.0), v(0.5, 0.0, 0.0), v(0.0, 0.5, 0.0));
        let out = clip_triangle_against_plane(ClipPlane::Right, 1.0, &a, &b, &c);
        assert_eq!(out.as_slice(), &[a, b, c]);
    }

    #[test]
    fn test_fully_outside_is_empty() {
        let (a, b, c) = (v(2.0, 0.0, 0.0), v(3.0, 0.0, 0.0), v(2.0, 1.0, 0.0));
        let out = clip_triangle_against_plane(ClipPlane::Right, 1.0, &a, &b, &c);
        assert!(out.is_empty());
    }

    #[test]
    fn test_one_inside_gives_triangle() {
        let (a, b, c) = (v(0.0, 0.0, 0.0), v(2.0, 0.0, 0.0), v(0.0, 2.0, 0.0));
        let out = clip_triangle_against_plane(ClipPlane::Top, 1.0, &a, &b, &c);
        // only c is outside the top plane: quad
        assert_eq!(out.len(), 4);
        let out = clip_triangle_against_plane(ClipPlane::Right, 0.5, &v(0.0, 0.0, 0.0), &v(2.0, 0.0, 0.0), &v(2.0, 1.0, 0.0));
        assert_eq!(out.len(), 3);
        for p in &out {
            assert!(p.pos.x <= 0.5 + 1e-6);
        }
    }

    #[test]
    fn test_attributes_interpolated_at_crossing() {
        let (a, b, c) = (v(0.0, 0.0, 0.0), v(2.0, 0.0, 0.0), v(0.0, 0.5, 0.0));
        let out = clip_triangle_against_plane(ClipPlane::Right, 1.0, &a, &b, &c);
        let crossing = out
            .iter()
            .find(|p| (p.pos.x - 1.0).abs() < 1e-6 && p.pos.y.abs() < 1e-6)
            .copied();
        let crossing = crossing.unwrap_or_default();
        assert!((crossing.uv - Vec2::new(1.0, 0.0)).length() < 1e-6);
        assert!((crossing.color - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_frustum_clip_stays_inside() {
        let tri = [v(-3.0, -3.0, 0.0), v(3.0, -2.5, 0.5), v(0.0, 4.0, -0.5)];
        let poly = clip_to_frustum(tri, 1.0);
        assert!(poly.len() >= 3 && poly.len() <= MAX_CLIP_VERTICES);
        for p in &poly {
            for plane in ClipPlane::ALL {
                assert!(plane.distance(p.pos, 1.0) >= -1e-5);
            }
        }
        assert_eq!(fan_triangles(&poly).count(), poly.len() - 2);
    }

    #[test]
    fn test_near_plane_cuts_behind_eye() {
        // w < 0 is behind the eye
        let mut behind = v(0.0, 0.0, 0.0);
        behind.pos = Vec4::new(0.0, 0.0, -2.0, -1.0);
        let tri = [v(-0.5, -0.5, 0.0), v(0.5, -0.5, 0.0), behind];
        let poly = clip_to_frustum(tri, 1.0);
        assert_eq!(poly.len(), 4);
        for p in &poly {
            assert!(p.pos.w > 0.0);
        }
    }
}
