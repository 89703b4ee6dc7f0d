//! Built-in shapes: unit cube and UV sphere

use std::f32::consts::{FRAC_1_SQRT_2, PI, TAU};

use glam::{Vec2, Vec3};

use super::depth::DepthValue;
use super::draw::{check_texture, Corner};
use super::Renderer;
use crate::error::DrawError;
use crate::mesh::{Aabb, CUBE_NORMALS, CUBE_QUADS, CUBE_VERTICES};
use crate::raster::{PixelTarget, Texture};

/// Texture coordinates and texture for one cube face
pub type CubeFaceTexture<'t> = Option<(&'t [Vec2; 4], &'t Texture)>;

pub(super) const UNIT_BOX: Aabb = Aabb { min: Vec3::NEG_ONE, max: Vec3::ONE };

/// Upper bound on the stacks an adaptive sphere is split into
pub const MAX_ADAPTIVE_STACKS: u32 = 128;

/// Normal (and position) and texture coordinates of grid point `(i, j)` of
/// the unit sphere, `i` counting stacks from the north pole.
pub(super) fn sphere_point(i: u32, j: u32, sectors: u32, stacks: u32) -> (Vec3, Vec2) {
    let phi = PI * i as f32 / stacks as f32;
    let theta = TAU * j as f32 / sectors as f32;
    let n = Vec3::new(phi.sin() * theta.sin(), phi.cos(), phi.sin() * theta.cos());
    let uv = Vec2::new(j as f32 / sectors as f32, i as f32 / stacks as f32);
    (n, uv)
}

/// Grid cells of a `sectors` by `stacks` sphere: top-left, bottom-left,
/// bottom-right, top-right seen from outside.
pub(super) fn sphere_cells(sectors: u32, stacks: u32) -> impl Iterator<Item = [(u32, u32); 4]> {
    (0..stacks).flat_map(move |i| (0..sectors).map(move |j| [(i, j), (i + 1, j), (i + 1, j + 1), (i, j + 1)]))
}

/// `(sectors, stacks)` for a sphere spanning `diameter` pixels.
pub(super) fn adaptive_resolution(diameter: f32, quality: f32) -> (u32, u32) {
    let detail = (diameter * quality).max(0.0).sqrt();
    let stacks = (2 + detail as u32).min(MAX_ADAPTIVE_STACKS);
    (2 * stacks - 2, stacks)
}

impl<'a, P: PixelTarget, Z: DepthValue, const LOADED: u32> Renderer<'a, P, Z, LOADED> {
    /// Draw the cube `[-1, 1]^3` with the material color and one normal per
    /// face. Faces are counter-clockwise seen from outside; when culling is
    /// enabled it is forced to back faces for this call.
    pub fn draw_cube(&mut self) -> Result<(), DrawError> {
        self.draw_cube_faces(&[None; 6])
    }

    /// Draw the cube with a texture on each face that has one. Faces are
    /// front, back, top, bottom, left, right; corners run counter-clockwise
    /// from the bottom-left as seen from outside.
    pub fn draw_textured_cube(&mut self, faces: &[CubeFaceTexture<'_>; 6]) -> Result<(), DrawError> {
        for &(_, texture) in faces.iter().flatten() {
            check_texture(Some(texture))?;
        }
        self.draw_cube_faces(faces)
    }

    fn draw_cube_faces(&mut self, faces: &[CubeFaceTexture<'_>; 6]) -> Result<(), DrawError> {
        let mut pass = self.begin_pass()?;
        if pass.culling != 0.0 {
            pass.culling = 1.0;
        }
        if !pass.object_visible(&UNIT_BOX) {
            return Ok(());
        }
        let color = pass.material.color;
        for ((quad, &normal), face) in CUBE_QUADS.iter().zip(&CUBE_NORMALS).zip(faces) {
            let mode = pass.face_mode(true, face.map(|(_, t)| t));
            let mut c: [Corner; 4] = std::array::from_fn(|k| {
                let uv = face.map_or(Vec2::ZERO, |(uvs, _)| uvs[k]);
                pass.corner(CUBE_VERTICES[quad[k] as usize], Some(normal), uv, color)
            });
            pass.polygon(&mut c, mode);
        }
        Ok(())
    }

    /// Draw the unit sphere tessellated into `sectors` slices around the Y
    /// axis and `stacks` bands from pole to pole, with smooth normals.
    /// Texture coordinates run from `u = 0` at +Z eastwards and `v = 0` at
    /// the north pole.
    pub fn draw_sphere(&mut self, sectors: u32, stacks: u32, texture: Option<&Texture>) -> Result<(), DrawError> {
        check_texture(texture)?;
        let sectors = sectors.max(3);
        let stacks = stacks.max(2);
        let mut pass = self.begin_pass()?;
        if !pass.object_visible(&UNIT_BOX) {
            return Ok(());
        }
        let mode = pass.face_mode(true, texture);
        let color = pass.material.color;

        for cell in sphere_cells(sectors, stacks) {
            let mut c: [Corner; 4] = std::array::from_fn(|k| {
                let (n, uv) = sphere_point(cell[k].0, cell[k].1, sectors, stacks);
                pass.corner(n, Some(n), uv, color)
            });
            pass.polygon(&mut c, mode);
        }
        Ok(())
    }

    /// Approximate diameter in pixels of the unit sphere under the current
    /// model and view. Zero when its center is at or behind the eye.
    pub fn unit_sphere_screen_diameter(&self) -> f32 {
        let s = &self.state;
        let mv = s.cache.model_view;
        let center = mv.transform_point3(Vec3::ZERO);
        if !self.is_ortho() && center.z >= 0.0 {
            return 0.0;
        }
        let r = (mv.transform_point3(Vec3::X) - center).length();
        let rim = center - Vec3::new(r, r, 0.0) * FRAC_1_SQRT_2;
        let project = |p: Vec3| {
            let h = s.proj * p.extend(1.0);
            if self.is_ortho() {
                Vec2::new(h.x, h.y)
            } else {
                Vec2::new(h.x, h.y) / h.w
            }
        };
        let d = project(rim) - project(center);
        (d * Vec2::new(s.lx as f32, s.ly as f32)).length()
    }

    /// Draw the unit sphere with a tessellation that follows its size on
    /// screen: `stacks = 2 + floor(sqrt(diameter * quality))` (at most
    /// `MAX_ADAPTIVE_STACKS`) and `sectors = 2 * stacks - 2`.
    pub fn draw_adaptive_sphere(&mut self, quality: f32, texture: Option<&Texture>) -> Result<(), DrawError> {
        let (sectors, stacks) = adaptive_resolution(self.unit_sphere_screen_diameter(), quality);
        self.draw_sphere(sectors, stacks, texture)
    }
}
