//! Wireframe lines, 3D pixels and dots
//!
//! Lines are drawn with the target's anti-aliased segment primitive and
//! are not depth tested. Wireframe triangles and quads are face culled
//! like solid ones. Pixels and dots are depth tested when the depth test
//! is active.

use glam::{Vec2, Vec3};

use super::depth::DepthValue;
use super::draw::{check_indices, Pass};
use super::shapes::{adaptive_resolution, sphere_cells, sphere_point, UNIT_BOX};
use super::Renderer;
use crate::error::DrawError;
use crate::mesh::{Mesh, CUBE_QUADS, CUBE_VERTICES};
use crate::raster::{Color, PixelTarget};

impl<P: PixelTarget, Z: DepthValue> Pass<'_, P, Z> {
    /// Image position and rasterizer depth of a model-space point, or
    /// `None` when it is at or behind the eye or outside the depth range.
    fn project_point(&self, p: Vec3) -> Option<(Vec2, f32)> {
        let view = self.cache.model_view.transform_point3(p);
        if !self.ortho && view.z >= 0.0 {
            return None;
        }
        let clip = self.proj * view.extend(1.0);
        let (ndc, depth) = if self.ortho {
            (clip.truncate(), 1.0 - clip.z)
        } else if clip.w > 0.0 {
            (clip.truncate() / clip.w, 1.0 / clip.w)
        } else {
            return None;
        };
        if !(-1.0..=1.0).contains(&ndc.z) {
            return None;
        }
        let pos = Vec2::new(
            (ndc.x + 1.0) * self.half_lx - self.ox,
            (ndc.y + 1.0) * self.half_ly - self.oy,
        );
        Some((pos, depth))
    }

    fn line(&mut self, a: Vec3, b: Vec3, thickness: f32, color: Color, opacity: f32) {
        if let (Some((pa, _)), Some((pb, _))) = (self.project_point(a), self.project_point(b)) {
            self.image.draw_line_aa(pa, pb, thickness, color, opacity);
        }
    }

    /// Whether a face with view-space corner `v0` and normal `face` is
    /// culled.
    fn wire_face_hidden(&self, v0: Vec3, face: Vec3) -> bool {
        let cu = if self.ortho { -face.z } else { face.dot(v0) };
        cu * self.culling > 0.0
    }

    pub(super) fn wire_triangle(&mut self, p: [Vec3; 3], thickness: f32, color: Color, opacity: f32) {
        let v = p.map(|q| self.cache.model_view.transform_point3(q));
        if self.wire_face_hidden(v[0], (v[1] - v[0]).cross(v[2] - v[0])) {
            return;
        }
        for i in 0..3 {
            self.line(p[i], p[(i + 1) % 3], thickness, color, opacity);
        }
    }

    /// The quad is culled as a whole, by the normal of its diagonals, so
    /// sphere cells that collapse to a triangle at the poles still cull.
    pub(super) fn wire_quad(&mut self, p: [Vec3; 4], thickness: f32, color: Color, opacity: f32) {
        let v = p.map(|q| self.cache.model_view.transform_point3(q));
        if self.wire_face_hidden(v[0], (v[2] - v[0]).cross(v[3] - v[1])) {
            return;
        }
        for i in 0..4 {
            self.line(p[i], p[(i + 1) % 4], thickness, color, opacity);
        }
    }

    /// Depth test at pixel `(x, y)`, storing `z` when it passes.
    fn depth_test(&mut self, x: usize, y: usize, z: Z) -> bool {
        let width = self.image.width();
        match self.zbuffer.as_deref_mut() {
            None => true,
            Some(zb) => match zb.get_mut(y * width + x) {
                Some(stored) if *stored < z => {
                    *stored = z;
                    true
                }
                _ => false,
            },
        }
    }

    fn dot(&mut self, p: Vec3, radius: f32, color: Color, opacity: f32) {
        let Some((center, depth)) = self.project_point(p) else {
            return;
        };
        let z: Z = self.depth.encode(depth);
        let (width, height) = (self.image.width(), self.image.height());

        if radius <= 0.0 {
            if center.x < 0.0 || center.y < 0.0 {
                return;
            }
            let (x, y) = (center.x as usize, center.y as usize);
            if x < width && y < height && self.depth_test(x, y, z) {
                self.image.blend_pixel(x, y, color, opacity);
            }
            return;
        }
        if self.zbuffer.is_none() {
            self.image.fill_circle(center, radius, color, opacity);
            return;
        }

        let reach = radius + 0.5;
        let x0 = (center.x - reach).floor().clamp(0.0, width as f32) as usize;
        let x1 = (center.x + reach).ceil().clamp(0.0, width as f32) as usize;
        let y0 = (center.y - reach).floor().clamp(0.0, height as f32) as usize;
        let y1 = (center.y + reach).ceil().clamp(0.0, height as f32) as usize;
        for y in y0..y1 {
            for x in x0..x1 {
                let d = Vec2::new(x as f32 + 0.5, y as f32 + 0.5).distance(center);
                let coverage = (radius + 0.5 - d).clamp(0.0, 1.0);
                if coverage > 0.0 && self.depth_test(x, y, z) {
                    self.image.blend_pixel(x, y, color, opacity * coverage);
                }
            }
        }
    }
}

impl<'a, P: PixelTarget, Z: DepthValue, const LOADED: u32> Renderer<'a, P, Z, LOADED> {
    /// Draw a model-space segment. Skipped if an endpoint is at or behind
    /// the eye or outside the depth range.
    pub fn draw_wireframe_line(
        &mut self,
        a: Vec3,
        b: Vec3,
        thickness: f32,
        color: Color,
        opacity: f32,
    ) -> Result<(), DrawError> {
        let mut pass = self.begin_pass()?;
        pass.line(a, b, thickness, color, opacity);
        Ok(())
    }

    /// Draw the outline of a triangle, unless it is culled.
    pub fn draw_wireframe_triangle(
        &mut self,
        p: [Vec3; 3],
        thickness: f32,
        color: Color,
        opacity: f32,
    ) -> Result<(), DrawError> {
        let mut pass = self.begin_pass()?;
        pass.wire_triangle(p, thickness, color, opacity);
        Ok(())
    }

    pub fn draw_wireframe_quad(
        &mut self,
        p: [Vec3; 4],
        thickness: f32,
        color: Color,
        opacity: f32,
    ) -> Result<(), DrawError> {
        let mut pass = self.begin_pass()?;
        pass.wire_quad(p, thickness, color, opacity);
        Ok(())
    }

    /// Draw the edges of every visible triangle of a mesh. Edges shared by
    /// two triangles are drawn twice.
    pub fn draw_wireframe_mesh(
        &mut self,
        mesh: &Mesh,
        thickness: f32,
        color: Color,
        opacity: f32,
    ) -> Result<(), DrawError> {
        mesh.validate()?;
        let mut pass = self.begin_pass()?;
        if !pass.object_visible(&mesh.bounding_box) {
            return Ok(());
        }
        for tri in mesh.triangles() {
            let p = tri.map(|e| mesh.vertices[e.vertex as usize]);
            pass.wire_triangle(p, thickness, color, opacity);
        }
        Ok(())
    }

    /// Draw indexed segments. Every index is checked before anything is
    /// drawn.
    pub fn draw_wireframe_lines(
        &mut self,
        vertices: &[Vec3],
        indices: &[[u16; 2]],
        thickness: f32,
        color: Color,
        opacity: f32,
    ) -> Result<(), DrawError> {
        check_indices(indices, vertices.len())?;
        let mut pass = self.begin_pass()?;
        for &[a, b] in indices {
            pass.line(vertices[a as usize], vertices[b as usize], thickness, color, opacity);
        }
        Ok(())
    }

    /// Draw the outlines of an indexed triangle list.
    pub fn draw_wireframe_triangles(
        &mut self,
        vertices: &[Vec3],
        indices: &[[u16; 3]],
        thickness: f32,
        color: Color,
        opacity: f32,
    ) -> Result<(), DrawError> {
        check_indices(indices, vertices.len())?;
        let mut pass = self.begin_pass()?;
        for tri in indices {
            pass.wire_triangle(tri.map(|i| vertices[i as usize]), thickness, color, opacity);
        }
        Ok(())
    }

    /// Draw the outlines of an indexed quad list.
    pub fn draw_wireframe_quads(
        &mut self,
        vertices: &[Vec3],
        indices: &[[u16; 4]],
        thickness: f32,
        color: Color,
        opacity: f32,
    ) -> Result<(), DrawError> {
        check_indices(indices, vertices.len())?;
        let mut pass = self.begin_pass()?;
        for quad in indices {
            pass.wire_quad(quad.map(|i| vertices[i as usize]), thickness, color, opacity);
        }
        Ok(())
    }

    /// Outline of the cube `[-1, 1]^3`. As with `draw_cube`, culling is
    /// forced to back faces when it is enabled.
    pub fn draw_wireframe_cube(&mut self, thickness: f32, color: Color, opacity: f32) -> Result<(), DrawError> {
        let mut pass = self.begin_pass()?;
        if pass.culling != 0.0 {
            pass.culling = 1.0;
        }
        if !pass.object_visible(&UNIT_BOX) {
            return Ok(());
        }
        for quad in &CUBE_QUADS {
            pass.wire_quad(quad.map(|i| CUBE_VERTICES[i as usize]), thickness, color, opacity);
        }
        Ok(())
    }

    /// Grid lines of the unit sphere tessellated as in `draw_sphere`, with
    /// back cells culled when culling is enabled.
    pub fn draw_wireframe_sphere(
        &mut self,
        sectors: u32,
        stacks: u32,
        thickness: f32,
        color: Color,
        opacity: f32,
    ) -> Result<(), DrawError> {
        let sectors = sectors.max(3);
        let stacks = stacks.max(2);
        let mut pass = self.begin_pass()?;
        if pass.culling != 0.0 {
            pass.culling = 1.0;
        }
        if !pass.object_visible(&UNIT_BOX) {
            return Ok(());
        }
        for cell in sphere_cells(sectors, stacks) {
            let p = cell.map(|(i, j)| sphere_point(i, j, sectors, stacks).0);
            pass.wire_quad(p, thickness, color, opacity);
        }
        Ok(())
    }

    /// Wireframe sphere tessellated like `draw_adaptive_sphere`.
    pub fn draw_wireframe_adaptive_sphere(
        &mut self,
        quality: f32,
        thickness: f32,
        color: Color,
        opacity: f32,
    ) -> Result<(), DrawError> {
        let (sectors, stacks) = adaptive_resolution(self.unit_sphere_screen_diameter(), quality);
        self.draw_wireframe_sphere(sectors, stacks, thickness, color, opacity)
    }

    /// Blend a single model-space point into the image.
    pub fn draw_pixel(&mut self, p: Vec3, color: Color, opacity: f32) -> Result<(), DrawError> {
        let mut pass = self.begin_pass()?;
        pass.dot(p, 0.0, color, opacity);
        Ok(())
    }

    /// Draw a model-space point as a filled circle of `radius` pixels.
    pub fn draw_dot(&mut self, p: Vec3, radius: f32, color: Color, opacity: f32) -> Result<(), DrawError> {
        let mut pass = self.begin_pass()?;
        pass.dot(p, radius, color, opacity);
        Ok(())
    }

    /// Blend a batch of model-space points, each with its own color and
    /// opacity.
    pub fn draw_pixels(
        &mut self,
        points: &[Vec3],
        colors: PointAttribute<'_, Color>,
        opacities: PointAttribute<'_, f32>,
    ) -> Result<(), DrawError> {
        colors.check(points.len())?;
        opacities.check(points.len())?;
        let mut pass = self.begin_pass()?;
        for (k, &p) in points.iter().enumerate() {
            pass.dot(p, 0.0, colors.get(k), opacities.get(k));
        }
        Ok(())
    }

    /// Draw a batch of dots, each with its own radius, color and opacity.
    pub fn draw_dots(
        &mut self,
        points: &[Vec3],
        radii: PointAttribute<'_, f32>,
        colors: PointAttribute<'_, Color>,
        opacities: PointAttribute<'_, f32>,
    ) -> Result<(), DrawError> {
        radii.check(points.len())?;
        colors.check(points.len())?;
        opacities.check(points.len())?;
        let mut pass = self.begin_pass()?;
        for (k, &p) in points.iter().enumerate() {
            pass.dot(p, radii.get(k), colors.get(k), opacities.get(k));
        }
        Ok(())
    }
}

/// One attribute of a point batch: shared by every point, or picked per
/// point from a palette.
#[derive(Debug, Clone, Copy)]
pub enum PointAttribute<'d, T> {
    Uniform(T),
    /// `palette[indices[k]]` for point `k`
    Indexed { palette: &'d [T], indices: &'d [u16] },
}

impl<T: Copy> PointAttribute<'_, T> {
    fn check(&self, count: usize) -> Result<(), DrawError> {
        let Self::Indexed { palette, indices } = self else {
            return Ok(());
        };
        if indices.len() < count {
            return Err(DrawError::IndexOutOfRange { index: count - 1, len: indices.len() });
        }
        for &i in &indices[..count] {
            if i as usize >= palette.len() {
                return Err(DrawError::IndexOutOfRange { index: i as usize, len: palette.len() });
            }
        }
        Ok(())
    }

    /// Value for point `k`; only called after `check`.
    fn get(&self, k: usize) -> T {
        match *self {
            Self::Uniform(v) => v,
            Self::Indexed { palette, indices } => palette[indices[k] as usize],
        }
    }
}
