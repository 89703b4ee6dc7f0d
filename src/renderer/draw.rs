//! Primitive processing: triangles, quads, indexed lists and meshes
//!
//! Per triangle:
//! 1. vertices are already in view space (`Corner`)
//! 2. reject if every vertex is at or behind the eye (perspective only)
//! 3. cull by the sign of the face normal against the eye direction
//! 4. if the object may cross the guard band, test the triangle and send
//!    it through the frustum clipper; otherwise discard it if it misses
//!    the image tile
//! 5. light (once per face, or once per vertex with caching)
//! 6. rasterize

use glam::{Mat4, Vec2, Vec3, Vec4};

use super::clip::{clip_to_frustum, fan_triangles, ClipVertex};
use super::cull::CullAndClipTest;
use super::depth::{DepthEncoder, DepthValue};
use super::lighting::{shade_face, shade_unit_normal, shade_vertex, Light, Material, SpecularTable};
use super::shaders::Shader;
use super::transform::TransformCache;
use super::Renderer;
use crate::error::DrawError;
use crate::mesh::{Aabb, ChainToken, FaceElement, Mesh, MeshList};
use crate::raster::{
    rasterize_triangle, PixelTarget, RasterVertex, Sampler, Texture, TextureQuality, TextureWrap, Uniforms,
};

/// A vertex in view space with its surface attributes.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct Corner {
    pub view: Vec3,
    /// Clip-space position (`proj * view`)
    pub clip: Vec4,
    /// Model-space normal, `None` to light with the face normal
    pub normal: Option<Vec3>,
    pub uv: Vec2,
    /// Base color for lighting
    pub color: Vec3,
    /// Cached Gouraud color and whether the normal was flipped for it
    pub shaded: Option<(bool, Vec3)>,
}

/// How the faces of one draw call are shaded.
#[derive(Debug, Clone, Copy)]
pub(super) struct FaceMode<'t> {
    pub gouraud: bool,
    /// Set only when texturing is active and texture coordinates exist
    pub texture: Option<&'t Texture>,
}

/// Targets and state snapshot of one draw call.
///
/// Lighting state is copied so a mesh material override only lasts for
/// the pass.
pub(super) struct Pass<'r, P: PixelTarget, Z: DepthValue> {
    pub image: &'r mut P,
    /// `Some` exactly when depth testing
    pub zbuffer: Option<&'r mut [Z]>,
    pub cache: TransformCache,
    pub specular: SpecularTable,
    pub light: Light,
    pub material: Material,
    pub culling: f32,
    pub proj: Mat4,
    pub active: Shader,
    pub loaded: Shader,
    pub ortho: bool,
    pub wrap: TextureWrap,
    pub quality: TextureQuality,
    pub depth: DepthEncoder,
    pub half_lx: f32,
    pub half_ly: f32,
    pub ox: f32,
    pub oy: f32,
    pub test: CullAndClipTest,
    /// Whether triangles must be tested against the guard band
    pub clip_needed: bool,
}

impl<'r, P: PixelTarget, Z: DepthValue> Pass<'r, P, Z> {
    /// Whole-object test. Returns false if the box is entirely outside the
    /// view; otherwise records whether its triangles need clip tests.
    pub fn object_visible(&mut self, bbox: &Aabb) -> bool {
        let m = self.proj * self.cache.model_view;
        if self.test.discard_object(bbox, &m) {
            log::trace!("object discarded: {:?}", bbox);
            return false;
        }
        self.clip_needed = self.test.clip_test_needed(bbox, &m);
        true
    }

    /// Use `material` for the rest of the pass.
    pub fn override_material(&mut self, material: &Material) {
        let material = material.clamped();
        self.cache = self.cache.with_material(&self.light, &material);
        self.specular.set_exponent(material.specular_exponent);
        self.material = material;
    }

    /// Shading for primitives with or without normals and an optional
    /// texture (pass `None` when there are no texture coordinates).
    pub fn face_mode<'t>(&self, has_normals: bool, texture: Option<&'t Texture>) -> FaceMode<'t> {
        let gouraud = self.active.contains(Shader::GOURAUD)
            && (has_normals || !self.loaded.contains(Shader::FLAT));
        let texture = texture.filter(|_| self.active.contains(Shader::TEXTURE));
        FaceMode { gouraud, texture }
    }

    /// Shading for primitives with per-vertex colors: colors are
    /// interpolated whenever Gouraud shading is compiled in.
    pub fn vertex_color_mode(&self) -> FaceMode<'static> {
        FaceMode { gouraud: self.loaded.contains(Shader::GOURAUD), texture: None }
    }

    pub fn corner(&self, p: Vec3, normal: Option<Vec3>, uv: Vec2, color: Vec3) -> Corner {
        let view = self.cache.model_view.transform_point3(p);
        Corner {
            view,
            clip: self.proj * view.extend(1.0),
            normal,
            uv,
            color,
            shaded: None,
        }
    }

    /// Divide by w in perspective mode. `w` keeps the clip-space w.
    #[inline]
    fn ndc(&self, clip: Vec4) -> Vec4 {
        if self.ortho {
            clip
        } else {
            let iw = 1.0 / clip.w;
            Vec4::new(clip.x * iw, clip.y * iw, clip.z * iw, clip.w)
        }
    }

    /// Map to image pixels and rasterizer depth.
    #[inline]
    fn raster_vertex(&self, ndc: Vec4, color: Vec3, uv: Vec2) -> RasterVertex {
        RasterVertex {
            pos: Vec2::new(
                (ndc.x + 1.0) * self.half_lx - self.ox,
                (ndc.y + 1.0) * self.half_ly - self.oy,
            ),
            depth: if self.ortho { 1.0 - ndc.z } else { 1.0 / ndc.w },
            color,
            uv,
        }
    }

    #[inline]
    fn base(mode: &FaceMode<'_>, color: Vec3) -> Option<Vec3> {
        if mode.texture.is_some() {
            None
        } else {
            Some(color)
        }
    }

    /// Gouraud color of a corner, reusing the cached value when the normal
    /// orientation matches.
    fn shade_corner(&self, corner: &mut Corner, face: Vec3, flip: bool, mode: &FaceMode<'_>) -> Vec3 {
        let sign = if flip { -1.0 } else { 1.0 };
        let base = Self::base(mode, corner.color);
        match corner.normal {
            Some(n) => {
                if let Some((cached_flip, color)) = corner.shaded {
                    if cached_flip == flip {
                        return color;
                    }
                }
                let mv_normal = self.cache.model_view.transform_vector3(n) * sign;
                let color = shade_vertex(&self.cache, &self.specular, mv_normal, base);
                corner.shaded = Some((flip, color));
                color
            }
            None => shade_unit_normal(&self.cache, &self.specular, face * sign, base),
        }
    }

    /// Draw a convex polygon as a fan, sharing lit corners between its
    /// triangles.
    pub fn polygon(&mut self, corners: &mut [Corner], mode: FaceMode<'_>) {
        for i in 1..corners.len().saturating_sub(1) {
            let mut tri = [corners[0], corners[i], corners[i + 1]];
            self.triangle(&mut tri, mode);
            corners[0] = tri[0];
            corners[i] = tri[1];
            corners[i + 1] = tri[2];
        }
    }

    pub fn triangle(&mut self, c: &mut [Corner; 3], mode: FaceMode<'_>) {
        let view = [c[0].view, c[1].view, c[2].view];
        if !self.ortho && view.iter().all(|v| v.z >= 0.0) {
            return;
        }

        let face = (view[1] - view[0]).cross(view[2] - view[0]);
        let cu = if self.ortho { -face.z } else { face.dot(view[0]) };
        if cu * self.culling > 0.0 {
            return;
        }
        // Flat shading always lights the side facing the eye. Gouraud
        // normals are only flipped when both sides are drawn.
        let face_flip = cu > 0.0;
        let vertex_flip = self.culling == 0.0 && face_flip;
        let unit_face = face.normalize_or_zero();

        let flat_color = if mode.gouraud {
            None
        } else {
            let sign = if face_flip { -1.0 } else { 1.0 };
            let base = (c[0].color + c[1].color + c[2].color) / 3.0;
            Some(shade_face(&self.cache, &self.specular, unit_face * sign, Self::base(&mode, base)))
        };

        let ndc = [self.ndc(c[0].clip), self.ndc(c[1].clip), self.ndc(c[2].clip)];
        if self.clip_needed && self.test.needs_per_triangle_clip(&view, &ndc) {
            self.clipped_triangle(c, unit_face, vertex_flip, flat_color, mode);
            return;
        }
        if self.test.discard_triangle(&ndc) {
            return;
        }

        let mut verts = [RasterVertex::default(); 3];
        for i in 0..3 {
            let color = if mode.gouraud {
                self.shade_corner(&mut c[i], unit_face, vertex_flip, &mode)
            } else {
                Vec3::ZERO
            };
            verts[i] = self.raster_vertex(ndc[i], color, c[i].uv);
        }
        self.rasterize(verts, flat_color, &mode);
    }

    fn clipped_triangle(
        &mut self,
        c: &[Corner; 3],
        unit_face: Vec3,
        flip: bool,
        flat_color: Option<Vec3>,
        mode: FaceMode<'_>,
    ) {
        let sign = if flip { -1.0 } else { 1.0 };
        let tri = c.map(|k| ClipVertex {
            pos: k.clip,
            normal: k
                .normal
                .map_or(unit_face, |n| self.cache.model_view.transform_vector3(n).normalize_or_zero())
                * sign,
            uv: k.uv,
            color: k.color,
        });
        let poly = clip_to_frustum(tri, self.test.guard_band());
        for t in fan_triangles(&poly) {
            let mut verts = [RasterVertex::default(); 3];
            for (v, cv) in verts.iter_mut().zip(&t) {
                let color = if mode.gouraud {
                    let base = Self::base(&mode, cv.color);
                    shade_unit_normal(&self.cache, &self.specular, cv.normal.normalize_or_zero(), base)
                } else {
                    Vec3::ZERO
                };
                *v = self.raster_vertex(self.ndc(cv.pos), color, cv.uv);
            }
            self.rasterize(verts, flat_color, &mode);
        }
    }

    fn rasterize(&mut self, verts: [RasterVertex; 3], flat_color: Option<Vec3>, mode: &FaceMode<'_>) {
        let uniforms = Uniforms {
            flat_color,
            depth_test: self.zbuffer.is_some(),
            perspective: !self.ortho,
            sampler: mode.texture.map(|texture| Sampler {
                texture,
                quality: self.quality,
                wrap: self.wrap,
            }),
            depth: self.depth,
        };
        rasterize_triangle(&mut *self.image, self.zbuffer.as_deref_mut(), verts, &uniforms);
    }

    /// Walk the face chains of a mesh, handing each triangle to `draw`.
    /// Corners carry over between the triangles of a chain together with
    /// their cached shading; only the incoming corner starts unlit.
    fn walk_chains<F: FnMut(&mut Self, &mut [Corner; 3])>(&mut self, mesh: &Mesh, mut draw: F) {
        let color = self.material.color;
        let corner = |pass: &Self, e: FaceElement| {
            let normal = mesh.normals.as_ref().map(|n| n[e.normal as usize]);
            let uv = mesh.texcoords.as_ref().map_or(Vec2::ZERO, |t| t[e.texcoord as usize]);
            pass.corner(mesh.vertices[e.vertex as usize], normal, uv, color)
        };

        let mut tri = [Corner::default(); 3];
        for token in mesh.chains() {
            tri = match token {
                ChainToken::Start(elems) => elems.map(|e| corner(self, e)),
                ChainToken::Step(step, e) => step.apply(tri, corner(self, e)),
            };
            draw(self, &mut tri);
        }
    }

    /// Draw every triangle of a mesh; a vertex shared along a chain is lit
    /// once.
    pub fn mesh(&mut self, mesh: &Mesh) {
        let texture = match (&mesh.texcoords, &mesh.texture) {
            (Some(_), Some(t)) => Some(&**t),
            _ => None,
        };
        let mode = self.face_mode(mesh.has_normals(), texture);
        self.walk_chains(mesh, |pass, tri| pass.triangle(tri, mode));
    }
}

/// Validate an optional texture argument.
pub(super) fn check_texture(texture: Option<&Texture>) -> Result<(), DrawError> {
    match texture {
        Some(t) if !t.is_valid() => Err(DrawError::InvalidTexture),
        _ => Ok(()),
    }
}

pub(super) fn check_indices<const N: usize>(indices: &[[u16; N]], len: usize) -> Result<(), DrawError> {
    for &index in indices.iter().flatten() {
        if index as usize >= len {
            return Err(DrawError::IndexOutOfRange { index: index as usize, len });
        }
    }
    Ok(())
}

/// Indexed triangle (`N = 3`) or quad (`N = 4`) list.
///
/// Normals and texture coordinates have their own index lists; when one is
/// not given, the vertex indices are used for that attribute too.
#[derive(Debug, Clone, Copy)]
pub struct IndexedPrimitives<'d, const N: usize> {
    pub vertices: &'d [Vec3],
    pub indices: &'d [[u16; N]],
    pub normals: Option<&'d [Vec3]>,
    pub normal_indices: Option<&'d [[u16; N]]>,
    pub texcoords: Option<&'d [Vec2]>,
    pub texcoord_indices: Option<&'d [[u16; N]]>,
    pub texture: Option<&'d Texture>,
}

impl<'d, const N: usize> IndexedPrimitives<'d, N> {
    pub fn new(vertices: &'d [Vec3], indices: &'d [[u16; N]]) -> Self {
        Self {
            vertices,
            indices,
            normals: None,
            normal_indices: None,
            texcoords: None,
            texcoord_indices: None,
            texture: None,
        }
    }

    pub fn with_normals(self, normals: &'d [Vec3], indices: Option<&'d [[u16; N]]>) -> Self {
        Self { normals: Some(normals), normal_indices: indices, ..self }
    }

    pub fn with_texture(self, texture: &'d Texture, texcoords: &'d [Vec2], indices: Option<&'d [[u16; N]]>) -> Self {
        Self {
            texture: Some(texture),
            texcoords: Some(texcoords),
            texcoord_indices: indices,
            ..self
        }
    }

    /// Check every index against its array before anything is drawn.
    pub fn validate(&self) -> Result<(), DrawError> {
        check_indices(self.indices, self.vertices.len())?;
        Self::validate_attribute(self.indices, self.normals.map(<[Vec3]>::len), self.normal_indices, "normals")?;
        Self::validate_attribute(self.indices, self.texcoords.map(<[Vec2]>::len), self.texcoord_indices, "texcoords")?;
        if self.texture.is_some() && self.texcoords.is_none() {
            return Err(DrawError::MissingAttribute("texcoords"));
        }
        check_texture(self.texture)
    }

    fn validate_attribute(
        vertex_indices: &[[u16; N]],
        len: Option<usize>,
        indices: Option<&[[u16; N]]>,
        name: &'static str,
    ) -> Result<(), DrawError> {
        match (len, indices) {
            (None, Some(_)) => Err(DrawError::MissingAttribute(name)),
            (None, None) => Ok(()),
            (Some(len), Some(indices)) => {
                if indices.len() < vertex_indices.len() {
                    return Err(DrawError::IndexOutOfRange { index: vertex_indices.len() - 1, len: indices.len() });
                }
                check_indices(indices, len)
            }
            (Some(len), None) => check_indices(vertex_indices, len),
        }
    }

    fn corners<Pt: PixelTarget, Z: DepthValue>(&self, pass: &Pass<'_, Pt, Z>, k: usize) -> [Corner; N] {
        let vi = self.indices[k];
        let ni = self.normal_indices.map_or(vi, |n| n[k]);
        let ti = self.texcoord_indices.map_or(vi, |t| t[k]);
        let color = pass.material.color;
        std::array::from_fn(|j| {
            let normal = self.normals.map(|n| n[ni[j] as usize]);
            let uv = self.texcoords.map_or(Vec2::ZERO, |t| t[ti[j] as usize]);
            pass.corner(self.vertices[vi[j] as usize], normal, uv, color)
        })
    }
}

impl<'a, P: PixelTarget, Z: DepthValue, const LOADED: u32> Renderer<'a, P, Z, LOADED> {
    /// Draw a triangle with the material color. Normals enable Gouraud
    /// shading; texture coordinates and a texture enable texturing.
    pub fn draw_triangle(
        &mut self,
        p: [Vec3; 3],
        normals: Option<[Vec3; 3]>,
        uvs: Option<[Vec2; 3]>,
        texture: Option<&Texture>,
    ) -> Result<(), DrawError> {
        check_texture(texture)?;
        let mut pass = self.begin_pass()?;
        let mode = pass.face_mode(normals.is_some(), uvs.and(texture));
        let color = pass.material.color;
        let mut c = std::array::from_fn(|i| {
            pass.corner(p[i], normals.map(|n| n[i]), uvs.map_or(Vec2::ZERO, |t| t[i]), color)
        });
        pass.triangle(&mut c, mode);
        Ok(())
    }

    /// Draw a triangle with one base color per vertex.
    pub fn draw_triangle_with_vertex_color(
        &mut self,
        p: [Vec3; 3],
        colors: [Vec3; 3],
        normals: Option<[Vec3; 3]>,
    ) -> Result<(), DrawError> {
        let mut pass = self.begin_pass()?;
        let mode = pass.vertex_color_mode();
        let mut c = std::array::from_fn(|i| pass.corner(p[i], normals.map(|n| n[i]), Vec2::ZERO, colors[i]));
        pass.triangle(&mut c, mode);
        Ok(())
    }

    /// Draw a planar quad `[a, b, c, d]` as triangles `[a, b, c]` and
    /// `[a, c, d]`. Each half is culled on its own rather than the whole
    /// quad by the sign of its first half, so a non-planar quad folded
    /// across the eye direction may show only one half.
    pub fn draw_quad(
        &mut self,
        p: [Vec3; 4],
        normals: Option<[Vec3; 4]>,
        uvs: Option<[Vec2; 4]>,
        texture: Option<&Texture>,
    ) -> Result<(), DrawError> {
        check_texture(texture)?;
        let mut pass = self.begin_pass()?;
        let mode = pass.face_mode(normals.is_some(), uvs.and(texture));
        let color = pass.material.color;
        let mut c: [Corner; 4] = std::array::from_fn(|i| {
            pass.corner(p[i], normals.map(|n| n[i]), uvs.map_or(Vec2::ZERO, |t| t[i]), color)
        });
        pass.polygon(&mut c, mode);
        Ok(())
    }

    pub fn draw_quad_with_vertex_color(
        &mut self,
        p: [Vec3; 4],
        colors: [Vec3; 4],
        normals: Option<[Vec3; 4]>,
    ) -> Result<(), DrawError> {
        let mut pass = self.begin_pass()?;
        let mode = pass.vertex_color_mode();
        let mut c: [Corner; 4] =
            std::array::from_fn(|i| pass.corner(p[i], normals.map(|n| n[i]), Vec2::ZERO, colors[i]));
        pass.polygon(&mut c, mode);
        Ok(())
    }

    fn draw_indexed<const N: usize>(&mut self, list: &IndexedPrimitives<'_, N>) -> Result<(), DrawError> {
        list.validate()?;
        let mut pass = self.begin_pass()?;
        if !pass.object_visible(&Aabb::from_points(list.vertices)) {
            return Ok(());
        }
        let mode = pass.face_mode(list.normals.is_some(), list.texcoords.and(list.texture));
        for k in 0..list.indices.len() {
            let mut c = list.corners(&pass, k);
            pass.polygon(&mut c, mode);
        }
        Ok(())
    }

    /// Draw an indexed triangle list.
    pub fn draw_triangles(&mut self, list: &IndexedPrimitives<'_, 3>) -> Result<(), DrawError> {
        self.draw_indexed(list)
    }

    /// Draw an indexed quad list.
    pub fn draw_quads(&mut self, list: &IndexedPrimitives<'_, 4>) -> Result<(), DrawError> {
        self.draw_indexed(list)
    }

    /// Draw a mesh with the current model matrix. With `use_mesh_material`
    /// the mesh's own material (if any) replaces the renderer's for this
    /// call only.
    pub fn draw_mesh(&mut self, mesh: &Mesh, use_mesh_material: bool) -> Result<(), DrawError> {
        Self::check_mesh(mesh)?;
        let mut pass = self.begin_pass()?;
        Self::mesh_pass(&mut pass, mesh, use_mesh_material);
        Ok(())
    }

    /// Draw every mesh of the list, in order. Nothing is drawn if any mesh
    /// fails validation.
    pub fn draw_meshes(&mut self, meshes: &MeshList, use_mesh_material: bool) -> Result<(), DrawError> {
        for mesh in meshes.iter() {
            Self::check_mesh(mesh)?;
        }
        let mut pass = self.begin_pass()?;
        let (cache, specular, material) = (pass.cache, pass.specular, pass.material);
        for mesh in meshes.iter() {
            pass.cache = cache;
            pass.specular = specular;
            pass.material = material;
            pass.clip_needed = true;
            Self::mesh_pass(&mut pass, mesh, use_mesh_material);
        }
        Ok(())
    }

    fn check_mesh(mesh: &Mesh) -> Result<(), DrawError> {
        mesh.validate()?;
        check_texture(mesh.texture.as_deref())
    }

    fn mesh_pass(pass: &mut Pass<'_, P, Z>, mesh: &Mesh, use_mesh_material: bool) {
        if use_mesh_material {
            if let Some(material) = &mesh.material {
                pass.override_material(material);
            }
        }
        if pass.object_visible(&mesh.bounding_box) {
            pass.mesh(mesh);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{FaceChainBuilder, StripStep};
    use crate::raster::{Color, Framebuffer};

    const SIZE: usize = 32;

    fn front_triangle() -> [Vec3; 3] {
        [Vec3::new(-1.0, -1.0, -3.0), Vec3::new(1.0, -1.0, -3.0), Vec3::new(0.0, 1.0, -3.0)]
    }

    fn lit_red(r: &mut Renderer<'_, Framebuffer>) {
        r.set_light_ambient(Vec3::ONE);
        r.set_material(Material {
            color: Vec3::new(1.0, 0.0, 0.0),
            ambient_strength: 1.0,
            diffuse_strength: 0.0,
            specular_strength: 0.0,
            specular_exponent: 0,
        });
    }

    #[test]
    fn test_errors_before_drawing() {
        let mut r = Renderer::<Framebuffer>::new(SIZE as i32, SIZE as i32);
        assert_eq!(r.draw_triangle(front_triangle(), None, None, None), Err(DrawError::NoTarget));

        let mut fb = Framebuffer::new(SIZE, SIZE);
        let mut small = vec![0.0f32; 10];
        r.set_image(Some(&mut fb));
        r.set_zbuffer(Some(&mut small));
        assert_eq!(
            r.draw_triangle(front_triangle(), None, None, None),
            Err(DrawError::DepthBufferTooSmall { needed: SIZE * SIZE, actual: 10 })
        );
        r.set_zbuffer(None);
        let empty = Texture::new(0, 0);
        assert_eq!(
            r.draw_triangle(front_triangle(), None, Some([Vec2::ZERO; 3]), Some(&empty)),
            Err(DrawError::InvalidTexture)
        );
        r.set_viewport_size(0, 0);
        assert_eq!(r.draw_triangle(front_triangle(), None, None, None), Err(DrawError::InvalidViewport));
        assert_eq!(r.image().map(|fb| fb.count_pixels_not(Color::TRANSPARENT)), Some(0));
    }

    #[test]
    fn test_flat_ambient_triangle() {
        let mut fb = Framebuffer::new(SIZE, SIZE);
        let mut r = Renderer::<Framebuffer>::new(SIZE as i32, SIZE as i32);
        r.set_image(Some(&mut fb));
        lit_red(&mut r);
        r.draw_triangle(front_triangle(), None, None, None).unwrap();
        let fb = r.image().unwrap();
        assert!(fb.count_pixels_not(Color::TRANSPARENT) > 0);
        assert_eq!(fb.pixel(SIZE / 2, SIZE / 2), Color::RED);
    }

    #[test]
    fn test_quad_halves_are_culled_separately() {
        let a = Vec3::new(-1.0, -1.0, -3.0);
        let b = Vec3::new(1.0, -1.0, -3.0);
        let c = Vec3::new(1.0, 1.0, -3.0);
        // folds back over [a, b, c], so [a, c, d] faces away
        let d = Vec3::new(1.0, -0.5, -3.0);

        let mut quad = Framebuffer::new(SIZE, SIZE);
        let mut r = Renderer::<Framebuffer>::new(SIZE as i32, SIZE as i32);
        r.set_image(Some(&mut quad));
        lit_red(&mut r);
        r.draw_quad([a, b, c, d], None, None, None).unwrap();

        let mut half = Framebuffer::new(SIZE, SIZE);
        let mut r = Renderer::<Framebuffer>::new(SIZE as i32, SIZE as i32);
        r.set_image(Some(&mut half));
        lit_red(&mut r);
        r.draw_triangle([a, b, c], None, None, None).unwrap();

        assert!(half.count_pixels_not(Color::TRANSPARENT) > 0);
        assert_eq!(quad.pixels, half.pixels);
    }

    #[test]
    fn test_fully_behind_eye_is_skipped() {
        let mut fb = Framebuffer::new(SIZE, SIZE);
        let mut r = Renderer::<Framebuffer>::new(SIZE as i32, SIZE as i32);
        r.set_image(Some(&mut fb));
        r.set_culling(0);
        let behind = front_triangle().map(|p| p * Vec3::new(1.0, 1.0, -1.0));
        assert_eq!(r.draw_triangle(behind, None, None, None), Ok(()));
        assert_eq!(r.image().map(|fb| fb.count_pixels_not(Color::TRANSPARENT)), Some(0));
    }

    #[test]
    fn test_straddling_eye_is_clipped() {
        let mut fb = Framebuffer::new(SIZE, SIZE);
        let mut r = Renderer::<Framebuffer>::new(SIZE as i32, SIZE as i32);
        r.set_image(Some(&mut fb));
        r.set_culling(0);
        // floor running from in front of the camera to behind it
        let floor = [Vec3::new(-1.0, -1.0, -5.0), Vec3::new(1.0, -1.0, -5.0), Vec3::new(0.0, -1.0, 5.0)];
        r.draw_triangle(floor, None, None, None).unwrap();
        let fb = r.image().unwrap();
        assert!(fb.count_pixels_not(Color::TRANSPARENT) > 0);
        // nothing above the horizon
        for x in 0..SIZE {
            assert_eq!(fb.pixel(x, 2), Color::TRANSPARENT);
        }
    }

    #[test]
    fn test_vertex_colors_interpolate() {
        let mut fb = Framebuffer::new(SIZE, SIZE);
        let mut r = Renderer::<Framebuffer>::new(SIZE as i32, SIZE as i32);
        r.set_image(Some(&mut fb));
        r.set_light_ambient(Vec3::ONE);
        r.set_material(Material { ambient_strength: 1.0, diffuse_strength: 0.0, specular_strength: 0.0, ..Default::default() });
        let quad = [
            Vec3::new(-2.0, -2.0, -3.0),
            Vec3::new(2.0, -2.0, -3.0),
            Vec3::new(2.0, 2.0, -3.0),
            Vec3::new(-2.0, 2.0, -3.0),
        ];
        let colors = [Vec3::X, Vec3::Z, Vec3::Z, Vec3::X];
        r.draw_quad_with_vertex_color(quad, colors, None).unwrap();
        let fb = r.image().unwrap();
        let left = fb.pixel(2, SIZE / 2);
        let right = fb.pixel(SIZE - 3, SIZE / 2);
        assert!(left.r > right.r);
        assert!(left.b < right.b);
    }

    #[test]
    fn test_indexed_list_validation() {
        let mut fb = Framebuffer::new(SIZE, SIZE);
        let mut r = Renderer::<Framebuffer>::new(SIZE as i32, SIZE as i32);
        r.set_image(Some(&mut fb));
        let vertices = front_triangle();
        let bad = [[0u16, 1, 5]];
        assert_eq!(
            r.draw_triangles(&IndexedPrimitives::new(&vertices, &bad)),
            Err(DrawError::IndexOutOfRange { index: 5, len: 3 })
        );
        let good = [[0u16, 1, 2]];
        let normal_idx = [[0u16, 0, 0]];
        let list = IndexedPrimitives { normal_indices: Some(&normal_idx[..]), ..IndexedPrimitives::new(&vertices, &good) };
        assert_eq!(r.draw_triangles(&list), Err(DrawError::MissingAttribute("normals")));
        let normals = [Vec3::Z];
        let list = IndexedPrimitives::new(&vertices, &good).with_normals(&normals, Some(&normal_idx[..]));
        assert_eq!(r.draw_triangles(&list), Ok(()));
        assert!(r.image().map_or(0, |fb| fb.count_pixels_not(Color::TRANSPARENT)) > 0);
    }

    #[test]
    fn test_mesh_material_override_is_temporary() {
        let mut builder = FaceChainBuilder::new(false, false);
        builder.triangle([FaceElement::uniform(0), FaceElement::uniform(1), FaceElement::uniform(2)]);
        let mut mesh = Mesh {
            vertices: front_triangle().to_vec(),
            faces: builder.build().unwrap(),
            material: Some(Material {
                color: Vec3::new(0.0, 1.0, 0.0),
                ambient_strength: 1.0,
                diffuse_strength: 0.0,
                specular_strength: 0.0,
                specular_exponent: 0,
            }),
            ..Mesh::new("tri")
        };
        mesh.recalculate_bounds();

        let mut fb = Framebuffer::new(SIZE, SIZE);
        let mut r = Renderer::<Framebuffer>::new(SIZE as i32, SIZE as i32);
        r.set_image(Some(&mut fb));
        lit_red(&mut r);
        r.draw_mesh(&mesh, true).unwrap();
        assert_eq!(r.image().map(|fb| fb.pixel(SIZE / 2, SIZE / 2)), Some(Color::GREEN));
        r.draw_mesh(&mesh, false).unwrap();
        assert_eq!(r.image().map(|fb| fb.pixel(SIZE / 2, SIZE / 2)), Some(Color::RED));
        assert_eq!(r.material().color, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_gouraud_corner_cache() {
        let mut fb = Framebuffer::new(SIZE, SIZE);
        let mut r = Renderer::<Framebuffer>::new(SIZE as i32, SIZE as i32);
        r.set_image(Some(&mut fb));
        let pass = r.begin_pass().unwrap();
        let mode = FaceMode { gouraud: true, texture: None };
        let mut c = pass.corner(Vec3::new(0.0, 0.0, -3.0), Some(Vec3::Z), Vec2::ZERO, Vec3::ONE);
        let first = pass.shade_corner(&mut c, Vec3::Z, false, &mode);
        assert_eq!(c.shaded, Some((false, first)));
        // a different orientation is recomputed, not reused
        let flipped = pass.shade_corner(&mut c, Vec3::Z, true, &mode);
        assert_eq!(c.shaded, Some((true, flipped)));
        assert_ne!(first, flipped);
    }

    #[test]
    fn test_chain_corners_keep_their_shading() {
        let points = [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0), (-1.0, 1.5)];
        let mut builder = FaceChainBuilder::new(false, true);
        let e = |v: u16| FaceElement::new(v, 0, 0);
        builder.chain(
            [e(0), e(1), e(2)],
            &[(StripStep::KeepSecond, e(3)), (StripStep::KeepFirst, e(4))],
        );
        let mut mesh = Mesh {
            vertices: points.iter().map(|&(x, y)| Vec3::new(x, y, -3.0)).collect(),
            normals: Some(vec![Vec3::Z]),
            faces: builder.build().unwrap(),
            ..Mesh::new("strip")
        };
        mesh.recalculate_bounds();

        let mut fb = Framebuffer::new(SIZE, SIZE);
        let mut r = Renderer::<Framebuffer>::new(SIZE as i32, SIZE as i32);
        r.set_image(Some(&mut fb));
        r.set_shaders(Shader::GOURAUD);
        let mut pass = r.begin_pass().unwrap();
        let mode = pass.face_mode(true, None);
        assert!(mode.gouraud);

        let mut seen = Vec::new();
        let mut previous: Option<[Corner; 3]> = None;
        pass.walk_chains(&mesh, |pass, tri| {
            let before = tri.map(|c| c.shaded);
            if let Some(prev) = previous {
                // both carried corners still hold the color computed for them
                let carried = [before[0], before[1]];
                assert!(carried.iter().all(|s| s.is_some()));
                assert!(carried.iter().all(|s| prev.iter().any(|p| p.shaded == *s)));
            }
            pass.triangle(tri, mode);
            seen.push((before.map(|s| s.is_some()), tri.map(|c| c.shaded.is_some())));
            previous = Some(*tri);
        });

        assert_eq!(
            seen,
            vec![
                ([false, false, false], [true, true, true]),
                ([true, true, false], [true, true, true]),
                ([true, true, false], [true, true, true]),
            ]
        );
    }
}
