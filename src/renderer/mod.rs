//! Software 3D renderer
//!
//! `Renderer` is the render context: camera, model transform, light,
//! material, culling direction and capability state, plus borrowed
//! references to the caller's image and depth buffer. Draw calls transform
//! primitives to view space, cull them, clip what crosses the frustum,
//! light them (flat or Gouraud) and hand them to the rasterizer.
//!
//! Conventions:
//! - Right-handed view space, camera looking down -Z.
//! - Counter-clockwise faces (seen from the front) face along their normal.
//! - The stored projection has Y inverted so NDC -1 is image row 0.
//! - Depth grows towards the eye; a cleared depth buffer holds 0.

mod clip;
mod cull;
mod depth;
mod draw;
mod lighting;
mod shaders;
mod shapes;
mod transform;
mod wireframe;

pub use clip::*;
pub use cull::*;
pub use depth::*;
pub use draw::IndexedPrimitives;
pub use lighting::*;
pub use shaders::*;
pub use shapes::{CubeFaceTexture, MAX_ADAPTIVE_STACKS};
pub use transform::TransformCache;
pub use wireframe::PointAttribute;

use glam::{IVec2, Mat4, Quat, Vec3, Vec4};

use crate::error::DrawError;
use crate::raster::{PixelTarget, TextureQuality, TextureWrap};

/// Flip applied to every projection matrix before it is stored
const FLIP_Y: Mat4 = Mat4::from_cols(
    Vec4::new(1.0, 0.0, 0.0, 0.0),
    Vec4::new(0.0, -1.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 1.0, 0.0),
    Vec4::new(0.0, 0.0, 0.0, 1.0),
);

/// Scene, model and capability state of a renderer.
#[derive(Debug, Clone)]
struct RenderState {
    lx: i32,
    ly: i32,
    ox: i32,
    oy: i32,
    /// Projection with Y inverted
    proj: Mat4,
    view: Mat4,
    model: Mat4,
    light: Light,
    material: Material,
    cache: TransformCache,
    specular: SpecularTable,
    /// Sign of the culling direction (0 disables culling)
    culling: f32,
    shaders: ShaderNegotiator,
    depth: DepthEncoder,
}

/// Render context drawing into a borrowed image and optional depth buffer.
///
/// - `P`: pixel target
/// - `Z`: depth buffer entry (`f32`, or `u16` for half the memory)
/// - `LOADED`: capability bits compiled in (see `Shader`); requests for
///   modes outside this set fall back to the other member of their pair
pub struct Renderer<'a, P: PixelTarget, Z: DepthValue = f32, const LOADED: u32 = ALL_SHADERS> {
    image: Option<&'a mut P>,
    zbuffer: Option<&'a mut [Z]>,
    state: RenderState,
}

impl<'a, P: PixelTarget, Z: DepthValue, const LOADED: u32> Renderer<'a, P, Z, LOADED> {
    const LOADED_IS_VALID: () = assert!(
        loaded_is_valid(LOADED),
        "loaded shaders must contain one member of each mandatory pair"
    );

    /// Create a renderer for a viewport of `lx` by `ly` pixels, with no
    /// image attached yet.
    pub fn new(lx: i32, ly: i32) -> Self {
        let () = Self::LOADED_IS_VALID;

        let lx = lx.clamp(0, MAX_VIEWPORT_DIMENSION);
        let ly = ly.clamp(0, MAX_VIEWPORT_DIMENSION);
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let model = Mat4::IDENTITY;
        let light = Light::default();
        let material = Material::default();
        let shaders = ShaderNegotiator::new(Shader::from_bits_truncate(LOADED));
        let state = RenderState {
            lx,
            ly,
            ox: 0,
            oy: 0,
            proj: FLIP_Y,
            view,
            model,
            light,
            material,
            cache: TransformCache::new(&view, &model, &light, &material),
            specular: SpecularTable::new(material.specular_exponent),
            culling: 1.0,
            shaders,
            depth: DepthEncoder::LOSSLESS,
        };
        let mut renderer = Self { image: None, zbuffer: None, state };
        renderer.set_default_projection();
        renderer
    }

    fn set_default_projection(&mut self) {
        if self.state.shaders.loaded().contains(Shader::PERSPECTIVE) {
            let aspect = if self.state.ly > 0 {
                self.state.lx as f32 / self.state.ly as f32
            } else {
                1.0
            };
            self.set_perspective(45.0, aspect, 1.0, 100.0);
        } else {
            self.set_ortho(-10.0, 10.0, -10.0, 10.0, -10.0, 10.0);
        }
    }

    // ------------------------------------------------------------------
    // Targets and viewport

    /// Attach (or detach) the image drawn into.
    pub fn set_image(&mut self, image: Option<&'a mut P>) {
        self.image = image;
    }

    pub fn image(&self) -> Option<&P> {
        self.image.as_deref()
    }

    pub fn image_mut(&mut self) -> Option<&mut P> {
        self.image.as_deref_mut()
    }

    /// Attach (or detach) the depth buffer. Depth testing is active exactly
    /// while a buffer is attached (when both modes are compiled in).
    pub fn set_zbuffer(&mut self, zbuffer: Option<&'a mut [Z]>) {
        self.state.shaders.request_depth_test(zbuffer.is_some());
        self.zbuffer = zbuffer;
    }

    pub fn zbuffer(&self) -> Option<&[Z]> {
        self.zbuffer.as_deref()
    }

    /// Reset the depth buffer to the farthest value. Only the entries
    /// covering the image are touched when an image is attached.
    pub fn clear_zbuffer(&mut self) {
        let needed = self.image.as_deref().map(|im| im.width() * im.height());
        if let Some(zb) = self.zbuffer.as_deref_mut() {
            let len = needed.map_or(zb.len(), |n| n.min(zb.len()));
            zb[..len].fill(Z::FARTHEST);
        }
    }

    /// Viewport size in pixels, clamped to `[0, MAX_VIEWPORT_DIMENSION]`.
    /// The viewport may be larger than the image; see `set_offset`.
    pub fn set_viewport_size(&mut self, lx: i32, ly: i32) {
        self.state.lx = lx.clamp(0, MAX_VIEWPORT_DIMENSION);
        self.state.ly = ly.clamp(0, MAX_VIEWPORT_DIMENSION);
    }

    pub fn viewport_size(&self) -> (i32, i32) {
        (self.state.lx, self.state.ly)
    }

    /// Position of the image's top-left pixel inside the viewport, for
    /// drawing a large frame tile by tile.
    pub fn set_offset(&mut self, ox: i32, oy: i32) {
        self.state.ox = ox;
        self.state.oy = oy;
    }

    pub fn offset(&self) -> (i32, i32) {
        (self.state.ox, self.state.oy)
    }

    // ------------------------------------------------------------------
    // Projection

    /// Set the projection matrix (OpenGL clip conventions). The projection
    /// mode is left unchanged.
    pub fn set_projection_matrix(&mut self, m: Mat4) {
        self.state.proj = FLIP_Y * m;
        self.update_depth_encoder();
    }

    /// The projection matrix as it was set (without the Y inversion).
    pub fn projection_matrix(&self) -> Mat4 {
        FLIP_Y * self.state.proj
    }

    /// Perspective projection with a vertical field of view in degrees.
    pub fn set_perspective(&mut self, fovy_deg: f32, aspect: f32, near: f32, far: f32) {
        self.state.shaders.request_projection_mode(ProjectionMode::Perspective);
        self.set_projection_matrix(Mat4::perspective_rh_gl(fovy_deg.to_radians(), aspect, near, far));
    }

    /// Perspective projection from the near-plane rectangle.
    pub fn set_frustum(&mut self, left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) {
        let (w, h, d) = (right - left, top - bottom, far - near);
        let m = Mat4::from_cols(
            Vec4::new(2.0 * near / w, 0.0, 0.0, 0.0),
            Vec4::new(0.0, 2.0 * near / h, 0.0, 0.0),
            Vec4::new((right + left) / w, (top + bottom) / h, -(far + near) / d, -1.0),
            Vec4::new(0.0, 0.0, -2.0 * far * near / d, 0.0),
        );
        self.state.shaders.request_projection_mode(ProjectionMode::Perspective);
        self.set_projection_matrix(m);
    }

    pub fn set_ortho(&mut self, left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) {
        self.state.shaders.request_projection_mode(ProjectionMode::Orthographic);
        self.set_projection_matrix(Mat4::orthographic_rh_gl(left, right, bottom, top, near, far));
    }

    /// Switch to perspective mode, keeping the current matrix.
    pub fn use_perspective_projection(&mut self) {
        self.state.shaders.request_projection_mode(ProjectionMode::Perspective);
        self.update_depth_encoder();
    }

    /// Switch to orthographic mode, keeping the current matrix.
    pub fn use_orthographic_projection(&mut self) {
        self.state.shaders.request_projection_mode(ProjectionMode::Orthographic);
        self.update_depth_encoder();
    }

    pub fn is_ortho(&self) -> bool {
        self.state.shaders.is_ortho()
    }

    fn update_depth_encoder(&mut self) {
        self.state.depth = DepthEncoder::for_projection::<Z>(&self.state.proj, self.is_ortho());
    }

    pub fn depth_encoder(&self) -> DepthEncoder {
        self.state.depth
    }

    // ------------------------------------------------------------------
    // Camera and model

    pub fn set_view_matrix(&mut self, view: Mat4) {
        let s = &mut self.state;
        s.view = view;
        s.cache = s.cache.with_view(&s.view, &s.model, s.light.direction);
    }

    pub fn set_look_at(&mut self, eye: Vec3, center: Vec3, up: Vec3) {
        self.set_view_matrix(Mat4::look_at_rh(eye, center, up));
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.state.view
    }

    pub fn set_model_matrix(&mut self, model: Mat4) {
        let s = &mut self.state;
        s.model = model;
        s.cache = s.cache.with_model(&s.view, &s.model);
    }

    /// Model matrix from a position, a scale and a rotation of `angle_deg`
    /// around `axis` (applied in scale, rotate, translate order).
    pub fn set_model_pos_scale_rot(&mut self, center: Vec3, scale: Vec3, angle_deg: f32, axis: Vec3) {
        let rotation = axis
            .try_normalize()
            .map_or(Quat::IDENTITY, |axis| Quat::from_axis_angle(axis, angle_deg.to_radians()));
        self.set_model_matrix(Mat4::from_scale_rotation_translation(scale, rotation, center));
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.state.model
    }

    pub fn transform_cache(&self) -> &TransformCache {
        &self.state.cache
    }

    // ------------------------------------------------------------------
    // Light

    /// Direction the light travels, in world space.
    pub fn set_light_direction(&mut self, direction: Vec3) {
        let s = &mut self.state;
        s.light.direction = direction;
        s.cache = s.cache.with_light_direction(&s.view, direction);
    }

    pub fn set_light_ambient(&mut self, color: Vec3) {
        self.state.light.ambient = color;
        self.update_light_colors();
    }

    pub fn set_light_diffuse(&mut self, color: Vec3) {
        self.state.light.diffuse = color;
        self.update_light_colors();
    }

    pub fn set_light_specular(&mut self, color: Vec3) {
        self.state.light.specular = color;
        self.update_light_colors();
    }

    pub fn set_light(&mut self, light: Light) {
        self.set_light_direction(light.direction);
        self.state.light = light;
        self.update_light_colors();
    }

    pub fn light(&self) -> &Light {
        &self.state.light
    }

    fn update_light_colors(&mut self) {
        let s = &mut self.state;
        s.cache = s.cache.with_light_colors(&s.light, &s.material);
    }

    // ------------------------------------------------------------------
    // Material

    /// Base color of untextured, non vertex-colored primitives (rgb in `[0, 1]`).
    pub fn set_material_color(&mut self, color: Vec3) {
        self.state.material.color = color;
    }

    /// Strengths are clamped to `[0, MAX_STRENGTH]`.
    pub fn set_material_ambient_strength(&mut self, strength: f32) {
        self.state.material.ambient_strength = strength.clamp(0.0, MAX_STRENGTH);
        self.update_material();
    }

    pub fn set_material_diffuse_strength(&mut self, strength: f32) {
        self.state.material.diffuse_strength = strength.clamp(0.0, MAX_STRENGTH);
        self.update_material();
    }

    pub fn set_material_specular_strength(&mut self, strength: f32) {
        self.state.material.specular_strength = strength.clamp(0.0, MAX_STRENGTH);
        self.update_material();
    }

    /// Clamped to `[0, MAX_SPECULAR_EXPONENT]`; 0 turns highlights off.
    pub fn set_material_specular_exponent(&mut self, exponent: i32) {
        let exponent = exponent.clamp(0, MAX_SPECULAR_EXPONENT);
        self.state.material.specular_exponent = exponent;
        self.state.specular.set_exponent(exponent);
    }

    pub fn set_material(&mut self, material: Material) {
        let material = material.clamped();
        self.state.material = material;
        self.state.specular.set_exponent(material.specular_exponent);
        self.update_material();
    }

    pub fn material(&self) -> &Material {
        &self.state.material
    }

    fn update_material(&mut self) {
        let s = &mut self.state;
        s.cache = s.cache.with_material(&s.light, &s.material);
    }

    // ------------------------------------------------------------------
    // Culling and capabilities

    /// Cull faces whose winding, seen from the eye, has the sign of `dir`
    /// opposite to counter-clockwise: positive culls back faces, negative
    /// culls front faces, 0 draws both.
    pub fn set_culling(&mut self, dir: i32) {
        self.state.culling = dir.signum() as f32;
    }

    pub fn culling(&self) -> i32 {
        self.state.culling as i32
    }

    /// Request shading, texturing and sampling modes (see
    /// `ShaderNegotiator::request_shaders`).
    pub fn set_shaders(&mut self, flags: Shader) {
        self.state.shaders.request_shaders(flags);
    }

    pub fn set_texture_wrap_mode(&mut self, wrap: TextureWrap) {
        self.state.shaders.request_texture_wrap(wrap);
    }

    pub fn set_texture_quality(&mut self, quality: TextureQuality) {
        self.state.shaders.request_texture_quality(quality);
    }

    /// Currently active capability flags.
    pub fn active_shaders(&self) -> Shader {
        self.state.shaders.active()
    }

    pub fn shaders(&self) -> &ShaderNegotiator {
        &self.state.shaders
    }

    // ------------------------------------------------------------------
    // Coordinate helpers

    fn project(&self, m: Mat4, p: Vec3) -> Option<Vec3> {
        let h = m * p.extend(1.0);
        if self.is_ortho() {
            Some(h.truncate())
        } else if h.w > 0.0 {
            Some(h.truncate() / h.w)
        } else {
            None
        }
    }

    fn ndc_to_image(&self, ndc: Vec3) -> IVec2 {
        let s = &self.state;
        // stored projection runs top-down
        let x = (ndc.x + 1.0) * s.lx as f32 * 0.5 - s.ox as f32;
        let y = (1.0 - ndc.y) * s.ly as f32 * 0.5 - s.oy as f32;
        IVec2::new(x.round() as i32, y.round() as i32)
    }

    /// Normalized device coordinates of a world-space point (Y up).
    /// `None` for points at or behind the eye in perspective mode.
    pub fn world_to_ndc(&self, p: Vec3) -> Option<Vec3> {
        self.project(self.projection_matrix() * self.state.view, p)
    }

    /// Image pixel of a world-space point.
    pub fn world_to_image(&self, p: Vec3) -> Option<IVec2> {
        self.world_to_ndc(p).map(|ndc| self.ndc_to_image(ndc))
    }

    /// Normalized device coordinates of a model-space point (Y up).
    pub fn model_to_ndc(&self, p: Vec3) -> Option<Vec3> {
        self.project(self.projection_matrix() * self.state.cache.model_view, p)
    }

    /// Image pixel of a model-space point.
    pub fn model_to_image(&self, p: Vec3) -> Option<IVec2> {
        self.model_to_ndc(p).map(|ndc| self.ndc_to_image(ndc))
    }

    // ------------------------------------------------------------------
    // Draw pass setup

    /// Validate the targets and snapshot the state a draw call reads.
    fn begin_pass(&mut self) -> Result<draw::Pass<'_, P, Z>, DrawError> {
        self.try_begin_pass()
            .inspect_err(|e| log::debug!("draw call aborted: {e}"))
    }

    fn try_begin_pass(&mut self) -> Result<draw::Pass<'_, P, Z>, DrawError> {
        let s = &self.state;
        let image = self.image.as_deref_mut().ok_or(DrawError::NoTarget)?;
        if !image.is_valid() {
            return Err(DrawError::InvalidTarget);
        }
        if s.lx <= 0 || s.ly <= 0 {
            return Err(DrawError::InvalidViewport);
        }
        let active = s.shaders.active();
        let depth_test = active.contains(Shader::ZBUFFER);
        let zbuffer = if depth_test {
            let zb = self.zbuffer.as_deref_mut().ok_or(DrawError::MissingDepthBuffer)?;
            let needed = image.width() * image.height();
            if zb.len() < needed {
                return Err(DrawError::DepthBufferTooSmall { needed, actual: zb.len() });
            }
            Some(zb)
        } else {
            None
        };
        let ortho = s.shaders.is_ortho();
        let test = CullAndClipTest::new(
            (s.lx, s.ly),
            (s.ox, s.oy),
            (image.width(), image.height()),
            ortho,
        );
        Ok(draw::Pass {
            image,
            zbuffer,
            cache: s.cache,
            specular: s.specular,
            light: s.light,
            material: s.material,
            culling: s.culling,
            proj: s.proj,
            active,
            loaded: s.shaders.loaded(),
            ortho,
            wrap: s.shaders.texture_wrap().unwrap_or_default(),
            quality: s.shaders.texture_quality().unwrap_or_default(),
            depth: s.depth,
            half_lx: s.lx as f32 * 0.5,
            half_ly: s.ly as f32 * 0.5,
            ox: s.ox as f32,
            oy: s.oy as f32,
            test,
            clip_needed: true,
        })
    }
}
