//! Renderer configuration
//!
//! A `RenderConfig` describes viewport, projection, camera, light, material
//! and requested capabilities. It is stored as RON and applied through the
//! ordinary renderer setters.

use std::fs;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::raster::{PixelTarget, TextureQuality, TextureWrap};
use crate::renderer::{DepthValue, Light, Material, Renderer, Shader};

/// Projection description
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ProjectionConfig {
    /// Vertical field of view in degrees. `aspect: None` follows the viewport.
    Perspective {
        fovy: f32,
        aspect: Option<f32>,
        near: f32,
        far: f32,
    },
    Frustum {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        ProjectionConfig::Perspective { fovy: 45.0, aspect: None, near: 1.0, far: 100.0 }
    }
}

/// Camera placed with `look_at`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub eye: Vec3,
    pub center: Vec3,
    pub up: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self { eye: Vec3::ZERO, center: Vec3::NEG_Z, up: Vec3::Y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub viewport: (i32, i32),
    pub offset: (i32, i32),
    pub projection: ProjectionConfig,
    /// Positive culls back faces, negative front faces, 0 none
    pub culling: i32,
    /// Requested shading/texturing modes, written `Shader("FLAT | TEXTURE")`
    pub shaders: Shader,
    pub texture_wrap: TextureWrap,
    pub texture_quality: TextureQuality,
    pub camera: CameraConfig,
    pub light: Light,
    pub material: Material,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            viewport: (320, 240),
            offset: (0, 0),
            projection: ProjectionConfig::default(),
            culling: 1,
            shaders: Shader::FLAT | Shader::NOTEXTURE,
            texture_wrap: TextureWrap::default(),
            texture_quality: TextureQuality::default(),
            camera: CameraConfig::default(),
            light: Light::default(),
            material: Material::default(),
        }
    }
}

impl RenderConfig {
    pub fn from_ron_str(s: &str) -> Result<Self, LoadError> {
        Ok(ron::from_str(s)?)
    }

    pub fn to_ron_string(&self) -> Result<String, LoadError> {
        let config = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .indentor("  ".to_string());
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), LoadError> {
        fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }
}

/// Load a renderer configuration from a RON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RenderConfig, LoadError> {
    let contents = fs::read_to_string(path)?;
    RenderConfig::from_ron_str(&contents)
}

impl<'a, P: PixelTarget, Z: DepthValue, const LOADED: u32> Renderer<'a, P, Z, LOADED> {
    /// Apply every setting of `config` through the regular setters.
    pub fn apply_config(&mut self, config: &RenderConfig) {
        let (lx, ly) = config.viewport;
        self.set_viewport_size(lx, ly);
        self.set_offset(config.offset.0, config.offset.1);
        match config.projection {
            ProjectionConfig::Perspective { fovy, aspect, near, far } => {
                let (lx, ly) = self.viewport_size();
                let aspect = aspect.unwrap_or(if ly > 0 { lx as f32 / ly as f32 } else { 1.0 });
                self.set_perspective(fovy, aspect, near, far);
            }
            ProjectionConfig::Frustum { left, right, bottom, top, near, far } => {
                self.set_frustum(left, right, bottom, top, near, far);
            }
            ProjectionConfig::Orthographic { left, right, bottom, top, near, far } => {
                self.set_ortho(left, right, bottom, top, near, far);
            }
        }
        self.set_culling(config.culling);
        self.set_shaders(config.shaders);
        self.set_texture_wrap_mode(config.texture_wrap);
        self.set_texture_quality(config.texture_quality);
        let cam = &config.camera;
        self.set_look_at(cam.eye, cam.center, cam.up);
        self.set_light(config.light);
        self.set_material(config.material);
    }
}
