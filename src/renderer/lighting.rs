//! Phong lighting with a single directional light
//!
//! `color = ambient + diffuse * max(d, 0) + specular * pow(s, exponent)`,
//! where the three colors are the light colors pre-scaled by the material
//! strengths (see `TransformCache`). `pow` comes from a small lookup table
//! rebuilt only when the exponent changes.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::transform::TransformCache;

/// Number of entries in the specular power table
pub const SPECULAR_TABLE_SIZE: usize = 32;

/// Largest value the tabulated power reaches (at `x = powmax`)
const MAX_SPECULAR_POW: f32 = 10.0;

pub const MAX_STRENGTH: f32 = 10.0;
pub const MAX_SPECULAR_EXPONENT: i32 = 100;

/// Directional light
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Light {
    /// Direction the light travels, in world space
    pub direction: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-1.0, -1.0, -1.0),
            ambient: Vec3::ONE,
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
        }
    }
}

/// Surface reflectance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub color: Vec3,
    /// In `[0, 10]`; values above 1 give an emissive look
    pub ambient_strength: f32,
    pub diffuse_strength: f32,
    pub specular_strength: f32,
    /// In `[0, 100]`; 0 disables specular highlights
    pub specular_exponent: i32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Vec3::splat(0.75),
            ambient_strength: 0.15,
            diffuse_strength: 0.7,
            specular_strength: 0.5,
            specular_exponent: 8,
        }
    }
}

impl Material {
    /// Copy with every field clamped to its valid range.
    pub fn clamped(self) -> Self {
        Self {
            color: self.color,
            ambient_strength: self.ambient_strength.clamp(0.0, MAX_STRENGTH),
            diffuse_strength: self.diffuse_strength.clamp(0.0, MAX_STRENGTH),
            specular_strength: self.specular_strength.clamp(0.0, MAX_STRENGTH),
            specular_exponent: self.specular_exponent.clamp(0, MAX_SPECULAR_EXPONENT),
        }
    }
}

/// Tabulated `pow(x, exponent)` for `x` in `[0, powmax]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecularTable {
    exponent: i32,
    powmax: f32,
    table: [f32; SPECULAR_TABLE_SIZE],
}

impl SpecularTable {
    pub fn new(exponent: i32) -> Self {
        let exponent = exponent.clamp(0, MAX_SPECULAR_EXPONENT);
        let mut table = [0.0; SPECULAR_TABLE_SIZE];
        let mut powmax = 1.0;
        if exponent > 0 {
            let e = exponent as f32;
            powmax = MAX_SPECULAR_POW.powf(1.0 / e);
            for (k, entry) in table.iter_mut().enumerate() {
                let v = 1.0 - k as f32 / SPECULAR_TABLE_SIZE as f32;
                *entry = (powmax * v).powf(e);
            }
        }
        Self { exponent, powmax, table }
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    /// Rebuild for a new exponent. Returns false if it was already current.
    pub fn set_exponent(&mut self, exponent: i32) -> bool {
        let exponent = exponent.clamp(0, MAX_SPECULAR_EXPONENT);
        if exponent == self.exponent {
            return false;
        }
        *self = Self::new(exponent);
        true
    }

    /// Approximate `pow(x, exponent)`. Zero for `x <= 0` and when the
    /// exponent is 0.
    #[inline]
    pub fn pow(&self, x: f32) -> f32 {
        let indf = (1.0 - x / self.powmax) * SPECULAR_TABLE_SIZE as f32;
        let indi = indf.max(0.0) as usize;
        if indi >= SPECULAR_TABLE_SIZE - 1 {
            return 0.0;
        }
        let t = (indf - indi as f32).max(0.0);
        self.table[indi] + t * (self.table[indi + 1] - self.table[indi])
    }
}

/// Evaluate the Phong formula.
///
/// `base` is the object or vertex color. Pass `None` when a texture sample
/// will be multiplied in later instead.
#[inline]
pub fn phong(
    cache: &TransformCache,
    specular: &SpecularTable,
    diffuse_term: f32,
    specular_term: f32,
    base: Option<Vec3>,
) -> Vec3 {
    let mut col = cache.r_ambient
        + cache.r_diffuse * diffuse_term.max(0.0)
        + cache.r_specular * specular.pow(specular_term);
    if let Some(base) = base {
        col *= base;
    }
    col.clamp(Vec3::ZERO, Vec3::ONE)
}

/// Flat shading: `normal` is the unit face normal in view space, already
/// oriented towards the eye.
#[inline]
pub fn shade_face(cache: &TransformCache, specular: &SpecularTable, normal: Vec3, base: Option<Vec3>) -> Vec3 {
    phong(cache, specular, normal.dot(cache.r_light), normal.dot(cache.h), base)
}

/// Gouraud shading of a vertex normal transformed by the model-view matrix
/// but not normalized. The model-view scale is folded into the cached
/// light vectors.
#[inline]
pub fn shade_vertex(cache: &TransformCache, specular: &SpecularTable, mv_normal: Vec3, base: Option<Vec3>) -> Vec3 {
    phong(cache, specular, mv_normal.dot(cache.light_inorm), mv_normal.dot(cache.h_inorm), base)
}

/// Gouraud shading of a unit view-space normal (used after clipping,
/// where normals have been interpolated and renormalized).
#[inline]
pub fn shade_unit_normal(cache: &TransformCache, specular: &SpecularTable, normal: Vec3, base: Option<Vec3>) -> Vec3 {
    phong(cache, specular, normal.dot(cache.r_light), normal.dot(cache.h), base)
}
