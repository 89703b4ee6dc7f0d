//! Derived transform and lighting quantities
//!
//! `TransformCache` is a snapshot of everything the draw path reads that
//! depends on the view, model, light and material inputs. Each `with_*`
//! method returns a new snapshot with only the quantities depending on that
//! input recomputed:
//!
//! | input           | recomputed                                        |
//! |-----------------|---------------------------------------------------|
//! | view            | model-view, inorm, light/halfway vectors          |
//! | model           | model-view, inorm, scaled light/halfway vectors   |
//! | light direction | light/halfway vectors                             |
//! | light colors    | scaled ambient/diffuse/specular colors            |
//! | material        | scaled ambient/diffuse/specular colors            |

use glam::{Mat4, Vec3};

use super::lighting::{Light, Material};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformCache {
    /// `view * model`
    pub model_view: Mat4,
    /// Inverse of the model-view scale, applied to transformed normals
    pub inorm: f32,
    /// Unit vector towards the light, in view space
    pub r_light: Vec3,
    /// Unit halfway vector between the eye direction and `r_light`
    pub h: Vec3,
    /// `r_light * inorm`
    pub light_inorm: Vec3,
    /// `h * inorm`
    pub h_inorm: Vec3,
    /// Light colors scaled by the material strengths
    pub r_ambient: Vec3,
    pub r_diffuse: Vec3,
    pub r_specular: Vec3,
}

impl TransformCache {
    pub fn new(view: &Mat4, model: &Mat4, light: &Light, material: &Material) -> Self {
        let blank = Self {
            model_view: Mat4::IDENTITY,
            inorm: 1.0,
            r_light: Vec3::Z,
            h: Vec3::Z,
            light_inorm: Vec3::Z,
            h_inorm: Vec3::Z,
            r_ambient: Vec3::ZERO,
            r_diffuse: Vec3::ZERO,
            r_specular: Vec3::ZERO,
        };
        blank
            .with_view(view, model, light.direction)
            .with_material(light, material)
    }

    #[must_use]
    pub fn with_view(self, view: &Mat4, model: &Mat4, light_direction: Vec3) -> Self {
        Self {
            model_view: *view * *model,
            ..self
        }
        .with_normal_scale()
        .with_light_direction(view, light_direction)
    }

    #[must_use]
    pub fn with_model(self, view: &Mat4, model: &Mat4) -> Self {
        Self {
            model_view: *view * *model,
            ..self
        }
        .with_normal_scale()
        .with_scaled_light()
    }

    #[must_use]
    pub fn with_light_direction(self, view: &Mat4, light_direction: Vec3) -> Self {
        let r_light = -view.transform_vector3(light_direction).normalize_or_zero();
        let h = (Vec3::Z + r_light).normalize_or_zero();
        Self { r_light, h, ..self }.with_scaled_light()
    }

    /// Same as `with_material`: both scale the light colors by the strengths.
    #[must_use]
    pub fn with_light_colors(self, light: &Light, material: &Material) -> Self {
        self.with_material(light, material)
    }

    #[must_use]
    pub fn with_material(self, light: &Light, material: &Material) -> Self {
        Self {
            r_ambient: light.ambient * material.ambient_strength,
            r_diffuse: light.diffuse * material.diffuse_strength,
            r_specular: light.specular * material.specular_strength,
            ..self
        }
    }

    fn with_normal_scale(self) -> Self {
        let len = self.model_view.transform_vector3(Vec3::Z).length();
        let inorm = if len > 0.0 { 1.0 / len } else { 1.0 };
        Self { inorm, ..self }
    }

    fn with_scaled_light(self) -> Self {
        Self {
            light_inorm: self.r_light * self.inorm,
            h_inorm: self.h * self.inorm,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 0.001
    }

    #[test]
    fn test_light_in_view_space() {
        let light = Light { direction: Vec3::new(0.0, 0.0, -1.0), ..Default::default() };
        let cache = TransformCache::new(&Mat4::IDENTITY, &Mat4::IDENTITY, &light, &Material::default());
        assert!(approx(cache.r_light, Vec3::Z));
        assert!(approx(cache.h, Vec3::Z));

        // Turning the camera around flips the light in view space.
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::Z, Vec3::Y);
        let turned = cache.with_view(&view, &Mat4::IDENTITY, light.direction);
        assert!(approx(turned.r_light, -Vec3::Z));
    }

    #[test]
    fn test_model_scale_folds_into_inorm() {
        let light = Light::default();
        let cache = TransformCache::new(&Mat4::IDENTITY, &Mat4::IDENTITY, &light, &Material::default());
        let scaled = cache.with_model(&Mat4::IDENTITY, &Mat4::from_scale(Vec3::splat(4.0)));
        assert!((scaled.inorm - 0.25).abs() < 0.0001);
        assert!(approx(scaled.light_inorm, cache.r_light * 0.25));
        // The light vector itself does not depend on the model.
        assert!(approx(scaled.r_light, cache.r_light));
    }

    #[test]
    fn test_material_only_touches_colors() {
        let light = Light::default();
        let cache = TransformCache::new(&Mat4::IDENTITY, &Mat4::IDENTITY, &light, &Material::default());
        let shiny = Material { specular_strength: 2.0, ..Default::default() };
        let updated = cache.with_material(&light, &shiny);
        assert_eq!(updated.model_view, cache.model_view);
        assert_eq!(updated.r_light, cache.r_light);
        assert!(approx(updated.r_specular, Vec3::splat(2.0)));
        assert!(approx(updated.r_ambient, cache.r_ambient));
    }

    #[test]
    fn test_incremental_matches_full_rebuild() {
        let light = Light { direction: Vec3::new(1.0, -2.0, 0.5), ..Default::default() };
        let material = Material::default();
        let view = Mat4::look_at_rh(Vec3::new(3.0, 2.0, 5.0), Vec3::ZERO, Vec3::Y);
        let model = Mat4::from_rotation_y(0.7) * Mat4::from_scale(Vec3::splat(2.0));

        let incremental = TransformCache::new(&Mat4::IDENTITY, &Mat4::IDENTITY, &Light::default(), &material)
            .with_view(&view, &Mat4::IDENTITY, Light::default().direction)
            .with_model(&view, &model)
            .with_light_direction(&view, light.direction);
        let full = TransformCache::new(&view, &model, &light, &material);

        assert!(incremental.model_view.abs_diff_eq(full.model_view, 1e-5));
        assert!(approx(incremental.light_inorm, full.light_inorm));
        assert!(approx(incremental.h_inorm, full.h_inorm));
    }
}
