//! Shader capability flags and the negotiator that reconciles requested
//! modes with the modes compiled into a renderer.
//!
//! Capabilities come in mandatory pairs: exactly one member of
//! {flat, Gouraud}, {orthographic, perspective}, {no depth test, depth test}
//! and {no texture, texture} is active at any time, and while texturing is
//! active also exactly one of {nearest, bilinear} and {wrap, clamp}. When a
//! requested member was not compiled in, the other member of its pair is
//! used instead. This never fails.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::raster::{TextureQuality, TextureWrap};

bitflags! {
    /// Rendering capability flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Shader: u32 {
        const PERSPECTIVE = 1 << 0;
        const ORTHO = 1 << 1;
        const NOZBUFFER = 1 << 2;
        const ZBUFFER = 1 << 3;
        const FLAT = 1 << 4;
        const GOURAUD = 1 << 5;
        const NOTEXTURE = 1 << 7;
        const TEXTURE = 1 << 8;
        const TEXTURE_NEAREST = 1 << 11;
        const TEXTURE_BILINEAR = 1 << 12;
        const TEXTURE_WRAP_POW2 = 1 << 13;
        const TEXTURE_CLAMP = 1 << 14;
    }
}

impl Shader {
    pub const PROJECTION: Shader = Shader::PERSPECTIVE.union(Shader::ORTHO);
    pub const DEPTH_TEST: Shader = Shader::NOZBUFFER.union(Shader::ZBUFFER);
    pub const SHADING: Shader = Shader::FLAT.union(Shader::GOURAUD);
    pub const TEXTURING: Shader = Shader::NOTEXTURE.union(Shader::TEXTURE);
    pub const TEXTURE_QUALITY: Shader = Shader::TEXTURE_NEAREST.union(Shader::TEXTURE_BILINEAR);
    pub const TEXTURE_WRAP: Shader = Shader::TEXTURE_WRAP_POW2.union(Shader::TEXTURE_CLAMP);

    /// Any bit that implies texturing when requested
    pub const TEXTURE_ANY: Shader = Shader::TEXTURE
        .union(Shader::TEXTURE_QUALITY)
        .union(Shader::TEXTURE_WRAP);
}

/// Every capability compiled in.
pub const ALL_SHADERS: u32 = Shader::all().bits();

/// Whether `loaded` can back a renderer: each mandatory pair has at least
/// one member, and texturing brings one quality and one wrap mode.
pub const fn loaded_is_valid(loaded: u32) -> bool {
    const fn has(loaded: u32, pair: Shader) -> bool {
        loaded & pair.bits() != 0
    }
    has(loaded, Shader::PROJECTION)
        && has(loaded, Shader::DEPTH_TEST)
        && has(loaded, Shader::SHADING)
        && has(loaded, Shader::TEXTURING)
        && (!has(loaded, Shader::TEXTURE)
            || (has(loaded, Shader::TEXTURE_QUALITY) && has(loaded, Shader::TEXTURE_WRAP)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectionMode {
    #[default]
    Perspective,
    Orthographic,
}

/// Active capability state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderNegotiator {
    loaded: Shader,
    requested: Shader,
    projection: ProjectionMode,
    depth_buffer: bool,
    wrap: TextureWrap,
    quality: TextureQuality,
    active: Shader,
}

impl ShaderNegotiator {
    /// Starts with flat shading, no texture, clamp/nearest sampling,
    /// perspective projection and no depth buffer.
    pub fn new(loaded: Shader) -> Self {
        let mut negotiator = Self {
            loaded,
            requested: Shader::FLAT | Shader::NOTEXTURE,
            projection: ProjectionMode::Perspective,
            depth_buffer: false,
            wrap: TextureWrap::Clamp,
            quality: TextureQuality::Nearest,
            active: Shader::empty(),
        };
        negotiator.resolve();
        negotiator
    }

    pub fn loaded(&self) -> Shader {
        self.loaded
    }

    pub fn active(&self) -> Shader {
        self.active
    }

    pub fn is_ortho(&self) -> bool {
        self.active.contains(Shader::ORTHO)
    }

    pub fn projection_mode(&self) -> ProjectionMode {
        if self.is_ortho() {
            ProjectionMode::Orthographic
        } else {
            ProjectionMode::Perspective
        }
    }

    /// Active wrap mode, `None` when no texture mode is compiled in.
    pub fn texture_wrap(&self) -> Option<TextureWrap> {
        if self.active.contains(Shader::TEXTURE_WRAP_POW2) {
            Some(TextureWrap::WrapPow2)
        } else if self.active.contains(Shader::TEXTURE_CLAMP) {
            Some(TextureWrap::Clamp)
        } else {
            None
        }
    }

    /// Active sampling quality, `None` when no texture mode is compiled in.
    pub fn texture_quality(&self) -> Option<TextureQuality> {
        if self.active.contains(Shader::TEXTURE_BILINEAR) {
            Some(TextureQuality::Bilinear)
        } else if self.active.contains(Shader::TEXTURE_NEAREST) {
            Some(TextureQuality::Nearest)
        } else {
            None
        }
    }

    /// Request shading, texturing and sampling modes. Projection and depth
    /// bits in `flags` are ignored: those follow the projection mode and the
    /// attached depth buffer.
    pub fn request_shaders(&mut self, flags: Shader) {
        let mut requested = Shader::empty();
        requested |= if flags.contains(Shader::GOURAUD) { Shader::GOURAUD } else { Shader::FLAT };
        requested |= if flags.intersects(Shader::TEXTURE_ANY) { Shader::TEXTURE } else { Shader::NOTEXTURE };
        self.requested = requested;
        if flags.contains(Shader::TEXTURE_WRAP_POW2) {
            self.wrap = TextureWrap::WrapPow2;
        } else if flags.contains(Shader::TEXTURE_CLAMP) {
            self.wrap = TextureWrap::Clamp;
        }
        if flags.contains(Shader::TEXTURE_BILINEAR) {
            self.quality = TextureQuality::Bilinear;
        } else if flags.contains(Shader::TEXTURE_NEAREST) {
            self.quality = TextureQuality::Nearest;
        }
        self.resolve();
    }

    pub fn request_projection_mode(&mut self, mode: ProjectionMode) {
        self.projection = mode;
        self.resolve();
    }

    /// Depth testing follows whether a depth buffer is attached.
    pub fn request_depth_test(&mut self, buffer_present: bool) {
        self.depth_buffer = buffer_present;
        self.resolve();
    }

    pub fn request_texture_wrap(&mut self, wrap: TextureWrap) {
        self.wrap = wrap;
        self.resolve();
    }

    pub fn request_texture_quality(&mut self, quality: TextureQuality) {
        self.quality = quality;
        self.resolve();
    }

    /// Pick `preferred` if compiled in, else the other member of `pair`.
    fn pick(&self, preferred: Shader, pair: Shader) -> Shader {
        if self.loaded.contains(preferred) {
            preferred
        } else {
            let fallback = pair.difference(preferred).intersection(self.loaded);
            if !fallback.is_empty() {
                log::debug!("shader {:?} not available, using {:?}", preferred, fallback);
            }
            fallback
        }
    }

    fn resolve(&mut self) {
        let mut active = Shader::empty();

        let projection = match self.projection {
            ProjectionMode::Perspective => Shader::PERSPECTIVE,
            ProjectionMode::Orthographic => Shader::ORTHO,
        };
        active |= self.pick(projection, Shader::PROJECTION);

        let depth = if self.depth_buffer { Shader::ZBUFFER } else { Shader::NOZBUFFER };
        active |= self.pick(depth, Shader::DEPTH_TEST);

        active |= self.pick(self.requested.intersection(Shader::SHADING), Shader::SHADING);
        active |= self.pick(self.requested.intersection(Shader::TEXTURING), Shader::TEXTURING);

        let wrap = match self.wrap {
            TextureWrap::WrapPow2 => Shader::TEXTURE_WRAP_POW2,
            TextureWrap::Clamp => Shader::TEXTURE_CLAMP,
        };
        active |= self.pick(wrap, Shader::TEXTURE_WRAP);

        let quality = match self.quality {
            TextureQuality::Nearest => Shader::TEXTURE_NEAREST,
            TextureQuality::Bilinear => Shader::TEXTURE_BILINEAR,
        };
        active |= self.pick(quality, Shader::TEXTURE_QUALITY);

        self.active = active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exactly_one(flags: Shader, pair: Shader) -> bool {
        flags.intersection(pair).bits().count_ones() == 1
    }

    fn pairs_hold(n: &ShaderNegotiator) -> bool {
        let a = n.active();
        let base = exactly_one(a, Shader::PROJECTION)
            && exactly_one(a, Shader::DEPTH_TEST)
            && exactly_one(a, Shader::SHADING)
            && exactly_one(a, Shader::TEXTURING);
        let texture = !a.contains(Shader::TEXTURE)
            || (exactly_one(a, Shader::TEXTURE_WRAP) && exactly_one(a, Shader::TEXTURE_QUALITY));
        base && texture
    }

    #[test]
    fn test_defaults() {
        let n = ShaderNegotiator::new(Shader::all());
        assert_eq!(
            n.active(),
            Shader::PERSPECTIVE | Shader::NOZBUFFER | Shader::FLAT | Shader::NOTEXTURE
                | Shader::TEXTURE_CLAMP | Shader::TEXTURE_NEAREST
        );
    }

    #[test]
    fn test_wrap_falls_back_when_not_compiled() {
        let loaded = Shader::all().difference(Shader::TEXTURE_CLAMP);
        let mut n = ShaderNegotiator::new(loaded);
        n.request_texture_wrap(TextureWrap::Clamp);
        assert_eq!(n.texture_wrap(), Some(TextureWrap::WrapPow2));
    }

    #[test]
    fn test_gouraud_falls_back_to_flat() {
        let loaded = Shader::all().difference(Shader::GOURAUD);
        let mut n = ShaderNegotiator::new(loaded);
        n.request_shaders(Shader::GOURAUD);
        assert!(n.active().contains(Shader::FLAT));
        assert!(!n.active().contains(Shader::GOURAUD));
    }

    #[test]
    fn test_texture_bits_imply_texturing() {
        let mut n = ShaderNegotiator::new(Shader::all());
        n.request_shaders(Shader::GOURAUD | Shader::TEXTURE_BILINEAR);
        assert!(n.active().contains(Shader::TEXTURE | Shader::TEXTURE_BILINEAR));
        n.request_shaders(Shader::FLAT);
        assert!(n.active().contains(Shader::NOTEXTURE));
    }

    #[test]
    fn test_depth_follows_buffer() {
        let mut n = ShaderNegotiator::new(Shader::all());
        n.request_depth_test(true);
        assert!(n.active().contains(Shader::ZBUFFER));
        n.request_depth_test(false);
        assert!(n.active().contains(Shader::NOZBUFFER));

        let mut zonly = ShaderNegotiator::new(Shader::all().difference(Shader::NOZBUFFER));
        zonly.request_depth_test(false);
        assert!(zonly.active().contains(Shader::ZBUFFER));
    }

    #[test]
    fn test_projection_fallback() {
        let mut n = ShaderNegotiator::new(Shader::all().difference(Shader::PERSPECTIVE));
        assert_eq!(n.projection_mode(), ProjectionMode::Orthographic);
        n.request_projection_mode(ProjectionMode::Perspective);
        assert!(n.is_ortho());
    }

    #[test]
    fn test_pairs_hold_after_any_sequence() {
        let loaded_sets = [
            Shader::all(),
            Shader::all().difference(Shader::GOURAUD | Shader::ZBUFFER | Shader::TEXTURE_BILINEAR),
            Shader::all().difference(Shader::FLAT | Shader::NOZBUFFER | Shader::TEXTURE_WRAP_POW2),
            Shader::PERSPECTIVE | Shader::NOZBUFFER | Shader::FLAT | Shader::NOTEXTURE,
        ];
        let requests = [
            Shader::GOURAUD | Shader::TEXTURE,
            Shader::FLAT,
            Shader::TEXTURE_CLAMP | Shader::TEXTURE_BILINEAR,
            Shader::empty(),
            Shader::all(),
        ];
        for loaded in loaded_sets {
            assert!(loaded_is_valid(loaded.bits()));
            let mut n = ShaderNegotiator::new(loaded);
            assert!(pairs_hold(&n));
            for (i, &flags) in requests.iter().enumerate() {
                n.request_shaders(flags);
                assert!(pairs_hold(&n));
                n.request_depth_test(i % 2 == 0);
                assert!(pairs_hold(&n));
                n.request_projection_mode(if i % 3 == 0 { ProjectionMode::Orthographic } else { ProjectionMode::Perspective });
                assert!(pairs_hold(&n));
                n.request_texture_wrap(if i % 2 == 0 { TextureWrap::WrapPow2 } else { TextureWrap::Clamp });
                n.request_texture_quality(if i % 2 == 0 { TextureQuality::Bilinear } else { TextureQuality::Nearest });
                assert!(pairs_hold(&n));
            }
        }
    }

    #[test]
    fn test_loaded_validation() {
        assert!(loaded_is_valid(ALL_SHADERS));
        assert!(!loaded_is_valid((Shader::all() - Shader::SHADING).bits()));
        assert!(!loaded_is_valid((Shader::all() - Shader::TEXTURE_WRAP).bits()));
        assert!(loaded_is_valid(
            (Shader::all() - Shader::TEXTURE - Shader::TEXTURE_WRAP - Shader::TEXTURE_QUALITY).bits()
        ));
    }
}
