//! Depth buffer values and the encoder that produces them
//!
//! The rasterizer interpolates a per-vertex depth that grows towards the
//! eye (`1/w` in perspective, `1 - z` in orthographic). The encoder maps it
//! affinely onto the storage type: `stored = wa * depth + wb`. A cleared
//! buffer holds 0, the farthest value, and a fragment passes the depth test
//! when the stored value is strictly smaller than its own.

use glam::Mat4;

/// Storage type of a depth buffer entry.
pub trait DepthValue: Copy + PartialOrd + Default + Send + Sync + 'static {
    /// Quantized types get coefficients that spread the depth range over
    /// the integer range.
    const QUANTIZED: bool;

    /// The value a cleared buffer holds.
    const FARTHEST: Self;

    /// Convert an already scaled depth. Quantized types saturate.
    fn from_scaled(v: f32) -> Self;
}

impl DepthValue for f32 {
    const QUANTIZED: bool = false;
    const FARTHEST: Self = 0.0;

    #[inline]
    fn from_scaled(v: f32) -> Self {
        v
    }
}

impl DepthValue for u16 {
    const QUANTIZED: bool = true;
    const FARTHEST: Self = 0;

    #[inline]
    fn from_scaled(v: f32) -> Self {
        v as u16
    }
}

/// Affine depth quantization coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthEncoder {
    pub wa: f32,
    pub wb: f32,
}

impl DepthEncoder {
    /// Stores the raw depth value.
    pub const LOSSLESS: Self = Self { wa: 1.0, wb: 0.0 };

    /// Coefficients for storage type `Z` under the given projection.
    ///
    /// In orthographic mode depth is `1 - z_ndc` in `[0, 2]`, scaled just
    /// under the 16 bit range. In perspective mode depth is `1/w` and the
    /// coefficients come from the projection matrix so that the stored
    /// value is `32768 * (1 - z_ndc)`, using the whole range between the
    /// near and far planes.
    pub fn for_projection<Z: DepthValue>(projection: &Mat4, ortho: bool) -> Self {
        if !Z::QUANTIZED {
            return Self::LOSSLESS;
        }
        if ortho {
            Self { wa: 32767.4, wb: 0.0 }
        } else {
            let p22 = projection.z_axis.z;
            let p23 = projection.w_axis.z;
            Self {
                wa: -32768.0 * p23,
                wb: 32768.0 * (p22 + 1.0),
            }
        }
    }

    #[inline]
    pub fn encode<Z: DepthValue>(&self, depth: f32) -> Z {
        Z::from_scaled(self.wa * depth + self.wb)
    }
}
