//! Error types for drawing and asset loading

/// Configuration errors detected before a draw call touches any pixel.
///
/// Primitives that are simply invisible (behind the eye, back-facing,
/// clipped away) are never reported here; they are skipped silently.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DrawError {
    /// No pixel target is attached to the renderer.
    #[error("no image attached to the renderer")]
    NoTarget,

    /// The attached pixel target reports itself as unusable.
    #[error("the attached image is not valid")]
    InvalidTarget,

    /// Viewport width or height is zero.
    #[error("viewport size must be positive")]
    InvalidViewport,

    /// Depth testing is active but no depth buffer is attached.
    #[error("depth testing is active but no depth buffer is attached")]
    MissingDepthBuffer,

    /// The depth buffer holds fewer entries than the image has pixels.
    #[error("depth buffer too small: needs {needed} entries, has {actual}")]
    DepthBufferTooSmall { needed: usize, actual: usize },

    /// A texture with zero width or height was supplied.
    #[error("texture has zero size")]
    InvalidTexture,

    /// An index into a vertex, normal or texcoord array is out of range.
    #[error("index {index} out of range (array length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// The face chain of a mesh is truncated or not terminated.
    #[error("malformed face chain")]
    MalformedFaceChain,

    /// A primitive list refers to an attribute array that was not supplied.
    #[error("missing attribute array: {0}")]
    MissingAttribute(&'static str),
}

/// Errors from reading or writing meshes, configs and textures.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("Serialize error: {0}")]
    Serialize(#[from] ron::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}
