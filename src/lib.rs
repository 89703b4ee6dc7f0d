//! Bonnie 3D: a software 3D rendering core
//!
//! Renders lit, textured triangle meshes into caller-owned pixel and depth
//! buffers:
//! - View-space transform with cached lighting vectors
//! - Back/front face culling
//! - Homogeneous frustum clipping with a guard band
//! - Flat or Gouraud Phong lighting from one directional light
//! - Perspective-correct texturing, nearest or bilinear
//! - Float or 16 bit depth buffers
//!
//! Modes that are not compiled into a renderer (see `Shader` and the
//! `LOADED` parameter of `Renderer`) silently fall back to the other
//! member of their pair.

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod error;
pub mod mesh;
pub mod raster;
pub mod renderer;

pub use config::{load_config, RenderConfig};
pub use error::{DrawError, LoadError};
pub use mesh::{Aabb, Mesh, MeshList};
pub use raster::{Color, Framebuffer, PixelTarget, Texture};
pub use renderer::{Light, Material, Renderer, Shader};
