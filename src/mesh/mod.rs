//! Mesh container
//!
//! Meshes hold model-space positions with optional normals and texture
//! coordinates, plus a compact face chain stream (see `faces`). A scene is
//! an ordered `MeshList` arena drawn front to back of the list.

pub mod faces;
mod geometry;
mod io;

pub use faces::{ChainReader, ChainToken, FaceChainBuilder, FaceElement, StripStep, Triangles};
pub use geometry::*;
pub(crate) use geometry::{CUBE_NORMALS, CUBE_QUADS, CUBE_VERTICES};
pub use io::*;
