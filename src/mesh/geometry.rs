//! Mesh container and bounding boxes
//!
//! Pure data structures with minimal behavior.
//! All rendering logic lives in the renderer.

use std::sync::Arc;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::faces::{ChainReader, FaceChainBuilder, FaceElement, Triangles};
use crate::error::DrawError;
use crate::raster::Texture;
use crate::renderer::Material;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box holding every point, or the all-zero box if there are none
    pub fn from_points<'a, I: IntoIterator<Item = &'a Vec3>>(points: I) -> Self {
        let mut iter = points.into_iter();
        let Some(&first) = iter.next() else {
            return Self::default();
        };
        let mut bbox = Self::new(first, first);
        for &p in iter {
            bbox.expand(p);
        }
        bbox
    }

    /// The all-zero box stands for "unknown" and is never culled
    pub fn is_unset(&self) -> bool {
        self.min == Vec3::ZERO && self.max == Vec3::ZERO
    }

    /// Check if a point is inside the box
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Expand bounds to include a point
    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        if self.is_unset() {
            return *other;
        }
        if other.is_unset() {
            return *self;
        }
        Aabb::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// Get center of the box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }
}

/// A triangle mesh
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub name: String,
    /// Vertex positions in model space
    pub vertices: Vec<Vec3>,
    /// Texture coordinates (`(0,0)` is the first stored texel)
    #[serde(default)]
    pub texcoords: Option<Vec<Vec2>>,
    /// Unit normals, counter-clockwise faces point along them
    #[serde(default)]
    pub normals: Option<Vec<Vec3>>,
    /// Face chains, see `mesh::faces`
    pub faces: Vec<u16>,
    /// Name of the texture to attach after loading
    #[serde(default)]
    pub texture_name: Option<String>,
    #[serde(skip)]
    pub texture: Option<Arc<Texture>>,
    /// Overrides the renderer material while this mesh is drawn (on request)
    #[serde(default)]
    pub material: Option<Material>,
    /// Computed from vertices, not serialized
    #[serde(skip)]
    pub bounding_box: Aabb,
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn has_texcoords(&self) -> bool {
        self.texcoords.is_some()
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Recalculate bounds from vertices (call after loading from file)
    pub fn recalculate_bounds(&mut self) {
        self.bounding_box = Aabb::from_points(&self.vertices);
    }

    pub fn with_texture(mut self, texture: Arc<Texture>) -> Self {
        self.texture_name = Some(texture.name.clone());
        self.texture = Some(texture);
        self
    }

    /// Attach the texture named by `texture_name` from `textures`.
    /// Returns false if the mesh names a texture that is not there.
    pub fn resolve_texture(&mut self, textures: &[Arc<Texture>]) -> bool {
        let Some(name) = &self.texture_name else {
            return true;
        };
        match textures.iter().find(|t| &t.name == name) {
            Some(t) => {
                self.texture = Some(Arc::clone(t));
                true
            }
            None => {
                log::warn!("mesh {}: texture {} not found", self.name, name);
                false
            }
        }
    }

    pub fn chains(&self) -> ChainReader<'_> {
        ChainReader::new(&self.faces, self.has_texcoords(), self.has_normals())
    }

    pub fn triangles(&self) -> Triangles<'_> {
        Triangles::new(self.chains())
    }

    /// Check the face stream: every chain complete, every index in range,
    /// and the stream terminated by 0 (an empty stream is fine).
    pub fn validate(&self) -> Result<(), DrawError> {
        let stride = 1 + self.has_texcoords() as usize + self.has_normals() as usize;
        let texcoords = self.texcoords.as_deref().map_or(0, |t| t.len());
        let normals = self.normals.as_deref().map_or(0, |n| n.len());
        let check = |index: usize, len: usize| {
            if index < len {
                Ok(())
            } else {
                Err(DrawError::IndexOutOfRange { index, len })
            }
        };

        if self.faces.is_empty() {
            return Ok(());
        }
        let mut pos = 0;
        loop {
            let count = *self.faces.get(pos).ok_or(DrawError::MalformedFaceChain)? as usize;
            pos += 1;
            if count == 0 {
                return Ok(());
            }
            let len = (count + 2) * stride;
            let elements = self
                .faces
                .get(pos..pos + len)
                .ok_or(DrawError::MalformedFaceChain)?;
            for e in elements.chunks_exact(stride) {
                check((e[0] & !super::faces::DBIT) as usize, self.vertices.len())?;
                let mut k = 1;
                if self.has_texcoords() {
                    check(e[k] as usize, texcoords)?;
                    k += 1;
                }
                if self.has_normals() {
                    check(e[k] as usize, normals)?;
                }
            }
            pos += len;
        }
    }

    /// Cube `[-1, 1]^3` with one normal per face and counter-clockwise
    /// faces seen from outside.
    pub fn cube() -> Self {
        let vertices = CUBE_VERTICES.to_vec();
        let normals = CUBE_NORMALS.to_vec();
        let mut builder = FaceChainBuilder::new(false, true);
        for (face, quad) in CUBE_QUADS.iter().enumerate() {
            let n = face as u16;
            builder.quad(quad.map(|v| FaceElement::new(v, 0, n)));
        }
        // eight vertices always fit an element
        let faces = builder.build().unwrap_or_default();
        let mut mesh = Self {
            name: "cube".to_string(),
            vertices,
            normals: Some(normals),
            faces,
            ..Default::default()
        };
        mesh.recalculate_bounds();
        mesh
    }
}

pub(crate) const CUBE_VERTICES: [Vec3; 8] = [
    Vec3::new(-1.0, -1.0, 1.0),
    Vec3::new(1.0, -1.0, 1.0),
    Vec3::new(1.0, 1.0, 1.0),
    Vec3::new(-1.0, 1.0, 1.0),
    Vec3::new(-1.0, -1.0, -1.0),
    Vec3::new(1.0, -1.0, -1.0),
    Vec3::new(1.0, 1.0, -1.0),
    Vec3::new(-1.0, 1.0, -1.0),
];

pub(crate) const CUBE_NORMALS: [Vec3; 6] = [
    Vec3::new(0.0, 0.0, 1.0),  // Front
    Vec3::new(0.0, 0.0, -1.0), // Back
    Vec3::new(0.0, 1.0, 0.0),  // Top
    Vec3::new(0.0, -1.0, 0.0), // Bottom
    Vec3::new(-1.0, 0.0, 0.0), // Left
    Vec3::new(1.0, 0.0, 0.0),  // Right
];

/// Quads into `CUBE_VERTICES`, in `CUBE_NORMALS` order
pub(crate) const CUBE_QUADS: [[u16; 4]; 6] = [
    [0, 1, 2, 3],
    [5, 4, 7, 6],
    [3, 2, 6, 7],
    [4, 5, 1, 0],
    [4, 0, 3, 7],
    [1, 5, 6, 2],
];

/// Handle to a mesh stored in a `MeshList`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(usize);

/// Ordered collection of meshes, drawn front to back in insertion order
#[derive(Debug, Clone, Default)]
pub struct MeshList {
    meshes: Vec<Mesh>,
}

impl MeshList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mesh and return its handle
    pub fn push(&mut self, mesh: Mesh) -> MeshHandle {
        self.meshes.push(mesh);
        MeshHandle(self.meshes.len() - 1)
    }

    pub fn get(&self, handle: MeshHandle) -> Option<&Mesh> {
        self.meshes.get(handle.0)
    }

    pub fn get_mut(&mut self, handle: MeshHandle) -> Option<&mut Mesh> {
        self.meshes.get_mut(handle.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mesh> {
        self.meshes.iter()
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Box around every mesh of the list
    pub fn bounding_box(&self) -> Aabb {
        self.meshes
            .iter()
            .fold(Aabb::default(), |acc, m| acc.union(&m.bounding_box))
    }
}

impl FromIterator<Mesh> for MeshList {
    fn from_iter<I: IntoIterator<Item = Mesh>>(iter: I) -> Self {
        Self { meshes: iter.into_iter().collect() }
    }
}
