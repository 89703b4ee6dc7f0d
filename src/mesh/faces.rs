//! Face chain encoding
//!
//! Faces are stored as a flat `u16` stream of triangle chains:
//!
//! ```text
//! [count] [elem] [elem] [elem] ([elem] * (count - 1)) ... [0]
//! ```
//!
//! `count` is the number of triangles in the chain. An element is the
//! vertex index (low 15 bits), followed by a texcoord index when the mesh
//! has texcoords and a normal index when it has normals. The first three
//! elements form the first triangle `[V1, V2, V3]`; each following element
//! `V4` forms the next triangle from the previous one, according to the top
//! bit of its vertex word:
//!
//! - bit clear: `[V1, V3, V4]`
//! - bit set:   `[V3, V2, V4]`

use crate::error::DrawError;

/// Strip direction bit of an element's vertex word
pub const DBIT: u16 = 1 << 15;

/// Largest vertex index an element can hold
pub const MAX_VERTEX_INDEX: usize = (DBIT - 1) as usize;

/// One corner of a face: indices into the vertex, texcoord and normal arrays.
/// Indices of arrays the mesh does not have are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FaceElement {
    pub vertex: u16,
    pub texcoord: u16,
    pub normal: u16,
}

impl FaceElement {
    pub const fn new(vertex: u16, texcoord: u16, normal: u16) -> Self {
        Self { vertex, texcoord, normal }
    }

    /// Same index into every array
    pub const fn uniform(index: u16) -> Self {
        Self::new(index, index, index)
    }
}

/// How the next triangle of a chain reuses the previous one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripStep {
    /// `[V1, V2, V3] + V4 -> [V1, V3, V4]` (fan around V1)
    KeepFirst,
    /// `[V1, V2, V3] + V4 -> [V3, V2, V4]` (regular strip)
    KeepSecond,
}

impl StripStep {
    fn from_word(word: u16) -> Self {
        if word & DBIT == 0 {
            StripStep::KeepFirst
        } else {
            StripStep::KeepSecond
        }
    }

    fn bit(self) -> u16 {
        match self {
            StripStep::KeepFirst => 0,
            StripStep::KeepSecond => DBIT,
        }
    }

    /// The triangle following `tri` when `next` is appended.
    #[inline]
    pub fn apply<T: Copy>(self, tri: [T; 3], next: T) -> [T; 3] {
        match self {
            StripStep::KeepFirst => [tri[0], tri[2], next],
            StripStep::KeepSecond => [tri[2], tri[1], next],
        }
    }
}

/// Element of a decoded chain stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainToken {
    /// First triangle of a chain
    Start([FaceElement; 3]),
    /// Next triangle of the current chain
    Step(StripStep, FaceElement),
}

/// Decodes a face stream. Stops at the terminator, or silently at a
/// truncated chain; use `Mesh::validate` to reject those beforehand.
#[derive(Debug, Clone)]
pub struct ChainReader<'a> {
    faces: &'a [u16],
    pos: usize,
    has_texcoords: bool,
    has_normals: bool,
    // elements left in the current chain after its first triangle
    remaining: usize,
    done: bool,
}

impl<'a> ChainReader<'a> {
    pub fn new(faces: &'a [u16], has_texcoords: bool, has_normals: bool) -> Self {
        Self {
            faces,
            pos: 0,
            has_texcoords,
            has_normals,
            remaining: 0,
            done: false,
        }
    }

    fn stride(&self) -> usize {
        1 + self.has_texcoords as usize + self.has_normals as usize
    }

    /// Read one element and the step bit of its vertex word.
    fn element(&mut self) -> Option<(StripStep, FaceElement)> {
        let stride = self.stride();
        let words = self.faces.get(self.pos..self.pos + stride)?;
        self.pos += stride;
        let mut it = words.iter().copied();
        let word = it.next()?;
        let texcoord = if self.has_texcoords { it.next()? } else { 0 };
        let normal = if self.has_normals { it.next()? } else { 0 };
        Some((StripStep::from_word(word), FaceElement::new(word & !DBIT, texcoord, normal)))
    }

    fn next_token(&mut self) -> Option<ChainToken> {
        if self.remaining > 0 {
            self.remaining -= 1;
            let (step, elem) = self.element()?;
            return Some(ChainToken::Step(step, elem));
        }
        let count = *self.faces.get(self.pos)? as usize;
        self.pos += 1;
        if count == 0 {
            return None;
        }
        let (_, a) = self.element()?;
        let (_, b) = self.element()?;
        let (_, c) = self.element()?;
        self.remaining = count - 1;
        Some(ChainToken::Start([a, b, c]))
    }
}

impl Iterator for ChainReader<'_> {
    type Item = ChainToken;

    fn next(&mut self) -> Option<ChainToken> {
        if self.done {
            return None;
        }
        let token = self.next_token();
        self.done = token.is_none();
        token
    }
}

/// Iterates the triangles of a face stream.
#[derive(Debug, Clone)]
pub struct Triangles<'a> {
    reader: ChainReader<'a>,
    current: [FaceElement; 3],
}

impl<'a> Triangles<'a> {
    pub fn new(reader: ChainReader<'a>) -> Self {
        Self { reader, current: [FaceElement::default(); 3] }
    }
}

impl Iterator for Triangles<'_> {
    type Item = [FaceElement; 3];

    fn next(&mut self) -> Option<[FaceElement; 3]> {
        self.current = match self.reader.next()? {
            ChainToken::Start(tri) => tri,
            ChainToken::Step(step, elem) => step.apply(self.current, elem),
        };
        Some(self.current)
    }
}

/// Builds a face stream.
///
/// Vertex indices above `MAX_VERTEX_INDEX` do not fit an element; the first
/// one pushed makes `build` fail.
#[derive(Debug, Clone)]
pub struct FaceChainBuilder {
    has_texcoords: bool,
    has_normals: bool,
    stream: Vec<u16>,
    oversized: Option<u16>,
}

impl FaceChainBuilder {
    pub fn new(has_texcoords: bool, has_normals: bool) -> Self {
        Self { has_texcoords, has_normals, stream: Vec::new(), oversized: None }
    }

    fn push_element(&mut self, step: StripStep, e: FaceElement) {
        if e.vertex as usize > MAX_VERTEX_INDEX && self.oversized.is_none() {
            self.oversized = Some(e.vertex);
        }
        self.stream.push((e.vertex & !DBIT) | step.bit());
        if self.has_texcoords {
            self.stream.push(e.texcoord);
        }
        if self.has_normals {
            self.stream.push(e.normal);
        }
    }

    /// Append a chain: the first triangle, then one triangle per step.
    /// Chains are limited to 65535 triangles; extra steps are dropped.
    pub fn chain(&mut self, start: [FaceElement; 3], steps: &[(StripStep, FaceElement)]) -> &mut Self {
        let max_steps = u16::MAX as usize - 1;
        if steps.len() > max_steps {
            log::warn!("face chain of {} triangles truncated", steps.len() + 1);
        }
        let steps = &steps[..steps.len().min(max_steps)];
        self.stream.push((steps.len() + 1) as u16);
        for e in start {
            self.push_element(StripStep::KeepFirst, e);
        }
        for &(step, e) in steps {
            self.push_element(step, e);
        }
        self
    }

    pub fn triangle(&mut self, tri: [FaceElement; 3]) -> &mut Self {
        self.chain(tri, &[])
    }

    /// Quad `[a, b, c, d]` as triangles `[a, b, c]` and `[a, c, d]`.
    pub fn quad(&mut self, quad: [FaceElement; 4]) -> &mut Self {
        self.chain([quad[0], quad[1], quad[2]], &[(StripStep::KeepFirst, quad[3])])
    }

    /// The finished stream, terminated by 0.
    pub fn build(&self) -> Result<Vec<u16>, DrawError> {
        if let Some(index) = self.oversized {
            return Err(DrawError::IndexOutOfRange { index: index as usize, len: MAX_VERTEX_INDEX + 1 });
        }
        let mut faces = self.stream.clone();
        faces.push(0);
        Ok(faces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(v: u16) -> FaceElement {
        FaceElement::uniform(v)
    }

    #[test]
    fn test_step_rules() {
        let tri = [1, 2, 3];
        assert_eq!(StripStep::KeepFirst.apply(tri, 4), [1, 3, 4]);
        assert_eq!(StripStep::KeepSecond.apply(tri, 4), [3, 2, 4]);
    }

    #[test]
    fn test_strip_decodes_to_triangles() {
        let mut builder = FaceChainBuilder::new(false, false);
        builder.chain(
            [e(0), e(1), e(2)],
            &[(StripStep::KeepSecond, e(3)), (StripStep::KeepFirst, e(4))],
        );
        let faces = builder.build().unwrap();
        assert_eq!(faces, vec![3, 0, 1, 2, 3 | DBIT, 4, 0]);

        let tris: Vec<_> = Triangles::new(ChainReader::new(&faces, false, false))
            .map(|t| [t[0].vertex, t[1].vertex, t[2].vertex])
            .collect();
        assert_eq!(tris, vec![[0, 1, 2], [2, 1, 3], [2, 3, 4]]);
    }

    #[test]
    fn test_attribute_indices_follow_vertex() {
        let mut builder = FaceChainBuilder::new(true, true);
        builder.quad([
            FaceElement::new(0, 10, 20),
            FaceElement::new(1, 11, 21),
            FaceElement::new(2, 12, 22),
            FaceElement::new(3, 13, 23),
        ]);
        let faces = builder.build().unwrap();
        let tris: Vec<_> = Triangles::new(ChainReader::new(&faces, true, true)).collect();
        assert_eq!(tris.len(), 2);
        assert_eq!(tris[1][2], FaceElement::new(3, 13, 23));
        assert_eq!(tris[1][0], FaceElement::new(0, 10, 20));
    }

    #[test]
    fn test_reader_stops_on_truncation() {
        // claims 2 triangles but holds only one
        let faces = [2u16, 0, 1, 2];
        assert_eq!(Triangles::new(ChainReader::new(&faces, false, false)).count(), 1);
    }

    #[test]
    fn test_vertex_index_past_direction_bit_is_rejected() {
        let mut builder = FaceChainBuilder::new(false, false);
        builder.triangle([e(0), e(1), e(40000)]);
        assert_eq!(
            builder.build(),
            Err(DrawError::IndexOutOfRange { index: 40000, len: MAX_VERTEX_INDEX + 1 })
        );

        let mut builder = FaceChainBuilder::new(false, false);
        builder.triangle([e(0), e(1), e(MAX_VERTEX_INDEX as u16)]);
        let faces = builder.build().unwrap();
        let tri = Triangles::new(ChainReader::new(&faces, false, false)).next().unwrap();
        assert_eq!(tri[2].vertex as usize, MAX_VERTEX_INDEX);
    }

    #[test]
    fn test_multiple_chains() {
        let mut builder = FaceChainBuilder::new(false, false);
        builder.triangle([e(0), e(1), e(2)]).quad([e(3), e(4), e(5), e(6)]);
        let faces = builder.build().unwrap();
        assert_eq!(Triangles::new(ChainReader::new(&faces, false, false)).count(), 3);
    }
}
