//! Vertex and index buffer types shared by block payloads and geometry kernels.

use serde::{Deserialize, Serialize};

/// Three vertex indices, wound counter-clockwise when seen from the front.
pub type Triangle = [u32; 3];

/// A triangle strip: triangle `i` is `(s[i], s[i+1], s[i+2])` with the winding
/// of every odd triangle flipped.
pub type Strip = Vec<u32>;

/// How a geometry block stores its faces.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Primitives {
    /// An explicit triangle list.
    Triangles(Vec<Triangle>),
    /// One or more triangle strips.
    Strips(Vec<Strip>),
}

impl Primitives {
    /// Returns `true` if there are no triangles or no strips.
    pub fn is_empty(&self) -> bool {
        match self {
            Primitives::Triangles(t) => t.is_empty(),
            Primitives::Strips(s) => s.iter().all(|s| s.len() < 3),
        }
    }

    /// Largest vertex index used, if any.
    pub fn max_index(&self) -> Option<u32> {
        match self {
            Primitives::Triangles(t) => t.iter().flatten().copied().max(),
            Primitives::Strips(s) => s.iter().flatten().copied().max(),
        }
    }
}

impl Default for Primitives {
    fn default() -> Self {
        Primitives::Triangles(Vec::new())
    }
}

/// One bone influence on a vertex. `bone` indexes the skin instance's bone list.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoneWeight {
    /// Index into the skin instance's bone list.
    pub bone: u16,
    /// Influence weight; lists are not required to be normalized.
    pub weight: f32,
}

impl BoneWeight {
    /// Creates a bone weight.
    pub fn new(bone: u16, weight: f32) -> Self {
        Self { bone, weight }
    }
}

/// One bone influence inside a partition. `bone` indexes the partition's own
/// bone list, not the skin instance's.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Influence {
    /// Index into [`Partition::bones`].
    pub bone: u16,
    /// Normalized weight.
    pub weight: f32,
}

/// A bounded group of triangles and the bones that deform them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    /// Skin-instance bone indices used by this partition, ascending.
    pub bones: Vec<u16>,
    /// Geometry vertex index of each local vertex.
    pub vertex_map: Vec<u32>,
    /// Influences of each local vertex.
    pub influences: Vec<Vec<Influence>>,
    /// Triangles in local vertex indices.
    pub triangles: Vec<Triangle>,
    /// Strips in local vertex indices, when the partition was stripified.
    pub strips: Vec<Strip>,
}

/// Payload of a skin partition block.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SkinPartitionData {
    /// The partitions, in creation order.
    pub partitions: Vec<Partition>,
}
