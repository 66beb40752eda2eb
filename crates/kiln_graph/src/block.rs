//! Block kinds, edges, and typed payloads.

use crate::buffers::{BoneWeight, Primitives, SkinPartitionData, Triangle};
use crate::ids::BlockId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of a block, as stored in the record's tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum BlockKind {
    /// A scene node: transform plus owned children.
    Node,
    /// Vertex and primitive buffers.
    Geometry,
    /// Binding of a geometry to a bone list.
    SkinInstance,
    /// Derived grouping of skinned triangles.
    SkinPartition,
    /// A collision volume with cached mass properties.
    CollisionShape,
    /// A named raw property value.
    Property,
    /// An animation controller.
    Controller,
    /// Named extra data.
    Extra,
    /// A block of unknown kind, carried verbatim.
    Opaque,
}

impl BlockKind {
    /// The eight kinds whose payloads are decoded.
    pub const KNOWN: [BlockKind; 8] = [
        BlockKind::Node,
        BlockKind::Geometry,
        BlockKind::SkinInstance,
        BlockKind::SkinPartition,
        BlockKind::CollisionShape,
        BlockKind::Property,
        BlockKind::Controller,
        BlockKind::Extra,
    ];

    /// Returns the record tag of a known kind.
    pub fn tag(self) -> Option<u16> {
        match self {
            BlockKind::Node => Some(1),
            BlockKind::Geometry => Some(2),
            BlockKind::SkinInstance => Some(3),
            BlockKind::SkinPartition => Some(4),
            BlockKind::CollisionShape => Some(5),
            BlockKind::Property => Some(6),
            BlockKind::Controller => Some(7),
            BlockKind::Extra => Some(8),
            BlockKind::Opaque => None,
        }
    }

    /// Maps a record tag to a kind; unknown tags are [`BlockKind::Opaque`].
    pub fn from_tag(tag: u16) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|kind| kind.tag() == Some(tag))
            .unwrap_or(BlockKind::Opaque)
    }

    /// Returns the display name of this kind.
    pub fn name(self) -> &'static str {
        match self {
            BlockKind::Node => "Node",
            BlockKind::Geometry => "Geometry",
            BlockKind::SkinInstance => "SkinInstance",
            BlockKind::SkinPartition => "SkinPartition",
            BlockKind::CollisionShape => "CollisionShape",
            BlockKind::Property => "Property",
            BlockKind::Controller => "Controller",
            BlockKind::Extra => "Extra",
            BlockKind::Opaque => "Opaque",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlockKind {
    type Err = String;

    /// Parses a kind name case-insensitively, accepting `skin_instance` style too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        Self::KNOWN
            .into_iter()
            .chain(std::iter::once(BlockKind::Opaque))
            .find(|kind| kind.name().to_ascii_lowercase() == wanted)
            .ok_or_else(|| format!("unknown block kind '{s}'"))
    }
}

/// Whether an edge bounds the target's lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum EdgeKind {
    /// The source owns the target; deleting the source may cascade.
    Owning,
    /// The source points at a block owned elsewhere.
    Referencing,
}

/// An outgoing edge. A `None` target is a null reference.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Link {
    /// Edge kind.
    pub kind: EdgeKind,
    /// Target block, or `None` for a null reference.
    pub target: Option<BlockId>,
}

impl Link {
    /// Creates an owning link.
    pub fn owning(target: BlockId) -> Self {
        Self {
            kind: EdgeKind::Owning,
            target: Some(target),
        }
    }

    /// Creates a referencing link.
    pub fn referencing(target: BlockId) -> Self {
        Self {
            kind: EdgeKind::Referencing,
            target: Some(target),
        }
    }
}

/// A scene node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Node {
    /// Node name.
    pub name: String,
    /// Application-defined flags.
    pub flags: u32,
    /// Local translation.
    pub translation: [f32; 3],
    /// Uniform local scale.
    pub scale: f32,
}

/// Vertex and primitive buffers of a mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    /// Vertex positions.
    pub positions: Vec<[f32; 3]>,
    /// Per-vertex normals.
    pub normals: Option<Vec<[f32; 3]>>,
    /// Texture coordinate sets, each with one entry per vertex.
    pub uv_sets: Vec<Vec<[f32; 2]>>,
    /// Per-vertex RGBA colors.
    pub colors: Option<Vec<[f32; 4]>>,
    /// The faces.
    pub primitives: Primitives,
    /// Per-vertex bone influences, for skinned meshes.
    pub weights: Option<Vec<Vec<BoneWeight>>>,
}

impl Geometry {
    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Rebuilds every per-vertex buffer so new vertex `i` is old vertex
    /// `inverse[i]`.
    pub fn remap_vertices(&mut self, inverse: &[u32]) {
        fn pick<T: Copy>(old: &[T], inverse: &[u32]) -> Vec<T> {
            inverse.iter().map(|&i| old[i as usize]).collect()
        }
        self.positions = pick(&self.positions, inverse);
        if let Some(normals) = &self.normals {
            self.normals = Some(pick(normals, inverse));
        }
        for set in &mut self.uv_sets {
            *set = pick(set, inverse);
        }
        if let Some(colors) = &self.colors {
            self.colors = Some(pick(colors, inverse));
        }
        if let Some(weights) = &self.weights {
            self.weights = Some(inverse.iter().map(|&i| weights[i as usize].clone()).collect());
        }
    }
}

/// Binding of a geometry to its bones. The bones are the block's referencing
/// links, in order; weights index into that list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkinInstance {
    /// Bone-list index of the skeleton root, used for weightless vertices.
    pub root_bone: u16,
}

/// Geometry of a collision volume.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// A sphere centered on the origin.
    Sphere {
        /// Radius.
        radius: f32,
    },
    /// An axis-aligned box centered on the origin.
    Box {
        /// Full edge lengths.
        size: [f32; 3],
    },
    /// A capsule along the z axis, centered on the origin.
    Capsule {
        /// Length of the cylindrical part.
        length: f32,
        /// Radius of the cylinder and caps.
        radius: f32,
    },
    /// A convex polytope.
    Convex {
        /// Support vertices.
        vertices: Vec<[f32; 3]>,
        /// Outward face planes as `(nx, ny, nz, d)` with `n·p = d` on the face.
        planes: Vec<[f32; 4]>,
    },
    /// An arbitrary closed triangle mesh.
    TriMesh {
        /// Vertex positions.
        vertices: Vec<[f32; 3]>,
        /// Triangles.
        triangles: Vec<Triangle>,
    },
}

/// A collision volume and its cached mass properties.
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionShape {
    /// Physics material id.
    pub material: u32,
    /// Mass per unit volume (solid) or per unit area (hollow).
    pub density: f32,
    /// Solid or hollow.
    pub solid: bool,
    /// The volume.
    pub shape: Shape,
    /// Cached mass.
    pub mass: f32,
    /// Cached center of mass.
    pub center: [f32; 3],
    /// Cached inertia tensor, row-major.
    pub inertia: [[f32; 3]; 3],
}

/// A named raw property.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Property {
    /// Property name.
    pub name: String,
    /// Raw value bytes.
    pub value: Vec<u8>,
}

/// An animation controller.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Controller {
    /// Controller name.
    pub name: String,
    /// Playback frequency.
    pub frequency: f32,
    /// Phase offset.
    pub phase: f32,
    /// Start time in seconds.
    pub start_time: f32,
    /// Stop time in seconds.
    pub stop_time: f32,
}

/// Named extra data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extra {
    /// Name.
    pub name: String,
    /// Raw data.
    pub data: Vec<u8>,
}

/// A block of unknown kind.
#[derive(Clone, Debug, PartialEq)]
pub struct Opaque {
    /// The record tag.
    pub tag: u16,
    /// The record body, verbatim.
    pub bytes: Vec<u8>,
}

/// The typed contents of a block.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// See [`Node`].
    Node(Node),
    /// See [`Geometry`].
    Geometry(Geometry),
    /// See [`SkinInstance`].
    SkinInstance(SkinInstance),
    /// See [`SkinPartitionData`].
    SkinPartition(SkinPartitionData),
    /// See [`CollisionShape`].
    CollisionShape(CollisionShape),
    /// See [`Property`].
    Property(Property),
    /// See [`Controller`].
    Controller(Controller),
    /// See [`Extra`].
    Extra(Extra),
    /// See [`Opaque`].
    Opaque(Opaque),
}

impl Payload {
    /// Returns the kind of this payload.
    pub fn kind(&self) -> BlockKind {
        match self {
            Payload::Node(_) => BlockKind::Node,
            Payload::Geometry(_) => BlockKind::Geometry,
            Payload::SkinInstance(_) => BlockKind::SkinInstance,
            Payload::SkinPartition(_) => BlockKind::SkinPartition,
            Payload::CollisionShape(_) => BlockKind::CollisionShape,
            Payload::Property(_) => BlockKind::Property,
            Payload::Controller(_) => BlockKind::Controller,
            Payload::Extra(_) => BlockKind::Extra,
            Payload::Opaque(_) => BlockKind::Opaque,
        }
    }

    /// Returns the name carried by named payloads.
    pub fn name(&self) -> Option<&str> {
        match self {
            Payload::Node(n) => Some(&n.name),
            Payload::Property(p) => Some(&p.name),
            Payload::Controller(c) => Some(&c.name),
            Payload::Extra(e) => Some(&e.name),
            _ => None,
        }
    }
}

/// A block: payload, outgoing links, and bookkeeping for verbatim re-emission.
#[derive(Clone, Debug)]
pub struct Block {
    pub(crate) payload: Payload,
    pub(crate) links: Vec<Link>,
    /// Original payload bytes; cleared when the payload changes.
    pub(crate) raw: Option<Vec<u8>>,
    pub(crate) live: bool,
}

impl Block {
    pub(crate) fn new(payload: Payload, links: Vec<Link>, raw: Option<Vec<u8>>) -> Self {
        Self {
            payload,
            links,
            raw,
            live: true,
        }
    }

    /// Returns the payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns the outgoing links in file order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Returns the block kind.
    pub fn kind(&self) -> BlockKind {
        self.payload.kind()
    }

    /// Returns `true` once the payload differs from what was loaded.
    pub fn is_dirty(&self) -> bool {
        self.raw.is_none() && self.kind() != BlockKind::Opaque
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_roundtrip() {
        for kind in BlockKind::KNOWN {
            let tag = kind.tag().unwrap();
            assert_eq!(BlockKind::from_tag(tag), kind);
        }
        assert_eq!(BlockKind::from_tag(0), BlockKind::Opaque);
        assert_eq!(BlockKind::from_tag(999), BlockKind::Opaque);
        assert_eq!(BlockKind::Opaque.tag(), None);
    }

    #[test]
    fn parse_kind_names() {
        assert_eq!("geometry".parse::<BlockKind>(), Ok(BlockKind::Geometry));
        assert_eq!("skin_instance".parse::<BlockKind>(), Ok(BlockKind::SkinInstance));
        assert_eq!("CollisionShape".parse::<BlockKind>(), Ok(BlockKind::CollisionShape));
        assert!("mesh".parse::<BlockKind>().is_err());
    }

    #[test]
    fn remap_vertices_moves_every_buffer() {
        let mut g = Geometry {
            positions: vec![[0.0; 3], [1.0; 3], [2.0; 3]],
            normals: Some(vec![[0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]]),
            uv_sets: vec![vec![[0.0, 0.0], [0.5, 0.5], [1.0, 1.0]]],
            colors: None,
            primitives: Primitives::Triangles(vec![[0, 1, 2]]),
            weights: Some(vec![
                vec![BoneWeight::new(0, 1.0)],
                vec![BoneWeight::new(1, 1.0)],
                vec![BoneWeight::new(2, 1.0)],
            ]),
        };
        g.remap_vertices(&[2, 0]);
        assert_eq!(g.positions, vec![[2.0; 3], [0.0; 3]]);
        assert_eq!(g.normals.as_ref().unwrap()[0], [1.0, 0.0, 0.0]);
        assert_eq!(g.uv_sets[0], vec![[1.0, 1.0], [0.0, 0.0]]);
        assert_eq!(g.weights.as_ref().unwrap()[1][0].bone, 0);
    }

    #[test]
    fn payload_names() {
        let node = Payload::Node(Node {
            name: "Scene".into(),
            ..Node::default()
        });
        assert_eq!(node.name(), Some("Scene"));
        assert_eq!(node.kind(), BlockKind::Node);
        let inst = Payload::SkinInstance(SkinInstance::default());
        assert_eq!(inst.name(), None);
    }
}
