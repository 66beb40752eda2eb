//! Kind-specific payload encodings.

use crate::block::{
    BlockKind, CollisionShape, Controller, Extra, Geometry, Node, Opaque, Payload, Property, Shape,
    SkinInstance,
};
use crate::buffers::{BoneWeight, Influence, Partition, Primitives, SkinPartitionData, Triangle};
use crate::error::ParseError;
use crate::wire::{ByteReader, ByteWriter};

const PRIM_TRIANGLES: u8 = 0;
const PRIM_STRIPS: u8 = 1;

const SHAPE_SPHERE: u8 = 0;
const SHAPE_BOX: u8 = 1;
const SHAPE_CAPSULE: u8 = 2;
const SHAPE_CONVEX: u8 = 3;
const SHAPE_TRIMESH: u8 = 4;

pub(crate) trait Encode {
    fn encode(&self, w: &mut ByteWriter);
}

pub(crate) trait Decode: Sized {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self, ParseError>;
}

/// Decodes a payload of a known kind, requiring the whole slice to be consumed.
pub(crate) fn decode_payload(kind: BlockKind, bytes: &[u8]) -> Result<Payload, ParseError> {
    let mut r = ByteReader::new(bytes);
    let payload = match kind {
        BlockKind::Node => Payload::Node(Node::decode(&mut r)?),
        BlockKind::Geometry => Payload::Geometry(Geometry::decode(&mut r)?),
        BlockKind::SkinInstance => Payload::SkinInstance(SkinInstance::decode(&mut r)?),
        BlockKind::SkinPartition => Payload::SkinPartition(SkinPartitionData::decode(&mut r)?),
        BlockKind::CollisionShape => Payload::CollisionShape(CollisionShape::decode(&mut r)?),
        BlockKind::Property => Payload::Property(Property::decode(&mut r)?),
        BlockKind::Controller => Payload::Controller(Controller::decode(&mut r)?),
        BlockKind::Extra => Payload::Extra(Extra::decode(&mut r)?),
        BlockKind::Opaque => Payload::Opaque(Opaque {
            tag: 0,
            bytes: r.rest().to_vec(),
        }),
    };
    if r.remaining() > 0 {
        return Err(ParseError::PayloadTrailing(r.remaining()));
    }
    Ok(payload)
}

/// Encodes a payload body. Opaque payloads encode their raw bytes.
pub(crate) fn encode_payload(payload: &Payload) -> Vec<u8> {
    let mut w = ByteWriter::new();
    match payload {
        Payload::Node(p) => p.encode(&mut w),
        Payload::Geometry(p) => p.encode(&mut w),
        Payload::SkinInstance(p) => p.encode(&mut w),
        Payload::SkinPartition(p) => p.encode(&mut w),
        Payload::CollisionShape(p) => p.encode(&mut w),
        Payload::Property(p) => p.encode(&mut w),
        Payload::Controller(p) => p.encode(&mut w),
        Payload::Extra(p) => p.encode(&mut w),
        Payload::Opaque(p) => w.raw(&p.bytes),
    }
    w.into_inner()
}

fn read_list<T>(
    r: &mut ByteReader<'_>,
    what: &'static str,
    min_size: usize,
    mut item: impl FnMut(&mut ByteReader<'_>) -> Result<T, ParseError>,
) -> Result<Vec<T>, ParseError> {
    let n = r.count(what, min_size)?;
    let mut out = Vec::with_capacity(n.min(r.remaining()));
    for _ in 0..n {
        out.push(item(r)?);
    }
    Ok(out)
}

fn read_fixed<T>(
    r: &mut ByteReader<'_>,
    n: usize,
    mut item: impl FnMut(&mut ByteReader<'_>) -> Result<T, ParseError>,
) -> Result<Vec<T>, ParseError> {
    (0..n).map(|_| item(r)).collect()
}

fn read_triangle(r: &mut ByteReader<'_>) -> Result<Triangle, ParseError> {
    Ok([r.u32()?, r.u32()?, r.u32()?])
}

fn write_triangles(w: &mut ByteWriter, triangles: &[Triangle]) {
    w.count(triangles.len());
    for t in triangles {
        t.iter().for_each(|&i| w.u32(i));
    }
}

fn write_strips(w: &mut ByteWriter, strips: &[Vec<u32>]) {
    w.count(strips.len());
    for s in strips {
        w.count(s.len());
        s.iter().for_each(|&i| w.u32(i));
    }
}

fn read_strips(r: &mut ByteReader<'_>) -> Result<Vec<Vec<u32>>, ParseError> {
    read_list(r, "strip", 4, |r| read_list(r, "strip index", 4, |r| r.u32()))
}

fn check_indices<'a>(
    indices: impl Iterator<Item = &'a u32>,
    bound: usize,
    offset: usize,
) -> Result<(), ParseError> {
    for &i in indices {
        if i as usize >= bound {
            return Err(ParseError::InvalidValue {
                what: "vertex index",
                value: i64::from(i),
                offset,
            });
        }
    }
    Ok(())
}

impl Encode for Node {
    fn encode(&self, w: &mut ByteWriter) {
        w.string(&self.name);
        w.u32(self.flags);
        w.vec3(self.translation);
        w.f32(self.scale);
    }
}

impl Decode for Node {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self, ParseError> {
        Ok(Node {
            name: r.string()?,
            flags: r.u32()?,
            translation: r.vec3()?,
            scale: r.f32()?,
        })
    }
}

impl Encode for Geometry {
    fn encode(&self, w: &mut ByteWriter) {
        w.count(self.positions.len());
        self.positions.iter().for_each(|p| w.vec3(*p));
        w.bool(self.normals.is_some());
        if let Some(normals) = &self.normals {
            normals.iter().for_each(|n| w.vec3(*n));
        }
        w.count(self.uv_sets.len());
        for set in &self.uv_sets {
            for uv in set {
                w.f32(uv[0]);
                w.f32(uv[1]);
            }
        }
        w.bool(self.colors.is_some());
        if let Some(colors) = &self.colors {
            colors.iter().flatten().for_each(|&c| w.f32(c));
        }
        match &self.primitives {
            Primitives::Triangles(t) => {
                w.u8(PRIM_TRIANGLES);
                write_triangles(w, t);
            }
            Primitives::Strips(s) => {
                w.u8(PRIM_STRIPS);
                write_strips(w, s);
            }
        }
        w.bool(self.weights.is_some());
        if let Some(weights) = &self.weights {
            for list in weights {
                w.u8(list.len() as u8);
                for bw in list {
                    w.u16(bw.bone);
                    w.f32(bw.weight);
                }
            }
        }
    }
}

impl Decode for Geometry {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self, ParseError> {
        let n = r.count("vertex", 12)?;
        let positions = read_fixed(r, n, |r| r.vec3())?;
        let normals = if r.bool()? {
            Some(read_fixed(r, n, |r| r.vec3())?)
        } else {
            None
        };
        let uv_sets = read_list(r, "uv set", n * 8, |r| {
            read_fixed(r, n, |r| Ok([r.f32()?, r.f32()?]))
        })?;
        let colors = if r.bool()? {
            Some(read_fixed(r, n, |r| Ok([r.f32()?, r.f32()?, r.f32()?, r.f32()?]))?)
        } else {
            None
        };
        let prim_offset = r.offset();
        let primitives = match r.u8()? {
            PRIM_TRIANGLES => Primitives::Triangles(read_list(r, "triangle", 12, read_triangle)?),
            PRIM_STRIPS => Primitives::Strips(read_strips(r)?),
            other => {
                return Err(ParseError::InvalidValue {
                    what: "primitive kind",
                    value: i64::from(other),
                    offset: prim_offset,
                })
            }
        };
        match &primitives {
            Primitives::Triangles(t) => check_indices(t.iter().flatten(), n, prim_offset)?,
            Primitives::Strips(s) => check_indices(s.iter().flatten(), n, prim_offset)?,
        }
        let weights = if r.bool()? {
            Some(read_fixed(r, n, |r| {
                let count = r.u8()? as usize;
                read_fixed(r, count, |r| Ok(BoneWeight::new(r.u16()?, r.f32()?)))
            })?)
        } else {
            None
        };
        Ok(Geometry {
            positions,
            normals,
            uv_sets,
            colors,
            primitives,
            weights,
        })
    }
}

impl Encode for SkinInstance {
    fn encode(&self, w: &mut ByteWriter) {
        w.u16(self.root_bone);
    }
}

impl Decode for SkinInstance {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self, ParseError> {
        Ok(SkinInstance {
            root_bone: r.u16()?,
        })
    }
}

impl Encode for Partition {
    fn encode(&self, w: &mut ByteWriter) {
        w.count(self.bones.len());
        self.bones.iter().for_each(|&b| w.u16(b));
        w.count(self.vertex_map.len());
        self.vertex_map.iter().for_each(|&v| w.u32(v));
        for list in &self.influences {
            w.u8(list.len() as u8);
            for inf in list {
                w.u16(inf.bone);
                w.f32(inf.weight);
            }
        }
        write_triangles(w, &self.triangles);
        write_strips(w, &self.strips);
    }
}

impl Decode for Partition {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self, ParseError> {
        let bones = read_list(r, "partition bone", 2, |r| r.u16())?;
        let vertex_map = read_list(r, "partition vertex", 4, |r| r.u32())?;
        let influences = read_fixed(r, vertex_map.len(), |r| {
            let count = r.u8()? as usize;
            read_fixed(r, count, |r| {
                Ok(Influence {
                    bone: r.u16()?,
                    weight: r.f32()?,
                })
            })
        })?;
        let offset = r.offset();
        let triangles = read_list(r, "partition triangle", 12, read_triangle)?;
        let strips = read_strips(r)?;
        check_indices(triangles.iter().flatten(), vertex_map.len(), offset)?;
        check_indices(strips.iter().flatten(), vertex_map.len(), offset)?;
        Ok(Partition {
            bones,
            vertex_map,
            influences,
            triangles,
            strips,
        })
    }
}

impl Encode for SkinPartitionData {
    fn encode(&self, w: &mut ByteWriter) {
        w.count(self.partitions.len());
        self.partitions.iter().for_each(|p| p.encode(w));
    }
}

impl Decode for SkinPartitionData {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self, ParseError> {
        Ok(SkinPartitionData {
            partitions: read_list(r, "partition", 20, Partition::decode)?,
        })
    }
}

impl Encode for Shape {
    fn encode(&self, w: &mut ByteWriter) {
        match self {
            Shape::Sphere { radius } => {
                w.u8(SHAPE_SPHERE);
                w.f32(*radius);
            }
            Shape::Box { size } => {
                w.u8(SHAPE_BOX);
                w.vec3(*size);
            }
            Shape::Capsule { length, radius } => {
                w.u8(SHAPE_CAPSULE);
                w.f32(*length);
                w.f32(*radius);
            }
            Shape::Convex { vertices, planes } => {
                w.u8(SHAPE_CONVEX);
                w.count(vertices.len());
                vertices.iter().for_each(|v| w.vec3(*v));
                w.count(planes.len());
                planes.iter().flatten().for_each(|&c| w.f32(c));
            }
            Shape::TriMesh {
                vertices,
                triangles,
            } => {
                w.u8(SHAPE_TRIMESH);
                w.count(vertices.len());
                vertices.iter().for_each(|v| w.vec3(*v));
                write_triangles(w, triangles);
            }
        }
    }
}

impl Decode for Shape {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self, ParseError> {
        let offset = r.offset();
        match r.u8()? {
            SHAPE_SPHERE => Ok(Shape::Sphere { radius: r.f32()? }),
            SHAPE_BOX => Ok(Shape::Box { size: r.vec3()? }),
            SHAPE_CAPSULE => Ok(Shape::Capsule {
                length: r.f32()?,
                radius: r.f32()?,
            }),
            SHAPE_CONVEX => Ok(Shape::Convex {
                vertices: read_list(r, "hull vertex", 12, |r| r.vec3())?,
                planes: read_list(r, "hull plane", 16, |r| {
                    Ok([r.f32()?, r.f32()?, r.f32()?, r.f32()?])
                })?,
            }),
            SHAPE_TRIMESH => {
                let vertices = read_list(r, "mesh vertex", 12, |r| r.vec3())?;
                let tri_offset = r.offset();
                let triangles = read_list(r, "mesh triangle", 12, read_triangle)?;
                check_indices(triangles.iter().flatten(), vertices.len(), tri_offset)?;
                Ok(Shape::TriMesh {
                    vertices,
                    triangles,
                })
            }
            other => Err(ParseError::InvalidValue {
                what: "shape kind",
                value: i64::from(other),
                offset,
            }),
        }
    }
}

impl Encode for CollisionShape {
    fn encode(&self, w: &mut ByteWriter) {
        w.u32(self.material);
        w.f32(self.density);
        w.bool(self.solid);
        self.shape.encode(w);
        w.f32(self.mass);
        w.vec3(self.center);
        self.inertia.iter().for_each(|row| w.vec3(*row));
    }
}

impl Decode for CollisionShape {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self, ParseError> {
        Ok(CollisionShape {
            material: r.u32()?,
            density: r.f32()?,
            solid: r.bool()?,
            shape: Shape::decode(r)?,
            mass: r.f32()?,
            center: r.vec3()?,
            inertia: [r.vec3()?, r.vec3()?, r.vec3()?],
        })
    }
}

impl Encode for Property {
    fn encode(&self, w: &mut ByteWriter) {
        w.string(&self.name);
        w.bytes(&self.value);
    }
}

impl Decode for Property {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self, ParseError> {
        Ok(Property {
            name: r.string()?,
            value: r.bytes()?,
        })
    }
}

impl Encode for Controller {
    fn encode(&self, w: &mut ByteWriter) {
        w.string(&self.name);
        w.f32(self.frequency);
        w.f32(self.phase);
        w.f32(self.start_time);
        w.f32(self.stop_time);
    }
}

impl Decode for Controller {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self, ParseError> {
        Ok(Controller {
            name: r.string()?,
            frequency: r.f32()?,
            phase: r.f32()?,
            start_time: r.f32()?,
            stop_time: r.f32()?,
        })
    }
}

impl Encode for Extra {
    fn encode(&self, w: &mut ByteWriter) {
        w.string(&self.name);
        w.bytes(&self.data);
    }
}

impl Decode for Extra {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self, ParseError> {
        Ok(Extra {
            name: r.string()?,
            data: r.bytes()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(payload: Payload) {
        let bytes = encode_payload(&payload);
        let back = decode_payload(payload.kind(), &bytes).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn geometry_with_everything() {
        roundtrip(Payload::Geometry(Geometry {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: Some(vec![[0.0, 0.0, 1.0]; 3]),
            uv_sets: vec![vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]],
            colors: Some(vec![[1.0, 1.0, 1.0, 1.0]; 3]),
            primitives: Primitives::Strips(vec![vec![0, 1, 2]]),
            weights: Some(vec![
                vec![BoneWeight::new(0, 0.5), BoneWeight::new(1, 0.5)],
                vec![],
                vec![BoneWeight::new(2, 1.0)],
            ]),
        }));
    }

    #[test]
    fn collision_shapes() {
        roundtrip(Payload::CollisionShape(CollisionShape {
            material: 3,
            density: 2.5,
            solid: true,
            shape: Shape::Convex {
                vertices: vec![[1.0, 2.0, 3.0]],
                planes: vec![[0.0, 0.0, 1.0, 0.5]],
            },
            mass: 1.0,
            center: [0.0; 3],
            inertia: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }));
    }

    #[test]
    fn skin_partition() {
        roundtrip(Payload::SkinPartition(SkinPartitionData {
            partitions: vec![Partition {
                bones: vec![0, 4],
                vertex_map: vec![10, 11, 12],
                influences: vec![
                    vec![Influence { bone: 0, weight: 1.0 }],
                    vec![Influence { bone: 1, weight: 1.0 }],
                    vec![],
                ],
                triangles: vec![[0, 1, 2]],
                strips: vec![],
            }],
        }));
    }

    #[test]
    fn index_out_of_range_rejected() {
        let g = Geometry {
            positions: vec![[0.0; 3]; 2],
            primitives: Primitives::Triangles(vec![[0, 1, 2]]),
            ..Geometry::default()
        };
        let bytes = encode_payload(&Payload::Geometry(g));
        let err = decode_payload(BlockKind::Geometry, &bytes).unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { what: "vertex index", value: 2, .. }));
    }

    #[test]
    fn uv_set_count_without_vertices_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.push(0);
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        let err = decode_payload(BlockKind::Geometry, &bytes).unwrap_err();
        assert!(matches!(err, ParseError::CountTooLarge { what: "uv set", .. }), "{err:?}");
    }

    #[test]
    fn empty_geometry_with_uv_sets_roundtrips() {
        let g = Geometry {
            uv_sets: vec![Vec::new(); 3],
            ..Geometry::default()
        };
        let bytes = encode_payload(&Payload::Geometry(g.clone()));
        assert_eq!(decode_payload(BlockKind::Geometry, &bytes).unwrap(), Payload::Geometry(g));
    }

    #[test]
    fn trailing_payload_bytes_rejected() {
        let mut bytes = encode_payload(&Payload::SkinInstance(SkinInstance { root_bone: 1 }));
        bytes.push(0);
        assert_eq!(
            decode_payload(BlockKind::SkinInstance, &bytes).unwrap_err(),
            ParseError::PayloadTrailing(1)
        );
    }
}
