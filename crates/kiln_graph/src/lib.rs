//! The block graph: an in-memory representation of one asset file.
//!
//! A file is a flat list of typed blocks. Blocks link to each other through
//! *owning* edges (the owner bounds the child's lifetime) and *referencing*
//! edges (a pointer to a block owned elsewhere). Blocks live in an [`Arena`]
//! addressed by stable [`BlockId`]s; the parent lookup is a lazily rebuilt
//! reverse index rather than a stored back pointer.
//!
//! [`load`] decodes the container format and [`serialize`] writes it back.
//! Blocks the engine never touched are re-emitted from their original bytes.

#![warn(missing_docs)]

pub mod arena;
pub mod block;
pub mod buffers;
pub mod codec;
pub mod codes;
pub mod error;
pub mod graph;
pub mod ids;
mod payload;
mod wire;

pub use arena::Arena;
pub use block::{
    Block, BlockKind, CollisionShape, Controller, EdgeKind, Extra, Geometry, Link, Node, Opaque,
    Payload, Property, Shape, SkinInstance,
};
pub use buffers::{BoneWeight, Influence, Partition, Primitives, SkinPartitionData, Strip, Triangle};
pub use codec::{load, serialize, LoadedGraph, FORMAT_VERSION, MAGIC};
pub use error::{GraphError, ParseError, StructuralError};
pub use graph::{EdgeFilter, Graph};
pub use ids::BlockId;
