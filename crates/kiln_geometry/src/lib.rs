//! Geometry kernels: vertex-cache ordering, triangle stripification, skin
//! partitioning, convex hulls, and mass properties.
//!
//! Kernels are pure functions over borrowed buffers. They never touch the
//! block graph; problems with the input come back as [`KernelWarning`]s next
//! to a best-effort result.

#![warn(missing_docs)]

pub mod inertia;
pub mod quickhull;
pub mod skin_partition;
pub mod strip;
pub mod stripify;
pub mod vertex_cache;
pub mod warning;

pub use inertia::{mass_properties, MassProperties};
pub use quickhull::{convex_hull, Hull, HullResult, DEFAULT_PRECISION};
pub use skin_partition::{
    partition_skin, PartitionError, PartitionOptions, PartitionResult, ZeroWeightPolicy,
};
pub use strip::{stitch_strips, triangulate, unstitch, OrientedStrip};
pub use stripify::{stripify, StripifyResult};
pub use vertex_cache::{
    average_transform_to_vertex_ratio, cache_optimized_vertex_map, optimize_triangles,
    CacheOptimized, VertexMap, VertexScore, DEFAULT_CACHE_SIZE,
};
pub use warning::KernelWarning;

/// Returns `true` if two corners of the triangle share a vertex.
pub fn is_degenerate(t: &kiln_graph::Triangle) -> bool {
    t[0] == t[1] || t[1] == t[2] || t[2] == t[0]
}
