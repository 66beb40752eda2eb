//! `opt_vertex_cache`: reorders triangles and vertices for the post-transform
//! cache.

use kiln_geometry::{
    average_transform_to_vertex_ratio, cache_optimized_vertex_map, optimize_triangles,
    KernelWarning,
};
use kiln_graph::{BlockId, BlockKind, EdgeFilter, Geometry, Graph, Payload, Primitives};

use super::{check_indices, has_kind};
use crate::{Effect, Spell, SpellContext, SpellError};

/// Reorders each triangle list with the vertex-cache optimizer and keeps the
/// result only if the ATVR does not get worse. Vertices are then renumbered
/// in order of first use, except on skinned geometry whose skin partitions
/// refer to the current numbering.
pub struct OptVertexCache;

fn is_skinned(graph: &Graph, block: BlockId) -> bool {
    graph
        .children(block, EdgeFilter::Owning)
        .into_iter()
        .any(|c| graph.kind(c) == Some(BlockKind::SkinInstance))
}

impl Spell for OptVertexCache {
    fn name(&self) -> &str {
        "opt_vertex_cache"
    }

    fn description(&self) -> &str {
        "reorder triangles and vertices for the vertex cache"
    }

    fn reads_only(&self) -> bool {
        false
    }

    fn file_entry(&self, graph: &Graph, _ctx: &SpellContext<'_>) -> bool {
        has_kind(graph, BlockKind::Geometry)
    }

    fn cast(
        &self,
        graph: &Graph,
        block: BlockId,
        ctx: &SpellContext<'_>,
    ) -> Result<Effect, SpellError> {
        let Some(Payload::Geometry(geometry)) = graph.payload(block) else {
            return Ok(Effect::NoChange);
        };
        let Primitives::Triangles(triangles) = &geometry.primitives else {
            return Ok(Effect::NoChange);
        };
        if triangles.is_empty() {
            return Ok(Effect::NoChange);
        }
        check_indices(geometry)?;

        let size = ctx.options().cache_size;
        let out = optimize_triangles(triangles, size);
        for &index in &out.degenerate {
            let warning = KernelWarning::DegenerateTriangle {
                index,
                triangle: triangles[index],
            };
            ctx.kernel_warning(graph, block, &warning);
        }

        let before = average_transform_to_vertex_ratio(triangles, size);
        let after = average_transform_to_vertex_ratio(&out.triangles, size);
        if after > before {
            log::debug!(
                "{}: keeping original order (ATVR {before:.3} < {after:.3})",
                graph.path(block)
            );
            return Ok(Effect::NoChange);
        }

        let mut optimized = Geometry {
            primitives: Primitives::Triangles(Vec::new()),
            ..geometry.clone()
        };
        let mut reordered = out.triangles;
        if !is_skinned(graph, block) {
            let map = cache_optimized_vertex_map(&reordered, geometry.vertex_count());
            if !map.is_identity() {
                for t in &mut reordered {
                    map.remap(t);
                }
                optimized.remap_vertices(&map.inverse);
            }
        }
        if &reordered == triangles && optimized.positions == geometry.positions {
            return Ok(Effect::NoChange);
        }
        log::debug!("{}: ATVR {before:.3} -> {after:.3}", graph.path(block));
        optimized.primitives = Primitives::Triangles(reordered);
        Ok(Effect::Mutate(Payload::Geometry(optimized)))
    }
}
