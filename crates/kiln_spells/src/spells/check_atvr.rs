//! `check_triangles_atvr`: reports the vertex-cache efficiency of each mesh.

use kiln_diagnostics::Diagnostic;
use kiln_geometry::average_transform_to_vertex_ratio;
use kiln_graph::{BlockId, BlockKind, Graph, Payload, Primitives};

use super::has_kind;
use crate::codes::ATVR_REPORT;
use crate::{Effect, Spell, SpellContext, SpellError};

/// Emits an `I301` note with the ATVR of every geometry block.
pub struct CheckTrianglesAtvr;

impl Spell for CheckTrianglesAtvr {
    fn name(&self) -> &str {
        "check_triangles_atvr"
    }

    fn description(&self) -> &str {
        "report the average transform to vertex ratio of each geometry"
    }

    fn reads_only(&self) -> bool {
        true
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
        let size = ctx.options().cache_size;
        let (atvr, what) = match &geometry.primitives {
            Primitives::Triangles(t) => (average_transform_to_vertex_ratio(t, size), "triangles"),
            Primitives::Strips(s) => (average_transform_to_vertex_ratio(s, size), "strips"),
        };
        ctx.emit(Diagnostic::note(
            ATVR_REPORT,
            format!("ATVR {atvr:.3} for {what} over {} vertices", geometry.vertex_count()),
            ctx.location(graph, block),
        ));
        Ok(Effect::NoChange)
    }
}
