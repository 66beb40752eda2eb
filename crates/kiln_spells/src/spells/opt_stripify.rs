//! `opt_stripify`: converts triangle lists to triangle strips.

use kiln_geometry::{stripify, KernelWarning};
use kiln_graph::{BlockId, BlockKind, Geometry, Graph, Payload, Primitives};

use super::{check_indices, has_kind};
use crate::{Effect, Spell, SpellContext, SpellError};

/// Replaces each triangle list with strips, stitched into one when the
/// `stitch_strips` option is set. Degenerate triangles are dropped and
/// reported.
pub struct OptStripify;

impl Spell for OptStripify {
    fn name(&self) -> &str {
        "opt_stripify"
    }

    fn description(&self) -> &str {
        "convert triangle lists to strips"
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

        let out = stripify(triangles, ctx.options().stitch_strips);
        for &index in &out.degenerate {
            let warning = KernelWarning::DegenerateTriangle {
                index,
                triangle: triangles[index],
            };
            ctx.kernel_warning(graph, block, &warning);
        }
        if out.stitches > 0 {
            ctx.kernel_warning(graph, block, &KernelWarning::Stitches { count: out.stitches });
        }
        log::debug!(
            "{}: {} triangles into {} strip(s)",
            graph.path(block),
            triangles.len(),
            out.strips.len()
        );
        Ok(Effect::Mutate(Payload::Geometry(Geometry {
            primitives: Primitives::Strips(out.strips),
            ..geometry.clone()
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spells::testing;
    use kiln_geometry::triangulate;

    fn quad_with_degenerate() -> Geometry {
        Geometry {
            positions: vec![[0.0; 3]; 4],
            primitives: Primitives::Triangles(vec![[0, 1, 2], [2, 2, 3], [2, 1, 3]]),
            ..Geometry::default()
        }
    }

    #[test]
    fn strips_cover_the_same_faces() {
        let mut g = Graph::new();
        let id = g.add_block(Payload::Geometry(quad_with_degenerate()), Vec::new()).unwrap();
        g.add_root(id).unwrap();
        let (summary, diags) = testing::run(&OptStripify, &mut g);
        assert_eq!(summary.mutated, 1);

        let Some(Payload::Geometry(geometry)) = g.payload(id) else {
            panic!("geometry expected");
        };
        let Primitives::Strips(strips) = &geometry.primitives else {
            panic!("strips expected");
        };
        let mut faces = triangulate(strips);
        for t in &mut faces {
            let k = (0..3).min_by_key(|&i| t[i]).unwrap();
            t.rotate_left(k);
        }
        faces.sort_unstable();
        assert_eq!(faces, vec![[0, 1, 2], [1, 3, 2]]);

        let degenerate: Vec<_> = diags.iter().filter(|d| d.code.number == 201).collect();
        assert_eq!(degenerate.len(), 1);
        assert!(degenerate[0].message.contains("(2, 2, 3)"));
    }

    #[test]
    fn out_of_range_index_is_a_spell_error() {
        let mut g = Graph::new();
        let geometry = Geometry {
            positions: vec![[0.0; 3]; 2],
            primitives: Primitives::Triangles(vec![[0, 1, 2]]),
            ..Geometry::default()
        };
        let id = g.add_block(Payload::Geometry(geometry), Vec::new()).unwrap();
        g.add_root(id).unwrap();
        let (summary, diags) = testing::run(&OptStripify, &mut g);
        assert_eq!(summary.failed, 1);
        assert_eq!(diags[0].code, crate::codes::SPELL_FAILED);
    }
}
