//! `fix_convex_hull`: rebuilds convex collision shapes from their hull.

use glam::DVec3;
use kiln_geometry::convex_hull;
use kiln_graph::{BlockId, BlockKind, CollisionShape, Graph, Payload, Shape};

use super::has_kind;
use crate::{Effect, Spell, SpellContext, SpellError};

/// Replaces the vertices of each convex shape with the extreme points of
/// their hull, and its planes with the hull's face planes.
pub struct FixConvexHull;

impl Spell for FixConvexHull {
    fn name(&self) -> &str {
        "fix_convex_hull"
    }

    fn description(&self) -> &str {
        "rebuild convex collision shapes with QuickHull"
    }

    fn reads_only(&self) -> bool {
        false
    }

    fn file_entry(&self, graph: &Graph, _ctx: &SpellContext<'_>) -> bool {
        has_kind(graph, BlockKind::CollisionShape)
    }

    fn cast(
        &self,
        graph: &Graph,
        block: BlockId,
        ctx: &SpellContext<'_>,
    ) -> Result<Effect, SpellError> {
        let Some(Payload::CollisionShape(shape)) = graph.payload(block) else {
            return Ok(Effect::NoChange);
        };
        let Shape::Convex { vertices, planes } = &shape.shape else {
            return Ok(Effect::NoChange);
        };
        let points: Vec<DVec3> = vertices
            .iter()
            .map(|v| DVec3::new(v[0] as f64, v[1] as f64, v[2] as f64))
            .collect();
        let result = convex_hull(&points, ctx.options().hull_precision);
        for warning in result.warnings() {
            ctx.kernel_warning(graph, block, &warning);
        }

        let new_vertices: Vec<[f32; 3]> = result
            .hull
            .vertices()
            .into_iter()
            .map(|p| p.as_vec3().to_array())
            .collect();
        let new_planes: Vec<[f32; 4]> = result
            .hull
            .face_planes()
            .into_iter()
            .map(|(n, d)| [n.x as f32, n.y as f32, n.z as f32, d as f32])
            .collect();
        if &new_vertices == vertices && &new_planes == planes {
            return Ok(Effect::NoChange);
        }
        log::debug!(
            "{}: hull keeps {} of {} points, {} planes",
            graph.path(block),
            new_vertices.len(),
            vertices.len(),
            new_planes.len()
        );
        Ok(Effect::Mutate(Payload::CollisionShape(CollisionShape {
            shape: Shape::Convex {
                vertices: new_vertices,
                planes: new_planes,
            },
            ..shape.clone()
        })))
    }
}
