//! `fix_mass`: recomputes cached mass properties of collision shapes.

use kiln_geometry::mass_properties;
use kiln_graph::{BlockId, BlockKind, CollisionShape, Graph, Payload};

use super::has_kind;
use crate::{Effect, Spell, SpellContext, SpellError};

/// Recomputes mass, center of mass and inertia from each shape's volume,
/// density and solidity.
pub struct FixMass;

impl Spell for FixMass {
    fn name(&self) -> &str {
        "fix_mass"
    }

    fn description(&self) -> &str {
        "recompute mass, center and inertia of collision shapes"
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
        let (props, warnings) = mass_properties(&shape.shape, shape.density as f64, shape.solid);
        for warning in &warnings {
            ctx.kernel_warning(graph, block, warning);
        }
        let fixed = CollisionShape {
            mass: props.mass as f32,
            center: props.center.as_vec3().to_array(),
            inertia: props.inertia_rows(),
            ..shape.clone()
        };
        if &fixed == shape {
            return Ok(Effect::NoChange);
        }
        log::debug!("{}: mass {:.4}", graph.path(block), props.mass);
        Ok(Effect::Mutate(Payload::CollisionShape(fixed)))
    }
}
