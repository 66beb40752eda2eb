//! The built-in spell catalogue.

mod check_atvr;
mod check_readwrite;
mod dump;
mod fix_convex_hull;
mod fix_del_unused_roots;
mod fix_mass;
mod fix_skin_partition;
mod opt_stripify;
mod opt_vertex_cache;

pub use check_atvr::CheckTrianglesAtvr;
pub use check_readwrite::CheckReadWrite;
pub use dump::Dump;
pub use fix_convex_hull::FixConvexHull;
pub use fix_del_unused_roots::FixDelUnusedRoots;
pub use fix_mass::FixMass;
pub use fix_skin_partition::FixSkinPartition;
pub use opt_stripify::OptStripify;
pub use opt_vertex_cache::OptVertexCache;

use kiln_graph::{BlockKind, Geometry, Graph};

use crate::{SpellError, SpellRegistry};

/// Registers all nine built-in spells.
pub fn register_builtin_spells(registry: &mut SpellRegistry) {
    let builtins: [Box<dyn crate::Spell>; 9] = [
        Box::new(CheckReadWrite),
        Box::new(CheckTrianglesAtvr),
        Box::new(Dump),
        Box::new(OptVertexCache),
        Box::new(OptStripify),
        Box::new(FixSkinPartition),
        Box::new(FixConvexHull),
        Box::new(FixMass),
        Box::new(FixDelUnusedRoots),
    ];
    for spell in builtins {
        if let Err(err) = registry.register(spell) {
            log::warn!("{err}");
        }
    }
}

/// Returns `true` if any live block has kind `kind`.
fn has_kind(graph: &Graph, kind: BlockKind) -> bool {
    graph.iter().any(|(_, b)| b.kind() == kind)
}

/// Rejects index buffers that point past the vertex buffers.
fn check_indices(geometry: &Geometry) -> Result<(), SpellError> {
    match geometry.primitives.max_index() {
        Some(max) if max as usize >= geometry.vertex_count() => Err(SpellError::Invalid(format!(
            "vertex index {max} out of range for {} vertices",
            geometry.vertex_count()
        ))),
        _ => Ok(()),
    }
}
