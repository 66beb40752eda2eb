//! `fix_skin_partition`: recomputes the skin partition of skinned geometry.
//!
//! The spell is cast at `SkinPartition` blocks. Its owning `SkinInstance`
//! supplies the bone list (referencing links) and the root bone, and the
//! geometry that owns the skin instance supplies weights and faces.

use kiln_geometry::{is_degenerate, partition_skin, KernelWarning, ZeroWeightPolicy};
use kiln_graph::{
    BlockId, BlockKind, EdgeFilter, Graph, Payload, Primitives, SkinPartitionData, Triangle,
};

use super::{check_indices, has_kind};
use crate::{Effect, Spell, SpellContext, SpellError};

/// Rebuilds skin partitions with the configured bounds.
pub struct FixSkinPartition;

fn first_owner_of_kind(graph: &Graph, block: BlockId, kind: BlockKind) -> Option<BlockId> {
    graph
        .owners(block)
        .into_iter()
        .find(|&o| graph.kind(o) == Some(kind))
}

impl Spell for FixSkinPartition {
    fn name(&self) -> &str {
        "fix_skin_partition"
    }

    fn description(&self) -> &str {
        "recompute the skin partition of skinned geometry"
    }

    fn reads_only(&self) -> bool {
        false
    }

    fn file_entry(&self, graph: &Graph, _ctx: &SpellContext<'_>) -> bool {
        has_kind(graph, BlockKind::SkinPartition)
    }

    fn cast(
        &self,
        graph: &Graph,
        block: BlockId,
        ctx: &SpellContext<'_>,
    ) -> Result<Effect, SpellError> {
        if graph.kind(block) != Some(BlockKind::SkinPartition) {
            return Ok(Effect::NoChange);
        }
        let Some(skin_id) = first_owner_of_kind(graph, block, BlockKind::SkinInstance) else {
            log::debug!("{}: not owned by a skin instance", graph.path(block));
            return Ok(Effect::NoChange);
        };
        let Some(Payload::SkinInstance(skin)) = graph.payload(skin_id) else {
            return Ok(Effect::NoChange);
        };
        let Some(geometry_id) = first_owner_of_kind(graph, skin_id, BlockKind::Geometry) else {
            log::debug!("{}: skin instance has no geometry", graph.path(block));
            return Ok(Effect::NoChange);
        };
        let Some(Payload::Geometry(geometry)) = graph.payload(geometry_id) else {
            return Ok(Effect::NoChange);
        };
        let Some(weights) = &geometry.weights else {
            return Err(SpellError::Invalid(format!(
                "{} has no bone weights",
                graph.path(geometry_id)
            )));
        };
        if weights.len() != geometry.vertex_count() {
            return Err(SpellError::Invalid(format!(
                "{} weight lists for {} vertices",
                weights.len(),
                geometry.vertex_count()
            )));
        }
        check_indices(geometry)?;

        let bone_count = graph.children(skin_id, EdgeFilter::Referencing).len();
        if bone_count > 0 {
            let stray = weights.iter().flatten().find(|w| w.bone as usize >= bone_count);
            if let Some(w) = stray {
                return Err(SpellError::Invalid(format!(
                    "bone {} out of range for {bone_count} bones",
                    w.bone
                )));
            }
        }

        let triangles: Vec<Triangle> = match &geometry.primitives {
            Primitives::Triangles(list) => list
                .iter()
                .enumerate()
                .filter(|(index, t)| {
                    if is_degenerate(t) {
                        let warning = KernelWarning::DegenerateTriangle {
                            index: *index,
                            triangle: **t,
                        };
                        ctx.kernel_warning(graph, geometry_id, &warning);
                        false
                    } else {
                        true
                    }
                })
                .map(|(_, t)| *t)
                .collect(),
            Primitives::Strips(strips) => kiln_geometry::triangulate(strips),
        };

        let mut options = ctx.options().partition.clone();
        if let ZeroWeightPolicy::AssignRootBone(_) = options.zero_weight {
            options.zero_weight = ZeroWeightPolicy::AssignRootBone(skin.root_bone);
        }
        let result = partition_skin(weights, &triangles, None, &options)?;
        for warning in &result.warnings {
            ctx.kernel_warning(graph, geometry_id, warning);
        }
        if !result.dropped_triangles.is_empty() {
            log::warn!(
                "{}: {} triangle(s) left out of the skin partition",
                graph.path(geometry_id),
                result.dropped_triangles.len()
            );
        }
        log::debug!(
            "{}: {} partition(s) for {} triangles",
            graph.path(block),
            result.partitions.len(),
            triangles.len()
        );
        Ok(Effect::Mutate(Payload::SkinPartition(SkinPartitionData {
            partitions: result.partitions,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spells::testing;
    use kiln_graph::{BoneWeight, Geometry, Link, Node, SkinInstance};

    /// Geometry -> SkinInstance (bones b0..b3) -> SkinPartition.
    fn skinned(weights: Vec<Vec<BoneWeight>>, triangles: Vec<Triangle>) -> (Graph, BlockId) {
        let mut g = Graph::new();
        let bones: Vec<BlockId> = (0..4)
            .map(|i| {
                g.add_block(
                    Payload::Node(Node {
                        name: format!("b{i}"),
                        ..Node::default()
                    }),
                    Vec::new(),
                )
                .unwrap()
            })
            .collect();
        let partition = g
            .add_block(Payload::SkinPartition(SkinPartitionData::default()), Vec::new())
            .unwrap();
        let mut links = vec![Link::owning(partition)];
        links.extend(bones.iter().map(|&b| Link::referencing(b)));
        let skin = g
            .add_block(Payload::SkinInstance(SkinInstance { root_bone: 2 }), links)
            .unwrap();
        let geometry = Geometry {
            positions: vec![[0.0; 3]; weights.len()],
            primitives: Primitives::Triangles(triangles),
            weights: Some(weights),
            ..Geometry::default()
        };
        let geometry = g
            .add_block(Payload::Geometry(geometry), vec![Link::owning(skin)])
            .unwrap();
        let mut root_links = vec![Link::owning(geometry)];
        root_links.extend(bones.iter().map(|&b| Link::owning(b)));
        let root = g.add_block(Payload::Node(Node::default()), root_links).unwrap();
        g.add_root(root).unwrap();
        (g, partition)
    }

    #[test]
    fn weightless_vertex_binds_to_skin_root() {
        let w = |b: u16| vec![BoneWeight::new(b, 1.0)];
        let (mut g, partition) = skinned(
            vec![w(0), w(1), Vec::new(), w(3)],
            vec![[0, 1, 2], [2, 1, 3], [1, 1, 3]],
        );
        let (summary, diags) = testing::run(&FixSkinPartition, &mut g);
        assert_eq!(summary.mutated, 1);
        assert_eq!(diags.iter().filter(|d| d.code.number == 202).count(), 1);
        assert_eq!(diags.iter().filter(|d| d.code.number == 201).count(), 1);

        let Some(Payload::SkinPartition(data)) = g.payload(partition) else {
            panic!("skin partition expected");
        };
        assert_eq!(data.partitions.len(), 1);
        let p = &data.partitions[0];
        assert_eq!(p.bones, vec![0, 1, 2, 3]);
        assert_eq!(p.triangles.len(), 2);
        let local = p.vertex_map.iter().position(|&v| v == 2).unwrap();
        assert_eq!(p.bones[p.influences[local][0].bone as usize], 2);
    }

    #[test]
    fn bone_index_past_bone_list_fails() {
        let (mut g, _) = skinned(
            vec![vec![BoneWeight::new(9, 1.0)]; 3],
            vec![[0, 1, 2]],
        );
        let (summary, diags) = testing::run(&FixSkinPartition, &mut g);
        assert_eq!(summary.failed, 1);
        assert_eq!(diags[0].code, crate::codes::SPELL_FAILED);
    }
}
