//! `fix_del_unused_roots`: removes roots that hold nothing.

use kiln_graph::{BlockId, BlockKind, EdgeFilter, Graph};

use crate::{Effect, Spell, SpellContext, SpellError};

/// Deletes root blocks that own no other block and are not nodes.
pub struct FixDelUnusedRoots;

impl Spell for FixDelUnusedRoots {
    fn name(&self) -> &str {
        "fix_del_unused_roots"
    }

    fn description(&self) -> &str {
        "drop roots that own nothing and are not nodes"
    }

    fn reads_only(&self) -> bool {
        false
    }

    fn cast(
        &self,
        graph: &Graph,
        block: BlockId,
        _ctx: &SpellContext<'_>,
    ) -> Result<Effect, SpellError> {
        if !graph.roots().contains(&block) {
            return Ok(Effect::SkipSubtree);
        }
        let unused = graph.kind(block) != Some(BlockKind::Node)
            && graph.children(block, EdgeFilter::Owning).is_empty();
        Ok(if unused {
            log::debug!("dropping unused root {}", graph.path(block));
            Effect::Delete
        } else {
            Effect::SkipSubtree
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spells::testing;
    use kiln_graph::{Extra, Link, Node, Payload, Property};

    #[test]
    fn drops_only_empty_non_node_roots() {
        let mut g = Graph::new();
        let prop = Payload::Property(Property {
            name: "p".into(),
            value: Vec::new(),
        });
        let lonely = g.add_block(prop.clone(), Vec::new()).unwrap();
        let node = g.add_block(Payload::Node(Node::default()), Vec::new()).unwrap();
        let child = g
            .add_block(
                Payload::Extra(Extra {
                    name: "x".into(),
                    data: Vec::new(),
                }),
                Vec::new(),
            )
            .unwrap();
        let holder = g.add_block(prop, vec![Link::owning(child)]).unwrap();
        for root in [lonely, node, holder] {
            g.add_root(root).unwrap();
        }

        let (summary, _) = testing::run(&FixDelUnusedRoots, &mut g);
        assert_eq!(summary.deleted, 1);
        assert!(!g.is_live(lonely));
        assert_eq!(g.roots(), [node, holder]);
        assert!(g.is_live(child));
    }
}
