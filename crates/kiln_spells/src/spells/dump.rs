//! `dump`: logs one line per visited block.

use kiln_graph::{BlockId, EdgeFilter, Graph};

use crate::{Effect, Spell, SpellContext, SpellError};

/// Logs the path, kind and outgoing links of every visited block.
pub struct Dump;

impl Spell for Dump {
    fn name(&self) -> &str {
        "dump"
    }

    fn description(&self) -> &str {
        "log one line per visited block"
    }

    fn reads_only(&self) -> bool {
        true
    }

    fn cast(
        &self,
        graph: &Graph,
        block: BlockId,
        _ctx: &SpellContext<'_>,
    ) -> Result<Effect, SpellError> {
        let owned = graph.children(block, EdgeFilter::Owning).len();
        let referenced = graph.children(block, EdgeFilter::Referencing).len();
        log::info!(
            "{} ({}; owns {}, references {}{})",
            graph.path(block),
            graph.kind(block).map_or("?", |k| k.name()),
            owned,
            referenced,
            if graph.block(block).is_some_and(|b| b.is_dirty()) {
                "; modified"
            } else {
                ""
            },
        );
        Ok(Effect::NoChange)
    }

    fn file_exit(&self, graph: &Graph, ctx: &SpellContext<'_>) {
        log::info!(
            "{}: {} blocks, {} roots",
            ctx.file().unwrap_or("<graph>"),
            graph.len(),
            graph.roots().len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spells::testing;
    use kiln_graph::{Link, Node, Payload};

    #[test]
    fn visits_everything_without_changes() {
        let mut g = Graph::new();
        let child = g.add_block(Payload::Node(Node::default()), Vec::new()).unwrap();
        let root = g.add_block(Payload::Node(Node::default()), vec![Link::owning(child)]).unwrap();
        g.add_root(root).unwrap();
        let (summary, diags) = testing::run(&Dump, &mut g);
        assert_eq!(summary.casts, 2);
        assert!(!summary.changed());
        assert!(diags.is_empty());
    }
}
