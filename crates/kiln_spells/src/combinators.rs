//! Spells built from other spells.

use crate::{Composition, Effect, Spell, SpellContext, SpellError};
use kiln_graph::{BlockId, Graph};

/// Members run one after another, each over the whole graph.
pub struct Sequence {
    name: String,
    description: String,
    members: Vec<Box<dyn Spell>>,
}

/// Runs `members` in order; each sees the graph as the previous one left it.
pub fn sequence(name: impl Into<String>, members: Vec<Box<dyn Spell>>) -> Sequence {
    let description = members.iter().map(|m| m.name()).collect::<Vec<_>>().join(", then ");
    Sequence {
        name: name.into(),
        description,
        members,
    }
}

impl Spell for Sequence {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn reads_only(&self) -> bool {
        self.members.iter().all(|m| m.reads_only())
    }

    fn cast(&self, _graph: &Graph, _block: BlockId, _ctx: &SpellContext<'_>) -> Result<Effect, SpellError> {
        // The engine expands sequences; a direct cast has nothing to do.
        Ok(Effect::SkipSubtree)
    }

    fn composition(&self) -> Composition<'_> {
        Composition::Sequence(&self.members)
    }
}

/// Members share a single traversal.
pub struct Group {
    name: String,
    description: String,
    members: Vec<Box<dyn Spell>>,
}

/// Casts every member at each block during one walk. Descent into a subtree
/// continues for the members that did not skip it, and stops only once all
/// of them have.
pub fn group(name: impl Into<String>, members: Vec<Box<dyn Spell>>) -> Group {
    let description = members.iter().map(|m| m.name()).collect::<Vec<_>>().join(" + ");
    Group {
        name: name.into(),
        description,
        members,
    }
}

impl Spell for Group {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn reads_only(&self) -> bool {
        self.members.iter().all(|m| m.reads_only())
    }

    fn cast(&self, _graph: &Graph, _block: BlockId, _ctx: &SpellContext<'_>) -> Result<Effect, SpellError> {
        Ok(Effect::SkipSubtree)
    }

    fn composition(&self) -> Composition<'_> {
        Composition::Group(&self.members)
    }
}

/// A block test used by [`gated`].
pub type Predicate = dyn Fn(&Graph, BlockId) -> bool + Send + Sync;

/// A spell that only enters blocks satisfying a predicate.
pub struct Gated<S> {
    inner: S,
    predicate: Box<Predicate>,
}

/// Wraps `inner` so it is cast only at blocks where `predicate` holds.
/// Blocks that fail the predicate are skipped together with their subtree.
pub fn gated<S, P>(inner: S, predicate: P) -> Gated<S>
where
    S: Spell,
    P: Fn(&Graph, BlockId) -> bool + Send + Sync + 'static,
{
    Gated {
        inner,
        predicate: Box::new(predicate),
    }
}

impl<S: Spell> Spell for Gated<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn reads_only(&self) -> bool {
        self.inner.reads_only()
    }

    fn file_entry(&self, graph: &Graph, ctx: &SpellContext<'_>) -> bool {
        self.inner.file_entry(graph, ctx)
    }

    fn cast(&self, graph: &Graph, block: BlockId, ctx: &SpellContext<'_>) -> Result<Effect, SpellError> {
        if (self.predicate)(graph, block) {
            self.inner.cast(graph, block, ctx)
        } else {
            Ok(Effect::SkipSubtree)
        }
    }

    fn file_exit(&self, graph: &Graph, ctx: &SpellContext<'_>) {
        self.inner.file_exit(graph, ctx)
    }

    fn composition(&self) -> Composition<'_> {
        match self.inner.composition() {
            Composition::Single => Composition::Single,
            _ => Composition::Gated(&*self.predicate, &self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Dump, FixMass, OptStripify};

    #[test]
    fn read_only_only_if_every_member_is() {
        let reads = group("g", vec![Box::new(Dump), Box::new(Dump)]);
        assert!(reads.reads_only());
        let mixed = sequence("s", vec![Box::new(Dump), Box::new(FixMass)]);
        assert!(!mixed.reads_only());
        assert_eq!(mixed.description(), "dump, then fix_mass");
    }

    #[test]
    fn gated_keeps_inner_identity() {
        let spell = gated(OptStripify, |_, _| true);
        assert_eq!(spell.name(), "opt_stripify");
        assert!(!spell.reads_only());
        assert!(matches!(spell.composition(), Composition::Single));
    }

    #[test]
    fn gated_composite_exposes_its_inner_spell() {
        let spell = gated(sequence("s", vec![Box::new(Dump)]), |_, _| true);
        match spell.composition() {
            Composition::Gated(_, inner) => assert_eq!(inner.name(), "s"),
            _ => panic!("expected a gated composition"),
        }
    }
}
