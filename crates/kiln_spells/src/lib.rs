//! Spell engine: pluggable transformations over a loaded block graph.
//!
//! A [`Spell`] is cast at each block reached by a depth-first walk of the
//! owning edges and answers with an [`Effect`]. The [`Engine`] applies the
//! effects, isolates failures to the block that raised them, and reports
//! them as `X001` diagnostics. Spells combine with [`sequence`], [`gated`]
//! and [`group`], and the built-in catalogue is available through
//! [`SpellRegistry::with_builtins`].

#![warn(missing_docs)]

pub mod codes;
mod combinators;
mod context;
mod engine;
mod error;
mod registry;
mod spells;

pub use combinators::{gated, group, sequence, Gated, Group, Predicate, Sequence};
pub use context::{SpellContext, SpellOptions};
pub use engine::{BlockFilter, Engine, RunSummary};
pub use error::{EngineError, SpellError};
pub use registry::SpellRegistry;
pub use spells::{
    register_builtin_spells, CheckReadWrite, CheckTrianglesAtvr, Dump, FixConvexHull,
    FixDelUnusedRoots, FixMass, FixSkinPartition, OptStripify, OptVertexCache,
};

use kiln_graph::{BlockId, Graph, Payload};

/// What the engine should do with the block a spell was cast at.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Leave the block alone and descend into its owned children.
    NoChange,
    /// Replace the block's payload. The kind must not change.
    Mutate(Payload),
    /// Delete the block, cascading through blocks it alone owns.
    Delete,
    /// Leave the block alone and do not descend into its owned children.
    SkipSubtree,
}

/// How a spell is built from other spells. The engine walks the graph once
/// per [`Composition::Single`] spell or [`Composition::Group`], and runs the
/// members of a [`Composition::Sequence`] one after another.
pub enum Composition<'a> {
    /// An ordinary spell, cast block by block.
    Single,
    /// Members run to completion in order.
    Sequence(&'a [Box<dyn Spell>]),
    /// Members share a single traversal.
    Group(&'a [Box<dyn Spell>]),
    /// A composite whose every leaf is cast only where the predicate holds.
    Gated(&'a Predicate, &'a dyn Spell),
}

/// A transformation or check cast at the blocks of a graph.
///
/// Spells are shared between worker threads and must keep no per-file state
/// of their own; diagnostics go through the [`SpellContext`].
pub trait Spell: Send + Sync {
    /// Unique name, used for lookup and in reports.
    fn name(&self) -> &str;

    /// One-line description for listings.
    fn description(&self) -> &str;

    /// Returns `true` if the spell never mutates or deletes blocks.
    fn reads_only(&self) -> bool;

    /// Called once per file before the walk. Returning `false` declines the
    /// whole file.
    fn file_entry(&self, _graph: &Graph, _ctx: &SpellContext<'_>) -> bool {
        true
    }

    /// Casts the spell at `block`.
    fn cast(
        &self,
        graph: &Graph,
        block: BlockId,
        ctx: &SpellContext<'_>,
    ) -> Result<Effect, SpellError>;

    /// Called once per file after the walk, unless the file was declined.
    fn file_exit(&self, _graph: &Graph, _ctx: &SpellContext<'_>) {}

    /// How this spell is composed.
    fn composition(&self) -> Composition<'_> {
        Composition::Single
    }
}
