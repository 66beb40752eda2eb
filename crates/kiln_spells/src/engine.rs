//! The engine that walks a graph and applies spell effects.
//!
//! Each traversal is an iterative depth-first walk along owning edges,
//! starting at every root in header order. A block reachable along several
//! owning paths is visited once per traversal. Failures inside a spell are
//! caught at the block that raised them, reported as `X001`, and the block is
//! left unchanged.

use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};

use kiln_diagnostics::Diagnostic;
use kiln_graph::{BlockId, BlockKind, EdgeFilter, Graph};
use serde::Serialize;

use crate::codes::SPELL_FAILED;
use crate::{Composition, Effect, EngineError, Predicate, Spell, SpellContext, SpellError};

/// Block kinds the engine lets spells visit. A block of a kind that is not
/// allowed is skipped together with its owned subtree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockFilter {
    include: Vec<BlockKind>,
    exclude: Vec<BlockKind>,
}

impl BlockFilter {
    /// A filter that allows every kind.
    pub fn all() -> Self {
        Self::default()
    }

    /// Allows only `include` (every kind if empty), minus `exclude`.
    pub fn new(include: Vec<BlockKind>, exclude: Vec<BlockKind>) -> Self {
        Self { include, exclude }
    }

    /// Builds a filter from kind names such as `geometry` or `skin_instance`.
    pub fn parse<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self, EngineError> {
        let parse_all = |names: &[S]| {
            names
                .iter()
                .map(|n| {
                    n.as_ref()
                        .parse::<BlockKind>()
                        .map_err(|_| EngineError::UnknownBlockKind(n.as_ref().to_string()))
                })
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(Self::new(parse_all(include)?, parse_all(exclude)?))
    }

    /// Returns `true` if spells may visit blocks of `kind`.
    pub fn allows(&self, kind: BlockKind) -> bool {
        (self.include.is_empty() || self.include.contains(&kind)) && !self.exclude.contains(&kind)
    }
}

/// Counts gathered over one or more runs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Spell casts, one per spell per visited block.
    pub casts: usize,
    /// Payloads replaced.
    pub mutated: usize,
    /// Blocks removed, cascades included.
    pub deleted: usize,
    /// Casts that failed or panicked.
    pub failed: usize,
    /// Spells that declined the file.
    pub declined: Vec<String>,
}

impl RunSummary {
    /// Adds the counts of `other` to `self`.
    pub fn merge(&mut self, other: RunSummary) {
        self.casts += other.casts;
        self.mutated += other.mutated;
        self.deleted += other.deleted;
        self.failed += other.failed;
        self.declined.extend(other.declined);
    }

    /// Returns `true` if any block was mutated or deleted.
    pub fn changed(&self) -> bool {
        self.mutated > 0 || self.deleted > 0
    }
}

/// Runs spells over a graph.
#[derive(Clone, Debug, Default)]
pub struct Engine {
    filter: BlockFilter,
    dry_run: bool,
}

impl Engine {
    /// An engine that visits every block kind and allows mutation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the block kinds spells may visit.
    pub fn with_filter(mut self, filter: BlockFilter) -> Self {
        self.filter = filter;
        self
    }

    /// In dry-run mode only read-only spells may run.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Returns `true` in dry-run mode.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Runs a single spell.
    pub fn run(
        &self,
        spell: &dyn Spell,
        graph: &mut Graph,
        ctx: &SpellContext<'_>,
    ) -> Result<RunSummary, EngineError> {
        self.check_dry_run(spell)?;
        let mut summary = RunSummary::default();
        self.run_spell(spell, &[], graph, ctx, &mut summary)?;
        Ok(summary)
    }

    /// Runs a pipeline of spells one after another. In dry-run mode the
    /// whole pipeline is rejected before anything runs.
    pub fn run_pipeline(
        &self,
        spells: &[&dyn Spell],
        graph: &mut Graph,
        ctx: &SpellContext<'_>,
    ) -> Result<RunSummary, EngineError> {
        for spell in spells {
            self.check_dry_run(*spell)?;
        }
        let mut summary = RunSummary::default();
        for spell in spells {
            self.run_spell(*spell, &[], graph, ctx, &mut summary)?;
        }
        Ok(summary)
    }

    fn check_dry_run(&self, spell: &dyn Spell) -> Result<(), EngineError> {
        if self.dry_run && !spell.reads_only() {
            return Err(EngineError::MutatingSpellInDryRun(spell.name().to_string()));
        }
        Ok(())
    }

    fn run_spell<'a>(
        &self,
        spell: &'a dyn Spell,
        gates: &[&'a Predicate],
        graph: &mut Graph,
        ctx: &SpellContext<'_>,
        summary: &mut RunSummary,
    ) -> Result<(), EngineError> {
        match spell.composition() {
            Composition::Single if gates.is_empty() => self.traverse(&[spell], graph, ctx, summary),
            Composition::Single => {
                let leaf = GatedLeaf {
                    spell,
                    gates: gates.to_vec(),
                };
                self.traverse(&[&leaf as &dyn Spell], graph, ctx, summary)
            }
            Composition::Sequence(members) => {
                for member in members {
                    self.run_spell(member.as_ref(), gates, graph, ctx, summary)?;
                }
                Ok(())
            }
            Composition::Group(_) => {
                let mut leaves = Vec::new();
                collect_leaves(spell, gates, &mut leaves);
                let spells: Vec<&dyn Spell> = leaves
                    .iter()
                    .map(|leaf| if leaf.gates.is_empty() { leaf.spell } else { leaf as &dyn Spell })
                    .collect();
                self.traverse(&spells, graph, ctx, summary)
            }
            Composition::Gated(predicate, inner) => {
                let mut gates = gates.to_vec();
                gates.push(predicate);
                self.run_spell(inner, &gates, graph, ctx, summary)
            }
        }
    }

    fn traverse(
        &self,
        spells: &[&dyn Spell],
        graph: &mut Graph,
        ctx: &SpellContext<'_>,
        summary: &mut RunSummary,
    ) -> Result<(), EngineError> {
        let entered: Vec<bool> = spells
            .iter()
            .map(|spell| {
                let accepted = guarded(|| Ok(spell.file_entry(graph, ctx)))
                    .unwrap_or_else(|err| {
                        report_failure(*spell, graph, None, ctx, &err);
                        summary.failed += 1;
                        false
                    });
                if !accepted {
                    log::debug!("{} declined the file", spell.name());
                    summary.declined.push(spell.name().to_string());
                }
                accepted
            })
            .collect();
        if !entered.iter().any(|e| *e) {
            return Ok(());
        }

        let mut visited: HashSet<BlockId> = HashSet::new();
        let mut stack: Vec<(BlockId, Vec<bool>)> =
            graph.roots().iter().rev().map(|&r| (r, entered.clone())).collect();
        while let Some((id, mut active)) = stack.pop() {
            if !graph.is_live(id) || !visited.insert(id) {
                continue;
            }
            let Some(kind) = graph.kind(id) else { continue };
            if !self.filter.allows(kind) {
                continue;
            }

            let mut deleted = false;
            for (slot, spell) in spells.iter().enumerate() {
                if !active[slot] {
                    continue;
                }
                summary.casts += 1;
                let effect = match guarded(|| spell.cast(graph, id, ctx)) {
                    Ok(effect) => effect,
                    Err(err) => {
                        report_failure(*spell, graph, Some(id), ctx, &err);
                        summary.failed += 1;
                        Effect::NoChange
                    }
                };
                match effect {
                    Effect::NoChange => {}
                    Effect::SkipSubtree => active[slot] = false,
                    Effect::Mutate(payload) => {
                        if payload.kind() != kind {
                            let err = SpellError::KindChanged {
                                expected: kind,
                                found: payload.kind(),
                            };
                            report_failure(*spell, graph, Some(id), ctx, &err);
                            summary.failed += 1;
                            continue;
                        }
                        log::debug!("{} mutated {}", spell.name(), graph.path(id));
                        graph.replace(id, payload)?;
                        summary.mutated += 1;
                    }
                    Effect::Delete => {
                        log::debug!("{} deleted {}", spell.name(), graph.path(id));
                        summary.deleted += graph.delete(id)?.len();
                        deleted = true;
                        break;
                    }
                }
            }

            if deleted || !active.iter().any(|a| *a) {
                continue;
            }
            for child in graph.children(id, EdgeFilter::Owning).into_iter().rev() {
                stack.push((child, active.clone()));
            }
        }

        for (spell, _) in spells.iter().zip(&entered).filter(|(_, e)| **e) {
            if let Err(err) = guarded(|| {
                spell.file_exit(graph, ctx);
                Ok(())
            }) {
                report_failure(*spell, graph, None, ctx, &err);
                summary.failed += 1;
            }
        }
        Ok(())
    }
}

/// A leaf spell reached through one or more [`gated`](crate::gated)
/// composites. It is cast only where every gate holds.
struct GatedLeaf<'a> {
    spell: &'a dyn Spell,
    gates: Vec<&'a Predicate>,
}

impl Spell for GatedLeaf<'_> {
    fn name(&self) -> &str {
        self.spell.name()
    }

    fn description(&self) -> &str {
        self.spell.description()
    }

    fn reads_only(&self) -> bool {
        self.spell.reads_only()
    }

    fn file_entry(&self, graph: &Graph, ctx: &SpellContext<'_>) -> bool {
        self.spell.file_entry(graph, ctx)
    }

    fn cast(&self, graph: &Graph, block: BlockId, ctx: &SpellContext<'_>) -> Result<Effect, SpellError> {
        if self.gates.iter().all(|gate| gate(graph, block)) {
            self.spell.cast(graph, block, ctx)
        } else {
            Ok(Effect::SkipSubtree)
        }
    }

    fn file_exit(&self, graph: &Graph, ctx: &SpellContext<'_>) {
        self.spell.file_exit(graph, ctx)
    }
}

/// Collects the leaves under `spell` for a shared traversal. Sequences
/// nested in a group lose their ordering and join the group.
fn collect_leaves<'a>(spell: &'a dyn Spell, gates: &[&'a Predicate], out: &mut Vec<GatedLeaf<'a>>) {
    match spell.composition() {
        Composition::Single => out.push(GatedLeaf {
            spell,
            gates: gates.to_vec(),
        }),
        Composition::Sequence(members) | Composition::Group(members) => {
            for member in members {
                collect_leaves(member.as_ref(), gates, out);
            }
        }
        Composition::Gated(predicate, inner) => {
            let mut gates = gates.to_vec();
            gates.push(predicate);
            collect_leaves(inner, &gates, out);
        }
    }
}

/// Runs `f`, turning a panic into [`SpellError::Panicked`].
fn guarded<T>(f: impl FnOnce() -> Result<T, SpellError>) -> Result<T, SpellError> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(SpellError::Panicked(panic_message(payload))))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn report_failure(
    spell: &dyn Spell,
    graph: &Graph,
    block: Option<BlockId>,
    ctx: &SpellContext<'_>,
    err: &SpellError,
) {
    let location = match block {
        Some(id) => ctx.location(graph, id),
        None => ctx.file_location(),
    };
    log::warn!("{} failed at {}: {}", spell.name(), location, err);
    ctx.emit(
        Diagnostic::error(SPELL_FAILED, format!("{} failed: {}", spell.name(), err), location)
            .with_note("the block was left unchanged"),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{gated, group, sequence, SpellOptions};
    use kiln_diagnostics::DiagnosticSink;
    use kiln_graph::{Extra, Link, Node, Payload};

    fn node(name: &str) -> Payload {
        Payload::Node(Node {
            name: name.into(),
            ..Node::default()
        })
    }

    fn extra(name: &str) -> Payload {
        Payload::Extra(Extra {
            name: name.into(),
            data: Vec::new(),
        })
    }

    /// root -> a -> (x, y), root -> b
    fn sample() -> (Graph, [BlockId; 5]) {
        let mut g = Graph::new();
        let x = g.add_block(extra("x"), Vec::new()).unwrap();
        let y = g.add_block(extra("y"), Vec::new()).unwrap();
        let a = g.add_block(node("a"), vec![Link::owning(x), Link::owning(y)]).unwrap();
        let b = g.add_block(node("b"), Vec::new()).unwrap();
        let root = g.add_block(node("root"), vec![Link::owning(a), Link::owning(b)]).unwrap();
        g.add_root(root).unwrap();
        (g, [root, a, b, x, y])
    }

    fn name_of(graph: &Graph, id: BlockId) -> String {
        graph.payload(id).and_then(|p| p.name()).unwrap_or("").to_string()
    }

    /// Records visit order through the diagnostics sink.
    struct Visit(&'static str);

    impl Spell for Visit {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "records visits"
        }
        fn reads_only(&self) -> bool {
            true
        }
        fn cast(&self, graph: &Graph, block: BlockId, ctx: &SpellContext<'_>) -> Result<Effect, SpellError> {
            ctx.emit(Diagnostic::note(
                crate::codes::ATVR_REPORT,
                format!("{}:{}", self.0, name_of(graph, block)),
                ctx.location(graph, block),
            ));
            Ok(if name_of(graph, block) == "a" && self.0 == "skip_a" {
                Effect::SkipSubtree
            } else {
                Effect::NoChange
            })
        }
    }

    struct Rename;

    impl Spell for Rename {
        fn name(&self) -> &str {
            "rename"
        }
        fn description(&self) -> &str {
            "upper-cases node names"
        }
        fn reads_only(&self) -> bool {
            false
        }
        fn cast(&self, graph: &Graph, block: BlockId, _ctx: &SpellContext<'_>) -> Result<Effect, SpellError> {
            match graph.payload(block) {
                Some(Payload::Node(n)) => Ok(Effect::Mutate(Payload::Node(Node {
                    name: n.name.to_uppercase(),
                    ..n.clone()
                }))),
                Some(Payload::Extra(_)) => Ok(Effect::Mutate(node("bad"))),
                _ => Ok(Effect::NoChange),
            }
        }
    }

    struct DeleteA;

    impl Spell for DeleteA {
        fn name(&self) -> &str {
            "delete_a"
        }
        fn description(&self) -> &str {
            "deletes the node named a"
        }
        fn reads_only(&self) -> bool {
            false
        }
        fn cast(&self, graph: &Graph, block: BlockId, _ctx: &SpellContext<'_>) -> Result<Effect, SpellError> {
            Ok(if name_of(graph, block) == "a" { Effect::Delete } else { Effect::NoChange })
        }
    }

    fn visits(sink: &DiagnosticSink) -> Vec<String> {
        sink.take_all().into_iter().map(|d| d.message).collect()
    }

    #[test]
    fn depth_first_in_link_order() {
        let (mut g, _) = sample();
        let sink = DiagnosticSink::new();
        let opts = SpellOptions::default();
        let ctx = SpellContext::new(&sink, &opts);
        let summary = Engine::new().run(&Visit("v"), &mut g, &ctx).unwrap();
        assert_eq!(visits(&sink), ["v:root", "v:a", "v:x", "v:y", "v:b"]);
        assert_eq!(summary.casts, 5);
        assert!(!summary.changed());
    }

    #[test]
    fn skip_subtree_prunes_children() {
        let (mut g, _) = sample();
        let sink = DiagnosticSink::new();
        let opts = SpellOptions::default();
        let ctx = SpellContext::new(&sink, &opts);
        Engine::new().run(&Visit("skip_a"), &mut g, &ctx).unwrap();
        assert_eq!(visits(&sink), ["skip_a:root", "skip_a:a", "skip_a:b"]);
    }

    #[test]
    fn group_descends_while_any_member_is_active() {
        let (mut g, _) = sample();
        let sink = DiagnosticSink::new();
        let opts = SpellOptions::default();
        let ctx = SpellContext::new(&sink, &opts);
        let both = group("both", vec![Box::new(Visit("skip_a")), Box::new(Visit("v"))]);
        Engine::new().run(&both, &mut g, &ctx).unwrap();
        assert_eq!(
            visits(&sink),
            ["skip_a:root", "v:root", "skip_a:a", "v:a", "v:x", "v:y", "skip_a:b", "v:b"]
        );
    }

    #[test]
    fn sequence_runs_members_to_completion() {
        let (mut g, _) = sample();
        let sink = DiagnosticSink::new();
        let opts = SpellOptions::default();
        let ctx = SpellContext::new(&sink, &opts);
        let seq = sequence("seq", vec![Box::new(Visit("one")), Box::new(Visit("two"))]);
        Engine::new().run(&seq, &mut g, &ctx).unwrap();
        let seen = visits(&sink);
        assert_eq!(seen.len(), 10);
        assert!(seen[..5].iter().all(|s| s.starts_with("one:")));
        assert!(seen[5..].iter().all(|s| s.starts_with("two:")));
    }

    #[test]
    fn gate_prunes_failing_blocks() {
        let (mut g, _) = sample();
        let sink = DiagnosticSink::new();
        let opts = SpellOptions::default();
        let ctx = SpellContext::new(&sink, &opts);
        let spell = gated(Visit("v"), |graph: &Graph, id| name_of(graph, id) != "a");
        Engine::new().run(&spell, &mut g, &ctx).unwrap();
        assert_eq!(visits(&sink), ["v:root", "v:b"]);
    }

    #[test]
    fn gate_applies_to_every_sequence_member() {
        let (mut g, _) = sample();
        let sink = DiagnosticSink::new();
        let opts = SpellOptions::default();
        let ctx = SpellContext::new(&sink, &opts);
        let seq = sequence("seq", vec![Box::new(Visit("one")), Box::new(Visit("two"))]);
        let spell = gated(seq, |graph: &Graph, id| name_of(graph, id) != "a");
        Engine::new().run(&spell, &mut g, &ctx).unwrap();
        assert_eq!(visits(&sink), ["one:root", "one:b", "two:root", "two:b"]);
    }

    #[test]
    fn gated_sequence_mutates_where_the_gate_holds() {
        let (mut g, [root, a, b, _, _]) = sample();
        let sink = DiagnosticSink::new();
        let opts = SpellOptions::default();
        let ctx = SpellContext::new(&sink, &opts);
        let spell = gated(sequence("seq", vec![Box::new(Rename)]), |graph: &Graph, id| {
            name_of(graph, id) != "b"
        });
        let summary = Engine::new().run(&spell, &mut g, &ctx).unwrap();
        assert_eq!(summary.mutated, 2);
        assert_eq!(name_of(&g, root), "ROOT");
        assert_eq!(name_of(&g, a), "A");
        assert_eq!(name_of(&g, b), "b");

        let closed = gated(sequence("seq", vec![Box::new(Rename)]), |_: &Graph, _| false);
        let summary = Engine::new().run(&closed, &mut g, &ctx).unwrap();
        assert_eq!(summary.mutated, 0);
        assert_eq!(name_of(&g, b), "b");
    }

    #[test]
    fn gate_applies_to_every_group_member() {
        let (mut g, _) = sample();
        let sink = DiagnosticSink::new();
        let opts = SpellOptions::default();
        let ctx = SpellContext::new(&sink, &opts);
        let both = group("both", vec![Box::new(Visit("p")), Box::new(Visit("q"))]);
        let spell = gated(both, |graph: &Graph, id| name_of(graph, id) != "b");
        Engine::new().run(&spell, &mut g, &ctx).unwrap();
        assert_eq!(
            visits(&sink),
            ["p:root", "q:root", "p:a", "q:a", "p:x", "q:x", "p:y", "q:y"]
        );
    }

    #[test]
    fn nested_gates_must_all_hold() {
        let (mut g, _) = sample();
        let sink = DiagnosticSink::new();
        let opts = SpellOptions::default();
        let ctx = SpellContext::new(&sink, &opts);
        let inner = gated(
            sequence("seq", vec![Box::new(Visit("v"))]),
            |graph: &Graph, id| name_of(graph, id) != "b",
        );
        let outer = gated(group("g", vec![Box::new(inner)]), |graph: &Graph, id| {
            name_of(graph, id) != "y"
        });
        Engine::new().run(&outer, &mut g, &ctx).unwrap();
        assert_eq!(visits(&sink), ["v:root", "v:a", "v:x"]);
    }

    #[test]
    fn filter_excludes_kinds_with_their_subtree() {
        let (mut g, _) = sample();
        let sink = DiagnosticSink::new();
        let opts = SpellOptions::default();
        let ctx = SpellContext::new(&sink, &opts);
        let filter = BlockFilter::parse(&[] as &[&str], &["extra"]).unwrap();
        Engine::new()
            .with_filter(filter)
            .run(&Visit("v"), &mut g, &ctx)
            .unwrap();
        assert_eq!(visits(&sink), ["v:root", "v:a", "v:b"]);
        assert!(matches!(
            BlockFilter::parse(&["mesh"], &[]),
            Err(EngineError::UnknownBlockKind(_))
        ));
    }

    #[test]
    fn mutate_replaces_payload_and_rejects_kind_change() {
        let (mut g, [root, _, _, x, _]) = sample();
        let sink = DiagnosticSink::new();
        let opts = SpellOptions::default();
        let ctx = SpellContext::new(&sink, &opts);
        let summary = Engine::new().run(&Rename, &mut g, &ctx).unwrap();
        assert_eq!(summary.mutated, 3);
        assert_eq!(summary.failed, 2);
        assert_eq!(name_of(&g, root), "ROOT");
        assert_eq!(g.kind(x), Some(BlockKind::Extra));
        assert_eq!(sink.count_code(SPELL_FAILED), 2);
    }

    #[test]
    fn delete_cascades_and_stops_descent() {
        let (mut g, [root, a, b, x, y]) = sample();
        let sink = DiagnosticSink::new();
        let opts = SpellOptions::default();
        let ctx = SpellContext::new(&sink, &opts);
        let summary = Engine::new().run(&DeleteA, &mut g, &ctx).unwrap();
        assert_eq!(summary.deleted, 3);
        assert!(!g.is_live(a) && !g.is_live(x) && !g.is_live(y));
        assert!(g.is_live(root) && g.is_live(b));
    }

    #[test]
    fn dry_run_rejects_mutating_spells() {
        let (mut g, _) = sample();
        let sink = DiagnosticSink::new();
        let opts = SpellOptions::default();
        let ctx = SpellContext::new(&sink, &opts);
        let engine = Engine::new().with_dry_run(true);
        let err = engine
            .run_pipeline(&[&Visit("v") as &dyn Spell, &Rename], &mut g, &ctx)
            .unwrap_err();
        assert!(matches!(err, EngineError::MutatingSpellInDryRun(ref n) if n == "rename"));
        // Nothing ran.
        assert!(sink.take_all().is_empty());
        assert!(engine.run(&Visit("v"), &mut g, &ctx).is_ok());
    }
}
