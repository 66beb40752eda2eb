//! A failing spell is isolated to the block that raised the failure.

use kiln_diagnostics::DiagnosticSink;
use kiln_graph::{load, serialize, BlockId, Graph, Link, Node, Payload};
use kiln_spells::codes::SPELL_FAILED;
use kiln_spells::{Effect, Engine, Spell, SpellContext, SpellError, SpellOptions};

/// Twenty nodes: a root owning nineteen children, loaded from bytes so every
/// block starts clean.
fn twenty_nodes() -> Graph {
    let mut g = Graph::new();
    let children: Vec<BlockId> = (1..20)
        .map(|i| {
            g.add_block(
                Payload::Node(Node {
                    name: format!("n{i}"),
                    scale: 1.0,
                    ..Node::default()
                }),
                Vec::new(),
            )
            .unwrap()
        })
        .collect();
    let root = g
        .add_block(
            Payload::Node(Node {
                name: "root".into(),
                scale: 1.0,
                ..Node::default()
            }),
            children.into_iter().map(Link::owning).collect(),
        )
        .unwrap();
    g.add_root(root).unwrap();
    let bytes = serialize(&g).unwrap();
    load(&bytes).unwrap().graph
}

/// Doubles every node's scale and panics at the seventh block visited.
struct FragileScale;

impl Spell for FragileScale {
    fn name(&self) -> &str {
        "fragile_scale"
    }

    fn description(&self) -> &str {
        "doubles node scales, panics on the seventh block"
    }

    fn reads_only(&self) -> bool {
        false
    }

    fn cast(&self, graph: &Graph, block: BlockId, _ctx: &SpellContext<'_>) -> Result<Effect, SpellError> {
        if block.as_raw() == 7 {
            panic!("scale exploded");
        }
        match graph.payload(block) {
            Some(Payload::Node(n)) => Ok(Effect::Mutate(Payload::Node(Node {
                scale: n.scale * 2.0,
                ..n.clone()
            }))),
            _ => Ok(Effect::NoChange),
        }
    }
}

#[test]
fn panic_at_one_block_leaves_the_rest_processed() {
    let mut graph = twenty_nodes();
    assert_eq!(graph.len(), 20);
    let sink = DiagnosticSink::new();
    let options = SpellOptions::default();
    let ctx = SpellContext::new(&sink, &options).with_file("twenty.kiln");

    let summary = Engine::new().run(&FragileScale, &mut graph, &ctx).unwrap();
    assert_eq!(summary.casts, 20);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.mutated, 19);

    let diags = sink.take_all();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, SPELL_FAILED);
    assert_eq!(diags[0].location.block, Some(7));
    assert_eq!(diags[0].location.file.as_deref(), Some("twenty.kiln"));
    assert!(diags[0].message.contains("scale exploded"));

    let failed = BlockId::from_raw(7);
    assert!(graph.block(failed).is_some_and(|b| !b.is_dirty()));
    for (id, block) in graph.iter() {
        let Payload::Node(node) = block.payload() else {
            panic!("only nodes expected");
        };
        let expected = if id == failed { 1.0 } else { 2.0 };
        assert_eq!(node.scale, expected, "block {id}");
    }
}

#[test]
fn error_result_is_reported_like_a_panic() {
    struct Refuses;

    impl Spell for Refuses {
        fn name(&self) -> &str {
            "refuses"
        }
        fn description(&self) -> &str {
            "fails at block 7"
        }
        fn reads_only(&self) -> bool {
            true
        }
        fn cast(&self, _: &Graph, block: BlockId, _: &SpellContext<'_>) -> Result<Effect, SpellError> {
            if block.as_raw() == 7 {
                Err(SpellError::Invalid("bad block".into()))
            } else {
                Ok(Effect::NoChange)
            }
        }
    }

    let mut graph = twenty_nodes();
    let sink = DiagnosticSink::new();
    let options = SpellOptions::default();
    let ctx = SpellContext::new(&sink, &options);
    Engine::new().with_dry_run(true).run(&Refuses, &mut graph, &ctx).unwrap();
    assert_eq!(sink.count_code(SPELL_FAILED), 1);
}
