//! Load/serialize round trips over randomly generated files.

use kiln_graph::{
    load, serialize, BlockId, BoneWeight, CollisionShape, Controller, EdgeFilter, Extra, Geometry,
    Graph, Influence, Link, Node, Partition, Payload, Primitives, Property, Shape, SkinInstance,
    SkinPartitionData,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn vec3(rng: &mut StdRng) -> [f32; 3] {
    [rng.gen(), rng.gen(), rng.gen()]
}

fn random_geometry(rng: &mut StdRng) -> Geometry {
    let n = rng.gen_range(3..40u32);
    let positions = (0..n).map(|_| vec3(rng)).collect();
    let triangles: Vec<[u32; 3]> = (0..rng.gen_range(1..30))
        .map(|_| [rng.gen_range(0..n), rng.gen_range(0..n), rng.gen_range(0..n)])
        .collect();
    let primitives = if rng.gen_bool(0.5) {
        Primitives::Triangles(triangles)
    } else {
        Primitives::Strips(triangles.iter().map(|t| t.to_vec()).collect())
    };
    let weights = rng.gen_bool(0.5).then(|| {
        (0..n)
            .map(|_| {
                (0..rng.gen_range(0..4))
                    .map(|_| BoneWeight::new(rng.gen_range(0..8), rng.gen()))
                    .collect()
            })
            .collect()
    });
    Geometry {
        positions,
        normals: rng.gen_bool(0.5).then(|| (0..n).map(|_| vec3(rng)).collect()),
        uv_sets: (0..rng.gen_range(0..3))
            .map(|_| (0..n).map(|_| [rng.gen(), rng.gen()]).collect())
            .collect(),
        colors: rng
            .gen_bool(0.3)
            .then(|| (0..n).map(|_| [rng.gen(), rng.gen(), rng.gen(), 1.0]).collect()),
        primitives,
        weights,
    }
}

fn random_payload(rng: &mut StdRng, i: usize) -> Payload {
    match rng.gen_range(0..8) {
        0 => Payload::Node(Node {
            name: format!("node{i}"),
            flags: rng.gen(),
            translation: vec3(rng),
            scale: rng.gen(),
        }),
        1 => Payload::Geometry(random_geometry(rng)),
        2 => Payload::SkinInstance(SkinInstance { root_bone: rng.gen_range(0..8) }),
        3 => Payload::SkinPartition(SkinPartitionData {
            partitions: vec![Partition {
                bones: vec![0, 1],
                vertex_map: vec![0, 1, 2],
                influences: vec![vec![Influence { bone: 0, weight: 1.0 }]; 3],
                triangles: vec![[0, 1, 2]],
                strips: vec![vec![0, 1, 2]],
            }],
        }),
        4 => Payload::CollisionShape(CollisionShape {
            material: rng.gen(),
            density: rng.gen(),
            solid: rng.gen(),
            shape: match rng.gen_range(0..3) {
                0 => Shape::Sphere { radius: rng.gen() },
                1 => Shape::Box { size: vec3(rng) },
                _ => Shape::Capsule { length: rng.gen(), radius: rng.gen() },
            },
            mass: rng.gen(),
            center: vec3(rng),
            inertia: [vec3(rng), vec3(rng), vec3(rng)],
        }),
        5 => Payload::Property(Property {
            name: format!("prop{i}"),
            value: (0..rng.gen_range(0..16)).map(|_| rng.gen()).collect(),
        }),
        6 => Payload::Controller(Controller {
            name: format!("ctrl{i}"),
            frequency: 1.0,
            phase: 0.0,
            start_time: 0.0,
            stop_time: rng.gen(),
        }),
        _ => Payload::Extra(Extra {
            name: format!("extra{i}"),
            data: (0..rng.gen_range(0..16)).map(|_| rng.gen()).collect(),
        }),
    }
}

/// Builds a graph whose owning edges only point from lower to higher IDs,
/// so ID order is already a valid write order.
fn random_graph(seed: u64) -> Graph {
    let mut rng = StdRng::seed_from_u64(seed);
    let count = rng.gen_range(5..60);
    let mut ids = Vec::new();
    let mut g = Graph::new();
    for i in 0..count {
        let id = g.add_block(random_payload(&mut rng, i), vec![]).unwrap();
        ids.push(id);
    }
    for (i, &id) in ids.iter().enumerate() {
        for _ in 0..rng.gen_range(0..4) {
            let j = rng.gen_range(0..count);
            let link = if j > i && rng.gen_bool(0.6) {
                Link::owning(ids[j])
            } else if j != i {
                Link::referencing(ids[j])
            } else {
                Link { kind: kiln_graph::EdgeKind::Referencing, target: None }
            };
            g.add_link(id, link).unwrap();
        }
    }
    g.add_root(ids[0]).unwrap();
    g
}

#[test]
fn untouched_files_roundtrip_byte_identical() {
    for seed in 0..50 {
        let bytes = serialize(&random_graph(seed)).unwrap();
        let loaded = load(&bytes).unwrap();
        assert!(loaded.diagnostics.is_empty(), "seed {seed}");
        assert_eq!(serialize(&loaded.graph).unwrap(), bytes, "seed {seed}");
    }
}

#[test]
fn untouched_blocks_survive_a_mutation() {
    let bytes = serialize(&random_graph(7)).unwrap();
    let mut graph = load(&bytes).unwrap().graph;
    let target = BlockId::from_raw(1);
    graph
        .replace(target, Payload::Extra(Extra { name: "patched".into(), data: vec![] }))
        .unwrap();
    let reloaded = load(&serialize(&graph).unwrap()).unwrap().graph;
    let original = load(&bytes).unwrap().graph;
    for (id, block) in original.iter() {
        let after = reloaded.payload(id).unwrap();
        if id == target {
            assert_eq!(after.name(), Some("patched"));
        } else {
            assert_eq!(after, block.payload());
        }
        assert_eq!(
            reloaded.children(id, EdgeFilter::Any),
            original.children(id, EdgeFilter::Any)
        );
    }
}

#[test]
fn deletion_reindexes_links() {
    let bytes = serialize(&random_graph(3)).unwrap();
    let mut graph = load(&bytes).unwrap().graph;
    let victim = BlockId::from_raw(2);
    let deleted = graph.delete(victim).unwrap();
    let live = graph.len();
    let out = serialize(&graph).unwrap();
    let reloaded = load(&out).unwrap();
    assert!(reloaded.diagnostics.is_empty());
    assert_eq!(reloaded.graph.len(), live);
    assert!(deleted.contains(&victim));
}
