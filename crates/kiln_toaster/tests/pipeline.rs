//! End-to-end toaster runs over files on disk.

use std::path::{Path, PathBuf};

use kiln_diagnostics::{Category, DiagnosticCode};
use kiln_graph::{
    load, serialize, BlockId, BoneWeight, Geometry, Graph, Link, Node, Payload, Primitives,
    SkinInstance, SkinPartitionData,
};
use kiln_spells::SpellRegistry;
use kiln_toaster::{CancelToken, FileStatus, ToastOptions, Toaster};

const DEGENERATE_TRIANGLE: DiagnosticCode = DiagnosticCode::new(Category::Kernel, 201);
const ZERO_WEIGHT_VERTEX: DiagnosticCode = DiagnosticCode::new(Category::Kernel, 202);

/// A skinned strip of four good triangles plus two degenerate ones, with
/// vertex 4 carrying no bone weight.
fn skinned_mesh() -> Graph {
    let mut g = Graph::new();
    let bones: Vec<BlockId> = (0..4)
        .map(|i| {
            g.add_block(
                Payload::Node(Node {
                    name: format!("bone{i}"),
                    scale: 1.0,
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
    let mut skin_links = vec![Link::owning(partition)];
    skin_links.extend(bones.iter().map(|&b| Link::referencing(b)));
    let skin = g
        .add_block(Payload::SkinInstance(SkinInstance { root_bone: 0 }), skin_links)
        .unwrap();

    let w = |bone: u16| vec![BoneWeight::new(bone, 1.0)];
    let geometry = Geometry {
        positions: (0..6).map(|i| [i as f32, (i % 2) as f32, 0.0]).collect(),
        primitives: Primitives::Triangles(vec![
            [0, 1, 2],
            [1, 1, 4],
            [2, 1, 3],
            [2, 3, 4],
            [5, 5, 5],
            [4, 3, 5],
        ]),
        weights: Some(vec![w(0), w(1), w(2), w(3), Vec::new(), w(1)]),
        ..Geometry::default()
    };
    let geometry = g
        .add_block(Payload::Geometry(geometry), vec![Link::owning(skin)])
        .unwrap();

    let mut root_links = vec![Link::owning(geometry)];
    root_links.extend(bones.iter().map(|&b| Link::owning(b)));
    let root = g
        .add_block(
            Payload::Node(Node {
                name: "scene".into(),
                scale: 1.0,
                ..Node::default()
            }),
            root_links,
        )
        .unwrap();
    g.add_root(root).unwrap();
    g
}

fn write_mesh(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serialize(&skinned_mesh()).unwrap()).unwrap();
}

fn options(inputs: Vec<PathBuf>, spells: &[&str]) -> ToastOptions {
    ToastOptions {
        inputs,
        spells: spells.iter().map(|s| s.to_string()).collect(),
        jobs: Some(2),
        ..ToastOptions::default()
    }
}

fn toast(options: ToastOptions) -> kiln_toaster::ToastReport {
    Toaster::new(SpellRegistry::with_builtins(), options)
        .unwrap()
        .run(&CancelToken::new())
        .unwrap()
}

#[test]
fn stripify_then_partition_reports_recoverable_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in/hero.kiln");
    write_mesh(&input);

    let mut opts = options(
        vec![dir.path().join("in")],
        &["opt_stripify", "fix_skin_partition"],
    );
    opts.kernels.max_bones_per_partition = 4;
    opts.dest_dir = Some(dir.path().join("out"));
    let report = toast(opts);

    assert_eq!(report.count_code(DEGENERATE_TRIANGLE), 2);
    assert_eq!(report.count_code(ZERO_WEIGHT_VERTEX), 1);
    assert_eq!(report.fatal_count(), 0);
    assert_eq!(report.exit_code(), 0);

    let output = dir.path().join("out/hero.kiln");
    assert_eq!(report.files[0].status, FileStatus::Written { output: output.clone() });
    let graph = load(&std::fs::read(&output).unwrap()).unwrap().graph;
    let mut saw_strips = false;
    let mut partition_triangles = 0;
    for (_, block) in graph.iter() {
        match block.payload() {
            Payload::Geometry(g) => saw_strips = matches!(g.primitives, Primitives::Strips(_)),
            Payload::SkinPartition(p) => {
                partition_triangles = p.partitions.iter().map(|p| p.triangles.len()).sum()
            }
            _ => {}
        }
    }
    assert!(saw_strips);
    assert_eq!(partition_triangles, 4);
    assert!(report.files[0]
        .diagnostics
        .iter()
        .all(|d| d.location.file.as_deref() == Some(input.display().to_string().as_str())));
}

#[test]
fn broken_file_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    write_mesh(&dir.path().join("a.kiln"));
    std::fs::write(dir.path().join("b.kiln"), b"KILN but not really").unwrap();
    write_mesh(&dir.path().join("c.kiln"));

    let mut opts = options(vec![dir.path().to_path_buf()], &["opt_stripify"]);
    opts.suffix = "_strip".into();
    let report = toast(opts);

    assert_eq!(report.files.len(), 3);
    assert_eq!(report.fatal_count(), 1);
    assert_eq!(report.written_count(), 2);
    assert_eq!(report.exit_code(), 1);
    assert!(dir.path().join("a_strip.kiln").exists());
    assert!(dir.path().join("c_strip.kiln").exists());
    assert!(!dir.path().join("b_strip.kiln").exists());
}

#[test]
fn include_pattern_and_resume() {
    let dir = tempfile::tempdir().unwrap();
    write_mesh(&dir.path().join("in/rock.kiln"));
    write_mesh(&dir.path().join("in/rock_lod1.kiln"));

    let make = || {
        let mut opts = options(vec![dir.path().join("in")], &["opt_stripify"]);
        opts.exclude = vec![r"_lod\d".into()];
        opts.dest_dir = Some(dir.path().join("out"));
        opts.resume = true;
        opts
    };
    let first = toast(make());
    assert_eq!(first.files.len(), 1);
    assert_eq!(first.written_count(), 1);
    assert!(!dir.path().join("out/rock_lod1.kiln").exists());

    let second = toast(make());
    assert!(matches!(second.files[0].status, FileStatus::Skipped { .. }));
}

#[test]
fn dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("mesh.kiln");
    write_mesh(&input);
    let before = std::fs::read(&input).unwrap();

    let mut opts = options(vec![input.clone()], &["check_triangles_atvr", "dump"]);
    opts.dry_run = true;
    let report = toast(opts);
    assert_eq!(report.files[0].status, FileStatus::DryRun);
    assert_eq!(std::fs::read(&input).unwrap(), before);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn patch_reproduces_the_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("mesh.kiln");
    write_mesh(&input);

    let mut direct = options(vec![input.clone()], &["opt_vertex_cache", "opt_stripify"]);
    direct.dest_dir = Some(dir.path().join("direct"));
    toast(direct);

    let mut patched = options(vec![input.clone()], &["opt_vertex_cache", "opt_stripify"]);
    patched.create_patch = true;
    let report = toast(patched);
    let patch = dir.path().join("mesh.kiln.patch");
    assert_eq!(report.files[0].status, FileStatus::Written { output: patch.clone() });

    let rebuilt = kiln_patch::apply(
        &std::fs::read(&input).unwrap(),
        &std::fs::read(&patch).unwrap(),
    )
    .unwrap();
    assert_eq!(rebuilt, std::fs::read(dir.path().join("direct/mesh.kiln")).unwrap());
}

#[test]
fn untouched_file_is_not_rewritten() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("mesh.kiln");
    write_mesh(&input);
    let report = toast(options(vec![input], &["check_readwrite"]));
    assert_eq!(report.files[0].status, FileStatus::Unchanged);
    assert_eq!(report.exit_code(), 0);
}
