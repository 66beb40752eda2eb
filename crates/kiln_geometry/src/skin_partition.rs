//! Splits a skinned mesh into partitions that each fit a hardware bone
//! palette.

use crate::stripify::stripify;
use crate::warning::KernelWarning;
use kiln_graph::{BoneWeight, Influence, Partition, Triangle};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// What to do with vertices that carry no usable weight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZeroWeightPolicy {
    /// Bind the vertex fully to this bone.
    AssignRootBone(u16),
    /// Drop every triangle that uses the vertex.
    DropTriangles,
}

impl Default for ZeroWeightPolicy {
    fn default() -> Self {
        ZeroWeightPolicy::AssignRootBone(0)
    }
}

/// Bounds and output options for [`partition_skin`].
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionOptions {
    /// Most bones one partition may reference.
    pub max_bones_per_partition: usize,
    /// Most vertices one partition may hold.
    pub max_vertices_per_partition: Option<usize>,
    /// Most triangles one partition may hold.
    pub max_triangles_per_partition: Option<usize>,
    /// Most influences kept per vertex.
    pub max_bones_per_vertex: Option<usize>,
    /// Also emit strips for each partition.
    pub stripify: bool,
    /// Stitch each partition's strips into one.
    pub stitch_strips: bool,
    /// Sort influences by bone and pad them to the partition's width.
    pub pad_bones: bool,
    /// Handling of weightless vertices.
    pub zero_weight: ZeroWeightPolicy,
}

impl Default for PartitionOptions {
    fn default() -> Self {
        Self {
            max_bones_per_partition: 4,
            max_vertices_per_partition: None,
            max_triangles_per_partition: None,
            max_bones_per_vertex: Some(4),
            stripify: false,
            stitch_strips: true,
            pad_bones: false,
            zero_weight: ZeroWeightPolicy::default(),
        }
    }
}

/// Rejected inputs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PartitionError {
    /// A bound is too small to hold a single triangle.
    #[error("invalid bound: {0}")]
    InvalidBound(String),

    /// A triangle names a vertex that has no weight list.
    #[error("triangle {triangle} uses vertex {vertex}, but only {count} vertices have weights")]
    VertexOutOfRange {
        /// Index of the triangle.
        triangle: usize,
        /// The vertex.
        vertex: u32,
        /// Number of weight lists.
        count: usize,
    },

    /// The seed face map does not cover every triangle.
    #[error("face map has {found} entries for {expected} triangles")]
    FaceMapLength {
        /// Number of triangles.
        expected: usize,
        /// Entries in the map.
        found: usize,
    },
}

/// Output of [`partition_skin`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PartitionResult {
    /// The partitions in creation order.
    pub partitions: Vec<Partition>,
    /// Input indices of triangles left out.
    pub dropped_triangles: Vec<usize>,
    /// Problems found along the way.
    pub warnings: Vec<KernelWarning>,
}

#[derive(Default)]
struct OpenPartition {
    group: u32,
    bones: BTreeSet<u16>,
    local: HashMap<u32, u32>,
    vertex_map: Vec<u32>,
    triangles: Vec<Triangle>,
}

impl OpenPartition {
    fn new_vertices(&self, t: &Triangle) -> usize {
        let mut seen: Vec<u32> = Vec::with_capacity(3);
        for v in t {
            if !self.local.contains_key(v) && !seen.contains(v) {
                seen.push(*v);
            }
        }
        seen.len()
    }

    fn accepts(&self, group: u32, bones: &BTreeSet<u16>, t: &Triangle, opts: &PartitionOptions) -> bool {
        if self.group != group {
            return false;
        }
        if self.bones.union(bones).count() > opts.max_bones_per_partition {
            return false;
        }
        if let Some(max) = opts.max_vertices_per_partition {
            if self.vertex_map.len() + self.new_vertices(t) > max {
                return false;
            }
        }
        if let Some(max) = opts.max_triangles_per_partition {
            if self.triangles.len() >= max {
                return false;
            }
        }
        true
    }

    fn add(&mut self, bones: &BTreeSet<u16>, t: &Triangle) {
        self.bones.extend(bones.iter().copied());
        let mut local = [0u32; 3];
        for (slot, &v) in t.iter().enumerate() {
            let next = self.vertex_map.len() as u32;
            local[slot] = *self.local.entry(v).or_insert(next);
            if local[slot] == next {
                self.vertex_map.push(v);
            }
        }
        self.triangles.push(local);
    }
}

/// Drops non-positive weights, merges duplicate bones, keeps the strongest
/// `max` influences, and normalizes. Returns the cleaned list sorted by
/// descending weight and the influence count before trimming.
fn clean_weights(list: &[BoneWeight], max: Option<usize>) -> (Vec<BoneWeight>, usize) {
    let mut merged: BTreeMap<u16, f32> = BTreeMap::new();
    for w in list.iter().filter(|w| w.weight.is_finite() && w.weight > 0.0) {
        *merged.entry(w.bone).or_insert(0.0) += w.weight;
    }
    let mut out: Vec<BoneWeight> = merged
        .into_iter()
        .map(|(bone, weight)| BoneWeight::new(bone, weight))
        .collect();
    out.sort_by(|a, b| b.weight.total_cmp(&a.weight).then(a.bone.cmp(&b.bone)));
    let before = out.len();
    if let Some(max) = max {
        out.truncate(max.max(1));
    }
    normalize(&mut out);
    (out, before)
}

fn normalize(list: &mut [BoneWeight]) {
    let total: f32 = list.iter().map(|w| w.weight).sum();
    if total > 0.0 {
        list.iter_mut().for_each(|w| w.weight /= total);
    }
}

/// Partitions the triangles of a skinned mesh.
///
/// `weights` holds each vertex's influences as indices into the skin's bone
/// list. When `face_map` is given, triangles with different entries never
/// share a partition. Every triangle not reported in
/// [`PartitionResult::dropped_triangles`] lands in exactly one partition.
pub fn partition_skin(
    weights: &[Vec<BoneWeight>],
    triangles: &[Triangle],
    face_map: Option<&[u32]>,
    opts: &PartitionOptions,
) -> Result<PartitionResult, PartitionError> {
    if opts.max_bones_per_partition == 0 {
        return Err(PartitionError::InvalidBound(
            "max_bones_per_partition must be at least 1".into(),
        ));
    }
    if opts.max_vertices_per_partition.is_some_and(|m| m < 3) {
        return Err(PartitionError::InvalidBound(
            "max_vertices_per_partition must be at least 3".into(),
        ));
    }
    if opts.max_triangles_per_partition == Some(0) {
        return Err(PartitionError::InvalidBound(
            "max_triangles_per_partition must be at least 1".into(),
        ));
    }
    if let Some(map) = face_map {
        if map.len() != triangles.len() {
            return Err(PartitionError::FaceMapLength {
                expected: triangles.len(),
                found: map.len(),
            });
        }
    }
    for (i, t) in triangles.iter().enumerate() {
        if let Some(&v) = t.iter().find(|&&v| v as usize >= weights.len()) {
            return Err(PartitionError::VertexOutOfRange {
                triangle: i,
                vertex: v,
                count: weights.len(),
            });
        }
    }

    let mut warnings = Vec::new();
    let mut weightless = vec![false; weights.len()];
    let mut cleaned: Vec<Vec<BoneWeight>> = Vec::with_capacity(weights.len());
    for (v, list) in weights.iter().enumerate() {
        let (mut clean, before) = clean_weights(list, opts.max_bones_per_vertex);
        if before > clean.len() {
            warnings.push(KernelWarning::VertexBonesTrimmed {
                vertex: v as u32,
                from: before,
                to: clean.len(),
            });
        }
        if clean.is_empty() {
            warnings.push(KernelWarning::ZeroWeightVertex { vertex: v as u32 });
            match opts.zero_weight {
                ZeroWeightPolicy::AssignRootBone(root) => clean.push(BoneWeight::new(root, 1.0)),
                ZeroWeightPolicy::DropTriangles => weightless[v] = true,
            }
        }
        cleaned.push(clean);
    }

    let mut open: Vec<OpenPartition> = Vec::new();
    let mut dropped = Vec::new();
    for (i, t) in triangles.iter().enumerate() {
        if t.iter().any(|&v| weightless[v as usize]) {
            dropped.push(i);
            continue;
        }
        let mut bones = triangle_bones(&cleaned, t);
        if bones.len() > opts.max_bones_per_partition {
            warnings.push(KernelWarning::BoneBoundExceeded {
                triangle: i,
                bones: bones.len(),
                bound: opts.max_bones_per_partition,
            });
            trim_triangle(&mut cleaned, t, opts.max_bones_per_partition);
            bones = triangle_bones(&cleaned, t);
        }
        let group = face_map.map_or(0, |m| m[i]);
        match open.iter_mut().find(|p| p.accepts(group, &bones, t, opts)) {
            Some(p) => p.add(&bones, t),
            None => {
                let mut p = OpenPartition {
                    group,
                    ..OpenPartition::default()
                };
                p.add(&bones, t);
                open.push(p);
            }
        }
    }

    let partitions = open
        .into_iter()
        .map(|p| finish(p, &cleaned, opts))
        .collect::<Vec<_>>();
    log::debug!(
        "partitioned {} triangles into {} partition(s), {} dropped",
        triangles.len(),
        partitions.len(),
        dropped.len()
    );
    Ok(PartitionResult {
        partitions,
        dropped_triangles: dropped,
        warnings,
    })
}

fn triangle_bones(weights: &[Vec<BoneWeight>], t: &Triangle) -> BTreeSet<u16> {
    t.iter()
        .flat_map(|&v| weights[v as usize].iter().map(|w| w.bone))
        .collect()
}

/// Restricts the triangle's vertices to the `bound` bones with the largest
/// summed weight over the triangle. Partitions that already hold one of
/// these vertices drop the removed influences when they are finished.
fn trim_triangle(weights: &mut [Vec<BoneWeight>], t: &Triangle, bound: usize) {
    let mut totals: BTreeMap<u16, f32> = BTreeMap::new();
    for &v in t {
        for w in &weights[v as usize] {
            *totals.entry(w.bone).or_insert(0.0) += w.weight;
        }
    }
    let mut ranked: Vec<(u16, f32)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    let keep: BTreeSet<u16> = ranked.iter().take(bound).map(|(b, _)| *b).collect();
    for &v in t {
        let list = &mut weights[v as usize];
        list.retain(|w| keep.contains(&w.bone));
        if list.is_empty() {
            if let Some(&(bone, _)) = ranked.first() {
                list.push(BoneWeight::new(bone, 1.0));
            }
        }
        normalize(list);
    }
}

fn finish(p: OpenPartition, weights: &[Vec<BoneWeight>], opts: &PartitionOptions) -> Partition {
    let bones: Vec<u16> = p.bones.into_iter().collect();
    let local_bone = |bone: u16| bones.iter().position(|&b| b == bone).unwrap_or(0) as u16;
    let mut influences: Vec<Vec<Influence>> = p
        .vertex_map
        .iter()
        .map(|&v| {
            let mut kept: Vec<BoneWeight> = weights[v as usize]
                .iter()
                .copied()
                .filter(|w| bones.contains(&w.bone))
                .collect();
            normalize(&mut kept);
            if kept.is_empty() {
                return vec![Influence { bone: 0, weight: 1.0 }];
            }
            kept.iter()
                .map(|w| Influence {
                    bone: local_bone(w.bone),
                    weight: w.weight,
                })
                .collect()
        })
        .collect();
    if opts.pad_bones {
        let width = influences.iter().map(Vec::len).max().unwrap_or(0);
        for list in &mut influences {
            list.sort_by_key(|i| i.bone);
            while list.len() < width {
                list.push(Influence { bone: 0, weight: 0.0 });
            }
        }
    } else {
        for list in &mut influences {
            list.sort_by(|a, b| b.weight.total_cmp(&a.weight).then(a.bone.cmp(&b.bone)));
        }
    }
    let strips = if opts.stripify {
        stripify(&p.triangles, opts.stitch_strips).strips
    } else {
        Vec::new()
    };
    Partition {
        bones,
        vertex_map: p.vertex_map,
        influences,
        triangles: p.triangles,
        strips,
    }
}
