//! Triangle reordering for the post-transform vertex cache.
//!
//! A greedy simulation of a FIFO cache: every vertex carries a score from its
//! cache position and from how many triangles still use it, and the next
//! triangle emitted is the best-scoring one among those whose scores changed
//! in the previous step.

use crate::is_degenerate;
use kiln_graph::Triangle;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet, VecDeque};

/// Cache size used when none is configured.
pub const DEFAULT_CACHE_SIZE: usize = 32;

const CACHE_DECAY_POWER: f64 = 1.5;
const LAST_TRI_SCORE: f64 = 0.75;
const VALENCE_BOOST_SCALE: f64 = 2.0;
const VALENCE_BOOST_POWER: f64 = 0.5;
const MAX_TRIANGLES_PER_VERTEX: usize = 255;

/// Precomputed vertex score tables for one cache size.
#[derive(Clone, Debug)]
pub struct VertexScore {
    cache_score: Vec<f64>,
    valence_score: Vec<f64>,
}

impl VertexScore {
    /// Builds the tables. Sizes below one are raised to one.
    pub fn new(cache_size: usize) -> Self {
        let size = cache_size.max(1);
        let cache_score = (0..size)
            .map(|pos| {
                if pos < 3 {
                    LAST_TRI_SCORE
                } else {
                    ((size - pos) as f64 / (size - 3) as f64).powf(CACHE_DECAY_POWER)
                }
            })
            .collect();
        let valence_score = (0..=MAX_TRIANGLES_PER_VERTEX)
            .map(|n| {
                if n == 0 {
                    0.0
                } else {
                    VALENCE_BOOST_SCALE * (n as f64).powf(-VALENCE_BOOST_POWER)
                }
            })
            .collect();
        Self {
            cache_score,
            valence_score,
        }
    }

    /// The modeled cache size.
    pub fn cache_size(&self) -> usize {
        self.cache_score.len()
    }

    /// Score of a vertex at `cache_position` (`None` when not cached) that
    /// is still used by `remaining` triangles.
    pub fn score(&self, cache_position: Option<usize>, remaining: usize) -> f64 {
        if remaining == 0 {
            return -1.0;
        }
        let cache = cache_position.map_or(0.0, |p| self.cache_score[p]);
        cache + self.valence_score[remaining.min(MAX_TRIANGLES_PER_VERTEX)]
    }
}

/// Output of [`optimize_triangles`].
#[derive(Clone, Debug, PartialEq)]
pub struct CacheOptimized {
    /// All input triangles, reordered; degenerate ones come last in input order.
    pub triangles: Vec<Triangle>,
    /// Input indices of the degenerate triangles.
    pub degenerate: Vec<usize>,
}

#[derive(PartialEq)]
struct Candidate {
    score: f64,
    triangle: usize,
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.triangle.cmp(&self.triangle))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reorders `triangles` for a FIFO vertex cache of `cache_size` entries.
///
/// The output is a permutation of the input: every triangle, duplicates
/// included, appears exactly once.
pub fn optimize_triangles(triangles: &[Triangle], cache_size: usize) -> CacheOptimized {
    let scorer = VertexScore::new(cache_size);
    let size = scorer.cache_size();

    let mut degenerate = Vec::new();
    let mut live: Vec<Triangle> = Vec::with_capacity(triangles.len());
    for (i, t) in triangles.iter().enumerate() {
        if is_degenerate(t) {
            degenerate.push(i);
        } else {
            live.push(*t);
        }
    }

    let vertex_count = live
        .iter()
        .flatten()
        .max()
        .map_or(0, |&m| m as usize + 1);
    let mut vertex_tris: Vec<Vec<usize>> = vec![Vec::new(); vertex_count];
    for (t, tri) in live.iter().enumerate() {
        for &v in tri {
            vertex_tris[v as usize].push(t);
        }
    }
    let mut cache_pos: Vec<Option<usize>> = vec![None; vertex_count];
    let mut vscore: Vec<f64> = vertex_tris
        .iter()
        .map(|tris| scorer.score(None, tris.len()))
        .collect();
    let tri_score = |tri: &Triangle, vscore: &[f64]| -> f64 {
        tri.iter().map(|&v| vscore[v as usize]).sum()
    };
    let mut tscore: Vec<f64> = live.iter().map(|t| tri_score(t, &vscore)).collect();
    let mut emitted = vec![false; live.len()];
    let mut heap: BinaryHeap<Candidate> = tscore
        .iter()
        .enumerate()
        .map(|(triangle, &score)| Candidate { score, triangle })
        .collect();

    let mut order: Vec<Triangle> = Vec::with_capacity(triangles.len());
    let mut cache: VecDeque<u32> = VecDeque::with_capacity(size + 3);
    let mut updated_tris: Vec<usize> = Vec::new();

    while order.len() < live.len() {
        let best = if updated_tris.is_empty() {
            let mut found = None;
            while let Some(c) = heap.pop() {
                if !emitted[c.triangle] && c.score.to_bits() == tscore[c.triangle].to_bits() {
                    found = Some(c.triangle);
                    break;
                }
            }
            match found {
                Some(t) => t,
                None => break,
            }
        } else {
            updated_tris
                .iter()
                .copied()
                .max_by(|&a, &b| {
                    tscore[a]
                        .total_cmp(&tscore[b])
                        .then_with(|| b.cmp(&a))
                })
                .unwrap_or(updated_tris[0])
        };

        emitted[best] = true;
        let tri = live[best];
        order.push(tri);

        let mut touched_vertices: HashSet<u32> = HashSet::new();
        let mut touched_tris: HashSet<usize> = HashSet::new();
        for &v in &tri {
            let list = &mut vertex_tris[v as usize];
            if let Some(p) = list.iter().position(|&t| t == best) {
                list.swap_remove(p);
            }
            touched_vertices.insert(v);
            touched_tris.extend(list.iter().copied());
        }
        for &v in &tri {
            if !cache.contains(&v) {
                cache.push_front(v);
                if cache.len() > size {
                    if let Some(evicted) = cache.pop_back() {
                        cache_pos[evicted as usize] = None;
                        touched_vertices.insert(evicted);
                        touched_tris.extend(vertex_tris[evicted as usize].iter().copied());
                    }
                }
            }
        }
        for (i, &v) in cache.iter().enumerate() {
            cache_pos[v as usize] = Some(i);
            touched_vertices.insert(v);
            touched_tris.extend(vertex_tris[v as usize].iter().copied());
        }
        for &v in &touched_vertices {
            vscore[v as usize] = scorer.score(cache_pos[v as usize], vertex_tris[v as usize].len());
        }
        updated_tris.clear();
        for t in touched_tris {
            let score = tri_score(&live[t], &vscore);
            tscore[t] = score;
            heap.push(Candidate { score, triangle: t });
            updated_tris.push(t);
        }
        updated_tris.sort_unstable();
    }

    order.extend(degenerate.iter().map(|&i| triangles[i]));
    CacheOptimized {
        triangles: order,
        degenerate,
    }
}

/// Average transform-to-vertex ratio: cache misses of a FIFO cache of
/// `cache_size` entries divided by the number of distinct vertices.
///
/// Triangle lists can be passed as strips of three. An empty input scores 1.
pub fn average_transform_to_vertex_ratio<S: AsRef<[u32]>>(strips: &[S], cache_size: usize) -> f64 {
    let size = cache_size.max(1);
    let mut cache: VecDeque<u32> = VecDeque::with_capacity(size + 1);
    let mut unique: HashSet<u32> = HashSet::new();
    let mut misses = 0usize;
    for strip in strips {
        for &v in strip.as_ref() {
            unique.insert(v);
            if !cache.contains(&v) {
                cache.push_front(v);
                if cache.len() > size {
                    cache.pop_back();
                }
                misses += 1;
            }
        }
    }
    if unique.is_empty() {
        1.0
    } else {
        misses as f64 / unique.len() as f64
    }
}

/// A vertex renumbering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VertexMap {
    /// New index of each old vertex.
    pub forward: Vec<u32>,
    /// Old index of each new vertex.
    pub inverse: Vec<u32>,
}

impl VertexMap {
    /// Applies the renumbering to index buffers.
    pub fn remap(&self, indices: &mut [u32]) {
        for i in indices {
            *i = self.forward[*i as usize];
        }
    }

    /// Returns `true` if no vertex moves.
    pub fn is_identity(&self) -> bool {
        self.forward.iter().enumerate().all(|(i, &n)| n as usize == i)
    }
}

/// Numbers vertices in order of first use by `strips`. Vertices below
/// `vertex_count` that are never used keep their relative order after all
/// used ones.
pub fn cache_optimized_vertex_map<S: AsRef<[u32]>>(strips: &[S], vertex_count: usize) -> VertexMap {
    let count = strips
        .iter()
        .flat_map(|s| s.as_ref().iter())
        .max()
        .map_or(0, |&m| m as usize + 1)
        .max(vertex_count);
    let mut forward: Vec<Option<u32>> = vec![None; count];
    let mut inverse: Vec<u32> = Vec::with_capacity(count);
    let used = strips.iter().flat_map(|s| s.as_ref().iter().copied());
    for old in used.chain(0..count as u32) {
        if forward[old as usize].is_none() {
            forward[old as usize] = Some(inverse.len() as u32);
            inverse.push(old);
        }
    }
    VertexMap {
        forward: forward.into_iter().map(|n| n.unwrap_or_default()).collect(),
        inverse,
    }
}
