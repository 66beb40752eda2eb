//! Greedy triangle stripifier over a directed-edge adjacency graph.
//!
//! Two triangles are adjacent when one contains the reverse of an edge of
//! the other, so every strip keeps the winding of its triangles. Strips are
//! seeded from the unstripped triangle with the fewest unstripped
//! neighbours and grown forwards, then backwards.

use crate::is_degenerate;
use crate::strip::stitch_strips;
use kiln_graph::{Strip, Triangle};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};

/// Output of [`stripify`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StripifyResult {
    /// The strips; a single strip when stitching was requested.
    pub strips: Vec<Strip>,
    /// Input indices of degenerate triangles that were dropped.
    pub degenerate: Vec<usize>,
    /// Stitch vertices inserted while joining strips.
    pub stitches: usize,
}

struct Face {
    verts: Triangle,
    /// Faces across the edge opposite each vertex, ascending.
    adjacent: [Vec<usize>; 3],
}

impl Face {
    fn slot(&self, v: u32) -> usize {
        self.verts.iter().position(|&x| x == v).unwrap_or(0)
    }

    fn next_vertex(&self, v: u32) -> u32 {
        self.verts[(self.slot(v) + 1) % 3]
    }

    fn adjacent_to(&self, v: u32) -> &[usize] {
        &self.adjacent[self.slot(v)]
    }
}

struct Mesh {
    faces: Vec<Face>,
}

impl Mesh {
    fn new(triangles: &[Triangle]) -> Self {
        let mut edges: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
        for (f, t) in triangles.iter().enumerate() {
            for i in 0..3 {
                edges.entry((t[i], t[(i + 1) % 3])).or_default().push(f);
            }
        }
        let faces = triangles
            .iter()
            .map(|&verts| {
                let adjacent = std::array::from_fn(|i| {
                    let (a, b) = (verts[(i + 1) % 3], verts[(i + 2) % 3]);
                    edges.get(&(b, a)).cloned().unwrap_or_default()
                });
                Face { verts, adjacent }
            })
            .collect();
        Self { faces }
    }

    fn unstripped_neighbour(&self, face: usize, v: u32, stripped: &[bool]) -> Option<usize> {
        self.faces[face]
            .adjacent_to(v)
            .iter()
            .copied()
            .find(|&n| !stripped[n])
    }

    fn degree(&self, face: usize, stripped: &[bool]) -> usize {
        self.faces[face]
            .adjacent
            .iter()
            .flatten()
            .filter(|&&n| !stripped[n])
            .count()
    }
}

/// A strip under construction.
struct StripBuilder {
    faces: VecDeque<usize>,
    vertices: VecDeque<u32>,
    reversed: bool,
}

impl StripBuilder {
    fn build(mesh: &Mesh, start_vertex: u32, start_face: usize, stripped: &mut [bool]) -> Self {
        let face = &mesh.faces[start_face];
        let v0 = start_vertex;
        let v1 = face.next_vertex(v0);
        let v2 = face.next_vertex(v1);
        stripped[start_face] = true;
        let mut s = Self {
            faces: VecDeque::from([start_face]),
            vertices: VecDeque::from([v0, v1, v2]),
            reversed: false,
        };
        s.traverse(mesh, v0, start_face, true, stripped);
        s.traverse(mesh, v2, start_face, false, stripped);
        s
    }

    /// Walks across the edge opposite `start_vertex`, appending (forward) or
    /// prepending faces until no unstripped neighbour remains.
    fn traverse(
        &mut self,
        mesh: &Mesh,
        start_vertex: u32,
        start_face: usize,
        forward: bool,
        stripped: &mut [bool],
    ) {
        let face = &mesh.faces[start_face];
        let mut pv0 = start_vertex;
        let mut pv1 = face.next_vertex(pv0);
        let mut pv2 = face.next_vertex(pv1);
        let mut count = 0usize;
        let mut next = mesh.unstripped_neighbour(start_face, pv0, stripped);
        while let Some(nf) = next {
            stripped[nf] = true;
            count += 1;
            let next_face = &mesh.faces[nf];
            if count % 2 == 1 {
                if forward {
                    pv0 = pv1;
                    pv1 = next_face.next_vertex(pv0);
                    self.vertices.push_back(pv1);
                    self.faces.push_back(nf);
                } else {
                    pv0 = pv2;
                    pv2 = next_face.next_vertex(pv1);
                    self.vertices.push_front(pv2);
                    self.faces.push_front(nf);
                    self.reversed = !self.reversed;
                }
            } else if forward {
                pv0 = pv2;
                pv2 = next_face.next_vertex(pv1);
                self.vertices.push_back(pv2);
                self.faces.push_back(nf);
            } else {
                pv0 = pv1;
                pv1 = next_face.next_vertex(pv0);
                self.vertices.push_front(pv1);
                self.faces.push_front(nf);
                self.reversed = !self.reversed;
            }
            next = mesh.unstripped_neighbour(nf, pv0, stripped);
        }
    }

    /// The strip in the winding of its faces.
    fn into_strip(self) -> Strip {
        let vertices: Vec<u32> = self.vertices.into();
        if !self.reversed {
            return vertices;
        }
        if vertices.len() % 2 == 1 {
            vertices.into_iter().rev().collect()
        } else if vertices.len() == 4 {
            vec![vertices[0], vertices[2], vertices[1], vertices[3]]
        } else {
            let mut strip = Vec::with_capacity(vertices.len() + 1);
            strip.push(vertices[0]);
            strip.extend(vertices);
            strip
        }
    }
}

/// Converts a triangle list into strips, optionally stitched into one.
///
/// Degenerate triangles are dropped and reported. Every other triangle
/// appears in exactly one strip with its winding preserved.
pub fn stripify(triangles: &[Triangle], stitch: bool) -> StripifyResult {
    let mut degenerate = Vec::new();
    let mut live = Vec::with_capacity(triangles.len());
    for (i, t) in triangles.iter().enumerate() {
        if is_degenerate(t) {
            degenerate.push(i);
        } else {
            live.push(*t);
        }
    }

    let mesh = Mesh::new(&live);
    let mut stripped = vec![false; live.len()];
    let mut degree: Vec<usize> = (0..live.len()).map(|f| mesh.degree(f, &stripped)).collect();
    let mut seeds: BinaryHeap<Reverse<(usize, usize)>> =
        degree.iter().enumerate().map(|(f, &d)| Reverse((d, f))).collect();

    let mut strips = Vec::new();
    while let Some(Reverse((d, seed))) = seeds.pop() {
        if stripped[seed] || d != degree[seed] {
            continue;
        }
        let face = &mesh.faces[seed];
        let start_vertex = face
            .verts
            .iter()
            .copied()
            .find(|&v| mesh.unstripped_neighbour(seed, v, &stripped).is_some())
            .unwrap_or(face.verts[0]);
        let builder = StripBuilder::build(&mesh, start_vertex, seed, &mut stripped);
        for &f in &builder.faces {
            for &n in mesh.faces[f].adjacent.iter().flatten() {
                if !stripped[n] {
                    let fresh = mesh.degree(n, &stripped);
                    if fresh != degree[n] {
                        degree[n] = fresh;
                        seeds.push(Reverse((fresh, n)));
                    }
                }
            }
        }
        strips.push(builder.into_strip());
    }

    let mut stitches = 0;
    if stitch && strips.len() > 1 {
        let (joined, n) = stitch_strips(&strips);
        strips = vec![joined];
        stitches = n;
    }
    log::trace!(
        "stripified {} triangles into {} strip(s), {} degenerate",
        live.len(),
        strips.len(),
        degenerate.len()
    );
    StripifyResult {
        strips,
        degenerate,
        stitches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strip::triangulate;

    fn canonical(mut tris: Vec<Triangle>) -> Vec<Triangle> {
        for t in &mut tris {
            let m = (0..3).min_by_key(|&i| t[i]).unwrap_or(0);
            t.rotate_left(m);
        }
        tris.sort();
        tris
    }

    fn check(triangles: &[Triangle]) {
        let live: Vec<Triangle> = triangles.iter().copied().filter(|t| !is_degenerate(t)).collect();
        for stitch in [false, true] {
            let out = stripify(triangles, stitch);
            assert_eq!(
                canonical(triangulate(&out.strips)),
                canonical(live.clone()),
                "stitch={stitch} strips={:?}",
                out.strips
            );
        }
    }

    #[test]
    fn quad_is_one_strip() {
        let out = stripify(&[[0, 1, 2], [2, 1, 3]], false);
        assert_eq!(out.strips.len(), 1);
        assert_eq!(out.strips[0].len(), 4);
        check(&[[0, 1, 2], [2, 1, 3]]);
    }

    #[test]
    fn fan_and_islands() {
        check(&[[0, 1, 4], [1, 2, 4], [2, 3, 4], [3, 0, 4]]);
        check(&[[0, 1, 2], [3, 4, 5], [6, 7, 8], [9, 10, 11]]);
        check(&[[0, 1, 2], [2, 1, 0]]);
        check(&[[0, 1, 2], [2, 1, 0], [1, 2, 3]]);
        check(&[[0, 1, 2], [0, 1, 3]]);
    }

    #[test]
    fn grid_preserves_winding() {
        check(&[
            [1, 5, 2], [5, 2, 6], [5, 9, 6], [9, 6, 10], [9, 13, 10], [13, 10, 14],
            [0, 4, 1], [4, 1, 5], [4, 8, 5], [8, 5, 9], [8, 12, 9], [12, 9, 13],
            [2, 6, 3], [6, 3, 7], [6, 10, 7], [10, 7, 11], [10, 14, 11], [14, 11, 15],
        ]);
        check(&[
            [1, 2, 3], [4, 5, 6], [6, 5, 7], [8, 5, 9], [4, 10, 9], [8, 3, 11],
            [8, 10, 3], [12, 13, 6], [14, 2, 15], [16, 13, 15], [16, 2, 3], [3, 2, 1],
        ]);
    }

    #[test]
    fn duplicates_and_degenerates() {
        let tris = [[354, 355, 356], [355, 356, 354], [357, 359, 358], [356, 355, 357], [1, 1, 2]];
        let out = stripify(&tris, false);
        assert_eq!(out.degenerate, vec![4]);
        check(&tris);
    }

    #[test]
    fn stitched_output_is_single_strip() {
        let out = stripify(&[[0, 1, 2], [3, 4, 5], [6, 7, 8]], true);
        assert_eq!(out.strips.len(), 1);
        assert!(out.stitches > 0);
    }
}
