//! Incremental 3-D QuickHull with fallbacks for degenerate point sets.

use crate::warning::KernelWarning;
use glam::DVec3;
use std::collections::{HashMap, VecDeque};

/// Distance below which points count as coincident, collinear, or coplanar.
pub const DEFAULT_PRECISION: f64 = 1e-4;

/// The convex hull of a point set, by dimension.
#[derive(Clone, Debug, PartialEq)]
pub enum Hull {
    /// No input points.
    Empty,
    /// All points coincide.
    Point(DVec3),
    /// All points are collinear; the two extremes.
    Segment(DVec3, DVec3),
    /// All points are coplanar.
    Polygon {
        /// Boundary vertices, counter-clockwise around `normal`.
        vertices: Vec<DVec3>,
        /// Unit normal of the plane.
        normal: DVec3,
    },
    /// A proper polytope.
    Polytope {
        /// Extreme points.
        vertices: Vec<DVec3>,
        /// Outward-wound faces indexing `vertices`.
        faces: Vec<[u32; 3]>,
    },
}

impl Hull {
    /// Extreme points of the hull.
    pub fn vertices(&self) -> Vec<DVec3> {
        match self {
            Hull::Empty => Vec::new(),
            Hull::Point(p) => vec![*p],
            Hull::Segment(a, b) => vec![*a, *b],
            Hull::Polygon { vertices, .. } | Hull::Polytope { vertices, .. } => vertices.clone(),
        }
    }

    /// Outward bounding planes as `(unit normal, offset)` with
    /// `normal · p = offset` on the plane.
    ///
    /// A polygon yields its two faces and one plane per edge; points and
    /// segments yield none.
    pub fn face_planes(&self) -> Vec<(DVec3, f64)> {
        match self {
            Hull::Polytope { vertices, faces } => faces
                .iter()
                .filter_map(|f| {
                    let [a, b, c] = f.map(|i| vertices[i as usize]);
                    let n = (b - a).cross(c - a).try_normalize()?;
                    Some((n, n.dot(a)))
                })
                .collect(),
            Hull::Polygon { vertices, normal } => {
                let Some(&first) = vertices.first() else {
                    return Vec::new();
                };
                let d = normal.dot(first);
                let mut planes = vec![(*normal, d), (-*normal, -d)];
                for (i, &a) in vertices.iter().enumerate() {
                    let b = vertices[(i + 1) % vertices.len()];
                    if let Some(n) = (b - a).cross(*normal).try_normalize() {
                        planes.push((n, n.dot(a)));
                    }
                }
                planes
            }
            _ => Vec::new(),
        }
    }
}

/// A hull and the number of input points that are not among its vertices.
#[derive(Clone, Debug, PartialEq)]
pub struct HullResult {
    /// The hull.
    pub hull: Hull,
    /// Input points that lie inside the hull or on its surface.
    pub discarded: usize,
}

impl HullResult {
    /// Warnings for the degenerate cases.
    pub fn warnings(&self) -> Vec<KernelWarning> {
        let mut out = Vec::new();
        let dimension = match self.hull {
            Hull::Empty | Hull::Point(_) => Some(0),
            Hull::Segment(..) => Some(1),
            Hull::Polygon { .. } => Some(2),
            Hull::Polytope { .. } => None,
        };
        if let Some(dimension) = dimension {
            out.push(KernelWarning::ReducedHull { dimension });
        }
        if self.discarded > 0 {
            out.push(KernelWarning::DiscardedHullPoints {
                count: self.discarded,
            });
        }
        out
    }
}

/// Signed distance from `p` to the plane through `a`, `b`, `c`, positive on
/// the side the right-hand normal points to.
fn plane_distance(a: DVec3, b: DVec3, c: DVec3, p: DVec3) -> f64 {
    match (b - a).cross(c - a).try_normalize() {
        Some(n) => n.dot(p - a),
        None => 0.0,
    }
}

fn axis_distance(a: DVec3, b: DVec3, p: DVec3) -> f64 {
    let dir = b - a;
    let len = dir.length();
    if len == 0.0 {
        (p - a).length()
    } else {
        dir.cross(p - a).length() / len
    }
}

/// Up to four well-separated points: one if all coincide, two if collinear,
/// three if coplanar. Four points are ordered so the fourth lies on the
/// positive side of the first three.
fn base_simplex(points: &[DVec3], precision: f64) -> Vec<usize> {
    let extent = |axis: usize| {
        let (lo, hi) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p[axis]), hi.max(p[axis]))
        });
        hi - lo
    };
    let mut axes = [0usize, 1, 2];
    axes.sort_by(|&a, &b| extent(b).total_cmp(&extent(a)));
    let key = |i: usize| axes.map(|a| points[i][a]);
    let cmp_key = |a: &usize, b: &usize| {
        let (ka, kb) = (key(*a), key(*b));
        ka[0]
            .total_cmp(&kb[0])
            .then(ka[1].total_cmp(&kb[1]))
            .then(ka[2].total_cmp(&kb[2]))
    };
    let indices = 0..points.len();
    let (Some(v0), Some(v1)) = (indices.clone().min_by(cmp_key), indices.clone().max_by(cmp_key))
    else {
        return Vec::new();
    };
    if points[v0].distance(points[v1]) < precision {
        return vec![v0];
    }
    let farthest = |f: &dyn Fn(usize) -> f64| {
        indices
            .clone()
            .max_by(|&a, &b| f(a).total_cmp(&f(b)))
            .unwrap_or(v0)
    };
    let v2 = farthest(&|i| axis_distance(points[v0], points[v1], points[i]));
    if axis_distance(points[v0], points[v1], points[v2]) < precision {
        return vec![v0, v1];
    }
    let (p0, p1, p2) = (points[v0], points[v1], points[v2]);
    let v3 = farthest(&|i| plane_distance(p0, p1, p2, points[i]).abs());
    let orientation = plane_distance(p0, p1, p2, points[v3]);
    if orientation > precision {
        vec![v0, v1, v2, v3]
    } else if orientation < -precision {
        vec![v1, v0, v2, v3]
    } else {
        vec![v0, v1, v2]
    }
}

/// Vertices of the 2-D dome over `base` whose points lie on the left of
/// `base[0] -> base[1]` when viewed against `normal`.
fn dome(points: &[DVec3], candidates: &[usize], base: [usize; 2], normal: DVec3, precision: f64) -> Vec<usize> {
    let (a, b) = (points[base[0]], points[base[1]]);
    let Some(out_dir) = normal.cross(b - a).try_normalize() else {
        return base.to_vec();
    };
    let outer: Vec<(f64, usize)> = candidates
        .iter()
        .map(|&i| (out_dir.dot(points[i] - a), i))
        .filter(|(d, _)| *d > precision)
        .collect();
    let Some(&(_, pivot)) = outer.iter().max_by(|x, y| x.0.total_cmp(&y.0)) else {
        return base.to_vec();
    };
    let outer: Vec<usize> = outer.into_iter().map(|(_, i)| i).collect();
    let mut left = dome(points, &outer, [base[0], pivot], normal, precision);
    let right = dome(points, &outer, [pivot, base[1]], normal, precision);
    left.extend_from_slice(&right[1..]);
    left
}

fn polygon(points: &[DVec3], base: &[usize], precision: f64) -> Hull {
    let (p0, p1, p2) = (points[base[0]], points[base[1]], points[base[2]]);
    let normal = (p1 - p0).cross(p2 - p0).normalize_or_zero();
    let all: Vec<usize> = (0..points.len()).collect();
    let mut ring = dome(points, &all, [base[0], base[1]], normal, precision);
    let back = dome(points, &all, [base[1], base[0]], normal, precision);
    ring.extend_from_slice(&back[1..back.len() - 1]);
    let mut vertices: Vec<DVec3> = ring.into_iter().map(|i| points[i]).collect();
    let mut area = DVec3::ZERO;
    for (i, &a) in vertices.iter().enumerate() {
        area += a.cross(vertices[(i + 1) % vertices.len()]);
    }
    if area.dot(normal) < 0.0 {
        vertices.reverse();
    }
    Hull::Polygon { vertices, normal }
}

struct Face {
    v: [usize; 3],
    normal: DVec3,
    offset: f64,
    outside: Vec<usize>,
    alive: bool,
}

impl Face {
    fn distance(&self, p: DVec3) -> f64 {
        self.normal.dot(p) - self.offset
    }
}

struct Builder<'a> {
    points: &'a [DVec3],
    precision: f64,
    faces: Vec<Face>,
    edges: HashMap<(usize, usize), usize>,
}

impl Builder<'_> {
    fn add_face(&mut self, v: [usize; 3]) -> usize {
        let [a, b, c] = v.map(|i| self.points[i]);
        let normal = (b - a).cross(c - a).normalize_or_zero();
        let id = self.faces.len();
        self.faces.push(Face {
            v,
            normal,
            offset: normal.dot(a),
            outside: Vec::new(),
            alive: true,
        });
        for k in 0..3 {
            self.edges.insert((v[k], v[(k + 1) % 3]), id);
        }
        id
    }

    fn remove_face(&mut self, id: usize) {
        let v = self.faces[id].v;
        self.faces[id].alive = false;
        for k in 0..3 {
            let key = (v[k], v[(k + 1) % 3]);
            if self.edges.get(&key) == Some(&id) {
                self.edges.remove(&key);
            }
        }
    }

    /// Hands each point to the new face it lies farthest outside of.
    /// Returns the number of points inside every candidate face.
    fn assign(&mut self, points: &[usize], candidates: &[usize]) -> usize {
        let mut inside = 0;
        for &p in points {
            let pos = self.points[p];
            let best = candidates
                .iter()
                .map(|&f| (self.faces[f].distance(pos), f))
                .filter(|(d, _)| *d > self.precision)
                .max_by(|a, b| a.0.total_cmp(&b.0));
            match best {
                Some((_, f)) => self.faces[f].outside.push(p),
                None => inside += 1,
            }
        }
        inside
    }

    fn run(&mut self) {
        let mut pending: VecDeque<usize> = (0..self.faces.len()).collect();
        while let Some(start) = pending.pop_front() {
            if !self.faces[start].alive || self.faces[start].outside.is_empty() {
                continue;
            }
            let face = &self.faces[start];
            let pivot = face
                .outside
                .iter()
                .copied()
                .max_by(|&a, &b| {
                    face.distance(self.points[a])
                        .total_cmp(&face.distance(self.points[b]))
                })
                .unwrap_or(face.outside[0]);
            let apex = self.points[pivot];

            let mut visible = vec![start];
            let mut seen = vec![start];
            let mut queue = VecDeque::from([start]);
            let mut horizon: Vec<(usize, usize)> = Vec::new();
            while let Some(f) = queue.pop_front() {
                let v = self.faces[f].v;
                for k in 0..3 {
                    let (a, b) = (v[k], v[(k + 1) % 3]);
                    let Some(&n) = self.edges.get(&(b, a)) else {
                        horizon.push((a, b));
                        continue;
                    };
                    if seen.contains(&n) {
                        if !visible.contains(&n) {
                            horizon.push((a, b));
                        }
                        continue;
                    }
                    seen.push(n);
                    if self.faces[n].distance(apex) > 0.0 {
                        visible.push(n);
                        queue.push_back(n);
                    } else {
                        horizon.push((a, b));
                    }
                }
            }

            let mut orphans: Vec<usize> = Vec::new();
            for &f in &visible {
                orphans.append(&mut self.faces[f].outside);
                self.remove_face(f);
            }
            orphans.retain(|&p| p != pivot);
            let new_faces: Vec<usize> = horizon
                .iter()
                .map(|&(a, b)| self.add_face([a, b, pivot]))
                .collect();
            self.assign(&orphans, &new_faces);
            pending.extend(new_faces);
        }
    }
}

/// Builds the convex hull of `points`.
///
/// `precision` is the distance below which a point counts as lying on a
/// face; larger values give simpler hulls whose faces may miss points by at
/// most that distance.
pub fn convex_hull(points: &[DVec3], precision: f64) -> HullResult {
    let base = base_simplex(points, precision);
    let hull = match base.len() {
        0 => Hull::Empty,
        1 => Hull::Point(points[base[0]]),
        2 => Hull::Segment(points[base[0]], points[base[1]]),
        3 => polygon(points, &base, precision),
        _ => polytope(points, &base, precision),
    };
    let kept = match &hull {
        Hull::Empty => 0,
        Hull::Point(_) => 1,
        Hull::Segment(..) => 2,
        Hull::Polygon { vertices, .. } | Hull::Polytope { vertices, .. } => vertices.len(),
    };
    HullResult {
        hull,
        discarded: points.len().saturating_sub(kept),
    }
}

fn polytope(points: &[DVec3], base: &[usize], precision: f64) -> Hull {
    let mut b = Builder {
        points,
        precision,
        faces: Vec::new(),
        edges: HashMap::new(),
    };
    let s = [base[0], base[1], base[2], base[3]];
    let initial: Vec<usize> = [[1, 0, 2], [0, 1, 3], [0, 3, 2], [3, 1, 2]]
        .iter()
        .map(|idx| b.add_face(idx.map(|i| s[i])))
        .collect();
    let rest: Vec<usize> = (0..points.len()).filter(|i| !s.contains(i)).collect();
    b.assign(&rest, &initial);
    b.run();

    let mut remap: HashMap<usize, u32> = HashMap::new();
    let mut vertices = Vec::new();
    let mut faces = Vec::new();
    for face in b.faces.iter().filter(|f| f.alive) {
        let tri = face.v.map(|p| {
            *remap.entry(p).or_insert_with(|| {
                vertices.push(points[p]);
                (vertices.len() - 1) as u32
            })
        });
        faces.push(tri);
    }
    Hull::Polytope { vertices, faces }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube() -> Vec<DVec3> {
        let mut pts = Vec::new();
        for x in [0.0, 1.0] {
            for y in [0.0, 1.0] {
                for z in [0.0, 1.0] {
                    pts.push(DVec3::new(x, y, z));
                }
            }
        }
        pts.push(DVec3::splat(0.5));
        pts
    }

    #[test]
    fn tetrahedron() {
        let pts = [DVec3::ZERO, DVec3::X, DVec3::Y, DVec3::Z];
        let out = convex_hull(&pts, DEFAULT_PRECISION);
        match &out.hull {
            Hull::Polytope { vertices, faces } => {
                assert_eq!(vertices.len(), 4);
                assert_eq!(faces.len(), 4);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(out.discarded, 0);
        assert!(out.warnings().is_empty());
    }

    #[test]
    fn cube_has_twelve_outward_faces() {
        let pts = cube();
        let out = convex_hull(&pts, DEFAULT_PRECISION);
        let Hull::Polytope { vertices, faces } = &out.hull else {
            panic!("expected a polytope");
        };
        assert_eq!(vertices.len(), 8);
        assert_eq!(faces.len(), 12);
        assert_eq!(out.discarded, 1);
        let centroid = vertices.iter().copied().sum::<DVec3>() / vertices.len() as f64;
        for (n, d) in out.hull.face_planes() {
            assert!(n.dot(centroid) < d);
        }
    }

    #[test]
    fn degenerate_inputs() {
        assert_eq!(convex_hull(&[], DEFAULT_PRECISION).hull, Hull::Empty);
        let p = DVec3::new(1.0, 2.0, 3.0);
        assert_eq!(convex_hull(&[p, p, p], DEFAULT_PRECISION).hull, Hull::Point(p));
        let line = [DVec3::ZERO, DVec3::X * 0.5, DVec3::X];
        let out = convex_hull(&line, DEFAULT_PRECISION);
        match out.hull {
            Hull::Segment(a, b) => {
                assert_eq!(a.min(b), DVec3::ZERO);
                assert_eq!(a.max(b), DVec3::X);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(out.discarded, 1);
    }

    #[test]
    fn unit_square() {
        let pts = [
            DVec3::ZERO,
            DVec3::X,
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::Y,
            DVec3::new(0.5, 0.5, 0.0),
        ];
        let out = convex_hull(&pts, DEFAULT_PRECISION);
        let Hull::Polygon { vertices, normal } = &out.hull else {
            panic!("expected a polygon");
        };
        assert_eq!(vertices.len(), 4);
        assert!((normal.z.abs() - 1.0).abs() < 1e-12);
        assert_eq!(out.warnings()[0], KernelWarning::ReducedHull { dimension: 2 });
        assert_eq!(out.hull.face_planes().len(), 6);
    }

    #[test]
    fn precision_merges_close_points() {
        let mut pts: Vec<DVec3> = cube().into_iter().map(|p| p * DVec3::new(2.0, 1.0, 1.0)).collect();
        pts.push(DVec3::new(1.0, 1.001, 0.5));
        let coarse = convex_hull(&pts, 0.01);
        assert_eq!(coarse.hull.vertices().len(), 8);
        assert_eq!(coarse.discarded, 2);
        let fine = convex_hull(&pts, DEFAULT_PRECISION);
        assert_eq!(fine.hull.vertices().len(), 9);
    }
}
