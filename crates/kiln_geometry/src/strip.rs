//! Strip utilities: stitching, unstitching, and triangulation.

use kiln_graph::{Strip, Triangle};

/// A strip with its leading degenerate vertices folded into a winding flag.
///
/// A reversed strip is emitted with its first vertex doubled, which flips the
/// winding of every triangle that follows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrientedStrip {
    vertices: Vec<u32>,
    reversed: bool,
}

impl OrientedStrip {
    /// Builds an oriented strip, dropping degenerate vertices from both ends.
    /// Returns `None` if no non-degenerate triangle remains.
    pub fn new(strip: &[u32]) -> Option<Self> {
        let mut s = Self {
            vertices: strip.to_vec(),
            reversed: false,
        };
        s.compactify().then_some(s)
    }

    fn compactify(&mut self) -> bool {
        if self.vertices.len() < 3 {
            return false;
        }
        while self.vertices[0] == self.vertices[1] {
            self.vertices.remove(0);
            self.reversed = !self.reversed;
            if self.vertices.len() < 3 {
                return false;
            }
        }
        while self.vertices[self.vertices.len() - 1] == self.vertices[self.vertices.len() - 2] {
            self.vertices.pop();
            if self.vertices.len() < 3 {
                return false;
            }
        }
        true
    }

    /// The vertices without the winding prefix.
    pub fn vertices(&self) -> &[u32] {
        &self.vertices
    }

    /// Whether the strip starts with a doubled vertex.
    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// Reverses the vertex order, keeping every triangle's winding.
    pub fn reverse(&mut self) {
        self.vertices.reverse();
        if self.vertices.len() % 2 == 1 {
            self.reversed = !self.reversed;
        }
    }

    /// Number of stitch vertices needed to append `other` to `self`: zero to
    /// three, depending on a shared end vertex and matching parity.
    pub fn stitches_to(&self, other: &OrientedStrip) -> usize {
        let common = self.vertices.last() == other.vertices.first();
        let winding_match = if self.vertices.len() % 2 == 1 {
            self.reversed != other.reversed
        } else {
            self.reversed == other.reversed
        };
        match (common, winding_match) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        }
    }

    /// Appends `other` with the minimal number of stitch vertices.
    pub fn join(&self, other: &OrientedStrip) -> OrientedStrip {
        let stitches = self.stitches_to(other);
        let mut vertices = self.vertices.clone();
        let last = self.vertices[self.vertices.len() - 1];
        let first = other.vertices[0];
        if stitches >= 1 {
            vertices.push(last);
        }
        if stitches >= 2 {
            vertices.push(first);
        }
        if stitches >= 3 {
            vertices.push(first);
        }
        vertices.extend_from_slice(&other.vertices);
        OrientedStrip {
            vertices,
            reversed: self.reversed,
        }
    }

    /// The strip as emitted, including the winding prefix.
    pub fn to_strip(&self) -> Strip {
        let mut out = Vec::with_capacity(self.vertices.len() + 1);
        if self.reversed {
            out.push(self.vertices[0]);
        }
        out.extend_from_slice(&self.vertices);
        out
    }

    /// Length of the emitted strip.
    pub fn len(&self) -> usize {
        self.vertices.len() + usize::from(self.reversed)
    }

    /// Always `false`: an oriented strip holds at least one triangle.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Joins strips into one, choosing at each step the remaining strip and the
/// direction that need the fewest stitches. Returns the strip and the number
/// of stitch vertices inserted.
pub fn stitch_strips(strips: &[Strip]) -> (Strip, usize) {
    let mut pool: Vec<(OrientedStrip, OrientedStrip)> = strips
        .iter()
        .filter_map(|s| OrientedStrip::new(s))
        .map(|s| {
            let mut r = s.clone();
            r.reverse();
            (s, r)
        })
        .collect();
    let Some((mut result, _)) = pool.pop() else {
        return (Vec::new(), 0);
    };
    let mut stitches = 0;
    while !pool.is_empty() {
        let mut best: Option<(usize, usize, OrientedStrip)> = None;
        'search: for (i, (forward, backward)) in pool.iter().enumerate() {
            for (a, b) in [
                (&result, forward),
                (forward, &result),
                (&result, backward),
                (backward, &result),
            ] {
                let n = a.stitches_to(b);
                if best.as_ref().map_or(true, |(_, s, _)| n < *s) {
                    best = Some((i, n, a.join(b)));
                }
                if n == 0 {
                    break 'search;
                }
            }
        }
        let Some((index, n, joined)) = best else { break };
        pool.remove(index);
        stitches += n;
        result = joined;
    }
    let mut strip = result.to_strip();
    if strip.len() % 2 == 0 && strip[0] == strip[1] {
        strip.remove(0);
        strip.reverse();
    }
    (strip, stitches)
}

/// Splits a stitched strip back into strips without stitch vertices.
pub fn unstitch(strip: &[u32]) -> Vec<Strip> {
    let mut strips: Vec<Strip> = Vec::new();
    let mut current: Strip = Vec::new();
    let mut i = 0;
    while i + 1 < strip.len() {
        current.push(strip[i]);
        if strip[i] == strip[i + 1] {
            strips.push(std::mem::take(&mut current));
            if i % 2 == 0 {
                current.push(strip[i + 1]);
            }
        }
        i += 1;
    }
    current.extend_from_slice(&strip[i.min(strip.len())..]);
    strips.push(current);
    for s in &mut strips {
        while s.len() >= 3 && s[0] == s[1] && s[1] == s[2] {
            s.drain(..2);
        }
    }
    strips.retain(|s| s.len() > 3 || (s.len() == 3 && s[0] != s[1]));
    strips
}

/// Expands strips into triangles, skipping degenerate ones and flipping
/// every odd triangle back to the strip's winding.
pub fn triangulate<S: AsRef<[u32]>>(strips: &[S]) -> Vec<Triangle> {
    let mut out = Vec::new();
    for strip in strips {
        let s = strip.as_ref();
        for (k, w) in s.windows(3).enumerate() {
            let (a, b, c) = (w[0], w[1], w[2]);
            if a == b || b == c || c == a {
                continue;
            }
            out.push(if k % 2 == 0 { [a, b, c] } else { [a, c, b] });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(a: &[u32], b: &[u32]) -> Strip {
        OrientedStrip::new(a)
            .unwrap()
            .join(&OrientedStrip::new(b).unwrap())
            .to_strip()
    }

    #[test]
    fn compactify_folds_prefix() {
        let s = OrientedStrip::new(&[0, 0, 1, 2, 3]).unwrap();
        assert_eq!(s.vertices(), &[0, 1, 2, 3]);
        assert!(s.is_reversed());
        let s = OrientedStrip::new(&[0, 0, 0, 1, 2, 3, 3, 3, 3]).unwrap();
        assert_eq!(s.vertices(), &[0, 1, 2, 3]);
        assert!(!s.is_reversed());
        assert!(OrientedStrip::new(&[1, 1, 1]).is_none());
        assert!(OrientedStrip::new(&[1, 2]).is_none());
    }

    #[test]
    fn join_uses_minimal_stitches() {
        assert_eq!(joined(&[0, 1, 2, 3], &[3, 4, 5]), vec![0, 1, 2, 3, 3, 4, 5]);
        assert_eq!(joined(&[0, 1, 2], &[2, 2, 3, 4]), vec![0, 1, 2, 2, 3, 4]);
        assert_eq!(joined(&[0, 1, 2], &[2, 3, 4]), vec![0, 1, 2, 2, 2, 3, 4]);
        assert_eq!(joined(&[0, 1, 2, 3], &[7, 8, 9]), vec![0, 1, 2, 3, 3, 7, 7, 8, 9]);
        assert_eq!(joined(&[0, 1, 2], &[7, 8, 9]), vec![0, 1, 2, 2, 7, 7, 7, 8, 9]);
    }

    #[test]
    fn stitch_picks_order_and_direction() {
        assert_eq!(stitch_strips(&[vec![3, 4, 5], vec![0, 1, 2, 3]]).0, vec![0, 1, 2, 3, 3, 4, 5]);
        assert_eq!(stitch_strips(&[vec![3, 2, 1, 0], vec![3, 4, 5]]).0, vec![0, 1, 2, 3, 3, 4, 5]);
        assert_eq!(stitch_strips(&[vec![2, 3, 4], vec![0, 1, 2]]).0, vec![0, 1, 2, 2, 2, 3, 4]);
        assert_eq!(stitch_strips(&[vec![7, 8, 9], vec![0, 1, 2]]).0, vec![0, 1, 2, 2, 9, 9, 8, 7]);
        let (strip, stitches) = stitch_strips(&[vec![7, 7, 8, 9], vec![0, 1, 2, 3]]);
        assert_eq!(strip, vec![3, 2, 1, 0, 0, 9, 9, 8, 7]);
        assert_eq!(stitches, 2);
        assert_eq!(stitch_strips(&[]), (vec![], 0));
    }

    #[test]
    fn stitching_preserves_triangles() {
        let strips = vec![vec![0, 1, 2, 3], vec![4, 5, 6], vec![6, 7, 8, 9, 10]];
        let mut before = triangulate(&strips);
        let (stitched, _) = stitch_strips(&strips);
        let mut after = triangulate(&[stitched]);
        let canon = |t: &mut Triangle| {
            let m = (0..3).min_by_key(|&i| t[i]).unwrap_or(0);
            t.rotate_left(m);
        };
        before.iter_mut().for_each(canon);
        after.iter_mut().for_each(canon);
        before.sort();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn unstitch_splits_at_stitches() {
        assert_eq!(
            unstitch(&[0, 1, 2, 2, 3, 3, 4, 5, 6, 7, 8]),
            vec![vec![0, 1, 2], vec![3, 3, 4, 5, 6, 7, 8]]
        );
        assert_eq!(
            unstitch(&[0, 1, 2, 3, 4, 4, 4, 4, 4, 5, 6, 7, 8]),
            vec![vec![0, 1, 2, 3, 4], vec![4, 5, 6, 7, 8]]
        );
        assert!(unstitch(&[0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 4, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8]).is_empty());
    }

    #[test]
    fn triangulate_flips_odd_triangles() {
        assert_eq!(
            triangulate(&[vec![1, 0, 1, 2, 3, 4, 5, 6]]),
            vec![[0, 2, 1], [1, 2, 3], [2, 4, 3], [3, 4, 5], [4, 6, 5]]
        );
    }
}
