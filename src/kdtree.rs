//! 3D kd-tree for nearest-neighbor search on unit-sphere points.
//!
//! The master catalog is indexed exactly once; the refinement loop then asks
//! for the single nearest master point to each (progressively corrected)
//! working point. Distances are Euclidean chord lengths between unit vectors,
//! a monotonic proxy for angular separation at the sub-arcsecond scales the
//! loop operates at.
//!
//! Ties are broken toward the lowest original point index so queries are
//! deterministic regardless of tree layout.

/// Nearest-neighbor query result: original point index and chord distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub dist: f64,
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        dim: usize,
        value: f64,
        left: usize,
        right: usize,
    },
    /// Range [start..end) into the reordered point storage.
    Leaf { start: usize, end: usize },
}

/// Points per leaf before a split is introduced.
const LEAF_SIZE: usize = 8;

/// A static kd-tree over 3D points.
#[derive(Debug, Clone)]
pub struct KdTree {
    nodes: Vec<Node>,
    points: Vec<[f64; 3]>,
    indices: Vec<u32>,
}

impl KdTree {
    /// Build a tree from a point set. Original slice positions are preserved
    /// as the indices reported by [`KdTree::nearest`].
    pub fn build(points: &[[f64; 3]]) -> Self {
        let mut entries: Vec<(u32, [f64; 3])> = points
            .iter()
            .enumerate()
            .map(|(i, &p)| (i as u32, p))
            .collect();

        let mut nodes = Vec::new();
        if !entries.is_empty() {
            build_node(&mut nodes, &mut entries, 0);
        }

        Self {
            nodes,
            points: entries.iter().map(|e| e.1).collect(),
            indices: entries.iter().map(|e| e.0).collect(),
        }
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the tree holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Find the single nearest point to `query` by Euclidean distance.
    ///
    /// Equidistant candidates resolve to the lowest original index.
    /// Returns `None` only for an empty tree.
    pub fn nearest(&self, query: &[f64; 3]) -> Option<Neighbor> {
        if self.points.is_empty() {
            return None;
        }
        let mut best_dsq = f64::INFINITY;
        let mut best_idx = usize::MAX;
        self.nearest_node(0, query, &mut best_dsq, &mut best_idx);
        Some(Neighbor {
            index: best_idx,
            dist: best_dsq.sqrt(),
        })
    }

    fn nearest_node(
        &self,
        node: usize,
        query: &[f64; 3],
        best_dsq: &mut f64,
        best_idx: &mut usize,
    ) {
        match self.nodes[node] {
            Node::Leaf { start, end } => {
                for i in start..end {
                    let dsq = dist_sq(query, &self.points[i]);
                    let idx = self.indices[i] as usize;
                    if dsq < *best_dsq || (dsq == *best_dsq && idx < *best_idx) {
                        *best_dsq = dsq;
                        *best_idx = idx;
                    }
                }
            }
            Node::Split {
                dim,
                value,
                left,
                right,
            } => {
                let diff = query[dim] - value;
                let (near, far) = if diff <= 0.0 { (left, right) } else { (right, left) };
                self.nearest_node(near, query, best_dsq, best_idx);
                // <= so an equal-distance lower index across the plane is still seen
                if diff * diff <= *best_dsq {
                    self.nearest_node(far, query, best_dsq, best_idx);
                }
            }
        }
    }
}

fn build_node(nodes: &mut Vec<Node>, entries: &mut [(u32, [f64; 3])], offset: usize) -> usize {
    if entries.len() <= LEAF_SIZE {
        let idx = nodes.len();
        nodes.push(Node::Leaf {
            start: offset,
            end: offset + entries.len(),
        });
        return idx;
    }

    let dim = widest_dimension(entries);
    let mid = entries.len() / 2;
    entries.select_nth_unstable_by(mid, |a, b| a.1[dim].total_cmp(&b.1[dim]));
    let value = entries[mid].1[dim];

    let idx = nodes.len();
    nodes.push(Node::Leaf { start: 0, end: 0 }); // placeholder, patched below

    let (lo, hi) = entries.split_at_mut(mid);
    let left = build_node(nodes, lo, offset);
    let right = build_node(nodes, hi, offset + mid);
    nodes[idx] = Node::Split {
        dim,
        value,
        left,
        right,
    };
    idx
}

fn widest_dimension(entries: &[(u32, [f64; 3])]) -> usize {
    let mut best_dim = 0;
    let mut best_spread = f64::NEG_INFINITY;
    for d in 0..3 {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for e in entries {
            let v = e.1[d];
            lo = lo.min(v);
            hi = hi.max(v);
        }
        if hi - lo > best_spread {
            best_spread = hi - lo;
            best_dim = d;
        }
    }
    best_dim
}

#[inline]
fn dist_sq(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree() {
        let tree = KdTree::build(&[]);
        assert!(tree.is_empty());
        assert!(tree.nearest(&[0.0, 0.0, 1.0]).is_none());
    }

    #[test]
    fn single_point() {
        let tree = KdTree::build(&[[1.0, 2.0, 3.0]]);
        for query in [[1.0, 2.0, 3.0], [0.0, 0.0, 0.0], [-5.0, 1.0, 2.0]] {
            let n = tree.nearest(&query).unwrap();
            assert_eq!(n.index, 0);
            let direct = dist_sq(&query, &[1.0, 2.0, 3.0]).sqrt();
            assert!((n.dist - direct).abs() < 1e-12);
        }
    }

    #[test]
    fn tie_breaks_to_lowest_index() {
        // Duplicate points: every query must resolve to index 0.
        let points = vec![[0.5, 0.5, 0.5]; 20];
        let tree = KdTree::build(&points);
        let n = tree.nearest(&[0.5, 0.5, 0.6]).unwrap();
        assert_eq!(n.index, 0);

        // Two points symmetric about the query.
        let tree = KdTree::build(&[[1.0, 0.0, 0.0], [-1.0, 0.0, 0.0]]);
        let n = tree.nearest(&[0.0, 0.0, 0.0]).unwrap();
        assert_eq!(n.index, 0);
    }

    #[test]
    fn brute_force_equivalence() {
        let mut state: u64 = 0x9e3779b97f4a7c15;
        let mut rng = || -> f64 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state as f64) / (u64::MAX as f64) * 2.0 - 1.0
        };

        let n = 800;
        let points: Vec<[f64; 3]> = (0..n).map(|_| [rng(), rng(), rng()]).collect();
        let tree = KdTree::build(&points);
        assert_eq!(tree.len(), n);

        for _ in 0..200 {
            let query = [rng(), rng(), rng()];
            let got = tree.nearest(&query).unwrap();

            let (want_idx, want_dsq) = points
                .iter()
                .enumerate()
                .map(|(i, p)| (i, dist_sq(&query, p)))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .unwrap();

            assert_eq!(got.index, want_idx);
            assert!((got.dist - want_dsq.sqrt()).abs() < 1e-12);
        }
    }

    #[test]
    fn index_preservation() {
        let points = vec![
            [0.0, 0.0, 1.0],
            [0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.577, 0.577, 0.577],
        ];
        let tree = KdTree::build(&points);
        for (i, p) in points.iter().enumerate() {
            let n = tree.nearest(p).unwrap();
            assert_eq!(n.index, i);
            assert!(n.dist < 1e-12);
        }
    }
}
