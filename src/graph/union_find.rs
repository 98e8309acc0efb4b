//! Disjoint-set forest over dense indices.
//!
//! `find` and `union` are the only mutating operations. The smaller root
//! always becomes the representative, so the representative of a set is its
//! smallest member regardless of the order unions are applied in.

use std::collections::BTreeMap;

/// Union-find with path halving.
#[derive(Debug, Clone, Default)]
pub struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    /// Create `n` singleton sets `0..n`.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    /// Add a new singleton set and return its index.
    pub fn push(&mut self) -> usize {
        let idx = self.parent.len();
        self.parent.push(idx);
        idx
    }

    /// Representative of `x`'s set.
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets of `a` and `b`. Returns `false` if they were already joined.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.parent[child] = root;
        true
    }

    /// All sets, keyed by representative, members ascending.
    pub fn groups(&mut self) -> BTreeMap<usize, Vec<usize>> {
        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for x in 0..self.parent.len() {
            let root = self.find(x);
            groups.entry(root).or_default().push(x);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smallest_member_is_representative() {
        let mut uf = UnionFind::new(5);
        uf.union(4, 3);
        uf.union(3, 1);
        assert_eq!(uf.find(4), 1);
        assert_eq!(uf.find(3), 1);
        assert_eq!(uf.find(0), 0);
    }

    #[test]
    fn union_reports_new_merges_only() {
        let mut uf = UnionFind::new(3);
        assert!(uf.union(0, 2));
        assert!(!uf.union(2, 0));
    }

    #[test]
    fn groups_partition_all_elements() {
        let mut uf = UnionFind::new(4);
        uf.union(0, 2);
        let idx = uf.push();
        uf.union(idx, 3);
        let groups = uf.groups();
        assert_eq!(groups[&0], vec![0, 2]);
        assert_eq!(groups[&1], vec![1]);
        assert_eq!(groups[&3], vec![3, 4]);
    }
}
