//! Structural consistency: subsumption arcs must be acyclic once entities
//! joined by equivalence are merged.

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;

use crate::entity::EntityId;
use crate::graph::{Relation, UnionFind};

/// Accumulated equivalence merges and subsumption arcs over a set of entities.
///
/// Entities get a local slot on first mention, so a structure can hold
/// relations that reach outside the clique it was seeded from.
#[derive(Debug, Clone, Default)]
pub struct Structure {
    slots: HashMap<EntityId, usize>,
    members: Vec<EntityId>,
    merged: UnionFind,
    arcs: Vec<(usize, usize)>,
}

impl Structure {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, entity: EntityId) -> usize {
        if let Some(&slot) = self.slots.get(&entity) {
            return slot;
        }
        let slot = self.merged.push();
        self.slots.insert(entity, slot);
        self.members.push(entity);
        slot
    }

    /// Declare `members` equivalent.
    pub fn merge(&mut self, members: &[EntityId]) {
        let mut iter = members.iter();
        let Some(&first) = iter.next() else {
            return;
        };
        let anchor = self.slot(first);
        for &m in iter {
            let slot = self.slot(m);
            self.merged.union(anchor, slot);
        }
    }

    /// Record a relation.
    pub fn add(&mut self, relation: &Relation) {
        match relation {
            Relation::SubsumedBy { sub, sup } => {
                let a = self.slot(*sub);
                let b = self.slot(*sup);
                self.arcs.push((a, b));
            }
            Relation::Equivalent { members } => self.merge(members),
        }
    }

    /// No cycle among subsumption arcs between distinct merged groups.
    pub fn is_consistent(&mut self) -> bool {
        let mut arcs: DiGraphMap<usize, ()> = DiGraphMap::new();
        for i in 0..self.arcs.len() {
            let (a, b) = self.arcs[i];
            let (ra, rb) = (self.merged.find(a), self.merged.find(b));
            if ra != rb {
                arcs.add_edge(ra, rb, ());
            }
        }
        !is_cyclic_directed(&arcs)
    }

    /// Whether adding `relation` keeps the structure consistent.
    pub fn admits(&self, relation: &Relation) -> bool {
        let mut trial = self.clone();
        trial.add(relation);
        trial.is_consistent()
    }

    /// Group `entities` by merged set. Keys are the smallest member of each
    /// group; entities never mentioned form singletons.
    pub fn clusters(&mut self, entities: &[EntityId]) -> BTreeMap<EntityId, Vec<EntityId>> {
        let mut by_root: BTreeMap<usize, Vec<EntityId>> = BTreeMap::new();
        let mut singletons = Vec::new();
        for &entity in entities {
            match self.slots.get(&entity).copied() {
                Some(slot) => by_root.entry(self.merged.find(slot)).or_default().push(entity),
                None => singletons.push(entity),
            }
        }
        let mut clusters: BTreeMap<EntityId, Vec<EntityId>> = by_root
            .into_values()
            .map(|mut members| {
                members.sort_unstable();
                (members[0], members)
            })
            .collect();
        for entity in singletons {
            clusters.insert(entity, vec![entity]);
        }
        clusters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(i: usize) -> EntityId {
        EntityId::new(i)
    }

    #[test]
    fn chain_is_consistent() {
        let mut s = Structure::new();
        s.add(&Relation::subsumed_by(e(0), e(1)));
        s.add(&Relation::subsumed_by(e(1), e(2)));
        assert!(s.is_consistent());
    }

    #[test]
    fn cycle_between_distinct_classes_is_rejected() {
        let mut s = Structure::new();
        s.add(&Relation::subsumed_by(e(0), e(1)));
        s.add(&Relation::subsumed_by(e(1), e(2)));
        assert!(!s.admits(&Relation::subsumed_by(e(2), e(0))));
    }

    #[test]
    fn cycle_inside_equivalence_cluster_is_allowed() {
        let mut s = Structure::new();
        s.add(&Relation::subsumed_by(e(0), e(1)));
        s.add(&Relation::subsumed_by(e(1), e(0)));
        assert!(!s.is_consistent());
        s.add(&Relation::equivalent([e(0), e(1)]));
        assert!(s.is_consistent());
    }

    #[test]
    fn clusters_key_on_smallest_member() {
        let mut s = Structure::new();
        s.add(&Relation::equivalent([e(4), e(2)]));
        let clusters = s.clusters(&[e(1), e(2), e(4)]);
        assert_eq!(clusters[&e(2)], vec![e(2), e(4)]);
        assert_eq!(clusters[&e(1)], vec![e(1)]);
    }
}
