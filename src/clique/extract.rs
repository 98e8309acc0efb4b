//! Clique extraction: cluster certain equivalences, then take connected
//! components of the cluster graph.
//!
//! Components are discovered by BFS from the smallest unvisited cluster with
//! neighbours visited in ascending order, so the output depends only on the
//! graph content, never on hash or insertion order.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;

use crate::entity::EntityId;
use crate::graph::{ProbabilisticGraph, Relation, UnionFind};

use super::Clique;

/// Union every certain equivalence, then collapse cycles of certain
/// subsumption arcs (a ⊑ b ⊑ a means a ≡ b).
pub fn certain_clusters(graph: &ProbabilisticGraph) -> UnionFind {
    let mut uf = UnionFind::new(graph.entity_count());
    for relation in graph.logical_edges() {
        if let Relation::Equivalent { members } = relation {
            for pair in members.windows(2) {
                uf.union(pair[0].index(), pair[1].index());
            }
        }
    }

    let mut arcs: DiGraphMap<usize, ()> = DiGraphMap::new();
    for relation in graph.logical_edges() {
        if let Relation::SubsumedBy { sub, sup } = relation {
            let (a, b) = (uf.find(sub.index()), uf.find(sup.index()));
            if a != b {
                arcs.add_edge(a, b, ());
            }
        }
    }
    for component in tarjan_scc(&arcs) {
        if component.len() > 1 {
            tracing::debug!(
                size = component.len(),
                "collapsing certain subsumption cycle into one cluster"
            );
            for pair in component.windows(2) {
                uf.union(pair[0], pair[1]);
            }
        }
    }
    uf
}

/// Partition the graph into cliques.
///
/// Entities without any edge are left out. Cliques are returned in ascending
/// order of their smallest member, which also names the clique.
pub fn extract_cliques(graph: &ProbabilisticGraph) -> Vec<Clique> {
    let mut uf = certain_clusters(graph);

    // Cluster adjacency over representatives.
    let mut adjacency: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
    let mut link = |uf: &mut UnionFind, a: EntityId, b: EntityId| {
        let (ra, rb) = (uf.find(a.index()), uf.find(b.index()));
        adjacency.entry(ra).or_default().insert(rb);
        adjacency.entry(rb).or_default().insert(ra);
    };
    for edge in graph.probabilistic_edges() {
        link(&mut uf, edge.source, edge.target);
    }
    for relation in graph.logical_edges() {
        let entities = relation.entities();
        for pair in entities.windows(2) {
            link(&mut uf, pair[0], pair[1]);
        }
    }

    // Connected components by BFS.
    let mut component_of: BTreeMap<usize, usize> = BTreeMap::new();
    let mut components: Vec<Vec<usize>> = Vec::new();
    for &start in adjacency.keys() {
        if component_of.contains_key(&start) {
            continue;
        }
        let id = components.len();
        let mut members = Vec::new();
        let mut queue = VecDeque::from([start]);
        component_of.insert(start, id);
        while let Some(rep) = queue.pop_front() {
            members.push(rep);
            for &next in &adjacency[&rep] {
                if !component_of.contains_key(&next) {
                    component_of.insert(next, id);
                    queue.push_back(next);
                }
            }
        }
        members.sort_unstable();
        components.push(members);
    }

    let groups = uf.groups();
    let mut cliques: Vec<Clique> = components
        .iter()
        .map(|reps| {
            let clusters: BTreeMap<EntityId, Vec<EntityId>> = reps
                .iter()
                .map(|&rep| {
                    let members = groups[&rep].iter().map(|&m| EntityId::new(m)).collect();
                    (EntityId::new(rep), members)
                })
                .collect();
            let mut entities: Vec<EntityId> = clusters.values().flatten().copied().collect();
            entities.sort_unstable();
            Clique {
                id: graph.entity(entities[0]).id.clone(),
                parent: None,
                entities,
                clusters,
                logical: Vec::new(),
                probabilistic: Vec::new(),
                promoted: Vec::new(),
                context: Vec::new(),
            }
        })
        .collect();

    // Edges go to the clique of their first endpoint; both endpoints share
    // a component by construction.
    for (i, edge) in graph.probabilistic_edges().iter().enumerate() {
        let c = component_of[&uf.find(edge.source.index())];
        cliques[c].probabilistic.push(i);
    }
    for (i, relation) in graph.logical_edges().iter().enumerate() {
        if let Some(anchor) = relation.anchor() {
            let c = component_of[&uf.find(anchor.index())];
            cliques[c].logical.push(i);
        }
    }

    tracing::info!(
        cliques = cliques.len(),
        entities = cliques.iter().map(|c| c.entities.len()).sum::<usize>(),
        "extracted cliques"
    );
    cliques
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, Hypothesis};

    fn graph(prob: &[(&str, &str)], logical: &[Relation], extra: &[&str]) -> ProbabilisticGraph {
        let mut b = GraphBuilder::new();
        for (x, y) in prob {
            let (x, y) = (b.identifier(x), b.identifier(y));
            b.probabilistic_edge(x, y, vec![(Hypothesis::Equivalent, 0.5)]);
        }
        for r in logical {
            b.logical_edge(r.clone());
        }
        for id in extra {
            b.identifier(id);
        }
        b.build().unwrap()
    }

    #[test]
    fn components_are_separate_cliques() {
        let g = graph(&[("A", "B"), ("C", "D"), ("B", "E")], &[], &["Z"]);
        let cliques = extract_cliques(&g);
        assert_eq!(cliques.len(), 2);
        assert_eq!(cliques[0].id, "A");
        assert_eq!(cliques[0].entities.len(), 3);
        assert_eq!(cliques[0].probabilistic.len(), 2);
        assert_eq!(cliques[1].id, "C");
        // Z has no edges and belongs to no clique.
        let z = g.lookup("Z").unwrap();
        assert!(cliques.iter().all(|c| !c.contains(z)));
    }

    #[test]
    fn certain_equivalence_collapses_into_cluster() {
        let mut b = GraphBuilder::new();
        let (a, bb, c) = (b.identifier("A"), b.identifier("B"), b.identifier("C"));
        b.logical_edge(Relation::equivalent([a, bb]));
        b.probabilistic_edge(bb, c, vec![(Hypothesis::Equivalent, 0.5)]);
        let g = b.build().unwrap();
        let cliques = extract_cliques(&g);
        assert_eq!(cliques.len(), 1);
        let clique = &cliques[0];
        assert_eq!(clique.clusters.len(), 2);
        let a = g.lookup("A").unwrap();
        let bb = g.lookup("B").unwrap();
        assert_eq!(clique.clusters[&a], vec![a, bb]);
        assert_eq!(clique.logical.len(), 1);
    }

    #[test]
    fn logical_subsumption_cycle_becomes_cluster() {
        let mut b = GraphBuilder::new();
        let (a, bb, c) = (b.identifier("A"), b.identifier("B"), b.identifier("C"));
        b.logical_edge(Relation::subsumed_by(a, bb));
        b.logical_edge(Relation::subsumed_by(bb, c));
        b.logical_edge(Relation::subsumed_by(c, a));
        let g = b.build().unwrap();
        let cliques = extract_cliques(&g);
        assert_eq!(cliques.len(), 1);
        assert_eq!(cliques[0].clusters.len(), 1);
        assert_eq!(cliques[0].logical.len(), 3);
    }

    #[test]
    fn extraction_is_insertion_order_independent() {
        let forward = graph(&[("A", "B"), ("B", "C"), ("D", "E")], &[], &[]);
        let backward = graph(&[("E", "D"), ("C", "B"), ("B", "A")], &[], &[]);
        assert_eq!(extract_cliques(&forward), extract_cliques(&backward));
    }
}
