//! Clique splitting: bound the number of probabilistic edges the solver sees.
//!
//! A clique over the bound is cut along a maximum spanning forest of its
//! cluster graph into groups of at most `clique_split_size` entities, so
//! strongly connected clusters stay together. Probabilistic edges that cross
//! a cut are fixed to their most probable hypothesis that keeps the certain
//! relations acyclic (no-relation is always admissible) and become
//! *promotions*. Groups still over the bound are cut again with a smaller
//! size; a single cluster that is still over the bound has its weakest edges
//! promoted until it fits.
//!
//! Every promotion made while splitting one clique is checked against the
//! same structure, so the fixed relations of all sub-cliques are consistent
//! together. Each sub-clique carries the fixed relations of its siblings as
//! `context`.
//!
//! Every entity and edge of the input ends up owned by exactly one
//! sub-clique. The result is optimal per sub-clique only.

use std::collections::{BTreeSet, HashMap};

use crate::entity::EntityId;
use crate::graph::{Hypothesis, ProbabilisticGraph, Relation};
use crate::warning::ResolutionWarning;

use super::{Clique, Promotion, Structure};

/// Bounds applied by the splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitLimits {
    /// Maximum probabilistic edges per (sub-)clique.
    pub max_probabilistic_edges: usize,
    /// Maximum entities per sub-clique when a split is needed.
    pub clique_split_size: usize,
}

impl Default for SplitLimits {
    fn default() -> Self {
        Self {
            max_probabilistic_edges: 9,
            clique_split_size: 6,
        }
    }
}

/// Sub-cliques produced from one clique.
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    pub cliques: Vec<Clique>,
    /// Set whenever the clique had to be split.
    pub warning: Option<ResolutionWarning>,
}

/// Split `clique` until every part is within `limits`.
///
/// Cliques already within the bound are returned unchanged.
pub fn split_clique(graph: &ProbabilisticGraph, clique: Clique, limits: SplitLimits) -> SplitOutcome {
    if clique.probabilistic_edge_count() <= limits.max_probabilistic_edges {
        return SplitOutcome {
            cliques: vec![clique],
            warning: None,
        };
    }

    let root = clique.id.clone();
    let edges = clique.probabilistic_edge_count();
    let mut structure = clique.certain_structure(graph);
    let mut parts = Vec::new();
    let mut promoted = 0;
    split_into(
        graph,
        clique,
        limits.max_probabilistic_edges,
        limits.clique_split_size.max(1),
        &mut structure,
        &mut parts,
        &mut promoted,
    );
    attach_sibling_context(graph, &mut parts);

    tracing::warn!(
        clique = %root,
        edges,
        sub_cliques = parts.len(),
        promoted,
        "clique exceeds probabilistic edge bound, split greedily"
    );
    SplitOutcome {
        warning: Some(ResolutionWarning::DegradedSplit {
            clique: root,
            sub_cliques: parts.len(),
            promoted,
        }),
        cliques: parts,
    }
}

fn split_into(
    graph: &ProbabilisticGraph,
    mut clique: Clique,
    max_edges: usize,
    size: usize,
    structure: &mut Structure,
    out: &mut Vec<Clique>,
    promoted: &mut usize,
) {
    if clique.probabilistic_edge_count() <= max_edges {
        out.push(clique);
        return;
    }

    let mut size = size;
    let groups = loop {
        let groups = group_clusters(graph, &clique, size);
        if groups.len() > 1 || size <= 1 {
            break groups;
        }
        size -= 1;
    };

    if groups.len() <= 1 {
        *promoted += promote_surplus(graph, &mut clique, max_edges, structure);
        out.push(clique);
        return;
    }

    let next = size.saturating_sub(1).max(1);
    for part in partition(graph, clique, &groups, structure, promoted) {
        split_into(graph, part, max_edges, next, structure, out, promoted);
    }
}

/// Give every part the fixed relations owned by all of its siblings.
fn attach_sibling_context(graph: &ProbabilisticGraph, parts: &mut [Clique]) {
    let owned: Vec<Vec<Relation>> = parts.iter().map(|p| p.owned_relations(graph)).collect();
    for (i, part) in parts.iter_mut().enumerate() {
        let mut context: Vec<Relation> = owned
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .flat_map(|(_, relations)| relations.iter().cloned())
            .collect();
        context.sort();
        context.dedup();
        part.context = context;
    }
}

/// Group the clique's clusters along a maximum spanning forest.
///
/// Returns groups of cluster representatives. A group is seeded with the
/// smallest unassigned cluster and grows by the heaviest forest edge to an
/// unassigned cluster that still fits within `size` entities.
fn group_clusters(graph: &ProbabilisticGraph, clique: &Clique, size: usize) -> Vec<Vec<EntityId>> {
    let reps: Vec<EntityId> = clique.clusters.keys().copied().collect();
    let sizes: Vec<usize> = clique.clusters.values().map(Vec::len).collect();
    let mut position: HashMap<EntityId, usize> = HashMap::new();
    for (pos, members) in clique.clusters.values().enumerate() {
        for &m in members {
            position.insert(m, pos);
        }
    }

    let mut weighted: Vec<(f64, (EntityId, EntityId), usize, usize)> = Vec::new();
    let mut push = |w: f64, a: EntityId, b: EntityId| {
        if let (Some(&pa), Some(&pb)) = (position.get(&a), position.get(&b)) {
            if pa != pb {
                weighted.push((w, (a.min(b), a.max(b)), pa, pb));
            }
        }
    };
    for &i in &clique.probabilistic {
        let edge = graph.probabilistic_edge(i);
        push(edge.weight(), edge.source, edge.target);
    }
    for &i in &clique.logical {
        for pair in graph.logical_edge(i).entities().windows(2) {
            push(f64::INFINITY, pair[0], pair[1]);
        }
    }
    for p in &clique.promoted {
        let edge = graph.probabilistic_edge(p.edge);
        push(f64::INFINITY, edge.source, edge.target);
    }
    weighted.sort_by(|x, y| y.0.total_cmp(&x.0).then(x.1.cmp(&y.1)));

    // Kruskal.
    let mut forest = crate::graph::UnionFind::new(reps.len());
    let mut tree: Vec<Vec<(f64, usize)>> = vec![Vec::new(); reps.len()];
    for (w, _, a, b) in weighted {
        if forest.union(a, b) {
            tree[a].push((w, b));
            tree[b].push((w, a));
        }
    }

    let mut assigned = vec![false; reps.len()];
    let mut groups = Vec::new();
    for start in 0..reps.len() {
        if assigned[start] {
            continue;
        }
        assigned[start] = true;
        let mut group = vec![start];
        let mut total = sizes[start];
        loop {
            let mut best: Option<(f64, usize)> = None;
            for &member in &group {
                for &(w, next) in &tree[member] {
                    if assigned[next] || total + sizes[next] > size {
                        continue;
                    }
                    let better = match best {
                        None => true,
                        Some((bw, bn)) => w > bw || (w == bw && next < bn),
                    };
                    if better {
                        best = Some((w, next));
                    }
                }
            }
            let Some((_, next)) = best else {
                break;
            };
            assigned[next] = true;
            total += sizes[next];
            group.push(next);
        }
        group.sort_unstable();
        groups.push(group.into_iter().map(|i| reps[i]).collect());
    }
    groups
}

/// Distribute the clique's entities and edges over `groups`, promoting
/// probabilistic edges that cross a group boundary.
fn partition(
    graph: &ProbabilisticGraph,
    clique: Clique,
    groups: &[Vec<EntityId>],
    structure: &mut Structure,
    promoted: &mut usize,
) -> Vec<Clique> {
    let root = clique.root_id().to_string();

    let mut group_of: HashMap<EntityId, usize> = HashMap::new();
    let mut parts: Vec<Clique> = groups
        .iter()
        .enumerate()
        .map(|(g, reps)| {
            let clusters: std::collections::BTreeMap<EntityId, Vec<EntityId>> = reps
                .iter()
                .map(|rep| (*rep, clique.clusters[rep].clone()))
                .collect();
            let mut entities: Vec<EntityId> = clusters.values().flatten().copied().collect();
            entities.sort_unstable();
            for &e in &entities {
                group_of.insert(e, g);
            }
            Clique {
                id: format!("{}.{}", clique.id, g + 1),
                parent: Some(root.clone()),
                entities,
                clusters,
                logical: Vec::new(),
                probabilistic: Vec::new(),
                promoted: Vec::new(),
                context: Vec::new(),
            }
        })
        .collect();

    for &i in &clique.logical {
        let owner = graph
            .logical_edge(i)
            .anchor()
            .and_then(|a| group_of.get(&a).copied())
            .unwrap_or(0);
        parts[owner].logical.push(i);
    }

    for p in &clique.promoted {
        let edge = graph.probabilistic_edge(p.edge);
        let owner = group_of
            .get(&edge.source)
            .or_else(|| group_of.get(&edge.target))
            .copied()
            .unwrap_or(0);
        parts[owner].promoted.push(*p);
    }

    for &i in &clique.probabilistic {
        let edge = graph.probabilistic_edge(i);
        let (gs, gt) = (group_of[&edge.source], group_of[&edge.target]);
        if gs == gt {
            parts[gs].probabilistic.push(i);
            continue;
        }
        let promotion = promote(graph, structure, i);
        *promoted += 1;
        parts[gs].promoted.push(promotion);
    }

    parts
}

/// Fix edge `index` to its most probable hypothesis admissible in `structure`.
fn promote(graph: &ProbabilisticGraph, structure: &mut Structure, index: usize) -> Promotion {
    let edge = graph.probabilistic_edge(index);
    for (hypothesis, prior) in edge.ranked() {
        if prior <= 0.0 && hypothesis != Hypothesis::NoRelation {
            continue;
        }
        match hypothesis.relation(edge) {
            None => {
                return Promotion {
                    edge: index,
                    hypothesis,
                    prior,
                };
            }
            Some(relation) if structure.admits(&relation) => {
                structure.add(&relation);
                return Promotion {
                    edge: index,
                    hypothesis,
                    prior,
                };
            }
            Some(_) => {}
        }
    }
    Promotion {
        edge: index,
        hypothesis: Hypothesis::NoRelation,
        prior: edge.probability_of(Hypothesis::NoRelation),
    }
}

/// Promote the weakest open edges until at most `max_edges` remain.
fn promote_surplus(
    graph: &ProbabilisticGraph,
    clique: &mut Clique,
    max_edges: usize,
    structure: &mut Structure,
) -> usize {
    let surplus = clique.probabilistic_edge_count().saturating_sub(max_edges);
    if surplus == 0 {
        return 0;
    }
    let mut order = clique.probabilistic.clone();
    order.sort_by(|&a, &b| {
        let (ea, eb) = (graph.probabilistic_edge(a), graph.probabilistic_edge(b));
        ea.weight().total_cmp(&eb.weight()).then(a.cmp(&b))
    });
    let chosen: BTreeSet<usize> = order.into_iter().take(surplus).collect();
    for &i in &chosen {
        let promotion = promote(graph, structure, i);
        clique.promoted.push(promotion);
    }
    clique.probabilistic.retain(|i| !chosen.contains(i));
    tracing::debug!(clique = %clique.id, surplus, "promoted weakest edges of unsplittable clique");
    surplus
}
