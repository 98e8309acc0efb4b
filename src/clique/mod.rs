//! Cliques: independently solvable regions of the probabilistic graph.
//!
//! - [`extract`] partitions the graph into connected regions after collapsing
//!   certain equivalences into clusters.
//! - [`split`] breaks regions with too many probabilistic edges into
//!   sub-cliques so exhaustive search stays tractable.
//! - [`consistency`] holds the structural check shared by the splitter and
//!   the solver.
//!
//! A [`Clique`] stores only indices into the [`ProbabilisticGraph`]; it never
//! copies entities or edges.

pub mod consistency;
pub mod extract;
pub mod split;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::entity::EntityId;
use crate::graph::{Hypothesis, ProbabilisticGraph, Relation};

pub use consistency::Structure;
pub use extract::extract_cliques;
pub use split::{SplitLimits, SplitOutcome, split_clique};

/// A probabilistic edge whose hypothesis was fixed by the splitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Promotion {
    /// Index into [`ProbabilisticGraph::probabilistic_edges`].
    pub edge: usize,
    /// The hypothesis now treated as certain.
    pub hypothesis: Hypothesis,
    /// Probability the table gave that hypothesis.
    pub prior: f64,
}

/// A connected region of entities and edges that is solved as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Clique {
    /// Identifier of the smallest member entity; sub-cliques append `.n`.
    pub id: String,
    /// Id of the clique this one was split from.
    pub parent: Option<String>,
    /// Every member entity, sorted.
    pub entities: Vec<EntityId>,
    /// Certain clusters: representative (smallest member) → members.
    pub clusters: BTreeMap<EntityId, Vec<EntityId>>,
    /// Owned logical edge indices, sorted.
    pub logical: Vec<usize>,
    /// Owned probabilistic edge indices still open for search, sorted by
    /// endpoint pair.
    pub probabilistic: Vec<usize>,
    /// Owned probabilistic edges fixed by the splitter.
    pub promoted: Vec<Promotion>,
    /// Fixed relations owned by sibling sub-cliques, plus relations chosen
    /// for siblings solved earlier. Used for consistency only; never emitted
    /// as axioms of this clique.
    pub context: Vec<Relation>,
}

impl Clique {
    /// Number of probabilistic edges left for the solver.
    pub fn probabilistic_edge_count(&self) -> usize {
        self.probabilistic.len()
    }

    /// Whether `entity` is a member.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.binary_search(&entity).is_ok()
    }

    /// The top-level clique id this clique descends from.
    pub fn root_id(&self) -> &str {
        self.parent.as_deref().unwrap_or(&self.id)
    }

    /// Certain relations this clique owns: its logical edges plus the
    /// non-`NoRelation` promotions.
    pub fn owned_relations(&self, graph: &ProbabilisticGraph) -> Vec<Relation> {
        let mut relations: Vec<Relation> = self
            .logical
            .iter()
            .map(|&i| graph.logical_edge(i).clone())
            .collect();
        relations.extend(self.promoted.iter().filter_map(|p| {
            p.hypothesis
                .relation(graph.probabilistic_edge(p.edge))
        }));
        relations
    }

    /// Every edge this clique owns, as `(logical, probabilistic)` index
    /// lists; promoted edges count as probabilistic.
    pub fn owned_edges(&self) -> (Vec<usize>, Vec<usize>) {
        let mut probabilistic = self.probabilistic.clone();
        probabilistic.extend(self.promoted.iter().map(|p| p.edge));
        probabilistic.sort_unstable();
        (self.logical.clone(), probabilistic)
    }

    /// A consistency structure seeded with this clique's clusters, owned
    /// certain relations and context.
    pub fn certain_structure(&self, graph: &ProbabilisticGraph) -> Structure {
        let mut structure = Structure::new();
        for members in self.clusters.values() {
            structure.merge(members);
        }
        for relation in self.owned_relations(graph).iter().chain(&self.context) {
            structure.add(relation);
        }
        structure
    }
}
