//! Probabilistic graph model: entities joined by certain and uncertain edges.
//!
//! - **Logical edges** are certain [`Relation`]s (subsumption or equivalence).
//! - **Probabilistic edges** ([`ProbabilisticEdge`]) carry a probability table
//!   over the [`Hypothesis`] set for one unordered entity pair.
//!
//! The validated, immutable container is [`ProbabilisticGraph`], built through
//! [`GraphBuilder`].

pub mod index;
pub mod union_find;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

pub use index::{GraphBuilder, GraphResult, ProbabilisticGraph};
pub use union_find::UnionFind;

/// Tolerance applied when checking that a probability table sums to at most 1.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------------

/// A relation statement (axiom) between entities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Relation {
    /// `sub` is subsumed by (is a subclass of) `sup`.
    SubsumedBy { sub: EntityId, sup: EntityId },
    /// All members denote the same class. Members are sorted and distinct.
    Equivalent { members: Vec<EntityId> },
}

impl Relation {
    /// Subsumption `sub ⊑ sup`.
    pub fn subsumed_by(sub: EntityId, sup: EntityId) -> Self {
        Relation::SubsumedBy { sub, sup }
    }

    /// Equivalence between `members` (sorted and deduplicated here).
    pub fn equivalent(members: impl IntoIterator<Item = EntityId>) -> Self {
        let mut members: Vec<EntityId> = members.into_iter().collect();
        members.sort_unstable();
        members.dedup();
        Relation::Equivalent { members }
    }

    /// Every entity mentioned by this relation.
    pub fn entities(&self) -> Vec<EntityId> {
        match self {
            Relation::SubsumedBy { sub, sup } => vec![*sub, *sup],
            Relation::Equivalent { members } => members.clone(),
        }
    }

    /// Whether this relation mentions `entity`.
    pub fn touches(&self, entity: EntityId) -> bool {
        match self {
            Relation::SubsumedBy { sub, sup } => *sub == entity || *sup == entity,
            Relation::Equivalent { members } => members.contains(&entity),
        }
    }

    /// The entity used to decide which clique owns this relation.
    pub fn anchor(&self) -> Option<EntityId> {
        match self {
            Relation::SubsumedBy { sub, .. } => Some(*sub),
            Relation::Equivalent { members } => members.first().copied(),
        }
    }
}

// ---------------------------------------------------------------------------
// Hypotheses
// ---------------------------------------------------------------------------

/// One candidate relation for a probabilistic edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hypothesis {
    /// `sub ⊑ sup`, where `{sub, sup}` are the edge's endpoints.
    SubsumedBy { sub: EntityId, sup: EntityId },
    /// The two endpoints are equivalent.
    Equivalent,
    /// No structural relation between the endpoints.
    NoRelation,
}

impl Hypothesis {
    /// Position in the fixed enumeration order for an edge whose lower
    /// endpoint is `source`: forward subsumption, reverse subsumption,
    /// equivalence, no relation.
    pub fn rank(&self, source: EntityId) -> u8 {
        match self {
            Hypothesis::SubsumedBy { sub, .. } if *sub == source => 0,
            Hypothesis::SubsumedBy { .. } => 1,
            Hypothesis::Equivalent => 2,
            Hypothesis::NoRelation => 3,
        }
    }

    /// The relation asserted by choosing this hypothesis on `edge`, if any.
    pub fn relation(&self, edge: &ProbabilisticEdge) -> Option<Relation> {
        match *self {
            Hypothesis::SubsumedBy { sub, sup } => Some(Relation::subsumed_by(sub, sup)),
            Hypothesis::Equivalent => Some(Relation::equivalent([edge.source, edge.target])),
            Hypothesis::NoRelation => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Probabilistic edges
// ---------------------------------------------------------------------------

/// An uncertain edge: an unordered entity pair with a probability table.
///
/// The pair is stored normalised (`source < target`). Probability mass not
/// listed in the table belongs to [`Hypothesis::NoRelation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilisticEdge {
    /// Lower endpoint.
    pub source: EntityId,
    /// Upper endpoint.
    pub target: EntityId,
    table: Vec<(Hypothesis, f64)>,
}

impl ProbabilisticEdge {
    /// Create an edge, normalising endpoint order and merging repeated
    /// hypotheses by summing their probabilities.
    pub fn new(a: EntityId, b: EntityId, table: Vec<(Hypothesis, f64)>) -> Self {
        let (source, target) = if a <= b { (a, b) } else { (b, a) };
        let mut merged: Vec<(Hypothesis, f64)> = Vec::with_capacity(table.len());
        for (h, p) in table {
            match merged.iter_mut().find(|(existing, _)| *existing == h) {
                Some(slot) => slot.1 += p,
                None => merged.push((h, p)),
            }
        }
        merged.sort_by_key(|(h, _)| h.rank(source));
        Self {
            source,
            target,
            table: merged,
        }
    }

    /// Endpoint pair, used as the deterministic sort key.
    pub fn key(&self) -> (EntityId, EntityId) {
        (self.source, self.target)
    }

    /// Hypotheses exactly as listed in the input table.
    pub fn table(&self) -> &[(Hypothesis, f64)] {
        &self.table
    }

    /// Full hypothesis list in enumeration order, including the implicit
    /// no-relation remainder when the table does not list it.
    pub fn hypotheses(&self) -> Vec<(Hypothesis, f64)> {
        let mut all = self.table.clone();
        if !all.iter().any(|(h, _)| *h == Hypothesis::NoRelation) {
            let listed: f64 = all.iter().map(|(_, p)| p).sum();
            all.push((Hypothesis::NoRelation, (1.0 - listed).max(0.0)));
        }
        all
    }

    /// Probability of one hypothesis (0 when it is not applicable).
    pub fn probability_of(&self, hypothesis: Hypothesis) -> f64 {
        self.hypotheses()
            .into_iter()
            .find(|(h, _)| *h == hypothesis)
            .map(|(_, p)| p)
            .unwrap_or(0.0)
    }

    /// Hypotheses ordered by descending probability, ties broken by the
    /// fixed enumeration order.
    pub fn ranked(&self) -> Vec<(Hypothesis, f64)> {
        let mut all = self.hypotheses();
        all.sort_by(|a, b| b.1.total_cmp(&a.1));
        all
    }

    /// Highest probability of any structural (non-`NoRelation`) hypothesis.
    pub fn weight(&self) -> f64 {
        self.table
            .iter()
            .filter(|(h, _)| *h != Hypothesis::NoRelation)
            .map(|(_, p)| *p)
            .fold(0.0, f64::max)
    }

    /// Whether `entity` is one of the endpoints.
    pub fn touches(&self, entity: EntityId) -> bool {
        self.source == entity || self.target == entity
    }
}

// ---------------------------------------------------------------------------
// Priors
// ---------------------------------------------------------------------------

/// Result of looking up the prior probability of an axiom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Prior {
    /// The axiom corresponds to a hypothesis in the probability table.
    Probability(f64),
    /// No table entry: the axiom was given, or is now treated as certain.
    Certain,
}

impl Prior {
    /// The probability, if the axiom had one.
    pub fn probability(self) -> Option<f64> {
        match self {
            Prior::Probability(p) => Some(p),
            Prior::Certain => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(i: usize) -> EntityId {
        EntityId::new(i)
    }

    #[test]
    fn edge_normalises_endpoints_and_orders_hypotheses() {
        let edge = ProbabilisticEdge::new(
            e(3),
            e(1),
            vec![
                (Hypothesis::Equivalent, 0.2),
                (Hypothesis::SubsumedBy { sub: e(3), sup: e(1) }, 0.3),
                (Hypothesis::SubsumedBy { sub: e(1), sup: e(3) }, 0.1),
            ],
        );
        assert_eq!(edge.key(), (e(1), e(3)));
        let order: Vec<u8> = edge.table().iter().map(|(h, _)| h.rank(edge.source)).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn implicit_no_relation_takes_remainder() {
        let edge = ProbabilisticEdge::new(e(0), e(1), vec![(Hypothesis::Equivalent, 0.7)]);
        let all = edge.hypotheses();
        assert_eq!(all.len(), 2);
        assert!((edge.probability_of(Hypothesis::NoRelation) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn ranked_prefers_enumeration_order_on_ties() {
        let edge = ProbabilisticEdge::new(
            e(0),
            e(1),
            vec![
                (Hypothesis::Equivalent, 0.5),
                (Hypothesis::SubsumedBy { sub: e(0), sup: e(1) }, 0.5),
            ],
        );
        let ranked = edge.ranked();
        assert_eq!(ranked[0].0, Hypothesis::SubsumedBy { sub: e(0), sup: e(1) });
        assert_eq!(edge.weight(), 0.5);
    }

    #[test]
    fn equivalence_relation_is_canonical() {
        assert_eq!(
            Relation::equivalent([e(2), e(1), e(2)]),
            Relation::Equivalent {
                members: vec![e(1), e(2)]
            }
        );
    }
}
