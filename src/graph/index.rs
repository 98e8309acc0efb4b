//! Immutable probabilistic graph with per-entity incidence indices.
//!
//! Built once through [`GraphBuilder`], validated, then shared read-only by
//! every stage of the pipeline (and across rayon workers).

use std::collections::HashMap;

use crate::entity::{Entity, EntityId};
use crate::error::GraphError;

use super::{Hypothesis, Prior, ProbabilisticEdge, Relation, PROBABILITY_TOLERANCE};

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Accumulates entities and edges, then validates them into a
/// [`ProbabilisticGraph`].
///
/// The ids returned by [`GraphBuilder::entity`] are only meaningful to this
/// builder: [`GraphBuilder::build`] sorts the arena by identifier and
/// renumbers every entity. Look entities up on the built graph with
/// [`ProbabilisticGraph::lookup`].
#[derive(Debug, Default)]
pub struct GraphBuilder {
    entities: Vec<Entity>,
    by_id: HashMap<String, EntityId>,
    probabilistic: Vec<(EntityId, EntityId, Vec<(Hypothesis, f64)>)>,
    logical: Vec<Relation>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity, or return the existing one with the same
    /// identifier. A label on the incoming entity fills a missing label.
    pub fn entity(&mut self, entity: Entity) -> EntityId {
        if let Some(&id) = self.by_id.get(&entity.id) {
            let existing = &mut self.entities[id.index()];
            if existing.label.is_none() {
                existing.label = entity.label;
            }
            return id;
        }
        let id = EntityId::new(self.entities.len());
        self.by_id.insert(entity.id.clone(), id);
        self.entities.push(entity);
        id
    }

    /// Register an entity from a `PREFIX:LOCAL` identifier or IRI.
    pub fn identifier(&mut self, identifier: &str) -> EntityId {
        self.entity(Entity::from_identifier(identifier))
    }

    /// Set the label of an already registered entity.
    pub fn set_label(&mut self, id: EntityId, label: impl Into<String>) {
        if let Some(entity) = self.entities.get_mut(id.index()) {
            entity.label = Some(label.into());
        }
    }

    /// Add an uncertain edge between `a` and `b`.
    pub fn probabilistic_edge(
        &mut self,
        a: EntityId,
        b: EntityId,
        table: Vec<(Hypothesis, f64)>,
    ) -> &mut Self {
        self.probabilistic.push((a, b, table));
        self
    }

    /// Add a certain edge.
    pub fn logical_edge(&mut self, relation: Relation) -> &mut Self {
        self.logical.push(relation);
        self
    }

    /// Validate everything and produce the immutable graph.
    pub fn build(self) -> GraphResult<ProbabilisticGraph> {
        let n = self.entities.len();
        let check = |id: EntityId| -> GraphResult<()> {
            if id.index() < n {
                Ok(())
            } else {
                Err(GraphError::UnknownEntity { entity: id.index() })
            }
        };
        let name = |id: EntityId| self.entities[id.index()].id.clone();

        // Rows for the same pair fold into one table.
        let mut merged: Vec<(EntityId, EntityId, Vec<(Hypothesis, f64)>)> = Vec::new();
        let mut slot_of: HashMap<(EntityId, EntityId), usize> = HashMap::new();
        for (a, b, table) in &self.probabilistic {
            check(*a)?;
            check(*b)?;
            if a == b {
                return Err(GraphError::SelfEdge { entity: name(*a) });
            }
            let slot = *slot_of.entry(((*a).min(*b), (*a).max(*b))).or_insert_with(|| {
                merged.push((*a, *b, Vec::new()));
                merged.len() - 1
            });
            let entries = &mut merged[slot].2;
            for &(hypothesis, p) in table {
                match entries.iter().find(|(h, _)| *h == hypothesis) {
                    Some((_, q)) if (q - p).abs() <= PROBABILITY_TOLERANCE => {}
                    Some(_) => {
                        return Err(GraphError::ConflictingHypothesis {
                            source_id: name(*a),
                            target_id: name(*b),
                        });
                    }
                    None => entries.push((hypothesis, p)),
                }
            }
        }

        for (a, b, table) in &merged {
            let mut total = 0.0;
            for (hypothesis, p) in table {
                if !p.is_finite() || *p < 0.0 || *p > 1.0 {
                    return Err(GraphError::ProbabilityOutOfRange {
                        source_id: name(*a),
                        target_id: name(*b),
                        probability: *p,
                    });
                }
                if let Hypothesis::SubsumedBy { sub, sup } = hypothesis {
                    let forward = sub == a && sup == b;
                    let backward = sub == b && sup == a;
                    if !forward && !backward {
                        return Err(GraphError::ForeignHypothesis {
                            source_id: name(*a),
                            target_id: name(*b),
                        });
                    }
                }
                total += p;
            }
            if total > 1.0 + PROBABILITY_TOLERANCE {
                return Err(GraphError::ProbabilityOverflow {
                    source_id: name(*a),
                    target_id: name(*b),
                    total,
                });
            }
        }

        for relation in &self.logical {
            for id in relation.entities() {
                check(id)?;
            }
            match relation {
                Relation::SubsumedBy { sub, sup } if sub == sup => {
                    return Err(GraphError::SelfEdge { entity: name(*sub) });
                }
                Relation::Equivalent { members } if members.len() < 2 => {
                    let entity = members.first().map(|m| name(*m)).unwrap_or_default();
                    return Err(GraphError::SelfEdge { entity });
                }
                _ => {}
            }
        }

        Ok(ProbabilisticGraph::assemble(self.entities, merged, self.logical))
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// Validated, immutable graph of entities, probabilistic edges and logical edges.
///
/// Entities are sorted by identifier, probabilistic edges by endpoint pair
/// and logical edges by relation, so every index is reproducible from the
/// input content alone.
#[derive(Debug, Clone)]
pub struct ProbabilisticGraph {
    entities: Vec<Entity>,
    by_id: HashMap<String, EntityId>,
    probabilistic: Vec<ProbabilisticEdge>,
    logical: Vec<Relation>,
    probabilistic_incidence: Vec<Vec<usize>>,
    logical_incidence: Vec<Vec<usize>>,
    pairs: HashMap<(EntityId, EntityId), Vec<usize>>,
}

impl ProbabilisticGraph {
    fn assemble(
        mut entities: Vec<Entity>,
        probabilistic: Vec<(EntityId, EntityId, Vec<(Hypothesis, f64)>)>,
        logical: Vec<Relation>,
    ) -> Self {
        // Renumber so that EntityId order is identifier order.
        let mut order: Vec<usize> = (0..entities.len()).collect();
        order.sort_by(|&a, &b| entities[a].id.cmp(&entities[b].id));
        let mut remap = vec![EntityId::new(0); entities.len()];
        for (new, &old) in order.iter().enumerate() {
            remap[old] = EntityId::new(new);
        }
        let mut slots: Vec<Option<Entity>> = entities.drain(..).map(Some).collect();
        let entities: Vec<Entity> = order
            .iter()
            .filter_map(|&old| slots[old].take())
            .collect();
        let map = |id: EntityId| remap[id.index()];

        let mut probabilistic: Vec<ProbabilisticEdge> = probabilistic
            .into_iter()
            .map(|(a, b, table)| {
                let table = table
                    .into_iter()
                    .map(|(h, p)| {
                        let h = match h {
                            Hypothesis::SubsumedBy { sub, sup } => Hypothesis::SubsumedBy {
                                sub: map(sub),
                                sup: map(sup),
                            },
                            other => other,
                        };
                        (h, p)
                    })
                    .collect();
                ProbabilisticEdge::new(map(a), map(b), table)
            })
            .collect();
        probabilistic.sort_by_key(|e| e.key());

        let mut logical: Vec<Relation> = logical
            .into_iter()
            .map(|r| match r {
                Relation::SubsumedBy { sub, sup } => Relation::subsumed_by(map(sub), map(sup)),
                Relation::Equivalent { members } => {
                    Relation::equivalent(members.into_iter().map(map))
                }
            })
            .collect();
        logical.sort();
        logical.dedup();

        let mut probabilistic_incidence = vec![Vec::new(); entities.len()];
        let mut pairs: HashMap<(EntityId, EntityId), Vec<usize>> = HashMap::new();
        for (i, edge) in probabilistic.iter().enumerate() {
            probabilistic_incidence[edge.source.index()].push(i);
            probabilistic_incidence[edge.target.index()].push(i);
            pairs.entry(edge.key()).or_default().push(i);
        }
        let mut logical_incidence = vec![Vec::new(); entities.len()];
        for (i, relation) in logical.iter().enumerate() {
            for id in relation.entities() {
                logical_incidence[id.index()].push(i);
            }
        }

        let by_id = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), EntityId::new(i)))
            .collect();

        tracing::debug!(
            entities = entities.len(),
            probabilistic = probabilistic.len(),
            logical = logical.len(),
            "built probabilistic graph"
        );

        Self {
            entities,
            by_id,
            probabilistic,
            logical,
            probabilistic_incidence,
            logical_incidence,
            pairs,
        }
    }

    /// All entities, sorted by identifier.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Number of entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Entity by id.
    ///
    /// # Panics
    /// If `id` does not belong to this graph.
    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.index()]
    }

    /// Find an entity by identifier (IRI fragment, e.g. `HP_0000118`).
    pub fn lookup(&self, identifier: &str) -> Option<EntityId> {
        self.by_id.get(identifier).copied()
    }

    /// All probabilistic edges, sorted by endpoint pair.
    pub fn probabilistic_edges(&self) -> &[ProbabilisticEdge] {
        &self.probabilistic
    }

    /// One probabilistic edge by index.
    pub fn probabilistic_edge(&self, index: usize) -> &ProbabilisticEdge {
        &self.probabilistic[index]
    }

    /// All logical edges, sorted.
    pub fn logical_edges(&self) -> &[Relation] {
        &self.logical
    }

    /// One logical edge by index.
    pub fn logical_edge(&self, index: usize) -> &Relation {
        &self.logical[index]
    }

    /// Indices of probabilistic edges touching `entity`.
    pub fn probabilistic_edges_of(&self, entity: EntityId) -> &[usize] {
        &self.probabilistic_incidence[entity.index()]
    }

    /// Indices of logical edges touching `entity`.
    pub fn logical_edges_of(&self, entity: EntityId) -> &[usize] {
        &self.logical_incidence[entity.index()]
    }

    /// Whether `entity` has any edge at all.
    pub fn has_edges(&self, entity: EntityId) -> bool {
        !self.probabilistic_incidence[entity.index()].is_empty()
            || !self.logical_incidence[entity.index()].is_empty()
    }

    /// Prior probability of an axiom, as recorded in the probability table.
    ///
    /// Axioms with no table entry (given logical edges, equivalences over more
    /// than two entities, or anything else) resolve to [`Prior::Certain`].
    pub fn axiom_prior(&self, relation: &Relation) -> Prior {
        let (pair, wanted) = match relation {
            Relation::SubsumedBy { sub, sup } => (
                ((*sub).min(*sup), (*sub).max(*sup)),
                Hypothesis::SubsumedBy {
                    sub: *sub,
                    sup: *sup,
                },
            ),
            Relation::Equivalent { members } if members.len() == 2 => {
                ((members[0], members[1]), Hypothesis::Equivalent)
            }
            Relation::Equivalent { .. } => return Prior::Certain,
        };
        self.pairs
            .get(&pair)
            .and_then(|edges| {
                edges.iter().find_map(|&i| {
                    self.probabilistic[i]
                        .table()
                        .iter()
                        .find(|(h, _)| *h == wanted)
                        .map(|(_, p)| *p)
                })
            })
            .map(Prior::Probability)
            .unwrap_or(Prior::Certain)
    }
}
