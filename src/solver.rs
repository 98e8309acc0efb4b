//! Clique solver: exhaustive maximum-likelihood search over hypothesis
//! assignments.
//!
//! Every open probabilistic edge of a clique gets one hypothesis; the score of
//! an assignment is the product of the chosen probabilities (certain edges
//! contribute 1.0). An assignment is admissible when the subsumption arcs it
//! implies, together with the clique's certain relations, are acyclic after
//! merging everything declared equivalent.
//!
//! The search is a depth-first walk of the cartesian product in a fixed order
//! (edges by endpoint pair, hypotheses by [`Hypothesis::rank`]). Scores are
//! compared as sums of log-probabilities so that products of many small
//! probabilities stay distinguishable. A branch is pruned only when it cannot
//! strictly beat the incumbent, so among equal scores the first assignment in
//! that order wins.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::clique::{Clique, Structure};
use crate::entity::EntityId;
use crate::error::SolveError;
use crate::graph::{Hypothesis, Prior, ProbabilisticGraph, Relation};
use crate::warning::ResolutionWarning;

/// Relative tolerance under which two scores are treated as equal. Applied
/// to log-scores, where it bounds the ratio of the two products.
pub const SCORE_TOLERANCE: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Solutions
// ---------------------------------------------------------------------------

/// Where an axiom in a solution came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AxiomOrigin {
    /// A given logical edge.
    Logical,
    /// A probabilistic edge fixed by the splitter before search.
    Promoted { prior: f64 },
    /// Chosen by the search.
    Chosen { probability: f64 },
}

/// One relation in a clique solution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedAxiom {
    pub relation: Relation,
    pub origin: AxiomOrigin,
}

impl ResolvedAxiom {
    /// Prior probability, or [`Prior::Certain`] for given axioms.
    pub fn prior(&self) -> Prior {
        match self.origin {
            AxiomOrigin::Logical => Prior::Certain,
            AxiomOrigin::Promoted { prior } => Prior::Probability(prior),
            AxiomOrigin::Chosen { probability } => Prior::Probability(probability),
        }
    }
}

/// Result of solving one clique.
#[derive(Debug, Clone, PartialEq)]
pub struct CliqueSolution {
    pub clique_id: String,
    /// Final clusters after chosen equivalences: representative → members.
    ///
    /// Only this clique's entities are listed. An equivalence promoted across
    /// a split boundary merges entities of two sibling sub-cliques; it shows
    /// up in `axioms` of the owning sub-clique, and each side keeps its own
    /// cluster here.
    pub clusters: BTreeMap<EntityId, Vec<EntityId>>,
    /// Given, promoted and chosen relations, sorted, one entry per relation.
    pub axioms: Vec<ResolvedAxiom>,
    /// Joint probability of the chosen hypotheses.
    pub score: f64,
    /// The clique that was solved, kept for renderers that show the original
    /// edges next to the chosen ones.
    pub clique: Clique,
}

impl CliqueSolution {
    /// The chosen relations.
    pub fn relations(&self) -> impl Iterator<Item = &Relation> + '_ {
        self.axioms.iter().map(|a| &a.relation)
    }

    /// Whether any entity of this solution is in `seeds`.
    pub fn touches_any(&self, seeds: &BTreeSet<EntityId>) -> bool {
        self.clusters.values().flatten().any(|e| seeds.contains(e))
    }

    /// Prior of `relation` for reporting.
    ///
    /// Relations this solution carries answer from their origin; anything
    /// else falls back to the graph's table, and to [`Prior::Certain`] when
    /// the table has no entry.
    pub fn prior(&self, graph: &ProbabilisticGraph, relation: &Relation) -> Prior {
        self.axioms
            .iter()
            .find(|a| &a.relation == relation)
            .map(|a| a.prior())
            .unwrap_or_else(|| graph.axiom_prior(relation))
    }

    /// Whether `relation` was fixed by the splitter rather than searched.
    pub fn is_promoted(&self, relation: &Relation) -> bool {
        self.axioms
            .iter()
            .any(|a| &a.relation == relation && matches!(a.origin, AxiomOrigin::Promoted { .. }))
    }
}

/// A solution plus the non-fatal conditions met while producing it.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub solution: CliqueSolution,
    pub warning: Option<ResolutionWarning>,
    /// Complete assignments evaluated.
    pub evaluated: u64,
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

/// Solves cliques against one graph. Cheap to copy and share across threads.
#[derive(Debug, Clone, Copy)]
pub struct CliqueSolver<'g> {
    graph: &'g ProbabilisticGraph,
    budget: Option<u64>,
}

impl<'g> CliqueSolver<'g> {
    pub fn new(graph: &'g ProbabilisticGraph) -> Self {
        Self {
            graph,
            budget: None,
        }
    }

    /// Stop after evaluating this many complete assignments and return the
    /// best consistent one found so far.
    pub fn with_budget(mut self, budget: Option<u64>) -> Self {
        self.budget = budget;
        self
    }

    /// Find the maximum-likelihood consistent assignment for `clique`.
    pub fn solve(&self, clique: &Clique) -> Result<SolveOutcome, SolveError> {
        let base = clique.certain_structure(self.graph);

        if clique.probabilistic.is_empty() {
            let solution = self.assemble(clique, base, &[], 1.0);
            return Ok(SolveOutcome {
                solution,
                warning: None,
                evaluated: 0,
            });
        }

        let options: Vec<Vec<(Hypothesis, f64)>> = clique
            .probabilistic
            .iter()
            .map(|&i| {
                self.graph
                    .probabilistic_edge(i)
                    .hypotheses()
                    .into_iter()
                    .filter(|(h, p)| *p > 0.0 || *h == Hypothesis::NoRelation)
                    .collect()
            })
            .collect();

        let mut search = Search::new(self.graph, clique, &base, &options, self.budget);
        search.descend(0, 0.0);

        let warning = search.exhausted.then(|| {
            tracing::warn!(
                clique = %clique.id,
                evaluated = search.evaluated,
                "candidate budget exhausted"
            );
            ResolutionWarning::BudgetExhausted {
                clique: clique.id.clone(),
                evaluated: search.evaluated,
            }
        });

        let choice = match search.best.take() {
            Some((_, choice)) => choice,
            None if search.exhausted => {
                // Fall back to leaving every open edge unresolved.
                let choice: Vec<usize> = options
                    .iter()
                    .map(|opts| {
                        opts.iter()
                            .position(|(h, _)| *h == Hypothesis::NoRelation)
                            .unwrap_or(opts.len() - 1)
                    })
                    .collect();
                if !search.consistent(&choice) {
                    return Err(SolveError::Unsatisfiable {
                        clique: clique.id.clone(),
                    });
                }
                choice
            }
            None => {
                return Err(SolveError::Unsatisfiable {
                    clique: clique.id.clone(),
                });
            }
        };
        let score: f64 = choice
            .iter()
            .zip(&options)
            .map(|(&c, opts)| opts[c].1)
            .product();

        let chosen: Vec<(usize, Hypothesis, f64)> = clique
            .probabilistic
            .iter()
            .zip(&choice)
            .zip(&options)
            .map(|((&edge, &c), opts)| (edge, opts[c].0, opts[c].1))
            .collect();
        let evaluated = search.evaluated;
        let solution = self.assemble(clique, base, &chosen, score);

        tracing::debug!(
            clique = %clique.id,
            edges = clique.probabilistic.len(),
            evaluated,
            score,
            "solved clique"
        );
        Ok(SolveOutcome {
            solution,
            warning,
            evaluated,
        })
    }

    fn assemble(
        &self,
        clique: &Clique,
        mut structure: Structure,
        chosen: &[(usize, Hypothesis, f64)],
        score: f64,
    ) -> CliqueSolution {
        let mut axioms: Vec<ResolvedAxiom> = clique
            .logical
            .iter()
            .map(|&i| ResolvedAxiom {
                relation: self.graph.logical_edge(i).clone(),
                origin: AxiomOrigin::Logical,
            })
            .collect();
        for p in &clique.promoted {
            if let Some(relation) = p.hypothesis.relation(self.graph.probabilistic_edge(p.edge)) {
                axioms.push(ResolvedAxiom {
                    relation,
                    origin: AxiomOrigin::Promoted { prior: p.prior },
                });
            }
        }
        for &(edge, hypothesis, probability) in chosen {
            if let Some(relation) = hypothesis.relation(self.graph.probabilistic_edge(edge)) {
                structure.add(&relation);
                axioms.push(ResolvedAxiom {
                    relation,
                    origin: AxiomOrigin::Chosen { probability },
                });
            }
        }
        axioms.sort_by(|a, b| a.relation.cmp(&b.relation));
        axioms.dedup_by(|later, earlier| later.relation == earlier.relation);

        CliqueSolution {
            clique_id: clique.id.clone(),
            clusters: structure.clusters(&clique.entities),
            axioms,
            score,
            clique: clique.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Search state
// ---------------------------------------------------------------------------

struct Search<'a> {
    graph: &'a ProbabilisticGraph,
    edges: &'a [usize],
    base: &'a Structure,
    options: &'a [Vec<(Hypothesis, f64)>],
    /// `ln` of every option's probability.
    logs: Vec<Vec<f64>>,
    /// `suffix[d]` = best achievable log-score over edges `d..`.
    suffix: Vec<f64>,
    choice: Vec<usize>,
    /// Incumbent log-score and assignment.
    best: Option<(f64, Vec<usize>)>,
    evaluated: u64,
    budget: Option<u64>,
    exhausted: bool,
}

impl<'a> Search<'a> {
    fn new(
        graph: &'a ProbabilisticGraph,
        clique: &'a Clique,
        base: &'a Structure,
        options: &'a [Vec<(Hypothesis, f64)>],
        budget: Option<u64>,
    ) -> Self {
        let logs: Vec<Vec<f64>> = options
            .iter()
            .map(|opts| opts.iter().map(|(_, p)| p.ln()).collect())
            .collect();
        let mut suffix = vec![0.0; options.len() + 1];
        for d in (0..options.len()).rev() {
            let top = logs[d].iter().copied().fold(f64::NEG_INFINITY, f64::max);
            suffix[d] = suffix[d + 1] + top;
        }
        Self {
            graph,
            edges: &clique.probabilistic,
            base,
            options,
            logs,
            suffix,
            choice: vec![0; options.len()],
            best: None,
            evaluated: 0,
            budget,
            exhausted: false,
        }
    }

    fn descend(&mut self, depth: usize, partial: f64) {
        if self.exhausted {
            return;
        }
        if let Some((best, _)) = &self.best {
            if partial + self.suffix[depth] <= best + SCORE_TOLERANCE {
                return;
            }
        }
        if depth == self.options.len() {
            self.evaluate(partial);
            return;
        }
        for c in 0..self.options[depth].len() {
            self.choice[depth] = c;
            let log = self.logs[depth][c];
            self.descend(depth + 1, partial + log);
            if self.exhausted {
                return;
            }
        }
    }

    fn evaluate(&mut self, score: f64) {
        self.evaluated += 1;
        if self.consistent(&self.choice) {
            let improves = match &self.best {
                None => true,
                Some((best, _)) => score > best + SCORE_TOLERANCE,
            };
            if improves {
                self.best = Some((score, self.choice.clone()));
            }
        }
        if let Some(budget) = self.budget {
            if self.evaluated >= budget {
                self.exhausted = true;
            }
        }
    }

    fn consistent(&self, choice: &[usize]) -> bool {
        let mut structure = self.base.clone();
        for (d, &c) in choice.iter().enumerate() {
            let edge = self.graph.probabilistic_edge(self.edges[d]);
            if let Some(relation) = self.options[d][c].0.relation(edge) {
                structure.add(&relation);
            }
        }
        structure.is_consistent()
    }
}
