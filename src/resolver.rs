//! Resolver facade: extraction, splitting, solving and aggregation in one
//! call.
//!
//! The `Resolver` borrows a built graph and a validated config. Top-level
//! cliques are independent, so each one (with its sub-cliques, if it was
//! split) is one unit of work, solved serially or on the rayon pool. Work
//! items are collected in list order either way, so the result does not
//! depend on scheduling.
//!
//! Sub-cliques of one clique are solved in id order. Each sees the relations
//! chosen for the siblings before it as context, so the merged axioms of a
//! split clique stay consistent.

use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::clique::{Clique, extract_cliques, split_clique};
use crate::config::ResolverConfig;
use crate::entity::{EntityId, iri_for_identifier, local_fragment};
use crate::error::{BoomResult, SolveError};
use crate::graph::{ProbabilisticGraph, Relation};
use crate::resolution::{CliqueFailure, Resolution};
use crate::solver::{AxiomOrigin, CliqueSolver, SolveOutcome};
use crate::warning::ResolutionWarning;

/// Cliques ready for solving, plus warnings raised while preparing them.
#[derive(Debug, Clone, Default)]
pub struct Prepared {
    pub cliques: Vec<Clique>,
    pub warnings: Vec<ResolutionWarning>,
}

/// Runs the full pipeline over one graph.
pub struct Resolver<'g> {
    graph: &'g ProbabilisticGraph,
    config: ResolverConfig,
    seeds: BTreeSet<EntityId>,
    seed_warnings: Vec<ResolutionWarning>,
}

impl<'g> Resolver<'g> {
    /// Validate `config` and resolve its seed identifiers against `graph`.
    pub fn new(graph: &'g ProbabilisticGraph, config: ResolverConfig) -> BoomResult<Self> {
        config.validate()?;

        let mut seeds = BTreeSet::new();
        let mut seed_warnings = Vec::new();
        for identifier in &config.seed_entities {
            let iri = iri_for_identifier(identifier);
            match graph
                .lookup(identifier)
                .or_else(|| graph.lookup(local_fragment(&iri)))
            {
                Some(id) => {
                    seeds.insert(id);
                }
                None => {
                    tracing::warn!(%identifier, "seed entity not found in graph");
                    seed_warnings.push(ResolutionWarning::UnknownSeed {
                        identifier: identifier.clone(),
                    });
                }
            }
        }

        tracing::info!(
            entities = graph.entity_count(),
            probabilistic_edges = graph.probabilistic_edges().len(),
            logical_edges = graph.logical_edges().len(),
            seeds = seeds.len(),
            parallel = config.parallel,
            "initializing resolver"
        );
        Ok(Self {
            graph,
            config,
            seeds,
            seed_warnings,
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn graph(&self) -> &'g ProbabilisticGraph {
        self.graph
    }

    /// Seed entities that were found in the graph.
    pub fn seeds(&self) -> &BTreeSet<EntityId> {
        &self.seeds
    }

    /// Extract cliques, drop top-level cliques that cannot touch a seed, and
    /// split what remains.
    ///
    /// Splitting never moves an entity out of its top-level clique, so
    /// filtering before the split selects exactly the cliques a filter over
    /// the final solutions would keep.
    pub fn prepare(&self) -> Prepared {
        let mut cliques = extract_cliques(self.graph);
        if !self.seeds.is_empty() {
            cliques.retain(|c| self.seeds.iter().any(|&s| c.contains(s)));
            tracing::debug!(kept = cliques.len(), "filtered cliques by seed entities");
        }

        let limits = self.config.split_limits();
        let mut prepared = Prepared {
            cliques: Vec::with_capacity(cliques.len()),
            warnings: self.seed_warnings.clone(),
        };
        for clique in cliques {
            let outcome = split_clique(self.graph, clique, limits);
            prepared.cliques.extend(outcome.cliques);
            prepared.warnings.extend(outcome.warning);
        }
        tracing::info!(
            work_items = prepared.cliques.len(),
            "prepared cliques for solving"
        );
        prepared
    }

    /// Run the pipeline and aggregate the results.
    pub fn resolve(&self) -> Resolution {
        let Prepared {
            cliques,
            mut warnings,
        } = self.prepare();
        let solver = CliqueSolver::new(self.graph).with_budget(self.config.candidate_budget);
        let work_items = cliques.len();
        let families = families(cliques);

        let solve = |family: &Vec<Clique>| solve_family(&solver, family);
        let outcomes: Vec<(String, Result<SolveOutcome, SolveError>)> = if self.config.parallel {
            families.par_iter().map(solve).collect::<Vec<_>>()
        } else {
            families.iter().map(solve).collect::<Vec<_>>()
        }
        .into_iter()
        .flatten()
        .collect();
        debug_assert_eq!(outcomes.len(), work_items);

        let mut solutions = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (clique_id, outcome) in outcomes {
            match outcome {
                Ok(outcome) => {
                    warnings.extend(outcome.warning);
                    solutions.push(outcome.solution);
                }
                Err(error) => {
                    tracing::error!(clique = %clique_id, %error, "clique could not be solved");
                    failures.push(CliqueFailure { clique_id, error });
                }
            }
        }

        let resolution = Resolution::new(solutions, warnings, failures);
        let resolution = resolution.filtered(&self.seeds);
        tracing::info!(
            solutions = resolution.solutions().len(),
            axioms = resolution.axioms().len(),
            warnings = resolution.warnings().len(),
            failures = resolution.failures().len(),
            "resolution complete"
        );
        resolution
    }
}

/// Group consecutive cliques that descend from the same top-level clique.
fn families(cliques: Vec<Clique>) -> Vec<Vec<Clique>> {
    let mut families: Vec<Vec<Clique>> = Vec::new();
    for clique in cliques {
        match families.last_mut() {
            Some(family) if family[0].root_id() == clique.root_id() => family.push(clique),
            _ => families.push(vec![clique]),
        }
    }
    families
}

/// Solve one clique's parts in order, passing chosen relations forward.
fn solve_family(
    solver: &CliqueSolver<'_>,
    family: &[Clique],
) -> Vec<(String, Result<SolveOutcome, SolveError>)> {
    let mut chosen: Vec<Relation> = Vec::new();
    let mut outcomes = Vec::with_capacity(family.len());
    for clique in family {
        let outcome = if chosen.is_empty() {
            solver.solve(clique)
        } else {
            let mut clique = clique.clone();
            clique.context.extend(chosen.iter().cloned());
            solver.solve(&clique)
        };
        if let Ok(outcome) = &outcome {
            chosen.extend(
                outcome
                    .solution
                    .axioms
                    .iter()
                    .filter(|a| matches!(a.origin, AxiomOrigin::Chosen { .. }))
                    .map(|a| a.relation.clone()),
            );
        }
        outcomes.push((clique.id.clone(), outcome));
    }
    outcomes
}
