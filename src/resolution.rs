//! Aggregated output of a resolver run.

use std::collections::BTreeSet;

use crate::entity::EntityId;
use crate::error::SolveError;
use crate::graph::Relation;
use crate::solver::CliqueSolution;
use crate::warning::ResolutionWarning;

/// A clique that could not be solved. Its siblings are unaffected.
#[derive(Debug, Clone)]
pub struct CliqueFailure {
    pub clique_id: String,
    pub error: SolveError,
}

/// Per-clique solutions, warnings and failures of one run.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    solutions: Vec<CliqueSolution>,
    warnings: Vec<ResolutionWarning>,
    failures: Vec<CliqueFailure>,
}

impl Resolution {
    /// Collect results. Solutions and failures are sorted by clique id.
    pub fn new(
        mut solutions: Vec<CliqueSolution>,
        warnings: Vec<ResolutionWarning>,
        mut failures: Vec<CliqueFailure>,
    ) -> Self {
        solutions.sort_by(|a, b| a.clique_id.cmp(&b.clique_id));
        failures.sort_by(|a, b| a.clique_id.cmp(&b.clique_id));
        Self {
            solutions,
            warnings,
            failures,
        }
    }

    pub fn solutions(&self) -> &[CliqueSolution] {
        &self.solutions
    }

    pub fn warnings(&self) -> &[ResolutionWarning] {
        &self.warnings
    }

    pub fn failures(&self) -> &[CliqueFailure] {
        &self.failures
    }

    /// Every clique was solved.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Union of all solution axioms, sorted and deduplicated.
    pub fn axioms(&self) -> Vec<Relation> {
        self.solutions
            .iter()
            .flat_map(|s| s.relations().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Restrict to solutions whose clusters contain a seed.
    ///
    /// An empty seed set keeps everything. Warnings about a clique survive
    /// only if some solution of that clique (or its sub-cliques) survives;
    /// warnings not tied to a clique are always kept.
    pub fn filtered(&self, seeds: &BTreeSet<EntityId>) -> Resolution {
        if seeds.is_empty() {
            return self.clone();
        }
        let solutions: Vec<CliqueSolution> = self
            .solutions
            .iter()
            .filter(|s| s.touches_any(seeds))
            .cloned()
            .collect();
        let kept: BTreeSet<&str> = solutions
            .iter()
            .flat_map(|s| [s.clique_id.as_str(), s.clique.root_id()])
            .collect();
        let warnings = self
            .warnings
            .iter()
            .filter(|w| w.clique().is_none_or(|c| kept.contains(c)))
            .cloned()
            .collect();
        Resolution {
            solutions,
            warnings,
            failures: self.failures.clone(),
        }
    }
}
