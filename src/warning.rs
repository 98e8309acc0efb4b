//! Non-fatal conditions surfaced alongside a resolution.

use serde::Serialize;

/// Something the caller should know about, but that did not stop processing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionWarning {
    /// A clique exceeded the probabilistic-edge bound and was split. Boundary
    /// edges were fixed to their best admissible hypothesis, so the combined
    /// result is only optimal per sub-clique.
    DegradedSplit {
        clique: String,
        sub_cliques: usize,
        promoted: usize,
    },
    /// The solver hit its candidate budget and returned the best consistent
    /// assignment found so far.
    BudgetExhausted { clique: String, evaluated: u64 },
    /// A seed identifier did not match any entity in the graph.
    UnknownSeed { identifier: String },
}

impl ResolutionWarning {
    /// The clique this warning is about, if any.
    pub fn clique(&self) -> Option<&str> {
        match self {
            ResolutionWarning::DegradedSplit { clique, .. }
            | ResolutionWarning::BudgetExhausted { clique, .. } => Some(clique),
            ResolutionWarning::UnknownSeed { .. } => None,
        }
    }
}

impl std::fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionWarning::DegradedSplit {
                clique,
                sub_cliques,
                promoted,
            } => write!(
                f,
                "clique {clique} split into {sub_cliques} sub-cliques; \
                 {promoted} boundary edge(s) fixed greedily, result may not be globally optimal"
            ),
            ResolutionWarning::BudgetExhausted { clique, evaluated } => write!(
                f,
                "clique {clique}: candidate budget exhausted after {evaluated} candidates, \
                 returning best found so far"
            ),
            ResolutionWarning::UnknownSeed { identifier } => {
                write!(f, "seed entity {identifier} not found in graph")
            }
        }
    }
}
