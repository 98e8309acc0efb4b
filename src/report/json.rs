//! JSON export.
//!
//! These types provide label-resolved representations of a resolution, so
//! consumers never need the graph's internal entity ids.

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::error::IoError;
use crate::graph::{ProbabilisticGraph, Relation};
use crate::resolution::Resolution;
use crate::solver::AxiomOrigin;
use crate::warning::ResolutionWarning;

/// Exported entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityExport {
    /// Local identifier.
    pub id: String,
    pub iri: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub label: Option<String>,
}

/// Exported axiom.
#[derive(Debug, Clone, Serialize)]
pub struct AxiomExport {
    /// `subclass_of` or `equivalent_classes`.
    pub kind: &'static str,
    /// Sub then super for `subclass_of`, sorted members otherwise.
    pub entities: Vec<EntityExport>,
    pub origin: AxiomOrigin,
    /// Prior from the probability table, absent for certain axioms.
    pub prior: Option<f64>,
}

/// Exported clique solution.
#[derive(Debug, Clone, Serialize)]
pub struct SolutionExport {
    pub clique_id: String,
    pub parent: Option<String>,
    pub score: f64,
    /// Final equivalence clusters, each sorted by identifier.
    pub clusters: Vec<Vec<EntityExport>>,
    pub axioms: Vec<AxiomExport>,
}

/// Exported per-clique failure.
#[derive(Debug, Clone, Serialize)]
pub struct FailureExport {
    pub clique_id: String,
    pub message: String,
}

/// Whole-run export.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionExport {
    pub solutions: Vec<SolutionExport>,
    pub warnings: Vec<ResolutionWarning>,
    pub failures: Vec<FailureExport>,
}

impl ResolutionExport {
    pub fn new(graph: &ProbabilisticGraph, resolution: &Resolution) -> Self {
        let entity = |id: EntityId| {
            let e = graph.entity(id);
            EntityExport {
                id: e.id.clone(),
                iri: e.iri.clone(),
                label: e.label.clone(),
            }
        };
        let solutions = resolution
            .solutions()
            .iter()
            .map(|s| SolutionExport {
                clique_id: s.clique_id.clone(),
                parent: s.clique.parent.clone(),
                score: s.score,
                clusters: s
                    .clusters
                    .values()
                    .map(|members| members.iter().map(|&m| entity(m)).collect())
                    .collect(),
                axioms: s
                    .axioms
                    .iter()
                    .map(|a| AxiomExport {
                        kind: match a.relation {
                            Relation::SubsumedBy { .. } => "subclass_of",
                            Relation::Equivalent { .. } => "equivalent_classes",
                        },
                        entities: a.relation.entities().into_iter().map(entity).collect(),
                        origin: a.origin,
                        prior: a.prior().probability(),
                    })
                    .collect(),
            })
            .collect();
        let failures = resolution
            .failures()
            .iter()
            .map(|f| FailureExport {
                clique_id: f.clique_id.clone(),
                message: f.error.to_string(),
            })
            .collect();
        Self {
            solutions,
            warnings: resolution.warnings().to_vec(),
            failures,
        }
    }
}

/// Render `resolution` as pretty-printed JSON.
pub fn render(graph: &ProbabilisticGraph, resolution: &Resolution) -> Result<String, IoError> {
    serde_json::to_string_pretty(&ResolutionExport::new(graph, resolution)).map_err(|e| {
        IoError::Serialize {
            message: e.to_string(),
        }
    })
}
