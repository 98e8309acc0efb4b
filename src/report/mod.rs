//! Human- and machine-readable renderings of a [`Resolution`].
//!
//! - [`markdown`]: one table per clique, for reading.
//! - [`json`]: label-resolved export structs, for downstream tools.
//! - [`dot`]: Graphviz diagrams per clique, optionally rasterized.
//!
//! [`Resolution`]: crate::resolution::Resolution

pub mod dot;
pub mod json;
pub mod markdown;

use crate::entity::EntityId;
use crate::graph::{ProbabilisticGraph, Relation};

/// `ID "label"` or just `ID` when the entity has no label.
pub(crate) fn entity_name(graph: &ProbabilisticGraph, id: EntityId) -> String {
    let entity = graph.entity(id);
    match &entity.label {
        Some(label) => format!("{} \"{}\"", entity.id, label),
        None => entity.id.clone(),
    }
}

/// One-line rendering of a relation using [`entity_name`].
pub(crate) fn describe(graph: &ProbabilisticGraph, relation: &Relation) -> String {
    match relation {
        Relation::SubsumedBy { sub, sup } => format!(
            "{} SubClassOf {}",
            entity_name(graph, *sub),
            entity_name(graph, *sup)
        ),
        Relation::Equivalent { members } => members
            .iter()
            .map(|m| entity_name(graph, *m))
            .collect::<Vec<_>>()
            .join(" EquivalentTo "),
    }
}
