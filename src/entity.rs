//! Entity identifiers for the boom engine.
//!
//! Every class in the source graph becomes an [`Entity`]: a full IRI, the
//! IRI's local fragment (the stable identifier used in reports and for
//! deterministic ordering), and an optional human-readable label. Entities
//! live in an arena owned by the graph and are addressed by [`EntityId`].

use serde::{Deserialize, Serialize};

/// Default namespace used to expand `PREFIX:LOCAL` identifiers into IRIs.
pub const OBO_NAMESPACE: &str = "http://purl.obolibrary.org/obo/";

/// Dense index of an entity in a graph's arena.
///
/// Once a graph is built its arena is sorted by identifier, so comparing two
/// `EntityId`s compares their identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// Create an `EntityId` from an arena index.
    pub fn new(index: usize) -> Self {
        EntityId(index as u32)
    }

    /// Arena index of this entity.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node of the knowledge graph (typically an ontology class).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Full IRI.
    pub iri: String,
    /// Local fragment of the IRI; unique within a graph.
    pub id: String,
    /// Human-readable label, if the source graph provides one.
    pub label: Option<String>,
}

impl Entity {
    /// Create an entity from a full IRI.
    pub fn from_iri(iri: impl Into<String>) -> Self {
        let iri = iri.into();
        let id = local_fragment(&iri).to_string();
        Self {
            iri,
            id,
            label: None,
        }
    }

    /// Create an entity from a `PREFIX:LOCAL` identifier or a full IRI.
    pub fn from_identifier(identifier: &str) -> Self {
        Self::from_iri(iri_for_identifier(identifier))
    }

    /// Attach a label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label if present, otherwise the identifier.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

/// Extract the local fragment of an IRI: the text after the last `#` or `/`.
pub fn local_fragment(iri: &str) -> &str {
    iri.rsplit(|c: char| c == '#' || c == '/').next().unwrap_or(iri)
}

/// Expand an identifier into an IRI.
///
/// Anything with a scheme (`http:`, `https:`, `urn:`) is kept as-is;
/// `HP:0000118` becomes `http://purl.obolibrary.org/obo/HP_0000118`; a bare
/// token without a colon is placed directly in the OBO namespace.
pub fn iri_for_identifier(identifier: &str) -> String {
    if identifier.contains("://") || identifier.starts_with("urn:") {
        return identifier.to_string();
    }
    match identifier.split_once(':') {
        Some((prefix, local)) => format!("{OBO_NAMESPACE}{prefix}_{local}"),
        None => format!("{OBO_NAMESPACE}{identifier}"),
    }
}
