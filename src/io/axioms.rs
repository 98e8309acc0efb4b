//! Class axioms in OWL functional-style syntax.
//!
//! Only the fragment the engine works with is understood, one axiom per line:
//!
//! ```text
//! Prefix(obo:=<http://purl.obolibrary.org/obo/>)
//! Declaration(Class(obo:HP_0000118))
//! SubClassOf(<http://purl.obolibrary.org/obo/HP_1> obo:HP_0000118)
//! EquivalentClasses(obo:HP_1 obo:MP_1)
//! AnnotationAssertion(rdfs:label obo:HP_1 "phenotypic abnormality")
//! ```
//!
//! Terms are `<iri>` or `prefix:local`. A CURIE whose prefix was declared
//! expands against that namespace, anything else goes through
//! [`iri_for_identifier`]. Lines that do not match (complex class
//! expressions, other axiom types, the `Ontology(` wrapper) are skipped.
//! A malformed `Prefix(` or `rdfs:label` line is an [`IoError::InputParse`].

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::OutputMode;
use crate::entity::{Entity, EntityId, iri_for_identifier};
use crate::error::IoError;
use crate::graph::{GraphBuilder, ProbabilisticGraph, Relation};
use crate::resolution::Resolution;

use super::{INLINE_SOURCE, read_input, write_output};

/// Output path used when none is given.
pub const DEFAULT_OUTPUT_PATH: &str = "foo.owl";

const RDFS_NAMESPACE: &str = "http://www.w3.org/2000/01/rdf-schema#";

static RE_TERM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^>\s]+)>|([A-Za-z][\w.-]*:[\w.-]+)").unwrap());

static RE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Prefix\(\s*([\w.-]*):=\s*<([^>]*)>\s*\)$").unwrap());

static RE_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Declaration\(\s*Class\(\s*(<[^>\s]+>|[A-Za-z][\w.-]*:[\w.-]+)\s*\)\s*\)$").unwrap()
});

static RE_SUBCLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^SubClassOf\(\s*(<[^>\s]+>|[A-Za-z][\w.-]*:[\w.-]+)\s+(<[^>\s]+>|[A-Za-z][\w.-]*:[\w.-]+)\s*\)$",
    )
    .unwrap()
});

static RE_EQUIVALENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^EquivalentClasses\(\s*((?:(?:<[^>\s]+>|[A-Za-z][\w.-]*:[\w.-]+)\s*)+)\)$").unwrap()
});

static RE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^AnnotationAssertion\(\s*rdfs:label\s+(<[^>\s]+>|[A-Za-z][\w.-]*:[\w.-]+)\s+"((?:[^"\\]|\\.)*)"(?:@[\w-]+|\^\^\S+)?\s*\)$"#,
    )
    .unwrap()
});

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Term expansion state: declared prefixes.
#[derive(Debug, Default)]
struct Prefixes(HashMap<String, String>);

impl Prefixes {
    fn expand(&self, term: &str) -> String {
        if let Some(iri) = term.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
            return iri.to_string();
        }
        match term.split_once(':') {
            Some((prefix, local)) => match self.0.get(prefix) {
                Some(namespace) => format!("{namespace}{local}"),
                None => iri_for_identifier(term),
            },
            None => iri_for_identifier(term),
        }
    }
}

/// Parse axioms into `builder`. Returns the number of class axioms read
/// (declarations and labels are not counted).
pub fn parse_axioms(text: &str, builder: &mut GraphBuilder) -> Result<usize, IoError> {
    parse_named(text, INLINE_SOURCE, builder)
}

/// Read and parse an axiom file.
pub fn load_axioms(path: &Path, builder: &mut GraphBuilder) -> Result<usize, IoError> {
    let text = read_input(path)?;
    let axioms = parse_named(&text, &path.display().to_string(), builder)?;
    tracing::info!(path = %path.display(), axioms, "loaded class axioms");
    Ok(axioms)
}

fn parse_named(text: &str, source: &str, builder: &mut GraphBuilder) -> Result<usize, IoError> {
    let mut prefixes = Prefixes::default();
    let mut axioms = 0;
    let class = |builder: &mut GraphBuilder, prefixes: &Prefixes, term: &str| {
        builder.entity(Entity::from_iri(prefixes.expand(term)))
    };

    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        let error = |message: &str| IoError::InputParse {
            path: source.to_string(),
            line: n + 1,
            message: message.to_string(),
        };
        if let Some(caps) = RE_PREFIX.captures(line) {
            prefixes.0.insert(caps[1].to_string(), caps[2].to_string());
        } else if let Some(caps) = RE_DECLARATION.captures(line) {
            class(builder, &prefixes, &caps[1]);
        } else if let Some(caps) = RE_SUBCLASS.captures(line) {
            let sub = class(builder, &prefixes, &caps[1]);
            let sup = class(builder, &prefixes, &caps[2]);
            if sub != sup {
                builder.logical_edge(Relation::subsumed_by(sub, sup));
                axioms += 1;
            }
        } else if let Some(caps) = RE_EQUIVALENT.captures(line) {
            let members: Vec<EntityId> = RE_TERM
                .find_iter(&caps[1])
                .map(|m| class(builder, &prefixes, m.as_str()))
                .collect();
            let relation = Relation::equivalent(members);
            if relation.entities().len() >= 2 {
                builder.logical_edge(relation);
                axioms += 1;
            }
        } else if let Some(caps) = RE_LABEL.captures(line) {
            let iri = prefixes.expand(&caps[1]);
            let label = unescape(&caps[2]);
            builder.entity(Entity::from_iri(iri).with_label(label));
        } else if line.starts_with("Prefix(") {
            return Err(error("malformed prefix declaration"));
        } else if line.starts_with("AnnotationAssertion(rdfs:label") {
            return Err(error("malformed label annotation"));
        }
    }
    tracing::debug!(source, axioms, "parsed class axioms");
    Ok(axioms)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Serialise `axioms`, declaring every class they mention.
pub fn write_axioms(graph: &ProbabilisticGraph, axioms: &[Relation]) -> String {
    let declared: BTreeSet<EntityId> = axioms.iter().flat_map(Relation::entities).collect();
    render(graph, declared, axioms)
}

/// The output graph for `resolution` in the requested mode.
///
/// `Fresh` holds exactly the resolved axioms. `Augment` adds them to the
/// source graph's logical edges and declares every source class.
pub fn output_axioms(
    graph: &ProbabilisticGraph,
    resolution: &Resolution,
    mode: OutputMode,
) -> String {
    match mode {
        OutputMode::Fresh => write_axioms(graph, &resolution.axioms()),
        OutputMode::Augment => {
            let axioms: Vec<Relation> = graph
                .logical_edges()
                .iter()
                .cloned()
                .chain(resolution.axioms())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            let declared = (0..graph.entity_count()).map(EntityId::new).collect();
            render(graph, declared, &axioms)
        }
    }
}

/// Write [`output_axioms`] to `path`.
pub fn save_axioms(
    path: &Path,
    graph: &ProbabilisticGraph,
    resolution: &Resolution,
    mode: OutputMode,
) -> Result<(), IoError> {
    write_output(path, &output_axioms(graph, resolution, mode))?;
    tracing::info!(path = %path.display(), ?mode, "wrote output graph");
    Ok(())
}

fn render(graph: &ProbabilisticGraph, declared: BTreeSet<EntityId>, axioms: &[Relation]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Prefix(rdfs:=<{RDFS_NAMESPACE}>)");
    out.push_str("Ontology(\n");
    for &id in &declared {
        let _ = writeln!(out, "Declaration(Class(<{}>))", graph.entity(id).iri);
    }
    for &id in &declared {
        let entity = graph.entity(id);
        if let Some(label) = &entity.label {
            let _ = writeln!(
                out,
                "AnnotationAssertion(rdfs:label <{}> \"{}\")",
                entity.iri,
                escape(label)
            );
        }
    }
    for relation in axioms {
        match relation {
            Relation::SubsumedBy { sub, sup } => {
                let _ = writeln!(
                    out,
                    "SubClassOf(<{}> <{}>)",
                    graph.entity(*sub).iri,
                    graph.entity(*sup).iri
                );
            }
            Relation::Equivalent { members } => {
                let terms: Vec<String> = members
                    .iter()
                    .map(|m| format!("<{}>", graph.entity(*m).iri))
                    .collect();
                let _ = writeln!(out, "EquivalentClasses({})", terms.join(" "));
            }
        }
    }
    out.push_str(")\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"Prefix(obo:=<http://purl.obolibrary.org/obo/>)
Ontology(
Declaration(Class(obo:HP_3))
SubClassOf(obo:HP_1 <http://purl.obolibrary.org/obo/HP_2>)
EquivalentClasses(obo:HP_2 MP:9)
SubClassOf(obo:HP_1 ObjectSomeValuesFrom(obo:BFO_1 obo:HP_4))
AnnotationAssertion(rdfs:label obo:HP_1 "a \"quoted\" label"@en)
)"#;

    #[test]
    fn parses_supported_axioms_and_skips_the_rest() {
        let mut b = GraphBuilder::new();
        assert_eq!(parse_axioms(SAMPLE, &mut b).unwrap(), 2);
        let g = b.build().unwrap();
        assert_eq!(g.entity_count(), 4);
        let hp1 = g.lookup("HP_1").unwrap();
        let hp2 = g.lookup("HP_2").unwrap();
        let mp9 = g.lookup("MP_9").unwrap();
        assert_eq!(
            g.logical_edges(),
            &[
                Relation::subsumed_by(hp1, hp2),
                Relation::equivalent([hp2, mp9]),
            ]
        );
        assert_eq!(g.entity(hp1).label.as_deref(), Some("a \"quoted\" label"));
        assert_eq!(g.entity(mp9).iri, "http://purl.obolibrary.org/obo/MP_9");
    }

    #[test]
    fn malformed_prefix_reports_its_line() {
        let text = "Prefix(obo:=<http://purl.obolibrary.org/obo/>)\nPrefix(obo <broken>)\n";
        let mut b = GraphBuilder::new();
        match parse_axioms(text, &mut b) {
            Err(IoError::InputParse { line, message, .. }) => {
                assert_eq!(line, 2);
                assert!(message.contains("prefix"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_label_is_rejected() {
        let text = "AnnotationAssertion(rdfs:label obo:HP_1 \"open)\n";
        let mut b = GraphBuilder::new();
        assert!(matches!(
            parse_axioms(text, &mut b),
            Err(IoError::InputParse { line: 1, .. })
        ));
    }

    #[test]
    fn written_axioms_parse_back() {
        let mut b = GraphBuilder::new();
        parse_axioms(SAMPLE, &mut b).unwrap();
        let g = b.build().unwrap();
        let text = write_axioms(&g, g.logical_edges());
        assert!(text.contains("SubClassOf(<http://purl.obolibrary.org/obo/HP_1> <http://purl.obolibrary.org/obo/HP_2>)"));
        // HP_3 is declared in the source but not mentioned by any axiom.
        assert!(!text.contains("HP_3"));

        let mut again = GraphBuilder::new();
        assert_eq!(parse_axioms(&text, &mut again).unwrap(), 2);
        let reparsed = again.build().unwrap();
        assert_eq!(reparsed.logical_edges(), g.logical_edges());
        let hp1 = reparsed.lookup("HP_1").unwrap();
        assert_eq!(
            reparsed.entity(hp1).label.as_deref(),
            Some("a \"quoted\" label")
        );
    }

    #[test]
    fn output_modes_differ_in_source_axioms() {
        let mut b = GraphBuilder::new();
        parse_axioms(SAMPLE, &mut b).unwrap();
        let g = b.build().unwrap();
        let empty = Resolution::default();
        let fresh = output_axioms(&g, &empty, OutputMode::Fresh);
        assert!(!fresh.contains("SubClassOf"));
        let augmented = output_axioms(&g, &empty, OutputMode::Augment);
        assert!(augmented.contains("SubClassOf"));
        assert!(augmented.contains("HP_3"));
    }
}
