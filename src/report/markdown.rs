//! Markdown report.

use std::fmt::Write as _;

use crate::graph::{Prior, ProbabilisticGraph};
use crate::resolution::Resolution;
use crate::solver::{AxiomOrigin, CliqueSolution};

use super::{describe, entity_name};

/// Render `resolution` as a markdown document.
pub fn render(graph: &ProbabilisticGraph, resolution: &Resolution) -> String {
    let mut out = String::from("# Resolution\n\n");
    let _ = writeln!(
        out,
        "{} clique(s), {} axiom(s), {} warning(s), {} failure(s)\n",
        resolution.solutions().len(),
        resolution.axioms().len(),
        resolution.warnings().len(),
        resolution.failures().len()
    );

    for solution in resolution.solutions() {
        render_solution(&mut out, graph, solution);
    }

    if !resolution.warnings().is_empty() {
        out.push_str("## Warnings\n\n");
        for warning in resolution.warnings() {
            let _ = writeln!(out, "- {warning}");
        }
        out.push('\n');
    }
    if !resolution.failures().is_empty() {
        out.push_str("## Failures\n\n");
        for failure in resolution.failures() {
            let _ = writeln!(out, "- {}: {}", failure.clique_id, failure.error);
        }
        out.push('\n');
    }
    out
}

fn render_solution(out: &mut String, graph: &ProbabilisticGraph, solution: &CliqueSolution) {
    let _ = writeln!(out, "## Clique {}\n", solution.clique_id);
    if let Some(parent) = &solution.clique.parent {
        let _ = writeln!(out, "Split from {parent}.\n");
    }
    let _ = writeln!(
        out,
        "Score: {:.6} over {} open edge(s)\n",
        solution.score,
        solution.clique.probabilistic_edge_count()
    );

    let merged: Vec<_> = solution.clusters.values().filter(|m| m.len() > 1).collect();
    if !merged.is_empty() {
        out.push_str("Clusters:\n\n");
        for members in merged {
            let names: Vec<String> = members.iter().map(|m| entity_name(graph, *m)).collect();
            let _ = writeln!(out, "- {}", names.join(", "));
        }
        out.push('\n');
    }

    out.push_str("| Axiom | Origin | Prior |\n|---|---|---|\n");
    for axiom in &solution.axioms {
        let origin = match axiom.origin {
            AxiomOrigin::Logical => "given",
            AxiomOrigin::Promoted { .. } => "promoted",
            AxiomOrigin::Chosen { .. } => "chosen",
        };
        let prior = match axiom.prior() {
            Prior::Probability(p) => format!("{p:.3}"),
            Prior::Certain => "-".to_string(),
        };
        let _ = writeln!(
            out,
            "| {} | {} | {} |",
            describe(graph, &axiom.relation).replace('|', "\\|"),
            origin,
            prior
        );
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use crate::graph::{GraphBuilder, Hypothesis, Relation};
    use crate::resolver::Resolver;

    #[test]
    fn tables_list_axioms_with_origin_and_prior() {
        let mut b = GraphBuilder::new();
        let (x, y, z) = (b.identifier("X"), b.identifier("Y"), b.identifier("Z"));
        b.set_label(x, "heart");
        b.logical_edge(Relation::subsumed_by(y, z));
        b.probabilistic_edge(x, y, vec![(Hypothesis::Equivalent, 0.75)]);
        let g = b.build().unwrap();
        let r = Resolver::new(&g, ResolverConfig::default()).unwrap().resolve();

        let md = render(&g, &r);
        assert!(md.contains("## Clique X"));
        assert!(md.contains("| X \"heart\" EquivalentTo Y | chosen | 0.750 |"));
        assert!(md.contains("| Y SubClassOf Z | given | - |"));
        assert!(md.contains("- X \"heart\", Y"));
        assert!(!md.contains("## Failures"));
    }
}
