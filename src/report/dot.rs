//! Graphviz diagrams of clique solutions.
//!
//! Each final cluster is drawn as a `subgraph cluster_*`. Edges are layered:
//! given logical edges in black, the clique's open probabilistic edges
//! dotted, then the solution's axioms in blue (equivalences in red with
//! diamond ends). Axioms with a prior are labelled with it and drawn thicker;
//! a trailing `*` marks an edge the splitter fixed before search.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::entity::EntityId;
use crate::error::IoError;
use crate::graph::{Prior, ProbabilisticGraph, Relation};
use crate::io::write_output;
use crate::resolution::Resolution;
use crate::solver::CliqueSolution;

/// Renders one solution as a DOT digraph.
pub struct DotWriter<'a> {
    solution: &'a CliqueSolution,
    graph: &'a ProbabilisticGraph,
}

struct EdgeStyle<'s> {
    arrowhead: &'s str,
    style: &'s str,
    color: &'s str,
    penwidth: u32,
    label: String,
    extra: &'s str,
}

impl<'a> DotWriter<'a> {
    pub fn new(solution: &'a CliqueSolution, graph: &'a ProbabilisticGraph) -> Self {
        Self { solution, graph }
    }

    pub fn render(&self) -> String {
        let mut out = String::from("digraph cliquegraph {\n");
        self.render_clusters(&mut out);
        self.render_given_edges(&mut out);
        self.render_prior_edges(&mut out);
        self.render_final_axioms(&mut out);
        out.push_str("}\n");
        out
    }

    fn id(&self, entity: EntityId) -> &str {
        &self.graph.entity(entity).id
    }

    fn render_clusters(&self, out: &mut String) {
        for (rep, members) in &self.solution.clusters {
            let _ = writeln!(out, "subgraph \"cluster_{}\" {{", self.id(*rep));
            for &m in members {
                let entity = self.graph.entity(m);
                let label = match &entity.label {
                    Some(label) => format!(
                        "{} {}",
                        entity.id,
                        label.replace('"', "'").replace(' ', "\\n")
                    ),
                    None => entity.id.clone(),
                };
                let _ = writeln!(out, "\"{}\" [ label=\"{}\" ];", entity.id, label);
            }
            out.push_str("}\n");
        }
    }

    /// Logical edges that have no table entry. Ones that do are drawn with
    /// the final axioms instead.
    fn render_given_edges(&self, out: &mut String) {
        for &i in &self.solution.clique.logical {
            let relation = self.graph.logical_edge(i);
            if self.graph.axiom_prior(relation) == Prior::Certain {
                self.render_axiom(out, relation, "black");
            }
        }
    }

    fn render_prior_edges(&self, out: &mut String) {
        for &i in &self.solution.clique.probabilistic {
            let edge = self.graph.probabilistic_edge(i);
            self.render_edge(
                out,
                edge.source,
                edge.target,
                &EdgeStyle {
                    arrowhead: "none",
                    style: "dotted",
                    color: "blue",
                    penwidth: 1,
                    label: String::new(),
                    extra: "",
                },
            );
        }
    }

    fn render_final_axioms(&self, out: &mut String) {
        for relation in self.solution.relations() {
            self.render_axiom(out, relation, "blue");
        }
    }

    fn render_axiom(&self, out: &mut String, relation: &Relation, color: &str) {
        let (label, penwidth) = match self.solution.prior(self.graph, relation) {
            Prior::Certain => (String::new(), 1),
            Prior::Probability(p) => {
                let mut label = p.to_string();
                if self.solution.is_promoted(relation) {
                    label.push('*');
                }
                (label, (1.0 + p * 10.0) as u32)
            }
        };
        match relation {
            Relation::SubsumedBy { sub, sup } => self.render_edge(
                out,
                *sub,
                *sup,
                &EdgeStyle {
                    arrowhead: "normal",
                    style: "solid",
                    color,
                    penwidth,
                    label,
                    extra: "",
                },
            ),
            Relation::Equivalent { members } => {
                let style = EdgeStyle {
                    arrowhead: "ediamond",
                    style: "solid",
                    color: "red",
                    penwidth,
                    label,
                    extra: ", arrowtail=ediamond, dir=both",
                };
                for pair in members.windows(2) {
                    self.render_edge(out, pair[0], pair[1], &style);
                }
            }
        }
    }

    fn render_edge(&self, out: &mut String, s: EntityId, t: EntityId, style: &EdgeStyle<'_>) {
        let _ = writeln!(
            out,
            "\"{}\" -> \"{}\" [ arrowhead = {}, penwidth={}, color={}, label=\"{}\", style={}{}]",
            self.id(s),
            self.id(t),
            style.arrowhead,
            style.penwidth,
            style.color,
            style.label,
            style.style,
            style.extra
        );
    }
}

// ---------------------------------------------------------------------------
// Rasterizing
// ---------------------------------------------------------------------------

/// Turns a DOT file into an image.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, dot_file: &Path, png_file: &Path) -> Result<(), IoError>;
}

/// Shells out to Graphviz `dot`, laying graphs out bottom-to-top.
#[derive(Debug, Clone)]
pub struct GraphvizRasterizer {
    program: PathBuf,
}

impl Default for GraphvizRasterizer {
    fn default() -> Self {
        Self::new("dot")
    }
}

impl GraphvizRasterizer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Rasterizer for GraphvizRasterizer {
    fn rasterize(&self, dot_file: &Path, png_file: &Path) -> Result<(), IoError> {
        let write_error = |source: std::io::Error| IoError::OutputWrite {
            path: png_file.display().to_string(),
            source,
        };
        let status = Command::new(&self.program)
            .arg("-Grankdir=BT")
            .arg("-Tpng")
            .arg("-o")
            .arg(png_file)
            .arg(dot_file)
            .status()
            .map_err(write_error)?;
        if !status.success() {
            return Err(write_error(std::io::Error::other(format!(
                "{} exited with {status}",
                self.program.display()
            ))));
        }
        Ok(())
    }
}

/// Write `<dir>/<clique id>.dot` for every solution, and rasterize each one
/// when a rasterizer is given. Returns the DOT files written.
///
/// Failing to write a DOT file is an error; a failed rasterization is only
/// logged.
pub fn write_diagrams(
    dir: &Path,
    graph: &ProbabilisticGraph,
    resolution: &Resolution,
    rasterizer: Option<&dyn Rasterizer>,
) -> Result<Vec<PathBuf>, IoError> {
    std::fs::create_dir_all(dir).map_err(|e| IoError::OutputWrite {
        path: dir.display().to_string(),
        source: e,
    })?;

    let mut written = Vec::with_capacity(resolution.solutions().len());
    for solution in resolution.solutions() {
        let dot_file = dir.join(format!("{}.dot", solution.clique_id));
        write_output(&dot_file, &DotWriter::new(solution, graph).render())?;
        if let Some(rasterizer) = rasterizer {
            let png_file = dot_file.with_extension("png");
            if let Err(e) = rasterizer.rasterize(&dot_file, &png_file) {
                tracing::warn!(
                    clique = %solution.clique_id,
                    error = %e,
                    "failed to rasterize clique diagram"
                );
            }
        }
        written.push(dot_file);
    }
    tracing::info!(dir = %dir.display(), diagrams = written.len(), "wrote clique diagrams");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use crate::graph::{GraphBuilder, Hypothesis};
    use crate::resolver::Resolver;

    fn resolved() -> (ProbabilisticGraph, Resolution) {
        let mut b = GraphBuilder::new();
        let (x, y, z) = (b.identifier("X"), b.identifier("Y"), b.identifier("Z"));
        b.set_label(x, "left \"upper\" lobe");
        b.logical_edge(Relation::subsumed_by(y, z));
        b.probabilistic_edge(x, y, vec![(Hypothesis::Equivalent, 0.8)]);
        let g = b.build().unwrap();
        let r = Resolver::new(&g, ResolverConfig::default()).unwrap().resolve();
        (g, r)
    }

    #[test]
    fn renders_clusters_and_styled_edges() {
        let (g, r) = resolved();
        let dot = DotWriter::new(&r.solutions()[0], &g).render();
        assert!(dot.starts_with("digraph cliquegraph {"));
        assert!(dot.contains("subgraph \"cluster_X\""));
        assert!(dot.contains("\"X\" [ label=\"X left\\n'upper'\\nlobe\" ];"));
        // Given edge: black, unlabelled.
        assert!(dot.contains("\"Y\" -> \"Z\" [ arrowhead = normal, penwidth=1, color=black, label=\"\""));
        // Open prior edge: dotted.
        assert!(dot.contains("\"X\" -> \"Y\" [ arrowhead = none, penwidth=1, color=blue, label=\"\", style=dotted]"));
        // Chosen equivalence: red diamonds, prior label, width from prior.
        assert!(dot.contains(
            "\"X\" -> \"Y\" [ arrowhead = ediamond, penwidth=9, color=red, label=\"0.8\", style=solid, arrowtail=ediamond, dir=both]"
        ));
    }

    struct Failing;

    impl Rasterizer for Failing {
        fn rasterize(&self, _dot: &Path, png: &Path) -> Result<(), IoError> {
            Err(IoError::OutputWrite {
                path: png.display().to_string(),
                source: std::io::Error::other("no graphviz"),
            })
        }
    }

    #[test]
    fn rasterizer_failure_is_not_fatal() {
        let (g, r) = resolved();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("diagrams");
        let written = write_diagrams(&out, &g, &r, Some(&Failing)).unwrap();
        assert_eq!(written, vec![out.join("X.dot")]);
        assert!(written[0].exists());
    }
}
