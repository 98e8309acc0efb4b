//! Rich diagnostic error types for the boom engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the boom engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source spans) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum BoomError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Solve(#[from] SolveError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Io(#[from] IoError),
}

// ---------------------------------------------------------------------------
// Graph errors (malformed input, fatal before any clique is processed)
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("edge references unknown entity #{entity}")]
    #[diagnostic(
        code(boom::graph::unknown_entity),
        help(
            "Every edge endpoint must be registered with the graph builder. \
             Add the entity with `GraphBuilder::entity()` before adding edges to it."
        )
    )]
    UnknownEntity { entity: usize },

    #[error("edge relates \"{entity}\" to itself")]
    #[diagnostic(
        code(boom::graph::self_edge),
        help("Remove the row from the input; an entity is trivially equivalent to itself.")
    )]
    SelfEdge { entity: String },

    #[error("probability {probability} on edge {source_id} -- {target_id} is outside [0, 1]")]
    #[diagnostic(
        code(boom::graph::probability_range),
        help("Each hypothesis probability must be a finite number between 0 and 1.")
    )]
    ProbabilityOutOfRange {
        source_id: String,
        target_id: String,
        probability: f64,
    },

    #[error("probability table on edge {source_id} -- {target_id} sums to {total:.6}")]
    #[diagnostic(
        code(boom::graph::probability_overflow),
        help(
            "The probabilities listed for one edge must sum to at most 1. \
             Any remainder is assigned to the no-relation hypothesis."
        )
    )]
    ProbabilityOverflow {
        source_id: String,
        target_id: String,
        total: f64,
    },

    #[error("hypothesis on edge {source_id} -- {target_id} does not relate its endpoints")]
    #[diagnostic(
        code(boom::graph::foreign_hypothesis),
        help("A subsumption hypothesis must use exactly the two endpoints of its edge.")
    )]
    ForeignHypothesis { source_id: String, target_id: String },

    #[error("edge {source_id} -- {target_id} is listed twice with different probabilities")]
    #[diagnostic(
        code(boom::graph::conflicting_hypothesis),
        help(
            "Rows for the same pair are merged into one table. A hypothesis given \
             by more than one row must carry the same probability each time."
        )
    )]
    ConflictingHypothesis { source_id: String, target_id: String },
}

// ---------------------------------------------------------------------------
// Solve errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error, Diagnostic)]
pub enum SolveError {
    #[error("clique {clique} has no consistent assignment")]
    #[diagnostic(
        code(boom::solve::unsatisfiable),
        help(
            "The all-no-relation assignment is always consistent, so this indicates \
             a bug upstream of the solver. Please file a report with the input files."
        )
    )]
    Unsatisfiable { clique: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(boom::config::invalid),
        help("Check the resolver settings. {message}")
    )]
    Invalid { message: String },

    #[error("failed to parse configuration file: {path}")]
    #[diagnostic(
        code(boom::config::parse),
        help("Check the TOML syntax. Parser said: {message}")
    )]
    Parse { path: String, message: String },
}

// ---------------------------------------------------------------------------
// I/O errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IoError {
    #[error("failed to read input: {path}")]
    #[diagnostic(
        code(boom::io::read),
        help("Ensure the file exists and is readable.")
    )]
    InputRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: {message}")]
    #[diagnostic(
        code(boom::io::parse),
        help("Probability tables are tab-separated: id1, id2, P(sub), P(super), P(equiv), P(none).")
    )]
    InputParse {
        path: String,
        line: usize,
        message: String,
    },

    #[error("failed to write output: {path}")]
    #[diagnostic(
        code(boom::io::write),
        help("Ensure the parent directory exists and you have write permissions.")
    )]
    OutputWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("report serialization failed: {message}")]
    #[diagnostic(code(boom::io::serialize))]
    Serialize { message: String },
}

/// Convenience alias for functions returning boom results.
pub type BoomResult<T> = std::result::Result<T, BoomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_error_converts_to_boom_error() {
        let err = GraphError::SelfEdge {
            entity: "HP_1".into(),
        };
        let boom: BoomError = err.into();
        assert!(matches!(boom, BoomError::Graph(GraphError::SelfEdge { .. })));
    }

    #[test]
    fn solve_error_converts_to_boom_error() {
        let err = SolveError::Unsatisfiable {
            clique: "HP_1".into(),
        };
        let boom: BoomError = err.into();
        assert!(matches!(boom, BoomError::Solve(_)));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = GraphError::ProbabilityOverflow {
            source_id: "A".into(),
            target_id: "B".into(),
            total: 1.25,
        };
        let msg = format!("{err}");
        assert!(msg.contains("A -- B"));
        assert!(msg.contains("1.25"));
    }
}
