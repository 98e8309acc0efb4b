//! Probability table reader.
//!
//! One row per candidate mapping, tab or whitespace separated:
//!
//! ```text
//! HP:0000118  MP:0000001  0.1  0.05  0.8  0.05
//! ```
//!
//! Columns are the two identifiers followed by P(id1 ⊑ id2), P(id2 ⊑ id1),
//! P(id1 ≡ id2) and P(no relation). Columns after the sixth are ignored.
//! Lines starting with `#` and blank lines are skipped.

use std::path::Path;

use crate::error::IoError;
use crate::graph::{GraphBuilder, Hypothesis};

use super::{INLINE_SOURCE, read_input};

/// Parse a probability table into `builder`. Returns the number of rows read.
pub fn parse_ptable(text: &str, builder: &mut GraphBuilder) -> Result<usize, IoError> {
    parse_named(text, INLINE_SOURCE, builder)
}

/// Read and parse a probability table file.
pub fn load_ptable(path: &Path, builder: &mut GraphBuilder) -> Result<usize, IoError> {
    let text = read_input(path)?;
    let rows = parse_named(&text, &path.display().to_string(), builder)?;
    tracing::info!(path = %path.display(), rows, "loaded probability table");
    Ok(rows)
}

fn parse_named(text: &str, source: &str, builder: &mut GraphBuilder) -> Result<usize, IoError> {
    let mut rows = 0;
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let error = |message: String| IoError::InputParse {
            path: source.to_string(),
            line: n + 1,
            message,
        };

        let columns: Vec<&str> = line.split_whitespace().collect();
        if columns.len() < 6 {
            return Err(error(format!(
                "expected 6 columns, found {}",
                columns.len()
            )));
        }
        let mut probabilities = [0.0f64; 4];
        for (slot, raw) in probabilities.iter_mut().zip(&columns[2..6]) {
            *slot = raw
                .parse()
                .map_err(|_| error(format!("not a probability: {raw:?}")))?;
        }

        let a = builder.identifier(columns[0]);
        let b = builder.identifier(columns[1]);
        let [sub, sup, equiv, none] = probabilities;
        builder.probabilistic_edge(
            a,
            b,
            vec![
                (Hypothesis::SubsumedBy { sub: a, sup: b }, sub),
                (Hypothesis::SubsumedBy { sub: b, sup: a }, sup),
                (Hypothesis::Equivalent, equiv),
                (Hypothesis::NoRelation, none),
            ],
        );
        rows += 1;
    }
    tracing::debug!(source, rows, "parsed probability table");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Relation;

    #[test]
    fn rows_become_probabilistic_edges() {
        let text = "# mapping candidates\n\
                    HP:1\tMP:1\t0.1\t0.05\t0.8\t0.05\n\
                    \n\
                    HP:2 MP:1 0.6 0.1 0.2 0.1 extra\n";
        let mut b = GraphBuilder::new();
        assert_eq!(parse_ptable(text, &mut b).unwrap(), 2);
        let g = b.build().unwrap();
        assert_eq!(g.entity_count(), 3);
        assert_eq!(g.probabilistic_edges().len(), 2);

        let (hp1, mp1) = (g.lookup("HP_1").unwrap(), g.lookup("MP_1").unwrap());
        let edge = &g.probabilistic_edges()[0];
        assert_eq!(edge.key(), (hp1, mp1));
        assert!((edge.probability_of(Hypothesis::Equivalent) - 0.8).abs() < 1e-12);
        assert_eq!(
            g.axiom_prior(&Relation::subsumed_by(hp1, mp1)).probability(),
            Some(0.1)
        );
    }

    #[test]
    fn short_row_reports_line_number() {
        let mut b = GraphBuilder::new();
        let err = parse_ptable("A B 0.5 0.5 0\n", &mut b).unwrap_err();
        assert!(matches!(err, IoError::InputParse { line: 1, .. }));
    }

    #[test]
    fn non_numeric_probability_is_rejected() {
        let mut b = GraphBuilder::new();
        let err = parse_ptable("# header\nA B 0.5 x 0 0\n", &mut b).unwrap_err();
        match err {
            IoError::InputParse { line, message, .. } => {
                assert_eq!(line, 2);
                assert!(message.contains("\"x\""));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ptable.tsv");
        std::fs::write(&path, "A\tB\t0\t0\t1\t0\n").unwrap();
        let mut b = GraphBuilder::new();
        assert_eq!(load_ptable(&path, &mut b).unwrap(), 1);
        assert!(matches!(
            load_ptable(&dir.path().join("missing.tsv"), &mut b),
            Err(IoError::InputRead { .. })
        ));
    }
}
