//! File formats: probability tables in, class axioms in and out.
//!
//! Parsers only feed a [`GraphBuilder`](crate::graph::GraphBuilder); the
//! graph is validated once everything is loaded.

pub mod axioms;
pub mod ptable;

pub use axioms::{
    DEFAULT_OUTPUT_PATH, load_axioms, output_axioms, parse_axioms, save_axioms, write_axioms,
};
pub use ptable::{load_ptable, parse_ptable};

use std::path::Path;

use crate::error::IoError;

/// Name used in parse errors for text that did not come from a file.
pub(crate) const INLINE_SOURCE: &str = "<input>";

pub(crate) fn read_input(path: &Path) -> Result<String, IoError> {
    std::fs::read_to_string(path).map_err(|e| IoError::InputRead {
        path: path.display().to_string(),
        source: e,
    })
}

/// Write `content` to `path`, mapping failures to [`IoError::OutputWrite`].
pub fn write_output(path: &Path, content: &str) -> Result<(), IoError> {
    std::fs::write(path, content).map_err(|e| IoError::OutputWrite {
        path: path.display().to_string(),
        source: e,
    })
}
