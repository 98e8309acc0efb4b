//! # boom-engine
//!
//! Bayesian ontology merging. Given classes from several ontologies, certain
//! (logical) axioms between them, and a probability table of candidate
//! mappings, find the most probable set of subsumption and equivalence
//! axioms that is structurally consistent.
//!
//! ## Architecture
//!
//! - **Graph model** (`graph`): validated, immutable entity arena plus
//!   probabilistic and logical edges
//! - **Cliques** (`clique`): extraction of independent regions and splitting
//!   of regions too large for exhaustive search
//! - **Solver** (`solver`): pruned exhaustive search for the maximum-likelihood
//!   consistent hypothesis assignment per clique
//! - **Resolver** (`resolver`, `resolution`): the full pipeline, serial or on
//!   the rayon pool, aggregated into one [`resolution::Resolution`]
//! - **I/O and reports** (`io`, `report`): probability tables and axiom files
//!   in, axioms plus markdown, JSON and Graphviz reports out
//!
//! ## Library usage
//!
//! ```no_run
//! use boom_engine::config::ResolverConfig;
//! use boom_engine::graph::{GraphBuilder, Hypothesis};
//! use boom_engine::resolver::Resolver;
//!
//! let mut builder = GraphBuilder::new();
//! let hp = builder.identifier("HP:0000001");
//! let mp = builder.identifier("MP:0000001");
//! builder.probabilistic_edge(hp, mp, vec![(Hypothesis::Equivalent, 0.9)]);
//! let graph = builder.build().unwrap();
//!
//! let resolution = Resolver::new(&graph, ResolverConfig::default())
//!     .unwrap()
//!     .resolve();
//! assert_eq!(resolution.axioms().len(), 1);
//! ```

pub mod clique;
pub mod config;
pub mod entity;
pub mod error;
pub mod graph;
pub mod io;
pub mod report;
pub mod resolution;
pub mod resolver;
pub mod solver;
pub mod warning;
