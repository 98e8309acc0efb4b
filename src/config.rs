//! Resolver configuration.
//!
//! Defaults match the reference settings (9 probabilistic edges per clique,
//! sub-cliques of 6 entities). A config can be loaded from TOML and then
//! overridden field by field by the CLI.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::clique::SplitLimits;
use crate::error::{BoomResult, ConfigError, IoError};

/// What the persisted output graph should contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// The source graph's logical edges plus the resolved axioms.
    #[default]
    Augment,
    /// Only the resolved axioms.
    Fresh,
}

/// Configuration for a [`Resolver`](crate::resolver::Resolver) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Cliques with more open probabilistic edges than this are split.
    pub max_probabilistic_edges: usize,
    /// Maximum entities per sub-clique when splitting.
    pub clique_split_size: usize,
    /// Only report cliques touching these entities (empty = all).
    pub seed_entities: Vec<String>,
    /// Contents of the persisted output graph.
    pub output_mode: OutputMode,
    /// Solve cliques on the rayon thread pool.
    pub parallel: bool,
    /// Per-clique cap on evaluated assignments. `None` = exhaustive.
    pub candidate_budget: Option<u64>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let limits = SplitLimits::default();
        Self {
            max_probabilistic_edges: limits.max_probabilistic_edges,
            clique_split_size: limits.clique_split_size,
            seed_entities: Vec::new(),
            output_mode: OutputMode::default(),
            parallel: true,
            candidate_budget: None,
        }
    }
}

impl ResolverConfig {
    /// Load from a TOML file. Missing fields take their defaults.
    pub fn load(path: &Path) -> BoomResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| IoError::InputRead {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_probabilistic_edges == 0 {
            return Err(ConfigError::Invalid {
                message: "max_probabilistic_edges must be at least 1".into(),
            });
        }
        if self.clique_split_size < 2 {
            return Err(ConfigError::Invalid {
                message: "clique_split_size must be at least 2".into(),
            });
        }
        if self.candidate_budget == Some(0) {
            return Err(ConfigError::Invalid {
                message: "candidate_budget must be positive when set".into(),
            });
        }
        Ok(())
    }

    /// Splitter bounds derived from this config.
    pub fn split_limits(&self) -> SplitLimits {
        SplitLimits {
            max_probabilistic_edges: self.max_probabilistic_edges,
            clique_split_size: self.clique_split_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ResolverConfig::default();
        assert_eq!(config.max_probabilistic_edges, 9);
        assert_eq!(config.clique_split_size, 6);
        assert_eq!(config.output_mode, OutputMode::Augment);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_bounds() {
        let config = ResolverConfig {
            max_probabilistic_edges: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
        let config = ResolverConfig {
            clique_split_size: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boom.toml");
        std::fs::write(
            &path,
            "max_probabilistic_edges = 5\noutput_mode = \"fresh\"\nseed_entities = [\"HP:1\"]\n",
        )
        .unwrap();
        let config = ResolverConfig::load(&path).unwrap();
        assert_eq!(config.max_probabilistic_edges, 5);
        assert_eq!(config.clique_split_size, 6);
        assert_eq!(config.output_mode, OutputMode::Fresh);
        assert_eq!(config.seed_entities, vec!["HP:1".to_string()]);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boom.toml");
        std::fs::write(&path, "max_probabilistic_edges = \"lots\"").unwrap();
        let err = ResolverConfig::load(&path).unwrap_err();
        assert!(matches!(
            err,
            crate::error::BoomError::Config(ConfigError::Parse { .. })
        ));
    }
}
