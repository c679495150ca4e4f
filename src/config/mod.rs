// src/config/mod.rs
//! Run configuration: query catalog and artifact locations.
//!
//! Decision thresholds live in compiled policy (`DecisionPolicy`,
//! `CompositeWeights`, `SelectionPolicy`), not in the file.

pub mod queries;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use queries::QueryCatalog;

pub const ENV_CONFIG_PATH: &str = "NSM_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/nsm.toml";

fn default_input_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommenderConfig {
    /// Where `CsvDirSource` looks for `<query_id>_<date>.csv`.
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    /// Parent directory of the per-run artifact.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub queries: QueryCatalog,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            queries: QueryCatalog::default(),
        }
    }
}

impl RecommenderConfig {
    /// Load from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Resolve config with env var + fallbacks:
    /// 1) $NSM_CONFIG_PATH (must exist)
    /// 2) config/nsm.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if p.exists() {
            return Self::load_from(&p);
        }
        Ok(Self::default())
    }

    pub fn parse(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s)?;
        Ok(cfg)
    }
}
