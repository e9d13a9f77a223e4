//! Configuration types for the supertree pipeline

use crate::SupertreeError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "supertree.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub taxonomy: TaxonomyConfig,
    #[serde(default)]
    pub matrix: MatrixConfig,
    #[serde(default)]
    pub distance: DistanceConfig,
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub paup: PaupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    /// Directory holding study dat files and per-class artifacts
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaxonomyConfig {
    /// Rank used to partition species
    #[serde(default = "default_rank")]
    pub rank: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatrixConfig {
    /// Smallest taxon count for which a supermatrix is emitted
    #[serde(default = "default_min_taxa")]
    pub min_taxa: usize,
    /// Prepend an all-zero outgroup row
    #[serde(default = "default_root_outgroup")]
    pub root_outgroup: bool,
    #[serde(default = "default_root_label")]
    pub root_label: String,
    /// Drop taxa whose scientific name is not a clean binomial
    #[serde(default = "default_filter_species")]
    pub filter_species: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistanceConfig {
    /// Upper bound on `taxa * taxa * chars` for one treeblock
    #[serde(default = "default_max_comparisons")]
    pub max_comparisons: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeConfig {
    /// Synthetic outgroup leaf, never treated as a real taxon
    #[serde(default = "default_root_label")]
    pub outgroup_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaupConfig {
    /// Script executed after each class matrix in the batch file
    #[serde(default = "default_analysis_script")]
    pub analysis_script: String,
}

// Default value functions
fn default_data_dir() -> PathBuf { PathBuf::from("data/treebase") }
fn default_rank() -> String { "class".to_string() }
fn default_min_taxa() -> usize { 4 }
fn default_root_outgroup() -> bool { true }
fn default_root_label() -> String { "Root".to_string() }
fn default_filter_species() -> bool { true }
fn default_max_comparisons() -> u64 { 4_000_000_000 }
fn default_analysis_script() -> String { "spr_analysis.nex".to_string() }

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            rank: default_rank(),
        }
    }
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            min_taxa: default_min_taxa(),
            root_outgroup: default_root_outgroup(),
            root_label: default_root_label(),
            filter_species: default_filter_species(),
        }
    }
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            max_comparisons: default_max_comparisons(),
        }
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            outgroup_label: default_root_label(),
        }
    }
}

impl Default for PaupConfig {
    fn default() -> Self {
        Self {
            analysis_script: default_analysis_script(),
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, SupertreeError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| SupertreeError::Config(format!("Failed to parse config: {}", e)))?;
    if config.matrix.min_taxa == 0 {
        return Err(SupertreeError::Config("matrix.min_taxa must be at least 1".to_string()));
    }
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), SupertreeError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| SupertreeError::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Explicit `--config` must exist; otherwise `supertree.toml` is used when present
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config, SupertreeError> {
    match explicit {
        Some(path) => load_config(path),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => load_config(DEFAULT_CONFIG_FILE),
        None => Ok(Config::default()),
    }
}
