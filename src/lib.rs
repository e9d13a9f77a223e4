pub mod bio;
pub mod cli;
pub mod core;
pub mod utils;

pub use crate::bio::taxonomy::{TaxonNode, TaxonomyIndex};
pub use crate::core::combiner::{MatrixCombiner, Supermatrix};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupertreeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unknown taxon: {id}")]
    UnknownTaxon { id: String },

    #[error("Taxonomy cycle detected while walking ancestors of {start}")]
    TaxonomyCycle { start: String },

    #[error("Malformed block: {0}")]
    MalformedBlock(String),

    #[error("Too few taxa: found {found}, at least {required} required")]
    TooFewTaxa { found: usize, required: usize },

    #[error("No entry for {key} in {table}")]
    MissingKey { table: String, key: String },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, SupertreeError>;
