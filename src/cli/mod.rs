pub mod commands;

use crate::core::config::{resolve_config, Config};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "supertree",
    version,
    about = "Taxonomy-guided MRP supermatrix tooling for supertree pipelines",
    long_about = "Supertree partitions TreeBASE MRP matrices by NCBI taxonomic class, combines \
                  them into gap-filled supermatrices for PAUP*, TNT and SDM, and summarises \
                  the resulting trees and logs as tables."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Number of threads to use (0 = all available)
    #[arg(short = 'j', long, default_value = "0", global = true)]
    pub threads: usize,

    /// Configuration file (defaults to ./supertree.toml when present)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Directory with study dat files and per-class artifacts
    #[arg(long, value_name = "DIR", env = "SUPERTREE_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,
}

impl Cli {
    /// Configuration with command-line overrides applied
    pub fn load_config(&self) -> crate::Result<Config> {
        let mut config = resolve_config(self.config.as_deref())?;
        if let Some(dir) = &self.data_dir {
            config.paths.data_dir = dir.clone();
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the species cited by each study dat file
    StudySpecies(commands::taxonomy::StudySpeciesArgs),

    /// Tally studies and species per taxonomic class
    Classes(commands::taxonomy::ClassesArgs),

    /// Partition cited taxa by class with overlap statistics
    ClassSpecies(commands::taxonomy::ClassSpeciesArgs),

    /// Add phylum and kingdom to a list of classes
    Lineages(commands::taxonomy::LineagesArgs),

    /// Write one MRP table per class from the study dat files
    Partition(commands::matrix::PartitionArgs),

    /// Combine MRP tables into Nexus or TNT supermatrices
    Combine(commands::matrix::CombineArgs),

    /// Tabulate the character count of every class matrix
    Nchar(commands::matrix::NcharArgs),

    /// Write a PAUP* batch script running every class matrix
    PaupScript(commands::matrix::PaupScriptArgs),

    /// Write SDM distance matrices for every treeblock
    Sdm(commands::matrix::SdmArgs),

    /// Gather the SDM files of each class into one input
    CollectSdm(commands::matrix::CollectSdmArgs),

    /// Extract column bipartitions from an MRP table
    MrpSplits(commands::tree::MrpSplitsArgs),

    /// Score source support for every internal node of a tree
    TreeSupport(commands::tree::TreeSupportArgs),

    /// Export a Newick tree as a name,parent table
    TreeCsv(commands::tree::TreeCsvArgs),

    /// Summarise tree statistics from a PAUP* log
    Pauplog(commands::report::PauplogArgs),

    /// Join tree statistics, class sizes and matrix widths
    Classdata(commands::report::ClassdataArgs),

    /// Sum per-character scores per study
    StudyFit(commands::report::StudyFitArgs),

    /// Summarise years and matrix types of TreeBASE studies
    MetaTable(commands::report::MetaTableArgs),

    /// Percentages of matrix and tree types over combined metadata
    MetaSummary(commands::report::MetaSummaryArgs),
}
