pub mod matrix;
pub mod report;
pub mod taxonomy;
pub mod tree;

use crate::bio::taxonomy::{ncbi, TaxonomyIndex};
use crate::core::matrix_tools::glob_sorted;
use crate::utils::io::output_writer;
use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// NCBI taxonomy dump locations
#[derive(Args, Debug, Clone)]
pub struct TaxonomyArgs {
    /// NCBI nodes.dmp
    #[arg(short = 't', long, value_name = "FILE")]
    pub nodes: PathBuf,

    /// NCBI names.dmp
    #[arg(short = 'n', long, value_name = "FILE")]
    pub names: Option<PathBuf>,
}

pub fn load_taxonomy(args: &TaxonomyArgs) -> anyhow::Result<TaxonomyIndex> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Loading taxonomy from {}...", args.nodes.display()));

    let index = ncbi::load_index(args.nodes.as_path(), args.names.as_deref())
        .with_context(|| format!("Failed to load taxonomy from {}", args.nodes.display()))?;

    spinner.finish_and_clear();
    tracing::info!("Loaded {} taxonomy nodes", index.len());
    Ok(index)
}

pub fn open_input(path: &Path) -> anyhow::Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(BufReader::new(file))
}

pub fn open_output(path: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    output_writer(path).with_context(|| match path {
        Some(path) => format!("Failed to create {}", path.display()),
        None => "Failed to open stdout".to_string(),
    })
}

/// Explicit dat files, or every `S*.dat` in the data directory
pub fn study_files(explicit: &[PathBuf], data_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if !explicit.is_empty() {
        return Ok(explicit.to_vec());
    }
    let files = glob_sorted(data_dir, "S*.dat")?;
    if files.is_empty() {
        anyhow::bail!("No study dat files found in {}", data_dir.display());
    }
    Ok(files)
}
