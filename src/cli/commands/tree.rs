use super::{open_input, open_output};
use crate::bio::mrp::MrpTable;
use crate::bio::tree::LabelledTree;
use crate::core::bipartition::{bipartition_support, check_unique_labels, mrp_splits, read_splits, write_splits, write_support};
use crate::core::config::Config;
use anyhow::Context;
use clap::Args;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

fn read_tree(path: &Path) -> anyhow::Result<LabelledTree> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let tree = LabelledTree::from_newick(&text).with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(tree)
}

#[derive(Args)]
pub struct MrpSplitsArgs {
    /// Class MRP table
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Output split table (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run_mrp_splits(args: MrpSplitsArgs, _config: &Config) -> anyhow::Result<()> {
    let table = MrpTable::parse(open_input(&args.input)?)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let splits = mrp_splits(&table);

    let mut out = open_output(args.output.as_deref())?;
    write_splits(&mut out, &splits)?;
    out.flush()?;
    info!("Extracted splits from {} of {} blocks", splits.len(), table.blocks.len());
    Ok(())
}

#[derive(Args)]
pub struct TreeSupportArgs {
    /// Newick tree of one class
    #[arg(short, long, value_name = "FILE")]
    pub tree: PathBuf,

    /// Split table (default: the tree path with a `.mrpsplit` extension)
    #[arg(short, long, value_name = "FILE")]
    pub splits: Option<PathBuf>,

    /// Synthetic outgroup leaf (overrides the configuration)
    #[arg(long)]
    pub outgroup: Option<String>,

    /// Output table (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run_tree_support(args: TreeSupportArgs, config: &Config) -> anyhow::Result<()> {
    let tree = read_tree(&args.tree)?;
    check_unique_labels(&tree)?;

    let splits_path = args
        .splits
        .clone()
        .unwrap_or_else(|| args.tree.with_extension("mrpsplit"));
    let sources = read_splits(open_input(&splits_path)?)
        .with_context(|| format!("Failed to read {}", splits_path.display()))?;

    let outgroup = args.outgroup.as_deref().unwrap_or(&config.tree.outgroup_label);
    let support = bipartition_support(&tree, &sources, outgroup);

    let mut out = open_output(args.output.as_deref())?;
    write_support(&mut out, &support)?;
    out.flush()?;
    info!("Scored {} internal nodes against {} sources", support.len(), sources.len());
    Ok(())
}

#[derive(Args)]
pub struct TreeCsvArgs {
    /// Newick tree
    #[arg(short, long, value_name = "FILE")]
    pub tree: PathBuf,

    /// Output CSV (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run_tree_csv(args: TreeCsvArgs, _config: &Config) -> anyhow::Result<()> {
    let tree = read_tree(&args.tree)?;
    let mut out = open_output(args.output.as_deref())?;
    tree.write_parent_csv(&mut out)?;
    out.flush()?;
    Ok(())
}
